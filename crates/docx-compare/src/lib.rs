pub mod align;
pub mod engine;
pub mod materialize;
pub mod move_detect;
pub mod result;
pub mod tokenize;

pub use engine::compare_ooxml;
pub use result::{CompareMeta, CompareResult, CompareStats};
