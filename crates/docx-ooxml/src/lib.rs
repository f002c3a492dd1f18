pub mod arena;
pub mod error;
pub mod package;
pub mod reader;
pub mod rewriter;

pub use arena::{local_name, Arena, NodeKind};
pub use docx_core::NodeRef;
pub use error::{OoxmlError, Result};
pub use package::Package;
pub use reader::{enumerate_blocks, enumerate_header_footer_parts, enumerate_runs, style_signature, HeaderFooterPart};
pub use rewriter::{
    apply_brand_color, apply_strike, ensure_rpr, mark_paragraph_mark_deleted, mark_paragraph_mark_inserted,
    split_run_at_boundary, synth_runs_for_range, wrap_with_del, wrap_with_ins, wrap_with_move_from, wrap_with_move_to,
    EditKind, RevisionStamp, COLOR_DELETE_HEX, COLOR_INSERT_HEX, COLOR_MOVE_HEX,
};
