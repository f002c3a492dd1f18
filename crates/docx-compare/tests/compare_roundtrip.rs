//! End-to-end exercise of `compare_ooxml` over two in-memory packages,
//! doubling as the test-harness entry point that installs a `tracing`
//! subscriber for the whole crate's test binary (§10.3).

use std::collections::HashMap;
use std::sync::Once;

use docx_core::CompareOptions;
use docx_ooxml::{Arena, Package};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static INIT_TRACING: Once = Once::new();

/// Install an `EnvFilter`-driven subscriber once per test binary, the way a
/// CLI entry point would at `main()`. Respects `RUST_LOG`; defaults to
/// silent so a normal `cargo test` run stays quiet.
fn init_tracing() {
    INIT_TRACING.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "off".into()))
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}

fn package_from_document_xml(xml: &str) -> Package {
    Package {
        parts: HashMap::new(),
        main_part_name: "word/document.xml".to_string(),
        document: Arena::parse(xml.as_bytes()).expect("well-formed test fixture"),
    }
}

const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

#[test]
fn compare_ooxml_reports_an_insertion_and_round_trips_bytes() {
    init_tracing();

    let original = package_from_document_xml(&format!(
        r#"<w:document {NS}><w:body><w:p><w:r><w:t>The quick fox</w:t></w:r></w:p></w:body></w:document>"#
    ));
    let modified = package_from_document_xml(&format!(
        r#"<w:document {NS}><w:body><w:p><w:r><w:t>The quick brown fox</w:t></w:r></w:p></w:body></w:document>"#
    ));

    let original_bytes = original.to_bytes().unwrap();
    let modified_bytes = modified.to_bytes().unwrap();

    let result = docx_compare::compare_ooxml(&original_bytes, &modified_bytes, &CompareOptions::default()).unwrap();

    assert!(result.stats.insertions >= 1);
    assert_eq!(result.stats.deletions, 0);
    assert!(!result.document_bytes.is_empty());

    let rewritten = Package::read(&result.document_bytes).unwrap();
    let root = rewritten.document.root.unwrap();
    assert!(rewritten.document.is_element(root, "document"));
}

#[test]
fn compare_ooxml_rejects_invalid_options() {
    init_tracing();

    let original = package_from_document_xml(&format!(r#"<w:document {NS}><w:body/></w:document>"#));
    let modified = package_from_document_xml(&format!(r#"<w:document {NS}><w:body/></w:document>"#));
    let original_bytes = original.to_bytes().unwrap();
    let modified_bytes = modified.to_bytes().unwrap();

    let mut options = CompareOptions::default();
    options.jaccard_threshold = 2.0;

    assert!(docx_compare::compare_ooxml(&original_bytes, &modified_bytes, &options).is_err());
}
