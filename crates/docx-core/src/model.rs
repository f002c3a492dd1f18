use serde::{Deserialize, Serialize};

/// Opaque handle into an XML node arena.
///
/// The compare/align layers never dereference this themselves — it is only
/// ever round-tripped back into the OOXML reader/rewriter that minted it, so
/// a plain arena index is enough and keeps `docx-core` free of any XML
/// dependency.
pub type NodeRef = usize;

// ---------------------------------------------------------------------------
// BlockKind
// ---------------------------------------------------------------------------

/// Structural role of a top-level body child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Table,
    SectionBoundary,
    Header,
    Footer,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Table => "table",
            BlockKind::SectionBoundary => "section-boundary",
            BlockKind::Header => "header",
            BlockKind::Footer => "footer",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ParaPath
// ---------------------------------------------------------------------------

/// Document-order address of a paragraph: `(section_idx, block_idx, paragraph_idx)`.
///
/// Unique and total-ordered within a package (invariant 2, §3): derived
/// `Ord` compares lexicographically, which matches document order because
/// `section_idx`/`block_idx`/`paragraph_idx` are all assigned in a single
/// forward walk over the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParaPath {
    pub section_idx: usize,
    pub block_idx: usize,
    pub paragraph_idx: usize,
}

impl std::fmt::Display for ParaPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.section_idx, self.block_idx, self.paragraph_idx)
    }
}

/// `{row, col}` metadata recorded on paragraphs that came from a table cell,
/// per §4.2 ("tables...flatten all cell paragraphs in row-major order, each
/// carrying `{row, col}`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCellRef {
    pub row: usize,
    pub col: usize,
}

// ---------------------------------------------------------------------------
// RunInfo
// ---------------------------------------------------------------------------

/// A single OOXML run (`<w:r>`), decomposed into its visible text and the
/// verbatim serialization of its run-properties subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    /// Visible characters. Tab/break/symbol children are preserved as a
    /// one-character sentinel (§4.2) so text length invariants still hold.
    pub text: String,
    /// Verbatim `<w:rPr>` XML, or `None` when the run carries no properties.
    /// Opaque to the aligner (invariant 3, §3) — only the rewriter reads it.
    pub rpr: Option<String>,
    /// Character offset within the owning paragraph's `text`.
    pub start_pos: usize,
    /// Handle to the underlying `<w:r>` node in the source package's arena.
    pub xml_ref: NodeRef,
}

// ---------------------------------------------------------------------------
// ParagraphInfo
// ---------------------------------------------------------------------------

/// A single paragraph (`<w:p>`), decomposed into text, runs, and a
/// formatting fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphInfo {
    /// Concatenated visible text of every run.
    pub text: String,
    /// Whitespace-collapsed, lowercased form used only for match keys.
    pub normalized: String,
    /// Ordered runs; concatenating `.text` reproduces `text` exactly
    /// (invariant 1, §3).
    pub runs: Vec<RunInfo>,
    /// SHA-1 fingerprint of paragraph-level formatting (§4.2).
    pub style_sig: String,
    /// Document-order address, unique within the package.
    pub path: ParaPath,
    /// `Some` when this paragraph is a flattened table-cell paragraph.
    pub cell: Option<TableCellRef>,
    /// Handle to the underlying `<w:p>` node.
    pub xml_ref: NodeRef,
}

impl ParagraphInfo {
    /// Verify invariant 1 (§3): run texts concatenate back to `text` and
    /// `start_pos` offsets are prefix sums. Used by tests and by the
    /// reader's own self-checks; not required on the hot path.
    pub fn check_invariants(&self) -> bool {
        let mut expected_pos = 0usize;
        let mut concatenated = String::new();
        for run in &self.runs {
            if run.start_pos != expected_pos {
                return false;
            }
            concatenated.push_str(&run.text);
            expected_pos += run.text.chars().count();
        }
        concatenated == self.text
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A top-level body child: a paragraph, a table (pre-flattened into its
/// constituent cell paragraphs), a section boundary, or a header/footer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    /// Zero-based position among siblings, in document order.
    pub block_idx: usize,
    /// Paragraphs owned by this block. Empty for `SectionBoundary`.
    pub paragraphs: Vec<ParagraphInfo>,
    /// Handle to the underlying body-child node (`<w:p>`, `<w:tbl>`, or
    /// `<w:sectPr>`).
    pub xml_ref: NodeRef,
}
