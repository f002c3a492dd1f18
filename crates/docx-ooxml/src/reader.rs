//! C2: decomposes a [`Package`]'s main document tree — and, separately, its
//! header/footer parts — into [`Block`]s of [`ParagraphInfo`].

use docx_core::{sha1_hex, normalize_for_compare, Block, BlockKind, NodeRef, ParaPath, ParagraphInfo, RunInfo, TableCellRef};

use crate::arena::Arena;
use crate::error::{OoxmlError, Result};
use crate::package::Package;

/// Symbol (`<w:sym>`) children have no natural text; they stand in for a
/// single glyph selected by font + character code, so we record them as the
/// Unicode object-replacement character. The rewriter never needs to
/// interpret this sentinel — only to keep it intact across a split/wrap.
pub(crate) const SENTINEL_SYMBOL: char = '\u{FFFC}';

/// Wrapper elements a run may be nested under without losing its identity as
/// a run. A document that already carries tracked changes nests `<w:r>`
/// inside `<w:ins>`/`<w:del>`/`<w:moveFrom>`/`<w:moveTo>`; hyperlinks, smart
/// tags, and simple fields wrap runs too. Existing revisions are passed
/// through unchanged, not interpreted, so we only need to see past them.
const RUN_CONTAINER_WRAPPERS: &[&str] = &["ins", "del", "moveFrom", "moveTo", "hyperlink", "smartTag", "fldSimple"];

/// Walk the main document body's direct children, in document order.
///
/// Paragraphs become single-paragraph [`Block`]s; tables flatten every cell
/// paragraph, row-major, into one table [`Block`]; `<w:sectPr>` children
/// become empty `SectionBoundary` blocks and advance the running section
/// index for everything that follows.
pub fn enumerate_blocks(pkg: &Package) -> Result<Vec<Block>> {
    let arena = &pkg.document;
    let root = arena.root.ok_or_else(|| OoxmlError::MalformedXml("document part has no root element".to_string()))?;
    let body = arena
        .find_child(root, "body")
        .ok_or_else(|| OoxmlError::MalformedXml("document part has no <w:body>".to_string()))?;

    let mut blocks = Vec::new();
    let mut section_idx = 0usize;

    for (block_idx, &child) in arena.children(body).iter().enumerate() {
        match arena.local_name_of(child) {
            Some("p") => {
                let para = build_paragraph(arena, child, section_idx, block_idx, 0, None)?;
                blocks.push(Block {
                    kind: BlockKind::Paragraph,
                    block_idx,
                    paragraphs: vec![para],
                    xml_ref: child,
                });
            }
            Some("tbl") => {
                let mut paragraphs = Vec::new();
                let mut paragraph_idx = 0usize;
                for (row, tr) in arena.find_children(child, "tr").enumerate() {
                    for (col, tc) in arena.find_children(tr, "tc").enumerate() {
                        for p in arena.find_children(tc, "p") {
                            let cell = Some(TableCellRef { row, col });
                            let info = build_paragraph(arena, p, section_idx, block_idx, paragraph_idx, cell)?;
                            paragraphs.push(info);
                            paragraph_idx += 1;
                        }
                    }
                }
                blocks.push(Block {
                    kind: BlockKind::Table,
                    block_idx,
                    paragraphs,
                    xml_ref: child,
                });
            }
            Some("sectPr") => {
                blocks.push(Block {
                    kind: BlockKind::SectionBoundary,
                    block_idx,
                    paragraphs: Vec::new(),
                    xml_ref: child,
                });
                section_idx += 1;
            }
            // Bookmarks, proof errors, and other body-level markers carry no
            // comparable content and are left out of the block sequence;
            // they stay in the tree untouched and are re-serialized as-is.
            _ => {}
        }
    }

    Ok(blocks)
}

/// A header or footer part, enumerated separately from the body. Its block
/// indices are local to the part and therefore disjoint from the body's.
pub struct HeaderFooterPart {
    pub name: String,
    pub kind: BlockKind,
    pub arena: Arena,
    pub blocks: Vec<Block>,
}

/// Parse and enumerate every `word/header*.xml` / `word/footer*.xml` part
/// referenced by the package, in a stable (name-sorted) order.
pub fn enumerate_header_footer_parts(pkg: &Package) -> Result<Vec<HeaderFooterPart>> {
    let mut names: Vec<&String> = pkg
        .parts
        .keys()
        .filter(|name| {
            let local = name.rsplit('/').next().unwrap_or(name.as_str());
            name.starts_with("word/")
                && !name.contains("_rels")
                && local.ends_with(".xml")
                && (local.starts_with("header") || local.starts_with("footer"))
        })
        .collect();
    names.sort();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let bytes = &pkg.parts[name];
        let arena = Arena::parse(bytes)?;
        let kind = if name.contains("header") { BlockKind::Header } else { BlockKind::Footer };
        let root = arena
            .root
            .ok_or_else(|| OoxmlError::MalformedXml(format!("{name}: no root element")))?;

        let mut blocks = Vec::new();
        for (block_idx, p) in arena.find_children(root, "p").enumerate() {
            let info = build_paragraph(&arena, p, 0, block_idx, 0, None)?;
            blocks.push(Block {
                kind,
                block_idx,
                paragraphs: vec![info],
                xml_ref: p,
            });
        }
        out.push(HeaderFooterPart {
            name: name.clone(),
            kind,
            arena,
            blocks,
        });
    }
    Ok(out)
}

fn build_paragraph(
    arena: &Arena,
    p: NodeRef,
    section_idx: usize,
    block_idx: usize,
    paragraph_idx: usize,
    cell: Option<TableCellRef>,
) -> Result<ParagraphInfo> {
    let mut runs = enumerate_runs(arena, p)?;
    let mut text = String::new();
    let mut pos = 0usize;
    for run in &mut runs {
        run.start_pos = pos;
        pos += run.text.chars().count();
        text.push_str(&run.text);
    }

    Ok(ParagraphInfo {
        normalized: normalize_for_compare(&text),
        text,
        runs,
        style_sig: style_signature(arena, p),
        path: ParaPath {
            section_idx,
            block_idx,
            paragraph_idx,
        },
        cell,
        xml_ref: p,
    })
}

/// Collect every `<w:r>` owned by `para`, in document order, descending
/// through revision/hyperlink wrappers but not into nested content (tables
/// within a text box, for example, are out of scope for §1's Non-goals).
pub fn enumerate_runs(arena: &Arena, para: NodeRef) -> Result<Vec<RunInfo>> {
    let mut out = Vec::new();
    collect_runs(arena, para, &mut out)?;
    Ok(out)
}

fn collect_runs(arena: &Arena, node: NodeRef, out: &mut Vec<RunInfo>) -> Result<()> {
    for &child in arena.children(node) {
        match arena.local_name_of(child) {
            Some("r") => out.push(build_run(arena, child)?),
            Some(name) if RUN_CONTAINER_WRAPPERS.contains(&name) => collect_runs(arena, child, out)?,
            _ => {}
        }
    }
    Ok(())
}

fn build_run(arena: &Arena, r: NodeRef) -> Result<RunInfo> {
    let rpr = arena
        .find_child(r, "rPr")
        .map(|n| arena.serialize_subtree(n))
        .transpose()?;

    let mut text = String::new();
    for &child in arena.children(r) {
        match arena.local_name_of(child) {
            Some("t") | Some("delText") => text.push_str(&arena.text_content(child)),
            Some("tab") => text.push('\t'),
            Some("br") | Some("cr") => text.push('\n'),
            Some("sym") => text.push(SENTINEL_SYMBOL),
            _ => {}
        }
    }

    Ok(RunInfo {
        text,
        rpr,
        start_pos: 0,
        xml_ref: r,
    })
}

/// SHA-1 over the sorted, pipe-joined paragraph-level formatting properties
/// (§4.2): style id, numbering id/level, left/right indent, justification,
/// each `null` when absent.
pub fn style_signature(arena: &Arena, para: NodeRef) -> String {
    let ppr = arena.find_child(para, "pPr");
    let p_style = ppr.and_then(|pp| arena.find_child(pp, "pStyle")).and_then(|n| arena.attr(n, "val"));
    let num_pr = ppr.and_then(|pp| arena.find_child(pp, "numPr"));
    let num_id = num_pr.and_then(|np| arena.find_child(np, "numId")).and_then(|n| arena.attr(n, "val"));
    let ilvl = num_pr.and_then(|np| arena.find_child(np, "ilvl")).and_then(|n| arena.attr(n, "val"));
    let ind = ppr.and_then(|pp| arena.find_child(pp, "ind"));
    let ind_left = ind.and_then(|n| arena.attr(n, "left").or_else(|| arena.attr(n, "start")));
    let ind_right = ind.and_then(|n| arena.attr(n, "right").or_else(|| arena.attr(n, "end")));
    let jc = ppr.and_then(|pp| arena.find_child(pp, "jc")).and_then(|n| arena.attr(n, "val"));

    let mut parts = vec![
        format!("pStyle:{}", p_style.unwrap_or("null")),
        format!("numId:{}", num_id.unwrap_or("null")),
        format!("ilvl:{}", ilvl.unwrap_or("null")),
        format!("indLeft:{}", ind_left.unwrap_or("null")),
        format!("indRight:{}", ind_right.unwrap_or("null")),
        format!("jc:{}", jc.unwrap_or("null")),
    ];
    parts.sort();
    sha1_hex(&parts.join("|"))
}
