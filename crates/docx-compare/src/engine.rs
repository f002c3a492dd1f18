//! Top-level orchestration (§5): reader (C2) -> align (C3) -> move-detect
//! (C4) -> rewriter (C5), run once over the whole document body and once
//! per header/footer part.

use docx_core::{BlockKind, CompareError, CompareOptions, ParaPath, ParagraphInfo, Result as CoreResult};
use docx_ooxml::{enumerate_blocks, enumerate_header_footer_parts, Arena, NodeRef, Package, RevisionStamp};
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::align::{align_paragraphs, align_runs, Opcode};
use crate::materialize::{materialize_pair, materialize_whole_delete, materialize_whole_insert, ClaimedRange, PairOutcome};
use crate::move_detect::{collect_delete_spans, collect_insert_spans, detect_moves, MovePair, Span};
use crate::result::{CompareMeta, CompareResult, CompareStats};

/// Run the whole pipeline over two complete `.docx` byte buffers and produce
/// a rewritten original package plus summary statistics (§6).
#[instrument(skip(original_bytes, modified_bytes, options), fields(author = %options.author))]
pub fn compare_ooxml(original_bytes: &[u8], modified_bytes: &[u8], options: &CompareOptions) -> CoreResult<CompareResult> {
    options.validate()?;

    let mut orig_pkg = Package::read(original_bytes)?;
    let mod_pkg = Package::read(modified_bytes)?;

    let stamp = RevisionStamp::new(options.author.clone());
    let mut warnings = Vec::new();
    let mut total_insertions = 0usize;
    let mut total_deletions = 0usize;
    let mut total_moves = 0usize;
    let mut total_op_count = 0usize;
    let mut all_pairs: Vec<(i64, i64)> = Vec::new();

    // --- Main document body -------------------------------------------------
    let orig_blocks = enumerate_blocks(&orig_pkg)?;
    let mod_blocks = enumerate_blocks(&mod_pkg)?;
    let orig_paragraphs = flatten_paragraphs(&orig_blocks);
    let mod_paragraphs = flatten_paragraphs(&mod_blocks);

    let body = find_element(&orig_pkg.document, "body")
        .ok_or_else(|| CompareError::Internal("original document has no <w:body>".to_string()))?;

    let outcome = process_domain(
        &mut orig_pkg.document,
        body,
        &orig_paragraphs,
        &mod_paragraphs,
        &mod_pkg.document,
        &stamp,
        options,
    )?;
    info!(
        insertions = outcome.insertions,
        deletions = outcome.deletions,
        moves = outcome.moves,
        "compared document body"
    );
    total_insertions += outcome.insertions;
    total_deletions += outcome.deletions;
    total_moves += outcome.moves;
    total_op_count += outcome.op_count;
    warnings.extend(outcome.warnings);
    all_pairs.extend(outcome.pairs);

    // --- Header/footer parts -------------------------------------------------
    let orig_parts = enumerate_header_footer_parts(&orig_pkg)?;
    let mut mod_parts = enumerate_header_footer_parts(&mod_pkg)?;

    for mut orig_part in orig_parts {
        let Some(pos) = mod_parts.iter().position(|p| p.name == orig_part.name) else {
            warnings.push(format!("{}: present in original only, left unchanged", orig_part.name));
            continue;
        };
        let mod_part = mod_parts.remove(pos);

        let orig_paragraphs = flatten_paragraphs(&orig_part.blocks);
        let mod_paragraphs = flatten_paragraphs(&mod_part.blocks);
        let Some(root) = orig_part.arena.root else {
            warnings.push(format!("{}: no root element, skipped", orig_part.name));
            continue;
        };

        let outcome = process_domain(
            &mut orig_part.arena,
            root,
            &orig_paragraphs,
            &mod_paragraphs,
            &mod_part.arena,
            &stamp,
            options,
        )?;
        total_insertions += outcome.insertions;
        total_deletions += outcome.deletions;
        total_moves += outcome.moves;
        total_op_count += outcome.op_count;
        warnings.extend(outcome.warnings);

        let bytes = orig_part.arena.to_xml_bytes()?;
        orig_pkg.parts.insert(orig_part.name.clone(), bytes);
    }
    for leftover in mod_parts {
        warnings.push(format!("{}: present in modified only, not added", leftover.name));
    }

    let document_bytes = orig_pkg.to_bytes()?;

    Ok(CompareResult {
        document_bytes,
        stats: CompareStats::new(total_insertions, total_deletions, total_moves),
        meta: CompareMeta {
            pairs: all_pairs,
            operation_count: total_op_count,
            warnings,
        },
    })
}

struct DomainOutcome {
    insertions: usize,
    deletions: usize,
    moves: usize,
    op_count: usize,
    warnings: Vec<String>,
    pairs: Vec<(i64, i64)>,
}

/// Flatten a block sequence's paragraphs, preserving document order
/// (table-cell paragraphs appear inline at their block's position).
fn flatten_paragraphs(blocks: &[docx_core::Block]) -> Vec<ParagraphInfo> {
    blocks
        .iter()
        .filter(|b| b.kind != BlockKind::SectionBoundary)
        .flat_map(|b| b.paragraphs.iter().cloned())
        .collect()
}

fn find_element(arena: &Arena, local: &str) -> Option<NodeRef> {
    let root = arena.root?;
    if arena.is_element(root, local) {
        return Some(root);
    }
    arena.find_child(root, local)
}

fn whole_span(path: ParaPath, text: &str) -> Span {
    Span {
        owning_paragraph: path,
        tokens: crate::tokenize::tokenize_preserve_spacing(text),
        char_start: 0,
        char_end: text.chars().count(),
    }
}

fn claims_for(moves: &[(MovePair, u64)], side_is_delete: bool, path: ParaPath) -> Vec<ClaimedRange> {
    moves
        .iter()
        .filter(|(mv, _)| if side_is_delete { mv.del.owning_paragraph == path } else { mv.ins.owning_paragraph == path })
        .map(|(mv, id)| {
            let span = if side_is_delete { &mv.del } else { &mv.ins };
            ClaimedRange { start: span.char_start, end: span.char_end, move_id: *id }
        })
        .collect()
}

/// Run C3 (paragraph align + per-pair run align), C4 (move detection), and
/// C5 (rewriting) over one paragraph-bearing domain: the document body, or
/// one header/footer part.
#[instrument(skip_all)]
fn process_domain(
    dest: &mut Arena,
    dest_root: NodeRef,
    orig_paragraphs: &[ParagraphInfo],
    mod_paragraphs: &[ParagraphInfo],
    mod_arena: &Arena,
    stamp: &RevisionStamp,
    options: &CompareOptions,
) -> CoreResult<DomainOutcome> {
    let pairs = align_paragraphs(orig_paragraphs, mod_paragraphs);

    // §5: run-level opcode computation for every matched pair is independent
    // and runs in parallel; `.collect()` on a rayon ParallelIterator
    // preserves input order, so move detection below still sees a
    // deterministic, document-ordered sequence.
    let opcodes_by_pair: Vec<Option<Vec<Opcode>>> = pairs
        .par_iter()
        .map(|pair| match (pair.orig, pair.modified) {
            (Some(oi), Some(mi)) => Some(align_runs(&orig_paragraphs[oi].text, &mod_paragraphs[mi].text)),
            _ => None,
        })
        .collect();

    let mut deletions = Vec::new();
    let mut insertions = Vec::new();
    let mut warnings = Vec::new();

    for (pair, opcodes) in pairs.iter().zip(&opcodes_by_pair) {
        match (pair.orig, pair.modified, opcodes) {
            (Some(oi), Some(mi), Some(ops)) => {
                let orig = &orig_paragraphs[oi];
                let modified = &mod_paragraphs[mi];
                deletions.extend(collect_delete_spans(orig.path, &orig.text, ops));
                insertions.extend(collect_insert_spans(modified.path, &modified.text, ops));
            }
            (Some(oi), None, _) => {
                deletions.push(whole_span(orig_paragraphs[oi].path, &orig_paragraphs[oi].text));
            }
            (None, Some(mi), _) => {
                insertions.push(whole_span(mod_paragraphs[mi].path, &mod_paragraphs[mi].text));
            }
            _ => {}
        }
    }

    let move_pairs = detect_moves(deletions, insertions, options.shingle_size, options.jaccard_threshold, options.min_move_span_tokens);
    let moves: Vec<(MovePair, u64)> = move_pairs.into_iter().enumerate().map(|(i, mv)| (mv, i as u64)).collect();
    let move_count = moves.len();

    let mut op_count = 0usize;
    let mut insert_count = 0usize;
    let mut delete_count = 0usize;
    let mut cursor: Option<NodeRef> = None;
    let mut out_pairs = Vec::with_capacity(pairs.len());

    for (pair, opcodes) in pairs.iter().zip(&opcodes_by_pair) {
        out_pairs.push((
            pair.orig.map(|i| i as i64).unwrap_or(-1),
            pair.modified.map(|i| i as i64).unwrap_or(-1),
        ));

        match (pair.orig, pair.modified, opcodes) {
            (Some(oi), Some(mi), Some(ops)) => {
                let orig = &orig_paragraphs[oi];
                let modified = &mod_paragraphs[mi];
                let deleted_claims = claims_for(&moves, true, orig.path);
                let inserted_claims = claims_for(&moves, false, modified.path);
                let outcome: PairOutcome =
                    materialize_pair(dest, orig.xml_ref, orig, modified, ops, &deleted_claims, &inserted_claims, stamp, options.force_brand_colors)?;
                op_count += outcome.op_count();
                insert_count += outcome.inserted;
                delete_count += outcome.deleted;
                if orig.cell.is_none() {
                    cursor = Some(orig.xml_ref);
                }
            }
            (Some(oi), None, _) => {
                let orig = &orig_paragraphs[oi];
                let claimed = claims_for(&moves, true, orig.path).first().map(|c| c.move_id);
                if claimed.is_none() {
                    delete_count += 1;
                }
                materialize_whole_delete(dest, orig.xml_ref, claimed, stamp, options.force_brand_colors);
                op_count += 1;
                if orig.cell.is_none() {
                    cursor = Some(orig.xml_ref);
                }
            }
            (None, Some(mi), _) => {
                let modified = &mod_paragraphs[mi];
                if modified.cell.is_some() {
                    warnings.push(format!(
                        "{}: new paragraph inside a table cell was not materialized (out of scope for this pass)",
                        modified.path
                    ));
                    continue;
                }
                let claimed = claims_for(&moves, false, modified.path).first().map(|c| c.move_id);
                if claimed.is_none() {
                    insert_count += 1;
                }
                let insert_at = match cursor {
                    Some(anchor) => dest.child_index(anchor).map(|i| i + 1).unwrap_or(dest.children(dest_root).len()),
                    None => 0,
                };
                let new_node = materialize_whole_insert(dest, mod_arena, modified.xml_ref, dest_root, insert_at, claimed, stamp, options.force_brand_colors);
                op_count += 1;
                cursor = Some(new_node);
            }
            _ => {}
        }
    }

    if move_count == 0 && (insert_count > 0 || delete_count > 0) {
        warn!(insert_count, delete_count, "no moves detected in this domain despite edits");
    }

    Ok(DomainOutcome {
        insertions: insert_count,
        deletions: delete_count,
        moves: move_count,
        op_count,
        warnings,
        pairs: out_pairs,
    })
}
