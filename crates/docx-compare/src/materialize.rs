//! Drives the OOXML rewriter (C5) from the opcodes and move pairs produced
//! by C3/C4: splits original runs to opcode boundaries, wraps deletions (or
//! reclassifies them as `moveFrom`), and synthesizes + wraps insertions (or
//! `moveTo`) from the modified paragraph's runs.

use docx_core::{ParagraphInfo, RunInfo};
use docx_ooxml::{
    mark_paragraph_mark_deleted, mark_paragraph_mark_inserted, split_run_at_boundary, synth_runs_for_range,
    wrap_with_del, wrap_with_ins, wrap_with_move_from, wrap_with_move_to, Arena, NodeRef, RevisionStamp, Result as OoxmlResult,
};

use crate::align::{OpTag, Opcode};

/// A half-open character range within one paragraph's text claimed by the
/// move detector, tagged with the shared `w:id` of its move pair.
#[derive(Debug, Clone, Copy)]
pub struct ClaimedRange {
    pub start: usize,
    pub end: usize,
    pub move_id: u64,
}

fn move_id_covering(claims: &[ClaimedRange], start: usize, end: usize) -> Option<u64> {
    claims.iter().find(|c| c.start <= start && end <= c.end).map(|c| c.move_id)
}

/// One tracked run still covering a contiguous slice of the paragraph's
/// original text, re-sliced as runs get split to opcode boundaries.
struct RunSlot {
    xml_ref: NodeRef,
    start: usize,
    end: usize,
}

/// Split `runs` in place within `arena` so every delete/equal opcode
/// boundary falls exactly on a run boundary. Insert opcodes have
/// `o_start == o_end` and never need a boundary of their own — they fall on
/// a boundary already produced by their neighboring delete/equal opcode.
fn split_to_boundaries(arena: &mut Arena, para: NodeRef, runs: &[RunInfo], opcodes: &[Opcode]) -> Vec<RunSlot> {
    let mut slots: Vec<RunSlot> = runs
        .iter()
        .map(|r| RunSlot {
            xml_ref: r.xml_ref,
            start: r.start_pos,
            end: r.start_pos + r.text.chars().count(),
        })
        .collect();

    let mut boundaries: Vec<usize> = opcodes
        .iter()
        .filter(|op| op.tag != OpTag::Insert)
        .flat_map(|op| [op.o_start, op.o_end])
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    for boundary in boundaries {
        if let Some(idx) = slots.iter().position(|s| s.start < boundary && boundary < s.end) {
            let local = boundary - slots[idx].start;
            let right = split_run_at_boundary(arena, slots[idx].xml_ref, local);
            match arena.child_index(slots[idx].xml_ref) {
                Some(pos) => arena.insert_child_at(para, pos + 1, right),
                None => arena.append_child(para, right),
            }
            let old_end = slots[idx].end;
            slots[idx].end = boundary;
            slots.insert(idx + 1, RunSlot { xml_ref: right, start: boundary, end: old_end });
        }
    }
    slots
}

fn slots_in_range(slots: &[RunSlot], start: usize, end: usize) -> Vec<NodeRef> {
    slots
        .iter()
        .filter(|s| s.start >= start && s.end <= end && s.end > s.start)
        .map(|s| s.xml_ref)
        .collect()
}

fn insertion_anchor(arena: &Arena, para: NodeRef, slots: &[RunSlot], o_pos: usize) -> usize {
    match slots.iter().find(|s| s.start == o_pos) {
        Some(s) => arena.child_index(s.xml_ref).unwrap_or_else(|| arena.children(para).len()),
        None => arena.children(para).len(),
    }
}

/// Rewriter operations applied to one matched paragraph pair, split by
/// category; a claimed (moved) span contributes to `moved`, never to
/// `inserted`/`deleted`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairOutcome {
    pub inserted: usize,
    pub deleted: usize,
    pub moved: usize,
}

impl PairOutcome {
    pub fn op_count(&self) -> usize {
        self.inserted + self.deleted + self.moved
    }
}

/// Apply one matched paragraph pair's run-level opcodes to the original
/// paragraph's tree in place (§4.5). Processes opcodes back-to-front so an
/// earlier insertion never invalidates a not-yet-processed anchor.
pub fn materialize_pair(
    arena: &mut Arena,
    para: NodeRef,
    orig: &ParagraphInfo,
    modified: &ParagraphInfo,
    opcodes: &[Opcode],
    deleted_claims: &[ClaimedRange],
    inserted_claims: &[ClaimedRange],
    stamp: &RevisionStamp,
    force_brand_colors: bool,
) -> OoxmlResult<PairOutcome> {
    let slots = split_to_boundaries(arena, para, &orig.runs, opcodes);
    let mut outcome = PairOutcome::default();

    for op in opcodes.iter().rev() {
        match op.tag {
            OpTag::Equal => {}
            OpTag::Delete => {
                for r in slots_in_range(&slots, op.o_start, op.o_end) {
                    match move_id_covering(deleted_claims, op.o_start, op.o_end) {
                        Some(id) => {
                            wrap_with_move_from(arena, r, stamp, id, force_brand_colors);
                            outcome.moved += 1;
                        }
                        None => {
                            wrap_with_del(arena, r, stamp, force_brand_colors);
                            outcome.deleted += 1;
                        }
                    }
                }
            }
            OpTag::Insert => {
                let new_runs = synth_runs_for_range(arena, modified, op.m_start, op.m_end)?;
                let insert_at = insertion_anchor(arena, para, &slots, op.o_start);
                for (offset, run) in new_runs.into_iter().enumerate() {
                    arena.insert_child_at(para, insert_at + offset, run);
                    match move_id_covering(inserted_claims, op.m_start, op.m_end) {
                        Some(id) => {
                            wrap_with_move_to(arena, run, stamp, id, force_brand_colors);
                            outcome.moved += 1;
                        }
                        None => {
                            wrap_with_ins(arena, run, stamp, force_brand_colors);
                            outcome.inserted += 1;
                        }
                    }
                }
            }
        }
    }

    Ok(outcome)
}

/// Wrap a wholesale-deleted paragraph's entire content in `<w:del>` (or
/// `<w:moveFrom>` when claimed by the move detector) and mark its paragraph
/// mark deleted.
pub fn materialize_whole_delete(
    arena: &mut Arena,
    para_node: NodeRef,
    move_id: Option<u64>,
    stamp: &RevisionStamp,
    force_brand_colors: bool,
) {
    match move_id {
        Some(id) => {
            wrap_with_move_from(arena, para_node, stamp, id, force_brand_colors);
        }
        None => {
            wrap_with_del(arena, para_node, stamp, force_brand_colors);
            mark_paragraph_mark_deleted(arena, para_node, stamp);
        }
    }
}

/// Insert a clone of a wholesale-new modified paragraph into `dest` at
/// `insert_at` within `dest_root`, wrapped in `<w:ins>` (or `<w:moveTo>` when
/// claimed), and return the new node.
pub fn materialize_whole_insert(
    dest: &mut Arena,
    mod_arena: &Arena,
    mod_para_node: NodeRef,
    dest_root: NodeRef,
    insert_at: usize,
    move_id: Option<u64>,
    stamp: &RevisionStamp,
    force_brand_colors: bool,
) -> NodeRef {
    let new_p = dest.clone_subtree_from(mod_arena, mod_para_node);
    dest.insert_child_at(dest_root, insert_at, new_p);
    match move_id {
        Some(id) => {
            wrap_with_move_to(dest, new_p, stamp, id, force_brand_colors);
        }
        None => {
            wrap_with_ins(dest, new_p, stamp, force_brand_colors);
            mark_paragraph_mark_inserted(dest, new_p, stamp);
        }
    }
    new_p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_runs;

    fn paragraph_with_run(arena: &mut Arena, text: &str) -> (NodeRef, ParagraphInfo) {
        let p = arena.alloc_element("w:p", Vec::new());
        let r = arena.alloc_element("w:r", Vec::new());
        let t = arena.alloc_element("w:t", Vec::new());
        let tn = arena.alloc_text(text.to_string());
        arena.append_child(t, tn);
        arena.append_child(r, t);
        arena.append_child(p, r);
        let info = ParagraphInfo {
            text: text.to_string(),
            normalized: docx_core::normalize_for_compare(text),
            runs: vec![RunInfo { text: text.to_string(), rpr: None, start_pos: 0, xml_ref: r }],
            style_sig: "sig".to_string(),
            path: docx_core::ParaPath { section_idx: 0, block_idx: 0, paragraph_idx: 0 },
            cell: None,
            xml_ref: p,
        };
        (p, info)
    }

    #[test]
    fn materialize_pair_marks_inserted_word_without_touching_unchanged_text() {
        let mut arena = Arena::new();
        arena.root = Some(arena.alloc_element("w:document", Vec::new()));
        let (p, orig) = paragraph_with_run(&mut arena, "The quick fox");
        let modified = ParagraphInfo {
            text: "The quick brown fox".to_string(),
            normalized: docx_core::normalize_for_compare("The quick brown fox"),
            runs: vec![RunInfo {
                text: "The quick brown fox".to_string(),
                rpr: None,
                start_pos: 0,
                xml_ref: 0,
            }],
            style_sig: "sig".to_string(),
            path: docx_core::ParaPath { section_idx: 0, block_idx: 0, paragraph_idx: 0 },
            cell: None,
            xml_ref: 0,
        };
        let opcodes = align_runs(&orig.text, &modified.text);
        let stamp = RevisionStamp::new("Tester");
        let outcome = materialize_pair(&mut arena, p, &orig, &modified, &opcodes, &[], &[], &stamp, false).unwrap();
        assert!(outcome.inserted >= 1);
        assert!(arena.find_child(p, "ins").is_some());
    }

    #[test]
    fn whole_delete_wraps_paragraph_and_marks_mark_deleted() {
        let mut arena = Arena::new();
        arena.root = Some(arena.alloc_element("w:document", Vec::new()));
        let body = arena.alloc_element("w:body", Vec::new());
        arena.append_child(arena.root.unwrap(), body);
        let (p, _) = paragraph_with_run(&mut arena, "gone");
        arena.append_child(body, p);

        let stamp = RevisionStamp::new("Tester");
        materialize_whole_delete(&mut arena, p, None, &stamp, false);

        let wrapper = arena.children(body)[0];
        assert!(arena.is_element(wrapper, "del"));
        let inner_p = arena.children(wrapper)[0];
        let ppr = arena.find_child(inner_p, "pPr").unwrap();
        let rpr = arena.find_child(ppr, "rPr").unwrap();
        assert!(arena.find_child(rpr, "del").is_some());
    }
}
