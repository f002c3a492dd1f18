//! C5: injects `<w:ins>`/`<w:del>`/`<w:moveFrom>`/`<w:moveTo>` into the
//! **original** package's tree without disturbing surrounding formatting.
//!
//! Grounded in the brand-color constants and run-splitting shape of the
//! original rewriter; the opcode-driven materialization procedure itself
//! (§4.5) is new — the source it was distilled from never implemented it.

use chrono::{DateTime, Utc};
use docx_core::{NodeRef, ParagraphInfo};

use crate::arena::{local_name, Arena, NodeKind};
use crate::error::{OoxmlError, Result};
use crate::reader::SENTINEL_SYMBOL;

/// blue-800
pub const COLOR_INSERT_HEX: &str = "1e3a8a";
/// red-700
pub const COLOR_DELETE_HEX: &str = "b91c1c";
/// emerald-800
pub const COLOR_MOVE_HEX: &str = "065f46";

/// Author + timestamp stamped onto every revision wrapper emitted during one
/// rewrite pass.
#[derive(Debug, Clone)]
pub struct RevisionStamp {
    pub author: String,
    pub date: DateTime<Utc>,
}

impl RevisionStamp {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            date: Utc::now(),
        }
    }

    fn set_on(&self, arena: &mut Arena, node: NodeRef) {
        arena.set_attr(node, "w:author", self.author.clone());
        arena.set_attr(node, "w:date", self.date.to_rfc3339());
    }
}

/// Which visible-edit category a run span belongs to, independent of
/// direction — used to pick the wrapper element and (optionally) brand color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
    MoveTo,
    MoveFrom,
}

// ---------------------------------------------------------------------------
// rPr helpers
// ---------------------------------------------------------------------------

/// Find or create `<w:rPr>` as the first child of `run`.
pub fn ensure_rpr(arena: &mut Arena, run: NodeRef) -> NodeRef {
    if let Some(existing) = arena.find_child(run, "rPr") {
        return existing;
    }
    let rpr = arena.alloc_element("w:rPr", Vec::new());
    arena.insert_child_at(run, 0, rpr);
    rpr
}

/// Set (or replace) `<w:color w:val="{hex}"/>` inside `run`'s `rPr`. Additive:
/// every other property is left untouched.
pub fn apply_brand_color(arena: &mut Arena, run: NodeRef, hex: &str) {
    let rpr = ensure_rpr(arena, run);
    let color = match arena.find_child(rpr, "color") {
        Some(c) => c,
        None => {
            let c = arena.alloc_element("w:color", Vec::new());
            arena.append_child(rpr, c);
            c
        }
    };
    arena.set_attr(color, "w:val", hex.to_string());
}

/// Set `<w:strike w:val="1"/>` inside `run`'s `rPr`.
pub fn apply_strike(arena: &mut Arena, run: NodeRef) {
    let rpr = ensure_rpr(arena, run);
    let strike = match arena.find_child(rpr, "strike") {
        Some(s) => s,
        None => {
            let s = arena.alloc_element("w:strike", Vec::new());
            arena.append_child(rpr, s);
            s
        }
    };
    arena.set_attr(strike, "w:val", "1".to_string());
}

fn brand_color_for(kind: EditKind) -> &'static str {
    match kind {
        EditKind::Insert | EditKind::MoveTo => COLOR_INSERT_HEX,
        EditKind::Delete | EditKind::MoveFrom => COLOR_DELETE_HEX,
    }
}

/// Apply §4.5 step 5 to every `<w:r>` descendant of `wrapper`: brand color
/// per `kind`, plus strike-through for deletions.
fn apply_brand_colors_under(arena: &mut Arena, wrapper: NodeRef, kind: EditKind) {
    let mut runs = Vec::new();
    arena.find_descendants(wrapper, "r", &mut runs);
    let hex = brand_color_for(kind);
    for r in runs {
        apply_brand_color(arena, r, hex);
        if matches!(kind, EditKind::Delete | EditKind::MoveFrom) {
            apply_strike(arena, r);
        }
    }
}

// ---------------------------------------------------------------------------
// Run splitting
// ---------------------------------------------------------------------------

fn text_len_of(arena: &Arena, child: NodeRef) -> usize {
    match arena.local_name_of(child) {
        Some("t") | Some("delText") => arena.text_content(child).chars().count(),
        Some("tab") | Some("br") | Some("cr") | Some("sym") => 1,
        _ => 0,
    }
}

fn element_name(arena: &Arena, r: NodeRef) -> String {
    match &arena.node(r).kind {
        NodeKind::Element { name, .. } => name.clone(),
        NodeKind::Text(_) => String::new(),
    }
}

/// Split `run` at `char_offset` (measured over its own visible text).
/// Clones `rPr` into the new right half; the concatenation of the two
/// halves' text is unchanged (§4.5 invariant). `run` itself becomes the left
/// half in place; the returned node is the unattached right half, to be
/// inserted into the paragraph immediately after `run` by the caller.
pub fn split_run_at_boundary(arena: &mut Arena, run: NodeRef, char_offset: usize) -> NodeRef {
    let run_name = element_name(arena, run);
    let right_run = arena.alloc_element(run_name, Vec::new());

    if let Some(rpr) = arena.find_child(run, "rPr") {
        let rpr_clone = arena.clone_subtree(rpr);
        arena.append_child(right_run, rpr_clone);
    }

    let children: Vec<NodeRef> = arena.children(run).to_vec();
    let mut pos = 0usize;
    let mut split_idx = None;
    for (idx, &child) in children.iter().enumerate() {
        if arena.is_element(child, "rPr") {
            continue;
        }
        let len = text_len_of(arena, child);
        if pos + len > char_offset {
            split_idx = Some(idx);
            break;
        }
        pos += len;
    }

    let split_idx = match split_idx {
        Some(idx) => idx,
        None => return right_run, // boundary at/after the run's end: right half stays empty
    };

    let split_child = children[split_idx];
    let local_offset = char_offset - pos;

    match arena.local_name_of(split_child) {
        Some("t") | Some("delText") => {
            let full = arena.text_content(split_child);
            let left_text: String = full.chars().take(local_offset).collect();
            let right_text: String = full.chars().skip(local_offset).collect();

            if let Some(&text_node) = arena.children(split_child).first() {
                arena.node_mut(text_node).kind = NodeKind::Text(left_text);
            }

            if !right_text.is_empty() {
                let tag = element_name(arena, split_child);
                let right_t = arena.alloc_element(tag, Vec::new());
                let right_text_node = arena.alloc_text(right_text);
                arena.append_child(right_t, right_text_node);
                arena.append_child(right_run, right_t);
            }

            for &later in &children[split_idx + 1..] {
                arena.append_child(right_run, later);
            }
        }
        _ => {
            // Atomic one-character node (tab/break/symbol): the boundary can
            // only fall immediately before it, never inside it.
            for &later in &children[split_idx..] {
                arena.append_child(right_run, later);
            }
        }
    }

    right_run
}

// ---------------------------------------------------------------------------
// Wrapping
// ---------------------------------------------------------------------------

/// Wrap an existing, already-positioned `element` (a run or a paragraph) in
/// `<w:ins>`, in place: `element` keeps its position among its former
/// siblings, now one level deeper.
pub fn wrap_with_ins(arena: &mut Arena, element: NodeRef, stamp: &RevisionStamp, force_brand_colors: bool) -> NodeRef {
    wrap_in(arena, element, "w:ins", stamp, None, force_brand_colors.then_some(EditKind::Insert))
}

/// Wrap an existing, already-positioned `element` in `<w:del>`, converting
/// every `<w:t>` descendant to `<w:delText>` first.
pub fn wrap_with_del(arena: &mut Arena, element: NodeRef, stamp: &RevisionStamp, force_brand_colors: bool) -> NodeRef {
    convert_t_to_deltext(arena, element);
    wrap_in(arena, element, "w:del", stamp, None, force_brand_colors.then_some(EditKind::Delete))
}

/// Wrap in `<w:moveTo>`, sharing `move_id` with the paired `<w:moveFrom>`.
pub fn wrap_with_move_to(arena: &mut Arena, element: NodeRef, stamp: &RevisionStamp, move_id: u64, force_brand_colors: bool) -> NodeRef {
    wrap_in(arena, element, "w:moveTo", stamp, Some(move_id), force_brand_colors.then_some(EditKind::MoveTo))
}

/// Wrap in `<w:moveFrom>`, converting text to `delText`, sharing `move_id`.
pub fn wrap_with_move_from(arena: &mut Arena, element: NodeRef, stamp: &RevisionStamp, move_id: u64, force_brand_colors: bool) -> NodeRef {
    convert_t_to_deltext(arena, element);
    wrap_in(arena, element, "w:moveFrom", stamp, Some(move_id), force_brand_colors.then_some(EditKind::MoveFrom))
}

fn wrap_in(
    arena: &mut Arena,
    element: NodeRef,
    wrapper_tag: &str,
    stamp: &RevisionStamp,
    move_id: Option<u64>,
    brand: Option<EditKind>,
) -> NodeRef {
    let parent = arena.parent(element);
    let index = arena.child_index(element);

    let wrapper = arena.alloc_element(wrapper_tag.to_string(), Vec::new());
    stamp.set_on(arena, wrapper);
    if let Some(id) = move_id {
        arena.set_attr(wrapper, "w:id", id.to_string());
    }

    arena.append_child(wrapper, element);

    if let (Some(parent), Some(index)) = (parent, index) {
        arena.insert_child_at(parent, index, wrapper);
    }

    if let Some(kind) = brand {
        apply_brand_colors_under(arena, wrapper, kind);
    }

    wrapper
}

fn convert_t_to_deltext(arena: &mut Arena, root: NodeRef) {
    let mut ts = Vec::new();
    arena.find_descendants(root, "t", &mut ts);
    for t in ts {
        if let NodeKind::Element { name, .. } = &mut arena.node_mut(t).kind {
            rename_keeping_prefix(name, "delText");
        }
    }
}

fn rename_keeping_prefix(name: &mut String, new_local: &str) {
    let prefix_len = name.len() - local_name(name).len();
    name.truncate(prefix_len);
    name.push_str(new_local);
}

// ---------------------------------------------------------------------------
// Content synthesis from the modified tree
// ---------------------------------------------------------------------------

/// Parse a standalone `<w:rPr>…</w:rPr>` fragment (as produced by
/// [`Arena::serialize_subtree`]) and clone its root into `dest`.
fn clone_rpr_fragment(dest: &mut Arena, rpr_xml: &str) -> Result<NodeRef> {
    let fragment = Arena::parse(rpr_xml.as_bytes())?;
    let root = fragment
        .root
        .ok_or_else(|| OoxmlError::SerializationError("rPr fragment had no root".to_string()))?;
    Ok(dest.clone_subtree_from(&fragment, root))
}

fn append_literal_text(arena: &mut Arena, run: NodeRef, literal: &str) {
    if literal.is_empty() {
        return;
    }
    let t = arena.alloc_element("w:t", vec![("xml:space".to_string(), "preserve".to_string())]);
    let text_node = arena.alloc_text(literal.to_string());
    arena.append_child(t, text_node);
    arena.append_child(run, t);
}

/// Append `text` to `run`, splitting on the sentinel characters [`build_run`]
/// uses to stand in for `<w:tab>`/`<w:br>`/`<w:sym>` so each one round-trips
/// back to its dedicated element rather than a literal control character
/// embedded in a `<w:t>` (§4.2). A slice may mix sentinels and literal text
/// freely, e.g. a run synthesized across a tab boundary.
fn append_text_bearing_child(arena: &mut Arena, run: NodeRef, text: &str) {
    let mut literal_start = 0usize;
    for (byte_idx, ch) in text.char_indices() {
        let sentinel = match ch {
            '\t' => Some("w:tab"),
            '\n' => Some("w:br"),
            SENTINEL_SYMBOL => Some("w:sym"),
            _ => None,
        };
        let Some(tag) = sentinel else { continue };
        append_literal_text(arena, run, &text[literal_start..byte_idx]);
        let elem = arena.alloc_element(tag, Vec::new());
        arena.append_child(run, elem);
        literal_start = byte_idx + ch.len_utf8();
    }
    append_literal_text(arena, run, &text[literal_start..]);
}

/// Build fresh `<w:r>` nodes in `dest` covering `[m_start, m_end)` of
/// `mod_para`'s text, cloning each covering run's `rPr` from the serialized
/// fragment captured at read time. The modified tree itself is never
/// mutated — it is shared, read-only, across the parallel diff stage (§5).
pub fn synth_runs_for_range(dest: &mut Arena, mod_para: &ParagraphInfo, m_start: usize, m_end: usize) -> Result<Vec<NodeRef>> {
    let mut out = Vec::new();
    for run in &mod_para.runs {
        let run_end = run.start_pos + run.text.chars().count();
        let overlap_start = run.start_pos.max(m_start);
        let overlap_end = run_end.min(m_end);
        if overlap_start >= overlap_end {
            continue;
        }
        let local_start = overlap_start - run.start_pos;
        let local_end = overlap_end - run.start_pos;
        let slice: String = run.text.chars().skip(local_start).take(local_end - local_start).collect();

        let new_run = dest.alloc_element("w:r", Vec::new());
        if let Some(rpr_xml) = &run.rpr {
            let rpr = clone_rpr_fragment(dest, rpr_xml)?;
            dest.append_child(new_run, rpr);
        }
        append_text_bearing_child(dest, new_run, &slice);
        out.push(new_run);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Paragraph-mark revisions (§4.5, resolved Open Question (a))
// ---------------------------------------------------------------------------

fn ensure_ppr(arena: &mut Arena, para: NodeRef) -> NodeRef {
    if let Some(existing) = arena.find_child(para, "pPr") {
        return existing;
    }
    let ppr = arena.alloc_element("w:pPr", Vec::new());
    arena.insert_child_at(para, 0, ppr);
    ppr
}

fn ensure_para_mark_rpr(arena: &mut Arena, para: NodeRef) -> NodeRef {
    let ppr = ensure_ppr(arena, para);
    if let Some(existing) = arena.find_child(ppr, "rPr") {
        return existing;
    }
    let rpr = arena.alloc_element("w:rPr", Vec::new());
    arena.append_child(ppr, rpr);
    rpr
}

/// Mark the paragraph mark itself as tracked-deleted: a `<w:del>` marker
/// inside `<w:pPr>/<w:rPr>`, per the OOXML schema's dedicated shape — this is
/// the mark being deleted, not a wrapper around it like run-level `<w:del>`.
pub fn mark_paragraph_mark_deleted(arena: &mut Arena, para: NodeRef, stamp: &RevisionStamp) {
    let rpr = ensure_para_mark_rpr(arena, para);
    let marker = arena.alloc_element("w:del", Vec::new());
    stamp.set_on(arena, marker);
    arena.insert_child_at(rpr, 0, marker);
}

/// Symmetric insertion marker for a wholesale-inserted paragraph's mark.
pub fn mark_paragraph_mark_inserted(arena: &mut Arena, para: NodeRef, stamp: &RevisionStamp) {
    let rpr = ensure_para_mark_rpr(arena, para);
    let marker = arena.alloc_element("w:ins", Vec::new());
    stamp.set_on(arena, marker);
    arena.insert_child_at(rpr, 0, marker);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with_text(arena: &mut Arena, parent: NodeRef, text: &str) -> NodeRef {
        let r = arena.alloc_element("w:r", Vec::new());
        let t = arena.alloc_element("w:t", Vec::new());
        let tn = arena.alloc_text(text.to_string());
        arena.append_child(t, tn);
        arena.append_child(r, t);
        arena.append_child(parent, r);
        r
    }

    fn stamp() -> RevisionStamp {
        RevisionStamp::new("Test Author")
    }

    #[test]
    fn split_preserves_concatenated_text() {
        let mut arena = Arena::new();
        let p = arena.alloc_element("w:p", Vec::new());
        arena.root = Some(p);
        let r = run_with_text(&mut arena, p, "Hello world");

        let right = split_run_at_boundary(&mut arena, r, 5);
        arena.append_child(p, right);

        let left_text = arena.text_content(r);
        let right_text = arena.text_content(right);
        assert_eq!(format!("{left_text}{right_text}"), "Hello world");
        assert_eq!(left_text, "Hello");
        assert_eq!(right_text, " world");
    }

    #[test]
    fn split_clones_rpr_into_right_half() {
        let mut arena = Arena::new();
        let p = arena.alloc_element("w:p", Vec::new());
        arena.root = Some(p);
        let r = arena.alloc_element("w:r", Vec::new());
        let rpr = arena.alloc_element("w:rPr", Vec::new());
        let b = arena.alloc_element("w:b", Vec::new());
        arena.append_child(rpr, b);
        arena.append_child(r, rpr);
        let t = arena.alloc_element("w:t", Vec::new());
        let tn = arena.alloc_text("abcdef".to_string());
        arena.append_child(t, tn);
        arena.append_child(r, t);
        arena.append_child(p, r);

        let right = split_run_at_boundary(&mut arena, r, 3);
        assert!(arena.find_child(right, "rPr").is_some());
        assert!(arena.find_child(r, "rPr").is_some());
    }

    #[test]
    fn wrap_with_ins_sets_author_and_date() {
        let mut arena = Arena::new();
        let p = arena.alloc_element("w:p", Vec::new());
        arena.root = Some(p);
        let r = run_with_text(&mut arena, p, "added");

        let wrapper = wrap_with_ins(&mut arena, r, &stamp(), false);
        assert_eq!(arena.attr(wrapper, "author"), Some("Test Author"));
        assert!(arena.attr(wrapper, "date").is_some());
        assert!(arena.children(p).contains(&wrapper));
        assert!(arena.children(wrapper).contains(&r));
    }

    #[test]
    fn wrap_with_del_renames_t_to_deltext() {
        let mut arena = Arena::new();
        let p = arena.alloc_element("w:p", Vec::new());
        arena.root = Some(p);
        let r = run_with_text(&mut arena, p, "removed");

        wrap_with_del(&mut arena, r, &stamp(), false);
        assert!(arena.find_child(r, "t").is_none());
        assert!(arena.find_child(r, "delText").is_some());
    }

    #[test]
    fn move_pair_shares_id() {
        let mut arena = Arena::new();
        let p = arena.alloc_element("w:p", Vec::new());
        arena.root = Some(p);
        let from_run = run_with_text(&mut arena, p, "moved text");
        let to_run = run_with_text(&mut arena, p, "moved text");

        let from_wrapper = wrap_with_move_from(&mut arena, from_run, &stamp(), 7, false);
        let to_wrapper = wrap_with_move_to(&mut arena, to_run, &stamp(), 7, false);

        assert_eq!(arena.attr(from_wrapper, "id"), Some("7"));
        assert_eq!(arena.attr(to_wrapper, "id"), Some("7"));
        assert!(arena.find_child(from_run, "delText").is_some());
    }

    #[test]
    fn brand_color_is_additive_to_existing_properties() {
        let mut arena = Arena::new();
        let p = arena.alloc_element("w:p", Vec::new());
        arena.root = Some(p);
        let r = arena.alloc_element("w:r", Vec::new());
        let rpr = arena.alloc_element("w:rPr", Vec::new());
        let b = arena.alloc_element("w:b", Vec::new());
        arena.append_child(rpr, b);
        arena.append_child(r, rpr);
        arena.append_child(p, r);

        apply_brand_color(&mut arena, r, COLOR_INSERT_HEX);
        let rpr_after = arena.find_child(r, "rPr").unwrap();
        assert!(arena.find_child(rpr_after, "b").is_some());
        let color = arena.find_child(rpr_after, "color").unwrap();
        assert_eq!(arena.attr(color, "val"), Some(COLOR_INSERT_HEX));
    }

    #[test]
    fn synth_runs_reconstructs_tab_and_symbol_sentinels() {
        use docx_core::RunInfo;

        let mut dest = Arena::new();
        dest.root = Some(dest.alloc_element("w:document", Vec::new()));

        let text = format!("a\tb{SENTINEL_SYMBOL}c");
        let mod_para = ParagraphInfo {
            text: text.clone(),
            normalized: text.clone(),
            runs: vec![RunInfo { text, rpr: None, start_pos: 0, xml_ref: dest.root.unwrap() }],
            style_sig: "sig".to_string(),
            path: docx_core::ParaPath { section_idx: 0, block_idx: 0, paragraph_idx: 0 },
            cell: None,
            xml_ref: dest.root.unwrap(),
        };

        let runs = synth_runs_for_range(&mut dest, &mod_para, 0, 5).unwrap();
        assert_eq!(runs.len(), 1);
        let children: Vec<&str> = dest.children(runs[0]).iter().filter_map(|&c| dest.local_name_of(c)).collect();
        assert_eq!(children, vec!["t", "tab", "t", "sym", "t"]);
        assert!(dest.find_child(runs[0], "tab").is_some());
        assert!(dest.find_child(runs[0], "sym").is_some());
    }

    #[test]
    fn paragraph_mark_deletion_marker_lives_in_ppr_rpr() {
        let mut arena = Arena::new();
        let p = arena.alloc_element("w:p", Vec::new());
        arena.root = Some(p);

        mark_paragraph_mark_deleted(&mut arena, p, &stamp());
        let ppr = arena.find_child(p, "pPr").unwrap();
        let rpr = arena.find_child(ppr, "rPr").unwrap();
        assert!(arena.find_child(rpr, "del").is_some());
    }
}
