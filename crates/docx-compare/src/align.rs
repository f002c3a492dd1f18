//! C3: two-stage alignment. Patience-sorting LIS finds hash-unique anchors;
//! Myers (via the `similar` crate) fills the gaps between and around them.
//! The same algorithm runs at paragraph granularity (hash key =
//! `normalized|style_sig`) and at run/token granularity within a matched
//! paragraph pair — only the element type and hash key differ.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use docx_core::ParagraphInfo;
use similar::{capture_diff_slices, Algorithm, DiffOp};

use crate::tokenize::tokenize_preserve_spacing;

/// One row of an alignment: `orig`/`modified` are `None` for a gap on that
/// side (§4.3's `Pair[] = (orig_idx|-1, mod_idx|-1)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub orig: Option<usize>,
    pub modified: Option<usize>,
}

/// Align two element slices by a hash key, per §4.3: patience-sorting LIS
/// anchors first, Myers over every gap (including the prefix/suffix beyond
/// the outermost anchors).
pub fn align<T, K, F>(orig: &[T], modified: &[T], key: F) -> Vec<Pair>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    if orig.is_empty() && modified.is_empty() {
        return Vec::new();
    }
    if orig.is_empty() {
        return (0..modified.len()).map(|j| Pair { orig: None, modified: Some(j) }).collect();
    }
    if modified.is_empty() {
        return (0..orig.len()).map(|i| Pair { orig: Some(i), modified: None }).collect();
    }

    let anchors = patience_anchors(orig, modified, &key);
    if anchors.is_empty() {
        return myers_align(orig, modified, &key, 0, orig.len(), 0, modified.len());
    }

    let mut out = Vec::new();
    let mut prev_i = 0usize;
    let mut prev_j = 0usize;
    for &(i, j) in &anchors {
        out.extend(myers_align(orig, modified, &key, prev_i, i, prev_j, j));
        out.push(Pair { orig: Some(i), modified: Some(j) });
        prev_i = i + 1;
        prev_j = j + 1;
    }
    out.extend(myers_align(orig, modified, &key, prev_i, orig.len(), prev_j, modified.len()));
    out
}

/// Step 1-2 of §4.3: greedy earliest-unused candidate matches, reduced to
/// their Longest Increasing Subsequence of `j`-values via patience sorting.
fn patience_anchors<T, K, F>(orig: &[T], modified: &[T], key: &F) -> Vec<(usize, usize)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut by_key: HashMap<K, VecDeque<usize>> = HashMap::new();
    for (j, m) in modified.iter().enumerate() {
        by_key.entry(key(m)).or_default().push_back(j);
    }

    let mut candidates = Vec::new();
    for (i, a) in orig.iter().enumerate() {
        if let Some(queue) = by_key.get_mut(&key(a)) {
            if let Some(j) = queue.pop_front() {
                candidates.push((i, j));
            }
        }
    }

    lis_by_second(&candidates)
}

/// Patience-sort LIS over `(i, j)` pairs already sorted by `i`, ordering by
/// `j`. `O(n log n)`.
fn lis_by_second(candidates: &[(usize, usize)]) -> Vec<(usize, usize)> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; candidates.len()];

    for idx in 0..candidates.len() {
        let j = candidates[idx].1;
        let pos = tails.partition_point(|&t| candidates[t].1 < j);
        if pos == tails.len() {
            tails.push(idx);
        } else {
            tails[pos] = idx;
        }
        prev[idx] = if pos > 0 { Some(tails[pos - 1]) } else { None };
    }

    let mut result = Vec::new();
    let mut cursor = *tails.last().expect("tails non-empty when candidates non-empty");
    loop {
        result.push(candidates[cursor]);
        match prev[cursor] {
            Some(p) => cursor = p,
            None => break,
        }
    }
    result.reverse();
    result
}

/// Standard Myers edit-distance backtrack over a sub-range of both sides,
/// translated back into absolute indices. Replaces are split into
/// back-to-back delete+insert before returning (§4.3).
fn myers_align<T, K, F>(
    orig: &[T],
    modified: &[T],
    key: &F,
    a_start: usize,
    a_end: usize,
    b_start: usize,
    b_end: usize,
) -> Vec<Pair>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let a_keys: Vec<K> = orig[a_start..a_end].iter().map(key).collect();
    let b_keys: Vec<K> = modified[b_start..b_end].iter().map(key).collect();
    let ops = capture_diff_slices(Algorithm::Myers, &a_keys, &b_keys);

    let mut out = Vec::new();
    for op in ops {
        match op {
            DiffOp::Equal { old_index, new_index, len } => {
                for k in 0..len {
                    out.push(Pair {
                        orig: Some(a_start + old_index + k),
                        modified: Some(b_start + new_index + k),
                    });
                }
            }
            DiffOp::Delete { old_index, old_len, .. } => {
                for k in 0..old_len {
                    out.push(Pair {
                        orig: Some(a_start + old_index + k),
                        modified: None,
                    });
                }
            }
            DiffOp::Insert { new_index, new_len, .. } => {
                for k in 0..new_len {
                    out.push(Pair {
                        orig: None,
                        modified: Some(b_start + new_index + k),
                    });
                }
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                for k in 0..old_len {
                    out.push(Pair {
                        orig: Some(a_start + old_index + k),
                        modified: None,
                    });
                }
                for k in 0..new_len {
                    out.push(Pair {
                        orig: None,
                        modified: Some(b_start + new_index + k),
                    });
                }
            }
        }
    }
    out
}

/// Paragraph-level alignment: hash key is `normalized || "|" || style_sig`
/// (§4.3), so a pure reformat (same text, different style) surfaces as
/// delete+insert unless the move detector reclaims it.
pub fn align_paragraphs(orig: &[ParagraphInfo], modified: &[ParagraphInfo]) -> Vec<Pair> {
    align(orig, modified, |p: &ParagraphInfo| format!("{}|{}", p.normalized, p.style_sig))
}

/// Run-level opcode tag; `Equal | Delete | Insert` only — replaces are
/// pre-split by the aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Delete,
    Insert,
}

/// A character interval over a matched paragraph pair's texts. For `Equal`,
/// both ranges are populated and have the same length; for `Delete`,
/// `m_start == m_end`; for `Insert`, `o_start == o_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub o_start: usize,
    pub o_end: usize,
    pub m_start: usize,
    pub m_end: usize,
}

/// Tokenize both paragraph texts, align the token streams, then merge
/// consecutive same-tag pairs into character-offset opcodes (§4.3's
/// run-level use: "the union of intervals exactly covers both texts").
pub fn align_runs(orig_text: &str, modified_text: &str) -> Vec<Opcode> {
    let orig_tokens = tokenize_preserve_spacing(orig_text);
    let mod_tokens = tokenize_preserve_spacing(modified_text);

    let orig_offsets = prefix_char_offsets(&orig_tokens);
    let mod_offsets = prefix_char_offsets(&mod_tokens);

    let pairs = align(&orig_tokens, &mod_tokens, |t: &String| t.clone());

    let mut opcodes: Vec<Opcode> = Vec::new();
    for pair in pairs {
        let tag = match (pair.orig, pair.modified) {
            (Some(_), Some(_)) => OpTag::Equal,
            (Some(_), None) => OpTag::Delete,
            (None, Some(_)) => OpTag::Insert,
            (None, None) => continue,
        };
        let (o_start, o_end) = match pair.orig {
            Some(i) => (orig_offsets[i], orig_offsets[i + 1]),
            None => {
                let anchor = opcodes.last().map(|o| o.o_end).unwrap_or(0);
                (anchor, anchor)
            }
        };
        let (m_start, m_end) = match pair.modified {
            Some(j) => (mod_offsets[j], mod_offsets[j + 1]),
            None => {
                let anchor = opcodes.last().map(|o| o.m_end).unwrap_or(0);
                (anchor, anchor)
            }
        };

        if let Some(last) = opcodes.last_mut() {
            if last.tag == tag && last.o_end == o_start && last.m_end == m_start {
                last.o_end = o_end;
                last.m_end = m_end;
                continue;
            }
        }
        opcodes.push(Opcode { tag, o_start, o_end, m_start, m_end });
    }
    opcodes
}

fn prefix_char_offsets(tokens: &[String]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(tokens.len() + 1);
    offsets.push(0);
    let mut pos = 0usize;
    for t in tokens {
        pos += t.chars().count();
        offsets.push(pos);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str, sig: &str) -> ParagraphInfo {
        ParagraphInfo {
            normalized: docx_core::normalize_for_compare(text),
            text: text.to_string(),
            runs: Vec::new(),
            style_sig: sig.to_string(),
            path: docx_core::ParaPath { section_idx: 0, block_idx: 0, paragraph_idx: 0 },
            cell: None,
            xml_ref: 0,
        }
    }

    #[test]
    fn identical_sequences_are_all_equal() {
        let a = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let pairs = align(&a, &a.clone(), |s: &String| s.clone());
        assert!(pairs.iter().all(|p| p.orig.is_some() && p.modified.is_some()));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn pure_insertion_is_all_inserts() {
        let empty: Vec<String> = Vec::new();
        let b = vec!["a".to_string(), "b".to_string()];
        let pairs = align(&empty, &b, |s: &String| s.clone());
        assert!(pairs.iter().all(|p| p.orig.is_none()));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn pure_deletion_is_all_deletes() {
        let a = vec!["a".to_string(), "b".to_string()];
        let empty: Vec<String> = Vec::new();
        let pairs = align(&a, &empty, |s: &String| s.clone());
        assert!(pairs.iter().all(|p| p.modified.is_none()));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn anchors_preserve_monotone_order() {
        let a: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let b: Vec<String> = ["x", "a", "c", "d", "y"].iter().map(|s| s.to_string()).collect();
        let pairs = align(&a, &b, |s: &String| s.clone());
        let matched: Vec<(usize, usize)> = pairs
            .iter()
            .filter_map(|p| Some((p.orig?, p.modified?)))
            .collect();
        for w in matched.windows(2) {
            assert!(w[0].0 < w[1].0);
            assert!(w[0].1 < w[1].1);
        }
    }

    #[test]
    fn paragraphs_with_same_text_different_style_do_not_align_equal() {
        let a = vec![para("hello", "sig-a")];
        let b = vec![para("hello", "sig-b")];
        let pairs = align_paragraphs(&a, &b);
        // Different hash keys -> no anchor -> Myers sees them as distinct
        // tokens -> delete then insert.
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().any(|p| p.orig.is_some() && p.modified.is_none()));
        assert!(pairs.iter().any(|p| p.orig.is_none() && p.modified.is_some()));
    }

    #[test]
    fn align_runs_covers_both_texts_exactly() {
        let opcodes = align_runs("The quick fox", "The quick brown fox");
        let o_total: usize = opcodes.iter().map(|o| o.o_end - o.o_start).sum::<usize>();
        let m_total: usize = opcodes.iter().map(|o| o.m_end - o.m_start).sum::<usize>();
        assert_eq!(o_total, "The quick fox".chars().count());
        // inserted text contributes extra to modified total only where it's an insert
        assert!(m_total >= o_total);
        assert_eq!("The quick fox".chars().count(), 13);
        let _ = m_total;
    }

    #[test]
    fn align_runs_merges_consecutive_equal_tokens() {
        let opcodes = align_runs("hello world", "hello world");
        assert_eq!(opcodes.len(), 1);
        assert_eq!(opcodes[0].tag, OpTag::Equal);
        assert_eq!(opcodes[0].o_start, 0);
        assert_eq!(opcodes[0].o_end, 11);
    }

    #[test]
    fn align_runs_detects_pure_insertion() {
        let opcodes = align_runs("hello", "hello world");
        assert!(opcodes.iter().any(|o| o.tag == OpTag::Insert));
        assert!(opcodes.iter().all(|o| o.tag != OpTag::Delete));
    }
}
