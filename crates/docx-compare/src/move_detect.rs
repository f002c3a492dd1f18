//! C4: shingled-hash move detection over the deletion/insertion spans
//! produced by run-level alignment across every matched paragraph pair.

use std::collections::HashSet;

use docx_core::ParaPath;

use crate::align::{OpTag, Opcode};
use crate::tokenize::{jaccard, shingles, tokenize_preserve_spacing};

/// A candidate deletion or insertion span contributed by one paragraph
/// pair's run-level opcodes (§4.4).
#[derive(Debug, Clone)]
pub struct Span {
    pub owning_paragraph: ParaPath,
    pub tokens: Vec<String>,
    pub char_start: usize,
    pub char_end: usize,
}

/// A reclassified move: the deletion site becomes `moveFrom`, the insertion
/// site becomes `moveTo`.
#[derive(Debug, Clone)]
pub struct MovePair {
    pub del: Span,
    pub ins: Span,
}

/// Split a matched paragraph pair's run-level `delete` opcodes into
/// deletion spans, drawing text from the original paragraph (§4.4).
pub fn collect_delete_spans(paragraph_path: ParaPath, orig_text: &str, opcodes: &[Opcode]) -> Vec<Span> {
    let orig_chars: Vec<char> = orig_text.chars().collect();
    opcodes
        .iter()
        .filter(|op| op.tag == OpTag::Delete)
        .map(|op| {
            let text: String = orig_chars[op.o_start..op.o_end].iter().collect();
            Span {
                owning_paragraph: paragraph_path,
                tokens: tokenize_preserve_spacing(&text),
                char_start: op.o_start,
                char_end: op.o_end,
            }
        })
        .collect()
}

/// Split a matched paragraph pair's run-level `insert` opcodes into
/// insertion spans, drawing text from the modified paragraph (§4.4).
pub fn collect_insert_spans(paragraph_path: ParaPath, modified_text: &str, opcodes: &[Opcode]) -> Vec<Span> {
    let mod_chars: Vec<char> = modified_text.chars().collect();
    opcodes
        .iter()
        .filter(|op| op.tag == OpTag::Insert)
        .map(|op| {
            let text: String = mod_chars[op.m_start..op.m_end].iter().collect();
            Span {
                owning_paragraph: paragraph_path,
                tokens: tokenize_preserve_spacing(&text),
                char_start: op.m_start,
                char_end: op.m_end,
            }
        })
        .collect()
}

/// §4.4 procedure: filter by `min_move_span_tokens`, sort deletions
/// longest-shingle-set-first (tiebreak on earlier paragraph path), then
/// greedily claim the best-Jaccard unclaimed insertion for each.
pub fn detect_moves(deletions: Vec<Span>, insertions: Vec<Span>, shingle_size: usize, jaccard_threshold: f64, min_move_span_tokens: usize) -> Vec<MovePair> {
    let mut eligible_deletions: Vec<Span> = deletions.into_iter().filter(|s| s.tokens.len() >= min_move_span_tokens).collect();
    let eligible_insertions: Vec<Span> = insertions.into_iter().filter(|s| s.tokens.len() >= min_move_span_tokens).collect();

    let ins_shingles: Vec<HashSet<String>> = eligible_insertions.iter().map(|s| shingles(&s.tokens, shingle_size)).collect();

    eligible_deletions.sort_by(|a, b| {
        let a_shingles = shingles(&a.tokens, shingle_size).len();
        let b_shingles = shingles(&b.tokens, shingle_size).len();
        b_shingles.cmp(&a_shingles).then_with(|| a.owning_paragraph.cmp(&b.owning_paragraph))
    });

    let mut claimed = vec![false; eligible_insertions.len()];
    let mut moves = Vec::new();

    for del in eligible_deletions {
        let del_shingles = shingles(&del.tokens, shingle_size);
        let mut best: Option<(usize, f64)> = None;
        for (idx, ins) in eligible_insertions.iter().enumerate() {
            if claimed[idx] {
                continue;
            }
            let score = jaccard(&del_shingles, &ins_shingles[idx]);
            if score < jaccard_threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_idx, best_score)) => {
                    score > best_score
                        || ((score - best_score).abs() < f64::EPSILON && ins.owning_paragraph < eligible_insertions[best_idx].owning_paragraph)
                }
            };
            if better {
                best = Some((idx, score));
            }
        }
        if let Some((idx, _)) = best {
            claimed[idx] = true;
            moves.push(MovePair { del, ins: eligible_insertions[idx].clone() });
        }
    }

    moves
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize) -> ParaPath {
        ParaPath { section_idx: 0, block_idx: n, paragraph_idx: 0 }
    }

    fn span(path: ParaPath, text: &str) -> Span {
        Span {
            owning_paragraph: path,
            tokens: tokenize_preserve_spacing(text),
            char_start: 0,
            char_end: text.chars().count(),
        }
    }

    const LONG_CLAUSE: &str = "the borrower shall repay the outstanding principal balance in full no later than";

    #[test]
    fn identical_long_span_is_detected_as_move() {
        let del = span(path(0), LONG_CLAUSE);
        let ins = span(path(5), LONG_CLAUSE);
        let moves = detect_moves(vec![del], vec![ins], 5, 0.85, 5);
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn short_spans_are_exempt_from_move_detection() {
        let del = span(path(0), "short text");
        let ins = span(path(5), "short text");
        let moves = detect_moves(vec![del], vec![ins], 5, 0.85, 12);
        assert!(moves.is_empty());
    }

    #[test]
    fn below_threshold_is_not_a_move() {
        let del = span(path(0), LONG_CLAUSE);
        let ins = span(path(5), "completely different words that share almost nothing at all with the original");
        let moves = detect_moves(vec![del], vec![ins], 5, 0.85, 5);
        assert!(moves.is_empty());
    }

    #[test]
    fn each_insertion_claimed_at_most_once() {
        let del_a = span(path(0), LONG_CLAUSE);
        let del_b = span(path(1), LONG_CLAUSE);
        let ins = span(path(5), LONG_CLAUSE);
        let moves = detect_moves(vec![del_a, del_b], vec![ins], 5, 0.85, 5);
        assert_eq!(moves.len(), 1);
    }
}
