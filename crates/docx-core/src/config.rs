use serde::{Deserialize, Serialize};

use crate::error::{CompareError, Result};

/// Tunable parameters for one `compare_ooxml` run (§6).
///
/// Validated once at the engine's entry point via [`CompareOptions::validate`]
/// per the `ConfigurationError` policy in §7 — nothing deeper in the
/// pipeline re-checks these bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOptions {
    /// Shingle window length used by the move detector (§4.4).
    pub shingle_size: usize,
    /// Minimum Jaccard similarity for a delete/insert pair to be reclassified
    /// as a move (§4.4).
    pub jaccard_threshold: f64,
    /// Spans shorter than this many tokens are never considered for move
    /// detection (§4.4).
    pub min_move_span_tokens: usize,
    /// When set, the rewriter additionally colors and strikes wrapped runs
    /// (§4.5).
    pub force_brand_colors: bool,
    /// Author attribute stamped on every revision wrapper (§4.5).
    pub author: String,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            shingle_size: 5,
            jaccard_threshold: 0.85,
            min_move_span_tokens: 12,
            force_brand_colors: false,
            author: "Erik's Super Compare".to_string(),
        }
    }
}

impl CompareOptions {
    /// Reject out-of-range configuration (§7 `ConfigurationError`).
    pub fn validate(&self) -> Result<()> {
        if self.shingle_size == 0 {
            return Err(CompareError::ConfigurationError(
                "shingle_size must be positive".to_string(),
            ));
        }
        if self.min_move_span_tokens == 0 {
            return Err(CompareError::ConfigurationError(
                "min_move_span_tokens must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jaccard_threshold) {
            return Err(CompareError::ConfigurationError(format!(
                "jaccard_threshold must be within [0.0, 1.0], got {}",
                self.jaccard_threshold
            )));
        }
        if self.author.trim().is_empty() {
            return Err(CompareError::ConfigurationError(
                "author must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let opts = CompareOptions::default();
        assert_eq!(opts.shingle_size, 5);
        assert_eq!(opts.jaccard_threshold, 0.85);
        assert_eq!(opts.min_move_span_tokens, 12);
        assert!(!opts.force_brand_colors);
        assert_eq!(opts.author, "Erik's Super Compare");
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn rejects_zero_shingle_size() {
        let mut opts = CompareOptions::default();
        opts.shingle_size = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_jaccard() {
        let mut opts = CompareOptions::default();
        opts.jaccard_threshold = 1.5;
        assert!(opts.validate().is_err());
        opts.jaccard_threshold = -0.1;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn rejects_zero_min_move_span() {
        let mut opts = CompareOptions::default();
        opts.min_move_span_tokens = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let opts = CompareOptions::default();
        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"shingleSize\""));
        assert!(json.contains("\"jaccardThreshold\""));
    }
}
