//! Token counting and prefix truncation

use papersift_domain::TokenCounter;

/// Cost units that make up one token
const UNITS_PER_TOKEN: usize = 20;

/// Latin, Cyrillic and everything else: ~4 chars per token
const DEFAULT_CHAR_UNITS: usize = 5;

/// CJK: ~2 chars per token
const CJK_CHAR_UNITS: usize = 10;

/// Arabic: ~5 chars per token
const ARABIC_CHAR_UNITS: usize = 4;

/// Script-aware token estimate that needs no model files
///
/// Every char is weighted by its script and the weights are summed; a
/// token is `UNITS_PER_TOKEN` units, rounded up. Truncation walks the same
/// weights, so `count(truncate(text, n)) <= n` holds exactly.
///
/// # Examples
///
/// ```
/// use papersift_extractor::EstimatingTokenCounter;
/// use papersift_domain::TokenCounter;
///
/// let counter = EstimatingTokenCounter;
/// assert_eq!(counter.count("abcdefgh"), 2);
/// assert_eq!(counter.truncate("abcdefgh", 1), "abcd");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatingTokenCounter;

impl TokenCounter for EstimatingTokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        // Fast path for pure ASCII
        let units = if text.is_ascii() {
            text.len() * DEFAULT_CHAR_UNITS
        } else {
            text.chars().map(char_units).sum()
        };

        units.div_ceil(UNITS_PER_TOKEN)
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let budget = max_tokens.saturating_mul(UNITS_PER_TOKEN);

        if text.is_ascii() {
            let end = (budget / DEFAULT_CHAR_UNITS).min(text.len());
            return text[..end].to_string();
        }

        let mut used = 0;
        let mut end = 0;
        for (idx, c) in text.char_indices() {
            let cost = char_units(c);
            if used + cost > budget {
                break;
            }
            used += cost;
            end = idx + c.len_utf8();
        }
        text[..end].to_string()
    }
}

#[inline]
fn char_units(c: char) -> usize {
    if is_cjk_char(c) {
        CJK_CHAR_UNITS
    } else if is_arabic_char(c) {
        ARABIC_CHAR_UNITS
    } else {
        DEFAULT_CHAR_UNITS
    }
}

#[inline]
fn is_cjk_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code) || // CJK Unified Ideographs
    (0x3040..=0x309F).contains(&code) || // Hiragana
    (0x30A0..=0x30FF).contains(&code) || // Katakana
    (0xAC00..=0xD7AF).contains(&code) // Hangul
}

#[inline]
fn is_arabic_char(c: char) -> bool {
    let code = c as u32;
    (0x0600..=0x06FF).contains(&code) || // Arabic
    (0x0750..=0x077F).contains(&code) || // Arabic Supplement
    (0x08A0..=0x08FF).contains(&code) || // Arabic Extended-A
    (0xFB50..=0xFDFF).contains(&code) || // Arabic Presentation Forms-A
    (0xFE70..=0xFEFF).contains(&code) // Arabic Presentation Forms-B
}

#[cfg(feature = "hf-tokenizer")]
pub use hf::HfTokenCounter;

#[cfg(feature = "hf-tokenizer")]
mod hf {
    use super::EstimatingTokenCounter;
    use crate::error::ExtractorError;
    use papersift_domain::TokenCounter;
    use std::path::Path;
    use tokenizers::Tokenizer;
    use tracing::warn;

    /// Exact token counts from a HuggingFace `tokenizer.json`
    pub struct HfTokenCounter {
        tokenizer: Tokenizer,
    }

    impl HfTokenCounter {
        /// Load a tokenizer definition from disk
        pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtractorError> {
            let path = path.as_ref();
            let tokenizer = Tokenizer::from_file(path).map_err(|e| {
                ExtractorError::Config(format!(
                    "Failed to load tokenizer from {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Ok(Self { tokenizer })
        }

        fn token_ends(&self, text: &str) -> Option<Vec<usize>> {
            match self.tokenizer.encode(text, false) {
                Ok(encoding) => Some(encoding.get_offsets().iter().map(|(_, end)| *end).collect()),
                Err(e) => {
                    warn!("Tokenizer failed, falling back to estimate: {}", e);
                    None
                }
            }
        }
    }

    impl TokenCounter for HfTokenCounter {
        fn count(&self, text: &str) -> usize {
            match self.token_ends(text) {
                Some(ends) => ends.len(),
                None => EstimatingTokenCounter.count(text),
            }
        }

        fn truncate(&self, text: &str, max_tokens: usize) -> String {
            let Some(ends) = self.token_ends(text) else {
                return EstimatingTokenCounter.truncate(text, max_tokens);
            };

            let mut keep = max_tokens.min(ends.len());
            loop {
                if keep == 0 {
                    return String::new();
                }
                let mut end = ends[keep - 1].min(text.len());
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                let prefix = &text[..end];
                // Re-encoding a prefix can merge differently at the cut
                if self.count(prefix) <= max_tokens {
                    return prefix.to_string();
                }
                keep -= 1;
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(EstimatingTokenCounter.count(""), 0);
        assert_eq!(EstimatingTokenCounter.truncate("", 10), "");
    }

    #[test]
    fn test_ascii_estimate() {
        let counter = EstimatingTokenCounter;
        assert_eq!(counter.count("abcd"), 1);
        assert_eq!(counter.count("abcde"), 2);
        assert_eq!(counter.count(&"a".repeat(4_000)), 1_000);
    }

    #[test]
    fn test_cjk_is_denser() {
        let counter = EstimatingTokenCounter;
        assert_eq!(counter.count("日本語のテキスト"), 4);
    }

    #[test]
    fn test_truncate_keeps_prefix() {
        let counter = EstimatingTokenCounter;
        let text = "The quick brown fox jumps over the lazy dog";
        let truncated = counter.truncate(text, 3);
        assert_eq!(truncated, "The quick br");
        assert!(text.starts_with(&truncated));
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        let counter = EstimatingTokenCounter;
        assert_eq!(counter.truncate("short", 100), "short");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let counter = EstimatingTokenCounter;
        let text = "héllo wörld ünïcode";
        let truncated = counter.truncate(text, 2);
        assert!(text.starts_with(&truncated));
        assert!(counter.count(&truncated) <= 2);
    }

    proptest! {
        #[test]
        fn prop_truncate_fits(text in "\\PC{0,400}", n in 0usize..120) {
            let counter = EstimatingTokenCounter;
            let truncated = counter.truncate(&text, n);
            prop_assert!(counter.count(&truncated) <= n);
            prop_assert!(text.starts_with(&truncated));
        }

        #[test]
        fn prop_truncate_is_deterministic(text in "\\PC{0,200}", n in 0usize..60) {
            let counter = EstimatingTokenCounter;
            prop_assert_eq!(counter.truncate(&text, n), counter.truncate(&text, n));
        }
    }
}
