//! Token estimates for comparing TOON against JSON and Markdown renderings.

use serde::Serialize;

/// Characters per token for the default estimate.
const CHARS_PER_TOKEN: usize = 4;

/// Character-ratio estimate: one token per four characters, rounded up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharRatioCounter;

impl TokenCounter for CharRatioCounter {
    fn count(&self, text: &str) -> usize {
        return text.chars().count().div_ceil(CHARS_PER_TOKEN);
    }
}

/// Size of one rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatSize {
    /// Character count.
    pub chars: usize,
    /// Estimated token count.
    pub tokens: usize,
}

/// Tokens saved by TOON relative to another format. Negative when TOON is larger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Savings {
    /// Savings as a percentage of the other format's tokens.
    pub percentage: f64,
    /// Token difference.
    pub tokens: i64,
}

impl Savings {
    /// Savings of `toon` tokens against `other` tokens.
    fn between(toon: usize, other: usize) -> Self {
        let toon_wide = i64::try_from(toon).unwrap_or(i64::MAX);
        let other_wide = i64::try_from(other).unwrap_or(i64::MAX);
        let tokens = other_wide.saturating_sub(toon_wide);

        let percentage = if other == 0 {
            0.0
        } else {
            let toon_f = f64::from(u32::try_from(toon).unwrap_or(u32::MAX));
            let other_f = f64::from(u32::try_from(other).unwrap_or(u32::MAX));
            (other_f - toon_f) / other_f * 100.0
        };

        return Self { percentage, tokens };
    }
}

/// Side-by-side sizes of the same content in three formats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenComparison {
    /// JSON rendering.
    pub json: FormatSize,
    /// Markdown rendering.
    pub markdown: FormatSize,
    /// TOON rendering.
    pub toon: FormatSize,
    /// TOON savings versus JSON.
    pub vs_json: Savings,
    /// TOON savings versus Markdown.
    pub vs_markdown: Savings,
}

/// Counts tokens in a piece of text.
///
/// The parser holds one of these to fill `token_count` in parse metadata.
/// Swap in a real tokenizer by implementing this trait.
pub trait TokenCounter {
    /// Token count for `text`. Empty text is zero tokens.
    fn count(&self, text: &str) -> usize;
}

/// Measure the same content rendered as TOON, JSON and Markdown.
pub fn compare(counter: &dyn TokenCounter, toon: &str, json: &str, markdown: &str) -> TokenComparison {
    let measure = |text: &str| {
        return FormatSize {
            chars: text.chars().count(),
            tokens: counter.count(text),
        };
    };

    let toon_size = measure(toon);
    let json_size = measure(json);
    let markdown_size = measure(markdown);

    return TokenComparison {
        json: json_size,
        markdown: markdown_size,
        toon: toon_size,
        vs_json: Savings::between(toon_size.tokens, json_size.tokens),
        vs_markdown: Savings::between(toon_size.tokens, markdown_size.tokens),
    };
}
