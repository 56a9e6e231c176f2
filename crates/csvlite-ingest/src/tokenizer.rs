//! Row tokenizer
//!
//! Splits a single line into fields. The quoting convention is a narrow
//! subset of CSV:
//!
//! - The delimiter separates fields outside quotes.
//! - A quoted span keeps delimiters literally; the quote characters themselves
//!   are dropped and there is no escape sequence for a literal quote.
//! - A field that contained a quoted span is whitespace-trimmed.
//! - Unquoted fields are kept verbatim, then the [`BlankFieldRule`] is applied.
//! - A leading or trailing delimiter produces an empty field at that end,
//!   unless [`LineEdges::Strip`] is selected.
//!
//! Tokenizing never fails. An unterminated quote takes the rest of the line.

use serde::{Deserialize, Serialize};

/// Which unquoted fields are replaced by the empty string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankFieldRule {
    /// Whitespace-only fields become empty
    #[default]
    Whitespace,

    /// Fields made only of ASCII word characters (`[A-Za-z0-9_]+`) become
    /// empty. Kept for files prepared for older converters, whose blank
    /// check used `\w+` where `\s+` was meant.
    LegacyWordChars,
}

impl BlankFieldRule {
    fn blanks(self, field: &str) -> bool {
        match self {
            BlankFieldRule::Whitespace => field.trim().is_empty(),
            BlankFieldRule::LegacyWordChars => {
                !field.is_empty()
                    && field
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
            },
        }
    }
}

/// Treatment of the two ends of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEdges {
    /// Fields at either end are kept as written
    #[default]
    Keep,

    /// Whitespace around the line is trimmed and a single trailing delimiter
    /// is dropped, so `1,2,` has two fields and ` true` reads as `true`.
    /// Older converters split lines this way.
    Strip,
}

/// Delimiter, quote character, blank-field and line-edge handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerOptions {
    pub delimiter: char,
    pub quote: char,
    #[serde(default)]
    pub blank_fields: BlankFieldRule,
    #[serde(default)]
    pub line_edges: LineEdges,
}

impl TokenizerOptions {
    /// Comma and double quote with every rule of older converters
    pub fn legacy() -> Self {
        Self {
            blank_fields: BlankFieldRule::LegacyWordChars,
            line_edges: LineEdges::Strip,
            ..Self::default()
        }
    }
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            blank_fields: BlankFieldRule::Whitespace,
            line_edges: LineEdges::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    Inside,
}

#[derive(Debug, Default)]
struct PendingField {
    text: String,
    quoted: bool,
}

/// Two-state scanner over the characters of a line
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    options: TokenizerOptions,
}

impl Tokenizer {
    pub fn new(options: TokenizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    /// Split `line` into fields
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        let TokenizerOptions {
            delimiter,
            quote,
            line_edges,
            ..
        } = self.options;

        let line = match line_edges {
            LineEdges::Keep => line,
            // A whitespace delimiter such as tab still separates fields
            LineEdges::Strip => line.trim_matches(|c: char| c.is_whitespace() && c != delimiter),
        };

        let mut fields = Vec::new();
        let mut pending = PendingField::default();
        let mut state = ScanState::Outside;
        let mut ends_with_delimiter = false;

        for ch in line.chars() {
            ends_with_delimiter = false;
            match state {
                ScanState::Outside if ch == delimiter => {
                    fields.push(self.finish(std::mem::take(&mut pending)));
                    ends_with_delimiter = true;
                },
                ScanState::Outside if ch == quote => {
                    pending.quoted = true;
                    state = ScanState::Inside;
                },
                ScanState::Inside if ch == quote => {
                    state = ScanState::Outside;
                },
                _ => pending.text.push(ch),
            }
        }

        if !(ends_with_delimiter && line_edges == LineEdges::Strip) {
            fields.push(self.finish(pending));
        }

        fields
    }

    fn finish(&self, field: PendingField) -> String {
        if field.quoted {
            return field.text.trim().to_string();
        }
        if self.options.blank_fields.blanks(&field.text) {
            String::new()
        } else {
            field.text
        }
    }
}
