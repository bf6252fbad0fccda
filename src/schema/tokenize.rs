use std::{cmp::Reverse, collections::HashSet};

use serde::{Deserialize, Serialize};

/// Separator between tags in a multi-valued attribute.
pub const DELIMITER: char = ',';

/// The "not applicable" tag, which itself contains the delimiter.
pub const NOT_APPLICABLE: &str = "N,A";

/// Splits multi-valued tag strings into trimmed tokens.
///
/// Protected literals contain the delimiter but are atomic: after splitting, consecutive
/// pieces that together spell a protected literal are emitted as that single literal.
/// `"Residential, N,A"` therefore yields `["Residential", "N,A"]`. Only whitespace around
/// the whole literal is ignored, so `"N, A"` is two tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagTokenizer {
    protected: Vec<String>,
}

impl TagTokenizer {
    pub fn new(protected: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let mut protected: Vec<String> = protected
            .into_iter()
            .filter(|literal| seen.insert(literal.clone()))
            .collect();
        // Longer literals first so that a literal never shadows one that extends it.
        protected.sort_by_key(|literal| Reverse(literal.split(DELIMITER).count()));
        Self { protected }
    }

    pub fn protected(&self) -> &[String] {
        &self.protected
    }

    pub fn tokenize(&self, raw: &str) -> Vec<String> {
        let pieces: Vec<&str> = raw.split(DELIMITER).collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < pieces.len() {
            if let Some((literal, width)) = self.protected_at(&pieces[i..]) {
                tokens.push(literal.to_string());
                i += width;
                continue;
            }
            let piece = pieces[i].trim();
            if !piece.is_empty() {
                tokens.push(piece.to_string());
            }
            i += 1;
        }

        tokens
    }

    /// The protected literal spelled by the leading `pieces`, if any. Interior pieces must
    /// match exactly; the first may carry leading and the last trailing whitespace.
    fn protected_at(&self, pieces: &[&str]) -> Option<(&str, usize)> {
        self.protected.iter().find_map(|literal| {
            let parts: Vec<&str> = literal.split(DELIMITER).collect();
            let last = parts.len() - 1;
            let matches = parts.len() <= pieces.len()
                && parts.iter().zip(pieces).enumerate().all(|(j, (part, piece))| {
                    let piece = match (j == 0, j == last) {
                        (true, true) => piece.trim(),
                        (true, false) => piece.trim_start(),
                        (false, true) => piece.trim_end(),
                        (false, false) => piece,
                    };
                    piece == *part
                });
            matches.then_some((literal.as_str(), parts.len()))
        })
    }
}

impl Default for TagTokenizer {
    fn default() -> Self {
        Self::new(vec![NOT_APPLICABLE.to_string()])
    }
}

impl From<Vec<String>> for TagTokenizer {
    fn from(protected: Vec<String>) -> Self {
        Self::new(protected)
    }
}

impl From<TagTokenizer> for Vec<String> {
    fn from(tokenizer: TagTokenizer) -> Self {
        tokenizer.protected
    }
}
