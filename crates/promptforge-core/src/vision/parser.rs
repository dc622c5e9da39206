//! Best-effort extraction of scored feedback from model prose
//!
//! Providers promise the fixed label format but drift on casing, spacing,
//! and trailing text. Parsing is total: malformed input yields empty fields,
//! never an error.

use super::prompt::{DIFFERENCES_LABEL, IMPROVEMENTS_LABEL, SCORE_LABEL};

/// Fields extracted from a comparison response.
///
/// `score` is `None` when the score label is absent; progression treats that
/// as zero, but callers may surface the difference for debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedComparison {
    pub score: Option<u8>,
    pub differences: String,
    pub improvements: String,
}

/// Parse provider prose into structured fields.
///
/// Labels match case-insensitively, with any amount of whitespace between
/// label words and before the colon. Each text block runs until the next
/// recognized label or end of input.
pub fn parse_comparison(text: &str) -> ParsedComparison {
    let score_match = find_label(text, SCORE_LABEL);
    let differences_match = find_label(text, DIFFERENCES_LABEL);
    let improvements_match = find_label(text, IMPROVEMENTS_LABEL);

    let label_starts: Vec<usize> = [&score_match, &differences_match, &improvements_match]
        .iter()
        .filter_map(|m| m.as_ref().map(|m| m.start))
        .collect();

    let score = score_match
        .as_ref()
        .and_then(|m| parse_score(&text[m.value_start..]));

    let differences = differences_match
        .as_ref()
        .map(|m| extract_block(text, m, &label_starts))
        .unwrap_or_default();

    let improvements = improvements_match
        .as_ref()
        .map(|m| extract_block(text, m, &label_starts))
        .unwrap_or_default();

    ParsedComparison {
        score,
        differences,
        improvements,
    }
}

struct LabelMatch {
    /// Byte offset where the label itself begins
    start: usize,
    /// Byte offset just past the colon
    value_start: usize,
}

/// Find the first occurrence of a multi-word label followed by a colon
fn find_label(text: &str, label: &str) -> Option<LabelMatch> {
    let words: Vec<&str> = label.split_whitespace().collect();
    let mut i = 0;
    while i < text.len() {
        if text.is_char_boundary(i) {
            if let Some(value_start) = match_label_at(text, i, &words) {
                return Some(LabelMatch {
                    start: i,
                    value_start,
                });
            }
            i += 1;
        } else {
            i += 1;
        }
    }
    None
}

/// Try to match the label words starting at `pos`, returning the offset just
/// past the colon on success
fn match_label_at(text: &str, mut pos: usize, words: &[&str]) -> Option<usize> {
    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            let after_ws = skip_whitespace(text, pos);
            if after_ws == pos {
                return None;
            }
            pos = after_ws;
        }
        let candidate = text.get(pos..pos + word.len())?;
        if !candidate.eq_ignore_ascii_case(word) {
            return None;
        }
        pos += word.len();
    }

    let pos = skip_whitespace(text, pos);
    if text.as_bytes().get(pos) == Some(&b':') {
        Some(pos + 1)
    } else {
        None
    }
}

fn skip_whitespace(text: &str, mut pos: usize) -> usize {
    while let Some(rest) = text.get(pos..) {
        match rest.chars().next() {
            Some(c) if c.is_whitespace() => pos += c.len_utf8(),
            _ => break,
        }
    }
    pos
}

/// Integer immediately following the label; trailing `%` and prose ignored
fn parse_score(value: &str) -> Option<u8> {
    let value = value.trim_start();
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let score: u32 = digits.parse().ok()?;
    Some(score.min(100) as u8)
}

/// Text from just past a label's colon up to the next label or end of input
fn extract_block(text: &str, m: &LabelMatch, label_starts: &[usize]) -> String {
    let end = label_starts
        .iter()
        .copied()
        .filter(|&s| s > m.value_start)
        .min()
        .unwrap_or(text.len());
    text[m.value_start..end].trim().to_string()
}
