use regex::Regex;
use std::sync::OnceLock;

use crate::models::question::AnswerLabel;

pub const QUESTIONS_PER_QUIZ: usize = 5;

const CORRECT_MARKERS: &[&str] = &["correct answer:", "correct:"];
const EXPLANATION_MARKER: &str = "explanation:";
const BOLD_WRAPPERS: &[&str] = &["**", "__"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub text: String,
    /// Option texts in label order A, B, C, D; all non-empty.
    pub options: [String; 4],
    pub correct: AnswerLabel,
    pub explanation: Option<String>,
}

fn question_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t>#]*(?:\*\*Q[ \t]*\d+[ \t]*(?::\*\*|\*\*[ \t]*:)|__Q[ \t]*\d+[ \t]*(?::__|__[ \t]*:)|Q[ \t]*\d+[ \t]*:)",
        )
        .expect("question marker pattern is valid")
    })
}

/// Parses provider output into at most five complete questions, in source order.
///
/// Never fails: blocks missing any option or an unambiguous correct label are
/// dropped whole, and an empty result means nothing was recoverable.
pub fn parse_quiz_text(raw: &str) -> Vec<ParsedQuestion> {
    let markers: Vec<_> = question_marker().find_iter(raw).collect();
    let mut parsed = Vec::new();

    for (i, marker) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map(|m| m.start()).unwrap_or(raw.len());
        if let Some(question) = parse_block(&raw[marker.end()..end]) {
            parsed.push(question);
        }
        if parsed.len() == QUESTIONS_PER_QUIZ {
            break;
        }
    }

    parsed
}

#[derive(PartialEq)]
enum LastField {
    Other,
    Explanation,
}

fn parse_block(block: &str) -> Option<ParsedQuestion> {
    let mut text: Option<String> = None;
    let mut options: [Option<String>; 4] = Default::default();
    let mut correct: Option<AnswerLabel> = None;
    let mut correct_invalid = false;
    let mut explanation: Option<String> = None;
    let mut last = LastField::Other;

    for raw_line in block.lines() {
        let normalized = unwrap_marker(raw_line);
        let line = normalized.as_str();
        if line.is_empty() {
            // A blank line ends an explanation.
            last = LastField::Other;
            continue;
        }

        if let Some((label, rest)) = option_line(line) {
            let slot = &mut options[label.index()];
            if slot.is_none() && !rest.is_empty() {
                *slot = Some(rest.to_string());
            }
            last = LastField::Other;
        } else if let Some(value) = strip_marker(line, CORRECT_MARKERS) {
            match (parse_correct_label(value), correct) {
                (Some(label), None) => correct = Some(label),
                (Some(label), Some(existing)) if label == existing => {}
                _ => correct_invalid = true,
            }
            last = LastField::Other;
        } else if let Some(value) = strip_marker(line, &[EXPLANATION_MARKER]) {
            if !value.is_empty() {
                explanation = Some(value.to_string());
            }
            last = LastField::Explanation;
        } else if text.is_none() {
            text = Some(line.to_string());
        } else if last == LastField::Explanation {
            if let Some(existing) = explanation.as_mut() {
                existing.push(' ');
                existing.push_str(line);
            }
        }
    }

    if correct_invalid {
        return None;
    }
    let [Some(a), Some(b), Some(c), Some(d)] = options else {
        return None;
    };

    Some(ParsedQuestion {
        text: text?,
        options: [a, b, c, d],
        correct: correct?,
        explanation,
    })
}

/// Trims the line and removes a bold wrapper around a leading marker token
/// (`**Correct:** B`, `__A)__ text`) or around a whole marker line
/// (`**Correct: B**`). Any other text is kept verbatim.
fn unwrap_marker(raw: &str) -> String {
    let line = raw.trim();
    for wrapper in BOLD_WRAPPERS {
        let Some(body) = line.strip_prefix(wrapper) else {
            continue;
        };
        let Some(close) = body.find(wrapper) else {
            continue;
        };
        let inner = body[..close].trim();
        let rest = body[close + wrapper.len()..].trim();
        if rest.is_empty() && is_marker_line(inner) {
            return inner.to_string();
        }
        if is_marker_token(inner) {
            return format!("{} {}", inner, rest).trim_end().to_string();
        }
    }
    line.to_string()
}

fn is_marker_token(token: &str) -> bool {
    CORRECT_MARKERS
        .iter()
        .chain(std::iter::once(&EXPLANATION_MARKER))
        .any(|marker| token.eq_ignore_ascii_case(marker))
        || (token.len() == 2 && option_line(token).is_some())
}

fn is_marker_line(line: &str) -> bool {
    option_line(line).is_some()
        || strip_marker(line, CORRECT_MARKERS).is_some()
        || strip_marker(line, &[EXPLANATION_MARKER]).is_some()
}

fn unwrap_bold(value: &str) -> &str {
    BOLD_WRAPPERS
        .iter()
        .find_map(|w| value.strip_prefix(w)?.strip_suffix(w))
        .map(str::trim)
        .unwrap_or(value)
}

fn option_line(line: &str) -> Option<(AnswerLabel, &str)> {
    let mut chars = line.chars();
    let label = chars.next().and_then(|c| {
        if c.is_ascii_uppercase() {
            AnswerLabel::from_char(c)
        } else {
            None
        }
    })?;
    if chars.next() != Some(')') {
        return None;
    }
    Some((label, line[2..].trim()))
}

fn strip_marker<'a>(line: &'a str, markers: &[&str]) -> Option<&'a str> {
    markers.iter().find_map(|marker| {
        let head = line.get(..marker.len())?;
        if head.eq_ignore_ascii_case(marker) {
            Some(line[marker.len()..].trim())
        } else {
            None
        }
    })
}

/// Accepts `B`, `b`, `B)`, `(B)`, `B.` or `B) option text`; rejects anything
/// naming more than one label such as `A/B`, `A, C` or `A or B`.
fn parse_correct_label(value: &str) -> Option<AnswerLabel> {
    let value = unwrap_bold(value.trim());
    let value = value.strip_prefix('(').unwrap_or(value);
    let mut chars = value.char_indices();
    let (_, first) = chars.next()?;
    let label = AnswerLabel::from_char(first)?;

    let rest = &value[first.len_utf8()..];
    let rest = match rest.chars().next() {
        None => return Some(label),
        Some(')') | Some('.') | Some(':') => &rest[1..],
        Some(c) if c.is_whitespace() => rest,
        Some(_) => return None,
    };

    let rest = rest.trim_start().to_ascii_lowercase();
    if rest.starts_with("or ") || rest.starts_with("and ") || rest.starts_with('/') || rest.starts_with(',') || rest.starts_with('&') {
        return None;
    }
    Some(label)
}
