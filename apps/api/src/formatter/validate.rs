//! Response validation: character budget and required section layout.
//!
//! Validation never fails. A response that is over budget is cut and marked, a
//! response with missing or shuffled sections is passed through untouched, and
//! both cases are reported as `PartialFormatWarning`s alongside the text.
//!
//! Over-budget responses are shortened section by section: the bodies of
//! Pattern Analysis and Monitoring go first, then Root Cause Hypothesis and
//! Escalation. Severity and Immediate Actions are only cut when they alone
//! overflow the budget.

use serde::Serialize;

use crate::formatter::sections::{header_section, scan_sections, Section};

/// Maximum length of an analysis, in characters.
pub const MAX_RESPONSE_CHARS: usize = 1900;

/// Appended to any text cut to fit a budget.
pub const TRUNCATION_MARKER: &str = "\n…[truncated]";

/// `TRUNCATION_MARKER` as a line of its own, closing a shortened section body.
const MARKER_LINE: &str = "…[truncated]";

/// Sections whose bodies give way, in order, when a response is over budget.
const SHRINK_ORDER: [Section; 4] = [
    Section::PatternAnalysis,
    Section::Monitoring,
    Section::RootCauseHypothesis,
    Section::Escalation,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartialFormatWarning {
    /// Required headers absent from the backend response.
    MissingSections { sections: Vec<Section> },
    /// All headers present but not in the required order.
    SectionsOutOfOrder { found: Vec<Section> },
    /// The response exceeded the budget; `dropped_sections` were lost to the cut.
    Truncated {
        original_chars: usize,
        dropped_sections: Vec<Section>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResponse {
    pub text: String,
    pub warnings: Vec<PartialFormatWarning>,
}

impl ValidatedResponse {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub fn validate_response(raw: &str) -> ValidatedResponse {
    let mut warnings = Vec::new();

    let scan = scan_sections(raw);
    if !scan.is_complete() {
        let missing = scan.missing();
        if missing.is_empty() {
            warnings.push(PartialFormatWarning::SectionsOutOfOrder {
                found: scan.found.clone(),
            });
        } else {
            warnings.push(PartialFormatWarning::MissingSections { sections: missing });
        }
    }

    let original_chars = raw.chars().count();
    if original_chars <= MAX_RESPONSE_CHARS {
        return ValidatedResponse {
            text: raw.to_string(),
            warnings,
        };
    }

    let text = truncate_sections(raw, MAX_RESPONSE_CHARS);
    let kept = scan_sections(&text);
    let dropped_sections = scan
        .found
        .iter()
        .copied()
        .filter(|s| !kept.found.contains(s))
        .collect();
    warnings.push(PartialFormatWarning::Truncated {
        original_chars,
        dropped_sections,
    });

    ValidatedResponse { text, warnings }
}

/// A header line and the body lines under it. The leading block holds any text
/// before the first header and has no section.
struct Block<'a> {
    section: Option<Section>,
    lines: Vec<&'a str>,
}

fn split_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = vec![Block {
        section: None,
        lines: Vec::new(),
    }];
    for line in text.split('\n') {
        match header_section(line) {
            Some(section) => blocks.push(Block {
                section: Some(section),
                lines: vec![line],
            }),
            None => {
                if let Some(block) = blocks.last_mut() {
                    block.lines.push(line);
                }
            }
        }
    }
    blocks
}

fn rendered_chars(blocks: &[Block<'_>]) -> usize {
    let (chars, lines) = blocks
        .iter()
        .flat_map(|b| b.lines.iter())
        .fold((0, 0), |(chars, lines), line| {
            (chars + line.chars().count(), lines + 1)
        });
    (chars + lines).saturating_sub(1)
}

fn render_blocks(blocks: &[Block<'_>]) -> String {
    blocks
        .iter()
        .flat_map(|b| b.lines.iter().copied())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Header plus the first `keep` body lines of `original`, closed by the marker.
/// The blank line separating it from the next section is kept.
fn shortened<'a>(original: &[&'a str], keep: usize, last: bool) -> Vec<&'a str> {
    let mut lines = original[..=keep].to_vec();
    while lines.len() > 1 && lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.push(MARKER_LINE);
    if !last && original.last().is_some_and(|l| l.trim().is_empty()) {
        lines.push("");
    }
    lines
}

/// Cuts `text` to at most `budget` characters, shrinking section bodies in
/// `SHRINK_ORDER` at line boundaries before anything else is touched.
pub fn truncate_sections(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let mut blocks = split_blocks(text);
    let last = blocks.len() - 1;
    for section in SHRINK_ORDER {
        for index in 0..blocks.len() {
            if blocks[index].section != Some(section) {
                continue;
            }
            let total = rendered_chars(&blocks);
            if total <= budget {
                return render_blocks(&blocks);
            }

            let original = blocks[index].lines.clone();
            let body_lines = original.len() - 1;
            for keep in (0..body_lines).rev() {
                blocks[index].lines = shortened(&original, keep, index == last);
                if rendered_chars(&blocks) <= budget {
                    return render_blocks(&blocks);
                }
            }
            if rendered_chars(&blocks) >= total {
                blocks[index].lines = original;
            }
        }
    }

    truncate_to_budget(&render_blocks(&blocks), budget)
}

/// Cuts `text` to at most `budget` characters, marker included.
///
/// The cut lands on the last line break inside the kept window when that keeps at
/// least half of it, so the reader does not get a half-finished bullet.
pub fn truncate_to_budget(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if budget <= marker_chars {
        return text.chars().take(budget).collect();
    }

    let keep = budget - marker_chars;
    let end = text
        .char_indices()
        .nth(keep)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let window = &text[..end];

    let head = match window.rfind('\n') {
        Some(idx) if idx >= window.len() / 2 => &window[..idx],
        _ => window,
    };

    let mut out = String::with_capacity(head.len() + TRUNCATION_MARKER.len());
    out.push_str(head.trim_end());
    out.push_str(TRUNCATION_MARKER);
    out
}
