//! Required section layout of an analysis response.
//!
//! A header is a line whose text, once leading markdown and emoji decoration is
//! stripped (`**`, `#`, `🚨 `), starts with the section title. List items are
//! body text even when they start with a title. An undecorated line needs the
//! title alone or followed by `:`. Matching is ASCII case-insensitive so
//! `SEVERITY:` and `Severity:` both count.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Severity,
    PatternAnalysis,
    RootCauseHypothesis,
    ImmediateActions,
    Monitoring,
    Escalation,
}

impl Section {
    /// Required sections, in the order the response must present them.
    pub const ALL: [Section; 6] = [
        Section::Severity,
        Section::PatternAnalysis,
        Section::RootCauseHypothesis,
        Section::ImmediateActions,
        Section::Monitoring,
        Section::Escalation,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Severity => "Severity",
            Section::PatternAnalysis => "Pattern Analysis",
            Section::RootCauseHypothesis => "Root Cause Hypothesis",
            Section::ImmediateActions => "Immediate Actions",
            Section::Monitoring => "Monitoring",
            Section::Escalation => "Escalation",
        }
    }
}

/// Which required headers a text contains, and whether they appear in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionScan {
    /// First occurrence of each header, in text order.
    pub found: Vec<Section>,
}

impl SectionScan {
    pub fn missing(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| !self.found.contains(s))
            .collect()
    }

    pub fn in_order(&self) -> bool {
        self.found.windows(2).all(|pair| pair[0] < pair[1])
    }

    pub fn is_complete(&self) -> bool {
        self.found.len() == Section::ALL.len() && self.in_order()
    }
}

pub fn scan_sections(text: &str) -> SectionScan {
    let mut found = Vec::with_capacity(Section::ALL.len());
    for line in text.lines() {
        if let Some(section) = header_section(line) {
            if !found.contains(&section) {
                found.push(section);
            }
        }
    }
    SectionScan { found }
}

pub(crate) fn header_section(line: &str) -> Option<Section> {
    let line = line.trim_start();
    if is_list_item(line) {
        return None;
    }
    let text = line.trim_start_matches(|c: char| !c.is_alphanumeric());
    let decorated = text.len() < line.len();
    Section::ALL.into_iter().find(|section| {
        let title = section.title();
        let Some(head) = text.get(..title.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(title) {
            return false;
        }
        let rest = &text[title.len()..];
        // Reject longer words such as "Severityish" or "Monitoring-tool".
        if rest
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return false;
        }
        // A bare line only counts when the title stands alone or ends in a colon.
        let rest = rest.trim_start();
        decorated || rest.is_empty() || rest.starts_with(':')
    })
}

/// `- item`, `* item`, `+ item`, `• item`, `1. item`, `1) item`.
fn is_list_item(line: &str) -> bool {
    if let Some(rest) = line.strip_prefix(|c: char| matches!(c, '-' | '*' | '+' | '•')) {
        return rest.starts_with(char::is_whitespace);
    }
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    digits > 0
        && matches!(line[digits..].chars().next(), Some('.' | ')'))
        && line[digits + 1..].starts_with(char::is_whitespace)
}
