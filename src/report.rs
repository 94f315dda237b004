//! The revert-constraint report.
//!
//! One section per revert block. The text form is the line-oriented log the
//! downstream equivalence checker consumes; [`parse_report`] reads it back.

use crate::expr::Confidence;
use crate::message::Message;
use crate::utils::helpers::colors::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Line closing every section.
pub const SECTION_SEPARATOR: &str =
    "++++++++++++++++++++++++++++++++++++++++++++++++++++++++++++++++++";
/// Message line for blocks without a recovered message.
pub const NO_MESSAGE: &str = "No error message or unhandled for now";
/// Last line of a complete report.
pub const COMPLETED: &str = "Analysis Completed.";

const CONSTRAINT_PREFIX: &str = "constraint:";
const MESSAGE_PREFIX: &str = "message:";

/// Outcome of resolving one block's branch condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Constraint {
    Resolved {
        text: String,
        incomplete: bool,
        degraded: bool,
    },
    Failed {
        error: String,
    },
}

impl Constraint {
    pub fn resolved(text: String, incomplete: bool, confidence: Confidence) -> Self {
        Constraint::Resolved {
            text,
            incomplete,
            degraded: confidence == Confidence::Degraded,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Constraint::Resolved { text, .. } => Some(text),
            Constraint::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Constraint::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub block: String,
    /// Rendered incompleteness notes.
    pub notes: Vec<String>,
    pub constraint: Constraint,
    pub message: Message,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.sections.iter().filter(|s| s.constraint.is_failed()).count()
    }

    pub fn section(&self, block: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.block == block)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sections": self.sections,
            "failures": self.failures(),
        })
    }

    /// Render the line-oriented report.
    pub fn render_text(&self, add_color: bool) -> String {
        let mut out = String::new();
        for s in &self.sections {
            out.push_str(&colorize(&s.block, BOLD, add_color));
            out.push('\n');
            for note in &s.notes {
                out.push_str(&colorize(note, WARNING, add_color));
                out.push('\n');
            }
            match &s.constraint {
                Constraint::Resolved { text, .. } => {
                    out.push_str(&format!("{CONSTRAINT_PREFIX} {text}\n"));
                }
                Constraint::Failed { error } => {
                    let line = format!("{CONSTRAINT_PREFIX} <resolution failed: {error}>");
                    out.push_str(&colorize(&line, FAIL, add_color));
                    out.push('\n');
                }
            }
            match &s.message {
                Message::Found(text) => out.push_str(&format!("{MESSAGE_PREFIX} {text}\n")),
                Message::Absent => out.push_str(&format!("{NO_MESSAGE}\n")),
                Message::Unhandled(reason) => {
                    out.push_str(&colorize(&format!("{NO_MESSAGE} ({reason})"), GRAY, add_color));
                    out.push('\n');
                }
            }
            out.push_str(SECTION_SEPARATOR);
            out.push_str("\n\n");
        }
        out.push_str(COMPLETED);
        out.push('\n');
        out
    }
}

// ---------------------------------------------------------------------------
// Reading reports back
// ---------------------------------------------------------------------------

/// One section of a written report, as read back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportEntry {
    pub block: String,
    pub constraint: String,
    pub message: Option<String>,
    /// The section carried incompleteness notes.
    pub incomplete: bool,
}

impl ReportEntry {
    /// Entries an equivalence check can use: a message is present and the
    /// constraint does not depend on an unfollowed call.
    pub fn is_checkable(&self) -> bool {
        let Some(message) = &self.message else {
            return false;
        };
        !self.constraint.contains(crate::resolver::EXTERNAL_CALL) && !message.contains("SafeMath")
    }
}

/// Parse a text report. Sections without a resolved constraint are skipped.
pub fn parse_report(text: &str) -> Vec<ReportEntry> {
    let mut entries = Vec::new();
    for section in text.split(SECTION_SEPARATOR) {
        let mut lines = section.lines().map(str::trim).filter(|l| !l.is_empty());
        let Some(block) = lines.next() else {
            continue;
        };
        if block == COMPLETED {
            continue;
        }

        let mut constraint = None;
        let mut message = None;
        let mut incomplete = false;
        for line in lines {
            if let Some(rest) = line.strip_prefix(CONSTRAINT_PREFIX) {
                let rest = rest.trim();
                if !rest.starts_with("<resolution failed") {
                    constraint = Some(rest.to_string());
                }
            } else if let Some(rest) = line.strip_prefix(MESSAGE_PREFIX) {
                message = Some(rest.trim().to_string());
            } else if line.contains("constraint may not be complete") {
                incomplete = true;
            }
        }

        if let Some(constraint) = constraint {
            entries.push(ReportEntry {
                block: block.to_string(),
                constraint,
                message,
                incomplete,
            });
        }
    }
    entries
}

/// Drop entries whose `(constraint, message)` pair was already seen.
pub fn dedupe(entries: Vec<ReportEntry>) -> Vec<ReportEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert((e.constraint.clone(), e.message.clone())))
        .collect()
}
