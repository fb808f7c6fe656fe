//! Reconciliation log: the ordered, user-facing record of a run.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineLevel {
    Info,
    Warn,
    Success,
    Mismatch,
    Error,
    Alert,
}

impl fmt::Display for LineLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Mismatch => write!(f, "MISMATCH"),
            Self::Error => write!(f, "ERROR"),
            Self::Alert => write!(f, "ALERT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub level: LineLevel,
    pub text: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.level, self.text)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum OutcomeKind {
    Match,
    Mismatch,
    Error(String),
}

/// Reconciliation result for one agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgencyOutcome {
    pub agency: String,
    /// Summary ALTAS total, when it could be computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<i64>,
    /// Detail rows attributed to the agency.
    pub observed: usize,
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

impl AgencyOutcome {
    pub fn reconciled(agency: &str, expected: i64, observed: usize) -> Self {
        let kind = if expected == observed as i64 {
            OutcomeKind::Match
        } else {
            OutcomeKind::Mismatch
        };
        Self { agency: agency.to_string(), expected: Some(expected), observed, kind }
    }

    pub fn error(agency: &str, observed: usize, reason: impl Into<String>) -> Self {
        Self {
            agency: agency.to_string(),
            expected: None,
            observed,
            kind: OutcomeKind::Error(reason.into()),
        }
    }

    fn line(&self) -> LogLine {
        match &self.kind {
            OutcomeKind::Match | OutcomeKind::Mismatch => {
                let (level, tail) = if self.kind == OutcomeKind::Match {
                    (LineLevel::Success, "OK")
                } else {
                    (LineLevel::Mismatch, "REVIEW")
                };
                LogLine {
                    level,
                    text: format!(
                        "{} | ALTAS:{} | Detail rows:{} | {tail}",
                        self.agency,
                        self.expected.unwrap_or_default(),
                        self.observed
                    ),
                }
            }
            OutcomeKind::Error(reason) => LogLine {
                level: LineLevel::Error,
                text: format!("{} | {reason}", self.agency),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    pub agencies: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub errors: usize,
    pub warnings: usize,
    pub alerts: usize,
}

/// Append-only. Line order is the order events happened.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationLog {
    lines: Vec<LogLine>,
    outcomes: Vec<AgencyOutcome>,
}

impl ReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(LineLevel::Info, text.into());
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(LineLevel::Warn, text.into());
    }

    /// ERROR line that is not tied to a reconciliation outcome
    /// (e.g. an agency whose workbook could not be rendered).
    pub fn error(&mut self, agency: &str, reason: impl Into<String>) {
        self.push(LineLevel::Error, format!("{agency} | {}", reason.into()));
    }

    pub fn alert(&mut self, text: impl Into<String>) {
        self.push(LineLevel::Alert, text.into());
    }

    /// Record an agency outcome and its log line.
    pub fn record(&mut self, outcome: AgencyOutcome) {
        self.lines.push(outcome.line());
        self.outcomes.push(outcome);
    }

    fn push(&mut self, level: LineLevel, text: String) {
        self.lines.push(LogLine { level, text });
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn outcomes(&self) -> &[AgencyOutcome] {
        &self.outcomes
    }

    pub fn count(&self, level: LineLevel) -> usize {
        self.lines.iter().filter(|l| l.level == level).count()
    }

    pub fn summary(&self) -> LogSummary {
        let mut s = LogSummary { agencies: self.outcomes.len(), ..Default::default() };
        for o in &self.outcomes {
            match o.kind {
                OutcomeKind::Match => s.matched += 1,
                OutcomeKind::Mismatch => s.mismatched += 1,
                OutcomeKind::Error(_) => s.errors += 1,
            }
        }
        // Render failures are ERROR lines without an outcome.
        s.errors += self.count(LineLevel::Error)
            - self.outcomes.iter().filter(|o| matches!(o.kind, OutcomeKind::Error(_))).count();
        s.warnings = self.count(LineLevel::Warn);
        s.alerts = self.count(LineLevel::Alert);
        s
    }

    /// True when anything needs a human to look at it.
    pub fn needs_review(&self) -> bool {
        let s = self.summary();
        s.mismatched > 0 || s.errors > 0 || s.alerts > 0
    }

    /// Plain-text form, one line per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}
