//! Built-in diff analyzers.
//!
//! Each analyzer scans the added lines of a unified diff against a
//! fixed rule set. Rules are intentionally shallow pattern checks;
//! the value here is the worker contract, not static-analysis depth.

use super::{Analyzer, AnalyzerError, AnalyzerFactory, AnalyzerOutcome};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, OnceLock};
use synapse_types::{Finding, Severity, TaskRequest};

/// Which built-in analyzer a configured worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    Security,
    Performance,
    Style,
}

impl AnalyzerKind {
    pub fn factory(self) -> AnalyzerFactory {
        match self {
            AnalyzerKind::Security => Arc::new(|| Arc::new(SecurityAnalyzer) as Arc<dyn Analyzer>),
            AnalyzerKind::Performance => {
                Arc::new(|| Arc::new(PerformanceAnalyzer) as Arc<dyn Analyzer>)
            }
            AnalyzerKind::Style => Arc::new(|| Arc::new(StyleAnalyzer) as Arc<dyn Analyzer>),
        }
    }
}

/// One added line of a diff, attributed to the file it landed in.
struct AddedLine {
    file: Option<String>,
    line: u32,
    text: String,
}

/// Walk a unified diff and collect added lines with their target file.
/// Line numbers are taken from `@@ +start` hunk headers.
fn added_lines(diff: &str) -> Vec<AddedLine> {
    static HUNK: OnceLock<Option<Regex>> = OnceLock::new();
    let hunk = HUNK.get_or_init(|| Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)").ok());

    let mut lines = Vec::new();
    let mut file: Option<String> = None;
    let mut next_line: u32 = 0;
    for raw in diff.lines() {
        if let Some(path) = raw.strip_prefix("+++ b/") {
            file = Some(path.trim().to_string());
        } else if raw.starts_with("@@") {
            next_line = hunk
                .as_ref()
                .and_then(|re| re.captures(raw))
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
        } else if let Some(text) = raw.strip_prefix('+') {
            if !raw.starts_with("+++") {
                lines.push(AddedLine {
                    file: file.clone(),
                    line: next_line,
                    text: text.to_string(),
                });
                next_line = next_line.saturating_add(1);
            }
        } else if !raw.starts_with('-') {
            next_line = next_line.saturating_add(1);
        }
    }
    lines
}

struct Rule {
    pattern: &'static str,
    category: &'static str,
    message: &'static str,
    severity: Severity,
}

fn compiled(rules: &'static [Rule], cache: &'static OnceLock<Vec<(Regex, &'static Rule)>>) -> &'static [(Regex, &'static Rule)] {
    cache.get_or_init(|| {
        rules
            .iter()
            .filter_map(|rule| Regex::new(rule.pattern).ok().map(|re| (re, rule)))
            .collect()
    })
}

fn scan(diff: &str, rules: &'static [(Regex, &'static Rule)]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for added in added_lines(diff) {
        for (regex, rule) in rules {
            if regex.is_match(&added.text) {
                let mut finding = Finding::new(rule.category, rule.message, rule.severity);
                if let Some(file) = &added.file {
                    finding = finding.with_location(file.clone(), added.line);
                }
                findings.push(finding);
            }
        }
    }
    findings
}

// ============================================================================
// Security
// ============================================================================

static SECURITY_RULES: [Rule; 4] = [
    Rule {
        pattern: r#"(?i)(password|passwd|secret|api[_-]?key|token)\s*[:=]\s*["'][^"']+["']"#,
        category: "hardcoded_secret",
        message: "credential-looking literal in added code",
        severity: Severity::Critical,
    },
    Rule {
        pattern: r"(?i)\beval\s*\(",
        category: "dynamic_eval",
        message: "dynamic evaluation of runtime input",
        severity: Severity::Major,
    },
    Rule {
        pattern: r#"(?i)(select|insert|update|delete)\b.*(\+\s*[a-z_]|format!|%s)"#,
        category: "sql_string_building",
        message: "SQL assembled from string fragments",
        severity: Severity::Major,
    },
    Rule {
        pattern: r"http://[^\s\x22']+",
        category: "insecure_transport",
        message: "plaintext http URL",
        severity: Severity::Minor,
    },
];

pub struct SecurityAnalyzer;

#[async_trait]
impl Analyzer for SecurityAnalyzer {
    fn name(&self) -> &str {
        "security"
    }

    async fn analyze(&self, request: &TaskRequest) -> Result<AnalyzerOutcome, AnalyzerError> {
        static CACHE: OnceLock<Vec<(Regex, &'static Rule)>> = OnceLock::new();
        let findings = scan(&request.diff, compiled(&SECURITY_RULES, &CACHE));
        let mut recommendations = Vec::new();
        if findings.iter().any(|f| f.category == "hardcoded_secret") {
            recommendations.push(json!("rotate the exposed credential and load it from the environment"));
        }
        Ok(AnalyzerOutcome {
            confidence: if findings.is_empty() { 0.9 } else { 0.8 },
            findings,
            recommendations,
        })
    }
}

// ============================================================================
// Performance
// ============================================================================

static PERFORMANCE_RULES: [Rule; 3] = [
    Rule {
        pattern: r"(?i)\bsleep\s*\(",
        category: "blocking_sleep",
        message: "sleep call on what may be a hot path",
        severity: Severity::Major,
    },
    Rule {
        pattern: r"(?i)select\s+\*",
        category: "select_star",
        message: "unbounded column selection",
        severity: Severity::Minor,
    },
    Rule {
        pattern: r"\.collect\(\)[^;]*\.len\(\)",
        category: "collect_to_count",
        message: "materializing a collection just to count it",
        severity: Severity::Minor,
    },
];

pub struct PerformanceAnalyzer;

#[async_trait]
impl Analyzer for PerformanceAnalyzer {
    fn name(&self) -> &str {
        "performance"
    }

    async fn analyze(&self, request: &TaskRequest) -> Result<AnalyzerOutcome, AnalyzerError> {
        static CACHE: OnceLock<Vec<(Regex, &'static Rule)>> = OnceLock::new();
        let mut findings = scan(&request.diff, compiled(&PERFORMANCE_RULES, &CACHE));

        let clones = added_lines(&request.diff)
            .iter()
            .filter(|l| l.text.contains(".clone()"))
            .count();
        if clones > 3 {
            findings.push(Finding::new(
                "clone_heavy",
                format!("{clones} clone calls added in one change"),
                Severity::Minor,
            ));
        }

        let mut recommendations = Vec::new();
        if request.files_changed > 20 {
            recommendations.push(json!("change touches many files; consider a targeted benchmark run"));
        }
        Ok(AnalyzerOutcome {
            confidence: 0.6,
            findings,
            recommendations,
        })
    }
}

// ============================================================================
// Style
// ============================================================================

static STYLE_RULES: [Rule; 2] = [
    Rule {
        pattern: r"(?i)\b(todo|fixme|xxx)\b",
        category: "leftover_marker",
        message: "unresolved TODO/FIXME marker",
        severity: Severity::Info,
    },
    Rule {
        pattern: r"(println!|dbg!|console\.log|print\()",
        category: "debug_output",
        message: "debug print left in the change",
        severity: Severity::Minor,
    },
];

pub struct StyleAnalyzer;

#[async_trait]
impl Analyzer for StyleAnalyzer {
    fn name(&self) -> &str {
        "style"
    }

    async fn analyze(&self, request: &TaskRequest) -> Result<AnalyzerOutcome, AnalyzerError> {
        static CACHE: OnceLock<Vec<(Regex, &'static Rule)>> = OnceLock::new();
        let mut findings = scan(&request.diff, compiled(&STYLE_RULES, &CACHE));

        for added in added_lines(&request.diff) {
            if added.text.len() > 120 {
                let mut finding =
                    Finding::new("long_line", "line exceeds 120 characters", Severity::Info);
                if let Some(file) = &added.file {
                    finding = finding.with_location(file.clone(), added.line);
                }
                findings.push(finding);
            }
        }

        Ok(AnalyzerOutcome {
            confidence: 0.9,
            findings,
            recommendations: Vec::new(),
        })
    }
}
