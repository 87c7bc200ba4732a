//! Per-tool, line-regex-driven feedback extraction. Converts one gate's raw
//! stdout+stderr into a bounded list of structured errors, falling back to
//! a raw tail when nothing structured was found.
//!
//! Grounded on the teacher's `application/agent_executor.rs` output
//! post-processing (pattern-matching a subprocess's output into a typed
//! summary rather than passing raw bytes back up the call stack).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::project_detect::ProjectType;

/// Per-gate cap on extracted errors.
const MAX_ERRORS_PER_GATE: usize = 20;
/// Lines kept for the raw-tail fallback when nothing structured parses.
const RAW_TAIL_LINES: usize = 15;

/// One extracted error, as specific as the source tool's output allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedError {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub col: Option<u32>,
    pub code: Option<String>,
    pub message: String,
}

/// Structured feedback for one gate's run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateFeedback {
    pub gate_name: String,
    pub passed: bool,
    pub errors: Vec<ExtractedError>,
    /// Present iff `errors` is empty and the gate failed: the last
    /// `RAW_TAIL_LINES` non-empty output lines, for a human to read.
    pub raw_tail: Vec<String>,
}

/// Feedback aggregated across every gate run in one iteration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StructuredFeedback {
    pub gates: Vec<GateFeedback>,
    pub total_errors: usize,
}

impl StructuredFeedback {
    pub fn all_passed(&self) -> bool {
        self.gates.iter().all(|g| g.passed)
    }

    pub fn push(&mut self, gate: GateFeedback) {
        // Floor of 1 per failed gate so a failure is never invisible even
        // when the regex table found nothing to extract.
        self.total_errors += if gate.passed { 0 } else { gate.errors.len().max(1) };
        self.gates.push(gate);
    }
}

static NODE_TYPECHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<file>.+?)\((?P<line>\d+),(?P<col>\d+)\): error (?P<code>\S+): (?P<msg>.+)$").unwrap());
static NODE_LINT_STYLISH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<file>/\S+):(?P<line>\d+):(?P<col>\d+): (?P<msg>.+?)\s{2,}(?P<rule>\S+)$").unwrap());
static NODE_LINT_COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<file>.+?): line (?P<line>\d+), col (?P<col>\d+) - (?P<rule>\S+): (?P<msg>.+)$").unwrap());
static NODE_TEST_FAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^FAIL (.+)$").unwrap());
static NODE_TEST_ERROR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Error: (.+)$").unwrap());
static RUST_ERROR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^error(\[(?P<code>[^\]]+)\])?: (?P<msg>.+)$").unwrap());
static RUST_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--> (?P<file>.+?):(?P<line>\d+):(?P<col>\d+)$").unwrap());
static GO_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<file>[^:\s]+\.go):(?P<line>\d+):(?P<col>\d+): (?P<msg>.+)$").unwrap());
static PYTHON_FAILED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^FAILED (.+)$").unwrap());
static PYTHON_ERROR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ERROR (.+)$").unwrap());
static PYTHON_ASSERTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?P<msg>AssertionError: .+)$").unwrap());
static MAKE_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<file>[^:\s]+):(?P<line>\d+): error: (?P<msg>.+)$").unwrap());

/// Extract feedback for one gate from its combined stdout+stderr output.
pub fn extract(project_type: ProjectType, gate_name: &str, passed: bool, output: &str) -> GateFeedback {
    if passed {
        return GateFeedback { gate_name: gate_name.to_string(), passed, errors: Vec::new(), raw_tail: Vec::new() };
    }

    let errors = match (project_type, gate_name) {
        (ProjectType::Node, "typecheck") => extract_node_typecheck(output),
        (ProjectType::Node, "lint") => extract_node_lint(output),
        (ProjectType::Node, "tests") => extract_node_tests(output),
        (ProjectType::Rust, _) => extract_rust(output),
        (ProjectType::Go, _) => extract_go(output),
        (ProjectType::Python, _) => extract_python(output),
        (ProjectType::Make, _) => extract_make(output),
        _ => Vec::new(),
    };

    let errors: Vec<ExtractedError> = errors.into_iter().take(MAX_ERRORS_PER_GATE).collect();
    let raw_tail = if errors.is_empty() { raw_tail(output) } else { Vec::new() };

    GateFeedback { gate_name: gate_name.to_string(), passed, errors, raw_tail }
}

fn raw_tail(output: &str) -> Vec<String> {
    let non_empty: Vec<&str> = output.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect();
    let skip = non_empty.len().saturating_sub(RAW_TAIL_LINES);
    non_empty[skip..].iter().map(|l| l.to_string()).collect()
}

fn extract_node_typecheck(output: &str) -> Vec<ExtractedError> {
    output
        .lines()
        .filter_map(|line| {
            NODE_TYPECHECK.captures(line).map(|c| ExtractedError {
                file: Some(c["file"].to_string()),
                line: c.name("line").and_then(|m| m.as_str().parse().ok()),
                col: c.name("col").and_then(|m| m.as_str().parse().ok()),
                code: Some(c["code"].to_string()),
                message: c["msg"].to_string(),
            })
        })
        .collect()
}

fn extract_node_lint(output: &str) -> Vec<ExtractedError> {
    output
        .lines()
        .filter_map(|line| {
            if let Some(c) = NODE_LINT_STYLISH.captures(line) {
                Some(ExtractedError {
                    file: Some(c["file"].to_string()),
                    line: c.name("line").and_then(|m| m.as_str().parse().ok()),
                    col: c.name("col").and_then(|m| m.as_str().parse().ok()),
                    code: Some(c["rule"].to_string()),
                    message: c["msg"].to_string(),
                })
            } else {
                NODE_LINT_COMPACT.captures(line).map(|c| ExtractedError {
                    file: Some(c["file"].to_string()),
                    line: c.name("line").and_then(|m| m.as_str().parse().ok()),
                    col: c.name("col").and_then(|m| m.as_str().parse().ok()),
                    code: Some(c["rule"].to_string()),
                    message: c["msg"].to_string(),
                })
            }
        })
        .collect()
}

fn extract_node_tests(output: &str) -> Vec<ExtractedError> {
    output
        .lines()
        .filter_map(|line| {
            if let Some(c) = NODE_TEST_FAIL.captures(line) {
                return Some(ExtractedError { file: None, line: None, col: None, code: None, message: c[1].to_string() });
            }
            if line.contains("ENOENT") {
                return None;
            }
            NODE_TEST_ERROR
                .captures(line)
                .map(|c| ExtractedError { file: None, line: None, col: None, code: None, message: c[1].to_string() })
        })
        .collect()
}

/// Rust errors span two lines: `error[CODE]: msg` followed (within the
/// next couple of lines) by `--> file:line:col`.
fn extract_rust(output: &str) -> Vec<ExtractedError> {
    let lines: Vec<&str> = output.lines().collect();
    let mut errors = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if let Some(c) = RUST_ERROR.captures(lines[i]) {
            let code = c.name("code").map(|m| m.as_str().to_string());
            let message = c["msg"].to_string();
            let mut file = None;
            let mut line_no = None;
            let mut col = None;
            for lookahead in lines.iter().skip(i + 1).take(3) {
                if let Some(loc) = RUST_LOCATION.captures(lookahead) {
                    file = Some(loc["file"].to_string());
                    line_no = loc.name("line").and_then(|m| m.as_str().parse().ok());
                    col = loc.name("col").and_then(|m| m.as_str().parse().ok());
                    break;
                }
            }
            errors.push(ExtractedError { file, line: line_no, col, code, message });
        }
        i += 1;
    }
    errors
}

fn extract_go(output: &str) -> Vec<ExtractedError> {
    output
        .lines()
        .filter_map(|line| {
            GO_ERROR.captures(line).map(|c| ExtractedError {
                file: Some(c["file"].to_string()),
                line: c.name("line").and_then(|m| m.as_str().parse().ok()),
                col: c.name("col").and_then(|m| m.as_str().parse().ok()),
                code: None,
                message: c["msg"].to_string(),
            })
        })
        .collect()
}

fn extract_python(output: &str) -> Vec<ExtractedError> {
    output
        .lines()
        .filter_map(|line| {
            if let Some(c) = PYTHON_FAILED.captures(line) {
                return Some(ExtractedError { file: None, line: None, col: None, code: None, message: c[1].to_string() });
            }
            if let Some(c) = PYTHON_ERROR.captures(line) {
                return Some(ExtractedError { file: None, line: None, col: None, code: None, message: c[1].to_string() });
            }
            PYTHON_ASSERTION
                .captures(line)
                .map(|c| ExtractedError { file: None, line: None, col: None, code: None, message: c["msg"].to_string() })
        })
        .collect()
}

fn extract_make(output: &str) -> Vec<ExtractedError> {
    output
        .lines()
        .filter_map(|line| {
            MAKE_ERROR.captures(line).map(|c| ExtractedError {
                file: Some(c["file"].to_string()),
                line: c.name("line").and_then(|m| m.as_str().parse().ok()),
                col: None,
                code: None,
                message: c["msg"].to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_typecheck_line_is_extracted() {
        let output = "src/x.ts(3,1): error TS2304: Cannot find name 'f'.";
        let feedback = extract(ProjectType::Node, "typecheck", false, output);
        assert_eq!(feedback.errors.len(), 1);
        assert_eq!(feedback.errors[0].file.as_deref(), Some("src/x.ts"));
        assert_eq!(feedback.errors[0].line, Some(3));
        assert_eq!(feedback.errors[0].code.as_deref(), Some("TS2304"));
        assert!(feedback.raw_tail.is_empty());
    }

    #[test]
    fn rust_error_associates_following_location_line() {
        let output = "error[E0425]: cannot find value `f` in this scope\n --> src/main.rs:10:5\n  |\n";
        let feedback = extract(ProjectType::Rust, "typecheck", false, output);
        assert_eq!(feedback.errors.len(), 1);
        assert_eq!(feedback.errors[0].code.as_deref(), Some("E0425"));
        assert_eq!(feedback.errors[0].file.as_deref(), Some("src/main.rs"));
        assert_eq!(feedback.errors[0].line, Some(10));
    }

    #[test]
    fn no_structured_errors_falls_back_to_raw_tail() {
        let output = (0..20).map(|i| format!("unstructured line {i}")).collect::<Vec<_>>().join("\n");
        let feedback = extract(ProjectType::Go, "tests", false, &output);
        assert!(feedback.errors.is_empty());
        assert_eq!(feedback.raw_tail.len(), RAW_TAIL_LINES);
        assert_eq!(feedback.raw_tail.last().unwrap(), "unstructured line 19");
    }

    #[test]
    fn errors_are_capped_at_twenty_per_gate() {
        let output = (0..50).map(|i| format!("file.go:{i}:1: problem {i}")).collect::<Vec<_>>().join("\n");
        let feedback = extract(ProjectType::Go, "tests", false, &output);
        assert_eq!(feedback.errors.len(), MAX_ERRORS_PER_GATE);
    }

    #[test]
    fn node_test_enoent_lines_are_excluded() {
        let output = "Error: ENOENT: no such file\nFAIL src/x.test.ts";
        let feedback = extract(ProjectType::Node, "tests", false, output);
        assert_eq!(feedback.errors.len(), 1);
        assert_eq!(feedback.errors[0].message, "src/x.test.ts");
    }

    #[test]
    fn total_errors_floors_at_one_per_failed_gate_with_no_structured_errors() {
        let mut sf = StructuredFeedback::default();
        sf.push(extract(ProjectType::Go, "tests", false, "nothing structured here"));
        assert_eq!(sf.total_errors, 1);
    }

    #[test]
    fn passing_gate_contributes_nothing() {
        let mut sf = StructuredFeedback::default();
        sf.push(extract(ProjectType::Go, "tests", true, "all good"));
        assert_eq!(sf.total_errors, 0);
        assert!(sf.all_passed());
    }
}
