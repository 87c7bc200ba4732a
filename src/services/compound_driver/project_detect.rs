//! Project type detection: a file-presence vote over the fleet branch's
//! working directory, and the fixed per-type gate-command table.
//!
//! Grounded on the teacher's `application/loop_executor.rs` convergence
//! setup step, which likewise inspects the target directory once before
//! entering the iteration loop.

use std::path::Path;

/// One project family, each with a fixed table of quality gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectType {
    Node,
    Rust,
    Go,
    Python,
    Make,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Python => "python",
            Self::Make => "make",
        }
    }
}

/// One command whose zero exit status is evidence of a quality invariant.
#[derive(Debug, Clone)]
pub struct Gate {
    pub name: &'static str,
    pub program: &'static str,
    pub args: Vec<&'static str>,
}

impl Gate {
    fn new(name: &'static str, program: &'static str, args: &[&'static str]) -> Self {
        Self { name, program, args: args.to_vec() }
    }
}

/// Vote for a project type by file presence, in the fixed precedence order
/// spec §4.F names: `package.json` -> node, `Cargo.toml` -> rust,
/// `go.mod` -> go, `pyproject.toml`/`setup.py` -> python, `Makefile` -> make.
pub fn detect(root: &Path) -> Option<ProjectType> {
    if root.join("package.json").is_file() {
        Some(ProjectType::Node)
    } else if root.join("Cargo.toml").is_file() {
        Some(ProjectType::Rust)
    } else if root.join("go.mod").is_file() {
        Some(ProjectType::Go)
    } else if root.join("pyproject.toml").is_file() || root.join("setup.py").is_file() {
        Some(ProjectType::Python)
    } else if root.join("Makefile").is_file() {
        Some(ProjectType::Make)
    } else {
        None
    }
}

/// The fixed gate table for a project type, before PATH filtering.
pub fn gate_table(project_type: ProjectType) -> Vec<Gate> {
    match project_type {
        ProjectType::Node => vec![
            Gate::new("typecheck", "tsc", &["--noEmit"]),
            Gate::new("lint", "eslint", &["."]),
            Gate::new("tests", "npm", &["test", "--silent"]),
            Gate::new("build", "npm", &["run", "build"]),
        ],
        ProjectType::Rust => vec![
            Gate::new("typecheck", "cargo", &["check", "--all-targets"]),
            Gate::new("lint", "cargo", &["clippy", "--all-targets", "--", "-D", "warnings"]),
            Gate::new("tests", "cargo", &["test"]),
            Gate::new("build", "cargo", &["build", "--release"]),
        ],
        ProjectType::Go => vec![
            Gate::new("typecheck", "go", &["vet", "./..."]),
            Gate::new("lint", "golangci-lint", &["run"]),
            Gate::new("tests", "go", &["test", "./..."]),
            Gate::new("build", "go", &["build", "./..."]),
        ],
        ProjectType::Python => vec![
            Gate::new("typecheck", "mypy", &["."]),
            Gate::new("lint", "ruff", &["check", "."]),
            Gate::new("tests", "pytest", &["-q"]),
        ],
        ProjectType::Make => vec![Gate::new("build", "make", &[])],
    }
}

/// Drop gates whose program is absent from `PATH`, recording each drop so
/// the caller can warn about it.
pub fn resolve_gates(gates: Vec<Gate>) -> (Vec<Gate>, Vec<String>) {
    let mut resolved = Vec::with_capacity(gates.len());
    let mut dropped = Vec::new();
    for gate in gates {
        if which::which(gate.program).is_ok() {
            resolved.push(gate);
        } else {
            dropped.push(format!("gate '{}' dropped: '{}' not found on PATH", gate.name, gate.program));
        }
    }
    (resolved, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn node_wins_when_package_json_present() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        assert_eq!(detect(dir.path()), Some(ProjectType::Node));
    }

    #[test]
    fn rust_detected_from_cargo_toml_alone() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        assert_eq!(detect(dir.path()), Some(ProjectType::Rust));
    }

    #[test]
    fn no_markers_yields_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect(dir.path()), None);
    }

    #[test]
    fn unresolvable_program_is_dropped_with_a_reason() {
        let gates = vec![Gate::new("bogus", "definitely-not-a-real-binary-xyz", &[])];
        let (resolved, dropped) = resolve_gates(gates);
        assert!(resolved.is_empty());
        assert_eq!(dropped.len(), 1);
    }
}
