//! `os-validate`: substantive diffs must ship a complete `changes/<change-id>/` folder.
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anyhow::{bail, Context, Result};

use crate::repo;

const META_FILES: [&str; 4] = [".editorconfig", ".gitattributes", ".gitignore", "README.md"];
const META_PREFIXES: [&str; 2] = [".github/", ".os/"];
const NEW_BRANCH_BASE: &str = "0000000000000000000000000000000000000000";

/// Documents every change folder must carry.
pub const REQUIRED_CHANGE_DOCS: [&str; 9] = [
    "acceptance.md",
    "assumptions.md",
    "design_contract.md",
    "eval_contract.md",
    "ops_contract.md",
    "options.md",
    "risk_register.md",
    "rollback.md",
    "spec.md",
];

pub const EXIT_MISSING_FOLDER: u8 = 2;
pub const EXIT_INCOMPLETE_DOCS: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitDiff {
    pub base: String,
    pub head: String,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocProblem {
    Missing(String),
    Empty(String),
}

impl fmt::Display for DocProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocProblem::Missing(path) => write!(f, "{path}"),
            DocProblem::Empty(path) => write!(f, "{path} (empty)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDocsOutcome {
    NoSubstantiveChanges,
    Valid { change_ids: Vec<String> },
    MissingChangeFolder,
    IncompleteDocs { problems: Vec<DocProblem> },
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "git {} failed ({}): {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn non_blank_lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Top-level directory of the git checkout containing the current directory.
pub fn git_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to obtain current directory")?;
    let root = run_git(&cwd, &["rev-parse", "--show-toplevel"])?;
    let root = root.trim();
    if root.is_empty() {
        bail!("failed to determine repository root via git");
    }
    Ok(PathBuf::from(root))
}

/// Paths touched between `base...head`; an all-zero base lists the whole `head` tree.
pub fn diff_paths(repo: &Path, base: &str, head: &str) -> Result<GitDiff> {
    if base.is_empty() || head.is_empty() {
        bail!("missing --base/--head");
    }
    let out = if base == NEW_BRANCH_BASE {
        run_git(repo, &["ls-tree", "-r", "--name-only", head])?
    } else {
        run_git(repo, &["diff", "--name-only", &format!("{base}...{head}")])?
    };
    Ok(GitDiff {
        base: base.to_string(),
        head: head.to_string(),
        paths: non_blank_lines(&out),
    })
}

pub fn is_meta_path(path: &str) -> bool {
    META_FILES.contains(&path) || META_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

pub fn change_ids_from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    paths
        .into_iter()
        .filter_map(|path| {
            let mut parts = path.split('/');
            match (parts.next(), parts.next()) {
                (Some("changes"), Some(id)) => Some(id.to_string()),
                _ => None,
            }
        })
        .collect()
}

fn is_blank_file(path: &Path) -> Result<bool> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(bytes.iter().all(u8::is_ascii_whitespace))
}

pub fn validate_change_folder(root: &Path, change_id: &str) -> Result<Vec<DocProblem>> {
    let folder = root.join("changes").join(change_id);
    let mut problems = Vec::new();
    for doc in REQUIRED_CHANGE_DOCS {
        let rel = format!("changes/{change_id}/{doc}");
        let path = folder.join(doc);
        if !path.is_file() {
            problems.push(DocProblem::Missing(rel));
        } else if is_blank_file(&path)? {
            problems.push(DocProblem::Empty(rel));
        }
    }
    Ok(problems)
}

pub fn evaluate(root: &Path, paths: &[String]) -> Result<ChangeDocsOutcome> {
    let substantive = paths
        .iter()
        .any(|path| !is_meta_path(path) && !path.starts_with("changes/"));
    if !substantive {
        return Ok(ChangeDocsOutcome::NoSubstantiveChanges);
    }

    let change_ids = change_ids_from_paths(paths.iter().map(String::as_str));
    if change_ids.is_empty() {
        return Ok(ChangeDocsOutcome::MissingChangeFolder);
    }

    let mut problems = Vec::new();
    for change_id in &change_ids {
        problems.extend(validate_change_folder(root, change_id)?);
    }
    if problems.is_empty() {
        Ok(ChangeDocsOutcome::Valid {
            change_ids: change_ids.into_iter().collect(),
        })
    } else {
        Ok(ChangeDocsOutcome::IncompleteDocs { problems })
    }
}

fn report_problems(problems: &[DocProblem]) -> ExitCode {
    eprintln!("ERROR: Missing required change docs:");
    for problem in problems {
        eprintln!("- {problem}");
    }
    ExitCode::from(EXIT_INCOMPLETE_DOCS)
}

/// `xtask validate-change --base <rev> --head <rev>`
pub fn run(base: &str, head: &str) -> Result<ExitCode> {
    let root = git_root()?;
    let diff = diff_paths(&root, base, head)?;

    match evaluate(&root, &diff.paths)? {
        ChangeDocsOutcome::NoSubstantiveChanges => {
            println!("PASS: no substantive changes between {base} and {head}");
            Ok(ExitCode::SUCCESS)
        }
        ChangeDocsOutcome::Valid { change_ids } => {
            println!("PASS: change docs complete for {}", change_ids.join(", "));
            Ok(ExitCode::SUCCESS)
        }
        ChangeDocsOutcome::MissingChangeFolder => {
            eprintln!(
                "ERROR: Substantive changes detected but no changes/<change-id>/ docs were modified."
            );
            eprintln!("Base: {}", diff.base);
            eprintln!("Head: {}", diff.head);
            eprintln!("Add a changes/<change-id>/ folder and include it in the same PR/commit.");
            Ok(ExitCode::from(EXIT_MISSING_FOLDER))
        }
        ChangeDocsOutcome::IncompleteDocs { problems } => Ok(report_problems(&problems)),
    }
}

/// `xtask check-change <id>`: validate one folder without consulting git.
pub fn run_check(change_id: &str, root: Option<PathBuf>) -> Result<ExitCode> {
    let root = match root {
        Some(root) => root,
        None => repo::repo_root()?,
    };
    let problems = validate_change_folder(&root, change_id)?;
    if !problems.is_empty() {
        return Ok(report_problems(&problems));
    }
    println!("PASS: changes/{change_id} carries every required document");
    Ok(ExitCode::SUCCESS)
}
