use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use super::validate_change::REQUIRED_CHANGE_DOCS;
use crate::repo;

/// Lowercase kebab-case: `[a-z0-9]+(-[a-z0-9]+)*`.
pub fn is_change_slug(id: &str) -> bool {
    !id.is_empty()
        && id
            .split('-')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()))
}

fn heading_for(doc: &str) -> String {
    let stem = doc.trim_end_matches(".md");
    let words = stem
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>();
    format!("# {}\n", words.join(" "))
}

/// Write missing templates; existing documents are left untouched.
pub fn scaffold(root: &Path, change_id: &str) -> Result<Vec<PathBuf>> {
    if !is_change_slug(change_id) {
        bail!("invalid change id `{change_id}`: use a lowercase kebab-case slug");
    }
    let folder = root.join("changes").join(change_id);
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("failed to create {}", folder.display()))?;

    let mut written = Vec::new();
    for doc in REQUIRED_CHANGE_DOCS {
        let path = folder.join(doc);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, heading_for(doc))
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(repo::rel_from(root, &path));
    }
    Ok(written)
}

pub fn run(change_id: &str, root: Option<PathBuf>) -> Result<ExitCode> {
    let root = match root {
        Some(root) => root,
        None => repo::repo_root()?,
    };
    let written = scaffold(&root, change_id)?;
    if written.is_empty() {
        println!("changes/{change_id} already carries every required document");
    }
    for path in written {
        println!("created {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
