use anyhow::{bail, Result};
use std::path::Path;

/// Manifest files from `files` that do not exist under `root`.
pub fn missing_files(root: &Path, files: &[String]) -> Vec<String> {
    files
        .iter()
        .filter(|f| !root.join(f).exists())
        .cloned()
        .collect()
}

/// Fail unless every dependency manifest is present in the project root.
pub fn check(root: &Path, files: &[String]) -> Result<()> {
    let missing = missing_files(root, files);
    if missing.is_empty() {
        return Ok(());
    }
    tracing::debug!(root = %root.display(), ?missing, "prerequisite check failed");
    bail!(
        "Missing {} in {}. Run devup from the project directory.",
        missing.join(", "),
        root.display()
    )
}
