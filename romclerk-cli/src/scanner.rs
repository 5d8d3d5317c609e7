//! Recursive ROM directory scanner.
//!
//! Walks a tree depth-first and yields every file with a curated
//! extension. Entries are sorted within each directory so scan order is
//! reproducible across platforms.

use std::path::{Path, PathBuf};

/// File extensions the scanner picks up, lowercase.
pub const ROM_EXTENSIONS: &[&str] = &["nes", "unf", "unif", "fds"];

/// Collect every matching file under `root`, depth-first.
pub fn scan_rom_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    visit(root, &mut found)?;
    Ok(found)
}

fn visit(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            visit(&path, found)?;
        } else if has_rom_extension(&path) {
            found.push(path);
        }
    }

    Ok(())
}

fn has_rom_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            let lowered = extension.to_lowercase();
            ROM_EXTENSIONS.contains(&lowered.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "tests/scanner_tests.rs"]
mod tests;
