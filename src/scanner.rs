use std::path::Path;

use globset::Glob;
use walkdir::{DirEntry, WalkDir};

use crate::error::UploadError;
use crate::model::FileRef;

/// Walks a directory tree and returns every regular file, pruning anything
/// matched by `exclude_patterns` before descending into it.
///
/// A pattern excludes an entry (file or directory) if either:
/// - it is a valid glob and matches the entry's basename, or
/// - it appears as a literal substring anywhere in the entry's
///   forward-slash relative path (so `__pycache__` excludes the directory
///   and everything under it).
///
/// Excluded directories are pruned with `WalkDir::filter_entry` rather than
/// filtered out after the fact, so their subtrees are never descended into.
pub struct Scanner {
    exclude_patterns: Vec<String>,
}

impl Scanner {
    pub fn new(exclude_patterns: Vec<String>) -> Self {
        Self { exclude_patterns }
    }

    /// Scan `root` for regular files. When `recursive` is false, only
    /// immediate children of `root` that are regular files are produced.
    pub fn scan(&self, root: &Path, recursive: bool) -> Result<Vec<FileRef>, UploadError> {
        if !root.exists() {
            return Err(UploadError::InvalidInput(format!(
                "scan root does not exist: {}",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(UploadError::InvalidInput(format!(
                "scan root is not a directory: {}",
                root.display()
            )));
        }

        let globs: Vec<Glob> =
            self.exclude_patterns.iter().filter_map(|p| Glob::new(p).ok()).collect();

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut out = Vec::new();
        let walker = WalkDir::new(root).follow_links(false).max_depth(max_depth).into_iter();
        for entry in walker.filter_entry(|e| !self.prunes(root, e, &globs)) {
            let entry = entry.map_err(|e| UploadError::Internal(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| UploadError::Internal(e.to_string()))?;
            let relative_str = normalize_separators(relative);

            let size_bytes = entry.metadata().map_err(|e| UploadError::Internal(e.to_string()))?.len();
            out.push(FileRef {
                local_path: entry.path().to_path_buf(),
                relative_path: relative_str,
                size_bytes,
            });
        }
        Ok(out)
    }

    /// Stat a single file directly, for tasks whose source is a file rather
    /// than a directory. The returned `relative_path` is just the file's
    /// base name, since there is no scan root to be relative to.
    pub fn stat(&self, path: &Path) -> Result<FileRef, UploadError> {
        let metadata = std::fs::metadata(path).map_err(UploadError::from)?;
        if !metadata.is_file() {
            return Err(UploadError::InvalidInput(format!("not a regular file: {}", path.display())));
        }
        let relative_path = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        Ok(FileRef { local_path: path.to_path_buf(), relative_path, size_bytes: metadata.len() })
    }

    /// True if `entry` should be pruned: the root itself is never pruned,
    /// otherwise either exclusion form matches its basename/relative path.
    fn prunes(&self, root: &Path, entry: &DirEntry, globs: &[Glob]) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let basename = entry.file_name().to_str().unwrap_or("");
        for glob in globs {
            if glob.compile_matcher().is_match(basename) {
                return true;
            }
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let relative_str = normalize_separators(relative);
        for pattern in &self.exclude_patterns {
            if !pattern.is_empty() && relative_str.contains(pattern.as_str()) {
                return true;
            }
        }
        false
    }
}

fn normalize_separators(p: &Path) -> String {
    let s = p.to_string_lossy().to_string();
    if s.contains('\\') { s.replace('\\', "/") } else { s }
}
