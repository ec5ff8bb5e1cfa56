use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names left out of the listing unless the caller overrides the exclusions.
pub const DEFAULT_EXCLUDES: &[&str] = &["node_modules", "dist", r"\.git", "output"];

/// Plain-text tree of a project directory.
pub struct FolderTree {
    root: PathBuf,
    excludes: Vec<Regex>,
}

impl FolderTree {
    /// Create a tree for `root` with the default exclusions
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: DEFAULT_EXCLUDES
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }

    /// Replaces the exclusion patterns. Each pattern is a regex matched against entry names.
    pub fn with_excludes<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.excludes = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .with_context(|| format!("Invalid exclude pattern: {}", p.as_ref()))
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Renders the listing with box-drawing connectors, entries sorted by name.
    pub fn render(&self) -> String {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string());

        let mut lines = vec![name];
        self.render_dir(&self.root, "", &mut lines);
        debug!("Folder listing has {} entries", lines.len() - 1);
        lines.join("\n")
    }

    fn render_dir(&self, dir: &Path, prefix: &str, lines: &mut Vec<String>) {
        let entries: Vec<_> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|entry| !self.is_excluded(&entry.file_name().to_string_lossy()))
            .collect();

        let count = entries.len();
        for (i, entry) in entries.into_iter().enumerate() {
            let last = i + 1 == count;
            let connector = if last { "└── " } else { "├── " };
            lines.push(format!(
                "{}{}{}",
                prefix,
                connector,
                entry.file_name().to_string_lossy()
            ));

            if entry.file_type().is_dir() {
                let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
                self.render_dir(entry.path(), &child_prefix, lines);
            }
        }
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excludes.iter().any(|re| re.is_match(name))
    }
}
