use anyhow::Result;
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names that never contain project sources.
const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "output"];

/// File scanner for traversing TypeScript project directories.
///
/// The `FileScanner` recursively walks the project's `src` directory (or the project root when
/// there is no `src`) and collects every `.ts` file. Hidden directories, `node_modules`, `dist`
/// and `output` are skipped.
///
/// # Example
///
/// ```no_run
/// use docgen_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-nest-app"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} TypeScript files", result.source_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Paths to all discovered `.ts` files, sorted
    pub source_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified project root.
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// The directory actually walked: `<root>/src` when present, otherwise the root.
    pub fn source_root(&self) -> PathBuf {
        let src = self.root_path.join("src");
        if src.is_dir() {
            src
        } else {
            self.root_path.clone()
        }
    }

    /// Scans the directory tree and collects all TypeScript files.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    pub fn scan(&self) -> Result<ScanResult> {
        let walk_root = self.source_root();
        let mut source_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&walk_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.path() == walk_root || !is_skipped(e.path()))
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file() && is_typescript(path) {
                        source_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        source_files.sort();

        Ok(ScanResult {
            source_files,
            warnings,
        })
    }
}

fn is_skipped(path: &Path) -> bool {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    file_name.starts_with('.') || SKIPPED_DIRS.contains(&file_name.as_ref())
}

/// `.ts` sources, declaration files included. `.tsx` is not scanned.
pub fn is_typescript(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("ts")
}
