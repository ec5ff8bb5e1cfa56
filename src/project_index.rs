//! Module resolution table for one documentation request.
//!
//! Every TypeScript module the request touches is parsed once and kept here, keyed by its
//! canonical absolute path. Project files are loaded up front by [`ProjectIndex::build`];
//! anything reached only through an import is parsed on demand and cached for the rest of
//! the request.

use crate::declarations::{Declaration, ImportKind, ReExport, SourceModule};
use crate::parser::AstParser;
use crate::scanner::FileScanner;
use anyhow::Result;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

/// Suffixes tried, in order, when an import specifier has no extension.
const MODULE_SUFFIXES: &[&str] = &[".ts", ".tsx", ".d.ts"];

/// The parts of `tsconfig.json` that influence module resolution.
#[derive(Debug, Clone, Default)]
pub struct TsConfig {
    /// Absolute base for non-relative specifiers; the project root when unset
    pub base_url: Option<PathBuf>,
    /// `compilerOptions.paths`, pattern -> targets, in file order
    pub paths: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    base_url: Option<String>,
    paths: Option<IndexMap<String, Vec<String>>>,
}

impl TsConfig {
    /// Reads `<root>/tsconfig.json` best effort; a missing or unreadable file yields defaults.
    pub fn load(root: &Path) -> Self {
        let path = root.join("tsconfig.json");
        let Ok(content) = fs::read_to_string(&path) else {
            debug!("No tsconfig.json at {}", path.display());
            return Self::default();
        };

        match serde_json::from_str::<RawTsConfig>(&strip_json_comments(&content)) {
            Ok(raw) => {
                let options = raw.compiler_options;
                let base_url = options
                    .as_ref()
                    .and_then(|o| o.base_url.as_ref())
                    .map(|b| normalize(&root.join(b)));
                let paths = options.and_then(|o| o.paths).unwrap_or_default();
                debug!(
                    "tsconfig: baseUrl={:?}, {} path aliases",
                    base_url,
                    paths.len()
                );
                Self { base_url, paths }
            }
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Remove `//` and `/* */` comments and trailing commas so tsconfig files parse as JSON.
fn strip_json_comments(input: &str) -> String {
    let mut without_comments = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            without_comments.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    without_comments.push(escaped);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                without_comments.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        without_comments.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => without_comments.push(c),
        }
    }

    strip_trailing_commas(&without_comments)
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 1;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }

    out
}

/// Canonical path when the file exists, lexically normalized otherwise.
pub fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = base.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// A declaration found in some module, kept alive by the module it lives in.
#[derive(Debug, Clone)]
pub struct DeclRef {
    pub module: Rc<SourceModule>,
    pub name: String,
}

impl DeclRef {
    pub fn declaration(&self) -> Option<Declaration<'_>> {
        self.module.declaration(&self.name)
    }

    pub fn path(&self) -> &Path {
        self.module.path()
    }
}

/// Explicit module table shared by the type resolver, the route extractor and the interface
/// miner of one request.
pub struct ProjectIndex {
    root: PathBuf,
    config: TsConfig,
    modules: IndexMap<PathBuf, Rc<SourceModule>>,
    project_files: Vec<PathBuf>,
    unloadable: HashSet<PathBuf>,
}

impl ProjectIndex {
    /// Scans the project, parses every source file and reads `tsconfig.json`.
    pub fn build(root: &Path) -> Result<Self> {
        let root = normalize(root);
        info!("Indexing TypeScript sources under {}", root.display());

        let scan_result = FileScanner::new(root.clone()).scan()?;
        info!("Found {} TypeScript files", scan_result.source_files.len());

        let parsed: Vec<SourceModule> = AstParser::parse_files(&scan_result.source_files)
            .into_iter()
            .filter_map(|r| r.ok())
            .collect();

        let mut index = Self::from_modules(&root, parsed);
        index.config = TsConfig::load(&root);
        Ok(index)
    }

    /// Builds an index from already parsed modules; their paths become the project files.
    pub fn from_modules(root: &Path, modules: Vec<SourceModule>) -> Self {
        let mut index = Self {
            root: normalize(root),
            config: TsConfig::default(),
            modules: IndexMap::new(),
            project_files: Vec::new(),
            unloadable: HashSet::new(),
        };

        for mut module in modules {
            let key = normalize(&module.path);
            module.path = key.clone();
            index.project_files.push(key.clone());
            index.modules.insert(key, Rc::new(module));
        }

        index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project modules in scan order; modules loaded on demand are not included.
    pub fn project_modules(&self) -> Vec<Rc<SourceModule>> {
        self.project_files
            .iter()
            .filter_map(|path| self.modules.get(path).cloned())
            .collect()
    }

    /// Path relative to the project root, with forward slashes.
    pub fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Returns the cached module, parsing and caching it first if necessary.
    pub fn load(&mut self, path: &Path) -> Option<Rc<SourceModule>> {
        let key = normalize(path);
        if let Some(module) = self.modules.get(&key) {
            return Some(module.clone());
        }
        if self.unloadable.contains(&key) {
            return None;
        }

        debug!("Loading module on demand: {}", key.display());
        match AstParser::parse_file(&key) {
            Ok(mut module) => {
                module.path = key.clone();
                let module = Rc::new(module);
                self.modules.insert(key, module.clone());
                Some(module)
            }
            Err(e) => {
                warn!("Could not load source file {}: {}", key.display(), e);
                self.unloadable.insert(key);
                None
            }
        }
    }

    /// Whether `specifier` names an external package or runtime module rather than project code.
    pub fn is_external(&self, from: &Path, specifier: &str) -> bool {
        specifier.starts_with("node:") || self.resolve_specifier(from, specifier).is_none()
    }

    /// Resolves an import specifier written in `from` to a module path.
    pub fn resolve_specifier(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        if specifier.starts_with("node:") {
            return None;
        }

        if specifier.starts_with('.') {
            let dir = from.parent().unwrap_or(Path::new(""));
            return self.try_candidates(&dir.join(specifier));
        }

        let base_url = self.config.base_url.clone().unwrap_or_else(|| self.root.clone());

        for (pattern, targets) in &self.config.paths {
            let Some(captured) = match_path_pattern(pattern, specifier) else {
                continue;
            };
            for target in targets {
                let candidate = base_url.join(target.replace('*', captured));
                if let Some(found) = self.try_candidates(&candidate) {
                    return Some(found);
                }
            }
        }

        self.try_candidates(&base_url.join(specifier))
    }

    fn try_candidates(&self, base: &Path) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if matches!(
            base.extension().and_then(|e| e.to_str()),
            Some("ts") | Some("tsx")
        ) {
            candidates.push(base.to_path_buf());
        }
        candidates.extend(MODULE_SUFFIXES.iter().map(|s| with_suffix(base, s)));
        candidates.push(base.join("index.ts"));

        candidates.into_iter().map(|c| normalize(&c)).find(|c| {
            self.modules.contains_key(c) || (!self.unloadable.contains(c) && c.is_file())
        })
    }

    /// Finds the declaration `name` as seen from inside `module`: local declarations first,
    /// then import bindings, following barrel re-exports.
    pub fn find_declaration(&mut self, module: &Path, name: &str) -> Option<DeclRef> {
        let mut seen = HashSet::new();
        self.lookup_local(module, name, &mut seen)
    }

    /// Resolves `qualifier.name` where `qualifier` is a namespace import.
    pub fn find_qualified(&mut self, module: &Path, qualifier: &str, name: &str) -> Option<DeclRef> {
        let source = self.load(module)?;
        let binding = source.import_for(qualifier)?;
        if binding.kind != ImportKind::Namespace {
            return None;
        }
        let target = self.resolve_specifier(source.path(), &binding.source)?;
        let mut seen = HashSet::new();
        self.lookup_exported(&target, name, &mut seen)
    }

    /// Finds a symbol exported by `module` under `name`.
    pub fn find_exported(&mut self, module: &Path, name: &str) -> Option<DeclRef> {
        let mut seen = HashSet::new();
        self.lookup_exported(module, name, &mut seen)
    }

    fn lookup_local(
        &mut self,
        module_path: &Path,
        name: &str,
        seen: &mut HashSet<(PathBuf, String)>,
    ) -> Option<DeclRef> {
        let module = self.load(module_path)?;
        if module.declaration(name).is_some() {
            return Some(DeclRef {
                module,
                name: name.to_string(),
            });
        }

        let binding = module.import_for(name)?.clone();
        let target = self.resolve_specifier(module.path(), &binding.source)?;
        match binding.kind {
            ImportKind::Named { imported } => self.lookup_exported(&target, &imported, seen),
            ImportKind::Default => {
                let target_module = self.load(&target)?;
                let default_name = target_module.default_export.clone()?;
                self.lookup_exported(&target, &default_name, seen)
            }
            ImportKind::Namespace => None,
        }
    }

    fn lookup_exported(
        &mut self,
        module_path: &Path,
        name: &str,
        seen: &mut HashSet<(PathBuf, String)>,
    ) -> Option<DeclRef> {
        let module = self.load(module_path)?;
        if !seen.insert((module.path.clone(), name.to_string())) {
            return None;
        }

        if module.declaration(name).is_some() {
            return Some(DeclRef {
                module,
                name: name.to_string(),
            });
        }

        // `import { X } from './x'; export { X };` style modules re-export their imports
        if module.import_for(name).is_some() {
            if let Some(found) = self.lookup_local(module_path, name, seen) {
                return Some(found);
            }
        }

        for reexport in &module.reexports {
            if let ReExport::Named {
                exported,
                original,
                source,
            } = reexport
            {
                if exported == name {
                    let target = self.resolve_specifier(module.path(), source)?;
                    return self.lookup_exported(&target, original, seen);
                }
            }
        }

        for reexport in &module.reexports {
            if let ReExport::All { source } = reexport {
                let Some(target) = self.resolve_specifier(module.path(), source) else {
                    continue;
                };
                if let Some(found) = self.lookup_exported(&target, name, seen) {
                    return Some(found);
                }
            }
        }

        None
    }
}

/// Matches a `paths` pattern (`@app/*`) against a specifier, returning the `*` capture.
fn match_path_pattern<'s>(pattern: &str, specifier: &'s str) -> Option<&'s str> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            let rest = specifier.strip_prefix(prefix)?;
            rest.strip_suffix(suffix)
        }
        None => (pattern == specifier).then_some(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn module(path: &str, code: &str) -> SourceModule {
        AstParser::parse_source(Path::new(path), code).unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_relative_import_resolution_in_memory() {
        let mut index = ProjectIndex::from_modules(
            Path::new("/project"),
            vec![
                module(
                    "/project/src/orders/orders.controller.ts",
                    "import { OrderDto } from './dto/order.dto';",
                ),
                module(
                    "/project/src/orders/dto/order.dto.ts",
                    "export class OrderDto { id: number; }",
                ),
            ],
        );

        let found = index
            .find_declaration(Path::new("/project/src/orders/orders.controller.ts"), "OrderDto")
            .unwrap();
        assert_eq!(found.name, "OrderDto");
        assert_eq!(
            found.path(),
            Path::new("/project/src/orders/dto/order.dto.ts")
        );
    }

    #[test]
    fn test_barrel_reexports_and_aliases() {
        let mut index = ProjectIndex::from_modules(
            Path::new("/project"),
            vec![
                module(
                    "/project/src/app.ts",
                    "import { Customer } from './models';",
                ),
                module(
                    "/project/src/models/index.ts",
                    "export * from './user';\nexport { UserDto as Customer } from './user';",
                ),
                module(
                    "/project/src/models/user.ts",
                    "export class UserDto { name: string; }",
                ),
            ],
        );

        let found = index
            .find_declaration(Path::new("/project/src/app.ts"), "Customer")
            .unwrap();
        assert_eq!(found.name, "UserDto");
    }

    #[test]
    fn test_reexport_cycle_terminates() {
        let mut index = ProjectIndex::from_modules(
            Path::new("/project"),
            vec![
                module("/project/src/a.ts", "export * from './b';"),
                module("/project/src/b.ts", "export * from './a';"),
            ],
        );

        assert!(index
            .find_exported(Path::new("/project/src/a.ts"), "Nothing")
            .is_none());
    }

    #[test]
    fn test_package_imports_are_external() {
        let index = ProjectIndex::from_modules(
            Path::new("/project"),
            vec![module("/project/src/a.ts", "")],
        );
        let from = Path::new("/project/src/a.ts");
        assert!(index.is_external(from, "@nestjs/common"));
        assert!(index.is_external(from, "node:fs"));
    }

    #[test]
    fn test_on_demand_loading_and_tsconfig_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "tsconfig.json",
            r#"{
                // comments are allowed
                "compilerOptions": {
                    "baseUrl": "./",
                    "paths": { "@shared/*": ["libs/shared/*"] }, /* trailing comma */
                },
            }"#,
        );
        write(
            root,
            "src/app.ts",
            "import { Money } from '@shared/money';\nimport { Plain } from 'src/plain';",
        );
        write(root, "src/plain.ts", "export interface Plain { x: number }");
        write(root, "libs/shared/money.ts", "export class Money { amount: number; }");

        let mut index = ProjectIndex::build(root).unwrap();
        assert_eq!(index.project_modules().len(), 2);

        let app = normalize(&root.join("src/app.ts"));
        let money = index.find_declaration(&app, "Money").unwrap();
        assert!(money.path().ends_with("libs/shared/money.ts"));
        // Loaded on demand, but not a project file
        assert_eq!(index.project_modules().len(), 2);

        let plain = index.find_declaration(&app, "Plain").unwrap();
        assert_eq!(index.relative_path(plain.path()), "src/plain.ts");
    }

    #[test]
    fn test_strip_json_comments() {
        let stripped = strip_json_comments(
            "{\n  // c\n  \"a\": \"http://x\", /* b */ \"b\": [1, 2,],\n}",
        );
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"], "http://x");
        assert_eq!(value["b"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_match_path_pattern() {
        assert_eq!(match_path_pattern("@app/*", "@app/users/dto"), Some("users/dto"));
        assert_eq!(match_path_pattern("@config", "@config"), Some(""));
        assert_eq!(match_path_pattern("@app/*", "@other/x"), None);
    }
}
