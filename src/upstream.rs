use crate::error::{Error, Result};
use crate::model::ParsedProjectData;
use log::{debug, error, info};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Default location of the structure parser, relative to the working directory.
pub const DEFAULT_PARSER_PATH: &str = "./parser-go/go-parser";

/// Largest accepted parser output.
pub const DEFAULT_MAX_OUTPUT: usize = 50 * 1024 * 1024;

const REQUIRED_KEYS: &[&str] = &["entities", "classes", "functions"];

/// Bridge to the external whole-project structure parser.
///
/// The parser is run with the project path as its only argument and must print a JSON
/// [`ParsedProjectData`] document on standard output.
pub struct StructureParser {
    executable: PathBuf,
    max_output: usize,
}

impl StructureParser {
    /// Create a bridge to `executable`; on Windows `.exe` is appended.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let mut executable: PathBuf = executable.into();
        if cfg!(windows) {
            let mut name = executable.into_os_string();
            name.push(".exe");
            executable = PathBuf::from(name);
        }
        Self {
            executable,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output = bytes;
        self
    }

    /// Runs the parser on `project` and decodes its output.
    pub fn run(&self, project: &Path) -> Result<ParsedProjectData> {
        info!("Running structure parser {}", self.executable.display());
        debug!("Target project path: {}", project.display());

        if !self.executable.is_file() {
            let message = format!("Parser executable not found: {}", self.executable.display());
            error!("{}", message);
            return Err(Error::upstream(message, ""));
        }

        let mut child = Command::new(&self.executable)
            .arg(project)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::upstream("Structure parser failed to start.", e.to_string()))?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let mut stdout = Vec::new();
        if let Some(out) = child.stdout.take() {
            let limit = u64::try_from(self.max_output).unwrap_or(u64::MAX).saturating_add(1);
            out.take(limit)
                .read_to_end(&mut stdout)
                .map_err(|e| Error::upstream("Failed to read structure parser output.", e.to_string()))?;
        }

        if stdout.len() > self.max_output {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::upstream(
                "Structure parser output exceeds the size limit.",
                format!("more than {} bytes", self.max_output),
            ));
        }

        let status = child
            .wait()
            .map_err(|e| Error::upstream("Structure parser failed.", e.to_string()))?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            error!("Structure parser exited with {}", status);
            return Err(Error::upstream(
                "Structure parser failed.",
                format!("{}; stderr: {}", status, stderr.trim()),
            ));
        }
        if !stderr.trim().is_empty() {
            debug!("Structure parser stderr: {}", stderr.trim());
        }

        decode_output(&stdout)
    }
}

/// Decodes parser output, requiring the `entities`, `classes` and `functions` keys.
pub fn decode_output(stdout: &[u8]) -> Result<ParsedProjectData> {
    let text = std::str::from_utf8(stdout)
        .map_err(|e| Error::upstream("Structure parser output is not valid UTF-8.", e.to_string()))?;
    if text.trim().is_empty() {
        return Err(Error::upstream("Structure parser returned empty output.", ""));
    }

    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::upstream("Failed to parse structure parser output.", e.to_string()))?;

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| value.get(key).is_none())
        .collect();
    if !value.is_object() || !missing.is_empty() {
        return Err(Error::upstream(
            "Structure parser JSON structure is invalid.",
            format!("missing keys: {}", missing.join(", ")),
        ));
    }

    let data: ParsedProjectData = serde_json::from_value(value)
        .map_err(|e| Error::upstream("Failed to parse structure parser output.", e.to_string()))?;

    debug!(
        "Structure parser found {} entities, {} classes, {} functions",
        data.entities.len(),
        data.classes.len(),
        data.functions.len()
    );
    Ok(data)
}
