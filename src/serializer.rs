//! Serialization module for encoding documents as Markdown, JSON or YAML.
//!
//! This module provides functions to encode an assembled [`Document`] into one of the
//! supported output formats and to write the result to disk.

use crate::document::{Block, Document, ParagraphStyle};
use anyhow::{Context, Result};
use clap::ValueEnum;
use log::debug;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Markdown document
    #[default]
    Markdown,
    /// JSON document model
    Json,
    /// YAML document model
    Yaml,
}

impl OutputFormat {
    /// File extension used for persisted documents
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

/// Encodes a document in the requested format.
pub fn encode(doc: &Document, format: OutputFormat) -> Result<Vec<u8>> {
    let text = match format {
        OutputFormat::Markdown => serialize_markdown(doc),
        OutputFormat::Json => serialize_json(doc)?,
        OutputFormat::Yaml => serialize_yaml(doc)?,
    };
    Ok(text.into_bytes())
}

/// Serializes the document model to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &Document) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize document to YAML")
}

/// Serializes the document model to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &Document) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize document to JSON")
}

/// Renders the document as Markdown.
///
/// The title becomes the only level-one heading and section headings shift down one level.
/// The table of contents lists headings of levels 1 to 3 with anchor links. Consecutive code
/// paragraphs share one fenced block.
pub fn serialize_markdown(doc: &Document) -> String {
    debug!("Rendering document as Markdown");

    let anchors = heading_anchors(doc);
    let mut out = String::new();
    let mut in_code = false;
    let mut heading_index = 0;

    for block in &doc.blocks {
        let is_code = matches!(
            block,
            Block::Paragraph {
                style: ParagraphStyle::Code,
                ..
            }
        );
        if in_code && !is_code {
            out.push_str("```\n\n");
            in_code = false;
        }

        match block {
            Block::Title { text } => {
                let _ = writeln!(out, "# {}\n", text);
            }
            Block::TableOfContents => {
                out.push_str("**Table of Contents**\n\n");
                for ((level, text), anchor) in doc.headings().zip(&anchors) {
                    if level > 3 {
                        continue;
                    }
                    let indent = "  ".repeat(usize::from(level.saturating_sub(1)));
                    let _ = writeln!(out, "{}- [{}](#{})", indent, text, anchor);
                }
                out.push('\n');
            }
            Block::PageBreak => out.push_str("---\n\n"),
            Block::Heading { level, text } => {
                let hashes = "#".repeat(usize::from(*level).clamp(1, 5) + 1);
                let _ = writeln!(out, "{} {}\n", hashes, text);
                heading_index += 1;
            }
            Block::Paragraph { text, style } => match style {
                ParagraphStyle::Code => {
                    if !in_code {
                        out.push_str("```text\n");
                        in_code = true;
                    }
                    out.push_str(text);
                    out.push('\n');
                }
                ParagraphStyle::Quote => {
                    for line in text.lines() {
                        let _ = writeln!(out, "> {}", line);
                    }
                    out.push('\n');
                }
                ParagraphStyle::Normal => {
                    if !text.trim().is_empty() {
                        let _ = writeln!(out, "{}\n", text);
                    }
                }
            },
            Block::Table { rows } => write_table(&mut out, rows),
        }
    }

    if in_code {
        out.push_str("```\n");
    }

    debug!("Rendered {} headings", heading_index);
    out
}

fn write_table(out: &mut String, rows: &[Vec<String>]) {
    let Some((header, body)) = rows.split_first() else {
        return;
    };

    let _ = writeln!(out, "| {} |", escape_row(header).join(" | "));
    let _ = writeln!(
        out,
        "|{}",
        header.iter().map(|_| " --- |").collect::<String>()
    );
    for row in body {
        let _ = writeln!(out, "| {} |", escape_row(row).join(" | "));
    }
    out.push('\n');
}

fn escape_row(row: &[String]) -> Vec<String> {
    row.iter()
        .map(|cell| cell.replace('|', "\\|").replace('\n', "<br>"))
        .collect()
}

/// GitHub-style anchors for every heading, in order, de-duplicated with numeric suffixes.
fn heading_anchors(doc: &Document) -> Vec<String> {
    let mut used: HashMap<String, usize> = HashMap::new();
    doc.headings()
        .map(|(_, text)| {
            let slug = slugify(text);
            let count = used.entry(slug.clone()).or_insert(0);
            let anchor = if *count == 0 {
                slug
            } else {
                format!("{}-{}", slug, count)
            };
            *count += 1;
            anchor
        })
        .collect()
}

fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c == ' ' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

/// Writes content to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory or the file cannot be written.
pub fn write_to_file(content: &[u8], path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
