use crate::assembler;
use crate::erd;
use crate::error::{Error, Result};
use crate::extractor::nest::NestExtractor;
use crate::extractor::RouteExtractor;
use crate::folder_tree::{FolderTree, DEFAULT_EXCLUDES};
use crate::interface_miner;
use crate::project_index::ProjectIndex;
use crate::serializer::{self, OutputFormat};
use crate::type_resolver::TypeResolver;
use crate::upstream::{StructureParser, DEFAULT_MAX_OUTPUT, DEFAULT_PARSER_PATH};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for documentation requests
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Structure parser executable
    pub parser_path: PathBuf,
    pub max_parser_output: usize,
    /// Directory under which `<project>/` output folders are created
    pub output_root: PathBuf,
    pub format: OutputFormat,
    /// Folder listing exclusion regexes
    pub excludes: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            parser_path: PathBuf::from(DEFAULT_PARSER_PATH),
            max_parser_output: DEFAULT_MAX_OUTPUT,
            output_root: PathBuf::from("output"),
            format: OutputFormat::default(),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Generates the documentation of one project per call. No state is kept between calls.
pub struct DocumentationService {
    config: ServiceConfig,
}

impl DocumentationService {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Path of the persisted document for `project_path`.
    pub fn document_path(&self, project_path: &Path) -> PathBuf {
        let name = project_name(project_path);
        self.output_dir(project_path)
            .join(format!("{}-documentation.{}", name, self.config.format.extension()))
    }

    fn output_dir(&self, project_path: &Path) -> PathBuf {
        self.config.output_root.join(project_name(project_path))
    }

    /// Runs the whole pipeline and returns the encoded document, which is also written to
    /// `<output_root>/<project>/<project>-documentation.<ext>`.
    pub fn generate(&self, project_path: &Path) -> Result<Vec<u8>> {
        if !project_path.exists() {
            return Err(Error::ProjectNotFound(project_path.to_path_buf()));
        }
        info!("Generating documentation for {}", project_path.display());

        let parsed = StructureParser::new(&self.config.parser_path)
            .with_max_output(self.config.max_parser_output)
            .run(project_path)?;

        info!("Indexing TypeScript sources...");
        let index = ProjectIndex::build(project_path).map_err(|e| Error::ParseError {
            file: project_path.to_path_buf(),
            message: format!("{:#}", e),
        })?;

        info!("Extracting routes...");
        let mut resolver = TypeResolver::new(index);
        let endpoints = NestExtractor.extract_routes(&mut resolver);
        info!("Extracted {} endpoints", endpoints.len());
        if endpoints.is_empty() {
            warn!("No controller endpoints found in {}", project_path.display());
        }

        let index = resolver.into_index();
        let interfaces = interface_miner::mine_interfaces(&index);
        info!(
            "Mined {} interfaces and {} interface relationships",
            interfaces.entities.len(),
            interfaces.relationships.len()
        );

        let folder_text = FolderTree::new(project_path)
            .with_excludes(&self.config.excludes)
            .map_err(|e| Error::InvalidConfig(format!("{:#}", e)))?
            .render();

        let output_dir = self.output_dir(project_path);
        fs::create_dir_all(&output_dir)?;
        let relationships = parsed.relationships.clone().unwrap_or_default();
        let diagram = erd::emit(&relationships, &output_dir).map_err(|e| Error::OutputError {
            path: output_dir.join(erd::DIAGRAM_FILE),
            message: format!("{:#}", e),
        })?;

        let document = assembler::assemble(&parsed, &folder_text, &diagram, &endpoints, &interfaces);
        let bytes = serializer::encode(&document, self.config.format)
            .map_err(|e| Error::SerializationError(format!("{:#}", e)))?;

        let path = self.document_path(project_path);
        serializer::write_to_file(&bytes, &path).map_err(|e| Error::OutputError {
            path: path.clone(),
            message: format!("{:#}", e),
        })?;
        info!("Wrote {} bytes to {}", bytes.len(), path.display());

        Ok(bytes)
    }
}

/// Last path component of the project, `project` when it has none.
fn project_name(project_path: &Path) -> String {
    project_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            project_path
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "project".to_string())
}
