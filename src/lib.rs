//! Docgen from source - Project documentation from NestJS TypeScript sources.
//!
//! This library statically analyzes a decorator-driven TypeScript backend and assembles a
//! long-form document describing its folder layout, database schema, classes and functions,
//! and HTTP endpoints with fully resolved request and response shapes.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`scanner`] - Recursively scans project directories for TypeScript files
//! 2. [`parser`] - Parses TypeScript files with tree-sitter into [`declarations`]
//! 3. [`project_index`] - Module table with import, barrel and `tsconfig` path resolution
//! 4. [`type_resolver`] - Expands type references into [`schema`] nodes with cycle detection
//! 5. [`extractor`] - Walks controllers and builds endpoint records
//! 6. [`interface_miner`] - Lists interfaces and their naming-convention relationships
//! 7. [`erd`] - Renders relationships as a Mermaid diagram
//! 8. [`assembler`] - Builds the [`document`] from every collected input
//! 9. [`serializer`] - Encodes the document as Markdown, JSON or YAML
//!
//! The external structure parser is driven by [`upstream`], the folder listing comes from
//! [`folder_tree`] and [`service`] runs the whole pipeline for one request.
//!
//! # Example Usage
//!
//! ```no_run
//! use docgen_from_source::{
//!     extractor::{nest::NestExtractor, RouteExtractor},
//!     interface_miner::mine_interfaces,
//!     project_index::ProjectIndex,
//!     type_resolver::TypeResolver,
//! };
//! use std::path::Path;
//!
//! let index = ProjectIndex::build(Path::new("./shop-api")).unwrap();
//! let mut resolver = TypeResolver::new(index);
//! let endpoints = NestExtractor.extract_routes(&mut resolver);
//!
//! let interfaces = mine_interfaces(resolver.index());
//! println!("{} endpoints, {} interfaces", endpoints.len(), interfaces.entities.len());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod assembler;
pub mod cli;
pub mod declarations;
pub mod document;
pub mod erd;
pub mod error;
pub mod extractor;
pub mod folder_tree;
pub mod interface_miner;
pub mod model;
pub mod parser;
pub mod project_index;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod service;
pub mod type_resolver;
pub mod upstream;
