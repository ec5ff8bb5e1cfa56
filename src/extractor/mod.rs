//! Route extraction module for decorator-driven controllers.
//!
//! An extractor walks the project's controller declarations and turns every routed method
//! into an [`EndpointRecord`], resolving parameter and return types through the
//! [`TypeResolver`] so that request and response shapes appear as nested schemas.
//!
//! # Supported Frameworks
//!
//! - **NestJS**: See [`nest::NestExtractor`]
//!
//! # Example
//!
//! ```no_run
//! use docgen_from_source::extractor::{RouteExtractor, nest::NestExtractor};
//! use docgen_from_source::project_index::ProjectIndex;
//! use docgen_from_source::type_resolver::TypeResolver;
//! use std::path::Path;
//!
//! let index = ProjectIndex::build(Path::new("my-api")).unwrap();
//! let mut resolver = TypeResolver::new(index);
//! let endpoints = NestExtractor.extract_routes(&mut resolver);
//! println!("Found {} endpoints", endpoints.len());
//! ```

pub mod nest;

use crate::schema::SchemaNode;
use crate::type_resolver::TypeResolver;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Trait for extracting endpoint information from an indexed project.
///
/// Implementations know the routing conventions of one framework. The resolver is borrowed
/// mutably because it loads and caches modules on demand while expanding types.
pub trait RouteExtractor {
    /// Extracts every endpoint, ordered by source file then declaration order.
    fn extract_routes(&self, resolver: &mut TypeResolver) -> Vec<EndpointRecord>;
}

/// Complete information about a single API endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    /// Name of the controller class declaring the handler
    pub controller: String,
    /// HTTP verb and full path, e.g. `GET orders/:id`
    pub route: String,
    pub method_name: String,
    /// Parameter bindings keyed by the lower-cased binding decorator (`body`, `param`, ...)
    pub request_params: IndexMap<String, RequestParam>,
    /// Resolved response schema; `None` when the return type is not user schema
    pub response_dto: Option<SchemaNode>,
}

impl EndpointRecord {
    pub fn new(controller: String, method: HttpMethod, path: &str, method_name: String) -> Self {
        Self {
            controller,
            route: format!("{} {}", method, path),
            method_name,
            request_params: IndexMap::new(),
            response_dto: None,
        }
    }
}

/// A bound handler parameter: its resolved schema, or its name and raw type text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestParam {
    Schema(SchemaNode),
    Fallback {
        name: String,
        #[serde(rename = "type")]
        type_text: String,
    },
}

/// HTTP methods recognized as route decorators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Maps a decorator name (`Get`, `Post`, ...) to its verb. Matching is case-sensitive.
    pub fn from_decorator(name: &str) -> Option<Self> {
        match name {
            "Get" => Some(HttpMethod::Get),
            "Post" => Some(HttpMethod::Post),
            "Put" => Some(HttpMethod::Put),
            "Delete" => Some(HttpMethod::Delete),
            "Patch" => Some(HttpMethod::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joins a controller base path and a method path with exactly one `/`.
pub fn join_route(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    match (base.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", path),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_join_route_single_separator() {
        assert_eq!(join_route("/users", "id"), "/users/id");
        assert_eq!(join_route("/users/", "/id"), "/users/id");
        assert_eq!(join_route("/users", "/id"), "/users/id");
        assert_eq!(join_route("orders", ":id"), "orders/:id");
    }

    #[test]
    fn test_join_route_empty_parts() {
        assert_eq!(join_route("orders", ""), "orders");
        assert_eq!(join_route("", "health"), "/health");
        assert_eq!(join_route("", ""), "/");
    }

    #[test]
    fn test_http_method_from_decorator() {
        assert_eq!(HttpMethod::from_decorator("Get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_decorator("Patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_decorator("GET"), None);
        assert_eq!(HttpMethod::from_decorator("Options"), None);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_endpoint_record_serialization() {
        let mut record = EndpointRecord::new(
            "OrdersController".to_string(),
            HttpMethod::Get,
            "orders/:id",
            "findOne".to_string(),
        );
        record.request_params.insert(
            "param".to_string(),
            RequestParam::Fallback {
                name: "id".to_string(),
                type_text: "string".to_string(),
            },
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "controller": "OrdersController",
                "route": "GET orders/:id",
                "methodName": "findOne",
                "requestParams": { "param": { "name": "id", "type": "string" } },
                "responseDto": null
            })
        );
    }
}
