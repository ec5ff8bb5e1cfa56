use crate::declarations::{ClassDecl, Decorator, MethodDecl, TypeExpr};
use crate::extractor::{join_route, EndpointRecord, HttpMethod, RequestParam, RouteExtractor};
use crate::type_resolver::{TypeRef, TypeResolver, VisitedSet};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// `{ path: 'orders', version: '1' }` form of the controller decorator.
static OBJECT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bpath\s*:\s*['"`]([^'"`]*)['"`]"#).unwrap());

/// NestJS controller extractor
pub struct NestExtractor;

impl RouteExtractor for NestExtractor {
    fn extract_routes(&self, resolver: &mut TypeResolver) -> Vec<EndpointRecord> {
        let mut endpoints = Vec::new();

        for module in resolver.index().project_modules() {
            let Some(controller) = module
                .classes
                .iter()
                .find(|c| c.decorator("Controller").is_some())
            else {
                continue;
            };

            debug!(
                "Found controller {} in {}",
                controller.name,
                module.path().display()
            );
            endpoints.extend(extract_controller(controller, module.path(), resolver));
        }

        debug!("Extracted {} endpoints", endpoints.len());
        endpoints
    }
}

fn extract_controller(
    controller: &ClassDecl,
    module: &Path,
    resolver: &mut TypeResolver,
) -> Vec<EndpointRecord> {
    let base = controller
        .decorator("Controller")
        .and_then(controller_base_path)
        .unwrap_or_default();

    controller
        .methods
        .iter()
        .filter_map(|method| {
            let (verb, decorator) = method
                .decorators
                .iter()
                .find_map(|d| HttpMethod::from_decorator(&d.name).map(|verb| (verb, d)))?;
            let path = decorator.first_arg().map(strip_quotes).unwrap_or_default();
            Some(extract_endpoint(controller, method, verb, &join_route(&base, &path), module, resolver))
        })
        .collect()
}

fn extract_endpoint(
    controller: &ClassDecl,
    method: &MethodDecl,
    verb: HttpMethod,
    path: &str,
    module: &Path,
    resolver: &mut TypeResolver,
) -> EndpointRecord {
    let mut record = EndpointRecord::new(controller.name.clone(), verb, path, method.name.clone());

    for param in &method.params {
        let Some(binding) = param.decorators.first() else {
            continue;
        };

        let resolved = param
            .ty
            .as_ref()
            .and_then(|ty| resolver.resolve(&TypeRef::new(ty.clone(), module), &VisitedSet::new()));

        let value = match resolved {
            Some(node) => RequestParam::Schema(node),
            None => RequestParam::Fallback {
                name: param.name.clone(),
                type_text: param.ty.as_ref().map_or("any", |t| t.text.as_str()).to_string(),
            },
        };
        record.request_params.insert(binding.name.to_lowercase(), value);
    }

    record.response_dto = method
        .return_type
        .as_ref()
        .map(TypeExpr::unwrap_generic)
        .and_then(|ty| resolver.resolve(&TypeRef::new(ty.clone(), module), &VisitedSet::new()));

    if record.response_dto.is_none() && method.return_type.is_none() {
        debug!("{}.{} has no declared return type", controller.name, method.name);
    }

    debug!("Endpoint {} -> {}.{}", record.route, controller.name, method.name);
    record
}

/// Base path from `@Controller('orders')` or `@Controller({ path: 'orders' })`.
fn controller_base_path(decorator: &Decorator) -> Option<String> {
    let arg = decorator.first_arg()?.trim();
    if arg.starts_with('{') {
        return match OBJECT_PATH.captures(arg) {
            Some(caps) => Some(caps[1].to_string()),
            None => {
                warn!("Controller options without a path: {}", arg);
                None
            }
        };
    }
    Some(strip_quotes(arg))
}

fn strip_quotes(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\'' | '"' | '`')).collect()
}
