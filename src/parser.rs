use crate::declarations::{
    ClassDecl, Decorator, EnumDecl, EnumMember, ImportBinding, ImportKind, InterfaceDecl,
    MethodDecl, ParamDecl, PropertyDecl, ReExport, SourceModule, TypeAliasDecl, TypeExpr,
    TypeKind,
};
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// `import("./path").Name` type syntax.
static IMPORT_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^import\(\s*["'](.+?)["']\s*\)\.(\w+)$"#).unwrap());

/// Parser for TypeScript source files.
///
/// The `AstParser` uses tree-sitter's TypeScript grammar to parse a source file and copies
/// the declarations the documentation engine needs (imports, classes, interfaces, enums,
/// type aliases, decorators and type annotations) into an owned [`SourceModule`].
///
/// tree-sitter recovers from syntax errors, so a file with broken code still yields whatever
/// declarations could be recognized.
///
/// # Example
///
/// ```no_run
/// use docgen_from_source::parser::AstParser;
/// use std::path::Path;
///
/// let module = AstParser::parse_file(Path::new("src/users/users.controller.ts")).unwrap();
/// println!("Parsed {} classes", module.classes.len());
/// ```
pub struct AstParser;

impl AstParser {
    /// Reads and parses a single TypeScript file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or tree-sitter produces no tree.
    pub fn parse_file(path: &Path) -> Result<SourceModule> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Self::parse_source(path, &content)
    }

    /// Parses TypeScript source text that belongs to `path`.
    pub fn parse_source(path: &Path, source: &str) -> Result<SourceModule> {
        let mut parser = new_parser()?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            anyhow!("Failed to parse TypeScript syntax in file: {}", path.display())
        })?;

        let root = tree.root_node();
        if root.has_error() {
            debug!(
                "{} contains syntax errors, continuing with the recovered tree",
                path.display()
            );
        }

        let mut module = SourceModule::new(path.to_path_buf());
        let walker = DeclarationWalker {
            source: source.as_bytes(),
        };
        walker.walk_program(root, &mut module);

        debug!(
            "Parsed {}: {} classes, {} interfaces, {} enums, {} imports",
            path.display(),
            module.classes.len(),
            module.interfaces.len(),
            module.enums.len(),
            module.imports.len()
        );

        Ok(module)
    }

    /// Parses multiple files, continuing even if some fail.
    ///
    /// Failures are logged as warnings and returned as `Err` entries in input order.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<SourceModule>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<SourceModule>> = paths
            .iter()
            .map(|path| match Self::parse_file(path) {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    Err(e)
                }
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }

    /// Parses a standalone type expression such as `Promise<UserDto[]>`.
    pub fn parse_type(text: &str) -> Option<TypeExpr> {
        let source = format!("type __Probe = {};", text);
        let module = Self::parse_source(Path::new("<type>"), &source).ok()?;
        module.aliases.into_iter().next().map(|alias| alias.value)
    }
}

fn new_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
    parser
        .set_language(&language)
        .map_err(|e| anyhow!("Failed to set language: {e}"))?;
    Ok(parser)
}

/// Strip the quotes tree-sitter keeps on string nodes.
fn unquote(text: &str) -> String {
    text.trim()
        .trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .to_string()
}

struct DeclarationWalker<'a> {
    source: &'a [u8],
}

impl<'a> DeclarationWalker<'a> {
    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field).map(|n| self.text(n))
    }

    fn walk_program(&self, root: Node, module: &mut SourceModule) {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            self.walk_statement(child, Vec::new(), module);
        }
    }

    fn walk_statement(&self, node: Node, outer_decorators: Vec<Decorator>, module: &mut SourceModule) {
        match node.kind() {
            "import_statement" => self.collect_import(node, module),
            "export_statement" => self.collect_export(node, module),
            "class_declaration" | "abstract_class_declaration" | "class" => {
                module.classes.push(self.class_decl(node, outer_decorators));
            }
            "interface_declaration" => module.interfaces.push(self.interface_decl(node)),
            "enum_declaration" => module.enums.push(self.enum_decl(node)),
            "type_alias_declaration" => {
                if let Some(alias) = self.type_alias_decl(node) {
                    module.aliases.push(alias);
                }
            }
            "ambient_declaration" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.walk_statement(child, Vec::new(), module);
                }
            }
            _ => {}
        }
    }

    fn collect_import(&self, node: Node, module: &mut SourceModule) {
        let Some(source) = node.child_by_field_name("source").map(|s| unquote(&self.text(s)))
        else {
            return;
        };

        let mut cursor = node.walk();
        let Some(clause) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "import_clause")
        else {
            // Side-effect import: `import './polyfills'`
            return;
        };

        let mut clause_cursor = clause.walk();
        for part in clause.named_children(&mut clause_cursor) {
            match part.kind() {
                "identifier" => module.imports.push(ImportBinding {
                    local: self.text(part),
                    kind: ImportKind::Default,
                    source: source.clone(),
                }),
                "namespace_import" => {
                    let mut ns_cursor = part.walk();
                    let ident = part
                        .named_children(&mut ns_cursor)
                        .find(|c| c.kind() == "identifier");
                    if let Some(ident) = ident {
                        module.imports.push(ImportBinding {
                            local: self.text(ident),
                            kind: ImportKind::Namespace,
                            source: source.clone(),
                        });
                    }
                }
                "named_imports" => {
                    let mut spec_cursor = part.walk();
                    for spec in part
                        .named_children(&mut spec_cursor)
                        .filter(|c| c.kind() == "import_specifier")
                    {
                        let Some(imported) = self.field_text(spec, "name") else {
                            continue;
                        };
                        let local = self
                            .field_text(spec, "alias")
                            .unwrap_or_else(|| imported.clone());
                        module.imports.push(ImportBinding {
                            local,
                            kind: ImportKind::Named {
                                imported: unquote(&imported),
                            },
                            source: source.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn collect_export(&self, node: Node, module: &mut SourceModule) {
        let decorators = self.own_decorators(node);
        let mut cursor = node.walk();
        let is_default = node.children(&mut cursor).any(|c| c.kind() == "default");

        let declaration = node
            .child_by_field_name("declaration")
            .or_else(|| node.child_by_field_name("value"));
        if let Some(declaration) = declaration {
            let classes_before = module.classes.len();
            self.walk_statement(declaration, decorators, module);
            if is_default && module.classes.len() > classes_before {
                module.default_export = module.classes.last().map(|c| c.name.clone());
            }
            return;
        }

        let Some(source) = node.child_by_field_name("source").map(|s| unquote(&self.text(s)))
        else {
            return;
        };

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        if let Some(clause) = children.iter().find(|c| c.kind() == "export_clause") {
            let mut spec_cursor = clause.walk();
            for spec in clause
                .named_children(&mut spec_cursor)
                .filter(|c| c.kind() == "export_specifier")
            {
                let Some(original) = self.field_text(spec, "name") else {
                    continue;
                };
                let exported = self
                    .field_text(spec, "alias")
                    .unwrap_or_else(|| original.clone());
                module.reexports.push(ReExport::Named {
                    exported,
                    original,
                    source: source.clone(),
                });
            }
        } else if children.iter().any(|c| c.kind() == "*")
            && !children.iter().any(|c| c.kind() == "namespace_export")
        {
            module.reexports.push(ReExport::All { source });
        }
    }

    /// Decorators that are direct children of `node`.
    fn own_decorators(&self, node: Node) -> Vec<Decorator> {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .filter_map(|c| self.decorator(c))
            .collect()
    }

    fn decorator(&self, node: Node) -> Option<Decorator> {
        let mut cursor = node.walk();
        let expr = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment")?;

        let (callee, arguments) = match expr.kind() {
            "call_expression" => (
                expr.child_by_field_name("function")?,
                expr.child_by_field_name("arguments"),
            ),
            _ => (expr, None),
        };

        let callee_text = self.text(callee);
        let name = callee_text
            .rsplit('.')
            .next()
            .unwrap_or(&callee_text)
            .trim()
            .to_string();

        let args = arguments
            .map(|list| {
                let mut arg_cursor = list.walk();
                list.named_children(&mut arg_cursor)
                    .filter(|a| a.kind() != "comment")
                    .map(|a| self.text(a))
                    .collect()
            })
            .unwrap_or_default();

        Some(Decorator { name, args })
    }

    fn class_decl(&self, node: Node, mut decorators: Vec<Decorator>) -> ClassDecl {
        decorators.extend(self.own_decorators(node));
        let name = self
            .field_text(node, "name")
            .unwrap_or_else(|| "default".to_string());

        let mut properties = Vec::new();
        let mut methods = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            // Member decorators may be attached to the member or precede it in the body.
            let mut pending: Vec<Decorator> = Vec::new();
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "comment" => {}
                    "decorator" => pending.extend(self.decorator(member)),
                    "method_definition" => {
                        let mut member_decorators = std::mem::take(&mut pending);
                        member_decorators.extend(self.own_decorators(member));
                        if let Some(method) = self.method_decl(member, member_decorators) {
                            methods.push(method);
                        }
                    }
                    "public_field_definition" => {
                        let mut member_decorators = std::mem::take(&mut pending);
                        member_decorators.extend(self.own_decorators(member));
                        if let Some(property) = self.property_decl(member, member_decorators) {
                            properties.push(property);
                        }
                    }
                    _ => pending.clear(),
                }
            }
        }

        ClassDecl {
            name,
            decorators,
            properties,
            methods,
        }
    }

    fn method_decl(&self, node: Node, decorators: Vec<Decorator>) -> Option<MethodDecl> {
        let name = self.field_text(node, "name")?;

        let params = node
            .child_by_field_name("parameters")
            .map(|list| {
                let mut cursor = list.walk();
                list.named_children(&mut cursor)
                    .filter(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"))
                    .map(|p| ParamDecl {
                        name: self
                            .field_text(p, "pattern")
                            .unwrap_or_else(|| "_".to_string()),
                        decorators: self.own_decorators(p),
                        ty: p
                            .child_by_field_name("type")
                            .and_then(|t| self.type_annotation(t)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let return_type = node
            .child_by_field_name("return_type")
            .filter(|t| t.kind() == "type_annotation")
            .and_then(|t| self.type_annotation(t));

        Some(MethodDecl {
            name,
            decorators,
            params,
            return_type,
        })
    }

    /// Class fields (`public_field_definition`) and interface members (`property_signature`).
    fn property_decl(&self, node: Node, decorators: Vec<Decorator>) -> Option<PropertyDecl> {
        let name = unquote(&self.field_text(node, "name")?);
        let mut cursor = node.walk();
        let optional = node.children(&mut cursor).any(|c| c.kind() == "?");
        let ty = node
            .child_by_field_name("type")
            .and_then(|t| self.type_annotation(t));

        Some(PropertyDecl {
            name,
            ty,
            optional,
            decorators,
        })
    }

    fn interface_decl(&self, node: Node) -> InterfaceDecl {
        let name = self.field_text(node, "name").unwrap_or_default();
        let properties = node
            .child_by_field_name("body")
            .map(|body| self.property_signatures(body))
            .unwrap_or_default();

        InterfaceDecl { name, properties }
    }

    fn property_signatures(&self, body: Node) -> Vec<PropertyDecl> {
        let mut cursor = body.walk();
        body.named_children(&mut cursor)
            .filter(|m| m.kind() == "property_signature")
            .filter_map(|m| self.property_decl(m, Vec::new()))
            .collect()
    }

    fn enum_decl(&self, node: Node) -> EnumDecl {
        let name = self.field_text(node, "name").unwrap_or_default();
        let mut members = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "comment" => {}
                    "enum_assignment" => {
                        if let Some(member_name) = self.field_text(member, "name") {
                            members.push(EnumMember {
                                name: unquote(&member_name),
                                value: self.field_text(member, "value").map(|v| unquote(&v)),
                            });
                        }
                    }
                    _ => members.push(EnumMember {
                        name: unquote(&self.text(member)),
                        value: None,
                    }),
                }
            }
        }

        EnumDecl { name, members }
    }

    fn type_alias_decl(&self, node: Node) -> Option<TypeAliasDecl> {
        let name = self.field_text(node, "name")?;
        let value = self.type_expr(node.child_by_field_name("value")?);
        Some(TypeAliasDecl { name, value })
    }

    /// `: T` annotation node to the type it wraps.
    fn type_annotation(&self, node: Node) -> Option<TypeExpr> {
        let raw = self.text(node);
        let raw = raw.trim_start_matches(':').trim();
        if let Some(import) = import_type(raw) {
            return Some(import);
        }

        let mut cursor = node.walk();
        let inner = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment")?;
        Some(self.type_expr(inner))
    }

    fn type_expr(&self, node: Node) -> TypeExpr {
        let text = self.text(node);

        let kind = match node.kind() {
            "predefined_type" => TypeKind::Keyword,
            "literal_type" | "template_literal_type" | "string" | "number" | "true" | "false"
            | "null" | "undefined" => TypeKind::Literal,
            "type_identifier" | "identifier" => TypeKind::Named {
                qualifier: None,
                name: text.clone(),
                args: Vec::new(),
            },
            "nested_type_identifier" => self.nested_name(node, Vec::new()),
            "generic_type" => {
                let args = node
                    .child_by_field_name("type_arguments")
                    .map(|list| {
                        let mut cursor = list.walk();
                        list.named_children(&mut cursor)
                            .filter(|a| a.kind() != "comment")
                            .map(|a| self.type_expr(a))
                            .collect()
                    })
                    .unwrap_or_default();
                match node.child_by_field_name("name") {
                    Some(name) if name.kind() == "nested_type_identifier" => {
                        self.nested_name(name, args)
                    }
                    Some(name) => TypeKind::Named {
                        qualifier: None,
                        name: self.text(name),
                        args,
                    },
                    None => TypeKind::Other,
                }
            }
            "array_type" => match self.first_named(node) {
                Some(elem) => TypeKind::Array(Box::new(self.type_expr(elem))),
                None => TypeKind::Other,
            },
            "union_type" => {
                let mut members = Vec::new();
                self.flatten_union(node, &mut members);
                TypeKind::Union(members)
            }
            "parenthesized_type" | "readonly_type" => {
                return match self.first_named(node) {
                    Some(inner) => {
                        let mut expr = self.type_expr(inner);
                        expr.text = text;
                        expr
                    }
                    None => TypeExpr::new(text, TypeKind::Other),
                };
            }
            "object_type" => TypeKind::Object(
                self.property_signatures(node)
                    .into_iter()
                    .map(|p| {
                        let ty = p.ty.unwrap_or_else(|| TypeExpr::keyword("any"));
                        (p.name, ty)
                    })
                    .collect(),
            ),
            _ => match import_type(&text) {
                Some(import) => return import,
                None => TypeKind::Other,
            },
        };

        TypeExpr::new(text, kind)
    }

    fn nested_name(&self, node: Node, args: Vec<TypeExpr>) -> TypeKind {
        TypeKind::Named {
            qualifier: self.field_text(node, "module"),
            name: self.field_text(node, "name").unwrap_or_default(),
            args,
        }
    }

    fn flatten_union(&self, node: Node, members: &mut Vec<TypeExpr>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "comment" => {}
                "union_type" => self.flatten_union(child, members),
                _ => members.push(self.type_expr(child)),
            }
        }
    }

    fn first_named<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment");
        found
    }
}

fn import_type(text: &str) -> Option<TypeExpr> {
    let captures = IMPORT_TYPE.captures(text.trim())?;
    Some(TypeExpr::new(
        text.trim(),
        TypeKind::Import {
            path: captures[1].to_string(),
            name: captures[2].to_string(),
        },
    ))
}
