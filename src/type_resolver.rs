use crate::declarations::{Declaration, PropertyDecl, TypeExpr, TypeKind};
use crate::project_index::{DeclRef, ProjectIndex};
use crate::schema::{EnumDescriptor, SchemaField, SchemaNode};
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Runtime types that are never user schema.
const RUNTIME_TYPES: &[&str] = &[
    "File", "Date", "Buffer", "Blob", "Object", "String", "Number", "Boolean", "Function",
    "RegExp", "Error", "Symbol", "BigInt", "Uint8Array", "ArrayBuffer",
];

/// A type expression in the context of the module that wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub expr: TypeExpr,
    pub module: PathBuf,
}

impl TypeRef {
    pub fn new(expr: TypeExpr, module: impl Into<PathBuf>) -> Self {
        Self {
            expr,
            module: module.into(),
        }
    }

    fn with_expr(&self, expr: &TypeExpr) -> Self {
        Self {
            expr: expr.clone(),
            module: self.module.clone(),
        }
    }
}

/// Immutable snapshot of the signatures on the current resolution path.
///
/// Extending a snapshot builds a new one, so sibling branches never see each other's entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet(BTreeSet<String>);

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn with(&self, key: &str) -> Self {
        let mut next = self.0.clone();
        next.insert(key.to_string());
        Self(next)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Type resolver - turns TypeScript type references into schema nodes
pub struct TypeResolver {
    index: ProjectIndex,
    /// Declaration lookups by (module, type text), cached for the request
    lookups: HashMap<(PathBuf, String), Option<DeclRef>>,
}

impl TypeResolver {
    /// Create a new TypeResolver over a project's module table
    pub fn new(index: ProjectIndex) -> Self {
        debug!("Initializing TypeResolver for {}", index.root().display());
        Self {
            index,
            lookups: HashMap::new(),
        }
    }

    pub fn index(&self) -> &ProjectIndex {
        &self.index
    }

    pub fn into_index(self) -> ProjectIndex {
        self.index
    }

    /// Resolves a type reference to a schema node.
    ///
    /// Returns `None` for primitives, runtime/framework types, external package types, enums
    /// and anything whose declaration cannot be found.
    pub fn resolve(&mut self, ty: &TypeRef, visited: &VisitedSet) -> Option<SchemaNode> {
        match self.resolve_field(ty, visited)? {
            SchemaField::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Resolves a type reference to any schema field shape (node, enum or raw object).
    pub fn resolve_field(&mut self, ty: &TypeRef, visited: &VisitedSet) -> Option<SchemaField> {
        let signature = self.signature(ty);
        if visited.contains(&signature) {
            debug!("Circular reference detected for type: {}", signature);
            return Some(SchemaField::Node(SchemaNode::circular(
                self.display_name(ty),
            )));
        }
        let visited = visited.with(&signature);

        if self.is_opaque(ty) {
            return None;
        }

        if let Some(elem) = ty.expr.array_element() {
            return match self.resolve_field(&ty.with_expr(elem), &visited)? {
                SchemaField::Node(node) => Some(SchemaField::Node(node.into_array())),
                SchemaField::Enum(e) => Some(SchemaField::Enum(EnumDescriptor {
                    name: format!("{}[]", e.name),
                    values: e.values,
                })),
                SchemaField::Raw(value) => Some(SchemaField::Raw(serde_json::Value::Array(vec![value]))),
                SchemaField::Primitive(_) => None,
            };
        }

        match &ty.expr.kind {
            TypeKind::Union(members) => {
                let member = members.iter().find(|m| m.is_reference())?;
                self.resolve_field(&ty.with_expr(member), &visited)
            }
            TypeKind::Named { args, .. } if !args.is_empty() => {
                self.resolve_field(&ty.with_expr(&args[0]), &visited)
            }
            TypeKind::Named { .. } | TypeKind::Import { .. } => {
                let Some(decl) = self.locate(ty) else {
                    warn!("Could not resolve type: {}", ty.expr.text);
                    return None;
                };
                self.expand(&decl, &visited)
            }
            TypeKind::Object(members) => {
                let dump: serde_json::Map<String, serde_json::Value> = members
                    .iter()
                    .map(|(name, member)| (name.clone(), serde_json::Value::String(member.text.clone())))
                    .collect();
                Some(SchemaField::Raw(serde_json::Value::Object(dump)))
            }
            TypeKind::Keyword | TypeKind::Literal | TypeKind::Array(_) | TypeKind::Other => None,
        }
    }

    fn expand(&mut self, decl: &DeclRef, visited: &VisitedSet) -> Option<SchemaField> {
        let module = decl.path().to_path_buf();
        match decl.declaration()? {
            Declaration::Class(class) => {
                Some(self.expand_properties(&class.name, &class.properties, &module, visited))
            }
            Declaration::Interface(iface) => {
                Some(self.expand_properties(&iface.name, &iface.properties, &module, visited))
            }
            Declaration::Enum(decl) => Some(SchemaField::Enum(EnumDescriptor {
                name: decl.name.clone(),
                values: decl.values(),
            })),
            Declaration::Alias(alias) => {
                debug!("Following type alias {}", alias.name);
                self.resolve_field(&TypeRef::new(alias.value.clone(), module), visited)
            }
        }
    }

    fn expand_properties(
        &mut self,
        name: &str,
        properties: &[PropertyDecl],
        module: &Path,
        visited: &VisitedSet,
    ) -> SchemaField {
        debug!("Expanding {} ({} properties)", name, properties.len());

        let mut fields = IndexMap::new();
        for property in properties {
            let field = match &property.ty {
                Some(expr) => self
                    .resolve_field(&TypeRef::new(expr.clone(), module), visited)
                    .unwrap_or_else(|| SchemaField::Primitive(expr.text.clone())),
                None => SchemaField::Primitive(property.type_text().to_string()),
            };
            fields.insert(property.name.clone(), field);
        }

        SchemaField::Node(SchemaNode::new(name, fields))
    }

    /// Primitives, runtime and framework types, and types imported from packages.
    fn is_opaque(&mut self, ty: &TypeRef) -> bool {
        let expr = &ty.expr;
        if expr.is_nullish() || expr.text.contains("Express.") {
            return true;
        }

        match &expr.kind {
            TypeKind::Keyword | TypeKind::Literal => true,
            TypeKind::Named {
                qualifier, name, args,
            } => {
                if args.is_empty() && RUNTIME_TYPES.contains(&name.as_str()) {
                    return true;
                }
                let local = qualifier
                    .as_deref()
                    .map(|q| q.split('.').next().unwrap_or(q))
                    .unwrap_or(name);
                let source = self.external_source(&ty.module, local);
                if args.is_empty() {
                    return source.is_some();
                }
                // Package wrappers (`Observable<T>`, `Pagination<T>`) unwrap to `T`
                source.is_some_and(|s| s.starts_with("node:"))
            }
            TypeKind::Import { path, .. } => {
                path.starts_with("node:") || self.index.is_external(&ty.module, path)
            }
            _ => false,
        }
    }

    /// The package specifier `local` is imported from, when it is not project code.
    fn external_source(&mut self, module: &Path, local: &str) -> Option<String> {
        let source = self.index.load(module)?;
        if source.declaration(local).is_some() {
            return None;
        }
        let binding = source.import_for(local)?;
        if self.index.is_external(source.path(), &binding.source) {
            debug!("{} is imported from external module {}", local, binding.source);
            Some(binding.source.clone())
        } else {
            None
        }
    }

    /// Finds the declaration a named or `import(...)` type points at.
    fn locate(&mut self, ty: &TypeRef) -> Option<DeclRef> {
        let key = (ty.module.clone(), ty.expr.text.clone());
        if let Some(cached) = self.lookups.get(&key) {
            return cached.clone();
        }

        let found = match &ty.expr.kind {
            TypeKind::Named {
                qualifier: None,
                name,
                ..
            } => self.index.find_declaration(&ty.module, name),
            TypeKind::Named {
                qualifier: Some(qualifier),
                name,
                ..
            } => self.index.find_qualified(&ty.module, qualifier, name),
            TypeKind::Import { path, name } => {
                match self.index.resolve_specifier(&ty.module, path) {
                    Some(target) => self.index.find_exported(&target, name),
                    None => None,
                }
            }
            _ => None,
        };

        self.lookups.insert(key, found.clone());
        found
    }

    /// Identity key of a type reference: declared types are keyed by their defining module,
    /// so the same declaration reached through different imports shares one signature.
    pub fn signature(&mut self, ty: &TypeRef) -> String {
        match &ty.expr.kind {
            TypeKind::Named { name, args, .. } => {
                let base = match self.locate(&ty.with_expr(&TypeExpr {
                    text: base_text(&ty.expr),
                    kind: TypeKind::Named {
                        qualifier: qualifier_of(&ty.expr),
                        name: name.clone(),
                        args: Vec::new(),
                    },
                })) {
                    Some(decl) => format!("import(\"{}\").{}", decl.path().display(), decl.name),
                    None => base_text(&ty.expr),
                };
                if args.is_empty() {
                    base
                } else {
                    let args: Vec<String> =
                        args.iter().map(|a| self.signature(&ty.with_expr(a))).collect();
                    format!("{}<{}>", base, args.join(", "))
                }
            }
            TypeKind::Import { .. } => match self.locate(ty) {
                Some(decl) => format!("import(\"{}\").{}", decl.path().display(), decl.name),
                None => ty.expr.text.clone(),
            },
            TypeKind::Array(elem) => format!("{}[]", self.signature(&ty.with_expr(elem))),
            TypeKind::Union(members) => members
                .iter()
                .map(|m| self.signature(&ty.with_expr(m)))
                .collect::<Vec<_>>()
                .join(" | "),
            _ => ty.expr.text.clone(),
        }
    }

    /// Name used for the circular marker: the declaration name when known.
    fn display_name(&mut self, ty: &TypeRef) -> String {
        if let Some(elem) = ty.expr.array_element() {
            return self.display_name(&ty.with_expr(elem));
        }
        match &ty.expr.kind {
            TypeKind::Named { name, args, .. } if args.is_empty() => {
                self.locate(ty).map(|d| d.name).unwrap_or_else(|| name.clone())
            }
            TypeKind::Named { args, .. } => self.display_name(&ty.with_expr(&args[0])),
            TypeKind::Import { name, .. } => name.clone(),
            TypeKind::Union(members) => match members.iter().find(|m| m.is_reference()) {
                Some(member) => self.display_name(&ty.with_expr(member)),
                None => ty.expr.text.clone(),
            },
            _ => ty.expr.text.clone(),
        }
    }
}

/// `Express.Multer.File<T>` -> `Express.Multer.File`
fn base_text(expr: &TypeExpr) -> String {
    match &expr.kind {
        TypeKind::Named {
            qualifier, name, ..
        } => match qualifier {
            Some(q) => format!("{}.{}", q, name),
            None => name.clone(),
        },
        _ => expr.text.clone(),
    }
}

fn qualifier_of(expr: &TypeExpr) -> Option<String> {
    match &expr.kind {
        TypeKind::Named { qualifier, .. } => qualifier.clone(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::schema::SchemaFields;
    use pretty_assertions::assert_eq;

    const DTO_FILE: &str = "/project/src/dto.ts";

    /// Helper: index the given (path, code) files and create a resolver
    fn create_resolver(files: &[(&str, &str)]) -> TypeResolver {
        let modules = files
            .iter()
            .map(|(path, code)| AstParser::parse_source(Path::new(path), code).unwrap())
            .collect();
        TypeResolver::new(ProjectIndex::from_modules(Path::new("/project"), modules))
    }

    fn type_ref(text: &str, module: &str) -> TypeRef {
        TypeRef::new(AstParser::parse_type(text).unwrap(), module)
    }

    fn resolve(resolver: &mut TypeResolver, text: &str) -> Option<SchemaNode> {
        resolver.resolve(&type_ref(text, DTO_FILE), &VisitedSet::new())
    }

    #[test]
    fn test_primitives_resolve_to_none() {
        let mut resolver = create_resolver(&[(DTO_FILE, "")]);
        for text in ["string", "number", "boolean", "void", "undefined", "null", "'a' | 'b'", "Date"] {
            assert!(resolve(&mut resolver, text).is_none(), "{} should not resolve", text);
        }
    }

    #[test]
    fn test_resolve_class_with_primitive_fields() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            "export class UserDto { id: number; name: string; createdAt: Date; }",
        )]);

        let node = resolve(&mut resolver, "UserDto").unwrap();
        assert_eq!(node.name, "UserDto");
        assert!(!node.is_array);
        let keys: Vec<_> = node.field_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["id", "name", "createdAt"]);
        assert_eq!(node.field("id"), Some(&SchemaField::Primitive("number".to_string())));
        assert_eq!(node.field("createdAt"), Some(&SchemaField::Primitive("Date".to_string())));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            r#"
            export class OrderDto { id: number; items: OrderItemDto[]; customer: CustomerDto | null; }
            export class OrderItemDto { sku: string; qty: number; }
            export interface CustomerDto { name: string; }
            "#,
        )]);

        let first = resolve(&mut resolver, "OrderDto");
        let second = resolve(&mut resolver, "OrderDto");
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_union_and_array_fields() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            r#"
            export class OrderDto { items: OrderItemDto[]; customer?: CustomerDto | null; tags: string[]; }
            export class OrderItemDto { sku: string; }
            export interface CustomerDto { name: string; }
            "#,
        )]);

        let node = resolve(&mut resolver, "OrderDto").unwrap();
        match node.field("items").unwrap() {
            SchemaField::Node(items) => {
                assert_eq!(items.name, "OrderItemDto");
                assert!(items.is_array);
            }
            other => panic!("Expected nested node, got {:?}", other),
        }
        match node.field("customer").unwrap() {
            SchemaField::Node(customer) => assert_eq!(customer.name, "CustomerDto"),
            other => panic!("Expected nested node, got {:?}", other),
        }
        assert_eq!(node.field("tags"), Some(&SchemaField::Primitive("string[]".to_string())));
    }

    #[test]
    fn test_cycle_yields_circular_marker() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            "export class A { b: B; }\nexport class B { a: A; }",
        )]);

        let a = resolve(&mut resolver, "A").unwrap();
        let SchemaField::Node(b) = a.field("b").unwrap() else {
            panic!("Expected B node");
        };
        let SchemaField::Node(inner_a) = b.field("a").unwrap() else {
            panic!("Expected circular A");
        };
        assert_eq!(inner_a.name, "A");
        assert_eq!(inner_a.fields, SchemaFields::Circular);
    }

    #[test]
    fn test_self_reference_through_array() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            "export class Category { name: string; children: Category[]; }",
        )]);

        let node = resolve(&mut resolver, "Category").unwrap();
        let SchemaField::Node(children) = node.field("children").unwrap() else {
            panic!("Expected children node");
        };
        assert!(children.is_circular());
        assert!(children.is_array);
    }

    #[test]
    fn test_siblings_do_not_suppress_each_other() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            "export class Route { from: Place; to: Place; }\nexport class Place { name: string; }",
        )]);

        let node = resolve(&mut resolver, "Route").unwrap();
        for key in ["from", "to"] {
            let SchemaField::Node(place) = node.field(key).unwrap() else {
                panic!("Expected Place node for {}", key);
            };
            assert!(!place.is_circular(), "{} was wrongly marked circular", key);
        }
    }

    #[test]
    fn test_generic_wrapper_is_discarded() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            "export class OrderDto { id: number; }\nexport class Paginated<T> { items: T[]; }",
        )]);

        let node = resolve(&mut resolver, "Promise<OrderDto>").unwrap();
        assert_eq!(node.name, "OrderDto");

        let node = resolve(&mut resolver, "Paginated<OrderDto>").unwrap();
        assert_eq!(node.name, "OrderDto");
    }

    #[test]
    fn test_package_generic_wrappers_are_discarded() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            "import { Pagination } from 'nestjs-typeorm-paginate';\n\
             import { Observable } from 'rxjs';\n\
             import { Readable } from 'node:stream';\n\
             export class OrderDto { id: number; }\n\
             export class Page { page: Pagination<OrderDto>; stream: Readable<OrderDto>; }",
        )]);

        assert_eq!(resolve(&mut resolver, "Pagination<OrderDto>").unwrap().name, "OrderDto");
        assert_eq!(resolve(&mut resolver, "Observable<OrderDto>").unwrap().name, "OrderDto");
        assert_eq!(
            resolve(&mut resolver, "Promise<Pagination<OrderDto>>").unwrap().name,
            "OrderDto"
        );
        assert!(resolve(&mut resolver, "Pagination").is_none());

        let page = resolve(&mut resolver, "Page").unwrap();
        let Some(SchemaField::Node(inner)) = page.field("page") else {
            panic!("Expected unwrapped node, got {:?}", page.field("page"));
        };
        assert_eq!(inner.name, "OrderDto");
        assert_eq!(
            page.field("stream"),
            Some(&SchemaField::Primitive("Readable<OrderDto>".to_string()))
        );
    }

    #[test]
    fn test_cross_file_resolution() {
        let mut resolver = create_resolver(&[
            (
                "/project/src/orders/order.dto.ts",
                "import { CustomerDto } from '../customers/customer.dto';\nexport class OrderDto { customer: CustomerDto; }",
            ),
            (
                "/project/src/customers/customer.dto.ts",
                "export class CustomerDto { email: string; }",
            ),
        ]);

        let node = resolver
            .resolve(
                &type_ref("OrderDto", "/project/src/orders/order.dto.ts"),
                &VisitedSet::new(),
            )
            .unwrap();
        let SchemaField::Node(customer) = node.field("customer").unwrap() else {
            panic!("Expected customer node");
        };
        assert_eq!(customer.name, "CustomerDto");
        assert_eq!(customer.field("email"), Some(&SchemaField::Primitive("string".to_string())));
    }

    #[test]
    fn test_import_type_syntax_resolves() {
        let mut resolver = create_resolver(&[
            (DTO_FILE, ""),
            ("/project/src/user.dto.ts", "export class UserDto { id: number; }"),
        ]);

        let expr = TypeExpr::new(
            r#"import("./user.dto").UserDto"#,
            TypeKind::Import {
                path: "./user.dto".to_string(),
                name: "UserDto".to_string(),
            },
        );
        let node = resolver
            .resolve(&TypeRef::new(expr, DTO_FILE), &VisitedSet::new())
            .unwrap();
        assert_eq!(node.name, "UserDto");
    }

    #[test]
    fn test_unresolvable_and_external_types() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            "import { Response } from 'express';\nexport class X { file: Express.Multer.File; }",
        )]);

        assert!(resolve(&mut resolver, "Missing").is_none());
        assert!(resolve(&mut resolver, "Response").is_none());
        assert!(resolve(&mut resolver, "Express.Multer.File").is_none());
    }

    #[test]
    fn test_enum_and_alias_fields() {
        let mut resolver = create_resolver(&[(
            DTO_FILE,
            r#"
            export enum Status { A = 'A', B = 'B' }
            export type Money = { amount: number; currency: string };
            export type Items = ItemDto[];
            export class ItemDto { sku: string; }
            export class OrderDto { status: Status; total: Money; items: Items; }
            "#,
        )]);

        let node = resolve(&mut resolver, "OrderDto").unwrap();
        assert_eq!(
            node.field("status"),
            Some(&SchemaField::Enum(EnumDescriptor {
                name: "Status".to_string(),
                values: vec!["A".to_string(), "B".to_string()],
            }))
        );
        assert_eq!(
            node.field("total"),
            Some(&SchemaField::Raw(serde_json::json!({
                "amount": "number",
                "currency": "string"
            })))
        );
        let SchemaField::Node(items) = node.field("items").unwrap() else {
            panic!("Expected items node");
        };
        assert_eq!(items.display_name(), "ItemDto[]");

        // An enum alone is not a schema node
        assert!(resolve(&mut resolver, "Status").is_none());
    }

    #[test]
    fn test_signature_keys_declaring_module() {
        let mut resolver = create_resolver(&[
            ("/project/src/a.ts", "import { UserDto as U } from './user';"),
            ("/project/src/user.ts", "export class UserDto {}"),
        ]);

        let via_alias = resolver.signature(&type_ref("U", "/project/src/a.ts"));
        let direct = resolver.signature(&type_ref("UserDto", "/project/src/user.ts"));
        assert_eq!(via_alias, direct);
        assert_eq!(via_alias, "import(\"/project/src/user.ts\").UserDto");

        let union = resolver.signature(&type_ref("U[] | null", "/project/src/a.ts"));
        assert_eq!(union, "import(\"/project/src/user.ts\").UserDto[] | null");
    }

    #[test]
    fn test_visited_set_snapshots_are_independent() {
        let root = VisitedSet::new();
        let left = root.with("A");
        let right = root.with("B");
        assert!(root.is_empty());
        assert!(left.contains("A") && !left.contains("B"));
        assert!(right.contains("B") && !right.contains("A"));
        assert_eq!(left.with("C").len(), 2);
    }
}
