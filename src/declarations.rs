//! Owned declaration model for one parsed TypeScript module.
//!
//! The tree-sitter tree is discarded after parsing; everything the extractor, the miner and the
//! type resolver need is copied into these plain structs so modules can be cached and shared
//! for the rest of a request.

use std::path::{Path, PathBuf};

/// Names that denote the absent value; never user schema.
const NULLISH: &[&str] = &["null", "undefined", "void"];

/// A parsed TypeScript source file.
#[derive(Debug, Clone, Default)]
pub struct SourceModule {
    /// Canonical path of the file
    pub path: PathBuf,
    pub imports: Vec<ImportBinding>,
    pub reexports: Vec<ReExport>,
    /// Name of the class exported with `export default class`, if any
    pub default_export: Option<String>,
    pub classes: Vec<ClassDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub enums: Vec<EnumDecl>,
    pub aliases: Vec<TypeAliasDecl>,
}

/// One local name introduced by an `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// The name visible inside the importing module
    pub local: String,
    pub kind: ImportKind,
    /// The module specifier as written (`./user.dto`, `@nestjs/common`)
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// `import { imported as local }`
    Named { imported: String },
    /// `import local from`
    Default,
    /// `import * as local from`
    Namespace,
}

/// Re-export forms used by barrel files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReExport {
    /// `export { original as exported } from 'source'`
    Named {
        exported: String,
        original: String,
        source: String,
    },
    /// `export * from 'source'`
    All { source: String },
}

/// A decorator application such as `@Get(':id')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    /// Last segment of the decorator expression (`Get` for `@Nest.Get()`)
    pub name: String,
    /// Raw source text of each call argument
    pub args: Vec<String>,
}

impl Decorator {
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub decorators: Vec<Decorator>,
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
}

impl ClassDecl {
    pub fn decorator(&self, name: &str) -> Option<&Decorator> {
        self.decorators.iter().find(|d| d.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: String,
    pub properties: Vec<PropertyDecl>,
}

/// A class field or interface property signature.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    /// Declared type; `None` when the property has no annotation
    pub ty: Option<TypeExpr>,
    pub optional: bool,
    pub decorators: Vec<Decorator>,
}

impl PropertyDecl {
    /// The declared type text, `any` when unannotated.
    pub fn type_text(&self) -> &str {
        self.ty.as_ref().map_or("any", |t| t.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub decorators: Vec<Decorator>,
    pub params: Vec<ParamDecl>,
    pub return_type: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub decorators: Vec<Decorator>,
    pub ty: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    /// Initializer with quotes stripped (`'admin'` -> `admin`)
    pub value: Option<String>,
}

impl EnumDecl {
    /// Member values in declaration order: the initializer when present, else the member name.
    pub fn values(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| m.value.clone().unwrap_or_else(|| m.name.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: String,
    pub value: TypeExpr,
}

/// Borrowed view of any named declaration in a module.
#[derive(Debug, Clone, Copy)]
pub enum Declaration<'a> {
    Class(&'a ClassDecl),
    Interface(&'a InterfaceDecl),
    Enum(&'a EnumDecl),
    Alias(&'a TypeAliasDecl),
}

impl SourceModule {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find a type-level declaration by name. Classes win over interfaces, enums and aliases.
    pub fn declaration(&self, name: &str) -> Option<Declaration<'_>> {
        if let Some(c) = self.classes.iter().find(|c| c.name == name) {
            return Some(Declaration::Class(c));
        }
        if let Some(i) = self.interfaces.iter().find(|i| i.name == name) {
            return Some(Declaration::Interface(i));
        }
        if let Some(e) = self.enums.iter().find(|e| e.name == name) {
            return Some(Declaration::Enum(e));
        }
        self.aliases
            .iter()
            .find(|a| a.name == name)
            .map(Declaration::Alias)
    }

    pub fn import_for(&self, local: &str) -> Option<&ImportBinding> {
        self.imports.iter().find(|i| i.local == local)
    }
}

/// A parsed type annotation together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub text: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// `string`, `number`, `boolean`, `any`, `void`, ...
    Keyword,
    /// String/number/boolean literal types, `null`, `undefined`
    Literal,
    /// A type reference, optionally qualified (`Express.Multer.File`) and parameterized
    Named {
        qualifier: Option<String>,
        name: String,
        args: Vec<TypeExpr>,
    },
    Array(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    /// Inline object literal type: member name and member type, in order
    Object(Vec<(String, TypeExpr)>),
    /// `import("./path").Name`
    Import { path: String, name: String },
    Other,
}

impl TypeExpr {
    pub fn new(text: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn keyword(text: &str) -> Self {
        Self::new(text, TypeKind::Keyword)
    }

    pub fn named(name: &str) -> Self {
        Self::new(
            name,
            TypeKind::Named {
                qualifier: None,
                name: name.to_string(),
                args: Vec::new(),
            },
        )
    }

    pub fn is_nullish(&self) -> bool {
        NULLISH.contains(&self.text.trim())
    }

    /// Whether this expression can point at a user declaration.
    pub fn is_reference(&self) -> bool {
        !self.is_nullish()
            && matches!(
                self.kind,
                TypeKind::Named { .. }
                    | TypeKind::Import { .. }
                    | TypeKind::Array(_)
                    | TypeKind::Object(_)
            )
    }

    /// Element type of `T[]` or `Array<T>`.
    pub fn array_element(&self) -> Option<&TypeExpr> {
        match &self.kind {
            TypeKind::Array(elem) => Some(elem),
            TypeKind::Named {
                qualifier: None,
                name,
                args,
            } if (name == "Array" || name == "ReadonlyArray") && args.len() == 1 => args.first(),
            _ => None,
        }
    }

    /// First type argument of a generic wrapper (`Promise<T>` -> `T`); arrays are not wrappers.
    pub fn unwrap_generic(&self) -> &TypeExpr {
        if self.array_element().is_some() {
            return self;
        }
        match &self.kind {
            TypeKind::Named { args, .. } => args.first().unwrap_or(self),
            _ => self,
        }
    }
}
