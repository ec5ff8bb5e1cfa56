//! Project description produced by the upstream structure parser.
//!
//! The parser emits these shapes as JSON; the assembler renders them. Every inner field is
//! tolerant of `null` and absence so that a sparse description still renders with empty cells.

use serde::{Deserialize, Deserializer, Serialize};

/// Complete output of the upstream parser.
///
/// `entities`, `classes` and `functions` must be present (a `null` value reads as empty);
/// `relationships` is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedProjectData {
    #[serde(deserialize_with = "null_as_empty")]
    pub entities: Vec<ClassInfo>,
    #[serde(deserialize_with = "null_as_empty")]
    pub classes: Vec<ClassInfo>,
    #[serde(deserialize_with = "null_as_empty")]
    pub functions: Vec<FunctionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<EntityRelationship>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub docs: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub methods: Vec<MethodInfo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Vec<PropertyInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInfo {
    #[serde(default)]
    pub name: Option<String>,
    /// Free text: signature, inputs and outputs
    #[serde(default)]
    pub docs: Option<String>,
    #[serde(default)]
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    #[serde(default)]
    pub name: Option<String>,
    /// HTTP verb when the function is a route handler
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub docs: Option<String>,
    #[serde(default)]
    pub return_type: Option<String>,
}

/// A directed relationship between two named entities or interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRelationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
}

impl EntityRelationship {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    /// Interface property typed with another interface
    Ref,
    /// Interface property typed with an array of another interface
    RefArray,
    /// Any kind this crate has no notation for
    Other(String),
}

impl RelationKind {
    pub fn as_str(&self) -> &str {
        match self {
            RelationKind::OneToOne => "OneToOne",
            RelationKind::OneToMany => "OneToMany",
            RelationKind::ManyToOne => "ManyToOne",
            RelationKind::ManyToMany => "ManyToMany",
            RelationKind::Ref => "Ref",
            RelationKind::RefArray => "RefArray",
            RelationKind::Other(kind) => kind,
        }
    }

    /// Mermaid cardinality link, `None` for kinds without a diagram notation.
    pub fn notation(&self) -> Option<&'static str> {
        match self {
            RelationKind::OneToOne => Some("||--||"),
            RelationKind::ManyToOne => Some("o|--||"),
            RelationKind::OneToMany => Some("||--|o"),
            RelationKind::ManyToMany => Some("o|--|o"),
            RelationKind::Ref | RelationKind::RefArray | RelationKind::Other(_) => None,
        }
    }
}

impl From<String> for RelationKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "OneToOne" => RelationKind::OneToOne,
            "OneToMany" => RelationKind::OneToMany,
            "ManyToOne" => RelationKind::ManyToOne,
            "ManyToMany" => RelationKind::ManyToMany,
            "Ref" => RelationKind::Ref,
            "RefArray" => RelationKind::RefArray,
            _ => RelationKind::Other(kind),
        }
    }
}

impl From<RelationKind> for String {
    fn from(kind: RelationKind) -> Self {
        kind.as_str().to_string()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
