use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};

/// Placeholder stored instead of the fields of a type already being expanded on the current path.
pub const CIRCULAR_MARKER: &str = "[Circular Reference]";

/// A resolved, named, field-structured representation of a declared type.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SchemaNode {
    pub name: String,
    pub fields: SchemaFields,
    #[serde(rename = "isArray", skip_serializing_if = "std::ops::Not::not")]
    pub is_array: bool,
}

/// Fields of a node in declaration order, or the circular-reference marker.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaFields {
    Map(IndexMap<String, SchemaField>),
    Circular,
}

/// One resolved property value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum SchemaField {
    /// Raw type text of a property that is not user schema (`string`, `Date`, `'a' | 'b'`)
    Primitive(String),
    /// A nested declared type; `is_array` marks array-wrapped nodes
    Node(SchemaNode),
    Enum(EnumDescriptor),
    /// Structured dump of an inline object literal type
    Raw(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EnumDescriptor {
    pub name: String,
    pub values: Vec<String>,
}

impl SchemaNode {
    pub fn new(name: impl Into<String>, fields: IndexMap<String, SchemaField>) -> Self {
        Self {
            name: name.into(),
            fields: SchemaFields::Map(fields),
            is_array: false,
        }
    }

    pub fn circular(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: SchemaFields::Circular,
            is_array: false,
        }
    }

    pub fn into_array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn is_circular(&self) -> bool {
        self.fields == SchemaFields::Circular
    }

    pub fn field_map(&self) -> Option<&IndexMap<String, SchemaField>> {
        match &self.fields {
            SchemaFields::Map(map) => Some(map),
            SchemaFields::Circular => None,
        }
    }

    pub fn field(&self, key: &str) -> Option<&SchemaField> {
        self.field_map()?.get(key)
    }

    /// `Name`, or `Name[]` for array-wrapped nodes.
    pub fn display_name(&self) -> String {
        if self.is_array {
            format!("{}[]", self.name)
        } else {
            self.name.clone()
        }
    }
}

impl Serialize for SchemaFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SchemaFields::Map(map) => map.serialize(serializer),
            SchemaFields::Circular => serializer.serialize_str(CIRCULAR_MARKER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_nested_node() {
        let mut inner = IndexMap::new();
        inner.insert("name".to_string(), SchemaField::Primitive("string".to_string()));
        let pet = SchemaNode::new("PetDto", inner).into_array();

        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), SchemaField::Primitive("number".to_string()));
        fields.insert("pets".to_string(), SchemaField::Node(pet));
        fields.insert(
            "role".to_string(),
            SchemaField::Enum(EnumDescriptor {
                name: "Role".to_string(),
                values: vec!["A".to_string(), "B".to_string()],
            }),
        );
        let node = SchemaNode::new("UserDto", fields);

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "UserDto",
                "fields": {
                    "id": "number",
                    "pets": { "name": "PetDto", "fields": { "name": "string" }, "isArray": true },
                    "role": { "name": "Role", "values": ["A", "B"] }
                }
            })
        );
    }

    #[test]
    fn test_serialize_circular_marker() {
        let node = SchemaNode::circular("TreeNode");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value, json!({ "name": "TreeNode", "fields": "[Circular Reference]" }));
        assert!(node.is_circular());
        assert!(node.field_map().is_none());
    }

    #[test]
    fn test_display_name() {
        let node = SchemaNode::new("OrderDto", IndexMap::new());
        assert_eq!(node.display_name(), "OrderDto");
        assert_eq!(node.into_array().display_name(), "OrderDto[]");
    }
}
