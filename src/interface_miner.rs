use crate::model::{EntityRelationship, RelationKind};
use crate::project_index::ProjectIndex;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Interface naming convention: `I` followed by an upper-case letter.
static INTERFACE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^I[A-Z]\w+").unwrap());

/// An interface declaration and its properties in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceEntity {
    pub name: String,
    /// Project-relative path with forward slashes
    pub file_path: String,
    pub properties: Vec<InterfaceProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MinedInterfaces {
    pub entities: Vec<InterfaceEntity>,
    pub relationships: Vec<EntityRelationship>,
}

/// Collects every interface of the project's source files and the relationships implied by
/// the interface naming convention. Best effort: property types are matched by text only.
pub fn mine_interfaces(index: &ProjectIndex) -> MinedInterfaces {
    let mut mined = MinedInterfaces::default();

    for module in index.project_modules() {
        let file_path = index.relative_path(module.path());

        for iface in &module.interfaces {
            let mut properties = Vec::with_capacity(iface.properties.len());

            for property in &iface.properties {
                let type_text = property.type_text().to_string();
                if let Some((target, kind)) = infer_relationship(&type_text) {
                    debug!("{}.{} -> {} ({})", iface.name, property.name, target, kind.as_str());
                    mined
                        .relationships
                        .push(EntityRelationship::new(iface.name.clone(), target, kind));
                }
                properties.push(InterfaceProperty {
                    name: property.name.clone(),
                    type_text,
                });
            }

            mined.entities.push(InterfaceEntity {
                name: iface.name.clone(),
                file_path: file_path.clone(),
                properties,
            });
        }
    }

    debug!(
        "Mined {} interfaces, {} relationships",
        mined.entities.len(),
        mined.relationships.len()
    );
    mined
}

/// `IPet` (and `IPet[]`, which starts with the name) gives a `Ref` to `IPet`; only the
/// bracket-wrapped `[IPet]` gives a `RefArray`.
pub fn infer_relationship(type_text: &str) -> Option<(String, RelationKind)> {
    let text = type_text.trim();

    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return INTERFACE_NAME
            .find(inner.trim())
            .map(|m| (m.as_str().to_string(), RelationKind::RefArray));
    }

    INTERFACE_NAME
        .find(text)
        .map(|m| (m.as_str().to_string(), RelationKind::Ref))
}
