use crate::model::EntityRelationship;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Diagram emitted when there is nothing to draw.
pub const EMPTY_DIAGRAM: &str = "erDiagram\n    %% No relationships found";

/// File name of the diagram artifact inside the output directory.
pub const DIAGRAM_FILE: &str = "erd.mmd";

/// Renders relationships as Mermaid `erDiagram` text.
///
/// Kinds without a cardinality notation (`Ref`, `RefArray`, unknown kinds) are skipped.
pub fn render(relationships: &[EntityRelationship]) -> String {
    if relationships.is_empty() {
        return EMPTY_DIAGRAM.to_string();
    }

    let mut diagram = String::from("erDiagram\n");
    for rel in relationships {
        let Some(link) = rel.kind.notation() else {
            debug!("Skipping relationship {} -> {} of kind {}", rel.from, rel.to, rel.kind.as_str());
            continue;
        };
        let _ = writeln!(diagram, "    {} {} {} : \"\"", rel.from, link, rel.to);
    }
    diagram
}

/// Renders the diagram, writes it to `<dir>/erd.mmd` and returns the text.
pub fn emit(relationships: &[EntityRelationship], dir: &Path) -> Result<String> {
    let diagram = render(relationships);

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let path = dir.join(DIAGRAM_FILE);
    fs::write(&path, &diagram)
        .with_context(|| format!("Failed to write diagram: {}", path.display()))?;

    info!("Wrote relationship diagram to {}", path.display());
    Ok(diagram)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_empty_input_gives_placeholder() {
        assert_eq!(render(&[]), "erDiagram\n    %% No relationships found");
    }

    #[test]
    fn test_render_in_input_order_skipping_unknown() {
        let rels = vec![
            EntityRelationship::new("User", "Profile", RelationKind::OneToOne),
            EntityRelationship::new("IUser", "IPet", RelationKind::Ref),
            EntityRelationship::new("Pet", "User", RelationKind::ManyToOne),
            EntityRelationship::new("A", "B", RelationKind::Other("Weird".to_string())),
            EntityRelationship::new("User", "Pet", RelationKind::OneToMany),
            EntityRelationship::new("Tag", "Post", RelationKind::ManyToMany),
        ];

        assert_eq!(
            render(&rels),
            "erDiagram\n\
             \x20   User ||--|| Profile : \"\"\n\
             \x20   Pet o|--|| User : \"\"\n\
             \x20   User ||--|o Pet : \"\"\n\
             \x20   Tag o|--|o Post : \"\"\n"
        );
    }

    #[test]
    fn test_emit_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("project");
        let rels = vec![EntityRelationship::new("User", "Pet", RelationKind::OneToMany)];

        let text = emit(&rels, &out).unwrap();

        let written = fs::read_to_string(out.join(DIAGRAM_FILE)).unwrap();
        assert_eq!(written, text);
        assert!(text.starts_with("erDiagram\n"));
    }
}
