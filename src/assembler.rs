//! Document assembly.
//!
//! Builds the long-form [`Document`] from the upstream project description, the folder
//! listing, the relationship diagram, the extracted endpoints and the mined interfaces.
//! Sections always appear in the same order; a missing input yields an empty section rather
//! than an error.

use crate::document::{Document, ParagraphStyle};
use crate::extractor::{EndpointRecord, RequestParam};
use crate::interface_miner::MinedInterfaces;
use crate::model::{ClassInfo, FunctionInfo, MethodInfo, ParsedProjectData};
use crate::schema::{SchemaField, SchemaFields, SchemaNode, CIRCULAR_MARKER};
use crate::type_resolver::VisitedSet;
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

pub const DOCUMENT_TITLE: &str = "Project Documentation";
const MERMAID_HINT: &str = "(Paste into https://mermaid.live to visualize)";
const INDENT: &str = "  ";

/// Assembles every section of the project document.
pub fn assemble(
    parsed: &ParsedProjectData,
    folder_text: &str,
    diagram_text: &str,
    endpoints: &[EndpointRecord],
    interfaces: &MinedInterfaces,
) -> Document {
    debug!(
        "Assembling document: {} entities, {} classes, {} functions, {} endpoints, {} interfaces",
        parsed.entities.len(),
        parsed.classes.len(),
        parsed.functions.len(),
        endpoints.len(),
        interfaces.entities.len()
    );

    let mut doc = Document::new(DOCUMENT_TITLE);
    doc.title(DOCUMENT_TITLE).table_of_contents().page_break();

    doc.heading(1, "Folder Structure");
    for line in folder_text.lines() {
        doc.code(line);
    }
    doc.page_break();

    doc.heading(1, "Database Schema");
    diagram_section(&mut doc, diagram_text);
    entity_tables(&mut doc, &parsed.entities);
    interface_section(&mut doc, interfaces);
    doc.page_break();

    doc.heading(1, "Class & Function Details");
    for class in &parsed.classes {
        class_section(&mut doc, class);
    }
    for function in &parsed.functions {
        function_section(&mut doc, function);
    }
    doc.page_break();

    doc.heading(1, "API Endpoints");
    for endpoint in endpoints {
        endpoint_section(&mut doc, endpoint);
    }

    doc
}

fn diagram_section(doc: &mut Document, diagram_text: &str) {
    if diagram_text.trim().is_empty() {
        doc.paragraph("No relationships found.");
        return;
    }

    doc.heading(2, "Mermaid ER Diagram Syntax");
    for line in diagram_text.lines() {
        doc.code(line);
    }
    doc.quote(MERMAID_HINT);
}

fn entity_tables(doc: &mut Document, entities: &[ClassInfo]) {
    for entity in entities {
        doc.heading(2, format!("Entity: {}", text_or_empty(&entity.name)));

        let mut rows = vec![vec![
            "Column".to_string(),
            "Type".to_string(),
            "Decorators".to_string(),
        ]];
        rows.extend(entity.properties.iter().map(|prop| {
            vec![
                text_or_empty(&prop.name).to_string(),
                text_or_empty(&prop.type_name).to_string(),
                prop.decorators.join(", "),
            ]
        }));
        doc.table(rows);
    }
}

fn interface_section(doc: &mut Document, interfaces: &MinedInterfaces) {
    if interfaces.entities.is_empty() {
        return;
    }

    for iface in &interfaces.entities {
        doc.heading(2, format!("Interface: {}", iface.name));
        doc.quote(&iface.file_path);

        let mut rows = vec![vec!["Property".to_string(), "Type".to_string()]];
        rows.extend(
            iface
                .properties
                .iter()
                .map(|p| vec![p.name.clone(), p.type_text.clone()]),
        );
        doc.table(rows);
    }

    if !interfaces.relationships.is_empty() {
        doc.heading(2, "Interface Relationships");
        for rel in &interfaces.relationships {
            doc.code(format!("{} -> {} ({})", rel.from, rel.to, rel.kind.as_str()));
        }
    }
}

fn class_section(doc: &mut Document, class: &ClassInfo) {
    doc.heading(2, format!("Class: {}", text_or_empty(&class.name)));
    docs_lines(doc, class.docs.as_deref());

    for method in &class.methods {
        method_section(doc, method);
    }
}

fn method_section(doc: &mut Document, method: &MethodInfo) {
    doc.heading(3, format!("Method: {}", text_or_empty(&method.name)));
    docs_lines(doc, method.docs.as_deref());
}

fn function_section(doc: &mut Document, function: &FunctionInfo) {
    doc.heading(2, format!("Function: {}", text_or_empty(&function.name)));
    if let (Some(method), Some(route)) = (&function.method, &function.route) {
        doc.quote(format!("{} {}", method, route));
    }
    docs_lines(doc, function.docs.as_deref());
}

/// Free-text docs, one paragraph per line. Fence lines are dropped and code-looking lines
/// use the fixed-width style.
fn docs_lines(doc: &mut Document, docs: Option<&str>) {
    let Some(docs) = docs else {
        return;
    };

    for line in docs.split('\n') {
        if line.starts_with("```") {
            continue;
        }
        doc.styled(line, docs_line_style(line));
    }
}

fn docs_line_style(line: &str) -> ParagraphStyle {
    if line.starts_with('{') || line.starts_with('}') || line.starts_with(INDENT) {
        ParagraphStyle::Code
    } else {
        ParagraphStyle::Normal
    }
}

fn endpoint_section(doc: &mut Document, endpoint: &EndpointRecord) {
    doc.heading(2, format!("Endpoint: {}", endpoint.route));
    doc.quote(format!(
        "Controller: {} → Method: {}",
        endpoint.controller, endpoint.method_name
    ));

    doc.paragraph("Request Params");
    if endpoint.request_params.is_empty() {
        doc.paragraph("None");
    }
    for (key, param) in &endpoint.request_params {
        match param {
            RequestParam::Schema(node) => {
                for line in render_node(key, node, 0, &VisitedSet::new()) {
                    doc.code(line);
                }
            }
            RequestParam::Fallback { name, type_text } => {
                doc.code(format!("{}: {} ({})", key, name, type_text));
            }
        }
    }

    doc.paragraph("Response");
    match &endpoint.response_dto {
        Some(node) => {
            doc.code(node.display_name());
            for line in node_body(node, 1, &VisitedSet::new()) {
                doc.code(line);
            }
        }
        None => {
            doc.paragraph("None");
        }
    }
}

/// Renders resolved fields as indented lines, two spaces per level.
///
/// `seen` holds `name-key` entries for the nodes already expanded on the current path; a
/// repeated entry prints `(circular ref)` instead of recursing.
pub fn render_fields(
    fields: &IndexMap<String, SchemaField>,
    indent: usize,
    seen: &VisitedSet,
) -> Vec<String> {
    let pad = INDENT.repeat(indent);
    let mut lines = Vec::new();

    for (key, field) in fields {
        match field {
            SchemaField::Primitive(label) => lines.push(format!("{}{}: {}", pad, key, label)),
            SchemaField::Enum(descriptor) => {
                lines.push(format!("{}{}: enum {}", pad, key, descriptor.name));
                lines.extend(
                    descriptor
                        .values
                        .iter()
                        .map(|value| format!("{}{}- {}", pad, INDENT, value)),
                );
            }
            SchemaField::Node(node) => lines.extend(render_node(key, node, indent, seen)),
            SchemaField::Raw(value) => lines.extend(render_raw(key, value, &pad)),
        }
    }

    lines
}

fn render_node(key: &str, node: &SchemaNode, indent: usize, seen: &VisitedSet) -> Vec<String> {
    let pad = INDENT.repeat(indent);
    let mut lines = vec![format!("{}{}: {}", pad, key, node.display_name())];

    let seen_key = format!("{}-{}", node.name, key);
    if seen.contains(&seen_key) {
        lines.push(format!("{}{}(circular ref)", pad, INDENT));
        return lines;
    }

    lines.extend(node_body(node, indent + 1, &seen.with(&seen_key)));
    lines
}

fn node_body(node: &SchemaNode, indent: usize, seen: &VisitedSet) -> Vec<String> {
    match &node.fields {
        SchemaFields::Map(fields) => render_fields(fields, indent, seen),
        SchemaFields::Circular => vec![format!("{}{}", INDENT.repeat(indent), CIRCULAR_MARKER)],
    }
}

fn render_raw(key: &str, value: &Value, pad: &str) -> Vec<String> {
    match value {
        Value::Object(_) | Value::Array(_) => match serde_json::to_string_pretty(value) {
            Ok(dump) => {
                let mut lines = vec![format!("{}{}:", pad, key)];
                lines.extend(dump.lines().map(|line| format!("{}{}{}", pad, INDENT, line)));
                lines
            }
            Err(_) => vec![format!("{}{}: [unserializable]", pad, key)],
        },
        Value::String(text) => vec![format!("{}{}: {}", pad, key, text)],
        other => vec![format!("{}{}: {}", pad, key, other)],
    }
}

fn text_or_empty(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;
    use crate::extractor::HttpMethod;
    use crate::model::PropertyInfo;
    use crate::schema::EnumDescriptor;
    use pretty_assertions::assert_eq;

    fn primitive(label: &str) -> SchemaField {
        SchemaField::Primitive(label.to_string())
    }

    fn headings(doc: &Document) -> Vec<(u8, String)> {
        doc.headings().map(|(l, t)| (l, t.to_string())).collect()
    }

    #[test]
    fn test_render_primitives_and_enum() {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), primitive("number"));
        fields.insert(
            "status".to_string(),
            SchemaField::Enum(EnumDescriptor {
                name: "Status".to_string(),
                values: vec!["A".to_string(), "B".to_string()],
            }),
        );

        let lines = render_fields(&fields, 0, &VisitedSet::new());
        assert_eq!(
            lines,
            vec!["id: number", "status: enum Status", "  - A", "  - B"]
        );
    }

    #[test]
    fn test_render_nested_node_indents() {
        let mut pet_fields = IndexMap::new();
        pet_fields.insert("name".to_string(), primitive("string"));
        let mut fields = IndexMap::new();
        fields.insert(
            "pets".to_string(),
            SchemaField::Node(SchemaNode::new("PetDto", pet_fields).into_array()),
        );

        let lines = render_fields(&fields, 1, &VisitedSet::new());
        assert_eq!(lines, vec!["  pets: PetDto[]", "    name: string"]);
    }

    #[test]
    fn test_render_circular_marker_and_seen_guard() {
        let mut fields = IndexMap::new();
        fields.insert("parent".to_string(), SchemaField::Node(SchemaNode::circular("Category")));
        let lines = render_fields(&fields, 0, &VisitedSet::new());
        assert_eq!(lines, vec!["parent: Category", "  [Circular Reference]"]);

        let mut inner = IndexMap::new();
        inner.insert("x".to_string(), primitive("string"));
        let mut fields = IndexMap::new();
        fields.insert("node".to_string(), SchemaField::Node(SchemaNode::new("Loop", inner)));
        let seen = VisitedSet::new().with("Loop-node");
        let lines = render_fields(&fields, 0, &seen);
        assert_eq!(lines, vec!["node: Loop", "  (circular ref)"]);
    }

    #[test]
    fn test_render_raw_values() {
        let mut fields = IndexMap::new();
        fields.insert("meta".to_string(), SchemaField::Raw(serde_json::json!({ "a": "number" })));
        fields.insert("flag".to_string(), SchemaField::Raw(serde_json::json!(true)));
        fields.insert("label".to_string(), SchemaField::Raw(serde_json::json!("text")));

        let lines = render_fields(&fields, 0, &VisitedSet::new());
        assert_eq!(
            lines,
            vec!["meta:", "  {", "    \"a\": \"number\"", "  }", "flag: true", "label: text"]
        );
    }

    #[test]
    fn test_section_order_and_entity_table() {
        let parsed = ParsedProjectData {
            entities: vec![ClassInfo {
                name: Some("User".to_string()),
                properties: vec![
                    PropertyInfo {
                        name: Some("id".to_string()),
                        type_name: Some("number".to_string()),
                        decorators: vec!["PrimaryGeneratedColumn".to_string(), "Index".to_string()],
                    },
                    PropertyInfo {
                        name: Some("nickname".to_string()),
                        type_name: None,
                        decorators: Vec::new(),
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };

        let doc = assemble(&parsed, "app\n└── src", crate::erd::EMPTY_DIAGRAM, &[], &MinedInterfaces::default());

        let top: Vec<String> = headings(&doc)
            .into_iter()
            .filter(|(level, _)| *level == 1)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(
            top,
            vec!["Folder Structure", "Database Schema", "Class & Function Details", "API Endpoints"]
        );

        let table = doc
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Table { rows } => Some(rows.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(table[0], vec!["Column", "Type", "Decorators"]);
        assert_eq!(table[1], vec!["id", "number", "PrimaryGeneratedColumn, Index"]);
        assert_eq!(table[2], vec!["nickname", "", ""]);
    }

    #[test]
    fn test_docs_lines_styles() {
        let parsed = ParsedProjectData {
            classes: vec![ClassInfo {
                name: Some("UsersService".to_string()),
                docs: Some("Handles users\n```json\n{\n  \"id\": 1\n}\n```".to_string()),
                methods: vec![MethodInfo {
                    name: Some("findAll".to_string()),
                    docs: Some("Output: User[]".to_string()),
                    return_type: None,
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let doc = assemble(&parsed, "", "", &[], &MinedInterfaces::default());
        let paragraphs: Vec<(String, ParagraphStyle)> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph { text, style } => Some((text.clone(), *style)),
                _ => None,
            })
            .collect();

        assert!(paragraphs.contains(&("No relationships found.".to_string(), ParagraphStyle::Normal)));
        let class_lines: Vec<_> = paragraphs
            .iter()
            .skip_while(|(t, _)| t != "Handles users")
            .take(5)
            .cloned()
            .collect();
        assert_eq!(
            class_lines,
            vec![
                ("Handles users".to_string(), ParagraphStyle::Normal),
                ("{".to_string(), ParagraphStyle::Code),
                ("  \"id\": 1".to_string(), ParagraphStyle::Code),
                ("}".to_string(), ParagraphStyle::Code),
                ("Output: User[]".to_string(), ParagraphStyle::Normal),
            ]
        );
        assert!(headings(&doc).contains(&(3, "Method: findAll".to_string())));
    }

    #[test]
    fn test_endpoint_block() {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), primitive("number"));
        let mut endpoint = EndpointRecord::new(
            "OrdersController".to_string(),
            HttpMethod::Get,
            "orders/:id",
            "findOne".to_string(),
        );
        endpoint.request_params.insert(
            "param".to_string(),
            RequestParam::Fallback {
                name: "id".to_string(),
                type_text: "string".to_string(),
            },
        );
        endpoint.response_dto = Some(SchemaNode::new("OrderDto", fields));

        let doc = assemble(
            &ParsedProjectData::default(),
            "",
            "",
            &[endpoint],
            &MinedInterfaces::default(),
        );

        let start = doc
            .blocks
            .iter()
            .position(|b| matches!(b, Block::Heading { text, .. } if text == "Endpoint: GET orders/:id"))
            .unwrap();
        let texts: Vec<String> = doc.blocks[start + 1..]
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "Controller: OrdersController → Method: findOne",
                "Request Params",
                "param: id (string)",
                "Response",
                "OrderDto",
                "  id: number",
            ]
        );
    }
}
