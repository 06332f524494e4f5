//! ProseMirror / TipTap JSON snapshots.
//!
//! The editor serializes its state as a tree of `{ "type", "attrs",
//! "content", "text", "marks" }` objects rooted at a `doc` node.

use crate::error::{Error, Result};
use crate::model::{
    BlockAttrs, Document, DocumentNode, ImageSource, NodeKind, StyleOverrides, TextAlign,
    TextRun,
};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct JsonNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attrs: Option<Map<String, Value>>,
    #[serde(default)]
    content: Vec<JsonNode>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    marks: Vec<JsonMark>,
    /// Non-standard: some hosts store the document title on the root
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonMark {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attrs: Option<Map<String, Value>>,
}

/// Parse an editor JSON snapshot.
pub fn from_json(json: &str) -> Result<Document> {
    let root: JsonNode = serde_json::from_str(json)?;
    if root.kind != "doc" {
        return Err(Error::Snapshot(format!(
            "expected root node of type 'doc', found '{}'",
            root.kind
        )));
    }

    let nodes = root.content.iter().filter_map(convert).collect();
    let mut document = Document::new(nodes);
    document.title = root.title.filter(|t| !t.trim().is_empty());
    Ok(document)
}

fn attr<'a>(node: &'a JsonNode, key: &str) -> Option<&'a Value> {
    node.attrs.as_ref().and_then(|attrs| attrs.get(key))
}

/// Numbers arrive either as JSON numbers or numeric strings (`"320"`, `"320px"`).
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("px").trim().parse().ok(),
        _ => None,
    }
}

fn string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string).filter(|s| !s.is_empty())
}

fn block_attrs(node: &JsonNode) -> BlockAttrs {
    BlockAttrs {
        align: attr(node, "textAlign")
            .and_then(Value::as_str)
            .and_then(TextAlign::parse),
        margin_bottom: attr(node, "marginBottom")
            .and_then(number)
            .map(|n| n as f32),
        style: StyleOverrides::default(),
    }
}

fn children(node: &JsonNode) -> Vec<DocumentNode> {
    node.content.iter().filter_map(convert).collect()
}

fn convert(node: &JsonNode) -> Option<DocumentNode> {
    let kind = match node.kind.as_str() {
        "heading" => {
            let level = attr(node, "level")
                .and_then(number)
                .map(|n| n.clamp(0.0, f64::from(u8::MAX)) as u8)
                .unwrap_or(1);
            NodeKind::Heading { level }
        },
        "paragraph" => NodeKind::Paragraph,
        "codeBlock" | "code_block" => NodeKind::CodeBlock,
        "blockquote" => NodeKind::Blockquote,
        "bulletList" | "bullet_list" => NodeKind::BulletList,
        "orderedList" | "ordered_list" => {
            let start = attr(node, "start")
                .or_else(|| attr(node, "order"))
                .and_then(number)
                .map(|n| n.clamp(0.0, f64::from(u32::MAX)) as u32)
                .unwrap_or(1);
            NodeKind::OrderedList { start }
        },
        "listItem" | "list_item" => NodeKind::ListItem,
        "table" => NodeKind::Table,
        "tableRow" | "table_row" => NodeKind::TableRow,
        "tableCell" | "table_cell" => NodeKind::TableCell { header: false },
        "tableHeader" | "table_header" => NodeKind::TableCell { header: true },
        "image" => {
            let src = attr(node, "src").and_then(string)?;
            NodeKind::Image(ImageSource {
                src,
                alt: attr(node, "alt").and_then(string),
                width: attr(node, "width").and_then(number).map(|n| n as f32),
                height: attr(node, "height").and_then(number).map(|n| n as f32),
            })
        },
        "text" => {
            let text = node.text.clone().filter(|t| !t.is_empty())?;
            return Some(DocumentNode::text(text_run(text, &node.marks)));
        },
        "hardBreak" | "hard_break" => {
            return Some(DocumentNode::text(text_run("\n".to_string(), &node.marks)));
        },
        other => {
            log::debug!("Skipping unsupported snapshot node '{}'", other);
            return None;
        },
    };

    let mut converted = DocumentNode::new(kind).with_children(children(node));
    converted.attrs = block_attrs(node);
    Some(converted)
}

fn text_run(text: String, marks: &[JsonMark]) -> TextRun {
    let mut run = TextRun::new(text);
    for mark in marks {
        let mark_attr = |key: &str| {
            mark.attrs
                .as_ref()
                .and_then(|attrs| attrs.get(key))
                .and_then(string)
        };
        match mark.kind.as_str() {
            "bold" | "strong" => run.marks.bold = true,
            "italic" | "em" => run.marks.italic = true,
            "underline" => run.marks.underline = true,
            "textStyle" => {
                if let Some(color) = mark_attr("color") {
                    run.style.color = Some(color);
                }
                if let Some(family) = mark_attr("fontFamily") {
                    run.style.font_family = Some(family);
                }
                if let Some(size) = mark_attr("fontSize") {
                    run.style.font_size = Some(size);
                }
            },
            _ => {},
        }
    }
    run
}
