//! Snapshot readers feeding the exporters.

use rfpress::export::{ParagraphStyle, StructuredExporter};
use rfpress::model::TextAlign;
use rfpress::snapshot::{self, SnapshotFormat};
use rfpress::{Error, ExportConfig, NodeKind};

const PROPOSAL_JSON: &str = r##"{
  "type": "doc",
  "content": [
    {"type": "heading", "attrs": {"level": 1, "textAlign": "center"},
     "content": [{"type": "text", "text": "Technical Approach"}]},
    {"type": "paragraph", "attrs": {"marginBottom": 16},
     "content": [
        {"type": "text", "text": "Our team "},
        {"type": "text", "text": "guarantees", "marks": [{"type": "italic"}, {"type": "underline"}]},
        {"type": "text", "text": " delivery."}
     ]},
    {"type": "blockquote", "content": [
        {"type": "paragraph", "content": [{"type": "text", "text": "Exceeded expectations."}]}
    ]},
    {"type": "horizontalRule"}
  ]
}"##;

const PROPOSAL_HTML: &str = r#"<!DOCTYPE html>
<html><head><title>Staffing Plan</title><style>p { color: red }</style></head>
<body>
<h2 style="text-align: right">Key Personnel</h2>
<p>Project lead<br>Ten years experience</p>
<ol start="2"><li>Architect</li><li>Analyst</li></ol>
<img src="org-chart.png" alt="Org chart">
</body></html>"#;

#[test]
fn test_json_snapshot_to_records() {
    let doc = snapshot::from_json(PROPOSAL_JSON).unwrap();
    assert_eq!(doc.nodes.len(), 3);
    assert_eq!(doc.nodes[0].attrs.align, Some(TextAlign::Center));
    assert_eq!(doc.nodes[2].kind, NodeKind::Blockquote);

    let records = StructuredExporter::new(ExportConfig::default())
        .records(&doc)
        .unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].align, TextAlign::Center);
    assert_eq!(records[1].text(), "Our team guarantees delivery.");
    assert!(records[1].runs[1].style.italic && records[1].runs[1].style.underline);
    assert_eq!(records[1].spacing_after_twips, 240);
    assert_eq!(records[2].style, ParagraphStyle::Quote);
}

#[test]
fn test_html_snapshot_to_records() {
    let doc = snapshot::from_html(PROPOSAL_HTML).unwrap();
    assert_eq!(doc.title.as_deref(), Some("Staffing Plan"));

    let records = StructuredExporter::new(ExportConfig::default())
        .records(&doc)
        .unwrap();
    let texts: Vec<String> = records.iter().map(|r| r.text()).collect();
    assert_eq!(
        texts,
        vec![
            "Key Personnel",
            "Project lead",
            "Ten years experience",
            "2. Architect",
            "3. Analyst",
        ]
    );
    assert_eq!(records[0].style, ParagraphStyle::Heading(2));
    assert_eq!(records[0].align, TextAlign::Right);
}

#[test]
fn test_read_file_detects_format() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("bid.json");
    std::fs::write(&json_path, PROPOSAL_JSON).unwrap();
    let html_path = dir.path().join("bid.export");
    std::fs::write(&html_path, PROPOSAL_HTML).unwrap();

    assert_eq!(snapshot::read_file(&json_path).unwrap().nodes.len(), 3);
    assert_eq!(
        snapshot::read_file(&html_path).unwrap().title.as_deref(),
        Some("Staffing Plan")
    );
    assert_eq!(SnapshotFormat::sniff(PROPOSAL_HTML), SnapshotFormat::Html);
}

#[test]
fn test_bad_snapshot() {
    assert!(matches!(
        snapshot::parse(r#"{"type":"table"}"#, SnapshotFormat::Json),
        Err(Error::Snapshot(_))
    ));
}
