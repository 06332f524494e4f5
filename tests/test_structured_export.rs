//! Structured DOCX export through the public API.

use rfpress::export::{ParagraphStyle, StructuredExporter};
use rfpress::{snapshot, Document, DocumentNode, Error, ExportConfig, TextRun};
use std::io::{Cursor, Read};

fn exporter() -> StructuredExporter {
    StructuredExporter::new(ExportConfig::default())
}

fn document_xml(bytes: Vec<u8>) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

#[test]
fn test_level_seven_heading_becomes_heading1() {
    let doc = Document::new(vec![DocumentNode::heading(7, "Appendix")]);
    let records = exporter().records(&doc).unwrap();
    assert_eq!(records[0].style, ParagraphStyle::Heading(1));

    let xml = document_xml(exporter().export(&doc).unwrap().bytes);
    assert!(xml.contains("<w:pStyle w:val=\"Heading1\"/>"));
}

#[test]
fn test_one_paragraph_per_non_blank_line() {
    let doc = Document::new(vec![
        DocumentNode::paragraph("alpha\nbeta\n\n\ngamma"),
        DocumentNode::paragraph("   "),
        DocumentNode::paragraph("delta"),
    ]);
    let out = exporter().export(&doc).unwrap();
    assert_eq!(out.paragraphs, 4);
    assert_eq!(document_xml(out.bytes).matches("<w:p>").count(), 4);
}

#[test]
fn test_run_styles_reach_the_package() {
    let doc = Document::new(vec![DocumentNode::paragraph_runs(vec![
        TextRun::new("Total ").bold(),
        TextRun::new("$4,200").color("#C00000").size("14pt").underline(),
    ])]);
    let xml = document_xml(exporter().export(&doc).unwrap().bytes);
    assert!(xml.contains("<w:b/>"));
    assert!(xml.contains("<w:color w:val=\"C00000\"/><w:sz w:val=\"28\"/>"));
    assert!(xml.contains("<w:u w:val=\"single\"/>"));
    assert!(xml.contains(">$4,200</w:t>"));
}

#[test]
fn test_zero_sections_is_fatal() {
    assert!(matches!(
        exporter().export(&Document::default()),
        Err(Error::NoSections)
    ));
}

#[test]
fn test_repeat_export_same_paragraph_count() {
    let doc = snapshot::from_html(
        "<h1>Scope</h1><p>Line one<br>Line two</p><ul><li>a</li><li>b</li></ul>",
    )
    .unwrap();
    let first = exporter().export(&doc).unwrap();
    let second = exporter().export(&doc).unwrap();
    assert_eq!(first.paragraphs, 5);
    assert_eq!(first.paragraphs, second.paragraphs);
}

#[test]
fn test_image_only_document_is_no_sections() {
    let doc = Document::new(vec![DocumentNode::image(rfpress::model::ImageSource {
        src: "diagram.png".to_string(),
        ..Default::default()
    })]);
    assert!(matches!(exporter().export(&doc), Err(Error::NoSections)));
}

#[test]
fn test_item_starting_with_nested_list_keeps_its_number() {
    let doc = snapshot::from_html(
        "<ol><li><ul><li>inner</li></ul><p>tail</p></li><li>second</li></ol>",
    )
    .unwrap();
    let texts: Vec<String> = exporter()
        .records(&doc)
        .unwrap()
        .iter()
        .map(|r| r.text())
        .collect();
    assert_eq!(texts, vec!["• inner", "1. tail", "2. second"]);
}
