//! DOCX package writing.
//!
//! A minimal WordprocessingML package: the document body built from
//! paragraph records, a style sheet defining the paragraph styles the
//! records reference, and core properties. Run formatting is written
//! directly on each run so the package renders the same without the style
//! sheet.

use super::structured::{ParagraphRecord, RunRecord};
use crate::error::{Error, Result};
use crate::model::TextAlign;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Heading sizes written to the style sheet, in half-points.
const HEADING_HALF_POINTS: [u32; 6] = [48, 44, 40, 28, 24, 24];

/// Package-level metadata.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    /// Document title
    pub title: Option<String>,
    /// Application recorded as creator
    pub creator: String,
    /// Default font family
    pub base_font_family: String,
    /// Default font size in points
    pub base_font_size_pt: f32,
    /// Creation timestamp
    pub created: DateTime<Utc>,
}

/// Write a DOCX package for the given paragraphs.
pub fn write_package(records: &[ParagraphRecord], info: &PackageInfo) -> Result<Vec<u8>> {
    let document_xml = document_xml(records).map_err(fmt_error)?;
    let styles_xml = styles_xml(info).map_err(fmt_error)?;
    let core_xml = core_xml(info).map_err(fmt_error)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS_XML.as_bytes()),
        ("word/document.xml", document_xml.as_bytes()),
        ("word/styles.xml", styles_xml.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
        ("docProps/core.xml", core_xml.as_bytes()),
    ];
    for (name, content) in parts {
        zip.start_file(name, deflated)?;
        zip.write_all(content)?;
    }

    let bytes = zip.finish()?.into_inner();
    log::debug!("Wrote DOCX package: {} paragraphs, {} bytes", records.len(), bytes.len());
    Ok(bytes)
}

fn fmt_error(e: std::fmt::Error) -> Error {
    Error::Conversion(format!("DOCX serialization failed: {}", e))
}

/// Escape text for XML, dropping characters XML 1.0 cannot carry.
fn xml_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|&c| !c.is_control() || c == '\t' || c == '\n' || c == '\r')
        .collect();
    escape(cleaned.as_str()).into_owned()
}

fn jc_value(align: TextAlign) -> Option<&'static str> {
    match align {
        TextAlign::Left => None,
        TextAlign::Center => Some("center"),
        TextAlign::Right => Some("right"),
        TextAlign::Justify => Some("both"),
    }
}

fn document_xml(records: &[ParagraphRecord]) -> std::result::Result<String, std::fmt::Error> {
    let mut xml = String::with_capacity(256 + records.len() * 256);
    xml.push_str(XML_DECL);
    write!(xml, "<w:document xmlns:w=\"{}\"><w:body>", WORDML_NS)?;
    for record in records {
        paragraph_xml(record, &mut xml)?;
    }
    // US Letter, 0.5in margins
    xml.push_str(
        "<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/>\
         <w:pgMar w:top=\"720\" w:right=\"720\" w:bottom=\"720\" w:left=\"720\" \
         w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/></w:sectPr>",
    );
    xml.push_str("</w:body></w:document>");
    Ok(xml)
}

fn paragraph_xml(record: &ParagraphRecord, xml: &mut String) -> std::fmt::Result {
    xml.push_str("<w:p><w:pPr>");
    if let Some(style_id) = record.style.style_id() {
        write!(xml, "<w:pStyle w:val=\"{}\"/>", style_id)?;
    }
    write!(xml, "<w:spacing w:after=\"{}\"/>", record.spacing_after_twips)?;
    if record.indent_twips > 0 {
        write!(xml, "<w:ind w:left=\"{}\"/>", record.indent_twips)?;
    }
    if let Some(jc) = jc_value(record.align) {
        write!(xml, "<w:jc w:val=\"{}\"/>", jc)?;
    }
    xml.push_str("</w:pPr>");

    for run in &record.runs {
        run_xml(run, xml)?;
    }
    xml.push_str("</w:p>");
    Ok(())
}

fn run_xml(run: &RunRecord, xml: &mut String) -> std::fmt::Result {
    let style = &run.style;
    xml.push_str("<w:r><w:rPr>");
    if let Some(family) = &style.font_family {
        let family = xml_text(family);
        write!(
            xml,
            "<w:rFonts w:ascii=\"{0}\" w:hAnsi=\"{0}\" w:cs=\"{0}\"/>",
            family
        )?;
    }
    if style.bold {
        xml.push_str("<w:b/>");
    }
    if style.italic {
        xml.push_str("<w:i/>");
    }
    if let Some(color) = &style.color {
        write!(xml, "<w:color w:val=\"{}\"/>", color)?;
    }
    let half_points = style.half_points();
    write!(xml, "<w:sz w:val=\"{0}\"/><w:szCs w:val=\"{0}\"/>", half_points)?;
    if style.underline {
        xml.push_str("<w:u w:val=\"single\"/>");
    }
    xml.push_str("</w:rPr>");

    for (i, piece) in run.text.split('\t').enumerate() {
        if i > 0 {
            xml.push_str("<w:tab/>");
        }
        if !piece.is_empty() {
            write!(xml, "<w:t xml:space=\"preserve\">{}</w:t>", xml_text(piece))?;
        }
    }
    xml.push_str("</w:r>");
    Ok(())
}

fn styles_xml(info: &PackageInfo) -> std::result::Result<String, std::fmt::Error> {
    let family = xml_text(&info.base_font_family);
    let size = (info.base_font_size_pt * 2.0).round() as u32;

    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECL);
    write!(xml, "<w:styles xmlns:w=\"{}\">", WORDML_NS)?;
    write!(
        xml,
        "<w:docDefaults><w:rPrDefault><w:rPr>\
         <w:rFonts w:ascii=\"{0}\" w:hAnsi=\"{0}\" w:cs=\"{0}\"/>\
         <w:sz w:val=\"{1}\"/><w:szCs w:val=\"{1}\"/>\
         </w:rPr></w:rPrDefault><w:pPrDefault><w:pPr>\
         <w:spacing w:after=\"0\" w:line=\"276\" w:lineRule=\"auto\"/>\
         </w:pPr></w:pPrDefault></w:docDefaults>",
        family, size
    )?;

    xml.push_str(
        "<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\">\
         <w:name w:val=\"Normal\"/><w:qFormat/></w:style>",
    );
    for (i, half_points) in HEADING_HALF_POINTS.iter().enumerate() {
        let level = i + 1;
        write!(
            xml,
            "<w:style w:type=\"paragraph\" w:styleId=\"Heading{0}\">\
             <w:name w:val=\"heading {0}\"/><w:basedOn w:val=\"Normal\"/>\
             <w:next w:val=\"Normal\"/><w:qFormat/>\
             <w:pPr><w:keepNext/><w:outlineLvl w:val=\"{1}\"/></w:pPr>\
             <w:rPr><w:b/><w:sz w:val=\"{2}\"/><w:szCs w:val=\"{2}\"/></w:rPr></w:style>",
            level,
            i,
            half_points
        )?;
    }
    xml.push_str(
        "<w:style w:type=\"paragraph\" w:styleId=\"ListParagraph\">\
         <w:name w:val=\"List Paragraph\"/><w:basedOn w:val=\"Normal\"/><w:qFormat/>\
         <w:pPr><w:ind w:left=\"360\"/></w:pPr></w:style>",
    );
    xml.push_str(
        "<w:style w:type=\"paragraph\" w:styleId=\"Quote\">\
         <w:name w:val=\"Quote\"/><w:basedOn w:val=\"Normal\"/><w:qFormat/>\
         <w:pPr><w:ind w:left=\"720\"/></w:pPr><w:rPr><w:i/></w:rPr></w:style>",
    );
    xml.push_str(
        "<w:style w:type=\"paragraph\" w:styleId=\"Code\">\
         <w:name w:val=\"Code\"/><w:basedOn w:val=\"Normal\"/>\
         <w:rPr><w:rFonts w:ascii=\"Courier New\" w:hAnsi=\"Courier New\" w:cs=\"Courier New\"/></w:rPr></w:style>",
    );
    xml.push_str("</w:styles>");
    Ok(xml)
}

fn core_xml(info: &PackageInfo) -> std::result::Result<String, std::fmt::Error> {
    let created = info.created.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECL);
    xml.push_str(
        "<cp:coreProperties \
         xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
         xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">",
    );
    if let Some(title) = &info.title {
        write!(xml, "<dc:title>{}</dc:title>", xml_text(title))?;
    }
    write!(xml, "<dc:creator>{}</dc:creator>", xml_text(&info.creator))?;
    write!(
        xml,
        "<dcterms:created xsi:type=\"dcterms:W3CDTF\">{0}</dcterms:created>\
         <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{0}</dcterms:modified>",
        created
    )?;
    xml.push_str("</cp:coreProperties>");
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::structured::ParagraphStyle;
    use crate::style::StyleDescriptor;
    use chrono::TimeZone;
    use std::io::Read;

    fn descriptor() -> StyleDescriptor {
        StyleDescriptor {
            align: TextAlign::Left,
            bold: false,
            italic: false,
            underline: false,
            font_size_pt: 12.0,
            color: None,
            font_family: None,
        }
    }

    fn info() -> PackageInfo {
        PackageInfo {
            title: Some("Bid & Proposal".to_string()),
            creator: "rfpress".to_string(),
            base_font_family: "Arial".to_string(),
            base_font_size_pt: 12.0,
            created: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn record(runs: Vec<RunRecord>) -> ParagraphRecord {
        ParagraphRecord {
            style: ParagraphStyle::Normal,
            align: TextAlign::Left,
            indent_twips: 0,
            spacing_after_twips: 120,
            runs,
        }
    }

    #[test]
    fn test_run_properties_order() {
        let style = StyleDescriptor {
            bold: true,
            italic: true,
            underline: true,
            font_size_pt: 10.5,
            color: Some("1F4E79".to_string()),
            font_family: Some("Georgia".to_string()),
            ..descriptor()
        };
        let mut xml = String::new();
        run_xml(
            &RunRecord {
                text: "Cost <total>".to_string(),
                style,
            },
            &mut xml,
        )
        .unwrap();
        assert_eq!(
            xml,
            "<w:r><w:rPr><w:rFonts w:ascii=\"Georgia\" w:hAnsi=\"Georgia\" w:cs=\"Georgia\"/>\
             <w:b/><w:i/><w:color w:val=\"1F4E79\"/><w:sz w:val=\"21\"/><w:szCs w:val=\"21\"/>\
             <w:u w:val=\"single\"/></w:rPr>\
             <w:t xml:space=\"preserve\">Cost &lt;total&gt;</w:t></w:r>"
        );
    }

    #[test]
    fn test_paragraph_properties() {
        let mut rec = record(vec![RunRecord {
            text: "a\tb".to_string(),
            style: descriptor(),
        }]);
        rec.style = ParagraphStyle::Heading(3);
        rec.align = TextAlign::Justify;
        rec.indent_twips = 720;
        let mut xml = String::new();
        paragraph_xml(&rec, &mut xml).unwrap();
        assert!(xml.starts_with(
            "<w:p><w:pPr><w:pStyle w:val=\"Heading3\"/><w:spacing w:after=\"120\"/>\
             <w:ind w:left=\"720\"/><w:jc w:val=\"both\"/></w:pPr>"
        ));
        assert!(xml.contains("a</w:t><w:tab/><w:t xml:space=\"preserve\">b"));
    }

    #[test]
    fn test_control_characters_dropped() {
        assert_eq!(xml_text("a\u{0}b\u{1b}c & d"), "abc &amp; d");
    }

    #[test]
    fn test_package_contents() {
        let records = vec![record(vec![RunRecord {
            text: "Hello".to_string(),
            style: descriptor(),
        }])];
        let bytes = write_package(&records, &info()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
            "docProps/core.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {}", name);
        }

        let mut core = String::new();
        archive
            .by_name("docProps/core.xml")
            .unwrap()
            .read_to_string(&mut core)
            .unwrap();
        assert!(core.contains("<dc:title>Bid &amp; Proposal</dc:title>"));
        assert!(core.contains("2024-03-01T12:00:00Z"));

        let mut document = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut document)
            .unwrap();
        assert_eq!(document.matches("<w:p>").count(), 1);
        assert!(document.contains(">Hello</w:t>"));
    }

    #[test]
    fn test_styles_define_headings() {
        let xml = styles_xml(&info()).unwrap();
        for level in 1..=6 {
            assert!(xml.contains(&format!("w:styleId=\"Heading{}\"", level)));
        }
        assert!(xml.contains("w:styleId=\"ListParagraph\""));
        assert!(xml.contains("<w:sz w:val=\"24\"/>"));
    }
}
