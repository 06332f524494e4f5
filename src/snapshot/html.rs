//! Editor HTML snapshots.
//!
//! Rich-text editors export their content as an HTML fragment. The reader
//! is lenient the way browsers are: void elements need no closing tag,
//! mismatched end tags close the nearest matching element, unknown
//! elements are transparent and `&nbsp;` is understood.

use crate::error::Result;
use crate::model::{
    Document, DocumentNode, ImageSource, Marks, NodeKind, StyleOverrides, TextAlign, TextRun,
};
use crate::style::css;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;

/// Elements that never have content.
const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

/// Elements whose content is dropped.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "head", "title"];

/// Open elements a tag ends, and the elements that stop the search.
type ImplicitEnd = (&'static [&'static str], &'static [&'static str]);

fn implicit_end(tag: &str) -> Option<ImplicitEnd> {
    let sets: ImplicitEnd = match tag {
        "li" => (&["li"], &["ul", "ol"]),
        "td" | "th" => (&["td", "th"], &["tr", "table"]),
        "tr" => (&["tr"], &["table"]),
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "blockquote" | "ul" | "ol"
        | "table" => (&["p"], &["li", "td", "th", "blockquote"]),
        _ => return None,
    };
    Some(sets)
}

/// Inline state inherited by text.
#[derive(Debug, Clone, Default)]
struct Inline {
    marks: Marks,
    style: StyleOverrides,
}

#[derive(Debug)]
struct Frame {
    tag: String,
    /// Block node opened by this element; `None` for inline and transparent elements
    node: Option<DocumentNode>,
    inline: Inline,
    /// Whether the last child of a container is an implicit paragraph still open
    implicit_open: bool,
    /// Images met inside a text block, emitted after it
    trailing: Vec<DocumentNode>,
    preformatted: bool,
}

impl Frame {
    fn new(tag: String, node: Option<DocumentNode>, inline: Inline, preformatted: bool) -> Self {
        Self {
            tag,
            node,
            inline,
            implicit_open: false,
            trailing: Vec::new(),
            preformatted,
        }
    }
}

/// Parse an editor HTML fragment or page.
pub fn from_html(html: &str) -> Result<Document> {
    let mut builder = TreeBuilder::default();
    let mut reader = Reader::from_str(html);
    reader.trim_text(false);
    reader.check_end_names(false);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = tag_name(e.name().as_ref());
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    builder.void_element(&tag, e);
                } else {
                    builder.open(tag, e);
                }
            },
            Event::Empty(ref e) => {
                let tag = tag_name(e.name().as_ref());
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    builder.void_element(&tag, e);
                } else {
                    builder.open(tag.clone(), e);
                    builder.close(&tag);
                }
            },
            Event::End(ref e) => {
                let tag = tag_name(e.name().as_ref());
                builder.close(&tag);
            },
            Event::Text(ref t) => {
                let raw = String::from_utf8_lossy(t);
                builder.text(&decode_entities(&raw));
            },
            Event::CData(ref t) => {
                builder.text(&String::from_utf8_lossy(t));
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }

    Ok(builder.finish())
}

fn tag_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

fn decode_entities(raw: &str) -> Cow<'_, str> {
    let decoded = quick_xml::escape::unescape_with(raw, |entity| match entity {
        "nbsp" => Some("\u{a0}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "copy" => Some("\u{a9}"),
        "reg" => Some("\u{ae}"),
        "bull" => Some("\u{2022}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        _ => None,
    });
    match decoded {
        Ok(text) => text,
        Err(e) => {
            log::debug!("Keeping undecodable entity text: {}", e);
            Cow::Borrowed(raw)
        },
    }
}

fn attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.html_attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = match attr.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            (key, value)
        })
        .collect()
}

fn get<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Split an inline `style` attribute into block attributes and overrides.
fn apply_style(attrs: &[(String, String)], node: &mut DocumentNode) {
    if let Some(align) = get(attrs, "align").and_then(TextAlign::parse) {
        node.attrs.align = Some(align);
    }
    let Some(style) = get(attrs, "style") else {
        return;
    };
    for (property, value) in css::parse_declarations(style) {
        match property.as_str() {
            "text-align" => node.attrs.align = TextAlign::parse(&value).or(node.attrs.align),
            "margin-bottom" => node.attrs.margin_bottom = css::parse_length_px(&value),
            "color" => node.attrs.style.color = Some(value),
            "font-family" => node.attrs.style.font_family = Some(value),
            "font-size" => node.attrs.style.font_size = Some(value),
            _ => {},
        }
    }
}

fn inline_style(attrs: &[(String, String)], inline: &mut Inline) {
    if let Some(color) = get(attrs, "color") {
        inline.style.color = Some(color.to_string());
    }
    if let Some(face) = get(attrs, "face") {
        inline.style.font_family = Some(face.to_string());
    }
    let Some(style) = get(attrs, "style") else {
        return;
    };
    for (property, value) in css::parse_declarations(style) {
        match property.as_str() {
            "color" => inline.style.color = Some(value),
            "font-family" => inline.style.font_family = Some(value),
            "font-size" => inline.style.font_size = Some(value),
            "font-weight" => {
                inline.marks.bold = value == "bold"
                    || value == "bolder"
                    || value.parse::<u16>().is_ok_and(|w| w >= 600)
            },
            "font-style" => inline.marks.italic = value == "italic" || value == "oblique",
            "text-decoration" | "text-decoration-line" => {
                if value.contains("underline") {
                    inline.marks.underline = true;
                }
            },
            _ => {},
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    top: Vec<DocumentNode>,
    title: Option<String>,
    stack: Vec<Frame>,
    top_implicit_open: bool,
    skip_depth: usize,
    in_title: bool,
}

impl TreeBuilder {
    fn inline(&self) -> Inline {
        self.stack
            .last()
            .map(|frame| frame.inline.clone())
            .unwrap_or_default()
    }

    fn preformatted(&self) -> bool {
        self.stack.last().is_some_and(|frame| frame.preformatted)
    }

    fn open(&mut self, tag: String, e: &BytesStart<'_>) {
        if self.skip_depth > 0 || SKIPPED_ELEMENTS.contains(&tag.as_str()) {
            if tag == "title" {
                self.in_title = true;
            }
            self.skip_depth += 1;
            return;
        }

        self.close_open_sibling(&tag);
        let attrs = attributes(e);
        let mut inline = self.inline();
        let mut preformatted = self.preformatted();

        let kind = match tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(NodeKind::Heading {
                level: tag.as_bytes()[1] - b'0',
            }),
            "p" => Some(NodeKind::Paragraph),
            "pre" => {
                preformatted = true;
                Some(NodeKind::CodeBlock)
            },
            "blockquote" => Some(NodeKind::Blockquote),
            "ul" => Some(NodeKind::BulletList),
            "ol" => Some(NodeKind::OrderedList {
                start: get(&attrs, "start")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(1),
            }),
            "li" => Some(NodeKind::ListItem),
            "table" => Some(NodeKind::Table),
            "tr" => Some(NodeKind::TableRow),
            "td" => Some(NodeKind::TableCell { header: false }),
            "th" => Some(NodeKind::TableCell { header: true }),
            "strong" | "b" => {
                inline.marks.bold = true;
                None
            },
            "em" | "i" => {
                inline.marks.italic = true;
                None
            },
            "u" | "ins" => {
                inline.marks.underline = true;
                None
            },
            _ => None,
        };

        let node = kind.map(|kind| {
            let mut node = DocumentNode::new(kind);
            apply_style(&attrs, &mut node);
            node
        });
        if node.is_none() {
            inline_style(&attrs, &mut inline);
        }
        if let Some(block) = &node {
            if matches!(block.kind, NodeKind::TableCell { header: true }) {
                inline.marks.bold = true;
            }
            if block.is_text_block() || matches!(block.kind, NodeKind::ListItem) {
                self.close_implicit();
            }
        }

        self.stack.push(Frame::new(tag, node, inline, preformatted));
    }

    fn void_element(&mut self, tag: &str, e: &BytesStart<'_>) {
        if self.skip_depth > 0 {
            return;
        }
        match tag {
            "br" => self.push_run("\n".to_string()),
            "img" => {
                let attrs = attributes(e);
                let Some(src) = get(&attrs, "src").filter(|s| !s.is_empty()) else {
                    return;
                };
                let dimension = |name: &str| {
                    get(&attrs, name).and_then(|v| v.trim().trim_end_matches("px").parse().ok())
                };
                let image = DocumentNode::image(ImageSource {
                    src: src.to_string(),
                    alt: get(&attrs, "alt").map(str::to_string),
                    width: dimension("width"),
                    height: dimension("height"),
                });
                let text_block = self.nearest_block().filter(|&index| {
                    self.stack[index]
                        .node
                        .as_ref()
                        .is_some_and(DocumentNode::is_text_block)
                });
                match text_block {
                    Some(index) => self.stack[index].trailing.push(image),
                    None => self.attach(image),
                }
            },
            _ => {},
        }
    }

    fn close(&mut self, tag: &str) {
        if self.skip_depth > 0 {
            if !VOID_ELEMENTS.contains(&tag) {
                self.skip_depth -= 1;
            }
            if tag == "title" {
                self.in_title = false;
            }
            return;
        }
        if VOID_ELEMENTS.contains(&tag) {
            return;
        }
        let Some(position) = self.stack.iter().rposition(|frame| frame.tag == tag) else {
            log::debug!("Ignoring stray closing tag </{}>", tag);
            return;
        };
        self.close_from(position);
    }

    /// `<li>` ends an open sibling item, a block ends an open `<p>`, and so on.
    fn close_open_sibling(&mut self, tag: &str) {
        let Some((closes, stops)) = implicit_end(tag) else {
            return;
        };
        let found = self.stack.iter().rposition(|frame| {
            closes.contains(&frame.tag.as_str()) || stops.contains(&frame.tag.as_str())
        });
        if let Some(position) = found {
            if closes.contains(&self.stack[position].tag.as_str()) {
                self.close_from(position);
            }
        }
    }

    fn close_from(&mut self, position: usize) {
        while self.stack.len() > position {
            if let Some(frame) = self.stack.pop() {
                self.finish_frame(frame);
            }
        }
    }

    fn finish_frame(&mut self, frame: Frame) {
        if let Some(node) = frame.node {
            self.attach(node);
        }
        for image in frame.trailing {
            self.attach(image);
        }
    }

    fn nearest_block(&self) -> Option<usize> {
        self.stack.iter().rposition(|frame| frame.node.is_some())
    }

    fn close_implicit(&mut self) {
        match self.nearest_block() {
            Some(index) => self.stack[index].implicit_open = false,
            None => self.top_implicit_open = false,
        }
    }

    /// Append a finished block to its parent.
    fn attach(&mut self, node: DocumentNode) {
        match self.nearest_block() {
            Some(index) => {
                let frame = &mut self.stack[index];
                frame.implicit_open = false;
                if let Some(parent) = frame.node.as_mut() {
                    parent.children.push(node);
                }
            },
            None => {
                self.top_implicit_open = false;
                self.top.push(node);
            },
        }
    }

    fn text(&mut self, text: &str) {
        if self.skip_depth > 0 {
            if self.in_title && !text.trim().is_empty() {
                self.title = Some(text.trim().to_string());
            }
            return;
        }
        let text = if self.preformatted() {
            text.to_string()
        } else {
            collapse_whitespace(text)
        };
        self.push_run(text);
    }

    fn push_run(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let inline = self.inline();
        let run = DocumentNode::text(TextRun {
            text,
            marks: inline.marks,
            style: inline.style,
        });

        let target = self.nearest_block();
        let in_text_block = target
            .and_then(|index| self.stack[index].node.as_ref())
            .is_some_and(DocumentNode::is_text_block);
        if in_text_block {
            if let Some(block) = target.and_then(|index| self.stack[index].node.as_mut()) {
                block.children.push(run);
            }
            return;
        }

        // Loose text in a container or at top level gets an implicit paragraph
        let blank = run.plain_text().trim().is_empty() && run.plain_text() != "\n";
        match target {
            Some(index) => {
                let frame = &mut self.stack[index];
                if frame.implicit_open {
                    if let Some(paragraph) = frame.node.as_mut().and_then(|n| n.children.last_mut()) {
                        paragraph.children.push(run);
                    }
                } else if !blank {
                    if let Some(node) = frame.node.as_mut() {
                        node.children.push(DocumentNode::new(NodeKind::Paragraph).with_child(run));
                        frame.implicit_open = true;
                    }
                }
            },
            None => {
                if self.top_implicit_open {
                    if let Some(paragraph) = self.top.last_mut() {
                        paragraph.children.push(run);
                    }
                } else if !blank {
                    self.top.push(DocumentNode::new(NodeKind::Paragraph).with_child(run));
                    self.top_implicit_open = true;
                }
            },
        }
    }

    fn finish(mut self) -> Document {
        while let Some(frame) = self.stack.pop() {
            self.finish_frame(frame);
        }
        let mut document = Document::new(self.top);
        document.title = self.title;
        document
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}
