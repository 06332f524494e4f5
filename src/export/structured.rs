//! Structured (editable) export.
//!
//! A single linear walk over the document turns every text-bearing node into
//! paragraph records: one record per non-blank line, with the runs styled by
//! [`StyleResolver`]. Containers (lists, blockquotes, tables) are flattened
//! into the walk; they contribute indentation, a list marker or inherited
//! style overrides but no paragraphs of their own. The records are then
//! packaged as a DOCX by [`docx`](super::docx). No pagination is involved.

use super::docx::{self, PackageInfo};
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::model::{Document, DocumentNode, NodeKind, StyleOverrides, TextAlign};
use crate::style::{StyleDescriptor, StyleResolver};

/// Twips per CSS pixel (0.75pt x 20).
const TWIPS_PER_PX: f32 = 15.0;
/// Left indent per list nesting level, in twips.
const LIST_INDENT_TWIPS: u32 = 360;
/// Left indent of quoted paragraphs, in twips.
const QUOTE_INDENT_TWIPS: u32 = 720;
/// Family used for code blocks without an explicit font.
const CODE_FONT: &str = "Courier New";

/// A styled run of a paragraph record.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Run text, without line breaks
    pub text: String,
    /// Resolved style
    pub style: StyleDescriptor,
}

/// Paragraph style of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    /// Body text
    Normal,
    /// Heading, always 1-6
    Heading(u8),
    /// Paragraph inside a list item
    ListParagraph,
    /// Paragraph inside a blockquote
    Quote,
    /// Line of a code block
    Code,
}

impl ParagraphStyle {
    /// Map a stored heading level; levels outside 1-6 become level 1.
    pub fn heading(level: u8) -> Self {
        if (1..=6).contains(&level) {
            ParagraphStyle::Heading(level)
        } else {
            log::debug!("Heading level {} mapped to Heading1", level);
            ParagraphStyle::Heading(1)
        }
    }

    /// Style id in `word/styles.xml`, `None` for the default paragraph style.
    pub fn style_id(&self) -> Option<String> {
        match self {
            ParagraphStyle::Normal => None,
            ParagraphStyle::Heading(level) => Some(format!("Heading{}", level)),
            ParagraphStyle::ListParagraph => Some("ListParagraph".to_string()),
            ParagraphStyle::Quote => Some("Quote".to_string()),
            ParagraphStyle::Code => Some("Code".to_string()),
        }
    }
}

/// One output paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphRecord {
    /// Paragraph style
    pub style: ParagraphStyle,
    /// Alignment
    pub align: TextAlign,
    /// Left indent in twips
    pub indent_twips: u32,
    /// Space after the paragraph in twips
    pub spacing_after_twips: u32,
    /// Runs, in order
    pub runs: Vec<RunRecord>,
}

impl ParagraphRecord {
    /// Text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

/// A finished DOCX.
#[derive(Debug, Clone)]
pub struct StructuredOutput {
    /// DOCX bytes
    pub bytes: Vec<u8>,
    /// Number of paragraphs written
    pub paragraphs: usize,
}

/// Exports documents as DOCX.
#[derive(Debug, Clone)]
pub struct StructuredExporter {
    config: ExportConfig,
    resolver: StyleResolver,
}

impl StructuredExporter {
    /// Create an exporter for the given configuration.
    pub fn new(config: ExportConfig) -> Self {
        let resolver = StyleResolver::new(&config);
        Self { config, resolver }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Walk the document into paragraph records.
    pub fn records(&self, document: &Document) -> Result<Vec<ParagraphRecord>> {
        if document.is_empty() {
            return Err(Error::NoSections);
        }

        let mut walk = Walk {
            resolver: &self.resolver,
            records: Vec::new(),
            pending_marker: None,
        };
        let scope = Scope::default();
        for node in &document.nodes {
            walk.node(node, &scope);
        }
        log::debug!(
            "Walked {} nodes into {} paragraphs",
            document.node_count(),
            walk.records.len()
        );
        if walk.records.is_empty() {
            return Err(Error::NoSections);
        }
        Ok(walk.records)
    }

    /// Export the document as DOCX bytes.
    pub fn export(&self, document: &Document) -> Result<StructuredOutput> {
        let records = self.records(document)?;
        let info = PackageInfo {
            title: document.title.clone(),
            creator: self.config.creator.clone(),
            base_font_family: self.config.base_font_family.clone(),
            base_font_size_pt: self.config.base_font_size_pt,
            created: chrono::Utc::now(),
        };
        let bytes = docx::write_package(&records, &info)?;
        Ok(StructuredOutput {
            bytes,
            paragraphs: records.len(),
        })
    }
}

/// Context inherited from enclosing containers.
#[derive(Debug, Clone, Default)]
struct Scope {
    list_depth: u32,
    quote: bool,
    inherited: StyleOverrides,
}

impl Scope {
    fn nested(&self, node: &DocumentNode) -> Scope {
        Scope {
            inherited: node.attrs.style.inherit_from(&self.inherited),
            ..self.clone()
        }
    }

    fn indent_twips(&self) -> u32 {
        self.list_depth * LIST_INDENT_TWIPS + if self.quote { QUOTE_INDENT_TWIPS } else { 0 }
    }
}

struct Walk<'r> {
    resolver: &'r StyleResolver,
    records: Vec<ParagraphRecord>,
    /// List marker waiting for the first paragraph of the current item
    pending_marker: Option<String>,
}

impl Walk<'_> {
    fn node(&mut self, node: &DocumentNode, scope: &Scope) {
        match &node.kind {
            NodeKind::Heading { .. } | NodeKind::Paragraph | NodeKind::CodeBlock => {
                self.text_block(node, scope)
            },
            NodeKind::BulletList => self.list(node, scope, |_| "•".to_string()),
            NodeKind::OrderedList { start } => {
                let start = *start;
                self.list(node, scope, move |i| format!("{}.", u64::from(start) + i as u64))
            },
            NodeKind::Blockquote => {
                let mut inner = scope.nested(node);
                inner.quote = true;
                self.children(node, &inner);
            },
            NodeKind::ListItem | NodeKind::Table | NodeKind::TableRow | NodeKind::TableCell { .. } => {
                self.children(node, &scope.nested(node))
            },
            NodeKind::Image(image) => {
                log::debug!("Skipping image '{}' in structured export", image.src);
            },
            NodeKind::Text(_) => {
                // Loose run outside a text block
                let wrapper = DocumentNode::new(NodeKind::Paragraph).with_child(node.clone());
                self.text_block(&wrapper, scope);
            },
        }
    }

    fn children(&mut self, node: &DocumentNode, scope: &Scope) {
        for child in &node.children {
            self.node(child, scope);
        }
    }

    fn list(&mut self, node: &DocumentNode, scope: &Scope, marker: impl Fn(usize) -> String) {
        // A list opening an item leaves the item's own marker for its next paragraph
        let outer_marker = self.pending_marker.take();
        let mut inner = scope.nested(node);
        inner.list_depth += 1;
        for (i, item) in node.children.iter().enumerate() {
            self.pending_marker = Some(marker(i));
            if matches!(item.kind, NodeKind::ListItem) {
                self.children(item, &inner.nested(item));
            } else {
                self.node(item, &inner);
            }
        }
        self.pending_marker = outer_marker;
    }

    fn text_block(&mut self, node: &DocumentNode, scope: &Scope) {
        let Some(block) = self.resolver.resolve_block(node, &scope.inherited) else {
            return;
        };

        let is_code = matches!(node.kind, NodeKind::CodeBlock);
        let style = match node.kind {
            NodeKind::Heading { level } => ParagraphStyle::heading(level),
            NodeKind::CodeBlock => ParagraphStyle::Code,
            _ if scope.list_depth > 0 => ParagraphStyle::ListParagraph,
            _ if scope.quote => ParagraphStyle::Quote,
            _ => ParagraphStyle::Normal,
        };

        let mut lines: Vec<Vec<RunRecord>> = vec![Vec::new()];
        for run in node.runs() {
            let Some(mut descriptor) = self.resolver.resolve_run(&block, run) else {
                continue;
            };
            if is_code && descriptor.font_family.is_none() {
                descriptor.font_family = Some(CODE_FONT.to_string());
            }
            for (i, piece) in run.text.split('\n').enumerate() {
                if i > 0 {
                    lines.push(Vec::new());
                }
                let piece = piece.trim_end_matches('\r');
                if !piece.is_empty() {
                    if let Some(line) = lines.last_mut() {
                        line.push(RunRecord {
                            text: piece.to_string(),
                            style: descriptor.clone(),
                        });
                    }
                }
            }
        }

        let first = self.records.len();
        for mut runs in lines.into_iter().filter(|line| !is_blank(line)) {
            if !is_code {
                trim_line(&mut runs);
            }
            if let Some(marker) = self.pending_marker.take() {
                let style = runs[0].style.clone();
                runs.insert(
                    0,
                    RunRecord {
                        text: format!("{} ", marker),
                        style,
                    },
                );
            }
            self.records.push(ParagraphRecord {
                style,
                align: block.align,
                indent_twips: scope.indent_twips(),
                spacing_after_twips: 0,
                runs,
            });
        }

        // Block margin goes after the block's last line only
        if self.records.len() > first {
            if let Some(last) = self.records.last_mut() {
                last.spacing_after_twips = (block.margin_bottom_px * TWIPS_PER_PX).round() as u32;
            }
        }
    }
}

fn is_blank(runs: &[RunRecord]) -> bool {
    runs.iter().all(|run| run.text.trim().is_empty())
}

/// Trim leading whitespace of the first run and trailing whitespace of the
/// last, dropping runs that end up empty. The line must not be blank.
fn trim_line(runs: &mut Vec<RunRecord>) {
    while runs.first().is_some_and(|run| run.text.trim_start().is_empty()) {
        runs.remove(0);
    }
    while runs.last().is_some_and(|run| run.text.trim_end().is_empty()) {
        runs.pop();
    }
    if let Some(first) = runs.first_mut() {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = runs.last_mut() {
        last.text = last.text.trim_end().to_string();
    }
}
