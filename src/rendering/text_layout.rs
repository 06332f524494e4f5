//! Block flow layout.
//!
//! Produces positioned paint items for a run of top-level nodes. Measuring
//! and painting go through the same layout, so a block renders at exactly
//! the height it was measured at.

use super::fonts::{self, FaceData, FontBook};
use super::RenderContext;
use crate::config::pt_to_px;
use crate::model::{DocumentNode, ImageSource, NodeKind, StyleOverrides};
use crate::style::{BlockStyle, StyleDescriptor};
use base64::Engine;

/// Line height as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.2;
/// Indent of list content, in CSS pixels.
const LIST_INDENT_PX: f32 = 24.0;
/// Indent of quoted content, in CSS pixels.
const QUOTE_INDENT_PX: f32 = 16.0;
/// Width of the quote bar, in CSS pixels.
const QUOTE_BAR_PX: f32 = 3.0;
/// Padding inside table cells, in CSS pixels.
const CELL_PADDING_PX: f32 = 4.0;
/// Width used for images that declare no size and cannot be decoded.
const PLACEHOLDER_IMAGE_WIDTH_PX: f32 = 200.0;
/// Family used for preformatted text.
const MONOSPACE_FAMILY: &str = "Courier New";

/// A laid-out run of text on one line.
#[derive(Debug, Clone)]
pub(crate) struct TextItem {
    pub x: f32,
    pub baseline: f32,
    pub width: f32,
    pub text: String,
    pub size_px: f32,
    pub rgb: (u8, u8, u8),
    pub underline: bool,
    pub face: Option<FaceData>,
}

/// Something to paint, in CSS pixel coordinates.
#[derive(Debug, Clone)]
pub(crate) enum Item {
    Text(TextItem),
    /// Filled rectangle
    Rule {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        rgb: (u8, u8, u8),
    },
    /// Outlined rectangle
    Frame { x: f32, y: f32, w: f32, h: f32 },
    /// Decoded image scaled into a box
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        image: image::RgbaImage,
    },
}

/// Paint items and total height of a laid-out node run.
#[derive(Debug, Clone, Default)]
pub(crate) struct Layout {
    pub items: Vec<Item>,
    pub height: f32,
}

/// Lay out `nodes` at the context width, starting at the top.
pub(crate) fn layout(fonts: &mut FontBook, ctx: &RenderContext<'_>, nodes: &[DocumentNode]) -> Layout {
    let mut engine = FlowLayout {
        fonts,
        ctx: *ctx,
        items: Vec::new(),
        y: 0.0,
    };
    let inherited = StyleOverrides::default();
    for node in nodes {
        engine.block(node, 0.0, ctx.width_px, &inherited);
    }
    Layout {
        items: engine.items,
        height: engine.y,
    }
}

struct FlowLayout<'a> {
    fonts: &'a mut FontBook,
    ctx: RenderContext<'a>,
    items: Vec<Item>,
    y: f32,
}

struct StyledRun<'t> {
    text: &'t str,
    style: StyleDescriptor,
    size_px: f32,
    face: Option<FaceData>,
}

#[derive(Debug)]
struct Fragment {
    run: usize,
    text: String,
    width: f32,
    space: bool,
}

#[derive(Debug, Default)]
struct Line {
    fragments: Vec<Fragment>,
    width: f32,
}

impl Line {
    fn push(&mut self, fragment: Fragment) {
        self.width += fragment.width;
        self.fragments.push(fragment);
    }

    fn trim_end(&mut self) {
        while self.fragments.last().is_some_and(|f| f.space) {
            if let Some(f) = self.fragments.pop() {
                self.width -= f.width;
            }
        }
    }
}

impl<'a> FlowLayout<'a> {
    fn block(&mut self, node: &DocumentNode, x: f32, width: f32, inherited: &StyleOverrides) {
        match &node.kind {
            NodeKind::Heading { .. } | NodeKind::Paragraph | NodeKind::CodeBlock => {
                self.text_block(node, x, width, inherited);
            },
            NodeKind::Text(_) => {
                let wrapper = DocumentNode::new(NodeKind::Paragraph).with_child(node.clone());
                self.text_block(&wrapper, x, width, inherited);
            },
            NodeKind::Blockquote => {
                let scope = node.attrs.style.inherit_from(inherited);
                let top = self.y;
                for child in &node.children {
                    self.block(child, x + QUOTE_INDENT_PX, width - QUOTE_INDENT_PX, &scope);
                }
                self.items.push(Item::Rule {
                    x,
                    y: top,
                    w: QUOTE_BAR_PX,
                    h: self.y - top,
                    rgb: (200, 200, 200),
                });
            },
            NodeKind::BulletList | NodeKind::OrderedList { .. } => {
                let scope = node.attrs.style.inherit_from(inherited);
                let start = match node.kind {
                    NodeKind::OrderedList { start } => Some(start),
                    _ => None,
                };
                for (i, item) in node.children.iter().enumerate() {
                    let marker = match start {
                        Some(start) => format!("{}.", u64::from(start) + i as u64),
                        None => "\u{2022}".to_string(),
                    };
                    self.list_item(item, &marker, x, width, &scope);
                }
            },
            NodeKind::ListItem => {
                self.list_item(node, "\u{2022}", x, width, inherited);
            },
            NodeKind::Table => self.table(node, x, width, inherited),
            NodeKind::TableRow | NodeKind::TableCell { .. } => {
                let scope = node.attrs.style.inherit_from(inherited);
                for child in &node.children {
                    self.block(child, x, width, &scope);
                }
            },
            NodeKind::Image(source) => self.image(source, x, width),
        }
    }

    fn list_item(
        &mut self,
        item: &DocumentNode,
        marker: &str,
        x: f32,
        width: f32,
        inherited: &StyleOverrides,
    ) {
        let scope = item.attrs.style.inherit_from(inherited);
        let size_px = pt_to_px(self.ctx.resolver.base_font_size_pt());
        let face = self.fonts.face(self.ctx.base_font_family, false, false);
        let marker_width = fonts::text_width(face.as_ref(), marker, size_px);
        let baseline = self.y
            + (size_px * LINE_HEIGHT - size_px) / 2.0
            + fonts::ascent(face.as_ref(), size_px);

        self.items.push(Item::Text(TextItem {
            x: x + LIST_INDENT_PX - marker_width - 6.0,
            baseline,
            width: marker_width,
            text: marker.to_string(),
            size_px,
            rgb: (0, 0, 0),
            underline: false,
            face,
        }));

        let top = self.y;
        if item.is_text_block() || matches!(item.kind, NodeKind::Text(_)) {
            self.block(item, x + LIST_INDENT_PX, width - LIST_INDENT_PX, &scope);
        } else {
            for child in &item.children {
                self.block(child, x + LIST_INDENT_PX, width - LIST_INDENT_PX, &scope);
            }
        }
        if self.y <= top {
            // An empty item still occupies its marker line
            self.y = top + size_px * LINE_HEIGHT;
        }
    }

    fn table(&mut self, table: &DocumentNode, x: f32, width: f32, inherited: &StyleOverrides) {
        let scope = table.attrs.style.inherit_from(inherited);
        let columns = table
            .children
            .iter()
            .map(|row| row.children.len())
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }
        let column_width = width / columns as f32;

        for row in &table.children {
            let row_scope = row.attrs.style.inherit_from(&scope);
            let row_top = self.y;
            let mut row_bottom = row_top;
            for (c, cell) in row.children.iter().enumerate() {
                let cell_scope = cell.attrs.style.inherit_from(&row_scope);
                let cell_x = x + c as f32 * column_width;
                self.y = row_top + CELL_PADDING_PX;
                for child in &cell.children {
                    self.block(
                        child,
                        cell_x + CELL_PADDING_PX,
                        column_width - 2.0 * CELL_PADDING_PX,
                        &cell_scope,
                    );
                }
                row_bottom = row_bottom.max(self.y + CELL_PADDING_PX);
            }
            for c in 0..row.children.len() {
                self.items.push(Item::Frame {
                    x: x + c as f32 * column_width,
                    y: row_top,
                    w: column_width,
                    h: row_bottom - row_top,
                });
            }
            self.y = row_bottom;
        }
        self.y += self.block_spacing();
    }

    fn image(&mut self, source: &ImageSource, x: f32, width: f32) {
        let decoded = decode_data_uri(&source.src);
        let (intrinsic_w, intrinsic_h) = decoded
            .as_ref()
            .map(|img| (img.width() as f32, img.height() as f32))
            .unwrap_or((PLACEHOLDER_IMAGE_WIDTH_PX, PLACEHOLDER_IMAGE_WIDTH_PX * 0.75));

        let mut w = source.width.filter(|w| *w > 0.0).unwrap_or(intrinsic_w);
        let mut h = source
            .height
            .filter(|h| *h > 0.0)
            .unwrap_or(w * intrinsic_h / intrinsic_w.max(1.0));
        if w > width && width > 0.0 {
            h *= width / w;
            w = width;
        }

        let y = self.y;
        match decoded {
            Some(image) => self.items.push(Item::Image { x, y, w, h, image }),
            None => {
                log::debug!("Image '{}' not embedded, drawing placeholder", truncate(&source.src));
                self.items.push(Item::Frame { x, y, w, h });
            },
        }
        self.y += h + self.block_spacing();
    }

    fn text_block(&mut self, node: &DocumentNode, x: f32, width: f32, inherited: &StyleOverrides) {
        let resolver = self.ctx.resolver;
        let Some(block) = resolver.resolve_block(node, inherited) else {
            return;
        };
        let preformatted = matches!(node.kind, NodeKind::CodeBlock);

        let mut runs = Vec::new();
        for run in node.runs() {
            let Some(style) = resolver.resolve_run(&block, run) else {
                continue;
            };
            let family = match (&style.font_family, preformatted) {
                (Some(family), _) => family.clone(),
                (None, true) => MONOSPACE_FAMILY.to_string(),
                (None, false) => self.ctx.base_font_family.to_string(),
            };
            let face = self.fonts.face(&family, style.bold, style.italic);
            runs.push(StyledRun {
                text: &run.text,
                size_px: pt_to_px(style.font_size_pt),
                style,
                face,
            });
        }

        let lines = self.break_lines(&runs, width, preformatted);
        self.place_lines(&block, &runs, lines, x, width);
        self.y += block.margin_bottom_px;
    }

    fn break_lines(&self, runs: &[StyledRun<'_>], width: f32, preformatted: bool) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut line = Line::default();

        for (index, run) in runs.iter().enumerate() {
            for token in tokenize(run.text, preformatted) {
                match token {
                    Token::Break => {
                        line.trim_end();
                        lines.push(std::mem::take(&mut line));
                    },
                    Token::Space(text) => {
                        if line.fragments.is_empty() && !preformatted {
                            continue;
                        }
                        let w = fonts::text_width(run.face.as_ref(), text, run.size_px);
                        line.push(Fragment {
                            run: index,
                            text: text.to_string(),
                            width: w,
                            space: true,
                        });
                    },
                    Token::Word(text) => {
                        let w = fonts::text_width(run.face.as_ref(), text, run.size_px);
                        if !line.fragments.is_empty() && line.width + w > width && !preformatted {
                            line.trim_end();
                            lines.push(std::mem::take(&mut line));
                        }
                        line.push(Fragment {
                            run: index,
                            text: text.to_string(),
                            width: w,
                            space: false,
                        });
                    },
                }
            }
        }
        line.trim_end();
        lines.push(line);
        lines
    }

    fn place_lines(
        &mut self,
        block: &BlockStyle,
        runs: &[StyledRun<'_>],
        lines: Vec<Line>,
        x: f32,
        width: f32,
    ) {
        let block_size_px = pt_to_px(block.font_size_pt);

        for line in lines {
            let max_size = line
                .fragments
                .iter()
                .map(|f| runs[f.run].size_px)
                .fold(0.0f32, f32::max);
            let max_size = if max_size > 0.0 { max_size } else { block_size_px };
            let max_ascent = line
                .fragments
                .iter()
                .map(|f| fonts::ascent(runs[f.run].face.as_ref(), runs[f.run].size_px))
                .fold(0.0f32, f32::max);
            let line_height = max_size * LINE_HEIGHT;
            let baseline = self.y + (line_height - max_size) / 2.0 + max_ascent;

            let offset = match block.align {
                crate::model::TextAlign::Center => (width - line.width) / 2.0,
                crate::model::TextAlign::Right => width - line.width,
                _ => 0.0,
            }
            .max(0.0);

            let mut pen = x + offset;
            let mut current: Option<TextItem> = None;
            let mut current_run = usize::MAX;
            for fragment in line.fragments {
                let run = &runs[fragment.run];
                match current.as_mut() {
                    Some(item) if current_run == fragment.run => {
                        item.text.push_str(&fragment.text);
                        item.width += fragment.width;
                    },
                    _ => {
                        if let Some(done) = current.take() {
                            self.items.push(Item::Text(done));
                        }
                        current_run = fragment.run;
                        current = Some(TextItem {
                            x: pen,
                            baseline,
                            width: fragment.width,
                            text: fragment.text,
                            size_px: run.size_px,
                            rgb: run.style.rgb(),
                            underline: run.style.underline,
                            face: run.face.clone(),
                        });
                    },
                }
                pen += fragment.width;
            }
            if let Some(done) = current {
                self.items.push(Item::Text(done));
            }
            self.y += line_height;
        }
    }

    fn block_spacing(&self) -> f32 {
        self.ctx.resolver.block_spacing_px()
    }
}

#[derive(Debug, PartialEq)]
enum Token<'t> {
    Word(&'t str),
    Space(&'t str),
    Break,
}

/// Split text into words, spaces and hard breaks.
///
/// Outside preformatted text a whitespace run collapses to one space.
fn tokenize(text: &str, preformatted: bool) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (i, ch) in text.char_indices() {
        if ch == '\n' {
            if let Some(space) = in_space {
                push_token(&mut tokens, &text[start..i], space, preformatted);
            }
            tokens.push(Token::Break);
            in_space = None;
            start = i + ch.len_utf8();
            continue;
        }
        let is_space = ch.is_whitespace() && ch != '\u{a0}';
        match in_space {
            Some(space) if space == is_space => {},
            Some(space) => {
                push_token(&mut tokens, &text[start..i], space, preformatted);
                start = i;
                in_space = Some(is_space);
            },
            None => {
                start = i;
                in_space = Some(is_space);
            },
        }
    }
    if let Some(space) = in_space {
        push_token(&mut tokens, &text[start..], space, preformatted);
    }
    tokens
}

fn push_token<'t>(tokens: &mut Vec<Token<'t>>, slice: &'t str, space: bool, preformatted: bool) {
    if slice.is_empty() {
        return;
    }
    if space {
        tokens.push(Token::Space(if preformatted { slice } else { " " }));
    } else {
        tokens.push(Token::Word(slice));
    }
}

/// Decode a base64 `data:` URI image.
fn decode_data_uri(src: &str) -> Option<image::RgbaImage> {
    let rest = src.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()?;
    match image::load_from_memory(&bytes) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            log::warn!("Failed to decode embedded image: {}", e);
            None
        },
    }
}

fn truncate(src: &str) -> &str {
    match src.char_indices().nth(48) {
        Some((i, _)) => &src[..i],
        None => src,
    }
}
