//! Document tree nodes.

use super::attrs::{BlockAttrs, Marks, StyleOverrides, TextAlign};

/// A run of text with its marks and inline style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRun {
    /// Text content; may contain `\n` for hard breaks
    pub text: String,
    /// Bold/italic/underline
    pub marks: Marks,
    /// Inline style overrides
    pub style: StyleOverrides,
}

impl TextRun {
    /// Create an unstyled run.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Mark the run bold.
    pub fn bold(mut self) -> Self {
        self.marks.bold = true;
        self
    }

    /// Mark the run italic.
    pub fn italic(mut self) -> Self {
        self.marks.italic = true;
        self
    }

    /// Mark the run underlined.
    pub fn underline(mut self) -> Self {
        self.marks.underline = true;
        self
    }

    /// Set the run color.
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.style.color = Some(color.into());
        self
    }

    /// Set the run font size.
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.style.font_size = Some(size.into());
        self
    }

    /// Set the run font family.
    pub fn font(mut self, family: impl Into<String>) -> Self {
        self.style.font_family = Some(family.into());
        self
    }
}

/// An image reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSource {
    /// `src` as given by the editor (URL or `data:` URI)
    pub src: String,
    /// Alternative text
    pub alt: Option<String>,
    /// Declared width in CSS pixels
    pub width: Option<f32>,
    /// Declared height in CSS pixels
    pub height: Option<f32>,
}

/// Node kinds of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Heading; the level is kept as read, even when outside 1..=6
    Heading {
        /// Heading level
        level: u8,
    },
    /// Paragraph
    Paragraph,
    /// Preformatted block; lines are split on `\n`
    CodeBlock,
    /// Quoted block container
    Blockquote,
    /// Unordered list
    BulletList,
    /// Ordered list
    OrderedList {
        /// First ordinal
        start: u32,
    },
    /// List item
    ListItem,
    /// Table
    Table,
    /// Table row
    TableRow,
    /// Table cell
    TableCell {
        /// Header cell (`th`)
        header: bool,
    },
    /// Image
    Image(ImageSource),
    /// Text run (leaf)
    Text(TextRun),
}

/// A node of the document tree. Children are owned, so every node has
/// exactly one parent and the tree cannot contain cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    /// What the node is
    pub kind: NodeKind,
    /// Block attributes (ignored on text runs)
    pub attrs: BlockAttrs,
    /// Child nodes in order
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    /// Create a node with no attributes and no children.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: BlockAttrs::default(),
            children: Vec::new(),
        }
    }

    /// Heading with a single plain run.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(NodeKind::Heading { level }).with_child(Self::text(TextRun::new(text)))
    }

    /// Paragraph with a single plain run.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::paragraph_runs(vec![TextRun::new(text)])
    }

    /// Paragraph made of the given runs.
    pub fn paragraph_runs(runs: Vec<TextRun>) -> Self {
        Self::new(NodeKind::Paragraph).with_children(runs.into_iter().map(Self::text).collect())
    }

    /// Preformatted block.
    pub fn code_block(text: impl Into<String>) -> Self {
        Self::new(NodeKind::CodeBlock).with_child(Self::text(TextRun::new(text)))
    }

    /// Bullet list whose items each hold one paragraph.
    pub fn bullet_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(NodeKind::BulletList).with_children(Self::list_items(items))
    }

    /// Ordered list starting at 1 whose items each hold one paragraph.
    pub fn ordered_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(NodeKind::OrderedList { start: 1 }).with_children(Self::list_items(items))
    }

    fn list_items<I, S>(items: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        items
            .into_iter()
            .map(|item| Self::new(NodeKind::ListItem).with_child(Self::paragraph(item)))
            .collect()
    }

    /// Text leaf.
    pub fn text(run: TextRun) -> Self {
        Self::new(NodeKind::Text(run))
    }

    /// Image leaf.
    pub fn image(source: ImageSource) -> Self {
        Self::new(NodeKind::Image(source))
    }

    /// Append a child.
    pub fn with_child(mut self, child: DocumentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append children.
    pub fn with_children(mut self, children: Vec<DocumentNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Set explicit alignment.
    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.attrs.align = Some(align);
        self
    }

    /// Set explicit bottom margin in CSS pixels.
    pub fn with_margin_bottom(mut self, px: f32) -> Self {
        self.attrs.margin_bottom = Some(px);
        self
    }

    /// Set block-level style overrides.
    pub fn with_style(mut self, style: StyleOverrides) -> Self {
        self.attrs.style = style;
        self
    }

    /// Heading level, if this is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            NodeKind::Heading { level } => Some(level),
            _ => None,
        }
    }

    /// Whether the node is a block whose children are inline runs.
    pub fn is_text_block(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Heading { .. } | NodeKind::Paragraph | NodeKind::CodeBlock
        )
    }

    /// Runs directly under this node, in order.
    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.children.iter().filter_map(|child| match &child.kind {
            NodeKind::Text(run) => Some(run),
            _ => None,
        })
    }

    /// Concatenated text of the subtree.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let NodeKind::Text(run) = &self.kind {
            out.push_str(&run.text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Number of nodes in the subtree, this node included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DocumentNode::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_keeps_invalid_level() {
        let node = DocumentNode::heading(7, "Too deep");
        assert_eq!(node.heading_level(), Some(7));
        assert!(node.is_text_block());
    }

    #[test]
    fn test_runs_and_plain_text() {
        let node = DocumentNode::paragraph_runs(vec![
            TextRun::new("Scope of "),
            TextRun::new("work").bold(),
        ]);
        assert_eq!(node.runs().count(), 2);
        assert_eq!(node.plain_text(), "Scope of work");
    }

    #[test]
    fn test_list_builder() {
        let list = DocumentNode::bullet_list(["one", "two", "three"]);
        assert_eq!(list.children.len(), 3);
        assert!(matches!(list.children[0].kind, NodeKind::ListItem));
        assert_eq!(list.plain_text(), "onetwothree");
        // list + 3 items + 3 paragraphs + 3 runs
        assert_eq!(list.node_count(), 10);
    }
}
