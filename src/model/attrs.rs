//! Attributes carried by document nodes.
//!
//! Style values are stored the way the editor produced them (`"14pt"`,
//! `"#1f4e79"`, `"rgb(31, 78, 121)"`). Interpretation happens in
//! [`crate::style`], so a snapshot can be exported with different defaults
//! without being re-read.

use serde::{Deserialize, Serialize};

/// Horizontal alignment of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left-aligned (default)
    #[default]
    Left,
    /// Centered
    Center,
    /// Right-aligned
    Right,
    /// Justified
    Justify,
}

impl TextAlign {
    /// Parse a CSS `text-align` value. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" | "end" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

/// Boolean text marks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marks {
    /// Bold
    pub bold: bool,
    /// Italic
    pub italic: bool,
    /// Underline
    pub underline: bool,
}

impl Marks {
    /// Combine with marks from an enclosing element.
    pub fn merge(self, outer: Marks) -> Marks {
        Marks {
            bold: self.bold || outer.bold,
            italic: self.italic || outer.italic,
            underline: self.underline || outer.underline,
        }
    }
}

/// Inheritable style overrides, stored unparsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleOverrides {
    /// Font family (first family of a CSS list is used)
    pub font_family: Option<String>,
    /// Font size (`"14pt"`, `"18px"`, `"12"`)
    pub font_size: Option<String>,
    /// Text color (`"#RRGGBB"`, `"#RGB"`, `"rgb(r, g, b)"`)
    pub color: Option<String>,
}

impl StyleOverrides {
    /// Returns true if no override is set.
    pub fn is_empty(&self) -> bool {
        self.font_family.is_none() && self.font_size.is_none() && self.color.is_none()
    }

    /// Fill unset fields from an enclosing scope.
    pub fn inherit_from(&self, outer: &StyleOverrides) -> StyleOverrides {
        StyleOverrides {
            font_family: self.font_family.clone().or_else(|| outer.font_family.clone()),
            font_size: self.font_size.clone().or_else(|| outer.font_size.clone()),
            color: self.color.clone().or_else(|| outer.color.clone()),
        }
    }
}

/// Attributes of a block-level node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockAttrs {
    /// Explicit alignment
    pub align: Option<TextAlign>,
    /// Explicit bottom margin in CSS pixels
    pub margin_bottom: Option<f32>,
    /// Style inherited by the runs of this block
    pub style: StyleOverrides,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_align_parse() {
        assert_eq!(TextAlign::parse("center"), Some(TextAlign::Center));
        assert_eq!(TextAlign::parse(" Justify "), Some(TextAlign::Justify));
        assert_eq!(TextAlign::parse("end"), Some(TextAlign::Right));
        assert_eq!(TextAlign::parse("middle"), None);
    }

    #[test]
    fn test_marks_merge() {
        let inner = Marks {
            bold: true,
            ..Default::default()
        };
        let outer = Marks {
            italic: true,
            ..Default::default()
        };
        let merged = inner.merge(outer);
        assert!(merged.bold && merged.italic && !merged.underline);
    }

    #[test]
    fn test_overrides_inherit() {
        let outer = StyleOverrides {
            font_family: Some("Georgia".into()),
            color: Some("#112233".into()),
            ..Default::default()
        };
        let inner = StyleOverrides {
            color: Some("#ff0000".into()),
            ..Default::default()
        };
        let merged = inner.inherit_from(&outer);
        assert_eq!(merged.font_family.as_deref(), Some("Georgia"));
        assert_eq!(merged.color.as_deref(), Some("#ff0000"));
        assert!(merged.font_size.is_none());
    }
}
