//! Font lookup and metrics for the raster backend.
//!
//! Faces are located through `fontdb` and parsed with `ttf-parser`. When no
//! face is available (no system fonts, or an empty book) every character
//! advances by a fixed fraction of the em and is painted as a box, so
//! layout stays deterministic.

use std::collections::HashMap;
use std::sync::Arc;

/// Advance of a fallback glyph, in ems.
const FALLBACK_ADVANCE_EM: f32 = 0.5;
/// Advance of a fallback space, in ems.
const FALLBACK_SPACE_EM: f32 = 0.25;
/// Ascent of fallback metrics, in ems.
const FALLBACK_ASCENT_EM: f32 = 0.8;

/// Shared bytes of a loaded face.
#[derive(Debug, Clone)]
pub struct FaceData {
    data: Arc<Vec<u8>>,
    index: u32,
}

impl FaceData {
    /// Parse the face. Returns `None` if the data is not a usable font.
    pub fn parse(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.index).ok()
    }
}

/// Font database with a face cache.
pub struct FontBook {
    db: fontdb::Database,
    faces: HashMap<fontdb::ID, FaceData>,
    lookups: HashMap<(String, bool, bool), Option<FaceData>>,
}

impl FontBook {
    /// Book backed by the fonts installed on the system.
    pub fn system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("Loaded {} system font faces", db.len());
        Self::with_database(db)
    }

    /// Book without fonts; all text uses fallback metrics.
    pub fn empty() -> Self {
        Self::with_database(fontdb::Database::new())
    }

    /// Book backed by a prepared database.
    pub fn with_database(db: fontdb::Database) -> Self {
        Self {
            db,
            faces: HashMap::new(),
            lookups: HashMap::new(),
        }
    }

    /// Number of faces known to the book.
    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Find a face for a family and style, falling back to a generic family.
    pub fn face(&mut self, family: &str, bold: bool, italic: bool) -> Option<FaceData> {
        let key = (family.to_ascii_lowercase(), bold, italic);
        if let Some(found) = self.lookups.get(&key) {
            return found.clone();
        }

        let generic = if key.0.contains("mono") || key.0.contains("courier") {
            fontdb::Family::Monospace
        } else if key.0.contains("times") || (key.0.contains("serif") && !key.0.contains("sans")) {
            fontdb::Family::Serif
        } else {
            fontdb::Family::SansSerif
        };
        let families = [fontdb::Family::Name(family), generic];
        let query = fontdb::Query {
            families: &families,
            weight: if bold {
                fontdb::Weight::BOLD
            } else {
                fontdb::Weight::NORMAL
            },
            stretch: fontdb::Stretch::Normal,
            style: if italic {
                fontdb::Style::Italic
            } else {
                fontdb::Style::Normal
            },
        };

        let found = self.db.query(&query).and_then(|id| self.load(id));
        if found.is_none() && !self.db.is_empty() {
            log::debug!("No face for '{}' (bold={}, italic={})", family, bold, italic);
        }
        self.lookups.insert(key, found.clone());
        found
    }

    fn load(&mut self, id: fontdb::ID) -> Option<FaceData> {
        if let Some(face) = self.faces.get(&id) {
            return Some(face.clone());
        }
        let face = self
            .db
            .with_face_data(id, |data, index| FaceData {
                data: Arc::new(data.to_vec()),
                index,
            })?;
        // Reject faces ttf-parser cannot read so callers only see usable data
        face.parse()?;
        self.faces.insert(id, face.clone());
        Some(face)
    }
}

/// Width of `text` at `size_px`.
pub fn text_width(face: Option<&FaceData>, text: &str, size_px: f32) -> f32 {
    match face.and_then(FaceData::parse) {
        Some(parsed) => {
            let scale = size_px / f32::from(parsed.units_per_em());
            text.chars()
                .map(|ch| {
                    parsed
                        .glyph_index(ch)
                        .and_then(|gid| parsed.glyph_hor_advance(gid))
                        .map(|adv| f32::from(adv) * scale)
                        .unwrap_or_else(|| fallback_advance(ch, size_px))
                })
                .sum()
        },
        None => text.chars().map(|ch| fallback_advance(ch, size_px)).sum(),
    }
}

/// Ascent of the face at `size_px`.
pub fn ascent(face: Option<&FaceData>, size_px: f32) -> f32 {
    match face.and_then(FaceData::parse) {
        Some(parsed) => {
            f32::from(parsed.ascender()) * size_px / f32::from(parsed.units_per_em())
        },
        None => FALLBACK_ASCENT_EM * size_px,
    }
}

/// Advance of one character with fallback metrics.
pub fn fallback_advance(ch: char, size_px: f32) -> f32 {
    if ch.is_whitespace() {
        FALLBACK_SPACE_EM * size_px
    } else {
        FALLBACK_ADVANCE_EM * size_px
    }
}
