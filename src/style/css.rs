//! Parsing of the CSS values editors store on nodes.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_HEX6: Regex = Regex::new(r"^#([0-9a-fA-F]{6})$").unwrap();
    static ref RE_HEX3: Regex = Regex::new(r"^#([0-9a-fA-F])([0-9a-fA-F])([0-9a-fA-F])$").unwrap();
    static ref RE_RGB: Regex =
        Regex::new(r"^rgb\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)$").unwrap();
    static ref RE_LENGTH: Regex =
        Regex::new(r"^(\d+(?:\.\d+)?|\.\d+)\s*(pt|px|em|rem)?$").unwrap();
}

/// Pixels per em when a length is relative and no context is known.
const DEFAULT_EM_PX: f32 = 16.0;

/// Parse a color into an uppercase `RRGGBB` string.
///
/// Only colors expressible as opaque 6-digit RGB are accepted. Named colors,
/// `rgba()`, `hsl()` and 4/8-digit hex (alpha) yield `None`.
pub fn parse_color(value: &str) -> Option<String> {
    let value = value.trim();

    if let Some(caps) = RE_HEX6.captures(value) {
        return Some(caps[1].to_ascii_uppercase());
    }

    if let Some(caps) = RE_HEX3.captures(value) {
        let mut out = String::with_capacity(6);
        for i in 1..=3 {
            let digit = caps[i].to_ascii_uppercase();
            out.push_str(&digit);
            out.push_str(&digit);
        }
        return Some(out);
    }

    if let Some(caps) = RE_RGB.captures(value) {
        let mut out = String::with_capacity(6);
        for i in 1..=3 {
            let component: u16 = caps[i].parse().ok()?;
            if component > 255 {
                return None;
            }
            out.push_str(&format!("{:02X}", component));
        }
        return Some(out);
    }

    None
}

/// Split an `RRGGBB` string into components.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Parse a font size into points.
///
/// Bare numbers are points; `px` converts at 96 dpi; `em`/`rem` scale
/// `base_pt`.
pub fn parse_font_size_pt(value: &str, base_pt: f32) -> Option<f32> {
    let caps = RE_LENGTH.captures(value.trim())?;
    let number: f32 = caps[1].parse().ok()?;
    let size = match caps.get(2).map(|m| m.as_str()) {
        None | Some("pt") => number,
        Some("px") => number * 0.75,
        Some(_) => number * base_pt,
    };
    (size > 0.0 && size.is_finite()).then_some(size)
}

/// Parse a length into CSS pixels. Bare numbers are pixels.
pub fn parse_length_px(value: &str) -> Option<f32> {
    let caps = RE_LENGTH.captures(value.trim())?;
    let number: f32 = caps[1].parse().ok()?;
    let px = match caps.get(2).map(|m| m.as_str()) {
        None | Some("px") => number,
        Some("pt") => number / 0.75,
        Some(_) => number * DEFAULT_EM_PX,
    };
    px.is_finite().then_some(px)
}

/// First family of a CSS `font-family` list, unquoted.
pub fn first_font_family(value: &str) -> Option<String> {
    let first = value.split(',').next()?.trim();
    let unquoted = first.trim_matches(|c| c == '"' || c == '\'').trim();
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

/// Split an inline `style` attribute into lowercase property/value pairs.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            (!prop.is_empty() && !value.is_empty()).then(|| (prop, value.to_string()))
        })
        .collect()
}
