//! Hex color parsing and the fixed group palette.

use egui::Color32;

use crate::model::GroupColor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("not a 3 or 6 digit hex color: {0:?}")]
    InvalidHex(String),
}

/// Normalize `abc`, `#abc`, `aabbcc` or `#AABBCC` to `#AABBCC`.
///
/// # Errors
/// Anything that is not 3 or 6 hex digits (with an optional leading `#`).
pub fn normalize_hex_rgb(input: &str) -> Result<String, ColorError> {
    let digits = input.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(input.to_owned()));
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_owned(),
        _ => return Err(ColorError::InvalidHex(input.to_owned())),
    };

    Ok(format!("#{}", expanded.to_ascii_uppercase()))
}

/// Parse a 3 or 6 digit hex color.
///
/// # Errors
/// See [`normalize_hex_rgb`].
pub fn parse_hex_rgb(input: &str) -> Result<Color32, ColorError> {
    let normalized = normalize_hex_rgb(input)?;
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&normalized[range], 16)
            .map_err(|_err| ColorError::InvalidHex(input.to_owned()))
    };
    Ok(Color32::from_rgb(channel(1..3)?, channel(3..5)?, channel(5..7)?))
}

/// `hex_to_rgba("#FF0000", 1.0) == "rgba(255, 0, 0, 1)"`.
///
/// # Errors
/// See [`normalize_hex_rgb`].
pub fn hex_to_rgba(input: &str, alpha: f32) -> Result<String, ColorError> {
    let color = parse_hex_rgb(input)?;
    Ok(format!(
        "rgba({}, {}, {}, {alpha})",
        color.r(),
        color.g(),
        color.b()
    ))
}

/// Like [`parse_hex_rgb`], but falls back to `fallback` and logs on bad input.
pub fn parse_hex_or(input: &str, fallback: Color32) -> Color32 {
    parse_hex_rgb(input).unwrap_or_else(|err| {
        log::warn!("{err}; using fallback color");
        fallback
    })
}

/// Fixed palette for the browser's group colors.
pub fn group_color(color: GroupColor) -> Color32 {
    match color {
        GroupColor::Grey => Color32::from_rgb(0x5F, 0x63, 0x68),
        GroupColor::Blue => Color32::from_rgb(0x1A, 0x73, 0xE8),
        GroupColor::Red => Color32::from_rgb(0xD9, 0x30, 0x25),
        GroupColor::Yellow => Color32::from_rgb(0xF9, 0xAB, 0x00),
        GroupColor::Green => Color32::from_rgb(0x1E, 0x8E, 0x3E),
        GroupColor::Pink => Color32::from_rgb(0xD0, 0x18, 0x84),
        GroupColor::Purple => Color32::from_rgb(0xA1, 0x42, 0xF4),
        GroupColor::Cyan => Color32::from_rgb(0x00, 0x7B, 0x83),
        GroupColor::Orange => Color32::from_rgb(0xFA, 0x90, 0x3E),
    }
}

/// Header fill plus the top/bottom stops of the content gradient of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupPaint {
    pub header: Color32,
    pub content_top: Color32,
    pub content_bottom: Color32,
}

impl GroupPaint {
    pub fn for_color(color: GroupColor) -> Self {
        let base = group_color(color);
        Self {
            header: base,
            content_top: Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), 96),
            content_bottom: Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), 16),
        }
    }
}
