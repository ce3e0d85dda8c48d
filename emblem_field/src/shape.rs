//! Built-in emblem identifiers and the particle color type.
//!
//! Each [`ShapeId`] names one fixed silhouette recipe: the glyph the
//! rasterizer draws for it, the label shown by selection surfaces, and the
//! color the field adopts when the shape is selected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed set of emblem silhouettes the field can form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeId {
    Tree,
    Santa,
    Heart,
    Flower,
    Saturn,
    Text,
    ThumbsUp,
}

/// What the rasterizer draws for a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// A single symbol drawn large and centered.
    Symbol(char),
    /// Two stacked lines of literal text.
    Lines(&'static str, &'static str),
}

impl ShapeId {
    /// Selection order used by on-screen controls and keyboard shortcuts.
    pub const ALL: [ShapeId; 7] = [
        ShapeId::Tree,
        ShapeId::Santa,
        ShapeId::Heart,
        ShapeId::Flower,
        ShapeId::Saturn,
        ShapeId::Text,
        ShapeId::ThumbsUp,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShapeId::Tree => "Tree",
            ShapeId::Santa => "Santa",
            ShapeId::Heart => "Heart",
            ShapeId::Flower => "Flower",
            ShapeId::Saturn => "Saturn",
            ShapeId::Text => "CcDesign",
            ShapeId::ThumbsUp => "Like",
        }
    }

    /// Stable upper-case identifier (`TREE`, `LIKE`, ...).
    pub fn key(self) -> &'static str {
        match self {
            ShapeId::Tree => "TREE",
            ShapeId::Santa => "SANTA",
            ShapeId::Heart => "HEART",
            ShapeId::Flower => "FLOWER",
            ShapeId::Saturn => "SATURN",
            ShapeId::Text => "TEXT",
            ShapeId::ThumbsUp => "LIKE",
        }
    }

    pub fn glyph(self) -> Glyph {
        match self {
            ShapeId::Tree => Glyph::Symbol('\u{1F384}'),
            ShapeId::Santa => Glyph::Symbol('\u{1F385}'),
            ShapeId::Heart => Glyph::Symbol('\u{2764}'),
            ShapeId::Flower => Glyph::Symbol('\u{1F338}'),
            ShapeId::Saturn => Glyph::Symbol('\u{1FA90}'),
            ShapeId::Text => Glyph::Lines("Cc", "Design"),
            ShapeId::ThumbsUp => Glyph::Symbol('\u{1F44D}'),
        }
    }

    pub fn default_color(self) -> Rgb {
        match self {
            ShapeId::Tree => Rgb::new(0x2e, 0xcc, 0x71),
            ShapeId::Santa => Rgb::new(0xe7, 0x4c, 0x3c),
            ShapeId::Heart => Rgb::new(0xe9, 0x1e, 0x63),
            ShapeId::Flower => Rgb::new(0xd5, 0x80, 0xff),
            ShapeId::Saturn => Rgb::new(0xf1, 0xc4, 0x0f),
            ShapeId::Text => Rgb::WHITE,
            ShapeId::ThumbsUp => Rgb::new(0x34, 0x98, 0xdb),
        }
    }

    /// Shape following `self` in [`ShapeId::ALL`], wrapping around.
    pub fn next(self) -> ShapeId {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        ShapeId::Tree
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown shape '{0}' (expected one of tree, santa, heart, flower, saturn, text, like)")]
pub struct ShapeParseError(pub String);

impl FromStr for ShapeId {
    type Err = ShapeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ShapeId::ALL
            .iter()
            .copied()
            .find(|shape| {
                wanted.eq_ignore_ascii_case(shape.key())
                    || wanted.eq_ignore_ascii_case(shape.label())
            })
            .or_else(|| match wanted.to_ascii_lowercase().as_str() {
                "thumbs_up" | "thumbsup" => Some(ShapeId::ThumbsUp),
                "christmas_tree" => Some(ShapeId::Tree),
                _ => None,
            })
            .ok_or_else(|| ShapeParseError(s.to_string()))
    }
}

/// Uniform particle color, 8 bits per channel in sRGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("color '{0}' must have six hex digits")]
    Length(String),
    #[error("color '{0}' contains non-hex characters")]
    Digits(String),
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(input: &str) -> Result<Self, ColorParseError> {
        let digits = input.trim().trim_start_matches('#');
        if digits.len() != 6 {
            return Err(ColorParseError::Length(input.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ColorParseError::Digits(input.to_string()))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear-light channels in `[0, 1]`, ready for an sRGB render target.
    pub fn to_linear(self) -> [f32; 3] {
        fn decode(channel: u8) -> f32 {
            let c = channel as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [decode(self.r), decode(self.g), decode(self.b)]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::WHITE
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgb::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_keys() {
        assert_eq!("heart".parse::<ShapeId>().unwrap(), ShapeId::Heart);
        assert_eq!("LIKE".parse::<ShapeId>().unwrap(), ShapeId::ThumbsUp);
        assert_eq!("CcDesign".parse::<ShapeId>().unwrap(), ShapeId::Text);
        assert_eq!("thumbs_up".parse::<ShapeId>().unwrap(), ShapeId::ThumbsUp);
        assert!("octopus".parse::<ShapeId>().is_err());
    }

    #[test]
    fn next_wraps_around() {
        assert_eq!(ShapeId::Tree.next(), ShapeId::Santa);
        assert_eq!(ShapeId::ThumbsUp.next(), ShapeId::Tree);
    }

    #[test]
    fn hex_colors_parse_with_or_without_hash() {
        assert_eq!(Rgb::from_hex("#e91e63").unwrap(), Rgb::new(0xe9, 0x1e, 0x63));
        assert_eq!(Rgb::from_hex("2ECC71").unwrap(), Rgb::new(0x2e, 0xcc, 0x71));
        assert_eq!(Rgb::new(1, 2, 255).to_hex(), "#0102ff");
    }

    #[test]
    fn bad_hex_colors_are_rejected() {
        assert!(matches!(Rgb::from_hex("#fff"), Err(ColorParseError::Length(_))));
        assert!(matches!(Rgb::from_hex("#gg0000"), Err(ColorParseError::Digits(_))));
    }

    #[test]
    fn linear_conversion_keeps_extremes() {
        assert_eq!(Rgb::new(0, 0, 0).to_linear(), [0.0, 0.0, 0.0]);
        let white = Rgb::WHITE.to_linear();
        for channel in white {
            assert!((channel - 1.0).abs() < 1e-6);
        }
    }
}
