//! Per-author marker colors.
//!
//! A backend-assigned color always wins. Without one, the hue is derived from the
//! owner id; distinct ids may share a hue.

use std::fmt;

use shared::domain::UserId;

pub const FALLBACK_SATURATION: u8 = 70;
pub const FALLBACK_LIGHTNESS: u8 = 50;
const TINT_LIGHTNESS: u8 = 65;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerColor {
    Assigned(String),
    Hsl {
        hue: u16,
        saturation: u8,
        lightness: u8,
    },
}

impl MarkerColor {
    /// Lighter shade used for marker gradients. Backend colors are opaque strings and
    /// have no derived tint.
    pub fn tint(&self) -> Option<MarkerColor> {
        match self {
            Self::Assigned(_) => None,
            Self::Hsl {
                hue, saturation, ..
            } => Some(Self::Hsl {
                hue: *hue,
                saturation: *saturation,
                lightness: TINT_LIGHTNESS,
            }),
        }
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assigned(value) => f.write_str(value),
            Self::Hsl {
                hue,
                saturation,
                lightness,
            } => write!(f, "hsl({hue}, {saturation}%, {lightness}%)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserColorAssigner;

impl UserColorAssigner {
    pub fn color(&self, owner_id: &UserId, provided: Option<&str>) -> MarkerColor {
        match provided.filter(|c| !c.trim().is_empty()) {
            Some(color) => MarkerColor::Assigned(color.to_string()),
            None => MarkerColor::Hsl {
                hue: fallback_hue(owner_id.as_str()),
                saturation: FALLBACK_SATURATION,
                lightness: FALLBACK_LIGHTNESS,
            },
        }
    }
}

/// `hash = c + (hash << 5) - hash` over UTF-16 code units, with the shift
/// performed on the 32-bit truncation of the running value.
pub fn fallback_hue(owner_id: &str) -> u16 {
    let mut hash: i64 = 0;
    for unit in owner_id.encode_utf16() {
        let shifted = i64::from((hash as i32).wrapping_shl(5));
        hash = i64::from(unit).wrapping_add(shifted.wrapping_sub(hash));
    }
    (hash % 360).unsigned_abs() as u16
}

#[cfg(test)]
#[path = "tests/color_tests.rs"]
mod tests;
