use serde::{Deserialize, Serialize};

/// Opaque sRGB colour; opacity is carried separately by fills and strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB` literal.
    pub const fn hex(v: u32) -> Self {
        Self {
            r: ((v >> 16) & 0xFF) as u8,
            g: ((v >> 8) & 0xFF) as u8,
            b: (v & 0xFF) as u8,
        }
    }

    /// `#rrggbb`, as canvas fill/stroke styles expect.
    pub fn css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ── Palette ──────────────────────────────────────────────────────────────────

pub const RED: Color = Color::hex(0xef4444);
pub const AMBER: Color = Color::hex(0xf59e0b);
pub const EMERALD: Color = Color::hex(0x10b981);
pub const SLATE: Color = Color::hex(0x64748b);
pub const BACKGROUND: Color = Color::hex(0xf8fafc);
pub const HOVER_OUTLINE: Color = Color::hex(0x1d4ed8);
pub const COMPARE_OUTLINE: Color = Color::hex(0xdc2626);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_css_agree() {
        assert_eq!(RED, Color::rgb(0xef, 0x44, 0x44));
        assert_eq!(AMBER.css(), "#f59e0b");
        assert_eq!(Color::hex(0x000001).css(), "#000001");
    }
}
