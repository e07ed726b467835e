//! Per-regime colour tables.

use serde::{Deserialize, Serialize};

use crate::constants::clamp01;
use crate::mode::Regime;

/// Linear RGB colour with channels in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn scale(self, k: f64) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k)
    }

    pub fn clamped(self) -> Self {
        Self::new(clamp01(self.r), clamp01(self.g), clamp01(self.b))
    }

    /// Quantize to 8-bit channels, truncating.
    pub fn to_rgb8(self) -> [u8; 3] {
        let c = self.clamped();
        [
            (c.r * 255.0) as u8,
            (c.g * 255.0) as u8,
            (c.b * 255.0) as u8,
        ]
    }

    pub fn from_rgb8(px: [u8; 3]) -> Self {
        Self::new(
            f64::from(px[0]) / 255.0,
            f64::from(px[1]) / 255.0,
            f64::from(px[2]) / 255.0,
        )
    }
}

impl std::ops::Add for Color {
    type Output = Color;

    fn add(self, o: Color) -> Color {
        Color::new(self.r + o.r, self.g + o.g, self.b + o.b)
    }
}

/// Colours for one frame: field base, graph edges, graph nodes and the
/// ice highlight added on top of the field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub base: Color,
    pub edge: Color,
    pub node: Color,
    pub ice: Color,
}

impl Palette {
    pub const BASE: Palette = Palette {
        base: Color::new(0.12, 0.82, 0.95),
        edge: Color::new(0.20, 0.75, 1.00),
        node: Color::new(0.20, 0.95, 0.95),
        ice: Color::new(0.65, 0.85, 1.00),
    };

    /// Palette for `regime`, with the base colour brightened by H.
    pub fn for_regime(regime: Regime, h: f64) -> Self {
        let mut pal = Self::BASE;
        match regime {
            Regime::Ice => {
                pal.base = Color::new(0.08, 0.55, 0.85);
                pal.edge = Color::new(0.35, 0.70, 1.00);
            }
            Regime::Water => {
                pal.base = Color::new(0.10, 0.78, 0.95);
            }
            Regime::Aurora => {
                pal.base = Color::new(0.16, 0.92, 1.00);
                pal.node.g = 1.0;
            }
        }
        pal.base = pal.base.scale(0.92 + h * 0.18);
        pal
    }
}
