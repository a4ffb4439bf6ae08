//! Colors with lazily computed RGB and HSL channels.
//!
//! A color is created from either channel set; the other one is computed on
//! first access and cached. RGB channels built from RGB input are truncated
//! to integers, RGB channels derived from HSL are rounded.

use std::{cell::OnceCell, fmt};

use crate::{error::ValueError, style::OutputStyle};

use super::number::{Number, format_number};

/// The sixteen HTML4 color keywords.
const HTML4_COLORS: [(&str, [u8; 3]); 16] = [
    ("black", [0, 0, 0]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("white", [255, 255, 255]),
    ("maroon", [128, 0, 0]),
    ("red", [255, 0, 0]),
    ("purple", [128, 0, 128]),
    ("fuchsia", [255, 0, 255]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("olive", [128, 128, 0]),
    ("yellow", [255, 255, 0]),
    ("navy", [0, 0, 128]),
    ("blue", [0, 0, 255]),
    ("teal", [0, 128, 128]),
    ("aqua", [0, 255, 255]),
];

/// A SassScript color.
#[derive(Debug, Clone)]
pub struct Color {
    rgb: OnceCell<[f64; 3]>,
    hsl: OnceCell<[f64; 3]>,
    alpha: f64,
    original: Option<String>,
}

impl Color {
    /// Build a color from red, green and blue channels in `0..=255`.
    ///
    /// Channels are clamped and truncated to integers.
    pub fn from_rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        let channel = |c: f64| c.clamp(0.0, 255.0).trunc();
        Self {
            rgb: OnceCell::from([channel(red), channel(green), channel(blue)]),
            hsl: OnceCell::new(),
            alpha: alpha.clamp(0.0, 1.0),
            original: None,
        }
    }

    /// Build a color from hue (degrees), saturation and lightness (percent).
    pub fn from_hsla(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Self {
        Self {
            rgb: OnceCell::new(),
            hsl: OnceCell::from([
                hue.rem_euclid(360.0),
                saturation.clamp(0.0, 100.0),
                lightness.clamp(0.0, 100.0),
            ]),
            alpha: alpha.clamp(0.0, 1.0),
            original: None,
        }
    }

    /// Parse `#rgb` or `#rrggbb`. The `#` is optional.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#').unwrap_or(text);
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
        Some(
            Self::from_rgba(f64::from(r), f64::from(g), f64::from(b), 1.0)
                .with_original(text.to_string()),
        )
    }

    /// Look up an HTML4 color keyword, case-insensitively.
    pub fn named(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        HTML4_COLORS
            .iter()
            .find(|(keyword, _)| *keyword == lower)
            .map(|(_, [r, g, b])| {
                Self::from_rgba(f64::from(*r), f64::from(*g), f64::from(*b), 1.0)
                    .with_original(name.to_string())
            })
    }

    /// Keep the source spelling of a literal color for output.
    pub fn with_original(mut self, original: String) -> Self {
        self.original = Some(original);
        self
    }

    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn rgb(&self) -> [f64; 3] {
        *self.rgb.get_or_init(|| {
            let [h, s, l] = self.hsl();
            hsl_to_rgb(h, s, l)
        })
    }

    pub fn hsl(&self) -> [f64; 3] {
        *self.hsl.get_or_init(|| {
            let [r, g, b] = self.rgb();
            rgb_to_hsl(r, g, b)
        })
    }

    pub fn red(&self) -> f64 {
        self.rgb()[0]
    }

    pub fn green(&self) -> f64 {
        self.rgb()[1]
    }

    pub fn blue(&self) -> f64 {
        self.rgb()[2]
    }

    pub fn hue(&self) -> f64 {
        self.hsl()[0]
    }

    pub fn saturation(&self) -> f64 {
        self.hsl()[1]
    }

    pub fn lightness(&self) -> f64 {
        self.hsl()[2]
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Whether the color is partially transparent.
    pub fn has_alpha(&self) -> bool {
        self.alpha < 1.0
    }

    /// A copy with different RGB channels and the same alpha.
    pub fn with_rgb(&self, red: f64, green: f64, blue: f64) -> Self {
        Self::from_rgba(red, green, blue, self.alpha)
    }

    /// A copy with different HSL channels and the same alpha.
    pub fn with_hsl(&self, hue: f64, saturation: f64, lightness: f64) -> Self {
        Self::from_hsla(hue, saturation, lightness, self.alpha)
    }

    /// A copy with a different alpha channel.
    pub fn with_alpha(&self, alpha: f64) -> Self {
        let [r, g, b] = self.rgb();
        Self::from_rgba(r, g, b, alpha)
    }

    pub fn plus(&self, other: &ColorOperand<'_>) -> Result<Self, ValueError> {
        self.piecewise(other, "+", |a, b| a + b)
    }

    pub fn minus(&self, other: &ColorOperand<'_>) -> Result<Self, ValueError> {
        self.piecewise(other, "-", |a, b| a - b)
    }

    pub fn times(&self, other: &ColorOperand<'_>) -> Result<Self, ValueError> {
        self.piecewise(other, "*", |a, b| a * b)
    }

    pub fn div(&self, other: &ColorOperand<'_>) -> Result<Self, ValueError> {
        self.piecewise(other, "/", |a, b| a / b)
    }

    pub fn modulo(&self, other: &ColorOperand<'_>) -> Result<Self, ValueError> {
        self.piecewise(other, "%", |a, b| a.rem_euclid(b))
    }

    /// Equal RGB channels and alpha.
    pub fn sass_eq(&self, other: &Color) -> bool {
        self.rgb() == other.rgb() && self.alpha == other.alpha
    }

    /// Text written to CSS.
    ///
    /// Literal colors keep their source spelling except in compressed
    /// output, which picks the shortest equivalent form.
    pub fn to_css(&self, style: OutputStyle) -> String {
        if self.has_alpha() {
            return self.rgba_string(style);
        }
        if style.is_compressed() {
            return self.smallest();
        }
        if let Some(original) = &self.original {
            return original.clone();
        }
        self.name().map_or_else(|| self.hex_string(), str::to_string)
    }

    /// `#rrggbb`.
    pub fn hex_string(&self) -> String {
        let [r, g, b] = self.rgb();
        format!("#{:02x}{:02x}{:02x}", r as u8, g as u8, b as u8)
    }

    fn name(&self) -> Option<&'static str> {
        let rgb = self.rgb();
        HTML4_COLORS
            .iter()
            .find(|(_, channels)| channels.map(f64::from) == rgb)
            .map(|(name, _)| *name)
    }

    fn smallest(&self) -> String {
        let hex = self.hex_string();
        let bytes = hex.as_bytes();
        let short = if bytes[1] == bytes[2] && bytes[3] == bytes[4] && bytes[5] == bytes[6] {
            format!("#{}{}{}", &hex[1..2], &hex[3..4], &hex[5..6])
        } else {
            hex
        };
        match self.name() {
            Some(name) if name.len() <= short.len() => name.to_string(),
            _ => short,
        }
    }

    fn rgba_string(&self, style: OutputStyle) -> String {
        let [r, g, b] = self.rgb();
        let separator = style.comma_separator();
        format!(
            "rgba({}{separator}{}{separator}{}{separator}{})",
            format_number(r),
            format_number(g),
            format_number(b),
            format_number(self.alpha)
        )
    }

    fn piecewise(
        &self,
        other: &ColorOperand<'_>,
        op: &'static str,
        apply: impl Fn(f64, f64) -> f64,
    ) -> Result<Self, ValueError> {
        let rgb = self.rgb();
        let channels: [f64; 3] = match other {
            ColorOperand::Number(number) => {
                if !number.is_unitless() {
                    return Err(ValueError::UnitsWithColor {
                        number: number.inspect(),
                        color: self.to_css(OutputStyle::Nested),
                    });
                }
                rgb.map(|channel| apply(channel, number.value()))
            }
            ColorOperand::Color(color) => {
                if color.alpha != self.alpha {
                    return Err(ValueError::AlphaMismatch {
                        left: self.to_css(OutputStyle::Nested),
                        op,
                        right: color.to_css(OutputStyle::Nested),
                    });
                }
                let theirs = color.rgb();
                [0, 1, 2].map(|i| apply(rgb[i], theirs[i]))
            }
        };
        Ok(self.with_rgb(channels[0], channels[1], channels[2]))
    }
}

/// Right-hand side of piecewise color arithmetic.
#[derive(Debug, Clone, Copy)]
pub enum ColorOperand<'a> {
    Number(&'a Number),
    Color(&'a Color),
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.sass_eq(other)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(OutputStyle::Nested))
    }
}

fn rgb_to_hsl(red: f64, green: f64, blue: f64) -> [f64; 3] {
    let (r, g, b) = (red / 255.0, green / 255.0, blue / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if max == min {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        60.0 * (b - r) / delta + 120.0
    } else {
        60.0 * (r - g) / delta + 240.0
    };

    let lightness = (max + min) / 2.0;
    let saturation = if max == min {
        0.0
    } else if lightness < 0.5 {
        delta / (2.0 * lightness)
    } else {
        delta / (2.0 - 2.0 * lightness)
    };

    [hue.rem_euclid(360.0), saturation * 100.0, lightness * 100.0]
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [f64; 3] {
    let h = hue / 360.0;
    let s = saturation / 100.0;
    let l = lightness / 100.0;
    let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
    let m1 = l * 2.0 - m2;
    [h + 1.0 / 3.0, h, h - 1.0 / 3.0].map(|t| (hue_to_rgb(m1, m2, t) * 255.0).round())
}

fn hue_to_rgb(m1: f64, m2: f64, mut h: f64) -> f64 {
    if h < 0.0 {
        h += 1.0;
    }
    if h > 1.0 {
        h -= 1.0;
    }
    if h * 6.0 < 1.0 {
        m1 + (m2 - m1) * h * 6.0
    } else if h * 2.0 < 1.0 {
        m2
    } else if h * 3.0 < 2.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
    } else {
        m1
    }
}
