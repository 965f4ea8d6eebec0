use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GradientError {
    #[error("a gradient needs at least 2 anchor colours, got {0}")]
    TooFewAnchors(usize),
    #[error("invalid colour {0:?}")]
    InvalidColor(String),
}

/// An RGB colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
        Rgb {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
        }
    }

    /// Lower-case `#rrggbb`, each channel rounded half away from zero.
    pub fn to_hex(&self) -> String {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
    }
}

impl FromStr for Rgb {
    type Err = GradientError;

    /// Accepts `#rrggbb` and `#rgb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || GradientError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(bad)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let channel = |digits: &str| -> Result<f64, GradientError> {
            let v = u8::from_str_radix(digits, 16).map_err(|_| bad())?;
            Ok(f64::from(v) / 255.0)
        };
        match hex.len() {
            6 => Ok(Rgb::new(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let (r, g, b) = (&hex[0..1], &hex[1..2], &hex[2..3]);
                Ok(Rgb::new(
                    channel(r.repeat(2).as_str())?,
                    channel(g.repeat(2).as_str())?,
                    channel(b.repeat(2).as_str())?,
                ))
            }
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Anchor colours spread evenly over `[0, 1]` plus the value range they
/// span. Values outside the range are clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGradient {
    anchors: Vec<Rgb>,
    min: f64,
    max: f64,
    missing: Rgb,
}

impl ColorGradient {
    pub fn new(anchors: Vec<Rgb>, min: f64, max: f64, missing: Rgb) -> Result<Self, GradientError> {
        if anchors.len() < 2 {
            return Err(GradientError::TooFewAnchors(anchors.len()));
        }
        Ok(Self {
            anchors,
            min,
            max,
            missing,
        })
    }

    /// Position of `v` in `[0, 1]`; a zero-width range maps everything to 0.
    pub fn position(&self, v: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((v - self.min) / span).clamp(0.0, 1.0)
    }

    /// Colour at position `t` in `[0, 1]`.
    pub fn at(&self, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let segments = self.anchors.len() - 1;
        let scaled = t * segments as f64;
        let i = (scaled.floor() as usize).min(segments - 1);
        Rgb::lerp(self.anchors[i], self.anchors[i + 1], scaled - i as f64)
    }

    pub fn color_for(&self, v: Option<f64>) -> Rgb {
        match v {
            Some(v) if v.is_finite() => self.at(self.position(v)),
            _ => self.missing,
        }
    }
}

/// One colour per value and the observed `[min, max]` of the non-missing
/// values, `None` when every value is missing.
#[derive(Debug, Clone)]
pub struct GradientMapping {
    pub colors: Vec<Rgb>,
    pub range: Option<(f64, f64)>,
}

impl GradientMapping {
    pub fn hex_colors(&self) -> Vec<String> {
        self.colors.iter().map(Rgb::to_hex).collect()
    }
}

pub fn map_colors(
    values: &[Option<f64>],
    anchors: &[Rgb],
    missing: Rgb,
) -> Result<GradientMapping, GradientError> {
    if anchors.len() < 2 {
        return Err(GradientError::TooFewAnchors(anchors.len()));
    }
    let present = values.iter().flatten().copied().filter(|v| v.is_finite());
    let range = present.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });

    let colors = match range {
        Some((min, max)) => {
            let gradient = ColorGradient::new(anchors.to_vec(), min, max, missing)?;
            values.iter().map(|v| gradient.color_for(*v)).collect()
        }
        // nothing to scale against
        None => vec![missing; values.len()],
    };
    Ok(GradientMapping { colors, range })
}
