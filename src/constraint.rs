//! Viewport margin constraints and their resolution to absolute insets.
//!
//! A margin is either an absolute inset in layout units or a percentage of
//! the screen dimension it runs along: top and bottom are fractions of the
//! height, left and right of the width. Margins are given per orientation.
//!
//! # Example
//!
//! ```
//! use scanport::{Constraints, ScreenGeometry};
//!
//! let geometry = ScreenGeometry::from_dimensions(500.0, 1000.0);
//! let margins = Constraints::new("10%", 0.0, "10%", 0.0)
//!     .resolve(geometry.portrait)
//!     .unwrap();
//!
//! assert_eq!(margins.top, 100.0);
//! assert_eq!(margins.bottom, 100.0);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ScanError, ScanResult};
use crate::orientation::OrientationScreen;

/// Which edge of the screen a margin insets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Margin {
    Top,
    Right,
    Bottom,
    Left,
}

impl Margin {
    /// All sides in CSS order.
    pub const ALL: [Self; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    /// Whether this margin runs along the vertical axis (its percentage is
    /// taken of the screen height).
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

impl fmt::Display for Margin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        })
    }
}

/// A single margin value.
///
/// Deserializes from either a number (`40`) or a percentage string (`"10%"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarginSpec {
    /// Absolute inset in layout units.
    Absolute(f64),
    /// Percentage of the screen dimension, e.g. `"10%"`.
    ///
    /// Only the leading integer is significant: `"12.5%"` resolves as 12%.
    Percent(String),
}

impl MarginSpec {
    /// Zero inset.
    pub const ZERO: Self = Self::Absolute(0.0);

    /// Percentage margin from a whole number of percent.
    pub fn percent(value: i64) -> Self {
        Self::Percent(format!("{value}%"))
    }

    /// Whether this margin leaves its edge uncropped.
    ///
    /// Only numeric zero and the exact string `"0%"` count.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Absolute(v) => *v == 0.0,
            Self::Percent(s) => s == "0%",
        }
    }

    /// Resolve to an absolute inset along a screen dimension of `extent`.
    pub fn resolve(&self, side: Margin, extent: f64) -> ScanResult<f64> {
        let value = match self {
            Self::Absolute(v) => *v,
            Self::Percent(s) => match leading_integer(s) {
                Some(pct) => pct as f64 / 100.0 * extent,
                None => f64::NAN,
            },
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ScanError::InvalidMargin {
                side,
                value: self.to_string(),
            })
        }
    }
}

impl Default for MarginSpec {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for MarginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(v) => write!(f, "{v}"),
            Self::Percent(s) => f.write_str(s),
        }
    }
}

impl From<f64> for MarginSpec {
    fn from(v: f64) -> Self {
        Self::Absolute(v)
    }
}

impl From<i32> for MarginSpec {
    fn from(v: i32) -> Self {
        Self::Absolute(f64::from(v))
    }
}

impl From<&str> for MarginSpec {
    fn from(s: &str) -> Self {
        Self::Percent(s.to_owned())
    }
}

impl From<String> for MarginSpec {
    fn from(s: String) -> Self {
        Self::Percent(s)
    }
}

/// Margins for one orientation (CSS order: top, right, bottom, left).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub top: MarginSpec,
    #[serde(default)]
    pub right: MarginSpec,
    #[serde(default)]
    pub bottom: MarginSpec,
    #[serde(default)]
    pub left: MarginSpec,
}

impl Constraints {
    /// Borderless: zero margin on every side.
    pub const ZERO: Self = Self {
        top: MarginSpec::ZERO,
        right: MarginSpec::ZERO,
        bottom: MarginSpec::ZERO,
        left: MarginSpec::ZERO,
    };

    /// Create constraints from the four margins.
    pub fn new(
        top: impl Into<MarginSpec>,
        right: impl Into<MarginSpec>,
        bottom: impl Into<MarginSpec>,
        left: impl Into<MarginSpec>,
    ) -> Self {
        Self {
            top: top.into(),
            right: right.into(),
            bottom: bottom.into(),
            left: left.into(),
        }
    }

    /// The margin for one side.
    pub fn get(&self, side: Margin) -> &MarginSpec {
        match side {
            Margin::Top => &self.top,
            Margin::Right => &self.right,
            Margin::Bottom => &self.bottom,
            Margin::Left => &self.left,
        }
    }

    /// Whether every side is zero.
    pub fn is_zero(&self) -> bool {
        Margin::ALL.iter().all(|&side| self.get(side).is_zero())
    }

    /// Resolve every margin to an absolute inset for the given screen.
    ///
    /// Fails on the first side whose percentage string is malformed.
    pub fn resolve(&self, screen: OrientationScreen) -> ScanResult<Margins> {
        let side = |m: Margin| {
            let extent = if m.is_vertical() {
                screen.height
            } else {
                screen.width
            };
            self.get(m).resolve(m, extent)
        };
        Ok(Margins {
            top: side(Margin::Top)?,
            right: side(Margin::Right)?,
            bottom: side(Margin::Bottom)?,
            left: side(Margin::Left)?,
        })
    }
}

/// Whether the viewport is borderless in both orientations.
pub fn is_fullscreen(portrait: &Constraints, landscape: &Constraints) -> bool {
    portrait.is_zero() && landscape.is_zero()
}

/// Resolved absolute insets for one orientation.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    /// Whether the viewport is cropped from every side at once.
    pub fn crops_all_sides(&self) -> bool {
        self.top > 0.0 && self.right > 0.0 && self.bottom > 0.0 && self.left > 0.0
    }
}

/// Parse the leading integer of a string the way lenient number parsers do:
/// optional leading whitespace, optional sign, then decimal digits. Anything
/// after the digits is ignored. `None` when there are no digits.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -value } else { value })
}
