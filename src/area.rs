//! Active scanning areas in normalized frame coordinates.
//!
//! Margins shrink the visible viewport; the area in which the decoder looks
//! for codes is shrunk with it so that codes outside the visible part of the
//! camera frame are not picked up. All rectangles here live in `[0,1]²`
//! relative to the full camera frame and are centred, because margins are
//! applied symmetrically by the native view.
//!
//! # Example
//!
//! ```
//! use scanport::{Constraints, NormalizedRect, ScanAreaState, ScreenGeometry};
//!
//! let geometry = ScreenGeometry::from_dimensions(500.0, 1000.0);
//! let top_half_cropped = Constraints::new("10%", 0.0, "10%", 0.0);
//!
//! let mut state = ScanAreaState::default();
//! state
//!     .clamp(&top_half_cropped, &Constraints::ZERO, &geometry)
//!     .unwrap();
//!
//! assert!((state.active_portrait.height - 0.8).abs() < 1e-9);
//! assert!((state.active_portrait.y - 0.1).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constraint::{Constraints, Margins};
use crate::error::{ScanError, ScanResult};
use crate::orientation::{OrientationScreen, ScreenGeometry, ScreenOrientation};

/// A rectangle as fractions of the camera frame.
///
/// Consumers assume `x + width <= 1` and `y + height <= 1`; the resolver
/// produces such rectangles for sane margins but does not enforce it.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    /// The whole frame.
    pub const FULL: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    /// Centre third of the frame, used for direct part marking.
    pub const DPM: Self = Self::new(0.33, 0.33, 0.33, 0.33);

    /// Create a new rect.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rect of the given size centred in the frame.
    pub fn centered(width: f64, height: f64) -> Self {
        Self::new((1.0 - width) / 2.0, (1.0 - height) / 2.0, width, height)
    }

    /// A rect of the given size positioned relative to a hot spot.
    ///
    /// The hot spot is both the anchor point in the frame and the relative
    /// position of that anchor within the rect, so `(0.5, 0.5)` centres it,
    /// `(0, 0)` pins it top-left and `(1, 1)` pins it bottom-right.
    pub fn around_hot_spot(hot_x: f64, hot_y: f64, width: f64, height: f64) -> Self {
        Self::new(hot_x - width * hot_x, hot_y - height * hot_y, width, height)
    }

    /// Visible viewport for the given insets on a screen.
    ///
    /// Margins are assumed symmetric, so the result is centred.
    pub fn from_margins(margins: &Margins, screen: OrientationScreen) -> Self {
        let width = (screen.width - margins.left - margins.right) / screen.width;
        let height = (screen.height - margins.top - margins.bottom) / screen.height;
        Self::centered(width, height)
    }

    /// Whether this rect covers the whole frame.
    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }
}

impl Default for NormalizedRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Active and maximum scanning areas for both orientations.
///
/// `max_*` records the widest area the current margins permit while the
/// active area is deliberately smaller, so a caller can offer to grow into it.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanAreaState {
    /// Manual restriction; while set, margin changes never resize the area.
    pub restricted: bool,
    pub active_portrait: NormalizedRect,
    pub active_landscape: NormalizedRect,
    pub max_portrait: NormalizedRect,
    pub max_landscape: NormalizedRect,
}

impl Default for ScanAreaState {
    fn default() -> Self {
        Self {
            restricted: false,
            active_portrait: NormalizedRect::FULL,
            active_landscape: NormalizedRect::FULL,
            max_portrait: NormalizedRect::FULL,
            max_landscape: NormalizedRect::FULL,
        }
    }
}

/// Viewport rects computed from one pair of constraint sets.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResolvedAreas {
    pub portrait: NormalizedRect,
    pub landscape: NormalizedRect,
    /// Some orientation was cropped from all four sides and both rects fell
    /// back to the full frame.
    pub forced: bool,
}

impl ResolvedAreas {
    /// Compute viewport rects for both orientations.
    ///
    /// A configuration that crops every side of either orientation cannot be
    /// expressed as a centred rect; it resolves to the full frame in both
    /// orientations with `forced` set.
    pub fn resolve(
        portrait: &Constraints,
        landscape: &Constraints,
        geometry: &ScreenGeometry,
    ) -> ScanResult<Self> {
        for orientation in ScreenOrientation::ALL {
            let screen = geometry.screen(orientation);
            if !screen.is_valid() {
                return Err(ScanError::ZeroScreenDimension {
                    width: screen.width,
                    height: screen.height,
                });
            }
        }

        let pm = portrait.resolve(geometry.portrait)?;
        let lm = landscape.resolve(geometry.landscape)?;

        if pm.crops_all_sides() || lm.crops_all_sides() {
            warn!(
                ?portrait,
                ?landscape,
                "Viewport cropped from all four sides; falling back to full-frame scanning area"
            );
            return Ok(Self {
                portrait: NormalizedRect::FULL,
                landscape: NormalizedRect::FULL,
                forced: true,
            });
        }

        Ok(Self {
            portrait: NormalizedRect::from_margins(&pm, geometry.portrait),
            landscape: NormalizedRect::from_margins(&lm, geometry.landscape),
            forced: false,
        })
    }
}

/// What a clamp did to the area state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClampOutcome {
    /// The area is manually restricted; nothing changed.
    Restricted,
    /// The active areas were replaced by the margin-derived ones.
    Applied,
    /// All-sides crop: active areas reset to the full frame.
    ForcedFullFrame,
    /// The margin-derived areas are larger than the active ones; only the
    /// maximum areas were recorded.
    Deferred,
}

impl ClampOutcome {
    /// Whether the active areas were written.
    pub fn wrote_active(self) -> bool {
        matches!(self, Self::Applied | Self::ForcedFullFrame)
    }
}

impl ScanAreaState {
    /// Maximum area for one orientation.
    pub fn max(&self, orientation: ScreenOrientation) -> NormalizedRect {
        match orientation {
            ScreenOrientation::Portrait => self.max_portrait,
            ScreenOrientation::Landscape => self.max_landscape,
        }
    }

    /// Fit the active scanning areas to the viewport the constraints leave.
    ///
    /// A shrinking (or equal) viewport is always applied. A growing one is
    /// only recorded in `max_*`, so a rotation or relayout never undoes a
    /// tighter area the user chose. Both orientations move together: if
    /// either current active dimension is at least the new one, both are
    /// replaced.
    pub fn clamp(
        &mut self,
        portrait: &Constraints,
        landscape: &Constraints,
        geometry: &ScreenGeometry,
    ) -> ScanResult<ClampOutcome> {
        if self.restricted {
            debug!("Scanning area is restricted; skipping clamp");
            return Ok(ClampOutcome::Restricted);
        }

        let resolved = ResolvedAreas::resolve(portrait, landscape, geometry)?;

        let shrinks = self.active_portrait.width >= resolved.portrait.width
            || self.active_portrait.height >= resolved.portrait.height
            || self.active_landscape.width >= resolved.landscape.width
            || self.active_landscape.height >= resolved.landscape.height;

        let outcome = if resolved.forced {
            ClampOutcome::ForcedFullFrame
        } else if shrinks {
            ClampOutcome::Applied
        } else {
            ClampOutcome::Deferred
        };

        if outcome.wrote_active() {
            self.active_portrait = resolved.portrait;
            self.active_landscape = resolved.landscape;
        } else {
            self.max_portrait = resolved.portrait;
            self.max_landscape = resolved.landscape;
        }

        debug!(
            ?outcome,
            portrait = ?resolved.portrait,
            landscape = ?resolved.landscape,
            "Clamped active scanning area"
        );
        Ok(outcome)
    }
}
