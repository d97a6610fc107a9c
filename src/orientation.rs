//! Screen orientation and per-orientation screen dimensions.
//!
//! The scanner keeps separate margin constraints for portrait and landscape,
//! so every geometry calculation needs the screen as it appears in each
//! orientation. Both are derived from the same physical screen: the long
//! side is the portrait height and the landscape width.
//!
//! ```text
//!     portrait          landscape
//!     ┌─────┐           ┌─────────┐
//!     │     │  h        │         │  w' = h
//!     │     │           └─────────┘
//!     │     │              h' = w
//!     └─────┘
//!        w
//! ```

/// One of the two orientations the scanner keeps constraints for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScreenOrientation {
    /// Long side vertical.
    Portrait,
    /// Long side horizontal.
    Landscape,
}

impl ScreenOrientation {
    /// Both orientations, portrait first.
    pub const ALL: [Self; 2] = [Self::Portrait, Self::Landscape];
}

/// Screen dimensions as seen in a single orientation, in layout units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrientationScreen {
    /// Vertical extent.
    pub height: f64,
    /// Horizontal extent.
    pub width: f64,
}

impl OrientationScreen {
    /// Create a new orientation screen.
    pub const fn new(height: f64, width: f64) -> Self {
        Self { height, width }
    }

    /// Swap axes, as a quarter turn does.
    pub fn transposed(self) -> Self {
        Self {
            height: self.width,
            width: self.height,
        }
    }

    /// Whether both dimensions are finite and strictly positive, i.e. usable
    /// as a normalization denominator.
    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// The physical screen resolved into both orientations.
///
/// Invariant: `portrait.height == landscape.width` and
/// `portrait.width == landscape.height`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenGeometry {
    /// Screen as held upright.
    pub portrait: OrientationScreen,
    /// Screen as held sideways.
    pub landscape: OrientationScreen,
}

impl ScreenGeometry {
    /// Resolve geometry from the current window dimensions.
    ///
    /// The window may be reported in either orientation; the result is the
    /// same for `(w, h)` and `(h, w)`.
    pub fn from_dimensions(width: f64, height: f64) -> Self {
        let long = height.max(width);
        let short = height.min(width);
        let portrait = OrientationScreen::new(long, short);
        Self {
            portrait,
            landscape: portrait.transposed(),
        }
    }

    /// Screen dimensions for one orientation.
    pub fn screen(&self, orientation: ScreenOrientation) -> OrientationScreen {
        match orientation {
            ScreenOrientation::Portrait => self.portrait,
            ScreenOrientation::Landscape => self.landscape,
        }
    }
}
