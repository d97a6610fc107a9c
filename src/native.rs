//! Interface to the native scanning layer.
//!
//! The native SDK owns the camera, the decoder and the overlay view. This
//! module only describes the calls the coordinator makes into it and the
//! callbacks it delivers back; hosts implement the traits over their SDK
//! binding.

use std::time::Duration;

use crate::constraint::Constraints;
use crate::coordinator::ScannerRunState;
use crate::error::{NativeError, ScanError, ScanResult};
use crate::settings::{CameraSwitchVisibility, GuiStyle, ScanSettings};

/// Factory for scanner instances.
pub trait ScannerBackend {
    type Instance: ScannerInstance;

    /// Integer codes the native layer uses for its enumerations.
    ///
    /// Queried once when a coordinator is created.
    fn capabilities(&self) -> NativeCapabilities;

    /// Create a new, hidden scanner instance.
    fn create_instance(&mut self, settings: &ScanSettings) -> Result<Self::Instance, NativeError>;
}

/// A live native scanner view.
///
/// Start, stop, pause and resume requests are asynchronous: the native layer
/// reports the resulting state later through
/// [`NativeCallback::DidChangeState`].
pub trait ScannerInstance {
    /// Keep scanning after a code is recognized instead of closing the view.
    fn set_continuous_mode(&mut self, enabled: bool);

    /// Make the view visible and begin delivering callbacks.
    fn show(&mut self) -> Result<(), NativeError>;

    fn start_scanning(&mut self) -> Result<(), NativeError>;

    fn pause_scanning(&mut self) -> Result<(), NativeError>;

    fn resume_scanning(&mut self) -> Result<(), NativeError>;

    /// Stop scanning and hide the view.
    fn cancel(&mut self) -> Result<(), NativeError>;

    /// Lay the view out with the given margins, animating over `animation`.
    fn set_constraints(
        &mut self,
        portrait: &Constraints,
        landscape: &Constraints,
        animation: Duration,
    ) -> Result<(), NativeError>;

    fn apply_scan_settings(&mut self, settings: &ScanSettings) -> Result<(), NativeError>;

    /// The overlay drawn on top of the camera preview.
    fn overlay(&mut self) -> &mut dyn Overlay;
}

/// UI feedback setters on the scan overlay.
///
/// Enumerations are passed as native codes; see [`NativeCapabilities`].
pub trait Overlay {
    fn set_beep_enabled(&mut self, enabled: bool) -> Result<(), NativeError>;

    fn set_vibrate_enabled(&mut self, enabled: bool) -> Result<(), NativeError>;

    fn show_search_bar(&mut self, visible: bool) -> Result<(), NativeError>;

    fn set_search_bar_placeholder_text(&mut self, text: &str) -> Result<(), NativeError>;

    fn set_torch_enabled(&mut self, enabled: bool) -> Result<(), NativeError>;

    fn set_torch_button_margins_and_size(
        &mut self,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> Result<(), NativeError>;

    fn set_camera_switch_visibility(&mut self, code: i32) -> Result<(), NativeError>;

    fn set_camera_switch_button_margins_and_size(
        &mut self,
        right: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> Result<(), NativeError>;

    fn set_gui_style(&mut self, code: i32) -> Result<(), NativeError>;

    fn set_viewfinder_dimension(
        &mut self,
        portrait_width: f64,
        portrait_height: f64,
        landscape_width: f64,
        landscape_height: f64,
    ) -> Result<(), NativeError>;
}

/// A recognized code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Barcode {
    /// Symbology name as reported by the decoder.
    pub symbology: String,
    pub data: String,
}

/// Codes recognized in one scan callback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanSession {
    pub newly_recognized_codes: Vec<Barcode>,
}

/// Callbacks delivered by the native layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeCallback {
    DidScan(ScanSession),
    /// New state as a native code.
    DidChangeState(i32),
    DidCancel(Option<String>),
    DidManualSearch(String),
}

/// Native integer codes for the enumerations the core uses.
///
/// Populated once from the native layer so the rest of the crate works with
/// typed enums only.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NativeCapabilities {
    pub state_stopped: i32,
    pub state_paused: i32,
    pub state_active: i32,
    pub gui_style_default: i32,
    pub gui_style_laser: i32,
    pub gui_style_none: i32,
    pub camera_switch_never: i32,
    pub camera_switch_on_tablet: i32,
    pub camera_switch_always: i32,
}

impl Default for NativeCapabilities {
    fn default() -> Self {
        Self {
            state_stopped: 2,
            state_paused: 1,
            state_active: 3,
            gui_style_default: 0,
            gui_style_laser: 1,
            gui_style_none: 2,
            camera_switch_never: 0,
            camera_switch_on_tablet: 1,
            camera_switch_always: 2,
        }
    }
}

impl NativeCapabilities {
    /// Map a native state code.
    pub fn run_state(&self, code: i32) -> ScanResult<ScannerRunState> {
        if code == self.state_stopped {
            Ok(ScannerRunState::Stopped)
        } else if code == self.state_paused {
            Ok(ScannerRunState::Paused)
        } else if code == self.state_active {
            Ok(ScannerRunState::Active)
        } else {
            Err(ScanError::UnknownNativeState(code))
        }
    }

    pub fn run_state_code(&self, state: ScannerRunState) -> i32 {
        match state {
            ScannerRunState::Stopped => self.state_stopped,
            ScannerRunState::Paused => self.state_paused,
            ScannerRunState::Active => self.state_active,
        }
    }

    pub fn gui_style_code(&self, style: GuiStyle) -> i32 {
        match style {
            GuiStyle::Default => self.gui_style_default,
            GuiStyle::Laser => self.gui_style_laser,
            GuiStyle::None => self.gui_style_none,
        }
    }

    pub fn camera_switch_code(&self, visibility: CameraSwitchVisibility) -> i32 {
        match visibility {
            CameraSwitchVisibility::Never => self.camera_switch_never,
            CameraSwitchVisibility::OnTablet => self.camera_switch_on_tablet,
            CameraSwitchVisibility::Always => self.camera_switch_always,
        }
    }
}
