//! Viewport margin resolution and run-state coordination for embedded
//! barcode scanners.
//!
//! The native scanner view is laid out with per-orientation margins. This
//! crate turns those margins into normalized active scanning areas, and
//! drives the native scanner through start, stop, pause and resume while
//! keeping a settings store and the live scanner consistent.
//!
//! # Modules
//!
//! - [`orientation`]: per-orientation screen dimensions
//! - [`constraint`]: margin specifications and their resolution
//! - [`area`]: normalized scanning areas and the clamp policy
//! - [`settings`]: scan/UI settings and the settings store
//! - [`native`]: traits over the native scanning layer
//! - [`coordinator`]: the run-state machine
//! - [`recheck`]: deferred reconciliation checks
//! - [`events`]: publish/subscribe bus for UI pages
//! - [`config`]: coordinator configuration

#![forbid(unsafe_code)]

pub mod area;
pub mod config;
pub mod constraint;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod native;
pub mod orientation;
pub mod recheck;
pub mod settings;

// Re-exports: core types
pub use area::{ClampOutcome, NormalizedRect, ResolvedAreas, ScanAreaState};
pub use config::{CoordinatorConfig, ScanReaction, load_config, read_config};
pub use constraint::{Constraints, Margin, MarginSpec, Margins, is_fullscreen};
pub use coordinator::{Coordinator, ScannerRunState};
pub use error::{NativeError, ScanError, ScanResult};
pub use events::{BusEvent, EventBus, SubscriptionId, Topic};
pub use native::{
    Barcode, NativeCallback, NativeCapabilities, Overlay, ScanSession, ScannerBackend,
    ScannerInstance,
};
pub use orientation::{OrientationScreen, ScreenGeometry, ScreenOrientation};
pub use recheck::{RecheckOutcome, RecheckTicket, RecheckTimer, TimerQueue};
pub use settings::{
    CameraSwitchVisibility, GuiStyle, HotSpot, RestrictedArea, ScanSettings, SettingsChanged,
    SettingsDraft, SettingsStore, SharedSettings, Symbology, UiSettings,
};
