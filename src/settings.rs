//! Scan and UI settings, and the store that owns them.
//!
//! The store is the single place settings change. Every update sends a
//! [`SettingsChanged`] snapshot to each subscriber's channel before the
//! update returns; the coordinator drains its channel and applies the
//! snapshot to the live scanner.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::area::{ClampOutcome, NormalizedRect, ScanAreaState};
use crate::constraint::Constraints;
use crate::error::ScanResult;
use crate::orientation::{ScreenGeometry, ScreenOrientation};

/// Barcode symbologies the decoder can be configured for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Symbology {
    Ean13,
    Upca,
    Ean8,
    Upce,
    Code39,
    Code93,
    Code128,
    Itf,
    Codabar,
    Qr,
    DataMatrix,
    Pdf417,
    Aztec,
    MsiPlessey,
    TwoDigitAddOn,
    FiveDigitAddOn,
}

impl Symbology {
    /// Name as used in settings keys.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ean13 => "ean13",
            Self::Upca => "upca",
            Self::Ean8 => "ean8",
            Self::Upce => "upce",
            Self::Code39 => "code39",
            Self::Code93 => "code93",
            Self::Code128 => "code128",
            Self::Itf => "itf",
            Self::Codabar => "codabar",
            Self::Qr => "qr",
            Self::DataMatrix => "data-matrix",
            Self::Pdf417 => "pdf417",
            Self::Aztec => "aztec",
            Self::MsiPlessey => "msi-plessey",
            Self::TwoDigitAddOn => "two-digit-add-on",
            Self::FiveDigitAddOn => "five-digit-add-on",
        }
    }
}

/// Per-symbology decoder options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbologySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub checksums: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Data matrix extension trading frame time for direct part marking support.
pub const DPM_EXTENSION: &str = "direct_part_marking_mode";

/// Point in normalized frame coordinates around which the decoder searches first.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HotSpot {
    pub x: f64,
    pub y: f64,
}

impl HotSpot {
    /// Frame centre.
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };
}

/// Settings handed to the decoding engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanSettings {
    pub symbologies: BTreeMap<Symbology, SymbologySettings>,
    pub max_number_of_codes_per_frame: u32,
    pub high_density_mode: bool,
    pub matrix_scan: bool,
    /// Manual restriction of the active scanning area.
    pub restricted: bool,
    pub active_scanning_area_portrait: NormalizedRect,
    pub active_scanning_area_landscape: NormalizedRect,
    pub scanning_hot_spot: HotSpot,
}

impl Default for ScanSettings {
    fn default() -> Self {
        let mut settings = Self {
            symbologies: BTreeMap::new(),
            max_number_of_codes_per_frame: 1,
            high_density_mode: false,
            matrix_scan: false,
            restricted: false,
            active_scanning_area_portrait: NormalizedRect::FULL,
            active_scanning_area_landscape: NormalizedRect::FULL,
            scanning_hot_spot: HotSpot::CENTER,
        };
        for sym in [
            Symbology::Ean13,
            Symbology::Upca,
            Symbology::Ean8,
            Symbology::Upce,
            Symbology::Code39,
            Symbology::Code128,
            Symbology::Itf,
            Symbology::Qr,
            Symbology::DataMatrix,
        ] {
            settings.set_symbology_enabled(sym, true);
        }
        settings.symbology_mut(Symbology::MsiPlessey).checksums = vec!["mod10".to_owned()];
        settings
    }
}

impl ScanSettings {
    /// Enable or disable decoding of a symbology.
    pub fn set_symbology_enabled(&mut self, symbology: Symbology, enabled: bool) {
        self.symbology_mut(symbology).enabled = enabled;
    }

    /// Whether a symbology is enabled.
    pub fn is_symbology_enabled(&self, symbology: Symbology) -> bool {
        self.symbologies.get(&symbology).is_some_and(|s| s.enabled)
    }

    /// Options for a symbology, inserting disabled defaults if absent.
    pub fn symbology_mut(&mut self, symbology: Symbology) -> &mut SymbologySettings {
        self.symbologies.entry(symbology).or_default()
    }

    /// Set the same active area for both orientations.
    pub fn set_active_scanning_area(&mut self, area: NormalizedRect) {
        self.active_scanning_area_portrait = area;
        self.active_scanning_area_landscape = area;
    }
}

/// Overlay drawing style.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuiStyle {
    #[default]
    Default,
    Laser,
    None,
}

/// When the camera switch button is shown.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraSwitchVisibility {
    #[default]
    Never,
    OnTablet,
    Always,
}

/// Viewfinder size as fractions of the frame.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewfinderSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewfinderSettings {
    pub style: GuiStyle,
    pub portrait: ViewfinderSize,
    pub landscape: ViewfinderSize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSettings {
    pub beep: bool,
    pub vibrate: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TorchSettings {
    pub enabled: bool,
    /// Button offset from the top-left corner.
    pub left: f64,
    pub top: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraSwitchSettings {
    pub visibility: CameraSwitchVisibility,
    /// Button offset from the top-right corner.
    pub right: f64,
    pub top: f64,
}

/// Overlay feedback and chrome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UiSettings {
    pub viewfinder: ViewfinderSettings,
    pub search_bar: bool,
    pub feedback: FeedbackSettings,
    pub torch: TorchSettings,
    pub camera_switch: CameraSwitchSettings,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            viewfinder: ViewfinderSettings {
                style: GuiStyle::Default,
                portrait: ViewfinderSize {
                    width: 0.8,
                    height: 0.4,
                },
                landscape: ViewfinderSize {
                    width: 0.6,
                    height: 0.4,
                },
            },
            search_bar: false,
            feedback: FeedbackSettings {
                beep: true,
                vibrate: true,
            },
            torch: TorchSettings {
                enabled: true,
                left: 15.0,
                top: 15.0,
            },
            camera_switch: CameraSwitchSettings {
                visibility: CameraSwitchVisibility::Never,
                right: 15.0,
                top: 15.0,
            },
        }
    }
}

/// Snapshot sent to subscribers after every settings update.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsChanged {
    pub scan: ScanSettings,
    pub ui: UiSettings,
}

/// Process-wide settings store.
#[derive(Debug, Default)]
pub struct SettingsStore {
    scan: ScanSettings,
    ui: UiSettings,
    max_portrait: NormalizedRect,
    max_landscape: NormalizedRect,
    subscribers: Vec<Sender<SettingsChanged>>,
}

/// Store handle shared between the coordinator and settings pages.
pub type SharedSettings = Rc<RefCell<SettingsStore>>;

impl SettingsStore {
    /// Store with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given initial settings.
    pub fn with_settings(scan: ScanSettings, ui: UiSettings) -> Self {
        Self {
            scan,
            ui,
            ..Self::default()
        }
    }

    /// Wrap in a shared handle.
    pub fn shared(self) -> SharedSettings {
        Rc::new(RefCell::new(self))
    }

    pub fn scan_settings(&self) -> &ScanSettings {
        &self.scan
    }

    pub fn ui_settings(&self) -> &UiSettings {
        &self.ui
    }

    /// Replace the scan settings and notify subscribers.
    pub fn update_scan_settings(&mut self, settings: ScanSettings) {
        self.scan = settings;
        self.notify();
    }

    /// Replace the UI settings and notify subscribers.
    pub fn update_ui_settings(&mut self, settings: UiSettings) {
        self.ui = settings;
        self.notify();
    }

    /// Register for change notifications.
    pub fn subscribe(&mut self) -> Receiver<SettingsChanged> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Current scanning area, including the recorded maximum areas.
    pub fn area_state(&self) -> ScanAreaState {
        ScanAreaState {
            restricted: self.scan.restricted,
            active_portrait: self.scan.active_scanning_area_portrait,
            active_landscape: self.scan.active_scanning_area_landscape,
            max_portrait: self.max_portrait,
            max_landscape: self.max_landscape,
        }
    }

    /// Widest area the current margins permit for one orientation.
    pub fn max_scanning_area(&self, orientation: ScreenOrientation) -> NormalizedRect {
        self.area_state().max(orientation)
    }

    /// Fit the active scanning area to the viewport the constraints leave.
    ///
    /// See [`ScanAreaState::clamp`]. A changed active area goes through
    /// [`update_scan_settings`](Self::update_scan_settings), so subscribers
    /// see it.
    pub fn clamp_active_scanning_area(
        &mut self,
        portrait: &Constraints,
        landscape: &Constraints,
        geometry: &ScreenGeometry,
    ) -> ScanResult<ClampOutcome> {
        let before = self.area_state();
        let mut area = before;
        let outcome = area.clamp(portrait, landscape, geometry)?;

        self.max_portrait = area.max_portrait;
        self.max_landscape = area.max_landscape;

        if outcome.wrote_active()
            && (area.active_portrait != before.active_portrait
                || area.active_landscape != before.active_landscape)
        {
            let mut scan = self.scan.clone();
            scan.active_scanning_area_portrait = area.active_portrait;
            scan.active_scanning_area_landscape = area.active_landscape;
            self.update_scan_settings(scan);
        }
        Ok(outcome)
    }

    fn notify(&mut self) {
        let snapshot = SettingsChanged {
            scan: self.scan.clone(),
            ui: self.ui.clone(),
        };
        let before = self.subscribers.len();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            debug!(dropped, "Pruned closed settings subscribers");
        }
    }
}

/// Scanning area as edited on a settings form.
///
/// `x`/`y` is the hot spot; see [`NormalizedRect::around_hot_spot`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestrictedArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub restricted: bool,
}

impl Default for RestrictedArea {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            width: 0.5,
            height: 0.5,
            restricted: false,
        }
    }
}

/// Settings being edited, normalized before they are committed to the store.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsDraft {
    pub scan: ScanSettings,
    pub ui: UiSettings,
    pub scanning_area: RestrictedArea,
    pub dpm_mode: bool,
}

impl SettingsDraft {
    /// Start editing from the store's current settings.
    pub fn from_store(store: &SettingsStore) -> Self {
        let scan = store.scan_settings().clone();
        let dpm_mode = scan
            .symbologies
            .get(&Symbology::DataMatrix)
            .is_some_and(|s| s.extensions.iter().any(|e| e == DPM_EXTENSION));
        Self {
            scanning_area: RestrictedArea {
                restricted: scan.restricted,
                ..RestrictedArea::default()
            },
            ui: store.ui_settings().clone(),
            scan,
            dpm_mode,
        }
    }

    /// Bring edited values into a consistent state.
    ///
    /// - Empty MSI-Plessey checksum entries are dropped.
    /// - With an add-on symbology enabled, two codes per frame are allowed
    ///   so the add-on is reported with its main code.
    /// - A restricted area becomes the active area of both orientations;
    ///   otherwise both reset to the full frame.
    /// - DPM mode narrows the area to the centre third and turns on the
    ///   data matrix extension.
    pub fn normalize(&mut self) {
        if let Some(msi) = self.scan.symbologies.get_mut(&Symbology::MsiPlessey) {
            msi.checksums.retain(|c| !c.is_empty());
        }

        if self.scan.is_symbology_enabled(Symbology::TwoDigitAddOn)
            || self.scan.is_symbology_enabled(Symbology::FiveDigitAddOn)
        {
            self.scan.max_number_of_codes_per_frame = 2;
        }

        let area = self.scanning_area;
        self.scan.restricted = area.restricted;
        if area.restricted {
            self.scan.scanning_hot_spot = HotSpot {
                x: area.x,
                y: area.y,
            };
            self.scan.set_active_scanning_area(NormalizedRect::around_hot_spot(
                area.x,
                area.y,
                area.width,
                area.height,
            ));
        } else {
            self.scan.scanning_hot_spot = HotSpot::CENTER;
            self.scan.set_active_scanning_area(NormalizedRect::FULL);
        }

        let extensions = &mut self.scan.symbology_mut(Symbology::DataMatrix).extensions;
        extensions.retain(|e| e != DPM_EXTENSION);
        if self.dpm_mode {
            extensions.push(DPM_EXTENSION.to_owned());
            self.scan.set_active_scanning_area(NormalizedRect::DPM);
        }
    }

    /// Whether committing this draft should re-fit the area to the margins.
    pub fn needs_clamp(&self) -> bool {
        !self.scanning_area.restricted && !self.dpm_mode
    }
}

impl SettingsStore {
    /// Normalize a draft and make it current.
    ///
    /// An unrestricted, non-DPM draft is re-fitted to the given constraints
    /// afterwards, which may update the scan settings a second time.
    pub fn commit(
        &mut self,
        mut draft: SettingsDraft,
        portrait: &Constraints,
        landscape: &Constraints,
        geometry: &ScreenGeometry,
    ) -> ScanResult<Option<ClampOutcome>> {
        draft.normalize();
        let clamp = draft.needs_clamp();
        info!(
            restricted = draft.scan.restricted,
            dpm = draft.dpm_mode,
            "Committing settings"
        );
        self.update_scan_settings(draft.scan);
        self.update_ui_settings(draft.ui);
        if clamp {
            self.clamp_active_scanning_area(portrait, landscape, geometry)
                .map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> ScreenGeometry {
        ScreenGeometry::from_dimensions(500.0, 1000.0)
    }

    #[test]
    fn default_scan_settings() {
        let s = ScanSettings::default();
        for sym in [
            Symbology::Ean13,
            Symbology::Upca,
            Symbology::Ean8,
            Symbology::Upce,
            Symbology::Code39,
            Symbology::Code128,
            Symbology::Itf,
            Symbology::Qr,
            Symbology::DataMatrix,
        ] {
            assert!(s.is_symbology_enabled(sym), "{}", sym.name());
        }
        assert!(!s.is_symbology_enabled(Symbology::MsiPlessey));
        assert_eq!(s.symbologies[&Symbology::MsiPlessey].checksums, ["mod10"]);
        assert!(!s.high_density_mode);
        assert_eq!(s.active_scanning_area_portrait, NormalizedRect::FULL);
    }

    #[test]
    fn default_ui_settings() {
        let ui = UiSettings::default();
        assert_eq!(ui.viewfinder.portrait.width, 0.8);
        assert_eq!(ui.viewfinder.landscape.width, 0.6);
        assert!(ui.feedback.beep && ui.feedback.vibrate);
        assert!(ui.torch.enabled);
        assert_eq!(ui.camera_switch.visibility, CameraSwitchVisibility::Never);
    }

    #[test]
    fn updates_notify_every_subscriber() {
        let mut store = SettingsStore::new();
        let a = store.subscribe();
        let b = store.subscribe();

        let mut ui = UiSettings::default();
        ui.search_bar = true;
        store.update_ui_settings(ui.clone());

        for rx in [&a, &b] {
            let change = rx.try_recv().unwrap();
            assert_eq!(change.ui, ui);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut store = SettingsStore::new();
        let keep = store.subscribe();
        drop(store.subscribe());
        assert_eq!(store.subscriber_count(), 2);
        store.update_scan_settings(ScanSettings::default());
        assert_eq!(store.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }

    #[test]
    fn clamp_pushes_changed_area() {
        let mut store = SettingsStore::new();
        let rx = store.subscribe();
        let c = Constraints::new("10%", 0.0, "10%", 0.0);
        let outcome = store
            .clamp_active_scanning_area(&c, &Constraints::ZERO, &geometry())
            .unwrap();
        assert_eq!(outcome, ClampOutcome::Applied);
        let change = rx.try_recv().unwrap();
        assert!((change.scan.active_scanning_area_portrait.height - 0.8).abs() < 1e-9);

        // Same margins again: nothing new to push.
        store
            .clamp_active_scanning_area(&c, &Constraints::ZERO, &geometry())
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clamp_records_max_when_growing() {
        let mut scan = ScanSettings::default();
        scan.set_active_scanning_area(NormalizedRect::centered(0.3, 0.3));
        let mut store = SettingsStore::with_settings(scan, UiSettings::default());
        let rx = store.subscribe();
        let c = Constraints::new(0.0, 0.0, "50%", 0.0);
        let outcome = store.clamp_active_scanning_area(&c, &c, &geometry()).unwrap();
        assert_eq!(outcome, ClampOutcome::Deferred);
        assert!(rx.try_recv().is_err());
        let max = store.max_scanning_area(ScreenOrientation::Portrait);
        assert!((max.height - 0.5).abs() < 1e-9);
        assert_eq!(
            store.scan_settings().active_scanning_area_portrait,
            NormalizedRect::centered(0.3, 0.3)
        );
    }

    #[test]
    fn restricted_store_ignores_margins() {
        let mut scan = ScanSettings::default();
        scan.restricted = true;
        let mut store = SettingsStore::with_settings(scan, UiSettings::default());
        let c = Constraints::new("40%", 0.0, 0.0, 0.0);
        let outcome = store.clamp_active_scanning_area(&c, &c, &geometry()).unwrap();
        assert_eq!(outcome, ClampOutcome::Restricted);
        assert_eq!(
            store.scan_settings().active_scanning_area_portrait,
            NormalizedRect::FULL
        );
    }

    #[test]
    fn normalize_drops_empty_checksums_and_allows_add_on() {
        let mut draft = SettingsDraft::from_store(&SettingsStore::new());
        draft
            .scan
            .symbology_mut(Symbology::MsiPlessey)
            .checksums
            .extend(["".to_owned(), "mod11".to_owned()]);
        draft.scan.set_symbology_enabled(Symbology::FiveDigitAddOn, true);
        draft.normalize();
        assert_eq!(
            draft.scan.symbologies[&Symbology::MsiPlessey].checksums,
            ["mod10", "mod11"]
        );
        assert_eq!(draft.scan.max_number_of_codes_per_frame, 2);
    }

    #[test]
    fn normalize_restricted_area() {
        let mut draft = SettingsDraft::from_store(&SettingsStore::new());
        draft.scanning_area = RestrictedArea {
            x: 0.5,
            y: 0.5,
            width: 0.4,
            height: 0.2,
            restricted: true,
        };
        draft.normalize();
        assert!(draft.scan.restricted);
        assert_eq!(draft.scan.scanning_hot_spot, HotSpot { x: 0.5, y: 0.5 });
        let expected = NormalizedRect::around_hot_spot(0.5, 0.5, 0.4, 0.2);
        assert_eq!(draft.scan.active_scanning_area_portrait, expected);
        assert_eq!(draft.scan.active_scanning_area_landscape, expected);
        assert!(!draft.needs_clamp());
    }

    #[test]
    fn normalize_dpm_mode_round_trip() {
        let mut draft = SettingsDraft::from_store(&SettingsStore::new());
        draft.dpm_mode = true;
        draft.normalize();
        assert_eq!(draft.scan.active_scanning_area_portrait, NormalizedRect::DPM);
        assert_eq!(
            draft.scan.symbologies[&Symbology::DataMatrix].extensions,
            [DPM_EXTENSION]
        );
        // Normalizing twice does not duplicate the extension.
        draft.normalize();
        assert_eq!(
            draft.scan.symbologies[&Symbology::DataMatrix].extensions.len(),
            1
        );

        draft.dpm_mode = false;
        draft.normalize();
        assert!(draft.scan.symbologies[&Symbology::DataMatrix].extensions.is_empty());
        assert_eq!(draft.scan.active_scanning_area_portrait, NormalizedRect::FULL);
    }

    #[test]
    fn draft_detects_dpm_from_store() {
        let mut store = SettingsStore::new();
        let mut draft = SettingsDraft::from_store(&store);
        draft.dpm_mode = true;
        store
            .commit(draft, &Constraints::ZERO, &Constraints::ZERO, &geometry())
            .unwrap();
        assert!(SettingsDraft::from_store(&store).dpm_mode);
    }

    #[test]
    fn commit_unrestricted_reclamps() {
        let mut store = SettingsStore::new();
        let rx = store.subscribe();
        let draft = SettingsDraft::from_store(&store);
        let c = Constraints::new(0.0, 0.0, "50%", 0.0);
        let outcome = store.commit(draft, &c, &c, &geometry()).unwrap();
        assert_eq!(outcome, Some(ClampOutcome::Applied));
        // scan, ui, then the clamped area
        assert_eq!(rx.try_iter().count(), 3);
        assert!((store.scan_settings().active_scanning_area_portrait.height - 0.5).abs() < 1e-9);
    }
}
