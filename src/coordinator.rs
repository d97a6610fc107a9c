//! Scanner run-state coordination.
//!
//! The [`Coordinator`] owns the native scanner instance and the run-state
//! the rest of the app reads. Requests into the native layer are
//! asynchronous; the state only changes when the native layer reports it
//! through [`Coordinator::handle_callback`]. Because a stop followed quickly
//! by a start may be satisfied out of order, every start and stop schedules
//! a recheck that reissues the request if the observed state has not caught
//! up with the intended one.
//!
//! ```text
//!            start()            scan / pause()
//!   Stopped ────────▶ Active ◀──────────────▶ Paused
//!      ▲               │        resume()         │
//!      └───── stop() ──┴─────────────────────────┘
//! ```
//!
//! Everything runs on one thread. Settings changes arrive through the
//! store's channel and are applied in [`Coordinator::pump_settings`], which
//! every public request calls first.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::area::ClampOutcome;
use crate::config::{CoordinatorConfig, ScanReaction};
use crate::constraint::{Constraints, MarginSpec, is_fullscreen};
use crate::error::{NativeError, ScanError, ScanResult};
use crate::events::{BusEvent, EventBus};
use crate::native::{
    NativeCallback, NativeCapabilities, Overlay, ScannerBackend, ScannerInstance,
};
use crate::orientation::ScreenGeometry;
use crate::recheck::{RecheckOutcome, RecheckTicket, RecheckTimer, TimerQueue};
use crate::settings::{SettingsChanged, SettingsDraft, SharedSettings, UiSettings};

/// Run-state of the scanner as last reported by the native layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScannerRunState {
    #[default]
    Stopped,
    Active,
    Paused,
}

impl ScannerRunState {
    /// Whether this observed state fulfils a request for `intended`.
    ///
    /// A start request is fulfilled by a paused scanner too: it is running,
    /// just waiting for a resume.
    pub fn satisfies(self, intended: Self) -> bool {
        match intended {
            Self::Active => self != Self::Stopped,
            other => self == other,
        }
    }

    /// Whether the state machine has an edge from `self` to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ScannerRunState::{Active, Paused, Stopped};
        matches!(
            (self, next),
            (Stopped, Active)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Stopped)
                | (Paused, Stopped)
        )
    }
}

/// Owns the live scanner instance and its run-state.
///
/// `B` creates native instances; `T` delivers the deferred rechecks back
/// through [`Coordinator::on_recheck`].
pub struct Coordinator<B: ScannerBackend, T: RecheckTimer> {
    backend: B,
    timer: T,
    config: CoordinatorConfig,
    capabilities: NativeCapabilities,
    settings: SharedSettings,
    settings_rx: Receiver<SettingsChanged>,
    /// Newest snapshot not yet applied to the instance.
    pending: Option<SettingsChanged>,
    bus: EventBus,
    instance: B::Instance,
    state: ScannerRunState,
    intent: Option<ScannerRunState>,
    generation: u64,
    reissues: u32,
    portrait: Option<Constraints>,
    landscape: Option<Constraints>,
}

impl<B: ScannerBackend, T: RecheckTimer> Coordinator<B, T> {
    /// Query capabilities, subscribe to the store and create the first
    /// scanner instance.
    pub fn new(
        mut backend: B,
        timer: T,
        settings: SharedSettings,
        config: CoordinatorConfig,
    ) -> ScanResult<Self> {
        let capabilities = backend.capabilities();
        let settings_rx = settings.borrow_mut().subscribe();
        let instance = create_instance(&mut backend, &settings, &config)?;
        debug!(?capabilities, "Scanner coordinator created");
        Ok(Self {
            backend,
            timer,
            config,
            capabilities,
            settings,
            settings_rx,
            pending: None,
            bus: EventBus::new(),
            instance,
            state: ScannerRunState::Stopped,
            intent: None,
            generation: 0,
            reissues: 0,
            portrait: None,
            landscape: None,
        })
    }

    /// Run-state as last reported by the native layer.
    pub fn state(&self) -> ScannerRunState {
        self.state
    }

    /// State most recently requested through `start` or `stop`.
    pub fn intent(&self) -> Option<ScannerRunState> {
        self.intent
    }

    /// Whether the native layer last reported the scanner stopped.
    pub fn is_stopped(&self) -> bool {
        self.state == ScannerRunState::Stopped
    }

    /// Whether the viewport is borderless in both orientations.
    ///
    /// Unset constraints are not borderless.
    pub fn is_fullscreen(&self) -> bool {
        match (&self.portrait, &self.landscape) {
            (Some(p), Some(l)) => is_fullscreen(p, l),
            _ => false,
        }
    }

    /// Portrait margins last applied to the native layer.
    pub fn portrait_constraints(&self) -> Option<&Constraints> {
        self.portrait.as_ref()
    }

    /// Landscape margins last applied to the native layer.
    pub fn landscape_constraints(&self) -> Option<&Constraints> {
        self.landscape.as_ref()
    }

    /// Native code table queried at construction.
    pub fn capabilities(&self) -> &NativeCapabilities {
        &self.capabilities
    }

    /// Recheck timing, reissue budget and UI defaults.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The store this coordinator is subscribed to.
    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Bus carrying state, scan, settings and manual search events.
    pub fn events(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// The live native instance. Replaced on fullscreen starts.
    pub fn instance(&self) -> &B::Instance {
        &self.instance
    }

    /// Factory the instances come from.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Timer holding scheduled rechecks.
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Mutable timer access, for hosts that drive it by hand.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Start scanning.
    ///
    /// A borderless viewport gets a fresh instance first. A stopped scanner
    /// is shown with the current UI settings. Frame processing is requested
    /// unconditionally.
    ///
    /// Pending settings are applied first. A failure to apply them does not
    /// hold back the start; it is returned once the start has been issued.
    pub fn start(&mut self) -> ScanResult<()> {
        let pumped = self.pump_settings();
        let ticket = self.begin_request(ScannerRunState::Active);
        self.timer.schedule(self.config.start_recheck(), ticket);
        self.issue_start()?;
        pumped.map(drop)
    }

    /// Stop scanning. The state changes once the native layer confirms.
    ///
    /// Settings failures are reported as for [`start`](Self::start).
    pub fn stop(&mut self) -> ScanResult<()> {
        let pumped = self.pump_settings();
        let ticket = self.begin_request(ScannerRunState::Stopped);
        self.timer.schedule(self.config.stop_recheck(), ticket);
        self.issue_stop()?;
        pumped.map(drop)
    }

    /// Ask the native layer to pause frame processing.
    pub fn pause(&mut self) -> ScanResult<()> {
        let pumped = self.pump_settings();
        self.instance
            .pause_scanning()
            .map_err(|e| ScanError::native("pause_scanning", e))?;
        pumped.map(drop)
    }

    /// Ask the native layer to resume a paused scanner.
    pub fn resume(&mut self) -> ScanResult<()> {
        let pumped = self.pump_settings();
        self.instance
            .resume_scanning()
            .map_err(|e| ScanError::native("resume_scanning", e))?;
        pumped.map(drop)
    }

    /// Handle a recheck scheduled by `start`, `stop` or an earlier recheck.
    pub fn on_recheck(&mut self, ticket: RecheckTicket) -> ScanResult<RecheckOutcome> {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Ignoring superseded scanner recheck"
            );
            return Ok(RecheckOutcome::Stale);
        }
        if self.state.satisfies(ticket.intended) {
            debug!(state = ?self.state, "Scanner state settled");
            return Ok(RecheckOutcome::Settled);
        }
        if self.reissues >= self.config.max_reissues {
            error!(
                expected = ?ticket.intended,
                observed = ?self.state,
                reissues = self.reissues,
                "Scanner never reached the requested state; giving up"
            );
            return Ok(RecheckOutcome::GaveUp);
        }

        self.reissues += 1;
        let attempt = self.reissues;
        warn!(
            expected = ?ticket.intended,
            observed = ?self.state,
            attempt,
            "Scanner state does not match request; issuing it again"
        );
        match ticket.intended {
            ScannerRunState::Stopped => {
                self.timer.schedule(self.config.stop_recheck(), ticket);
                self.issue_stop()?;
            }
            ScannerRunState::Active | ScannerRunState::Paused => {
                self.timer.schedule(self.config.start_recheck(), ticket);
                self.issue_start()?;
            }
        }
        Ok(RecheckOutcome::Reissued { attempt })
    }

    /// Handle a callback from the native layer.
    pub fn handle_callback(&mut self, callback: NativeCallback) -> ScanResult<()> {
        match callback {
            NativeCallback::DidChangeState(code) => {
                let next = self.capabilities.run_state(code)?;
                self.change_state(next);
                Ok(())
            }
            NativeCallback::DidScan(session) => {
                debug!(
                    codes = session.newly_recognized_codes.len(),
                    reaction = ?self.config.scan_reaction,
                    "Scanner recognized codes"
                );
                self.bus.publish(&BusEvent::Scanned(session));
                match self.config.scan_reaction {
                    ScanReaction::Pause => self.pause(),
                    ScanReaction::Stop => self.stop(),
                    ScanReaction::Continue => Ok(()),
                }
            }
            NativeCallback::DidCancel(reason) => {
                debug!(?reason, "Scanner cancelled");
                Ok(())
            }
            NativeCallback::DidManualSearch(text) => {
                info!(%text, "Manual barcode entry");
                self.bus.publish(&BusEvent::ManualSearch(text));
                Ok(())
            }
        }
    }

    /// Set the same margins for both orientations.
    ///
    /// Returns whether anything was sent to the native layer. If the native
    /// call fails the previous margins stay current, so the same request can
    /// be retried.
    pub fn set_constraints(
        &mut self,
        top: impl Into<MarginSpec>,
        right: impl Into<MarginSpec>,
        bottom: impl Into<MarginSpec>,
        left: impl Into<MarginSpec>,
        animation: Duration,
    ) -> ScanResult<bool> {
        let constraints = Constraints::new(top, right, bottom, left);
        self.replace_constraints(Some(constraints.clone()), Some(constraints), animation)
    }

    /// Set the portrait margins, keeping the landscape ones.
    pub fn set_portrait_constraints(
        &mut self,
        constraints: Constraints,
        animation: Duration,
    ) -> ScanResult<bool> {
        self.replace_constraints(Some(constraints), None, animation)
    }

    /// Set the landscape margins, keeping the portrait ones.
    pub fn set_landscape_constraints(
        &mut self,
        constraints: Constraints,
        animation: Duration,
    ) -> ScanResult<bool> {
        self.replace_constraints(None, Some(constraints), animation)
    }

    /// Fit the store's active scanning area to the current constraints and
    /// push any change into the live instance.
    pub fn clamp_active_scanning_area(
        &mut self,
        geometry: &ScreenGeometry,
    ) -> ScanResult<ClampOutcome> {
        let portrait = self.portrait.clone().unwrap_or_default();
        let landscape = self.landscape.clone().unwrap_or_default();
        let outcome = self
            .settings
            .borrow_mut()
            .clamp_active_scanning_area(&portrait, &landscape, geometry)?;
        self.pump_settings()?;
        Ok(outcome)
    }

    /// Commit edited settings against the current constraints.
    pub fn commit_settings(
        &mut self,
        draft: SettingsDraft,
        geometry: &ScreenGeometry,
    ) -> ScanResult<Option<ClampOutcome>> {
        let portrait = self.portrait.clone().unwrap_or_default();
        let landscape = self.landscape.clone().unwrap_or_default();
        let outcome =
            self.settings
                .borrow_mut()
                .commit(draft, &portrait, &landscape, geometry)?;
        self.pump_settings()?;
        Ok(outcome)
    }

    /// Apply pending settings notifications to the live instance.
    ///
    /// Queued snapshots are coalesced; only the newest is applied and
    /// republished. A snapshot that fails to apply is kept and retried on
    /// the next pump unless a newer one replaces it. Returns how many
    /// notifications were drained.
    pub fn pump_settings(&mut self) -> ScanResult<usize> {
        let mut drained = 0;
        while let Ok(change) = self.settings_rx.try_recv() {
            drained += 1;
            self.pending = Some(change);
        }
        let Some(change) = self.pending.take() else {
            return Ok(drained);
        };

        if let Err(err) = self.apply_settings(&change) {
            self.pending = Some(change);
            return Err(err);
        }
        debug!(drained, "Applied settings to scanner");
        self.bus.publish(&BusEvent::SettingsChanged(change));
        Ok(drained)
    }

    /// Whether a settings snapshot is waiting to be applied.
    pub fn has_pending_settings(&self) -> bool {
        self.pending.is_some()
    }

    fn apply_settings(&mut self, change: &SettingsChanged) -> ScanResult<()> {
        self.instance
            .apply_scan_settings(&change.scan)
            .map_err(|e| {
                warn!("Failed to apply scan settings: {e}");
                ScanError::native("apply_scan_settings", e)
            })?;
        apply_ui_settings(
            self.instance.overlay(),
            &change.ui,
            &self.capabilities,
            &self.config,
        )
    }

    fn begin_request(&mut self, intended: ScannerRunState) -> RecheckTicket {
        self.generation += 1;
        self.reissues = 0;
        self.intent = Some(intended);
        RecheckTicket {
            generation: self.generation,
            intended,
        }
    }

    fn issue_start(&mut self) -> ScanResult<()> {
        if self.is_fullscreen() {
            self.recreate_instance()?;
        }
        if self.is_stopped() {
            self.show()?;
        }
        self.instance
            .start_scanning()
            .map_err(|e| ScanError::native("start_scanning", e))
    }

    fn issue_stop(&mut self) -> ScanResult<()> {
        if self.is_stopped() {
            return Ok(());
        }
        self.instance
            .cancel()
            .map_err(|e| ScanError::native("cancel", e))
    }

    fn show(&mut self) -> ScanResult<()> {
        let ui = self.settings.borrow().ui_settings().clone();
        apply_ui_settings(self.instance.overlay(), &ui, &self.capabilities, &self.config)?;
        self.instance
            .show()
            .map_err(|e| ScanError::native("show", e))
    }

    fn recreate_instance(&mut self) -> ScanResult<()> {
        let fresh = create_instance(&mut self.backend, &self.settings, &self.config)?;
        let mut old = std::mem::replace(&mut self.instance, fresh);
        if !self.is_stopped()
            && let Err(e) = old.cancel()
        {
            warn!("Failed to cancel replaced scanner instance: {e}");
        }
        self.state = ScannerRunState::Stopped;
        info!("Recreated scanner instance for fullscreen viewport");
        if self.portrait.is_some() || self.landscape.is_some() {
            self.apply_constraints(Duration::ZERO)?;
        }
        Ok(())
    }

    /// Install new margins and lay the view out again if either orientation
    /// changed. The previous margins are restored if the native call fails.
    fn replace_constraints(
        &mut self,
        portrait: Option<Constraints>,
        landscape: Option<Constraints>,
        animation: Duration,
    ) -> ScanResult<bool> {
        if !differs(&self.portrait, &portrait) && !differs(&self.landscape, &landscape) {
            debug!(?portrait, ?landscape, "Constraints unchanged; skipping relayout");
            return Ok(false);
        }
        let previous = (self.portrait.clone(), self.landscape.clone());
        if portrait.is_some() {
            self.portrait = portrait;
        }
        if landscape.is_some() {
            self.landscape = landscape;
        }
        if let Err(err) = self.apply_constraints(animation) {
            (self.portrait, self.landscape) = previous;
            return Err(err);
        }
        Ok(true)
    }

    fn apply_constraints(&mut self, animation: Duration) -> ScanResult<()> {
        let portrait = self.portrait.clone().unwrap_or_default();
        let landscape = self.landscape.clone().unwrap_or_default();
        debug!(?portrait, ?landscape, ?animation, "Applying viewport constraints");
        self.instance
            .set_constraints(&portrait, &landscape, animation)
            .map_err(|e| ScanError::native("set_constraints", e))
    }

    fn change_state(&mut self, next: ScannerRunState) {
        if next == self.state {
            return;
        }
        if !self.state.can_transition_to(next) {
            warn!(from = ?self.state, to = ?next, "Unexpected scanner state transition");
        }
        info!(from = ?self.state, to = ?next, "Scanner state changed");
        self.state = next;
        self.bus.publish(&BusEvent::StateChanged(next));
    }
}

impl<B: ScannerBackend> Coordinator<B, TimerQueue> {
    /// Advance the built-in timer, handling every recheck that falls due.
    pub fn advance(&mut self, by: Duration) -> ScanResult<Vec<RecheckOutcome>> {
        let until = self.timer.now() + by;
        let mut outcomes = Vec::new();
        while let Some(ticket) = self.timer.pop_due(until) {
            outcomes.push(self.on_recheck(ticket)?);
        }
        Ok(outcomes)
    }
}

impl<B: ScannerBackend, T: RecheckTimer> core::fmt::Debug for Coordinator<B, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state)
            .field("intent", &self.intent)
            .field("generation", &self.generation)
            .field("reissues", &self.reissues)
            .field("portrait", &self.portrait)
            .field("landscape", &self.landscape)
            .finish_non_exhaustive()
    }
}

fn create_instance<B: ScannerBackend>(
    backend: &mut B,
    settings: &SharedSettings,
    config: &CoordinatorConfig,
) -> ScanResult<B::Instance> {
    let scan = settings.borrow().scan_settings().clone();
    let mut instance = backend
        .create_instance(&scan)
        .map_err(|e| ScanError::native("create_instance", e))?;
    instance.set_continuous_mode(config.continuous_mode);
    Ok(instance)
}

/// Whether `new` is set and differs from the current value.
fn differs(current: &Option<Constraints>, new: &Option<Constraints>) -> bool {
    new.is_some() && new != current
}

fn apply_ui_settings(
    overlay: &mut dyn Overlay,
    ui: &UiSettings,
    capabilities: &NativeCapabilities,
    config: &CoordinatorConfig,
) -> ScanResult<()> {
    let size = config.feedback_button_size;
    let step = |op: &'static str, result: Result<(), NativeError>| {
        result.map_err(|e| {
            warn!(op, "Failed to apply UI setting: {e}");
            ScanError::native(op, e)
        })
    };

    step("set_beep_enabled", overlay.set_beep_enabled(ui.feedback.beep))?;
    step(
        "set_vibrate_enabled",
        overlay.set_vibrate_enabled(ui.feedback.vibrate),
    )?;

    step("show_search_bar", overlay.show_search_bar(ui.search_bar))?;
    if ui.search_bar {
        step(
            "set_search_bar_placeholder_text",
            overlay.set_search_bar_placeholder_text(&config.search_bar_placeholder),
        )?;
    }

    step("set_torch_enabled", overlay.set_torch_enabled(ui.torch.enabled))?;
    step(
        "set_torch_button_margins_and_size",
        overlay.set_torch_button_margins_and_size(ui.torch.left, ui.torch.top, size, size),
    )?;

    step(
        "set_camera_switch_visibility",
        overlay.set_camera_switch_visibility(
            capabilities.camera_switch_code(ui.camera_switch.visibility),
        ),
    )?;
    step(
        "set_camera_switch_button_margins_and_size",
        overlay.set_camera_switch_button_margins_and_size(
            ui.camera_switch.right,
            ui.camera_switch.top,
            size,
            size,
        ),
    )?;

    let viewfinder = &ui.viewfinder;
    step(
        "set_gui_style",
        overlay.set_gui_style(capabilities.gui_style_code(viewfinder.style)),
    )?;
    step(
        "set_viewfinder_dimension",
        overlay.set_viewfinder_dimension(
            viewfinder.portrait.width,
            viewfinder.portrait.height,
            viewfinder.landscape.width,
            viewfinder.landscape.height,
        ),
    )
}
