//! Recording fake of the native scanning layer.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use scanport::{
    BusEvent, Constraints, Coordinator, CoordinatorConfig, NativeCapabilities, NativeError,
    Overlay, ScanSettings, ScannerBackend, ScannerInstance, SettingsStore, SharedSettings,
    TimerQueue, Topic,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Create,
    ContinuousMode(bool),
    Show,
    Start,
    Pause,
    Resume,
    Cancel,
    SetConstraints {
        portrait: Constraints,
        landscape: Constraints,
        animation: Duration,
    },
    ApplyScanSettings(ScanSettings),
    Beep(bool),
    Vibrate(bool),
    SearchBar(bool),
    Placeholder(String),
    Torch(bool),
    TorchButton(f64, f64, f64, f64),
    CameraSwitch(i32),
    CameraSwitchButton(f64, f64, f64, f64),
    GuiStyle(i32),
    Viewfinder(f64, f64, f64, f64),
}

/// Calls tagged with the id of the instance that received them.
pub type Log = Rc<RefCell<Vec<(u32, Call)>>>;

#[derive(Clone, Default)]
pub struct Faults {
    pub apply_scan_settings: Rc<Cell<bool>>,
    pub start_scanning: Rc<Cell<bool>>,
    pub set_constraints: Rc<Cell<bool>>,
}

pub struct FakeBackend {
    pub log: Log,
    pub capabilities: NativeCapabilities,
    pub faults: Faults,
    next_id: u32,
}

impl FakeBackend {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            capabilities: NativeCapabilities::default(),
            faults: Faults::default(),
            next_id: 0,
        }
    }
}

impl ScannerBackend for FakeBackend {
    type Instance = FakeInstance;

    fn capabilities(&self) -> NativeCapabilities {
        self.capabilities
    }

    fn create_instance(&mut self, _settings: &ScanSettings) -> Result<FakeInstance, NativeError> {
        self.next_id += 1;
        let id = self.next_id;
        self.log.borrow_mut().push((id, Call::Create));
        Ok(FakeInstance {
            id,
            log: Rc::clone(&self.log),
            faults: self.faults.clone(),
            overlay: FakeOverlay {
                id,
                log: Rc::clone(&self.log),
            },
        })
    }
}

pub struct FakeInstance {
    pub id: u32,
    log: Log,
    faults: Faults,
    overlay: FakeOverlay,
}

impl FakeInstance {
    fn record(&self, call: Call) {
        self.log.borrow_mut().push((self.id, call));
    }
}

impl ScannerInstance for FakeInstance {
    fn set_continuous_mode(&mut self, enabled: bool) {
        self.record(Call::ContinuousMode(enabled));
    }

    fn show(&mut self) -> Result<(), NativeError> {
        self.record(Call::Show);
        Ok(())
    }

    fn start_scanning(&mut self) -> Result<(), NativeError> {
        if self.faults.start_scanning.get() {
            return Err("camera unavailable".into());
        }
        self.record(Call::Start);
        Ok(())
    }

    fn pause_scanning(&mut self) -> Result<(), NativeError> {
        self.record(Call::Pause);
        Ok(())
    }

    fn resume_scanning(&mut self) -> Result<(), NativeError> {
        self.record(Call::Resume);
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), NativeError> {
        self.record(Call::Cancel);
        Ok(())
    }

    fn set_constraints(
        &mut self,
        portrait: &Constraints,
        landscape: &Constraints,
        animation: Duration,
    ) -> Result<(), NativeError> {
        if self.faults.set_constraints.get() {
            return Err("view not attached".into());
        }
        self.record(Call::SetConstraints {
            portrait: portrait.clone(),
            landscape: landscape.clone(),
            animation,
        });
        Ok(())
    }

    fn apply_scan_settings(&mut self, settings: &ScanSettings) -> Result<(), NativeError> {
        if self.faults.apply_scan_settings.get() {
            return Err("picker torn down".into());
        }
        self.record(Call::ApplyScanSettings(settings.clone()));
        Ok(())
    }

    fn overlay(&mut self) -> &mut dyn Overlay {
        &mut self.overlay
    }
}

pub struct FakeOverlay {
    id: u32,
    log: Log,
}

impl FakeOverlay {
    fn record(&self, call: Call) -> Result<(), NativeError> {
        self.log.borrow_mut().push((self.id, call));
        Ok(())
    }
}

impl Overlay for FakeOverlay {
    fn set_beep_enabled(&mut self, enabled: bool) -> Result<(), NativeError> {
        self.record(Call::Beep(enabled))
    }

    fn set_vibrate_enabled(&mut self, enabled: bool) -> Result<(), NativeError> {
        self.record(Call::Vibrate(enabled))
    }

    fn show_search_bar(&mut self, visible: bool) -> Result<(), NativeError> {
        self.record(Call::SearchBar(visible))
    }

    fn set_search_bar_placeholder_text(&mut self, text: &str) -> Result<(), NativeError> {
        self.record(Call::Placeholder(text.to_owned()))
    }

    fn set_torch_enabled(&mut self, enabled: bool) -> Result<(), NativeError> {
        self.record(Call::Torch(enabled))
    }

    fn set_torch_button_margins_and_size(
        &mut self,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> Result<(), NativeError> {
        self.record(Call::TorchButton(left, top, width, height))
    }

    fn set_camera_switch_visibility(&mut self, code: i32) -> Result<(), NativeError> {
        self.record(Call::CameraSwitch(code))
    }

    fn set_camera_switch_button_margins_and_size(
        &mut self,
        right: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> Result<(), NativeError> {
        self.record(Call::CameraSwitchButton(right, top, width, height))
    }

    fn set_gui_style(&mut self, code: i32) -> Result<(), NativeError> {
        self.record(Call::GuiStyle(code))
    }

    fn set_viewfinder_dimension(
        &mut self,
        portrait_width: f64,
        portrait_height: f64,
        landscape_width: f64,
        landscape_height: f64,
    ) -> Result<(), NativeError> {
        self.record(Call::Viewfinder(
            portrait_width,
            portrait_height,
            landscape_width,
            landscape_height,
        ))
    }
}

pub type TestCoordinator = Coordinator<FakeBackend, TimerQueue>;

pub struct Harness {
    pub coordinator: TestCoordinator,
    pub log: Log,
    pub store: SharedSettings,
    pub faults: Faults,
    pub events: Rc<RefCell<Vec<BusEvent>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(CoordinatorConfig::default(), NativeCapabilities::default())
    }

    pub fn with(config: CoordinatorConfig, capabilities: NativeCapabilities) -> Self {
        init_tracing();
        let log = Log::default();
        let mut backend = FakeBackend::new(Rc::clone(&log));
        backend.capabilities = capabilities;
        let faults = backend.faults.clone();
        let store = SettingsStore::new().shared();
        let mut coordinator =
            Coordinator::new(backend, TimerQueue::new(), Rc::clone(&store), config).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        for topic in [
            Topic::ScannerStateChanged,
            Topic::ScannerScanned,
            Topic::SettingsChanged,
            Topic::ManualSearch,
        ] {
            let events = Rc::clone(&events);
            coordinator
                .events()
                .subscribe(topic, move |e| events.borrow_mut().push(e.clone()));
        }

        Self {
            coordinator,
            log,
            store,
            faults,
            events,
        }
    }

    /// Calls recorded so far, without instance ids.
    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().iter().map(|(_, c)| c.clone()).collect()
    }

    /// Forget recorded calls and events.
    pub fn clear(&self) {
        self.log.borrow_mut().clear();
        self.events.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.log.borrow().iter().filter(|(_, c)| pred(c)).count()
    }

    /// Id of the instance that received the most recent call.
    pub fn last_instance(&self) -> Option<u32> {
        self.log.borrow().last().map(|(id, _)| *id)
    }

    /// Deliver a state change from the native layer.
    pub fn report(&mut self, state: scanport::ScannerRunState) {
        let code = self.coordinator.capabilities().run_state_code(state);
        self.coordinator
            .handle_callback(scanport::NativeCallback::DidChangeState(code))
            .unwrap();
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
