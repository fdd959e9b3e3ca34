//! App: single-owner event loop.
//!
//! Architecture:
//! - `App` exclusively owns the selection store, the display synchroniser
//!   (and through it the page), the toast channel and the detector.
//! - Commands arrive over an `mpsc` channel; each becomes an `Action` and is
//!   dispatched in order.
//! - A geolocation request runs in a spawned task and posts its result back
//!   over a second channel.  Dropping the App drops the receiver, so a result
//!   arriving after teardown is discarded.
//! - Everything the page should know about leaves as a `Broadcast`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use locsync_proto::catalog::LocationCatalog;
use locsync_proto::config::Config;
use locsync_proto::geo::Coordinates;
use locsync_proto::protocol::{Broadcast, Command};
use locsync_proto::storage::KeyValueStore;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::action::Action;
use crate::coalesce::CoalescedWork;
use crate::display::{DisplaySynchronizer, PageSurface, TargetRegistry};
use crate::geolocation::{GeoError, Geolocator};
use crate::notify::{NotificationChannel, ToastChannel};
use crate::proximity::{DetectStart, ProximityDetector};
use crate::selection::SelectionStore;
use crate::viewport::ViewportTracker;

type PositionResult = Result<Coordinates, GeoError>;

const TOAST_TICK: Duration = Duration::from_millis(100);
const HOURS_TICK: Duration = Duration::from_secs(60);

/// Runtime knobs, usually taken from `Config`.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub default_location: String,
    pub detect_on_startup: bool,
    pub startup_delay: Duration,
    pub ephemeral: Duration,
    pub frame: Duration,
}

impl AppSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_location: config.catalog.default_location.clone(),
            detect_on_startup: config.detection.enabled,
            startup_delay: Duration::from_millis(config.detection.startup_delay_ms),
            ephemeral: Duration::from_millis(config.notifications.ephemeral_ms),
            frame: Duration::from_millis(config.page.frame_ms.max(1)),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct App {
    store: SelectionStore<Box<dyn KeyValueStore>>,
    display: DisplaySynchronizer<PageSurface>,
    toast: ToastChannel,
    detector: ProximityDetector,
    geolocator: Box<dyn Geolocator>,
    viewport: ViewportTracker,
    scroll: CoalescedWork<f64>,
    settings: AppSettings,

    geo_tx: mpsc::Sender<PositionResult>,
    geo_rx: Option<mpsc::Receiver<PositionResult>>,
    out: mpsc::UnboundedSender<Broadcast>,

    // ── Publishing bookkeeping ────────────────────────────────────────────────
    page_dirty: bool,
    published_toast: Option<Instant>,

    initialized: bool,
    should_quit: bool,
}

impl App {
    pub fn new(
        catalog: Arc<LocationCatalog>,
        storage: Box<dyn KeyValueStore>,
        geolocator: Box<dyn Geolocator>,
        settings: AppSettings,
        out: mpsc::UnboundedSender<Broadcast>,
    ) -> Self {
        let registry = TargetRegistry::standard();
        let page = PageSurface::full(&registry, &catalog);
        Self::with_page(catalog, storage, geolocator, settings, out, registry, page)
    }

    /// Like `new`, for a page variant that renders only some slots.
    pub fn with_page(
        catalog: Arc<LocationCatalog>,
        storage: Box<dyn KeyValueStore>,
        geolocator: Box<dyn Geolocator>,
        settings: AppSettings,
        out: mpsc::UnboundedSender<Broadcast>,
        registry: TargetRegistry,
        page: PageSurface,
    ) -> Self {
        let store = SelectionStore::open(catalog, storage, &settings.default_location);
        let (geo_tx, geo_rx) = mpsc::channel(4);
        Self {
            store,
            display: DisplaySynchronizer::new(registry, page),
            toast: ToastChannel::new(settings.ephemeral),
            detector: ProximityDetector::new(),
            geolocator,
            viewport: ViewportTracker::new(),
            scroll: CoalescedWork::new(),
            settings,
            geo_tx,
            geo_rx: Some(geo_rx),
            out,
            page_dirty: false,
            published_toast: None,
            initialized: false,
            should_quit: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn store(&self) -> &SelectionStore<Box<dyn KeyValueStore>> {
        &self.store
    }

    pub fn page(&self) -> &PageSurface {
        self.display.surface()
    }

    pub fn toast(&self) -> &ToastChannel {
        &self.toast
    }

    pub fn detector(&self) -> &ProximityDetector {
        &self.detector
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Render the restored selection.  Runs once; later calls are ignored so
    /// a repeated setup cannot re-bind anything.
    pub fn init(&mut self) -> bool {
        if self.initialized {
            debug!("init called again, ignoring");
            return false;
        }
        self.initialized = true;

        info!("initial location: {}", self.store.get());
        self.display.apply(self.store.current_location());
        self.refresh_open_status();
        self.viewport.update(0.0);
        self.viewport.render(self.display.surface_mut());
        self.page_dirty = true;
        true
    }

    /// Whether automatic detection should be scheduled for this session.
    pub fn wants_startup_detection(&self) -> bool {
        self.settings.detect_on_startup && !self.store.is_detection_dismissed()
    }

    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> anyhow::Result<()> {
        let mut geo_rx = self
            .geo_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("App::run called twice"))?;

        self.init();
        self.flush();

        // ── Timers ────────────────────────────────────────────────────────────
        let startup = tokio::time::sleep(self.settings.startup_delay);
        tokio::pin!(startup);
        let mut startup_pending = self.wants_startup_detection();
        if !startup_pending {
            debug!("startup detection skipped");
        }

        let mut toast_tick = tokio::time::interval(TOAST_TICK);
        toast_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut frame = tokio::time::interval(self.settings.frame);
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut hours_tick = tokio::time::interval_at(Instant::now() + HOURS_TICK, HOURS_TICK);
        hours_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => {
                        trace!("command {:?}", cmd);
                        self.dispatch(cmd.into());
                    }
                    None => {
                        debug!("command channel closed");
                        break;
                    }
                },

                Some(result) = geo_rx.recv() => {
                    self.on_position(result);
                }

                _ = &mut startup, if startup_pending => {
                    startup_pending = false;
                    self.dispatch(Action::AutoDetect);
                }

                _ = frame.tick(), if self.scroll.is_pending() => {
                    self.run_frame();
                }

                _ = toast_tick.tick() => {
                    self.toast.tick();
                }

                _ = hours_tick.tick() => {
                    self.refresh_open_status();
                }
            }

            self.flush();
            if self.should_quit {
                break;
            }
        }

        info!("shutting down on {}", self.store.get());
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Select(id) => {
                if self.select(&id) {
                    let name = self.store.current_location().name.clone();
                    self.toast
                        .show_ephemeral(format!("Location changed to {}", name));
                    self.withdraw_stale_suggestion();
                }
            }
            Action::SwitchToNearby(id) => {
                self.select(&id);
            }

            Action::AutoDetect => {
                if self.store.is_detection_dismissed() {
                    debug!("detection dismissed earlier, not detecting");
                } else {
                    self.start_detection();
                }
            }
            Action::DetectLocation => self.start_detection(),
            Action::DismissDetection => self.store.mark_detection_dismissed(),

            Action::AcceptSuggestion => {
                if let Some(next) = self.toast.accept() {
                    self.emit(Broadcast::SuggestionCleared);
                    self.dispatch(next);
                }
            }
            Action::RejectSuggestion => {
                if let Some(next) = self.toast.dismiss() {
                    self.emit(Broadcast::SuggestionCleared);
                    self.dispatch(next);
                }
            }
            Action::CloseToast => {
                self.toast.close_ephemeral();
            }

            Action::Scroll(y) => {
                if self.scroll.request(y) {
                    trace!("frame scheduled");
                }
            }

            Action::Snapshot => self.page_dirty = true,
            Action::Quit => self.should_quit = true,
        }
    }

    fn select(&mut self, id: &str) -> bool {
        if !self.store.set(id, &mut self.display) {
            return false;
        }
        self.refresh_open_status();
        self.page_dirty = true;
        true
    }

    /// A hand-picked branch that matches the open suggestion makes the
    /// prompt moot.  The visitor did not dismiss it, so nothing is recorded.
    fn withdraw_stale_suggestion(&mut self) {
        let current = self.store.get();
        let stale = matches!(
            self.toast.pending_accept(),
            Some(Action::SwitchToNearby(id)) if id == current
        );
        if stale && self.toast.withdraw() {
            debug!("suggestion for {} withdrawn after manual pick", current);
            self.emit(Broadcast::SuggestionCleared);
        }
    }

    fn start_detection(&mut self) {
        match self.detector.begin(self.geolocator.as_ref(), &mut self.toast) {
            DetectStart::Requested(request) => {
                let tx = self.geo_tx.clone();
                tokio::spawn(async move {
                    let result = request.await;
                    if tx.send(result).await.is_err() {
                        debug!("position arrived after shutdown, dropped");
                    }
                });
            }
            DetectStart::Busy | DetectStart::Unsupported => {}
        }
    }

    pub fn on_position(&mut self, result: PositionResult) {
        let Some(suggestion) = self.detector.complete(result, &self.store, &mut self.toast) else {
            return;
        };
        let text = self.toast.actionable_text().unwrap_or_default().to_string();
        self.emit(Broadcast::Suggestion {
            id: suggestion.suggested_id,
            text,
        });
    }

    /// Wait for the outstanding position request, if any, and process it.
    /// Only usable before `run` takes over the result channel.
    pub async fn settle_detection(&mut self) -> bool {
        if !self.detector.is_awaiting() {
            return false;
        }
        let Some(rx) = self.geo_rx.as_mut() else {
            return false;
        };
        let result = rx.recv().await;
        match result {
            Some(result) => {
                self.on_position(result);
                true
            }
            None => false,
        }
    }

    /// Apply the latest scroll offset.  Returns whether anything ran.
    pub fn run_frame(&mut self) -> bool {
        let Some(y) = self.scroll.take() else {
            return false;
        };
        self.viewport.update(y);
        self.viewport.render(self.display.surface_mut());
        self.page_dirty = true;
        true
    }

    fn refresh_open_status(&mut self) {
        self.display
            .render_open_status(self.store.current_location(), &Local::now());
        self.page_dirty = true;
    }

    // ── Publishing ────────────────────────────────────────────────────────────

    /// Send whatever changed since the last flush.
    pub fn flush(&mut self) {
        let deadline = self.toast.ephemeral_deadline();
        if deadline != self.published_toast {
            self.published_toast = deadline;
            match self.toast.ephemeral_text() {
                Some(text) => {
                    let text = text.to_string();
                    self.emit(Broadcast::Toast { text });
                }
                None => self.emit(Broadcast::ToastCleared),
            }
        }

        if self.page_dirty {
            self.page_dirty = false;
            self.emit(Broadcast::Page {
                selected: self.store.get().to_string(),
                elements: self.display.surface().snapshot(),
            });
        }
    }

    fn emit(&self, broadcast: Broadcast) {
        if self.out.send(broadcast).is_err() {
            trace!("no listener for broadcasts");
        }
    }
}
