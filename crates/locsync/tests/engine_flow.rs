//! End-to-end sessions through `App::run`, driven over the command channel on
//! a paused clock.
//!
//! Run with: cargo test --test engine_flow

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use locsync::app::{App, AppSettings};
use locsync::display::{PageSurface, TargetRegistry};
use locsync::geolocation::{FixedGeolocator, Geolocator};
use locsync_proto::catalog::LocationCatalog;
use locsync_proto::geo::Coordinates;
use locsync_proto::protocol::{Broadcast, Command};
use locsync_proto::storage::JsonFileStore;
use tokio::sync::mpsc;
use tokio::time::Instant;

const NEAR_GELDROP: Coordinates = Coordinates::new(51.4200, 5.5510);

fn settings(default_location: &str) -> AppSettings {
    AppSettings {
        default_location: default_location.to_string(),
        detect_on_startup: true,
        startup_delay: Duration::from_secs(3),
        ephemeral: Duration::from_secs(3),
        frame: Duration::from_millis(16),
    }
}

fn session(
    state_file: &Path,
    default_location: &str,
    geolocator: Box<dyn Geolocator>,
) -> (
    App,
    mpsc::Sender<Command>,
    mpsc::Receiver<Command>,
    mpsc::UnboundedReceiver<Broadcast>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let app = App::new(
        Arc::new(LocationCatalog::builtin()),
        Box::new(JsonFileStore::open(state_file)),
        geolocator,
        settings(default_location),
        out_tx,
    );
    (app, cmd_tx, cmd_rx, out_rx)
}

async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<Broadcast>,
    pred: impl Fn(&Broadcast) -> bool,
) -> Broadcast {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            match rx.recv().await {
                Some(b) if pred(&b) => return b,
                Some(_) => continue,
                None => panic!("broadcast channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for broadcast")
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Broadcast>) -> Vec<Broadcast> {
    let mut out = Vec::new();
    while let Ok(b) = rx.try_recv() {
        out.push(b);
    }
    out
}

fn stored(state_file: &Path) -> BTreeMap<String, String> {
    let content = std::fs::read_to_string(state_file).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn is_suggestion(b: &Broadcast) -> bool {
    matches!(b, Broadcast::Suggestion { .. })
}

#[tokio::test(start_paused = true)]
async fn test_dismissed_detection_stays_off_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("storage.json");
    let geo = || -> Box<dyn Geolocator> {
        Box::new(FixedGeolocator::new(NEAR_GELDROP).with_latency(Duration::from_millis(400)))
    };

    // ── Session 1: startup detection offers geldrop, visitor dismisses ──────
    let (app, cmd_tx, cmd_rx, mut out_rx) = session(&state_file, "heeze", geo());
    let started = Instant::now();
    let driver = async {
        let suggestion = wait_for(&mut out_rx, is_suggestion).await;
        assert!(started.elapsed() >= Duration::from_millis(3400));
        match suggestion {
            Broadcast::Suggestion { id, text } => {
                assert_eq!(id, "geldrop");
                assert!(text.contains("Geldrop"));
            }
            other => panic!("unexpected {:?}", other),
        }
        cmd_tx.send(Command::Dismiss).await.unwrap();
        wait_for(&mut out_rx, |b| *b == Broadcast::SuggestionCleared).await;
        cmd_tx.send(Command::Quit).await.unwrap();
    };
    let (result, ()) = tokio::join!(app.run(cmd_rx), driver);
    result.unwrap();

    let saved = stored(&state_file);
    assert_eq!(
        saved.get("locationDetectionDismissed").map(String::as_str),
        Some("true")
    );

    // ── Session 2: nothing automatic, but the button still works ────────────
    let (app, cmd_tx, cmd_rx, mut out_rx) = session(&state_file, "heeze", geo());
    let driver = async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!drain(&mut out_rx).iter().any(is_suggestion));

        cmd_tx.send(Command::Detect).await.unwrap();
        wait_for(&mut out_rx, is_suggestion).await;

        cmd_tx.send(Command::Accept).await.unwrap();
        wait_for(
            &mut out_rx,
            |b| matches!(b, Broadcast::Page { selected, .. } if selected == "geldrop"),
        )
        .await;
        cmd_tx.send(Command::Quit).await.unwrap();
    };
    let (result, ()) = tokio::join!(app.run(cmd_rx), driver);
    result.unwrap();

    let saved = stored(&state_file);
    assert_eq!(saved.get("selectedLocation").map(String::as_str), Some("geldrop"));
}

#[tokio::test(start_paused = true)]
async fn test_no_suggestion_when_nearest_is_selected() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("storage.json");
    let (app, cmd_tx, cmd_rx, mut out_rx) = session(
        &state_file,
        "geldrop",
        Box::new(FixedGeolocator::new(NEAR_GELDROP)),
    );
    let driver = async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!drain(&mut out_rx).iter().any(is_suggestion));
        cmd_tx.send(Command::Quit).await.unwrap();
    };
    let (result, ()) = tokio::join!(app.run(cmd_rx), driver);
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_second_toast_restarts_timer() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("storage.json");
    let (mut app, cmd_tx, cmd_rx, mut out_rx) = session(
        &state_file,
        "geldrop",
        Box::new(FixedGeolocator::new(NEAR_GELDROP)),
    );
    // Keep detection out of the way.
    app.dispatch(locsync::action::Action::DismissDetection);

    let driver = async {
        cmd_tx
            .send(Command::Select {
                id: "heeze".to_string(),
            })
            .await
            .unwrap();
        wait_for(&mut out_rx, |b| matches!(b, Broadcast::Toast { .. })).await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        cmd_tx
            .send(Command::Select {
                id: "eindhoven".to_string(),
            })
            .await
            .unwrap();
        let toast = wait_for(&mut out_rx, |b| matches!(b, Broadcast::Toast { .. })).await;
        let second_shown = Instant::now();
        assert_eq!(
            toast,
            Broadcast::Toast {
                text: "Location changed to Eindhoven (Blixembosch)".to_string()
            }
        );

        wait_for(&mut out_rx, |b| *b == Broadcast::ToastCleared).await;
        let shown_for = second_shown.elapsed();
        assert!(shown_for >= Duration::from_millis(2900), "{:?}", shown_for);
        assert!(shown_for <= Duration::from_millis(3200), "{:?}", shown_for);

        cmd_tx.send(Command::Quit).await.unwrap();
    };
    let (result, ()) = tokio::join!(app.run(cmd_rx), driver);
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_page_variant_without_some_slots() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(LocationCatalog::builtin());
    let registry = TargetRegistry::standard();
    let page = PageSurface::full(&registry, &catalog)
        .without(|id| id.starts_with("hero-") || id.starts_with("footer-location-item"));

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let mut app_settings = settings("geldrop");
    app_settings.detect_on_startup = false;
    let app = App::with_page(
        catalog,
        Box::new(JsonFileStore::open(dir.path().join("storage.json"))),
        Box::new(FixedGeolocator::new(NEAR_GELDROP)),
        app_settings,
        out_tx,
        registry,
        page,
    );

    let driver = async {
        cmd_tx
            .send(Command::Select {
                id: "eindhoven".to_string(),
            })
            .await
            .unwrap();
        let page = wait_for(
            &mut out_rx,
            |b| matches!(b, Broadcast::Page { selected, .. } if selected == "eindhoven"),
        )
        .await;
        let Broadcast::Page { elements, .. } = page else {
            unreachable!()
        };
        assert!(!elements.contains_key("hero-location-text"));
        assert_eq!(
            elements["about-location-text"].text.as_deref(),
            Some("Eindhoven (Blixembosch)")
        );
        assert!(elements["location-item-eindhoven"].active);
        assert!(!elements["location-item-geldrop"].active);
        cmd_tx.send(Command::Quit).await.unwrap();
    };
    let (result, ()) = tokio::join!(app.run(cmd_rx), driver);
    result.unwrap();
}
