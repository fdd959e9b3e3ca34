//! Nearest-branch detection.
//!
//! # States
//! ```text
//!  Idle              : nothing asked yet
//!  AwaitingPosition  : request outstanding; further requests are refused
//!  Resolved          : got a position (a suggestion may have been shown)
//!  Denied            : platform refused or failed; a manual retry may run
//!  Unsupported       : no capability at all; terminal for the session
//! ```
//!
//! The detector never selects anything itself.  A suggestion carries the
//! accept/dismiss actions; the App dispatches whichever the visitor picks.

use futures_util::future::BoxFuture;
use locsync_proto::geo::{self, Coordinates};
use locsync_proto::storage::KeyValueStore;
use tracing::{debug, info};

use crate::action::Action;
use crate::geolocation::{GeoError, Geolocator};
use crate::notify::NotificationChannel;
use crate::selection::SelectionStore;

pub const POSITION_FAILED_MESSAGE: &str =
    "Could not determine your location. You can pick a branch manually.";
pub const UNSUPPORTED_MESSAGE: &str =
    "Location detection is not supported here. You can pick a branch manually.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    #[default]
    Idle,
    AwaitingPosition,
    Resolved,
    Denied,
    Unsupported,
}

/// Transient; dropped once shown.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximitySuggestion {
    pub suggested_id: String,
    pub distance_km: f64,
}

/// Outcome of `ProximityDetector::begin`.
pub enum DetectStart {
    /// A request is already outstanding.
    Busy,
    /// No capability; the message has been shown.
    Unsupported,
    /// Drive this to completion and hand the result to `complete`.
    Requested(BoxFuture<'static, Result<Coordinates, GeoError>>),
}

impl std::fmt::Debug for DetectStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => f.write_str("Busy"),
            Self::Unsupported => f.write_str("Unsupported"),
            Self::Requested(_) => f.write_str("Requested(..)"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProximityDetector {
    state: DetectorState,
}

impl ProximityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == DetectorState::AwaitingPosition
    }

    /// Start a detection.  Single-flight: while a position is outstanding
    /// this returns `Busy` and nothing else happens.
    pub fn begin(
        &mut self,
        geolocator: &dyn Geolocator,
        notifier: &mut dyn NotificationChannel,
    ) -> DetectStart {
        match self.state {
            DetectorState::AwaitingPosition => {
                debug!("detection already in flight, ignoring");
                return DetectStart::Busy;
            }
            DetectorState::Unsupported => {
                notifier.show_ephemeral(UNSUPPORTED_MESSAGE.to_string());
                return DetectStart::Unsupported;
            }
            _ => {}
        }

        if !geolocator.is_supported() {
            info!("geolocation unsupported, detection disabled for this session");
            self.state = DetectorState::Unsupported;
            notifier.show_ephemeral(UNSUPPORTED_MESSAGE.to_string());
            return DetectStart::Unsupported;
        }

        debug!("{:?} → AwaitingPosition", self.state);
        self.state = DetectorState::AwaitingPosition;
        DetectStart::Requested(geolocator.current_position())
    }

    /// Feed back the position request's result.  Returns the suggestion
    /// that was shown, if any.  A result arriving when no request is
    /// outstanding is dropped.
    pub fn complete<K: KeyValueStore>(
        &mut self,
        result: Result<Coordinates, GeoError>,
        store: &SelectionStore<K>,
        notifier: &mut dyn NotificationChannel,
    ) -> Option<ProximitySuggestion> {
        if !self.is_awaiting() {
            debug!("dropping position result in state {:?}", self.state);
            return None;
        }

        let position = match result {
            Ok(position) => position,
            Err(e) => {
                info!("position request failed: {}", e);
                self.state = DetectorState::Denied;
                notifier.show_ephemeral(POSITION_FAILED_MESSAGE.to_string());
                return None;
            }
        };
        self.state = DetectorState::Resolved;

        let suggestion = suggest(position, store)?;
        let location = store.catalog().get(&suggestion.suggested_id)?;
        info!(
            "suggesting {} ({:.2} km away)",
            suggestion.suggested_id, suggestion.distance_km
        );
        notifier.show_actionable(
            format!("{} is closer to you. Switch to this branch?", location.name),
            Action::SwitchToNearby(suggestion.suggested_id.clone()),
            Action::DismissDetection,
        );
        Some(suggestion)
    }
}

/// Nearest branch to `position`, or `None` when it is already selected.
pub fn suggest<K: KeyValueStore>(
    position: Coordinates,
    store: &SelectionStore<K>,
) -> Option<ProximitySuggestion> {
    let catalog = store.catalog();
    let (index, distance_km) = geo::nearest(position, catalog.iter().map(|l| l.coordinates))?;
    let nearest = &catalog.all()[index];
    if nearest.id == store.get() {
        debug!("nearest branch {} is already selected", nearest.id);
        return None;
    }
    Some(ProximitySuggestion {
        suggested_id: nearest.id.clone(),
        distance_km,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::geolocation::{DeniedGeolocator, FixedGeolocator, UnsupportedGeolocator};
    use crate::notify::ToastChannel;
    use locsync_proto::catalog::LocationCatalog;
    use locsync_proto::storage::MemoryStore;

    const NEAR_GELDROP: Coordinates = Coordinates::new(51.4200, 5.5510);

    fn store_at(id: &str) -> SelectionStore<MemoryStore> {
        SelectionStore::open(Arc::new(LocationCatalog::builtin()), MemoryStore::new(), id)
    }

    async fn run(
        detector: &mut ProximityDetector,
        geo: &dyn Geolocator,
        store: &SelectionStore<MemoryStore>,
        toast: &mut ToastChannel,
    ) -> Option<ProximitySuggestion> {
        match detector.begin(geo, toast) {
            DetectStart::Requested(fut) => {
                let result = fut.await;
                detector.complete(result, store, toast)
            }
            other => panic!("expected a request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_suggests_nearest_when_different() {
        let store = store_at("heeze");
        let mut toast = ToastChannel::default();
        let mut detector = ProximityDetector::new();
        let geo = FixedGeolocator::new(NEAR_GELDROP);

        let suggestion = run(&mut detector, &geo, &store, &mut toast).await.unwrap();
        assert_eq!(suggestion.suggested_id, "geldrop");
        assert!(suggestion.distance_km < 1.0);
        assert_eq!(detector.state(), DetectorState::Resolved);
        assert!(toast.actionable_text().unwrap().starts_with("Geldrop"));
        assert_eq!(
            toast.accept(),
            Some(Action::SwitchToNearby("geldrop".to_string()))
        );
    }

    #[tokio::test]
    async fn test_no_suggestion_when_already_nearest() {
        let store = store_at("geldrop");
        let mut toast = ToastChannel::default();
        let mut detector = ProximityDetector::new();
        let geo = FixedGeolocator::new(NEAR_GELDROP);

        assert_eq!(run(&mut detector, &geo, &store, &mut toast).await, None);
        assert_eq!(detector.state(), DetectorState::Resolved);
        assert_eq!(toast.actionable_text(), None);
        assert_eq!(toast.ephemeral_text(), None);
    }

    #[tokio::test]
    async fn test_exact_match_is_nearest() {
        let store = store_at("geldrop");
        let catalog = LocationCatalog::builtin();
        for location in catalog.iter() {
            let s = suggest(location.coordinates, &store);
            if location.id == "geldrop" {
                assert_eq!(s, None);
            } else {
                let s = s.unwrap();
                assert_eq!(s.suggested_id, location.id);
                assert!(s.distance_km.abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_second_begin_is_refused_while_awaiting() {
        let mut toast = ToastChannel::default();
        let mut detector = ProximityDetector::new();
        let geo = FixedGeolocator::new(NEAR_GELDROP);

        assert!(matches!(detector.begin(&geo, &mut toast), DetectStart::Requested(_)));
        assert!(matches!(detector.begin(&geo, &mut toast), DetectStart::Busy));
        assert!(detector.is_awaiting());
    }

    #[tokio::test]
    async fn test_late_result_is_dropped() {
        let store = store_at("heeze");
        let mut toast = ToastChannel::default();
        let mut detector = ProximityDetector::new();
        let geo = FixedGeolocator::new(NEAR_GELDROP);

        run(&mut detector, &geo, &store, &mut toast).await.unwrap();
        toast.dismiss();
        // A duplicate result after resolution produces nothing.
        assert_eq!(detector.complete(Ok(NEAR_GELDROP), &store, &mut toast), None);
        assert_eq!(toast.actionable_text(), None);
    }

    #[tokio::test]
    async fn test_denied_reports_and_allows_manual_retry() {
        let store = store_at("heeze");
        let mut toast = ToastChannel::default();
        let mut detector = ProximityDetector::new();

        assert_eq!(
            run(&mut detector, &DeniedGeolocator, &store, &mut toast).await,
            None
        );
        assert_eq!(detector.state(), DetectorState::Denied);
        assert_eq!(toast.ephemeral_text(), Some(POSITION_FAILED_MESSAGE));
        assert_eq!(toast.actionable_text(), None);

        let geo = FixedGeolocator::new(NEAR_GELDROP);
        assert!(run(&mut detector, &geo, &store, &mut toast).await.is_some());
    }

    #[test]
    fn test_unsupported_is_terminal() {
        let mut toast = ToastChannel::default();
        let mut detector = ProximityDetector::new();

        assert!(matches!(
            detector.begin(&UnsupportedGeolocator, &mut toast),
            DetectStart::Unsupported
        ));
        assert_eq!(detector.state(), DetectorState::Unsupported);
        assert_eq!(toast.ephemeral_text(), Some(UNSUPPORTED_MESSAGE));

        toast.close_ephemeral();
        let geo = FixedGeolocator::new(NEAR_GELDROP);
        assert!(matches!(
            detector.begin(&geo, &mut toast),
            DetectStart::Unsupported
        ));
        assert_eq!(toast.ephemeral_text(), Some(UNSUPPORTED_MESSAGE));
    }
}
