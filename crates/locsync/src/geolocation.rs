//! Geolocation capability: a one-shot "where am I" request.

use std::time::Duration;

use futures_util::future::{self, BoxFuture, FutureExt};
use locsync_proto::config::{DetectionConfig, GeoProvider};
use locsync_proto::geo::Coordinates;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("permission denied")]
    Denied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

/// What a platform offers for locating the visitor.  Some platforms have no
/// capability at all, which callers must check with `is_supported` before
/// asking for a position.
pub trait Geolocator: Send + Sync {
    fn is_supported(&self) -> bool;

    /// Resolves once, with no timeout beyond whatever the platform applies.
    fn current_position(&self) -> BoxFuture<'static, Result<Coordinates, GeoError>>;
}

/// Always answers with the same point, optionally after a delay.
#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    position: Coordinates,
    latency: Duration,
}

impl FixedGeolocator {
    pub fn new(position: Coordinates) -> Self {
        Self {
            position,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Geolocator for FixedGeolocator {
    fn is_supported(&self) -> bool {
        true
    }

    fn current_position(&self) -> BoxFuture<'static, Result<Coordinates, GeoError>> {
        let position = self.position;
        let latency = self.latency;
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(position)
        }
        .boxed()
    }
}

/// Capability present, user said no.
#[derive(Debug, Clone, Default)]
pub struct DeniedGeolocator;

impl Geolocator for DeniedGeolocator {
    fn is_supported(&self) -> bool {
        true
    }

    fn current_position(&self) -> BoxFuture<'static, Result<Coordinates, GeoError>> {
        future::ready(Err(GeoError::Denied)).boxed()
    }
}

/// No capability on this platform.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedGeolocator;

impl Geolocator for UnsupportedGeolocator {
    fn is_supported(&self) -> bool {
        false
    }

    fn current_position(&self) -> BoxFuture<'static, Result<Coordinates, GeoError>> {
        future::ready(Err(GeoError::Unavailable("not supported".to_string()))).boxed()
    }
}

pub fn from_config(config: &DetectionConfig) -> Box<dyn Geolocator> {
    match config.provider {
        GeoProvider::Fixed => Box::new(
            FixedGeolocator::new(Coordinates::new(config.latitude, config.longitude))
                .with_latency(Duration::from_millis(config.latency_ms)),
        ),
        GeoProvider::Denied => Box::new(DeniedGeolocator),
        GeoProvider::Unsupported => Box::new(UnsupportedGeolocator),
    }
}
