//! LocationCatalog: the fixed, ordered registry of branches.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::geo::Coordinates;
use crate::hours::OpeningHours;

/// One physical branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Stable key, unique within a catalog.
    pub id: String,
    pub name: String,
    pub address: String,
    /// Shown as-is and used for `tel:` links.
    pub phone: String,
    pub map_url: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub hours: OpeningHours,
}

impl Location {
    pub fn tel_link(&self) -> String {
        format!("tel:{}", self.phone)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("location catalog is empty")]
    Empty,
    #[error("duplicate location id: {0}")]
    DuplicateId(String),
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Immutable after construction; iteration follows declaration order.
#[derive(Debug, Clone)]
pub struct LocationCatalog {
    locations: Vec<Location>,
}

impl LocationCatalog {
    pub fn new(locations: Vec<Location>) -> Result<Self, CatalogError> {
        if locations.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for loc in &locations {
            if !seen.insert(loc.id.as_str()) {
                return Err(CatalogError::DuplicateId(loc.id.clone()));
            }
        }
        Ok(Self { locations })
    }

    /// The three branches the site ships with.
    pub fn builtin() -> Self {
        let locations = vec![
            Location {
                id: "geldrop".to_string(),
                name: "Geldrop".to_string(),
                address: "Beneden beekloop 32, 5662 HL Geldrop".to_string(),
                phone: "040-3033255".to_string(),
                map_url: "https://maps.google.com/?q=Beneden+beekloop+32+5662+HL+Geldrop"
                    .to_string(),
                coordinates: Coordinates::new(51.4210, 5.5500),
                hours: OpeningHours::default(),
            },
            Location {
                id: "heeze".to_string(),
                name: "Heeze".to_string(),
                address: "Jan Deckersstraat 45, 5591 HS Heeze".to_string(),
                phone: "040-2261135".to_string(),
                map_url: "https://maps.google.com/?q=Jan+Deckersstraat+45+5591+HS+Heeze"
                    .to_string(),
                coordinates: Coordinates::new(51.3839, 5.5697),
                hours: OpeningHours::default(),
            },
            Location {
                id: "eindhoven".to_string(),
                name: "Eindhoven (Blixembosch)".to_string(),
                address: "Ouverture 133, 5629 PV Eindhoven".to_string(),
                phone: "040-2427863".to_string(),
                map_url: "https://maps.google.com/?q=Ouverture+133+5629+PV+Eindhoven"
                    .to_string(),
                coordinates: Coordinates::new(51.4741, 5.4800),
                hours: OpeningHours::default(),
            },
        ];
        Self { locations }
    }

    pub fn get(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All entries in declaration order.
    pub fn all(&self) -> &[Location] {
        &self.locations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().map(|l| l.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// `preferred` when it names a catalog entry, otherwise the first entry.
    pub fn resolve_default<'a>(&'a self, preferred: &'a str) -> &'a str {
        if self.contains(preferred) {
            return preferred;
        }
        let first = self.locations[0].id.as_str();
        tracing::warn!(
            "default location {:?} is not in the catalog, using {:?}",
            preferred,
            first
        );
        first
    }
}

// ── TOML catalog loader ──────────────────────────────────────────────────────

/// Matches the `[[location]]` tables of a catalog file.  Kept apart from
/// `Location` so the file format can stay flat (`lat`/`lng` inline).
#[derive(Debug, serde::Deserialize)]
struct TomlCatalogFile {
    location: Vec<TomlLocation>,
}

#[derive(Debug, serde::Deserialize)]
struct TomlLocation {
    id: String,
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    map_url: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    open_hour: Option<u32>,
    #[serde(default)]
    close_hour: Option<u32>,
}

pub fn load_locations_from_toml(path: &Path) -> Result<LocationCatalog, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    parse_locations_from_toml_str(&content)
}

pub fn parse_locations_from_toml_str(content: &str) -> Result<LocationCatalog, CatalogError> {
    let file: TomlCatalogFile = toml::from_str(content)?;
    let locations = file
        .location
        .into_iter()
        .map(|l| {
            let defaults = OpeningHours::default();
            Location {
                id: l.id,
                name: l.name,
                address: l.address,
                phone: l.phone,
                map_url: l.map_url,
                coordinates: Coordinates::new(l.lat, l.lng),
                hours: OpeningHours {
                    open_hour: l.open_hour.unwrap_or(defaults.open_hour),
                    close_hour: l.close_hour.unwrap_or(defaults.close_hour),
                },
            }
        })
        .collect();
    LocationCatalog::new(locations)
}
