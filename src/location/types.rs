//! Core types for the link resolution pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const LAT_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
pub const LNG_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// True when `lat`/`lng` fall inside the geographic domain.
///
/// NaN is rejected because it is never contained in a range.
pub fn is_valid(lat: f64, lng: f64) -> bool {
    LAT_RANGE.contains(&lat) && LNG_RANGE.contains(&lng)
}

/// A validated latitude/longitude pair.
///
/// Only constructible through [`Coordinates::new`], so every value in
/// circulation is inside the valid domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        is_valid(latitude, longitude).then_some(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Plain `"<lat>, <lng>"` label used when no better name exists.
    pub fn label(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Coordinates plus a best-effort human readable name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCoordinates {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

/// How a link was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Coordinates read straight out of the pasted text.
    Pattern,
    /// Coordinates read out of the URL a short link redirected to.
    ShortLink,
    /// Coordinates obtained by forward geocoding a place name.
    Geocoder,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => write!(f, "Link"),
            Self::ShortLink => write!(f, "Short link"),
            Self::Geocoder => write!(f, "Geocoder"),
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLink {
    #[serde(flatten)]
    pub place: NamedCoordinates,
    pub source: ResolutionSource,
    /// Name of the coordinate pattern that matched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<&'static str>,
    /// Final URL a short link redirected to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
    /// Place name found in the URL itself (query parameter or path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_name: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedLink {
    pub fn coordinates(&self) -> Coordinates {
        self.place.coordinates
    }

    pub fn display_line(&self) -> String {
        let name = self
            .place
            .location_name
            .as_deref()
            .or(self.query_name.as_deref())
            .unwrap_or("Unnamed location");
        format!("{} ({}) via {}", name, self.place.coordinates, self.source)
    }
}

/// Per-call switches for the orchestrator.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Treat input that is not a URL as a place name and geocode it.
    pub geocode_free_text: bool,
    /// Look up a display name for the final coordinates.
    pub reverse_geocode: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            geocode_free_text: false,
            reverse_geocode: true,
        }
    }
}

/// Every way a resolution can fail. Each variant renders one actionable message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Please paste a location link first.")]
    EmptyInput,

    #[error("{}", short_link_message(url, *blocked))]
    ShortLinkUnresolvable { url: String, blocked: bool },

    #[error("{}", no_coordinates_message(resolved_url.as_deref()))]
    NoCoordinatesOrName { resolved_url: Option<String> },

    #[error(
        "Invalid coordinates: Latitude ({lat}) must be between -90 and 90, \
         Longitude ({lng}) must be between -180 and 180."
    )]
    CoordinatesOutOfRange { lat: f64, lng: f64 },

    #[error("Could not find coordinates for '{name}'. Please try a different link or location name.")]
    GeocodeNotFound { name: String },
}

impl ResolveError {
    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::ShortLinkUnresolvable { .. } => "short_link_unresolvable",
            Self::NoCoordinatesOrName { .. } => "no_coordinates_or_name",
            Self::CoordinatesOutOfRange { .. } => "coordinates_out_of_range",
            Self::GeocodeNotFound { .. } => "geocode_not_found",
        }
    }
}

fn short_link_message(url: &str, blocked: bool) -> String {
    if blocked {
        format!(
            "The short link {} appears to be blocked or restricted. \
             Please paste the full map link instead.",
            url
        )
    } else {
        format!(
            "Could not resolve the short link {}. Please paste the full map link instead.",
            url
        )
    }
}

fn no_coordinates_message(resolved_url: Option<&str>) -> String {
    match resolved_url {
        Some(url) => format!(
            "Short link resolved to {} but no coordinates or location name were found. \
             Please paste the full map link.",
            url
        ),
        None => "Could not extract coordinates or location name from the link. \
                 Please paste a valid Google Maps or Apple Maps link."
            .to_string(),
    }
}

/// The sole externally visible outcome of one resolution.
pub type ResolutionResult = Result<ResolvedLink, ResolveError>;
