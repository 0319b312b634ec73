//! Geocoding adapter: forward and reverse lookups against Nominatim.
//!
//! Transport and HTTP failures stop here. Forward lookups turn them into
//! `None`; reverse lookups fall back to a plain coordinate label.

use super::types::Coordinates;
use crate::config::ResolverConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

// ─── Provider boundary ──────────────────────────────────────────

/// One forward-search candidate. Coordinates arrive as decimal strings.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SearchHit {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Structured address components of a reverse lookup. Any may be absent.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AddressParts {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub house_number: Option<String>,
    #[serde(default)]
    pub road: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ReverseHit {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Option<AddressParts>,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Geocoder returned HTTP {0}")]
    Status(u16),
    #[error("Invalid geocoder response: {0}")]
    InvalidResponse(String),
}

/// A place-search service.
pub trait Geocoder: Send + Sync {
    /// Ordered candidates for a free-text query, best first.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, GeocodeError>;

    /// Address details for a coordinate pair.
    fn reverse(&self, lat: f64, lng: f64) -> Result<ReverseHit, GeocodeError>;
}

// ─── Nominatim provider ─────────────────────────────────────────

pub struct NominatimGeocoder {
    agent: ureq::Agent,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &ResolverConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            base_url: config.nominatim_url.trim_end_matches('/').to_string(),
        }
    }

    fn call<T: serde::de::DeserializeOwned>(&self, request: ureq::Request) -> Result<T, GeocodeError> {
        let response = request
            .set("Accept", "application/json")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => GeocodeError::Status(code),
                ureq::Error::Transport(t) => GeocodeError::Network(t.to_string()),
            })?;
        response
            .into_json()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))
    }
}

impl Geocoder for NominatimGeocoder {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, GeocodeError> {
        let request = self
            .agent
            .get(&format!("{}/search", self.base_url))
            .query("q", query)
            .query("format", "json")
            .query("limit", &limit.to_string());
        self.call(request)
    }

    fn reverse(&self, lat: f64, lng: f64) -> Result<ReverseHit, GeocodeError> {
        let request = self
            .agent
            .get(&format!("{}/reverse", self.base_url))
            .query("lat", &lat.to_string())
            .query("lon", &lng.to_string())
            .query("format", "json")
            .query("addressdetails", "1")
            .query("zoom", "18");
        self.call(request)
    }
}

// ─── Adapter ────────────────────────────────────────────────────

/// Error-swallowing wrapper the orchestrator talks to.
#[derive(Clone)]
pub struct GeocodingAdapter {
    geocoder: Arc<dyn Geocoder>,
}

impl GeocodingAdapter {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Best-ranked raw pair for a place name, unvalidated.
    pub fn lookup(&self, name: &str) -> Option<(f64, f64)> {
        let hits = match self.geocoder.search(name, 1) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(%name, error = %e, "forward geocoding failed");
                return None;
            }
        };
        let Some(best) = hits.first() else {
            debug!(%name, "no geocoding results");
            return None;
        };
        let lat = best.lat.trim().parse::<f64>().ok()?;
        let lng = best.lon.trim().parse::<f64>().ok()?;
        debug!(%name, lat, lng, "geocoded place name");
        Some((lat, lng))
    }

    /// Forward geocode to validated coordinates. The resolver calls
    /// [`lookup`](Self::lookup) instead, since an out-of-range pair must be
    /// echoed back in its error.
    pub fn geocode(&self, name: &str) -> Option<Coordinates> {
        self.lookup(name).and_then(|(lat, lng)| Coordinates::new(lat, lng))
    }

    /// Display name for a coordinate pair. Never fails.
    pub fn reverse_geocode(&self, lat: f64, lng: f64) -> String {
        match self.geocoder.reverse(lat, lng) {
            Ok(hit) => display_name_for(&hit, lat, lng),
            Err(e) => {
                warn!(lat, lng, error = %e, "reverse geocoding unavailable");
                coordinate_label(lat, lng)
            }
        }
    }
}

fn coordinate_label(lat: f64, lng: f64) -> String {
    format!("{}, {}", lat, lng)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Build a short display name from a reverse lookup.
///
/// Preference: point name, house number + road, road, suburb, city, town,
/// village. A city (else state) suffix is appended when it is not already part
/// of the name. Without usable components, the provider's full address is cut
/// down to its leading segments.
pub fn display_name_for(hit: &ReverseHit, lat: f64, lng: f64) -> String {
    let mut name = hit
        .address
        .as_ref()
        .and_then(|addr| name_from_address(addr, non_empty(&hit.name)))
        .unwrap_or_default();

    if name.is_empty() {
        name = match non_empty(&hit.display_name) {
            Some(full) => shorten_address(full),
            None => coordinate_label(lat, lng),
        };
    }
    name
}

fn name_from_address(addr: &AddressParts, point_name: Option<&str>) -> Option<String> {
    let mut name = non_empty(&addr.name)
        .or(point_name)
        .map(str::to_string)
        .or_else(|| match (non_empty(&addr.house_number), non_empty(&addr.road)) {
            (Some(number), Some(road)) => Some(format!("{} {}", number, road)),
            _ => None,
        })
        .or_else(|| {
            [&addr.road, &addr.suburb, &addr.city, &addr.town, &addr.village]
                .into_iter()
                .find_map(non_empty)
                .map(str::to_string)
        })?;

    if let Some(city) = non_empty(&addr.city).filter(|city| !name.contains(city)) {
        name = format!("{}, {}", name, city);
    } else if let Some(state) = non_empty(&addr.state).filter(|state| !name.contains(state)) {
        name = format!("{}, {}", name, state);
    }
    Some(name)
}

/// Keep the first three `, `-separated parts of a long address.
fn shorten_address(full: &str) -> String {
    full.split(", ").take(3).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory geocoder. `None` responses simulate transport failure.
    #[derive(Default)]
    pub(crate) struct FakeGeocoder {
        pub search_hits: Option<Vec<SearchHit>>,
        pub reverse_hit: Option<ReverseHit>,
        pub queries: Mutex<Vec<String>>,
    }

    impl FakeGeocoder {
        pub(crate) fn found(lat: &str, lon: &str) -> Self {
            Self {
                search_hits: Some(vec![SearchHit { lat: lat.into(), lon: lon.into(), display_name: None }]),
                ..Default::default()
            }
        }

        pub(crate) fn with_reverse(mut self, hit: ReverseHit) -> Self {
            self.reverse_hit = Some(hit);
            self
        }
    }

    impl Geocoder for FakeGeocoder {
        fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchHit>, GeocodeError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.search_hits
                .clone()
                .ok_or_else(|| GeocodeError::Network("unreachable".into()))
        }

        fn reverse(&self, _lat: f64, _lng: f64) -> Result<ReverseHit, GeocodeError> {
            self.reverse_hit.clone().ok_or(GeocodeError::Status(503))
        }
    }

    fn address(parts: &[(&str, &str)]) -> ReverseHit {
        let json: serde_json::Map<String, serde_json::Value> = parts
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        ReverseHit {
            address: Some(serde_json::from_value(serde_json::Value::Object(json)).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_geocode_best_hit() {
        let adapter = GeocodingAdapter::new(Arc::new(FakeGeocoder::found("48.8584", "2.2945")));
        let c = adapter.geocode("Eiffel Tower").unwrap();
        approx::assert_abs_diff_eq!(c.latitude(), 48.8584);
        approx::assert_abs_diff_eq!(c.longitude(), 2.2945);
    }

    #[test]
    fn test_geocode_failures_are_none() {
        let empty = FakeGeocoder { search_hits: Some(vec![]), ..Default::default() };
        assert!(GeocodingAdapter::new(Arc::new(empty)).geocode("nowhere").is_none());

        let down = FakeGeocoder::default();
        assert!(GeocodingAdapter::new(Arc::new(down)).geocode("anywhere").is_none());

        let garbage = FakeGeocoder::found("abc", "2.0");
        assert!(GeocodingAdapter::new(Arc::new(garbage)).geocode("x").is_none());
    }

    #[test]
    fn test_geocode_rejects_out_of_range() {
        let adapter = GeocodingAdapter::new(Arc::new(FakeGeocoder::found("123.0", "2.0")));
        assert_eq!(adapter.lookup("x"), Some((123.0, 2.0)));
        assert!(adapter.geocode("x").is_none());
    }

    #[test]
    fn test_reverse_unavailable_falls_back_to_label() {
        let adapter = GeocodingAdapter::new(Arc::new(FakeGeocoder::default()));
        assert_eq!(adapter.reverse_geocode(12.9716, 77.5946), "12.9716, 77.5946");
    }

    #[test]
    fn test_display_name_preference_order() {
        let hit = address(&[("name", "Cubbon Park"), ("road", "Kasturba Road"), ("city", "Bengaluru")]);
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "Cubbon Park, Bengaluru");

        let hit = address(&[("house_number", "42"), ("road", "MG Road"), ("city", "Bengaluru")]);
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "42 MG Road, Bengaluru");

        let hit = address(&[("road", "MG Road"), ("state", "Karnataka")]);
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "MG Road, Karnataka");

        let hit = address(&[("suburb", "Jayanagar")]);
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "Jayanagar");

        let hit = address(&[("village", "Hampi"), ("state", "Karnataka")]);
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "Hampi, Karnataka");
    }

    #[test]
    fn test_city_suffix_not_duplicated() {
        let hit = address(&[("city", "Bengaluru"), ("state", "Karnataka")]);
        // Name is the city itself, so the state is appended instead.
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "Bengaluru, Karnataka");

        let hit = address(&[("town", "Karnataka Town"), ("state", "Karnataka")]);
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "Karnataka Town");
    }

    #[test]
    fn test_point_name_from_top_level() {
        let mut hit = address(&[("road", "Kasturba Road")]);
        hit.name = Some("Visvesvaraya Museum".into());
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "Visvesvaraya Museum");
    }

    #[test]
    fn test_display_name_falls_back_to_full_address() {
        let hit = ReverseHit {
            display_name: Some("Garden By Su, 9th Main Road, Jayanagar, Bengaluru, Karnataka, India".into()),
            ..Default::default()
        };
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "Garden By Su, 9th Main Road, Jayanagar");

        let hit = ReverseHit { display_name: Some("Atlantic Ocean, Earth".into()), ..Default::default() };
        assert_eq!(display_name_for(&hit, 0.0, 0.0), "Atlantic Ocean, Earth");

        let hit = ReverseHit { address: Some(AddressParts::default()), ..Default::default() };
        assert_eq!(display_name_for(&hit, 1.5, -2.25), "1.5, -2.25");
    }

    #[test]
    fn test_parses_nominatim_reverse_json() {
        let body = serde_json::json!({
            "place_id": 1,
            "lat": "12.97",
            "lon": "77.59",
            "display_name": "MG Road, Bengaluru, Karnataka, India",
            "address": { "road": "MG Road", "city": "Bengaluru", "country_code": "in" }
        });
        let hit: ReverseHit = serde_json::from_value(body).unwrap();
        assert_eq!(display_name_for(&hit, 12.97, 77.59), "MG Road, Bengaluru");
    }

    #[test]
    fn test_parses_nominatim_error_body() {
        let hit: ReverseHit = serde_json::from_value(serde_json::json!({ "error": "Unable to geocode" })).unwrap();
        assert_eq!(display_name_for(&hit, 0.5, 0.25), "0.5, 0.25");
    }
}
