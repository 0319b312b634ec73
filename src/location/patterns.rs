//! Coordinate pattern matcher.
//!
//! An ordered, immutable [`PatternTable`] of provider-specific extractors,
//! most specific first, ending in a bare `<number>,<number>` pattern. When the
//! table yields nothing valid, a bounded-digit decimal scan runs over the whole
//! string. Every candidate goes through the coordinate validator before it can
//! be returned.

use super::types::Coordinates;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Integer or decimal coordinate component. ASCII digits only.
const NUM: &str = r"(-?[0-9]+(?:\.[0-9]+)?)";
/// Pair separator: a literal comma or its percent-encoded form.
const SEP: &str = r"(?:,|%2[Cc])";

/// Name reported for matches found by the decimal scan.
pub const FALLBACK_PATTERN: &str = "decimal_scan";

/// The ordered pattern list, as `(name, template)`. `{n}` is a captured
/// number, `{sep}` a pair separator. Order matters: generic entries can hit
/// incidental numbers (zoom levels, place ids) in URLs a specific entry
/// understands, so they come last.
const STANDARD_SPECS: &[(&str, &str)] = &[
    // Google Maps
    ("google_q", r"maps\.google\.com/maps\?q={n}{sep}{n}"),
    ("google_ll", r"maps\.google\.com/maps\?ll={n}{sep}{n}"),
    ("google_daddr", r"maps\.google\.com/maps\?daddr={n}{sep}{n}"),
    ("google_saddr", r"maps\.google\.com/maps\?saddr={n}{sep}{n}"),
    ("google_cid_at", r"maps\.google\.com/maps\?cid=.*?@{n},{n}"),
    ("google_host_at", r"maps\.google\.com.*?@{n},{n}"),
    ("google_maps_at", r"google\.com/maps.*?@{n},{n}"),
    ("google_place_path", r"google\.com/maps/place/.*?/{n}{sep}{n}"),
    ("google_root_q", r"maps\.google\.com/\?q={n}{sep}{n}"),
    ("google_maps_q", r"google\.com/maps\?q={n}{sep}{n}"),
    // Apple Maps
    ("apple_ll", r"maps\.apple\.com/\?ll={n}{sep}{n}"),
    ("apple_daddr", r"maps\.apple\.com/\?daddr={n}{sep}{n}"),
    ("apple_saddr", r"maps\.apple\.com/\?saddr={n}{sep}{n}"),
    ("apple_place_coordinate", r"maps\.apple\.com/place\?.*?coordinate={n}{sep}{n}"),
    // Bing
    ("bing_cp", r"bing\.com/maps.*?cp={n}~{n}"),
    ("bing_sp", r"bing\.com/maps.*?sp={n}{sep}{n}"),
    // OpenStreetMap
    ("osm_marker", r"openstreetmap\.org.*?mlat={n}.*?mlon={n}"),
    ("osm_lat_lon", r"openstreetmap\.org.*?lat={n}.*?lon={n}"),
    // Here / Waze
    ("here_map", r"here\.com.*?map={n}{sep}{n}"),
    ("waze_ll", r"waze\.com.*?ll={n}{sep}{n}"),
    // Provider-agnostic parameters
    ("at_pair", r"@{n},{n}"),
    ("q_param", r"q={n}{sep}{n}"),
    ("ll_param", r"ll={n}{sep}{n}"),
    ("coordinate_param", r"coordinate={n}{sep}{n}"),
    ("lat_lng_params", r"lat={n}.*?lng={n}"),
    ("latitude_longitude_params", r"latitude={n}.*?longitude={n}"),
    ("daddr_param", r"daddr={n}{sep}{n}"),
    ("saddr_param", r"saddr={n}{sep}{n}"),
    // Anything shaped like a pair. Must stay last.
    ("bare_pair", r"{n},{n}"),
];

/// Patterns loose enough to hit incidental numbers (ids, tracking params).
/// An out-of-range hit from one of these is noise, not a rejected coordinate.
const GENERIC_PATTERNS: &[&str] = &["bare_pair"];

static STANDARD: LazyLock<PatternTable> = LazyLock::new(|| {
    PatternTable::from_templates(STANDARD_SPECS).expect("standard coordinate patterns compile")
});

// The leading group keeps the scan from starting inside a longer number.
static DECIMAL_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9.\-])(-?[0-9]{1,2}\.[0-9]+),(-?[0-9]{1,3}\.[0-9]+)")
        .expect("valid decimal scan regex")
});

/// One named extractor. The regex has exactly two capture groups: lat, lng.
#[derive(Debug, Clone)]
pub struct CoordinatePattern {
    pub name: &'static str,
    regex: Regex,
    generic: bool,
}

/// Outcome of running the matcher over one string.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Found {
        coordinates: Coordinates,
        pattern: &'static str,
    },
    /// A pattern matched, but nothing that matched was a valid coordinate.
    /// Carries the first rejected candidate.
    OutOfRange {
        lat: f64,
        lng: f64,
        pattern: &'static str,
    },
    NoMatch,
}

impl Extraction {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Found { coordinates, .. } => Some(*coordinates),
            _ => None,
        }
    }
}

/// Immutable ordered list of coordinate extractors.
#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: Vec<CoordinatePattern>,
}

impl PatternTable {
    /// The built-in table covering Google, Apple, Bing, OSM, Here and Waze.
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// Build a table from `(name, template)` pairs, in order. Templates use
    /// `{n}` for a captured number and `{sep}` for a pair separator.
    pub fn from_templates(specs: &[(&'static str, &str)]) -> Result<Self, regex::Error> {
        let patterns = specs
            .iter()
            .map(|&(name, template)| {
                let source = template.replace("{n}", NUM).replace("{sep}", SEP);
                Ok(CoordinatePattern {
                    name,
                    regex: Regex::new(&source)?,
                    generic: GENERIC_PATTERNS.contains(&name),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.patterns.iter().map(|p| p.name)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Run every pattern in order, then the decimal scan. Only a specific
    /// pattern's out-of-range hit is reported as [`Extraction::OutOfRange`].
    pub fn extract(&self, url: &str) -> Extraction {
        let mut rejected: Option<(f64, f64, &'static str)> = None;

        for pattern in &self.patterns {
            let Some(caps) = pattern.regex.captures(url) else {
                continue;
            };
            let Some((lat, lng)) = parse_pair(caps.get(1), caps.get(2)) else {
                continue;
            };
            if let Some(coordinates) = Coordinates::new(lat, lng) {
                debug!(pattern = pattern.name, lat, lng, "coordinate pattern matched");
                return Extraction::Found {
                    coordinates,
                    pattern: pattern.name,
                };
            }
            debug!(pattern = pattern.name, lat, lng, "pattern matched out-of-range pair");
            if !pattern.generic {
                rejected.get_or_insert((lat, lng, pattern.name));
            }
        }

        for caps in DECIMAL_SCAN.captures_iter(url) {
            let Some((lat, lng)) = parse_pair(caps.get(1), caps.get(2)) else {
                continue;
            };
            if let Some(coordinates) = Coordinates::new(lat, lng) {
                debug!(lat, lng, "decimal scan matched");
                return Extraction::Found {
                    coordinates,
                    pattern: FALLBACK_PATTERN,
                };
            }
        }

        match rejected {
            Some((lat, lng, pattern)) => Extraction::OutOfRange { lat, lng, pattern },
            None => Extraction::NoMatch,
        }
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn parse_pair(lat: Option<regex::Match<'_>>, lng: Option<regex::Match<'_>>) -> Option<(f64, f64)> {
    let lat = lat?.as_str().parse::<f64>().ok()?;
    let lng = lng?.as_str().parse::<f64>().ok()?;
    Some((lat, lng))
}

/// Extract valid coordinates with the standard table.
pub fn extract_coordinates(url: &str) -> Option<Coordinates> {
    STANDARD.extract(url).coordinates()
}
