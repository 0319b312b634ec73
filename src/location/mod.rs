//! Link resolution subsystem.
//!
//! Turns pasted map links, short links and place-name URLs into validated
//! coordinates with a best-effort display name.

pub mod normalize;
pub mod patterns;
pub mod place_name;
pub mod providers;
pub mod resolver;
pub mod shortlink;
pub mod types;

pub use normalize::normalize;
pub use patterns::{extract_coordinates, Extraction, PatternTable};
pub use place_name::extract_location_name;
pub use providers::{Geocoder, GeocodingAdapter, NominatimGeocoder};
pub use resolver::LinkResolver;
pub use shortlink::{is_short_link, LinkFetcher, ShortLinkResolver, UreqFetcher};
pub use types::{
    is_valid, Coordinates, NamedCoordinates, ResolutionResult, ResolutionSource, ResolveError,
    ResolveOptions, ResolvedLink,
};
