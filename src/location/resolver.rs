//! Link resolver: orchestrates the resolution pipeline.
//!
//! Flow: normalize → (short link? resolve, keep original as fallback) →
//! pattern matcher → (no match? place name → forward geocode) → validate →
//! reverse geocode for a display name.
//!
//! The resolver holds no mutable state; one instance can serve any number of
//! concurrent calls.

use super::normalize::normalize;
use super::patterns::{Extraction, PatternTable};
use super::place_name::extract_location_name;
use super::providers::{Geocoder, GeocodingAdapter, NominatimGeocoder};
use super::shortlink::{is_short_link, LinkFetcher, ShortLinkResolver, UreqFetcher};
use super::types::{
    Coordinates, NamedCoordinates, ResolutionResult, ResolutionSource, ResolveError, ResolveOptions,
    ResolvedLink,
};
use crate::config::ResolverConfig;
use std::sync::Arc;
use tracing::{debug, info};

/// The link resolver with its fallback pipeline.
#[derive(Clone)]
pub struct LinkResolver {
    patterns: PatternTable,
    short_links: ShortLinkResolver,
    geocoding: GeocodingAdapter,
    offline: bool,
}

/// Where the active URL came from and what it carries besides coordinates.
struct LinkContext {
    resolved_url: Option<String>,
    query_name: Option<String>,
}

impl LinkResolver {
    /// Resolver backed by `ureq` and Nominatim, configured from `config`.
    pub fn new(config: &ResolverConfig) -> Self {
        Self::with_providers(
            config,
            Arc::new(UreqFetcher::new(config)),
            Arc::new(NominatimGeocoder::new(config)),
        )
    }

    /// Resolver with explicit network collaborators (for testing).
    pub fn with_providers(
        config: &ResolverConfig,
        fetcher: Arc<dyn LinkFetcher>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            patterns: PatternTable::standard(),
            short_links: ShortLinkResolver::new(fetcher, config.relays.clone()),
            geocoding: GeocodingAdapter::new(geocoder),
            offline: config.offline,
        }
    }

    /// Replace the coordinate pattern table.
    pub fn with_patterns(mut self, patterns: PatternTable) -> Self {
        self.patterns = patterns;
        self
    }

    /// Offline mode: pattern extraction only, no network calls.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Resolve pasted input with default options.
    pub fn resolve(&self, raw: &str) -> ResolutionResult {
        self.resolve_with_opts(raw, &ResolveOptions::default())
    }

    pub fn resolve_with_opts(&self, raw: &str, opts: &ResolveOptions) -> ResolutionResult {
        // 1. Normalize
        let input = normalize(raw);
        if input.is_empty() {
            return Err(ResolveError::EmptyInput);
        }
        debug!(%input, "resolving link");

        // 2. Short links: resolve, keeping the original as a fallback target
        let (active, original) = if is_short_link(&input) {
            (self.expand_short_link(&input)?, Some(input.as_str()))
        } else {
            (input.clone(), None)
        };

        let ctx = LinkContext {
            resolved_url: original.map(|_| active.clone()),
            query_name: extract_location_name(&active),
        };

        // 3. Pattern matcher on the active URL, then the original input
        let mut source = if original.is_some() {
            ResolutionSource::ShortLink
        } else {
            ResolutionSource::Pattern
        };
        let mut extraction = self.patterns.extract(&active);
        if let Some(original) = original.filter(|_| extraction.coordinates().is_none()) {
            if let found @ Extraction::Found { .. } = self.patterns.extract(original) {
                debug!(%original, "coordinates found in original short link");
                extraction = found;
                source = ResolutionSource::Pattern;
            }
        }

        match extraction {
            // 4. Found and valid
            Extraction::Found { coordinates, pattern } => {
                return Ok(self.finish(coordinates, source, Some(pattern), ctx, opts));
            }
            // 5. Found but out of range
            Extraction::OutOfRange { lat, lng, pattern } => {
                info!(lat, lng, pattern, "extracted coordinates out of range");
                return Err(ResolveError::CoordinatesOutOfRange { lat, lng });
            }
            Extraction::NoMatch => {}
        }

        // 6. Place name → forward geocoding
        let name = ctx.query_name.clone().or_else(|| {
            (opts.geocode_free_text && !looks_like_url(&input)).then(|| input.clone())
        });

        // 7. Nothing to go on
        let Some(name) = name else {
            return Err(ResolveError::NoCoordinatesOrName {
                resolved_url: ctx.resolved_url,
            });
        };

        if self.offline {
            debug!(%name, "offline: skipping forward geocoding");
            return Err(ResolveError::GeocodeNotFound { name });
        }

        match self.geocoding.lookup(&name) {
            Some((lat, lng)) => match Coordinates::new(lat, lng) {
                Some(coordinates) => {
                    let ctx = LinkContext {
                        query_name: Some(name),
                        ..ctx
                    };
                    Ok(self.finish(coordinates, ResolutionSource::Geocoder, None, ctx, opts))
                }
                None => Err(ResolveError::CoordinatesOutOfRange { lat, lng }),
            },
            None => Err(ResolveError::GeocodeNotFound { name }),
        }
    }

    fn expand_short_link(&self, url: &str) -> Result<String, ResolveError> {
        if self.offline {
            debug!(%url, "offline: cannot expand short link");
            return Err(ResolveError::ShortLinkUnresolvable {
                url: url.to_string(),
                blocked: false,
            });
        }
        self.short_links
            .resolve(url)
            .map_err(|e| ResolveError::ShortLinkUnresolvable {
                url: url.to_string(),
                blocked: e.is_blocked(),
            })
    }

    // 8. Attach a display name. Reverse geocoding never downgrades the result.
    fn finish(
        &self,
        coordinates: Coordinates,
        source: ResolutionSource,
        pattern: Option<&'static str>,
        ctx: LinkContext,
        opts: &ResolveOptions,
    ) -> ResolvedLink {
        let location_name = if opts.reverse_geocode && !self.offline {
            Some(
                self.geocoding
                    .reverse_geocode(coordinates.latitude(), coordinates.longitude()),
            )
        } else {
            ctx.query_name.clone()
        };

        info!(%coordinates, %source, "link resolved");
        ResolvedLink {
            place: NamedCoordinates {
                coordinates,
                location_name,
            },
            source,
            pattern,
            resolved_url: ctx.resolved_url,
            query_name: ctx.query_name,
            resolved_at: chrono::Utc::now(),
        }
    }
}

fn looks_like_url(input: &str) -> bool {
    input.contains("://") || input.contains('/') || input.starts_with("www.")
}
