use crate::location::LinkResolver;

/// Shared, immutable server state. The resolver needs no lock.
pub struct AppState {
    pub resolver: LinkResolver,
}
