/// Opaque token naming one map-viewing session. Generated by the registry,
/// but the gateway also sees client-supplied values taken from the request path.
pub type SessionId = String;

/// Routing policy forwarded to the map provider. Only driving routes use it.
pub type Policy = i64;

pub const MIN_POINTS: usize = 2;
