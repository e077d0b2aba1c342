/// Numeric entity identifier used across the API wire contract.
pub type EntityId = i64;
