use uuid::Uuid;

pub mod activity_logs;
pub mod agents;
pub mod verification_requests;
pub mod verification_tier;
pub mod verification_type;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
