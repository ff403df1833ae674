//! Vehicle registry: raw records in, immutable snapshots out.
//!
//! - [`parse_raw_trips`] — lenient JSON decoding at the source boundary
//! - [`RegistryBuilder`] — normalization into [`Vehicle`](crate::models::Vehicle) entities
//! - [`RegistrySnapshot`] — the immutable set shared with the tick loop
//! - [`DelayLedger`] — injected delays carried across refreshes

mod ledger;
mod normalize;
mod raw;
mod snapshot;

pub use ledger::DelayLedger;
pub(crate) use normalize::offset_from_hours;
pub use normalize::{
    build_registry, is_arrived_status, parse_duration, parse_timestamp, RegistryBuilder,
    DEFAULT_DURATION_SEC, MIN_DURATION_SEC,
};
pub use raw::{parse_raw_trips, RawDuration, RawTimestamp, RawTrip};
pub use snapshot::{RegistrySnapshot, SourceMode};
