//! Schema-tolerant attribute resolution.
//!
//! Device firmware disagrees wildly about how a CO2 reading is spelled:
//! `co2`, `CO2_ppm`, `SCD41_CO2_value`, an attribute array entry named
//! "Carbon Dioxide", or a wrapper object `{value, type, observedAt}`. This
//! crate turns one raw attribute map into a `CanonicalReading` via ordered
//! alias lists, nested attribute-array lookup, and normalized fuzzy key
//! matching. Resolution never fails; an unresolvable field is simply null.
//!
//! Also owns the per-device snapshot history used for inter-cycle deltas.

pub mod aliases;
pub mod extract;
pub mod history;
pub mod resolver;
pub mod timestamp;

pub use history::SnapshotHistory;
pub use resolver::resolve_reading;
