//! Sales analytics core.
//!
//! Pipeline: raw rows -> normalized sales -> product/agent/client tables
//! -> totals and a day-bucketed revenue series. Decoding, the default
//! dataset source and presentation views sit at the edges.

pub mod aggregate;
pub mod decode;
pub mod format;
pub mod normalize;
pub mod record;
pub mod source;
pub mod state;
pub mod stats;
pub mod timeseries;
pub mod views;

pub use aggregate::{aggregate, AgentSummary, Aggregation, Aggregator, ClientSummary, ProductSummary};
pub use decode::{decode_bytes, DecodeError, InputFormat};
pub use normalize::{Field, NormalizedSale, UNKNOWN};
pub use record::{CellValue, RawRecord};
pub use source::{load_default, DefaultSource, SourceError};
pub use state::{AppState, Snapshot};
pub use stats::{calculate_stats, StatsSummary};
pub use timeseries::{revenue_by_date, DateBucket};
