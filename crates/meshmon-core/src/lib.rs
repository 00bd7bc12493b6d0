//! State aggregation and staleness rendering for a mesh telemetry dashboard.
//!
//! Raw feed messages are decoded into [`Record`]s, folded into a
//! last-write-wins [`AggregationStore`] keyed by sender and message type, and
//! projected into a sorted [`DashboardView`] whose ages are bucketed by
//! [`classify`].

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod record;
pub mod staleness;
pub mod store;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DisplayConfig, FeedConfig, MonitorConfig};
pub use driver::{DriverState, RenderDriver, RenderSink};
pub use error::{ConfigError, DecodeError, IngestError, RenderError};
pub use record::{decode, FieldValue, Fields, IgnoreSet, Record};
pub use staleness::{classify, Urgency};
pub use store::{AggregationStore, NodeEntry, StoreSnapshot};
pub use view::{build_view, Age, BodyLine, DashboardView, DetailRow, NodeSummary};
