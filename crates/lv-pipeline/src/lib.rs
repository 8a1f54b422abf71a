//! # lv-pipeline
//!
//! Client-side list-view pipeline: filter → sort → paginate over an
//! in-memory record set, with reload planning and a debounce boundary for
//! hosts that recompute on every keystroke.
//!
//! - [`pipeline`] — the pure stages and [`pipeline::run`].
//! - [`reload`] — decides whether a query change resets the page or refetches.
//! - [`debounce`] — cancellable delayed invocation on tokio.
//! - [`host`] — a controller wiring the above to record sources.
//! - [`domain`], [`stats`], [`query::parser`] — remote filter expressions,
//!   dashboard aggregates and the text query form.

pub mod config;
pub mod debounce;
pub mod domain;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod reload;
pub mod stats;

pub use error::{PipelineError, SourceError};
pub use pipeline::{filter, paginate, run, sort, PageResult};
pub use query::{Predicate, Query, SortOrder};
pub use record::{Record, RecordId};
pub use reload::{plan_reload, ReloadPlan};
