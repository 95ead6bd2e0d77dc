#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod dedupe;
pub mod error;
pub mod ids;
pub mod trace;
pub mod version;

pub use config::{Config, Selector};
pub use dedupe::{
    AnnotatedRow, Annotation, Collector, Deduper, EdgeMap, EmitForm, Event, PackageEvent,
    Resolution, Role, SortRow,
};
pub use error::Error;
pub use ids::{NodeId, PackageName, PositionIndex, Target};
pub use trace::{EmittedRow, Trace, TraceOutcome};
pub use version::VERSION;
