//! Recorded bundler event traces.
//!
//! A trace captures everything one pass sees from the host: the selector,
//! the package/file/dependency events in arrival order, and optionally the
//! sorted rows. Traces drive the CLI and the fixture tests.

use crate::config::Selector;
use crate::dedupe::{rewrite_row, AnnotatedRow, Deduper, EmitForm, Event, Resolution, SortRow};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// A recorded pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// Packages to dedupe.
    #[serde(default)]
    pub selector: Selector,
    /// Events in arrival order.
    #[serde(default)]
    pub events: Vec<Event>,
    /// Rows in sorted order, if the trace reaches the sort stage.
    #[serde(default)]
    pub sorted: Option<Vec<SortRow>>,
}

/// A sorted row after annotation and rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedRow {
    #[serde(flatten)]
    pub annotated: AnnotatedRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<EmitForm>,
}

/// Outcome of replaying a trace.
#[derive(Debug)]
pub struct TraceOutcome {
    pub resolution: Resolution,
    pub rows: Option<Vec<EmittedRow>>,
}

impl Trace {
    /// Load a trace from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path).map_err(|source| Error::TraceRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::TraceParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replay the trace as one pass.
    #[must_use]
    pub fn run(&self) -> TraceOutcome {
        let deduper = Deduper::new(self.selector.clone());
        let mut pass = deduper.begin_pass();
        pass.extend(self.events.iter().cloned());
        let resolution = pass.finish();

        let rows = self.sorted.as_ref().map(|sorted| {
            let mut annotator = resolution.annotator();
            annotator.extend(sorted.iter().cloned());
            annotator
                .finish()
                .into_iter()
                .map(|mut annotated| {
                    let form = rewrite_row(&resolution, &mut annotated.row);
                    EmittedRow { annotated, form }
                })
                .collect::<Vec<_>>()
        });

        info!(
            events = self.events.len(),
            resolved = resolution.len(),
            rows = rows.as_ref().map_or(0, Vec::len),
            "Replayed trace"
        );

        TraceOutcome { resolution, rows }
    }
}
