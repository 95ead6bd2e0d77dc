//! Package resolutions for the bundler.
//!
//! Dedupes every copy of a selected package down to a single canonical copy,
//! including the parts of each copy's subtree that line up with the
//! canonical one.
//!
//! ## Usage
//!
//! ```ignore
//! use resolutions_core::dedupe::{Deduper, PackageEvent};
//! use resolutions_core::Selector;
//!
//! let deduper = Deduper::new(Selector::packages(["angular"]));
//! let mut pass = deduper.begin_pass();
//! pass.on_package(&PackageEvent::new("angular", "/app/node_modules/angular"));
//! pass.on_file(&"/app/node_modules/angular/index.js".into());
//! // ... one dependency row per module ...
//! let resolution = pass.finish();
//!
//! let mut annotator = resolution.annotator();
//! for row in sorted_rows { annotator.push(row); }
//! let rows = annotator.finish();
//! ```
//!
//! ## Phases
//!
//! 1. **Grouping** - entry modules are grouped by package name
//! 2. **Recording** - dependency rows are kept as an adjacency view
//! 3. **Resolution** - at end of stream, one canonical per group; duplicates
//!    propagate into their subtrees
//! 4. **Annotation** - sorted rows are pointed at their canonical module
//!
//! Each pass owns its state. Dropping a [`Collector`] abandons the pass.

mod annotate;
mod grouper;
mod recorder;
mod resolver;
mod rewrite;

pub use annotate::{AnnotatedRow, Annotation, SortAnnotator, SortRow};
pub use grouper::{PackageEvent, PackageGrouper};
pub use recorder::{DependencyRecorder, EdgeMap};
pub use resolver::{resolve, Resolution, ResolutionEntry, Role};
pub use rewrite::{rewrite_row, rewrite_rows, EmitForm, DUP_INDEX_KEY};

use crate::config::{Config, Selector};
use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A host event observed during the accumulation phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    /// A package manifest was loaded.
    Package(PackageEvent),
    /// A module file was discovered.
    File { id: NodeId },
    /// A module's dependencies were resolved.
    Deps {
        id: NodeId,
        #[serde(default)]
        deps: EdgeMap,
    },
}

/// Entry point for package resolutions.
///
/// Long-lived; hands out a fresh [`Collector`] for every bundling pass.
#[derive(Debug, Clone, Default)]
pub struct Deduper {
    selector: Selector,
}

impl Deduper {
    /// Create a deduper for the given packages.
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self { selector }
    }

    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Start a new pass with empty state.
    #[must_use]
    pub fn begin_pass(&self) -> Collector {
        Collector {
            grouper: PackageGrouper::new(self.selector.clone()),
            recorder: DependencyRecorder::new(),
        }
    }
}

impl From<&Config> for Deduper {
    fn from(config: &Config) -> Self {
        Self::new(config.selector.clone())
    }
}

/// Accumulates events for one pass until the dependency stream ends.
#[derive(Debug)]
pub struct Collector {
    grouper: PackageGrouper,
    recorder: DependencyRecorder,
}

impl Collector {
    pub fn on_package(&mut self, event: &PackageEvent) {
        self.grouper.observe_package(event);
    }

    pub fn on_file(&mut self, id: &NodeId) {
        self.grouper.observe_file(id);
    }

    pub fn on_dependencies(&mut self, id: NodeId, deps: EdgeMap) {
        self.recorder.record(id, deps);
    }

    /// Dispatch a single event.
    pub fn ingest(&mut self, event: Event) {
        match event {
            Event::Package(package) => self.on_package(&package),
            Event::File { id } => self.on_file(&id),
            Event::Deps { id, deps } => self.on_dependencies(id, deps),
        }
    }

    /// End of the dependency stream: resolve everything collected.
    #[must_use]
    pub fn finish(self) -> Resolution {
        let Self { grouper, recorder } = self;
        let groups = grouper.into_groups(&recorder);
        let resolution = resolve(groups, recorder);
        debug!(
            canonical = resolution.canonicals().count(),
            duplicate = resolution.duplicates().count(),
            "Resolution finished"
        );
        resolution
    }
}

impl Extend<Event> for Collector {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, events: I) {
        for event in events {
            self.ingest(event);
        }
    }
}

impl Extend<SortRow> for SortAnnotator<'_> {
    fn extend<I: IntoIterator<Item = SortRow>>(&mut self, rows: I) {
        for row in rows {
            self.push(row);
        }
    }
}
