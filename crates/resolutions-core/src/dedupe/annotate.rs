//! Sort-stage annotation.
//!
//! Points duplicate rows at their canonical module and clears the host's own
//! dedupe annotation on canonical rows so it cannot close a cycle.

use super::recorder::EdgeMap;
use super::resolver::Resolution;
use crate::ids::{NodeId, PositionIndex};
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A row of the host's topologically sorted output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRow {
    /// Module identity.
    pub id: NodeId,
    /// Position in the sorted output.
    pub index: PositionIndex,
    /// The row's dependencies, as the host sees them.
    #[serde(default)]
    pub deps: EdgeMap,
    /// Dependency positions, by specifier.
    #[serde(default)]
    pub index_deps: BTreeMap<String, PositionIndex>,
    /// Module this row is deduped to.
    #[serde(default)]
    pub dedupe: Option<NodeId>,
    /// Position of the module this row is deduped to.
    #[serde(default)]
    pub dedupe_index: Option<PositionIndex>,
    /// Replacement source, set when the row is rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Suppress the source map for this row.
    #[serde(default)]
    pub nomap: bool,
}

impl SortRow {
    /// A bare row with no dependencies and no dedupe information.
    pub fn new(id: impl Into<NodeId>, index: usize) -> Self {
        Self {
            id: id.into(),
            index: PositionIndex(index),
            deps: EdgeMap::new(),
            index_deps: BTreeMap::new(),
            dedupe: None,
            dedupe_index: None,
            source: None,
            nomap: false,
        }
    }
}

/// What the annotator did to a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// The row is a duplicate and now points at its canonical module.
    Duplicate {
        target: NodeId,
        target_index: Option<PositionIndex>,
        reexport_eligible: bool,
    },
    /// The row is canonical; `cleared_default_dedupe` tells whether a host
    /// annotation was removed.
    Canonical { cleared_default_dedupe: bool },
    /// The row took no part in dedupe.
    Untouched,
}

/// A sorted row together with its annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedRow {
    pub row: SortRow,
    pub annotation: Annotation,
}

/// Buffers sorted rows until the full order is known, then annotates them.
#[derive(Debug)]
pub struct SortAnnotator<'a> {
    resolution: &'a Resolution,
    index: HashMap<NodeId, PositionIndex>,
    rows: Vec<SortRow>,
}

impl<'a> SortAnnotator<'a> {
    #[must_use]
    pub fn new(resolution: &'a Resolution) -> Self {
        Self {
            resolution,
            index: HashMap::default(),
            rows: Vec::new(),
        }
    }

    /// Accept the next sorted row.
    pub fn push(&mut self, row: SortRow) {
        self.index.insert(row.id.clone(), row.index);
        self.rows.push(row);
    }

    /// Position of a module in the order seen so far.
    #[must_use]
    pub fn position(&self, id: &NodeId) -> Option<PositionIndex> {
        self.index.get(id).copied()
    }

    /// Annotate every buffered row, in arrival order.
    #[must_use]
    pub fn finish(self) -> Vec<AnnotatedRow> {
        let Self {
            resolution,
            index,
            rows,
        } = self;

        rows.into_iter()
            .map(|mut row| {
                let annotation = annotate_row(resolution, &index, &mut row);
                AnnotatedRow { row, annotation }
            })
            .collect()
    }
}

fn annotate_row(
    resolution: &Resolution,
    index: &HashMap<NodeId, PositionIndex>,
    row: &mut SortRow,
) -> Annotation {
    if let Some(target) = resolution.duplicate_target(&row.id) {
        let target_index = index.get(target).copied();
        let deps = if row.deps.is_empty() {
            resolution.edges(&row.id).unwrap_or(&row.deps)
        } else {
            &row.deps
        };
        let reexport_eligible = resolution.reexport_eligible(target, deps);

        row.dedupe = Some(target.clone());
        row.dedupe_index = target_index;

        return Annotation::Duplicate {
            target: target.clone(),
            target_index,
            reexport_eligible,
        };
    }

    if resolution.is_canonical(&row.id) {
        let cleared_default_dedupe = row.dedupe.is_some() || row.dedupe_index.is_some();
        row.dedupe = None;
        row.dedupe_index = None;
        if cleared_default_dedupe {
            debug!(node = %row.id, "Cleared default dedupe on canonical module");
        }
        return Annotation::Canonical {
            cleared_default_dedupe,
        };
    }

    Annotation::Untouched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedupe::recorder::DependencyRecorder;
    use crate::dedupe::resolver::resolve;
    use crate::ids::{PackageName, Target};

    fn resolution() -> Resolution {
        let mut graph = DependencyRecorder::new();
        let mut x = EdgeMap::new();
        x.insert("./u".to_string(), Target::from("/long/u.js"));
        x.insert("fs".to_string(), Target::External);
        graph.record("/long/x.js".into(), x);
        let mut y = EdgeMap::new();
        y.insert("./u".to_string(), Target::from("/u.js"));
        graph.record("/y.js".into(), y);
        graph.record("/long/u.js".into(), EdgeMap::new());

        resolve(
            vec![(
                PackageName::from("p"),
                vec!["/long/x.js".into(), "/y.js".into()],
            )],
            graph,
        )
    }

    #[test]
    fn test_duplicate_points_at_target_position() {
        let resolution = resolution();
        let mut annotator = resolution.annotator();
        annotator.push(SortRow::new("/long/u.js", 0));
        annotator.push(SortRow::new("/long/x.js", 1));
        annotator.push(SortRow::new("/u.js", 2));
        annotator.push(SortRow::new("/y.js", 3));

        let rows = annotator.finish();
        assert_eq!(rows[1].row.dedupe, Some(NodeId::from("/y.js")));
        assert_eq!(rows[1].row.dedupe_index, Some(PositionIndex(3)));
        // x depends on an external module, so it cannot re-export
        assert_eq!(
            rows[1].annotation,
            Annotation::Duplicate {
                target: "/y.js".into(),
                target_index: Some(PositionIndex(3)),
                reexport_eligible: false,
            }
        );
        // u has no dependencies of its own
        assert_eq!(
            rows[0].annotation,
            Annotation::Duplicate {
                target: "/u.js".into(),
                target_index: Some(PositionIndex(2)),
                reexport_eligible: true,
            }
        );
    }

    #[test]
    fn test_canonical_default_dedupe_cleared() {
        let resolution = resolution();
        let mut annotator = resolution.annotator();
        let mut row = SortRow::new("/y.js", 0);
        row.dedupe = Some("/long/x.js".into());
        row.dedupe_index = Some(PositionIndex(1));
        annotator.push(row);
        annotator.push(SortRow::new("/long/x.js", 1));

        let rows = annotator.finish();
        assert_eq!(rows[0].row.dedupe, None);
        assert_eq!(rows[0].row.dedupe_index, None);
        assert_eq!(
            rows[0].annotation,
            Annotation::Canonical {
                cleared_default_dedupe: true
            }
        );
    }

    #[test]
    fn test_unrelated_row_untouched() {
        let resolution = resolution();
        let mut annotator = resolution.annotator();
        let mut row = SortRow::new("/app.js", 0);
        row.dedupe = Some("/other.js".into());
        annotator.push(row.clone());

        let rows = annotator.finish();
        assert_eq!(rows[0].annotation, Annotation::Untouched);
        assert_eq!(rows[0].row, row);
    }

    #[test]
    fn test_row_deps_take_precedence() {
        let resolution = resolution();
        let mut annotator = resolution.annotator();
        let mut row = SortRow::new("/long/x.js", 0);
        row.deps.insert("./u".to_string(), Target::from("/long/u.js"));
        annotator.push(row);

        let rows = annotator.finish();
        assert!(matches!(
            rows[0].annotation,
            Annotation::Duplicate {
                reexport_eligible: true,
                target_index: None,
                ..
            }
        ));
    }
}
