//! Source rewriting for deduped rows.
//!
//! A duplicate either re-exports its canonical module, reusing the instance
//! that already ran, or calls the canonical module's factory again the way
//! the host's default dedupe does.

use super::annotate::SortRow;
use super::resolver::Resolution;
use serde::Serialize;
use serde_json::Value;

/// Key under which the dedupe position is added to a row's index deps.
pub const DUP_INDEX_KEY: &str = "dup";

/// How a deduped row is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitForm {
    /// `module.exports = require(id);`
    ReExport,
    /// Invoke the canonical module's factory with this row's arguments.
    FactoryCall,
}

impl EmitForm {
    /// Source text for a row deduped to `id` (already JSON encoded).
    #[must_use]
    pub fn source(self, id: &str) -> String {
        match self {
            Self::ReExport => format!("module.exports = require({id});"),
            Self::FactoryCall => format!("arguments[4][{id}][0].apply(exports,arguments)"),
        }
    }
}

/// Rewrite a row that carries a dedupe annotation.
///
/// Returns `None` and leaves the row untouched when it has none.
pub fn rewrite_row(resolution: &Resolution, row: &mut SortRow) -> Option<EmitForm> {
    let id = match (row.dedupe_index, &row.dedupe) {
        (Some(index), _) => Value::from(index.0),
        (None, Some(target)) => Value::String(target.as_str().to_string()),
        (None, None) => return None,
    };

    let deps = if row.deps.is_empty() {
        resolution.edges(&row.id).unwrap_or(&row.deps)
    } else {
        &row.deps
    };
    let form = match &row.dedupe {
        Some(target) if resolution.reexport_eligible(target, deps) => EmitForm::ReExport,
        _ => EmitForm::FactoryCall,
    };

    row.source = Some(form.source(&id.to_string()));
    row.nomap = true;
    if let Some(index) = row.dedupe_index {
        row.index_deps.insert(DUP_INDEX_KEY.to_string(), index);
    }

    Some(form)
}

/// Rewrite every deduped row in place.
pub fn rewrite_rows<'r>(
    resolution: &Resolution,
    rows: impl IntoIterator<Item = &'r mut SortRow>,
) -> usize {
    rows.into_iter()
        .filter_map(|row| rewrite_row(resolution, row))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedupe::recorder::DependencyRecorder;
    use crate::dedupe::resolver::resolve;
    use crate::ids::{NodeId, PackageName, PositionIndex, Target};

    fn resolution() -> Resolution {
        resolve(
            vec![(
                PackageName::from("p"),
                vec!["/long/x.js".into(), "/y.js".into()],
            )],
            DependencyRecorder::new(),
        )
    }

    #[test]
    fn test_reexport_when_eligible() {
        let resolution = resolution();
        let mut row = SortRow::new("/long/x.js", 0);
        row.dedupe = Some("/y.js".into());
        row.dedupe_index = Some(PositionIndex(4));

        assert_eq!(rewrite_row(&resolution, &mut row), Some(EmitForm::ReExport));
        assert_eq!(row.source.as_deref(), Some("module.exports = require(4);"));
        assert!(row.nomap);
        assert_eq!(row.index_deps.get(DUP_INDEX_KEY), Some(&PositionIndex(4)));
    }

    #[test]
    fn test_factory_call_for_non_duplicate_deps() {
        let resolution = resolution();
        let mut row = SortRow::new("/long/x.js", 0);
        row.deps.insert("./z".to_string(), Target::from("/z.js"));
        row.dedupe = Some("/y.js".into());

        assert_eq!(rewrite_row(&resolution, &mut row), Some(EmitForm::FactoryCall));
        assert_eq!(
            row.source.as_deref(),
            Some(r#"arguments[4]["/y.js"][0].apply(exports,arguments)"#)
        );
        assert!(row.index_deps.is_empty());
    }

    #[test]
    fn test_host_dedupe_to_non_canonical_uses_factory_call() {
        let resolution = resolution();
        let mut row = SortRow::new("/a.js", 0);
        row.dedupe = Some("/b.js".into());
        row.dedupe_index = Some(PositionIndex(0));

        assert_eq!(rewrite_row(&resolution, &mut row), Some(EmitForm::FactoryCall));
        assert_eq!(
            row.source.as_deref(),
            Some("arguments[4][0][0].apply(exports,arguments)")
        );
    }

    #[test]
    fn test_plain_rows_untouched() {
        let resolution = resolution();
        let mut rows = vec![SortRow::new("/a.js", 0), SortRow::new("/b.js", 1)];
        rows[1].deps.insert("fs".to_string(), Target::External);
        let before = rows.clone();

        assert_eq!(rewrite_rows(&resolution, rows.iter_mut()), 0);
        assert_eq!(rows, before);
        assert_eq!(rows[0].id, NodeId::from("/a.js"));
    }
}
