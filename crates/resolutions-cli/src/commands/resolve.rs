//! `resolutions resolve` command implementation.
//!
//! Replays a recorded bundler trace through one dedupe pass and reports the
//! resolution and, when the trace has sorted rows, the annotated rows.

use miette::{IntoDiagnostic, Result};
use resolutions_core::dedupe::{Annotation, ResolutionEntry};
use resolutions_core::version::REPORT_SCHEMA_VERSION;
use resolutions_core::{EmittedRow, Selector, Trace};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Resolve command action.
#[derive(Debug, Clone)]
pub struct ResolveAction {
    /// Trace file to replay.
    pub trace: PathBuf,
    /// Selector overriding the one recorded in the trace.
    pub select: Option<Selector>,
}

/// JSON output for the resolve command.
#[derive(Serialize)]
struct ResolveResultJson<'a> {
    ok: bool,
    schema_version: u32,
    trace: String,
    resolution: Vec<ResolutionEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<&'a [EmittedRow]>,
    duration_ms: u64,
}

/// Run the resolve command.
pub fn run(action: ResolveAction, json: bool) -> Result<()> {
    let start = Instant::now();

    let mut trace = Trace::from_path(&action.trace).into_diagnostic()?;
    if let Some(select) = action.select {
        debug!(?select, "Selector overridden from the command line");
        trace.selector = select;
    }

    let outcome = trace.run();
    let duration_ms = start.elapsed().as_millis() as u64;

    if json {
        let json_result = ResolveResultJson {
            ok: true,
            schema_version: REPORT_SCHEMA_VERSION,
            trace: action.trace.display().to_string(),
            resolution: outcome.resolution.entries(),
            rows: outcome.rows.as_deref(),
            duration_ms,
        };
        println!("{}", serde_json::to_string(&json_result).into_diagnostic()?);
        return Ok(());
    }

    if outcome.resolution.is_empty() {
        println!("  no duplicates resolved ({duration_ms}ms)");
        return Ok(());
    }

    let canonical = outcome.resolution.canonicals().count();
    let duplicate = outcome.resolution.duplicates().count();
    println!("  {duplicate} duplicates -> {canonical} canonical modules ({duration_ms}ms)");
    for (dup, target) in outcome.resolution.duplicates() {
        println!("    {dup} -> {target}");
    }

    if let Some(rows) = &outcome.rows {
        for emitted in rows {
            let row = &emitted.annotated.row;
            match &emitted.annotated.annotation {
                Annotation::Duplicate {
                    target_index,
                    reexport_eligible,
                    ..
                } => {
                    let index = target_index.map_or_else(|| "?".to_string(), |i| i.to_string());
                    let form = if *reexport_eligible { "re-export" } else { "factory call" };
                    println!("  [{}] {} => [{}] ({})", row.index, row.id, index, form);
                }
                Annotation::Canonical {
                    cleared_default_dedupe: true,
                } => {
                    println!("  [{}] {} (cleared default dedupe)", row.index, row.id);
                }
                Annotation::Canonical { .. } | Annotation::Untouched => {}
            }
        }
    }

    Ok(())
}
