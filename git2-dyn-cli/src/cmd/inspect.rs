//! Export table diagnostics: `check` and `symbols`.

use git2_dyn::{Result, Runtime, exports};
use serde_json::json;

use crate::output::Report;

/// Resolve every export; fails the process if any is missing.
pub fn check(rt: &Runtime) -> Result<Report> {
    let resolver = rt.resolver();
    let missing = rt.missing_exports()?;
    let names: Vec<String> = missing
        .iter()
        .map(|e| resolver.convention().symbol_name(e))
        .collect();
    let total = exports::ALL.len();
    let report = Report::new(json!({
        "module": resolver.describe(),
        "exports": total,
        "missing": names,
    }));
    if names.is_empty() {
        return Ok(report.line(format!("all {total} exports resolved in {}", resolver.describe())));
    }
    Ok(report
        .line(format!("{} of {total} exports missing from {}:", names.len(), resolver.describe()))
        .lines(names.iter().map(|n| format!("  {n}")))
        .failed())
}

/// Every export with the name looked up under the active convention.
pub fn symbols(rt: &Runtime) -> Report {
    let convention = rt.resolver().convention();
    let rows: Vec<_> = exports::ALL
        .iter()
        .map(|e| (e.name(), convention.symbol_name(e), e.arg_bytes()))
        .collect();
    let width = rows.iter().map(|(name, ..)| name.len()).max().unwrap_or(0);
    Report::new(json!(
        rows.iter()
            .map(|(name, symbol, bytes)| json!({ "name": name, "symbol": symbol, "arg_bytes": bytes }))
            .collect::<Vec<_>>()
    ))
    .lines(rows.iter().map(|(name, symbol, _)| format!("{name:<width$}  {symbol}")))
}
