//! Textual solution report.

use std::fmt::Write as _;

use crate::support::gp::{DesignPoint, VarTable};

/// Renders every variable with its solved value and unit, sorted by name.
#[must_use]
pub fn solution_table(table: &VarTable, point: &DesignPoint) -> String {
    let mut rows: Vec<(&str, f64, &str)> = table
        .iter()
        .map(|(var, def)| (def.name.as_str(), point.get(var), def.unit))
        .collect();
    rows.sort_by_key(|&(name, _, _)| name);

    let width = rows.iter().map(|(name, _, _)| name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, value, unit) in rows {
        let _ = writeln!(out, "{name:<width$}  {value:>13.6e}  [{unit}]");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_sorted_names_with_units() {
        let mut table = VarTable::new();
        table.var("b.second", "K", 300.0, (1.0, 1e3));
        table.var("a.first", "W", 42.0, (1.0, 1e3));
        let point = table.initial_point();

        let report = solution_table(&table, &point);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("a.first"));
        assert!(lines[0].contains("[W]"));
        assert!(lines[1].starts_with("b.second"));
        assert!(lines[1].contains("3.0"));
    }
}
