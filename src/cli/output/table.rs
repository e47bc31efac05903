//! Table output formatting for CLI commands using comfy-table.

use std::env;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{ConvergenceState, EvaluationTally};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub const fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Key/count rows, e.g. artifact counts.
    pub fn format_counts(&self, title: &str, rows: &[(&str, String)]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new(title).add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
        ]);
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), Cell::new(value)]);
        }
        table.to_string()
    }

    /// One row per evaluation pass.
    pub fn format_history(&self, history: &[ConvergenceState]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Pass").add_attribute(Attribute::Bold),
            Cell::new("Failures").add_attribute(Attribute::Bold),
            Cell::new("Evaluated").add_attribute(Attribute::Bold),
            Cell::new("Success rate").add_attribute(Attribute::Bold),
        ]);
        for state in history {
            table.add_row(vec![
                Cell::new(state.iteration + 1),
                self.failure_cell(state.failure_count),
                Cell::new(state.total_count),
                Cell::new(format_rate(state.success_rate())),
            ]);
        }
        table.to_string()
    }

    /// Summary of the latest evaluation.
    pub fn format_tally(&self, tally: &EvaluationTally) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Passed").add_attribute(Attribute::Bold),
            Cell::new("Failed").add_attribute(Attribute::Bold),
            Cell::new("Unparsed").add_attribute(Attribute::Bold),
            Cell::new("Success rate").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new(tally.passes()),
            self.failure_cell(tally.failures),
            Cell::new(tally.unparsed),
            Cell::new(format_rate(tally.success_rate())),
        ]);
        table.to_string()
    }

    fn failure_cell(&self, failures: usize) -> Cell {
        let cell = Cell::new(failures);
        if !self.use_colors {
            return cell;
        }
        if failures == 0 {
            cell.fg(Color::Green)
        } else {
            cell.fg(Color::Red)
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.use_colors {
            table.force_no_tty();
        }
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentage with one decimal.
pub fn format_rate(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    true
}
