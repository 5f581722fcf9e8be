//! Output formatters for migrator listings and run reports.

use clap::ValueEnum;
use comfy_table::Table;
use ferry_core::{format_validation_failure, RunSummary, ValidationFailure};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain lines
    Text,
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output. Every result ends with a newline.
pub trait Formatter: Send + Sync {
    /// Format the list of registered migrator names.
    fn format_unit_list(&self, names: &[&str]) -> String;

    /// Format the summary of a finished run.
    fn format_summary(&self, summary: &RunSummary) -> String;

    /// Format a validation failure.
    fn format_validation_failure(&self, failure: &ValidationFailure) -> String;

    /// Format an unknown migrator name.
    fn format_unknown_unit(&self, name: &str) -> String;

    /// Whether per-unit progress lines belong in the output.
    fn shows_progress(&self) -> bool {
        true
    }
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Plain text formatter.
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_unit_list(&self, names: &[&str]) -> String {
        names.iter().map(|name| format!("{}\n", name)).collect()
    }

    fn format_summary(&self, summary: &RunSummary) -> String {
        let mut output: String = summary
            .units
            .iter()
            .map(|unit| {
                format!(
                    "{}: {} read, {} saved, {} skipped\n",
                    unit.name, unit.stats.read, unit.stats.saved, unit.stats.skipped
                )
            })
            .collect();
        if summary.dry_run {
            output.push_str("dry run, all changes rolled back\n");
        }
        output
    }

    fn format_validation_failure(&self, failure: &ValidationFailure) -> String {
        format_validation_failure(failure)
    }

    fn format_unknown_unit(&self, name: &str) -> String {
        format!("Unknown migrator: {}\n", name)
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_unit_list(&self, names: &[&str]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Migrator"]);

        for name in names {
            table.add_row(vec![*name]);
        }

        format!("{}\n", table)
    }

    fn format_summary(&self, summary: &RunSummary) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Migrator", "Read", "Saved", "Skipped"]);

        for unit in &summary.units {
            table.add_row(vec![
                unit.name.clone(),
                unit.stats.read.to_string(),
                unit.stats.saved.to_string(),
                unit.stats.skipped.to_string(),
            ]);
        }

        let mut output = format!("{}\n", table);
        if summary.dry_run {
            output.push_str("dry run, all changes rolled back\n");
        }
        output
    }

    fn format_validation_failure(&self, failure: &ValidationFailure) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Field", "Error"]);

        for (field, messages) in failure.errors.iter() {
            for message in messages {
                table.add_row(vec![field, message.as_str()]);
            }
        }

        format!("ValidationError\nObject: {}\n{}\n", failure.record, table)
    }

    fn format_unknown_unit(&self, name: &str) -> String {
        TextFormatter.format_unknown_unit(name)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_unit_list(&self, names: &[&str]) -> String {
        format!("{}\n", serde_json::json!(names))
    }

    fn format_summary(&self, summary: &RunSummary) -> String {
        let json = serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string());
        format!("{}\n", json)
    }

    fn format_validation_failure(&self, failure: &ValidationFailure) -> String {
        let errors: serde_json::Map<String, serde_json::Value> = failure
            .errors
            .iter()
            .map(|(field, messages)| (field.to_string(), serde_json::json!(messages)))
            .collect();
        let fields: serde_json::Map<String, serde_json::Value> = failure
            .record
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();

        let json = serde_json::json!({
            "error": "validation",
            "object": failure.record.identity(),
            "fields": fields,
            "errors": errors,
        });
        format!("{}\n", json)
    }

    fn format_unknown_unit(&self, name: &str) -> String {
        format!(
            "{}\n",
            serde_json::json!({
                "error": "unknown_migrator",
                "migrator": name,
            })
        )
    }

    fn shows_progress(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{FieldErrors, Record, UnitReport, UnitStats};
    use pretty_assertions::assert_eq;

    fn summary(dry_run: bool) -> RunSummary {
        RunSummary {
            units: vec![UnitReport {
                name: "polls.PollsMigrator".to_string(),
                stats: UnitStats {
                    read: 3,
                    skipped: 1,
                    saved: 2,
                },
            }],
            dry_run,
        }
    }

    fn failure() -> ValidationFailure {
        let mut errors = FieldErrors::new();
        errors.add("new_poll_name", "NewPoll with this new_poll_name already exists.");
        ValidationFailure::new(Record::new("NewPoll").with("new_poll_name", "derp"), errors)
    }

    #[test]
    fn test_text_formatter() {
        let formatter = TextFormatter;

        assert_eq!(
            formatter.format_unit_list(&["polls.PollsMigrator", "polls.AppendingPollsMigrator"]),
            "polls.PollsMigrator\npolls.AppendingPollsMigrator\n"
        );
        assert_eq!(
            formatter.format_summary(&summary(true)),
            "polls.PollsMigrator: 3 read, 2 saved, 1 skipped\ndry run, all changes rolled back\n"
        );
        assert_eq!(
            formatter.format_unknown_unit("polls.Nope"),
            "Unknown migrator: polls.Nope\n"
        );
        assert!(formatter
            .format_validation_failure(&failure())
            .starts_with("ValidationError\nObject: NewPoll(unsaved)"));
    }

    #[test]
    fn test_table_formatter() {
        let formatter = TableFormatter;

        let list = formatter.format_unit_list(&["polls.PollsMigrator"]);
        assert!(list.contains("Migrator"));
        assert!(list.contains("polls.PollsMigrator"));

        let report = formatter.format_summary(&summary(false));
        assert!(report.contains("Skipped"));
        assert!(!report.contains("dry run"));

        let report = formatter.format_validation_failure(&failure());
        assert!(report.starts_with("ValidationError\n"));
        assert!(report.contains("new_poll_name"));
    }

    #[test]
    fn test_json_formatter() {
        let formatter = JsonFormatter;
        assert!(!formatter.shows_progress());

        let list: serde_json::Value =
            serde_json::from_str(&formatter.format_unit_list(&["polls.PollsMigrator"])).unwrap();
        assert_eq!(list, serde_json::json!(["polls.PollsMigrator"]));

        let report: serde_json::Value =
            serde_json::from_str(&formatter.format_summary(&summary(false))).unwrap();
        assert_eq!(report["units"][0]["stats"]["saved"], 2);
        assert_eq!(report["dry_run"], false);

        let report: serde_json::Value =
            serde_json::from_str(&formatter.format_validation_failure(&failure())).unwrap();
        assert_eq!(report["object"], "NewPoll(unsaved)");
        assert_eq!(report["fields"]["new_poll_name"], "derp");
        assert_eq!(
            report["errors"]["new_poll_name"][0],
            "NewPoll with this new_poll_name already exists."
        );
    }
}
