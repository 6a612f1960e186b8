//! Output formatters for run results
//!
//! Provides table, JSON, and CSV renderings of a result set.

use anyhow::{Context, Result};

use crate::models::{ProbeOutcome, ResultSet};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format the result set of one run
    pub fn format_results(&self, run_id: &str, results: &ResultSet) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.format_table(run_id, results)),
            OutputFormat::Json => {
                serde_json::to_string(results).context("Failed to serialize results")
            }
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(results).context("Failed to serialize results")
            }
            OutputFormat::Csv => format_csv(results),
        }
    }

    fn status(&self, outcome: &ProbeOutcome) -> String {
        let label = outcome.label();
        if !self.colorize {
            return label.to_string();
        }
        let color = match outcome {
            ProbeOutcome::Output(_) => "32",
            ProbeOutcome::Error => "31",
            ProbeOutcome::Timeout => "33",
        };
        format!("\x1b[{color}m{label:7}\x1b[0m")
    }

    fn format_table(&self, run_id: &str, results: &ResultSet) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nTest run {run_id}\n"));
        output.push_str(&format!("{:-<72}\n", ""));

        for (target, outcome) in results.iter() {
            let detail = match outcome {
                ProbeOutcome::Output(text) => first_line(text),
                _ => String::new(),
            };
            output.push_str(&format!(
                "{:30} {:7}  {}\n",
                target,
                self.status(outcome),
                detail
            ));
        }

        output.push_str(&format!("{:-<72}\n", ""));
        output.push_str(&format!(
            "{} targets: {} ok, {} error, {} timeout\n",
            results.len(),
            results.output_count(),
            results.error_count(),
            results.timeout_count()
        ));

        output
    }
}

fn format_csv(results: &ResultSet) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["target", "status", "output"])?;

    for (target, outcome) in results.iter() {
        writer.write_record([target.as_str(), outcome.label(), outcome.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > 32 {
        let truncated: String = line.chars().take(29).collect();
        format!("{truncated}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        let mut set = ResultSet::new();
        set.insert("10.0.0.1", ProbeOutcome::Output("rtt=1.2ms\nloss=0".to_string()));
        set.insert("10.0.0.2", ProbeOutcome::Timeout);
        set
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(
            OutputFormat::from_str("json-pretty"),
            Some(OutputFormat::JsonPretty)
        );
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn test_format_table() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color();
        let output = formatter.format_results("run-1", &sample()).unwrap();

        assert!(output.contains("Test run run-1"));
        assert!(output.contains("rtt=1.2ms"));
        assert!(!output.contains("loss=0"));
        assert!(output.contains("2 targets: 1 ok, 0 error, 1 timeout"));
    }

    #[test]
    fn test_format_csv() {
        let formatter = ResultFormatter::new(OutputFormat::Csv);
        let output = formatter.format_results("run-1", &sample()).unwrap();

        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("target,status,output"));
        assert!(output.contains("10.0.0.2,TIMEOUT,timeout"));
    }

    #[test]
    fn test_first_line_truncates() {
        let long = "x".repeat(40);
        assert_eq!(first_line(&long).len(), 32);
        assert_eq!(first_line("short\nmore"), "short");
    }
}
