//! Table output formatting using the `tabled` crate
//!
//! Provides table formatting with:
//! - Column width management and truncation
//! - Terminal width awareness
//! - Alignment support

use super::{truncate, Alignment, Column, OutputConfig};
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment as TabledAlignment, Modify, Width},
    Table,
};

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Format data as a table with the given columns
    pub fn format_with_columns<T: Serialize>(
        data: &[T],
        columns: &[Column],
        config: &OutputConfig,
    ) -> String {
        if data.is_empty() {
            return "(no results)".to_string();
        }

        let mut builder = Builder::default();

        let headers: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        builder.push_record(headers);

        // Serialize each item and extract values by key
        for item in data {
            let json = serde_json::to_value(item).unwrap_or_default();
            let row: Vec<String> = columns
                .iter()
                .map(|col| {
                    let value = json.get(&col.key).cloned().unwrap_or_default();
                    Self::format_value(&value, col, config)
                })
                .collect();
            builder.push_record(row);
        }

        let mut table = builder.build();
        Self::apply_style(&mut table, config);

        let term_width = config.effective_width();
        let col_count = columns.len();
        let available_width = if col_count > 0 {
            (term_width.saturating_sub(col_count * 3)) / col_count
        } else {
            term_width
        };

        for (i, col) in columns.iter().enumerate() {
            let max_width = col.max_width.unwrap_or(available_width);

            if config.should_truncate() && max_width > 0 {
                table.with(Modify::new(Columns::single(i)).with(Width::truncate(max_width)));
            }

            let alignment = match col.align {
                Alignment::Left => TabledAlignment::left(),
                Alignment::Right => TabledAlignment::right(),
            };
            table.with(Modify::new(Columns::single(i)).with(alignment));
        }

        if config.should_truncate() {
            table.with(Width::wrap(term_width));
        }

        table.to_string()
    }

    /// Format a simple key-value table
    pub fn format_key_value(pairs: &[(&str, String)], config: &OutputConfig) -> String {
        let mut builder = Builder::default();

        for (key, value) in pairs {
            builder.push_record([*key, value.as_str()]);
        }

        let mut table = builder.build();
        Self::apply_style(&mut table, config);
        table.with(Modify::new(Columns::first()).with(TabledAlignment::right()));

        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }

        table.to_string()
    }

    fn apply_style(table: &mut Table, config: &OutputConfig) {
        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }
    }

    /// Format a single JSON value for display
    fn format_value(value: &serde_json::Value, col: &Column, config: &OutputConfig) -> String {
        let s = Self::value_to_string(value);

        if config.should_truncate() {
            if let Some(max_width) = col.max_width {
                return truncate(&s, max_width);
            }
        }
        s
    }

    /// Convert a JSON value to a display string
    fn value_to_string(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => "-".to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(arr) if arr.is_empty() => "-".to_string(),
            serde_json::Value::Array(arr) => arr
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            serde_json::Value::Object(obj) => format!("{{{} fields}}", obj.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestRow {
        key: String,
        old_codes: Vec<String>,
        count: usize,
    }

    #[test]
    fn test_format_with_columns() {
        let data = vec![
            TestRow {
                key: "Z".to_string(),
                old_codes: vec!["B".to_string(), "C".to_string()],
                count: 2,
            },
            TestRow {
                key: "N".to_string(),
                old_codes: vec![],
                count: 0,
            },
        ];

        let columns = vec![
            Column::new("Key", "key"),
            Column::new("Old codes", "old_codes"),
            Column::new("Count", "count").with_alignment(Alignment::Right),
        ];

        let config = OutputConfig::new(super::super::OutputFormat::Table).without_truncation();
        let output = TableOutput::format_with_columns(&data, &columns, &config);

        assert!(output.contains("Old codes"));
        assert!(output.contains("B, C"));
        assert!(output.contains('-'));
    }

    #[test]
    fn test_empty_data() {
        let data: Vec<TestRow> = vec![];
        let columns = vec![Column::new("Key", "key")];
        let config = OutputConfig::new(super::super::OutputFormat::Table);

        let output = TableOutput::format_with_columns(&data, &columns, &config);
        assert_eq!(output, "(no results)");
    }

    #[test]
    fn test_key_value_table() {
        let pairs = vec![("Splits", "3".to_string()), ("Merges", "1".to_string())];

        let config = OutputConfig::new(super::super::OutputFormat::Table).with_width(80);
        let output = TableOutput::format_key_value(&pairs, &config);

        assert!(output.contains("Splits"));
        assert!(output.contains('3'));
    }

    #[test]
    fn test_compact_style_drops_borders() {
        let pairs = vec![("Splits", "3".to_string())];

        let config = OutputConfig::new(super::super::OutputFormat::Table);
        assert!(TableOutput::format_key_value(&pairs, &config).contains('╭'));

        let output = TableOutput::format_key_value(&pairs, &config.compact());
        assert!(!output.contains('╭'));
        assert!(output.contains("Splits"));
    }
}
