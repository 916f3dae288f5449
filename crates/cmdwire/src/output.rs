use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use cmdwire_channel::Response;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print a normalized response.
///
/// `json` and `pretty` emit the canonical `{"success", "error", "data"}`
/// object; `raw` emits only the payload a script would want.
pub fn print_response(response: &Response, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(response),
        OutputFormat::Pretty => print_json_pretty(response),
        OutputFormat::Table => {
            let (success, error, data) = match response {
                Response::Ok { data } => ("true", String::new(), data.clone()),
                Response::Err { message, data } => {
                    ("false", message.clone(), Value::Object(data.clone()))
                }
                Response::Unrecognized(doc) => ("unknown", String::new(), doc.clone()),
            };
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SUCCESS", "ERROR", "DATA"])
                .add_row(vec![success.to_string(), error, render_value(&data)]);
            println!("{table}");
        }
        OutputFormat::Raw => match response {
            Response::Ok { data } | Response::Unrecognized(data) => {
                print_raw(render_value(data).as_bytes())
            }
            Response::Err { message, .. } => print_raw(message.as_bytes()),
        },
    }
}

/// Print a flat record as one table row, or as JSON.
pub fn print_record<T: Serialize>(record: &T, headers: &[&str], row: Vec<String>, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(record),
        OutputFormat::Pretty => print_json_pretty(record),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(headers.to_vec())
                .add_row(row);
            println!("{table}");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_json_pretty<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Strings print bare; everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn render_value_leaves_strings_unquoted() {
        assert_eq!(render_value(&json!("done")), "done");
        assert_eq!(render_value(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(render_value(&Value::Null), "null");
    }
}
