//! Terminal rendering for `gowalla` commands
//!
//! Results and API response bodies go to stdout; errors and warnings go to
//! stderr so a piped `gowalla call ... --json` stays parseable.

use serde_json::{json, Value};

/// How command results are rendered, picked by the global `--json` flag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Sink for command status lines and Gowalla response bodies
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    /// Detail line under a status. Dropped in JSON mode.
    fn info(&self, message: &str);
    /// A decoded response body or a command's structured result
    fn print_json(&self, value: &Value);
}

/// Terminal output: marked status lines and indented API bodies
pub struct HumanFormatter;

impl HumanFormatter {
    fn render_success(message: &str) -> String {
        format!("\u{2713} {message}")
    }

    fn render_error(message: &str) -> String {
        format!("\u{2717} Error: {message}")
    }

    fn render_warn(message: &str) -> String {
        format!("\u{26a0} Warning: {message}")
    }

    fn render_body(value: &Value) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    }
}

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("{}", Self::render_success(message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", Self::render_error(message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", Self::render_warn(message));
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn print_json(&self, value: &Value) {
        println!("{}", Self::render_body(value));
    }
}

/// `--json` output: each line on stdout or stderr is one compact JSON value
pub struct JsonFormatter;

impl JsonFormatter {
    fn render_status(ok: bool, message: &str) -> Value {
        if ok {
            json!({ "success": true, "message": message })
        } else {
            json!({ "success": false, "error": message })
        }
    }

    fn render_warn(message: &str) -> Value {
        json!({ "level": "warning", "message": message })
    }
}

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", Self::render_status(true, message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", Self::render_status(false, message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", Self::render_warn(message));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &Value) {
        println!("{value}");
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}
