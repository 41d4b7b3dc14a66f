//! Terminal UI utilities

use colored::Colorize;
use srp_interactive::RoundOutcome;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print a section header
pub fn header(text: &str) {
    println!("\n{}", text.bold().underline());
}

/// Print a key-value pair
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Print one verifier verdict
pub fn round(outcome: &RoundOutcome) {
    let detail = match &outcome.message {
        Some(message) => format!("request {}: {}", outcome.request_id, message),
        None => format!("request {}", outcome.request_id),
    };
    if outcome.ok {
        success(&detail);
    } else {
        warning(&detail);
    }
}

/// Print a JSON value
pub fn json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!("{}", value),
    }
}
