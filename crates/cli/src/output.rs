//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use clap::ValueEnum;
use owo_colors::OwoColorize;
use serde::Serialize;
use storefront_core::forms::FormErrorSplit;
use storefront_core::pricing::CartTotals;
use storefront_core::AppError;

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON on stdout
    Json,
}

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Print `value` as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a normalized error with its form split
///
/// Field errors go one per line under the banner message.
pub fn print_app_error(error: &AppError, split: &FormErrorSplit) {
    Status::error(split.server_error.as_deref().unwrap_or(&error.message));
    for line in render_field_errors(split) {
        eprintln!("  {}", line.dimmed());
    }
}

/// `field: message` lines in field order
pub fn render_field_errors(split: &FormErrorSplit) -> Vec<String> {
    split
        .field_errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect()
}

/// Format an amount with two decimals
pub fn format_money(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Cart totals as aligned label/amount lines
pub fn render_totals(totals: &CartTotals) -> Vec<String> {
    let shipping = if totals.has_free_shipping() && totals.subtotal > 0.0 {
        "free".to_string()
    } else {
        format_money(totals.shipping)
    };

    vec![
        format!("{:<10}{:>12}", "Subtotal", format_money(totals.subtotal)),
        format!("{:<10}{:>12}", "Shipping", shipping),
        format!("{:<10}{:>12}", "Tax", format_money(totals.tax)),
        format!("{:<10}{:>12}", "Total", format_money(totals.total)),
    ]
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{mins}m {remaining_secs:.0}s")
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use storefront_core::forms::organize_form_errors;
    use storefront_core::normalize_error;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(324.99), "324.99");
        assert_eq!(format_money(45.0), "45.00");
    }

    #[test]
    fn test_render_totals() {
        let lines = render_totals(&CartTotals::from_subtotal(250.0));
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with("29.99"));
        assert!(lines[3].starts_with("Total"));
        assert!(lines[3].ends_with("324.99"));
    }

    #[test]
    fn test_render_totals_free_shipping() {
        let lines = render_totals(&CartTotals::from_subtotal(600.0));
        assert!(lines[1].ends_with("free"));
    }

    #[test]
    fn test_render_field_errors() {
        let error = normalize_error(json!({
            "status": 422,
            "data": {"message": "Validation failed", "fieldErrors": {"email": "bad", "name": "is required"}}
        }));
        let lines = render_field_errors(&organize_form_errors(&error));
        assert_eq!(lines, vec!["email: bad", "name: is required"]);
    }

    #[test]
    fn test_format_duration_ms() {
        let d = Duration::from_millis(500);
        assert_eq!(format_duration(d), "500ms");
    }

    #[test]
    fn test_format_duration_secs() {
        let d = Duration::from_secs_f32(5.5);
        assert_eq!(format_duration(d), "5.5s");
    }

    #[test]
    fn test_format_duration_mins() {
        let d = Duration::from_secs(125);
        assert_eq!(format_duration(d), "2m 5s");
    }

    #[test]
    fn test_format_count_singular() {
        assert_eq!(format_count(1, "item", "items"), "1 item");
    }

    #[test]
    fn test_format_count_plural() {
        assert_eq!(format_count(5, "item", "items"), "5 items");
    }
}
