//! Display formatting for list cells.

use crate::config::{Formatter, ResolvedView};
use serde_json::{Map, Value};

/// `$` + thousands separators + two decimals. Negative amounts render as `$-4.00`.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount);
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac) = digits.split_once('.').unwrap_or((digits, "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${}{}.{}", sign, grouped, frac)
}

/// Formatted values for the view's formatter columns present in `row`. Null cells are left out.
pub fn display_map(view: &ResolvedView, row: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    for (column, formatter) in &view.formatters {
        let Some(amount) = row.get(column).and_then(Value::as_f64) else { continue };
        let text = match formatter {
            Formatter::Currency => format_currency(amount),
        };
        out.insert(column.clone(), Value::String(text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{inventory_config, resolve};
    use serde_json::json;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(12.5), "$12.50");
        assert_eq!(format_currency(1234.567), "$1,234.57");
        assert_eq!(format_currency(1234567.0), "$1,234,567.00");
        assert_eq!(format_currency(-4.0), "$-4.00");
        assert_eq!(format_currency(-1000.0), "$-1,000.00");
    }

    #[test]
    fn display_covers_formatted_columns_only() {
        let model = resolve(&inventory_config().unwrap()).unwrap();
        let view = model.view_by_path("product").unwrap();
        let row = json!({ "id": 1, "list_price": 1500.0, "selling_price": null, "quantity_per_unit": 3 });
        let display = display_map(view, &row);
        assert_eq!(Value::Object(display), json!({ "list_price": "$1,500.00" }));
    }
}
