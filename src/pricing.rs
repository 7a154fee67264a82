//! Price formatting helpers. Pure, no I/O.
//!
//! Prices arrive as integer minor units (cents). The annual tier is shown
//! as a monthly-equivalent amount, so its yearly total is divided by 12
//! before formatting.

/// Currency symbol for an ISO code.
///
/// Closed 3-way mapping: USD and GBP get their own symbols; everything
/// else, EUR included, falls back to the euro sign.
pub fn currency_symbol(currency: &str) -> &'static str {
    match currency {
        "USD" => "$",
        "GBP" => "£",
        _ => "€",
    }
}

/// Format a minor-unit amount for display.
///
/// * `kind = "trial"`  — `{symbol}{amount/100 to 2 decimals}`
/// * `kind = "annual"` — same, but the amount is first divided by 12
///   (annual total → monthly equivalent)
/// * any other kind    — empty string (contractual fallback, not an error)
pub fn format_price(minor_units: i64, currency: &str, kind: &str) -> String {
    let units = minor_units as f64 / 100.0;
    let symbol = currency_symbol(currency);

    match kind {
        "trial" => format!("{symbol}{units:.2}"),
        "annual" => format!("{symbol}{:.2}", units / 12.0),
        _ => String::new(),
    }
}
