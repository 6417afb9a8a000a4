/// Format a currency value without cents
pub fn format_currency_short(value: f64) -> String {
    let abs_value = value.abs();
    let dollars = abs_value.round() as i64;

    // Add thousands separators
    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if value < 0.0 && dollars > 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Format a fraction as a percentage
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// `0.05` -> `P5`, `0.975` -> `P97.5`
pub fn format_percentile_label(p: f64) -> String {
    let scaled = p * 100.0;
    if (scaled - scaled.round()).abs() < 1e-9 {
        format!("P{}", scaled.round() as i64)
    } else {
        format!("P{scaled:.1}")
    }
}
