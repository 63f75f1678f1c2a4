use chrono::NaiveDate;

/// Format an amount with its unit, dropping a zero fraction and grouping
/// thousands: `1000 steps` becomes "1,000 steps", `7.5 hours` stays as is.
pub fn format_value(value: f64, unit: &str) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    let whole = rounded.trunc() as i64;
    let fraction = (rounded.fract().abs() * 10.0).round() as i64;

    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        grouped.insert(0, '-');
    }
    if fraction != 0 {
        grouped = format!("{}.{}", grouped, fraction);
    }

    if unit.is_empty() {
        grouped
    } else {
        format!("{} {}", grouped, unit)
    }
}

/// Fixed-width text bar for a 0-100 percentage
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}
