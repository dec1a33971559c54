//! Compact display of money and counts: `$1.2M`, `3.4K`, `12.5%`.

fn compact(value: f64) -> Option<String> {
    let magnitude = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    if magnitude >= 1_000_000.0 {
        Some(format!("{}{:.1}M", sign, magnitude / 1_000_000.0))
    } else if magnitude >= 1_000.0 {
        Some(format!("{}{:.1}K", sign, magnitude / 1_000.0))
    } else {
        None
    }
}

pub fn format_currency(value: f64) -> String {
    match compact(value) {
        Some(short) => match short.strip_prefix('-') {
            Some(rest) => format!("-${}", rest),
            None => format!("${}", short),
        },
        None => {
            let rounded = value.round();
            if rounded < 0.0 {
                format!("-${}", -rounded)
            } else {
                // `+ 0.0` folds -0 into 0
                format!("${}", rounded + 0.0)
            }
        }
    }
}

pub fn format_number(value: f64) -> String {
    compact(value).unwrap_or_else(|| {
        let rounded = (value * 1000.0).round() / 1000.0;
        format!("{}", rounded + 0.0)
    })
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}
