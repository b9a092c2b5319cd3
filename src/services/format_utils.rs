//! Text formatting for market values. Absent or non-finite values render as `N/A`.

pub const NOT_AVAILABLE: &str = "N/A";

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// `$65000.12`, or six decimals below one dollar (`$0.000123`).
pub fn format_price(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) if v.abs() < 1.0 => format!("${:.6}", v),
        Some(v) => format!("${:.2}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Magnitude suffixes: K from 1e3, M from 1e6, B from 1e9, T from 1e12.
pub fn format_compact(value: Option<f64>) -> String {
    let Some(v) = finite(value) else {
        return NOT_AVAILABLE.to_string();
    };

    let abs = v.abs();
    if abs >= 1e12 {
        format!("{:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", v / 1e3)
    } else {
        format!("{:.2}", v)
    }
}

/// Dollar amount with magnitude suffix, e.g. `$1.23T`.
pub fn format_usd_compact(value: Option<f64>) -> String {
    match finite(value) {
        Some(_) => format!("${}", format_compact(value)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Percent change with explicit sign: `+1.23%`, `-0.50%`.
pub fn format_percent(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{:+.2}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_rank(rank: Option<u32>) -> String {
    match rank {
        Some(r) => format!("#{}", r),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}
