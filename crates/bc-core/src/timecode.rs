//! Conversions between seconds and `HH:MM:SS[.mmm]` timecodes.

/// Format a duration as `HH:MM:SS`, rounded to the nearest second.
///
/// Hours are not wrapped, so a 30 hour book renders as `30:00:00`.
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (h, rem) = (total / 3600, total % 3600);
    format!("{:02}:{:02}:{:02}", h, rem / 60, rem % 60)
}

/// Format an offset as `HH:MM:SS.mmm`, rounded to the nearest millisecond.
pub fn format_hms_millis(seconds: f64) -> String {
    let millis = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let (secs, ms) = (millis / 1000, millis % 1000);
    let (h, rem) = (secs / 3600, secs % 3600);
    format!("{:02}:{:02}:{:02}.{:03}", h, rem / 60, rem % 60, ms)
}

/// Parse `[[HH:]MM:]SS[.fff]` into seconds.
///
/// Minutes and seconds are not range-checked against 60 when they are the
/// leading component, so `90` and `01:30` both parse to 90 seconds.
/// Returns `None` for anything else.
pub fn parse_timecode(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let (last, leading) = parts.split_last()?;
    let seconds = parse_component(last, true)?;
    if leading.iter().any(|p| p.is_empty()) {
        return None;
    }
    if !leading.is_empty() && seconds >= 60.0 {
        return None;
    }

    let mut total = 0.0;
    for (i, part) in leading.iter().enumerate() {
        let value = parse_component(part, false)?;
        // Minutes must stay below 60 when hours are given.
        if leading.len() == 2 && i == 1 && value >= 60.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    Some(total * 60.0 + seconds)
}

fn parse_component(part: &str, allow_fraction: bool) -> Option<f64> {
    let (whole, frac) = match part.split_once('.') {
        Some((w, f)) if allow_fraction => (w, Some(f)),
        Some(_) => return None,
        None => (part, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(f) = frac {
        if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    part.parse::<f64>().ok()
}
