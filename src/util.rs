pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Zero-padded `HH:MM:SS` for a millisecond count. Hours are not wrapped.
pub fn format_hms(total_ms: i64) -> String {
    let total_ms = total_ms.max(0);
    let h = total_ms / 3_600_000;
    let m = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1000;
    format!("{h:02}:{m:02}:{s:02}")
}
