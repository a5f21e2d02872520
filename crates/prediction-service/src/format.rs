//! Duration Rounding and Formatting

/// Round an estimate to whole seconds, half away from zero.
///
/// Negative estimates clamp to zero; values past `u64::MAX` saturate.
pub fn round_seconds(estimate: f64) -> u64 {
    if estimate <= 0.0 {
        0
    } else {
        estimate.round() as u64
    }
}

/// `"<minutes> minutes and <seconds> seconds"`
pub fn format_duration(seconds: u64) -> String {
    format!("{} minutes and {} seconds", seconds / 60, seconds % 60)
}
