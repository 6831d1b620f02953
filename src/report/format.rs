//! Plain-text rendering of MLE and error records.

use crate::domain::{ErrRecord, Interval, MleRecord};

pub fn format_mle(mle: &MleRecord) -> String {
    let mut out = String::new();
    out.push_str("Maximum-likelihood estimate:\n");
    for (name, value) in mle.fields() {
        out.push_str(&format!("  {name:<18} {}\n", fmt_value(value)));
    }
    out
}

/// Table of MLE values with their `[lo, hi]` intervals.
pub fn format_err(err: &ErrRecord) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<18} {:>12} {:>12} {:>12}\n", "parameter", "mle", "lo", "hi").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<18} {:-<12} {:-<12} {:-<12}\n", "", "", "", "").trim_end());
    out.push('\n');

    for ((name, value), (_, interval)) in err.mle.fields().into_iter().zip(err.intervals()) {
        let [lo, hi] = interval;
        out.push_str(
            format!("{name:<18} {:>12} {:>12} {:>12}\n", fmt_value(value), fmt_value(lo), fmt_value(hi)).trim_end(),
        );
        out.push('\n');
    }
    out
}

/// `[lo, hi]`, or `n/a` when the interval is unavailable.
pub fn fmt_interval(interval: Interval) -> String {
    let [lo, hi] = interval;
    if lo.is_nan() || hi.is_nan() {
        return "n/a".to_string();
    }
    format!("[{}, {}]", fmt_value(lo), fmt_value(hi))
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v != 0.0 && v.abs() < 1e-3 {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}
