//! Human readable result lines.

use crate::{search::WorkerState, transfer::GlobalResult};

/// Field width of every printed real.
const WIDTH: usize = 10;
/// Significant digits of every printed real.
const PRECISION: usize = 4;

/// Formats `value` like C's `%<width>.<precision>g`.
///
/// Uses scientific notation when the decimal exponent is below -4 or not
/// below `precision`, fixed notation otherwise, and drops trailing zeros.
pub fn format_g(value: f64, width: usize, precision: usize) -> String {
    let body = if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        general(value, precision.max(1))
    };

    format!("{body:>width$}")
}

fn general(value: f64, precision: usize) -> String {
    let sci = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if exp < -4 || exp >= precision as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exp.abs())
    } else {
        let decimals = (precision as i32 - 1 - exp) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn real(value: f64) -> String {
    format_g(value, WIDTH, PRECISION)
}

/// The line every rank prints about its own strip.
pub fn local_line(state: &WorkerState) -> String {
    format!(
        "[{}] Local minimum out of {} points: f({}, {}) = {}",
        state.rank,
        state.samples,
        real(state.best.x),
        real(state.best.y),
        real(state.best.value)
    )
}

/// The line the coordinator prints about the whole group.
pub fn global_line(result: &GlobalResult, samples: usize) -> String {
    format!(
        "[{}] Global minimum out of {} points: f({}, {}) = {}",
        result.owner_rank,
        samples,
        real(result.x),
        real(result.y),
        real(result.value)
    )
}
