//! Human-readable elapsed times for the timing lines.
//!
//! A duration is shown in the largest unit in which it is at least one, with
//! four significant digits: `12.35 ms`, `1.000 s`, `2.500 min`.

use std::fmt;
use std::time::{Duration, Instant};

const UNITS: [(u128, &str); 7] = [
    (86_400_000_000_000, "d"),
    (3_600_000_000_000, "h"),
    (60_000_000_000, "min"),
    (1_000_000_000, "s"),
    (1_000_000, "ms"),
    (1_000, "\u{03bc}s"),
    (1, "ns"),
];

/// Wrapper giving a `Duration` stopwatch-style `Display` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Elapsed(pub Duration);

impl Elapsed {
    /// Runs `f`, returning its output and how long it took.
    pub async fn measure<F, T>(f: F) -> (T, Self)
    where
        F: Future<Output = T>,
    {
        let started = Instant::now();
        let output = f.await;
        (output, Self(started.elapsed()))
    }
}

impl From<Duration> for Elapsed {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl fmt::Display for Elapsed {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        let (factor, unit) = UNITS
            .iter()
            .copied()
            .find(|(factor, _)| nanos >= *factor)
            .unwrap_or((1, "ns"));

        let value = nanos as f64 / factor as f64;
        write!(f, "{} {unit}", four_significant_digits(value))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn four_significant_digits(value: f64) -> String {
    if value == 0.0 {
        return "0.000".to_string();
    }

    let magnitude = value.abs().log10().floor() as i32;
    let decimals = usize::try_from(3i32.saturating_sub(magnitude)).unwrap_or(0);
    let rendered = format!("{value:.decimals$}");

    // Rounding can carry into the next power of ten (9.9996 -> 10.000).
    let carried = rendered
        .parse::<f64>()
        .is_ok_and(|r| r >= 10f64.powi(magnitude.saturating_add(1)));
    if carried && decimals > 0 {
        let decimals = decimals.saturating_sub(1);
        return format!("{value:.decimals$}");
    }

    rendered
}
