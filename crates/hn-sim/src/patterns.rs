//! Pattern multiplier lookup by simulation time.

use hn_network::{TimeOptions, WaterNetwork};
use hn_solver::PatternMultipliers;

/// Position in a pattern of `len` multipliers at `time_h`.
///
/// `floor((t + start) / step) mod len`; a non-positive step holds the first
/// period.
pub fn pattern_index(time_h: f64, times: &TimeOptions, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let step = times.pattern_step_h;
    if step <= 0.0 {
        return 0;
    }
    let period = ((time_h + times.pattern_start_h) / step + 1e-9).floor().max(0.0) as usize;
    period % len
}

/// Multiplier of every pattern in the network at `time_h`.
///
/// Empty patterns contribute 1.0.
pub fn multipliers_at(network: &WaterNetwork, time_h: f64) -> PatternMultipliers {
    network
        .patterns
        .iter()
        .map(|p| {
            let value = p
                .multipliers
                .get(pattern_index(time_h, &network.times, p.multipliers.len()))
                .copied()
                .unwrap_or(1.0);
            (p.id.clone(), value)
        })
        .collect()
}
