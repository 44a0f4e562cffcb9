//! Long-term prediction (LTP): a 5-tap pitch-synchronous FIR filter applied
//! on top of the short-term (LPC) predictor to remove pitch periodicity
//! from the excitation signal.

use crate::silk::tables::{ltp_gain_codebook, LTP_ORDER};

/// Selects the LTP gain codebook row (of the three periodicity classes)
/// whose prediction gain against `residual` (assumed already pitch-aligned
/// via `lag`) is highest.
pub(crate) fn select_gain_index(residual: &[f32], lag: usize) -> usize {
    if residual.len() <= lag + LTP_ORDER {
        return 0;
    }
    let codebook = ltp_gain_codebook();
    let mut best = 0usize;
    let mut best_err = f32::MAX;
    for (idx, taps) in codebook.iter().enumerate() {
        let mut err = 0f32;
        for i in (lag + 2)..residual.len() {
            let pred = predict_one(residual, i, lag, taps);
            let e = residual[i] - pred;
            err += e * e;
        }
        if err < best_err {
            best_err = err;
            best = idx;
        }
    }
    best
}

/// Predicts sample `i` of `residual` using the pitch-lag taps `taps` (Q14).
fn predict_one(residual: &[f32], i: usize, lag: usize, taps: &[i32; LTP_ORDER]) -> f32 {
    let base = i as isize - lag as isize;
    let mut acc = 0f32;
    for (t, &gain_q14) in taps.iter().enumerate() {
        let idx = base - 2 + t as isize;
        if idx >= 0 && (idx as usize) < residual.len() {
            acc += residual[idx as usize] * (gain_q14 as f32 / 16384.0);
        }
    }
    acc
}

/// Applies the LTP filter in-place over `excitation`, using `lag` and the
/// selected gain codebook row, producing the pitch-predicted signal.
pub(crate) fn apply(excitation: &mut [f32], lag: usize, gain_index: usize) {
    let codebook = ltp_gain_codebook();
    let taps = codebook[gain_index.min(codebook.len() - 1)];
    let source: Vec<f32> = excitation.to_vec();
    for i in (lag + 2)..excitation.len() {
        excitation[i] += predict_one(&source, i, lag, &taps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_gain_index_is_within_bounds() {
        let residual: Vec<f32> = (0..200).map(|i| (i as f32 * 0.1).sin()).collect();
        let idx = select_gain_index(&residual, 40);
        assert!(idx < ltp_gain_codebook().len());
    }

    #[test]
    fn apply_is_deterministic() {
        let mut a: Vec<f32> = (0..100).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut b = a.clone();
        apply(&mut a, 30, 1);
        apply(&mut b, 30, 1);
        assert_eq!(a, b);
    }
}
