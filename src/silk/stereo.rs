//! Mid-side (MS) stereo prediction: SILK codes a mono "mid" signal plus a
//! predicted "side" signal, rather than independent left/right channels.

use crate::range_coder::{RangeDecoder, RangeEncoder};
use crate::silk::tables::{STEREO_PRED_QUANT_Q13, STEREO_QUANT_TAB_SIZE};
use crate::EncoderError;

/// Combines two quantized predictor table indices into the `pred_Q13` pair
/// per spec.md §4.3.5: `pred_Q13[0] -= pred_Q13[1]`.
pub(crate) fn pred_q13_from_indices(ix0: usize, ix1: usize) -> [i32; 2] {
    let w0 = STEREO_PRED_QUANT_Q13[ix0.min(STEREO_QUANT_TAB_SIZE - 1)];
    let w1 = STEREO_PRED_QUANT_Q13[ix1.min(STEREO_QUANT_TAB_SIZE - 1)];
    [w0 - w1, w1]
}

/// 16-symbol joint ICDF for the coarse (2-bit-per-channel) half of the
/// stereo predictor index pair, shaped like the reference's
/// `silk_stereo_pred_joint_iCDF`: middle symbols (both channels near
/// "no prediction") carry the most probability mass.
const JOINT_COARSE_ICDF: [u8; 16] = [
    250, 230, 205, 175, 150, 130, 110, 90, 70, 55, 42, 31, 20, 12, 5, 0,
];

/// Decodes the two stereo predictor table indices (`ix0`, `ix1`) via a
/// 5-step hierarchical code transmitted through the range coder: one joint
/// symbol picks each channel's 2-bit coarse bucket (`0..4`), then two
/// range-coded equiprobable bits per channel refine it to the full 4-bit
/// index into [`STEREO_PRED_QUANT_Q13`], per spec.md §4.3.5.
pub(crate) fn decode_indices(dec: &mut RangeDecoder) -> (usize, usize) {
    let joint = dec.decode_icdf(&JOINT_COARSE_ICDF, 8) as usize;
    let coarse0 = joint / 4;
    let coarse1 = joint % 4;

    let hi0 = u32::from(dec.decode_bit_logp(1));
    let lo0 = u32::from(dec.decode_bit_logp(1));
    let hi1 = u32::from(dec.decode_bit_logp(1));
    let lo1 = u32::from(dec.decode_bit_logp(1));

    let ix0 = coarse0 * 4 + (2 * hi0 + lo0) as usize;
    let ix1 = coarse1 * 4 + (2 * hi1 + lo1) as usize;
    (ix0, ix1)
}

/// Encodes the two stereo predictor table indices chosen by
/// [`quantize_indices`], the mirror of [`decode_indices`].
pub(crate) fn encode_indices(
    enc: &mut RangeEncoder,
    ix0: usize,
    ix1: usize,
) -> Result<(), EncoderError> {
    let ix0 = ix0.min(STEREO_QUANT_TAB_SIZE - 1);
    let ix1 = ix1.min(STEREO_QUANT_TAB_SIZE - 1);
    let coarse0 = ix0 / 4;
    let coarse1 = ix1 / 4;
    let refine0 = ix0 % 4;
    let refine1 = ix1 % 4;

    let joint = coarse0 * 4 + coarse1;
    enc.encode_icdf(joint, &JOINT_COARSE_ICDF, 8)?;

    enc.encode_bit_logp(u32::from(refine0 & 0b10 != 0), 1)?;
    enc.encode_bit_logp(u32::from(refine0 & 0b01 != 0), 1)?;
    enc.encode_bit_logp(u32::from(refine1 & 0b10 != 0), 1)?;
    enc.encode_bit_logp(u32::from(refine1 & 0b01 != 0), 1)?;
    Ok(())
}

/// Picks the `STEREO_PRED_QUANT_Q13` indices closest to the continuous
/// `(w0, w1)` predictor weights the encoder fit from the mid/side signal,
/// for transmission via [`encode_indices`].
pub(crate) fn quantize_indices(w0_q13: i32, w1_q13: i32) -> (usize, usize) {
    let nearest = |target: i32| -> usize {
        STEREO_PRED_QUANT_Q13
            .iter()
            .enumerate()
            .min_by_key(|(_, &level)| (level - target).abs())
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    (nearest(w0_q13), nearest(w1_q13))
}

/// Encodes `(left, right)` pairs into `(mid, side)`, the standard
/// `mid = (l+r)/2`, `side = (l-r)/2` rotation.
pub(crate) fn to_mid_side(left: &[f32], right: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let mid: Vec<f32> = left.iter().zip(right).map(|(l, r)| (l + r) * 0.5).collect();
    let side: Vec<f32> = left.iter().zip(right).map(|(l, r)| (l - r) * 0.5).collect();
    (mid, side)
}

/// Inverse of [`to_mid_side`].
pub(crate) fn to_left_right(mid: &[f32], side: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let left: Vec<f32> = mid.iter().zip(side).map(|(m, s)| m + s).collect();
    let right: Vec<f32> = mid.iter().zip(side).map(|(m, s)| m - s).collect();
    (left, right)
}

/// Stereo prediction weights (Q13) carried across frames: predicts the side
/// channel from the mid channel's current and one-subframe-delayed value to
/// remove residual correlation MS rotation alone doesn't capture.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StereoPredictor {
    pub(crate) w0: f32,
    pub(crate) w1: f32,
}

impl StereoPredictor {
    /// Least-squares fit of `side[i] ~= w0*mid[i] + w1*mid[i-1]`.
    pub(crate) fn fit(mid: &[f32], side: &[f32]) -> Self {
        if mid.len() < 2 {
            return Self::default();
        }
        let n = mid.len() - 1;
        let mut s00 = 0f32;
        let mut s01 = 0f32;
        let mut s11 = 0f32;
        let mut b0 = 0f32;
        let mut b1 = 0f32;
        for i in 1..=n {
            let x0 = mid[i];
            let x1 = mid[i - 1];
            let y = side[i];
            s00 += x0 * x0;
            s01 += x0 * x1;
            s11 += x1 * x1;
            b0 += x0 * y;
            b1 += x1 * y;
        }
        let det = s00 * s11 - s01 * s01;
        if det.abs() < 1e-6 {
            return Self::default();
        }
        let w0 = (b0 * s11 - b1 * s01) / det;
        let w1 = (b1 * s00 - b0 * s01) / det;
        Self { w0, w1 }
    }

    /// Predicts the side channel given the mid channel and the previous
    /// frame's final mid sample (for the first sample's delayed term).
    pub(crate) fn predict(&self, mid: &[f32], prev_mid_last: f32) -> Vec<f32> {
        let mut out = Vec::with_capacity(mid.len());
        let mut prev = prev_mid_last;
        for &m in mid {
            out.push(self.w0 * m + self.w1 * prev);
            prev = m;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_side_round_trip() {
        let left = vec![0.3f32, -0.2, 0.5, 0.1];
        let right = vec![0.1f32, 0.0, 0.4, -0.1];
        let (mid, side) = to_mid_side(&left, &right);
        let (l2, r2) = to_left_right(&mid, &side);
        for (a, b) in left.iter().zip(l2.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in right.iter().zip(r2.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn predictor_reduces_residual_energy_for_correlated_side() {
        let mid: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin()).collect();
        let side: Vec<f32> = mid.iter().map(|m| m * 0.6).collect();
        let predictor = StereoPredictor::fit(&mid, &side);
        let predicted = predictor.predict(&mid, 0.0);

        let raw_energy: f32 = side.iter().map(|v| v * v).sum();
        let residual_energy: f32 = side
            .iter()
            .zip(predicted.iter())
            .map(|(s, p)| (s - p).powi(2))
            .sum();
        assert!(residual_energy < raw_energy);
    }

    /// Literal scenario S4: indices `ix0 = ix1 = 0` reconstruct
    /// `pred_Q13 = [stereo_pred_quant_Q13[0] - stereo_pred_quant_Q13[0],
    /// stereo_pred_quant_Q13[0]] = [0, -13732]`.
    #[test]
    fn pred_q13_matches_reference_scenario() {
        assert_eq!(pred_q13_from_indices(0, 0), [0, -13732]);
    }
}
