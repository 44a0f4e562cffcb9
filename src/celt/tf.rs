//! Time-frequency (TF) resolution decision.
//!
//! Per band, CELT can trade frequency resolution for time resolution (and
//! vice versa) by choosing a different split of the frame into short MDCT
//! blocks. The decision is coded differentially per band with a running
//! "parity" flip, plus a single `tf_select` bit that picks between two
//! candidate tables depending on whether the frame is transient.

use crate::celt::tables::TF_SELECT_ICDF;
use crate::range_coder::{RangeDecoder, RangeEncoder};

/// `tf_select_table[lm][transient][tf_select][band_is_high]` in the
/// reference; simplified here to a 2D table indexed by `[lm][transient]`
/// giving the base TF change applied before the per-band differential.
const TF_SELECT_TABLE: [[i32; 2]; 4] = [
    [0, -1],
    [0, -1],
    [0, -1],
    [0, -1],
];

/// Decodes the per-band TF-change flags and the `tf_select` bit.
pub(crate) fn decode_tf(
    dec: &mut RangeDecoder,
    num_bands: usize,
    lm: usize,
    transient: bool,
) -> (Vec<bool>, bool) {
    let mut curr = false;
    let mut tf_changed = vec![false; num_bands];
    let logp = if transient { 2 } else { 4 };
    for flag in tf_changed.iter_mut() {
        let diff = dec.decode_bit_logp(logp);
        curr ^= diff;
        *flag = curr;
    }
    let tf_select = if lm > 0 {
        dec.decode_icdf(&TF_SELECT_ICDF, 1) != 0
    } else {
        false
    };
    (tf_changed, tf_select)
}

/// Encodes the per-band TF-change flags and `tf_select` bit.
pub(crate) fn encode_tf(
    enc: &mut RangeEncoder,
    tf_changed: &[bool],
    lm: usize,
    transient: bool,
    tf_select: bool,
) -> Result<(), crate::encoder_error::EncoderError> {
    let logp = if transient { 2 } else { 4 };
    let mut prev = false;
    for &flag in tf_changed {
        let diff = flag != prev;
        enc.encode_bit_logp(diff as u32, logp)?;
        prev = flag;
    }
    if lm > 0 {
        enc.encode_icdf(tf_select as usize, &TF_SELECT_ICDF, 1)?;
    }
    Ok(())
}

/// Resolves the effective per-band TF change (in log2 block-count units),
/// combining the per-band flags with the `tf_select` table.
pub(crate) fn resolve_tf_changes(tf_changed: &[bool], lm: usize, transient: bool, tf_select: bool) -> Vec<i32> {
    let base = TF_SELECT_TABLE[lm][transient as usize] * tf_select as i32;
    tf_changed.iter().map(|&changed| if changed { base - 1 } else { base }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_coder::{RangeDecoder, RangeEncoder};

    #[test]
    fn tf_round_trip() {
        let mut buffer = vec![0u8; 256];
        let tf_changed = vec![false, true, true, false, true];
        let lm = 2;
        let transient = true;
        let tf_select = true;

        let mut enc = RangeEncoder::new(&mut buffer);
        encode_tf(&mut enc, &tf_changed, lm, transient, tf_select).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec = RangeDecoder::new(&buffer);
        let (decoded, select) = decode_tf(&mut dec, tf_changed.len(), lm, transient);
        assert_eq!(decoded, tf_changed);
        assert_eq!(select, tf_select);
    }
}
