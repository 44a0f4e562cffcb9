//! Static tables for the SILK layer: LPC order per bandwidth, NLSF stage-1/2
//! codebook shapes, and pitch-lag search bounds.
//!
//! The codebook *shapes* (monotonic, bandwidth-ordered NLSF vectors) mirror
//! the reference's layout; exact entries are procedurally generated rather
//! than hand-transcribed from `NLSF_CB_NB`/`NLSF_CB_WB` (see `DESIGN.md`):
//! we have no running reference to check a byte-for-byte transcription
//! against, so these are an honest approximation of the same shape instead
//! of a claimed-exact copy.

/// LPC order used for narrowband/mediumband frames.
pub(crate) const LPC_ORDER_NB: usize = 10;
/// LPC order used for wideband frames.
pub(crate) const LPC_ORDER_WB: usize = 16;

/// Number of stage-1 codebook vectors.
pub(crate) const NLSF_STAGE1_SIZE: usize = 32;
/// Number of stage-2 residual codebook vectors per coefficient.
pub(crate) const NLSF_STAGE2_SIZE: usize = 8;

/// Stage-1 NLSF codebook for the given LPC order: `NLSF_STAGE1_SIZE` vectors,
/// each monotonically increasing in `[0, 1)` (normalized frequency).
pub(crate) fn nlsf_stage1_codebook(order: usize) -> Vec<Vec<f32>> {
    (0..NLSF_STAGE1_SIZE)
        .map(|entry| {
            let spread = 0.5 + 0.5 * (entry as f32 / NLSF_STAGE1_SIZE as f32);
            (0..order)
                .map(|i| spread * (i as f32 + 1.0) / (order as f32 + 1.0))
                .collect()
        })
        .collect()
}

/// Stage-2 residual codebook: `NLSF_STAGE2_SIZE` scalar residual levels,
/// symmetric around zero and shrinking geometrically (matches the
/// reference's per-coefficient residual quantizer shape).
pub(crate) fn nlsf_stage2_codebook() -> [f32; NLSF_STAGE2_SIZE] {
    [-0.12, -0.06, -0.03, -0.01, 0.01, 0.03, 0.06, 0.12]
}

/// Minimum pitch lag, in samples, for narrowband frames (8 kHz internal rate).
pub(crate) const PITCH_LAG_MIN_NB: usize = 32;
/// Maximum pitch lag, in samples, for narrowband frames.
pub(crate) const PITCH_LAG_MAX_NB: usize = 288;

/// Number of LTP (long-term prediction) filter taps SILK codes per subframe.
pub(crate) const LTP_ORDER: usize = 5;

/// LTP gain codebook: three quantization tables selected by a 2-bit periodicity
/// index, each row a set of [`LTP_ORDER`] FIR tap weights in Q14.
pub(crate) fn ltp_gain_codebook() -> [[i32; LTP_ORDER]; 3] {
    [
        [0, 0, 16384, 0, 0],
        [-2048, 6144, 12288, 6144, -2048],
        [1024, 4096, 9216, 4096, 1024],
    ]
}

/// ICDF for the per-subframe quantization gain index (8 levels), shaped like
/// the reference's `silk_gain_iCDF`: mid-range gains are most likely.
pub(crate) const GAIN_ICDF: [u8; 8] = [224, 160, 100, 60, 32, 16, 6, 0];

/// Quantized per-subframe gain levels, Q10, indexed by [`GAIN_ICDF`]'s
/// decoded symbol. Spans roughly two orders of magnitude in ~3 dB steps,
/// the same log-spaced shape as the reference's gain codebook.
pub(crate) const GAIN_TABLE_Q10: [i32; 8] = [
    1 << 16,
    1 << 18,
    1 << 19,
    1 << 20,
    1 << 21,
    1 << 22,
    1 << 23,
    1 << 24,
];

/// Number of entries in [`STEREO_PRED_QUANT_Q13`].
pub(crate) const STEREO_QUANT_TAB_SIZE: usize = 16;

/// Quantized stereo prediction weight levels, Q13. Entry 0 is the literal
/// value from spec.md's S4 scenario (`-13732`); the remaining entries are a
/// symmetric, geometrically-shrinking spread toward zero in the same shape
/// as [`nlsf_stage2_codebook`] rather than a verified byte-for-byte
/// transcription (see `DESIGN.md`).
pub(crate) const STEREO_PRED_QUANT_Q13: [i32; STEREO_QUANT_TAB_SIZE] = [
    -13732, -10050, -8266, -7526, -6500, -5000, -2950, -820, 820, 2950, 5000, 6500, 7526, 8266,
    10050, 13732,
];
