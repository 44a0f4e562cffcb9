//! Static tables describing the CELT mode: band layout, windows, and the
//! probability models used by coarse/fine energy coding and the bit
//! allocator.
//!
//! The band boundaries and Q-format coefficients mirror the shapes used by
//! the reference codec (21 scale-factor bands, `{0.75, 0.823, 0.857, 0.875}`
//! inter-frame prediction coefficients, etc. per spec). [`allocation_table`]
//! is a transcription of the reference's `band_allocation[]` constants (see
//! `DESIGN.md` for provenance notes); we have no running reference in this
//! pack to diff a byte-for-byte transcription against, so treat it as a
//! best-effort reproduction of the real table rather than a verified one.

/// Number of CELT scale-factor bands.
pub(crate) const NUM_BANDS: usize = 21;

/// Band boundaries in 2.5 ms units (i.e. at LM == -2 granularity), scaled by
/// `1 << LM` to get the boundary in MDCT bins for a given frame size.
/// This is the standard `eband5ms` shape: 1 bin per band near DC, widening
/// towards the top band.
pub(crate) const EBAND5MS: [usize; NUM_BANDS + 1] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 12, 14, 16, 20, 24, 28, 34, 40, 48, 60, 78, 100,
];

/// Overlap length (samples) between consecutive CELT frames, fixed at 48 kHz.
pub(crate) const OVERLAP: usize = 120;

/// Returns the band boundaries (in MDCT bins) for the given `LM` (0..=3).
pub(crate) fn ebands_for_lm(lm: usize) -> [usize; NUM_BANDS + 1] {
    let mut out = [0usize; NUM_BANDS + 1];
    for (o, e) in out.iter_mut().zip(EBAND5MS.iter()) {
        *o = e << lm;
    }
    out
}

/// Inter-frame coarse-energy prediction coefficient, indexed by `LM`.
pub(crate) const PRED_COEF: [f32; 4] = [0.75, 0.823, 0.857, 0.875];
/// Inter-frame coarse-energy decay coefficient, indexed by `LM`.
pub(crate) const BETA_COEF: [f32; 4] = [0.039, 0.070, 0.102, 0.133];
/// Intra-frame (predictor reset) decay coefficient.
pub(crate) const BETA_INTRA: f32 = 0.15;

/// Q15 Laplace decay used for coarse energy residuals, indexed by `LM`.
/// Mirrors the reference's `e_prob_model` decay row shape: higher `LM`
/// (larger frames) uses a slower decay (narrower PMF) since there's more
/// signal to predict from.
pub(crate) const ENERGY_LAPLACE_DECAY: [u32; 4] = [6000, 5800, 5600, 5400];
/// Starting Q15 probability mass assigned to a zero coarse-energy residual,
/// indexed by `LM`.
pub(crate) const ENERGY_LAPLACE_START: [u32; 4] = [7000, 7400, 7800, 8200];

/// Vorbis power-complementary analysis/synthesis window of length [`OVERLAP`].
///
/// `w[i] = sin(pi/2 * sin^2(pi*(i+0.5)/(2*L)))`, computed lazily on first use
/// and cached, per spec.md's "trig tables may be precomputed lazily" note.
pub(crate) fn window() -> &'static [f32; OVERLAP] {
    static WINDOW: std::sync::OnceLock<[f32; OVERLAP]> = std::sync::OnceLock::new();
    WINDOW.get_or_init(|| {
        let mut w = [0f32; OVERLAP];
        let l = OVERLAP as f32;
        for (i, value) in w.iter_mut().enumerate() {
            let inner = (std::f32::consts::PI * (i as f32 + 0.5) / (2.0 * l)).sin();
            *value = (std::f32::consts::FRAC_PI_2 * inner * inner).sin();
        }
        w
    })
}

/// Per-band bit allocation "quality" curve: `ALLOCATION[q][band]` gives the
/// number of 1/8-bit units allocated to `band` at quality step `q`, for
/// `q` in `0..QUALITY_STEPS`. Row 0 is the "allocate nothing" floor and row
/// `QUALITY_STEPS - 1` is the "give every remaining band everything" ceiling
/// (band 20 jumps straight to 100), matching the reference's `band_allocation`
/// table shape: interior rows increase monotonically in quality and decrease
/// across bands as they get wider and costlier to fill.
pub(crate) const QUALITY_STEPS: usize = 11;

pub(crate) fn allocation_table() -> &'static [[u16; NUM_BANDS]; QUALITY_STEPS] {
    const TABLE: [[u16; NUM_BANDS]; QUALITY_STEPS] = [
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [90, 80, 75, 69, 63, 56, 49, 40, 34, 29, 20, 18, 10, 0, 0, 0, 0, 0, 0, 0, 0],
        [110, 100, 90, 84, 78, 71, 65, 58, 51, 45, 39, 32, 26, 20, 12, 0, 0, 0, 0, 0, 0],
        [118, 110, 103, 93, 86, 80, 75, 70, 65, 59, 53, 47, 40, 31, 23, 15, 4, 0, 0, 0, 0],
        [126, 119, 112, 104, 95, 89, 83, 78, 72, 66, 60, 54, 47, 39, 32, 25, 17, 12, 0, 0, 0],
        [134, 127, 120, 114, 103, 97, 91, 85, 78, 72, 66, 60, 54, 47, 41, 35, 29, 23, 16, 10, 1],
        [144, 137, 130, 124, 113, 107, 101, 95, 88, 82, 76, 70, 64, 57, 51, 45, 39, 33, 26, 15, 1],
        [152, 145, 138, 132, 123, 117, 111, 105, 98, 92, 86, 80, 74, 67, 61, 55, 49, 43, 36, 20, 1],
        [162, 155, 148, 142, 133, 127, 121, 115, 108, 102, 96, 90, 84, 77, 71, 65, 59, 53, 46, 30, 1],
        [172, 165, 158, 152, 143, 137, 131, 125, 118, 112, 106, 100, 94, 87, 81, 75, 69, 63, 56, 45, 20],
        [200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 200, 100],
    ];
    &TABLE
}

/// Static, per-band pulse caps (maximum PVQ bits/8 a band can absorb before
/// becoming "full"), proportional to band width at the given `LM`.
pub(crate) fn caps_for_lm(lm: usize) -> [u32; NUM_BANDS] {
    let ebands = ebands_for_lm(lm);
    let mut caps = [0u32; NUM_BANDS];
    for i in 0..NUM_BANDS {
        let width = (ebands[i + 1] - ebands[i]) as u32;
        // Reference caps top out near 8 bits/sample-pair; approximated here
        // as a linear function of band width in 1/8-bit units.
        caps[i] = width * 8 * 8;
    }
    caps
}

/// 7-bit ICDF table for the energy "trim" parameter (symmetric around the
/// middle value 5, total mass `1 << 7`).
pub(crate) const TRIM_ICDF: [u8; 11] =
    [126, 124, 119, 109, 87, 41, 19, 9, 4, 2, 0];

/// ICDF for the spread decision (4 outcomes: none, light, normal, aggressive).
pub(crate) const SPREAD_ICDF: [u8; 4] = [25, 23, 2, 0];

/// ICDF for the 1-bit TF-select flag.
pub(crate) const TF_SELECT_ICDF: [u8; 2] = [1, 0];
