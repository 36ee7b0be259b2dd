//! Reverb
//!
//! A stereo plate-style reverberator after Dattorro's figure-of-eight
//! topology: the input, mixed to mono, goes through a smoothed pre-delay
//! and a bandwidth low-pass, then four series diffusion allpasses, into a
//! tank of two cross-coupled paths. Each tank path holds a modulated
//! allpass (its delay wobbled by a slow sine, ±8 samples at the reference
//! rate), a long fixed delay, a damping low-pass, the decay gain, and a
//! second fixed allpass. The stereo outputs are signed sums of seven taps
//! each into the tank delay lines, mixed with the dry input by a
//! [`drywet`](crate::drywet) stage.
//!
//! All internal delay lengths are fixed ratios of a 29761-sample reference
//! (the sample rate of the original design), rescaled to the actual sample
//! rate. The second diffusion coefficient tracks the decay setting as
//! `clamp(decay + 0.15, 0.25, 0.5)`; for `decay < 1` the loop is strictly
//! contractive and the bandwidth/damping filters bound the high end.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::delay::{DelayCoeffs, DelayState};
use crate::drywet::DryWetCoeffs;
use crate::gain::GainCoeffs;
use crate::lp1::{Lp1Coeffs, Lp1State};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState};
use crate::osc_sin;
use crate::phase_gen::{PhaseGenCoeffs, PhaseGenState};
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Reference sample rate the delay ratios are expressed against.
const REF: f32 = 29761.0;

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct ReverbCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    predelay_coeffs: DelayCoeffs,
    bandwidth_coeffs: Lp1Coeffs,
    delay_id1_coeffs: DelayCoeffs,
    delay_id2_coeffs: DelayCoeffs,
    delay_id3_coeffs: DelayCoeffs,
    delay_id4_coeffs: DelayCoeffs,
    delay_dd1_coeffs: DelayCoeffs,
    delay_dd2_coeffs: DelayCoeffs,
    delay_dd3_coeffs: DelayCoeffs,
    delay_dd4_coeffs: DelayCoeffs,
    delay_d1_coeffs: DelayCoeffs,
    delay_d2_coeffs: DelayCoeffs,
    delay_d3_coeffs: DelayCoeffs,
    delay_d4_coeffs: DelayCoeffs,
    decay_coeffs: GainCoeffs,
    phase_gen_coeffs: PhaseGenCoeffs,
    phase_gen_state: PhaseGenState,
    damping_coeffs: Lp1Coeffs,
    drywet_coeffs: DryWetCoeffs,
    smooth_coeffs: OnePoleCoeffs,
    smooth_predelay_state: OnePoleState,

    // Coefficients
    fs: f32,
    t: f32,
    id1: usize,
    id2: usize,
    id3: usize,
    id4: usize,
    dd2: usize,
    dd4: usize,
    d1: usize,
    d2: usize,
    d3: usize,
    d4: usize,
    dl: [usize; 7],
    dr: [usize; 7],
    s: f32,
    diff2: f32,

    // Parameters
    predelay: f32,
}

/// Per-voice reverb memory: the thirteen delay lines plus the bandwidth
/// and damping filter states.
#[derive(Debug, Default)]
pub struct ReverbState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    predelay_state: DelayState,
    bandwidth_state: Lp1State,
    delay_id1_state: DelayState,
    delay_id2_state: DelayState,
    delay_id3_state: DelayState,
    delay_id4_state: DelayState,
    delay_dd1_state: DelayState,
    delay_dd2_state: DelayState,
    delay_dd3_state: DelayState,
    delay_dd4_state: DelayState,
    delay_d1_state: DelayState,
    delay_d2_state: DelayState,
    delay_d3_state: DelayState,
    delay_d4_state: DelayState,
    damping_1_state: Lp1State,
    damping_2_state: Lp1State,
}

impl ReverbState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReverbCoeffs {
    /// Creates coefficients with default parameters: predelay `0`,
    /// bandwidth `20` kHz, damping `20` kHz, decay `0.5`, wet `0.5`.
    pub fn new() -> Self {
        let mut bandwidth_coeffs = Lp1Coeffs::new();
        let mut damping_coeffs = Lp1Coeffs::new();
        let mut decay_coeffs = GainCoeffs::new();
        let mut smooth_coeffs = OnePoleCoeffs::new();
        bandwidth_coeffs.set_cutoff(20e3);
        damping_coeffs.set_cutoff(20e3);
        decay_coeffs.set_gain_lin(0.5);
        smooth_coeffs.set_tau(0.05);
        smooth_coeffs.set_sticky_thresh(1e-6);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("reverb_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            predelay_coeffs: DelayCoeffs::new(0.1),
            bandwidth_coeffs,
            delay_id1_coeffs: DelayCoeffs::new(142.0 / REF),
            delay_id2_coeffs: DelayCoeffs::new(107.0 / REF),
            delay_id3_coeffs: DelayCoeffs::new(379.0 / REF),
            delay_id4_coeffs: DelayCoeffs::new(277.0 / REF),
            delay_dd1_coeffs: DelayCoeffs::new((672.0 + 8.0) / REF),
            delay_dd2_coeffs: DelayCoeffs::new(1800.0 / REF),
            delay_dd3_coeffs: DelayCoeffs::new((908.0 + 8.0) / REF),
            delay_dd4_coeffs: DelayCoeffs::new(2656.0 / REF),
            delay_d1_coeffs: DelayCoeffs::new(4453.0 / REF),
            delay_d2_coeffs: DelayCoeffs::new(3720.0 / REF),
            delay_d3_coeffs: DelayCoeffs::new(4217.0 / REF),
            delay_d4_coeffs: DelayCoeffs::new(3163.0 / REF),
            decay_coeffs,
            phase_gen_coeffs: PhaseGenCoeffs::new(),
            phase_gen_state: PhaseGenState::new(),
            damping_coeffs,
            drywet_coeffs: DryWetCoeffs::new(),
            smooth_coeffs,
            smooth_predelay_state: OnePoleState::new(),
            fs: 0.0,
            t: 0.0,
            id1: 0,
            id2: 0,
            id3: 0,
            id4: 0,
            dd2: 0,
            dd4: 0,
            d1: 0,
            d2: 0,
            d3: 0,
            d4: 0,
            dl: [0; 7],
            dr: [0; 7],
            s: 0.0,
            diff2: 0.0,
            predelay: 0.0,
        }
    }

    fn each_delay_coeffs(&self) -> [&DelayCoeffs; 13] {
        [
            &self.predelay_coeffs,
            &self.delay_id1_coeffs,
            &self.delay_id2_coeffs,
            &self.delay_id3_coeffs,
            &self.delay_id4_coeffs,
            &self.delay_dd1_coeffs,
            &self.delay_dd2_coeffs,
            &self.delay_dd3_coeffs,
            &self.delay_dd4_coeffs,
            &self.delay_d1_coeffs,
            &self.delay_d2_coeffs,
            &self.delay_d3_coeffs,
            &self.delay_d4_coeffs,
        ]
    }

    /// Sets the sample rate (Hz) and rescales every internal delay length
    /// and output tap to it.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        dsp_debug_assert!(sample_rate.is_finite() && sample_rate > 0.0);
        self.predelay_coeffs.set_sample_rate(sample_rate);
        self.bandwidth_coeffs.set_sample_rate(sample_rate);
        self.delay_id1_coeffs.set_sample_rate(sample_rate);
        self.delay_id2_coeffs.set_sample_rate(sample_rate);
        self.delay_id3_coeffs.set_sample_rate(sample_rate);
        self.delay_id4_coeffs.set_sample_rate(sample_rate);
        self.delay_dd1_coeffs.set_sample_rate(sample_rate);
        self.delay_dd2_coeffs.set_sample_rate(sample_rate);
        self.delay_dd3_coeffs.set_sample_rate(sample_rate);
        self.delay_dd4_coeffs.set_sample_rate(sample_rate);
        self.delay_d1_coeffs.set_sample_rate(sample_rate);
        self.delay_d2_coeffs.set_sample_rate(sample_rate);
        self.delay_d3_coeffs.set_sample_rate(sample_rate);
        self.delay_d4_coeffs.set_sample_rate(sample_rate);
        self.decay_coeffs.set_sample_rate(sample_rate);
        self.phase_gen_coeffs.set_sample_rate(sample_rate);
        self.damping_coeffs.set_sample_rate(sample_rate);
        self.drywet_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.reset_coeffs();
        self.fs = sample_rate;
        self.t = math::rcp(sample_rate);
        let tap = |n: f32| math::round(sample_rate * (n / REF)) as usize;
        self.id1 = tap(142.0);
        self.id2 = tap(107.0);
        self.id3 = tap(379.0);
        self.id4 = tap(277.0);
        self.dd2 = tap(1800.0);
        self.dd4 = tap(2656.0);
        self.d1 = tap(4453.0);
        self.d2 = tap(3720.0);
        self.d3 = tap(4217.0);
        self.d4 = tap(3163.0);
        self.dl = [
            tap(266.0),
            tap(2974.0),
            tap(1913.0),
            tap(1996.0),
            tap(1990.0),
            tap(187.0),
            tap(1066.0),
        ];
        self.dr = [
            tap(353.0),
            tap(3627.0),
            tap(1228.0),
            tap(2673.0),
            tap(2111.0),
            tap(335.0),
            tap(121.0),
        ];
    }

    /// Returns the total backing length, in samples, of all internal delay
    /// lines, to hand to [`mem_set`](Self::mem_set).
    pub fn mem_req(&self) -> usize {
        self.each_delay_coeffs().iter().map(|c| c.mem_req()).sum()
    }

    /// Carves `mem` into the thirteen delay-line buffers of `state`.
    /// `mem.len()` must equal [`mem_req`](Self::mem_req).
    pub fn mem_set(&self, state: &mut ReverbState, mem: Box<[f32]>) {
        dsp_debug_assert!(mem.len() == self.mem_req());
        let mut rest: Vec<f32> = mem.into_vec();
        let mut carve = |req: usize| -> Box<[f32]> {
            let tail = rest.split_off(req);
            let chunk = core::mem::replace(&mut rest, tail);
            chunk.into_boxed_slice()
        };
        let p = carve(self.predelay_coeffs.mem_req());
        self.predelay_coeffs.mem_set(&mut state.predelay_state, p);
        let p = carve(self.delay_id1_coeffs.mem_req());
        self.delay_id1_coeffs.mem_set(&mut state.delay_id1_state, p);
        let p = carve(self.delay_id2_coeffs.mem_req());
        self.delay_id2_coeffs.mem_set(&mut state.delay_id2_state, p);
        let p = carve(self.delay_id3_coeffs.mem_req());
        self.delay_id3_coeffs.mem_set(&mut state.delay_id3_state, p);
        let p = carve(self.delay_id4_coeffs.mem_req());
        self.delay_id4_coeffs.mem_set(&mut state.delay_id4_state, p);
        let p = carve(self.delay_dd1_coeffs.mem_req());
        self.delay_dd1_coeffs.mem_set(&mut state.delay_dd1_state, p);
        let p = carve(self.delay_dd2_coeffs.mem_req());
        self.delay_dd2_coeffs.mem_set(&mut state.delay_dd2_state, p);
        let p = carve(self.delay_dd3_coeffs.mem_req());
        self.delay_dd3_coeffs.mem_set(&mut state.delay_dd3_state, p);
        let p = carve(self.delay_dd4_coeffs.mem_req());
        self.delay_dd4_coeffs.mem_set(&mut state.delay_dd4_state, p);
        let p = carve(self.delay_d1_coeffs.mem_req());
        self.delay_d1_coeffs.mem_set(&mut state.delay_d1_state, p);
        let p = carve(self.delay_d2_coeffs.mem_req());
        self.delay_d2_coeffs.mem_set(&mut state.delay_d2_state, p);
        let p = carve(self.delay_d3_coeffs.mem_req());
        self.delay_d3_coeffs.mem_set(&mut state.delay_d3_state, p);
        let p = carve(self.delay_d4_coeffs.mem_req());
        self.delay_d4_coeffs.mem_set(&mut state.delay_d4_state, p);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("reverb_state");
        }
    }

    /// Pre-delay time quantised to a whole number of samples. Rounding can
    /// land one sample past the line's maximum at awkward sample rates, so
    /// the result is clamped back.
    fn predelay_quantised(&self) -> f32 {
        math::min(self.t * math::round(self.fs * self.predelay), 0.1)
    }

    /// Forces coefficients to their target values, restarts the tank
    /// modulation oscillator, and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.predelay_coeffs.reset_coeffs();
        self.bandwidth_coeffs.reset_coeffs();
        self.delay_id1_coeffs.reset_coeffs();
        self.delay_id2_coeffs.reset_coeffs();
        self.delay_id3_coeffs.reset_coeffs();
        self.delay_id4_coeffs.reset_coeffs();
        self.delay_dd1_coeffs.reset_coeffs();
        self.delay_dd2_coeffs.reset_coeffs();
        self.delay_dd3_coeffs.reset_coeffs();
        self.delay_dd4_coeffs.reset_coeffs();
        self.delay_d1_coeffs.reset_coeffs();
        self.delay_d2_coeffs.reset_coeffs();
        self.delay_d3_coeffs.reset_coeffs();
        self.delay_d4_coeffs.reset_coeffs();
        self.decay_coeffs.reset_coeffs();
        self.phase_gen_coeffs.reset_coeffs();
        self.phase_gen_coeffs
            .reset_state(&mut self.phase_gen_state, 0.0);
        self.damping_coeffs.reset_coeffs();
        self.drywet_coeffs.reset_coeffs();
        let pd = self.predelay_quantised();
        self.smooth_coeffs
            .reset_state(&mut self.smooth_predelay_state, pd);
        self.predelay_coeffs.set_delay(pd);
        self.predelay_coeffs.update_coeffs_ctrl();
        self.s = 0.0;
        self.diff2 = math::clip(self.decay_coeffs.get_gain_cur() + 0.15, 0.25, 0.5);
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Clears the tank and seeds `state`; returns the initial stereo
    /// output pair for the initial inputs `(xl0, xr0)` (the wet path
    /// starts silent, so this is the dry mix alone).
    pub fn reset_state(&self, state: &mut ReverbState, xl0: f32, xr0: f32) -> (f32, f32) {
        dsp_debug_assert!(xl0.is_finite() && xr0.is_finite());
        self.predelay_coeffs
            .reset_state(&mut state.predelay_state, 0.0);
        self.bandwidth_coeffs
            .reset_state(&mut state.bandwidth_state, 0.0);
        self.delay_id1_coeffs
            .reset_state(&mut state.delay_id1_state, 0.0);
        self.delay_id2_coeffs
            .reset_state(&mut state.delay_id2_state, 0.0);
        self.delay_id3_coeffs
            .reset_state(&mut state.delay_id3_state, 0.0);
        self.delay_id4_coeffs
            .reset_state(&mut state.delay_id4_state, 0.0);
        self.delay_dd1_coeffs
            .reset_state(&mut state.delay_dd1_state, 0.0);
        self.delay_dd2_coeffs
            .reset_state(&mut state.delay_dd2_state, 0.0);
        self.delay_dd3_coeffs
            .reset_state(&mut state.delay_dd3_state, 0.0);
        self.delay_dd4_coeffs
            .reset_state(&mut state.delay_dd4_state, 0.0);
        self.delay_d1_coeffs
            .reset_state(&mut state.delay_d1_state, 0.0);
        self.delay_d2_coeffs
            .reset_state(&mut state.delay_d2_state, 0.0);
        self.delay_d3_coeffs
            .reset_state(&mut state.delay_d3_state, 0.0);
        self.delay_d4_coeffs
            .reset_state(&mut state.delay_d4_state, 0.0);
        self.damping_coeffs
            .reset_state(&mut state.damping_1_state, 0.0);
        self.damping_coeffs
            .reset_state(&mut state.damping_2_state, 0.0);
        #[cfg(feature = "debug-deep")]
        {
            state.coeffs_reset_id = self.reset_id;
        }
        (
            self.drywet_coeffs.process1(xl0, 0.0),
            self.drywet_coeffs.process1(xr0, 0.0),
        )
    }

    /// Control-rate update.
    pub fn update_coeffs_ctrl(&mut self) {
        self.bandwidth_coeffs.update_coeffs_ctrl();
        self.decay_coeffs.update_coeffs_ctrl();
        self.phase_gen_coeffs.update_coeffs_ctrl();
        self.drywet_coeffs.update_coeffs_ctrl();
        self.damping_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the predelay/decay/wet smoothers and
    /// the tank modulation oscillator.
    pub fn update_coeffs_audio(&mut self) {
        self.predelay_coeffs.update_coeffs_audio();
        self.bandwidth_coeffs.update_coeffs_audio();
        let predelay_quantised = self.predelay_quantised();
        let pd = self
            .smooth_coeffs
            .process1_sticky_abs(&mut self.smooth_predelay_state, predelay_quantised);
        self.predelay_coeffs.set_delay(pd);
        self.predelay_coeffs.update_coeffs_ctrl();
        self.decay_coeffs.update_coeffs_audio();
        self.phase_gen_coeffs.update_coeffs_audio();
        let (p, _) = self.phase_gen_coeffs.process1(&mut self.phase_gen_state);
        self.s = (8.0 / REF) * osc_sin::process1(p);
        self.damping_coeffs.update_coeffs_audio();
        self.diff2 = math::clip(self.decay_coeffs.get_gain_cur() + 0.15, 0.25, 0.5);
        self.drywet_coeffs.update_coeffs_audio();
    }

    /// Processes one stereo sample pair.
    pub fn process1(&self, state: &mut ReverbState, xl: f32, xr: f32) -> (f32, f32) {
        dsp_debug_assert!(xl.is_finite() && xr.is_finite());
        let i = 0.5 * (xl + xr);
        let pd = self
            .predelay_coeffs
            .process1(&mut state.predelay_state, i);
        let bw = self
            .bandwidth_coeffs
            .process1(&mut state.bandwidth_state, pd);

        // input diffusion chain
        let n14 = self
            .delay_id1_coeffs
            .read(&state.delay_id1_state, self.id1, 0.0);
        let n13 = bw - 0.75 * n14;
        let id1 = n14 + 0.75 * n13;
        self.delay_id1_coeffs.write(&mut state.delay_id1_state, n13);
        let n20 = self
            .delay_id2_coeffs
            .read(&state.delay_id2_state, self.id2, 0.0);
        let n19 = id1 - 0.75 * n20;
        let id2 = n20 + 0.75 * n19;
        self.delay_id2_coeffs.write(&mut state.delay_id2_state, n19);
        let n16 = self
            .delay_id3_coeffs
            .read(&state.delay_id3_state, self.id3, 0.0);
        let n15 = id2 - 0.625 * n16;
        let id3 = n16 + 0.625 * n15;
        self.delay_id3_coeffs.write(&mut state.delay_id3_state, n15);
        let n22 = self
            .delay_id4_coeffs
            .read(&state.delay_id4_state, self.id4, 0.0);
        let n21 = id3 - 0.625 * n22;
        let id4 = n22 + 0.625 * n21;
        self.delay_id4_coeffs.write(&mut state.delay_id4_state, n21);

        // tank cross-feed
        let n39 = self
            .delay_d2_coeffs
            .read(&state.delay_d2_state, self.d2, 0.0);
        let n63 = self
            .delay_d4_coeffs
            .read(&state.delay_d4_state, self.d4, 0.0);
        let s1 = id4 + self.decay_coeffs.process1(n63);
        let s2 = id4 + self.decay_coeffs.process1(n39);

        // modulated tank allpasses
        let (dd1if, dd1f) = math::intfrac(self.fs * ((672.0 / REF) + self.s));
        let dd1i = dd1if as usize;
        let (dd3if, dd3f) = math::intfrac(self.fs * ((908.0 / REF) + self.s));
        let dd3i = dd3if as usize;

        let n24 = self
            .delay_dd1_coeffs
            .read(&state.delay_dd1_state, dd1i, dd1f);
        let n23 = s1 + 0.7 * n24;
        let dd1 = n24 - 0.7 * n23;
        self.delay_dd1_coeffs.write(&mut state.delay_dd1_state, n23);
        let n48 = self
            .delay_dd3_coeffs
            .read(&state.delay_dd3_state, dd3i, dd3f);
        let n46 = s2 + 0.7 * n48;
        let dd3 = n48 - 0.7 * n46;
        self.delay_dd3_coeffs.write(&mut state.delay_dd3_state, n46);

        // long delays into damping and decay
        let n30 = self
            .delay_d1_coeffs
            .read(&state.delay_d1_state, self.d1, 0.0);
        self.delay_d1_coeffs.write(&mut state.delay_d1_state, dd1);
        let n54 = self
            .delay_d3_coeffs
            .read(&state.delay_d3_state, self.d3, 0.0);
        self.delay_d3_coeffs.write(&mut state.delay_d3_state, dd3);
        let damp1 = self
            .damping_coeffs
            .process1(&mut state.damping_1_state, n30);
        let damp2 = self
            .damping_coeffs
            .process1(&mut state.damping_2_state, n54);
        let decay1 = self.decay_coeffs.process1(damp1);
        let decay2 = self.decay_coeffs.process1(damp2);

        // second (fixed) tank diffusion allpasses
        let n33 = self
            .delay_dd2_coeffs
            .read(&state.delay_dd2_state, self.dd2, 0.0);
        let n31 = decay1 - self.diff2 * n33;
        let dd2 = n33 + self.diff2 * n31;
        self.delay_dd2_coeffs.write(&mut state.delay_dd2_state, n31);
        let n59 = self
            .delay_dd4_coeffs
            .read(&state.delay_dd4_state, self.dd4, 0.0);
        let n55 = decay2 - self.diff2 * n59;
        let dd4 = n59 + self.diff2 * n55;
        self.delay_dd4_coeffs.write(&mut state.delay_dd4_state, n55);
        self.delay_d2_coeffs.write(&mut state.delay_d2_state, dd2);
        self.delay_d4_coeffs.write(&mut state.delay_d4_state, dd4);

        // stereo tap sums
        let yl = 0.6
            * (self
                .delay_d3_coeffs
                .read(&state.delay_d3_state, self.dl[0], 0.0)
                + self
                    .delay_d3_coeffs
                    .read(&state.delay_d3_state, self.dl[1], 0.0)
                - self
                    .delay_dd4_coeffs
                    .read(&state.delay_dd4_state, self.dl[2], 0.0)
                + self
                    .delay_d4_coeffs
                    .read(&state.delay_d4_state, self.dl[3], 0.0)
                - self
                    .delay_d1_coeffs
                    .read(&state.delay_d1_state, self.dl[4], 0.0)
                - self
                    .delay_dd2_coeffs
                    .read(&state.delay_dd2_state, self.dl[5], 0.0)
                - self
                    .delay_d2_coeffs
                    .read(&state.delay_d2_state, self.dl[6], 0.0));
        let yr = 0.6
            * (self
                .delay_d1_coeffs
                .read(&state.delay_d1_state, self.dr[0], 0.0)
                + self
                    .delay_d1_coeffs
                    .read(&state.delay_d1_state, self.dr[1], 0.0)
                - self
                    .delay_dd2_coeffs
                    .read(&state.delay_dd2_state, self.dr[2], 0.0)
                + self
                    .delay_d2_coeffs
                    .read(&state.delay_d2_state, self.dr[3], 0.0)
                - self
                    .delay_d3_coeffs
                    .read(&state.delay_d3_state, self.dr[4], 0.0)
                - self
                    .delay_dd4_coeffs
                    .read(&state.delay_dd4_state, self.dr[5], 0.0)
                - self
                    .delay_d4_coeffs
                    .read(&state.delay_d4_state, self.dr[6], 0.0));
        (
            self.drywet_coeffs.process1(xl, yl),
            self.drywet_coeffs.process1(xr, yr),
        )
    }

    /// Processes the stereo buffers `xl`/`xr` into `yl`/`yr`.
    pub fn process(
        &mut self,
        state: &mut ReverbState,
        xl: &[f32],
        xr: &[f32],
        yl: &mut [f32],
        yr: &mut [f32],
    ) {
        dsp_debug_assert!(xl.len() == xr.len() && xl.len() == yl.len() && xl.len() == yr.len());
        self.update_coeffs_ctrl();
        for i in 0..yl.len() {
            self.update_coeffs_audio();
            let (l, r) = self.process1(state, xl[i], xr[i]);
            yl[i] = l;
            yr[i] = r;
        }
    }

    /// Multi-channel [`process`](Self::process): shared coefficients, one
    /// state per channel, sample-outer/channel-inner iteration.
    pub fn process_multi(
        &mut self,
        states: &mut [ReverbState],
        xl: &[&[f32]],
        xr: &[&[f32]],
        yl: &mut [&mut [f32]],
        yr: &mut [&mut [f32]],
    ) {
        dsp_debug_assert!(states.len() == xl.len() && states.len() == xr.len());
        dsp_debug_assert!(states.len() == yl.len() && states.len() == yr.len());
        self.update_coeffs_ctrl();
        let n_samples = yl.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for (j, state) in states.iter_mut().enumerate() {
                let (l, r) = self.process1(state, xl[j][i], xr[j][i]);
                yl[j][i] = l;
                yr[j][i] = r;
            }
        }
    }

    /// Sets the pre-delay time (s). Valid range: `[0, 0.1]`. The applied
    /// value is quantised to a whole number of samples.
    pub fn set_predelay(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=0.1).contains(&value));
        self.predelay = value;
    }

    /// Sets the input bandwidth (Hz), the cutoff of the low-pass ahead of
    /// the tank.
    pub fn set_bandwidth(&mut self, value: f32) {
        self.bandwidth_coeffs.set_cutoff(value);
    }

    /// Sets the tank damping (Hz), the cutoff of the two in-loop
    /// low-passes.
    pub fn set_damping(&mut self, value: f32) {
        self.damping_coeffs.set_cutoff(value);
    }

    /// Sets the decay (tank feedback gain). Valid range: `[0, 1)`.
    pub fn set_decay(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..1.0).contains(&value));
        self.decay_coeffs.set_gain_lin(value);
    }

    /// Sets the wet amount. Valid range: `[0, 1]`.
    pub fn set_wet(&mut self, value: f32) {
        self.drywet_coeffs.set_wet(value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("reverb_coeffs") {
                return false;
            }
        }
        if !(self.predelay.is_finite() && (0.0..=0.1).contains(&self.predelay)) {
            return false;
        }
        self.each_delay_coeffs().iter().all(|c| c.coeffs_is_valid())
            && self.bandwidth_coeffs.coeffs_is_valid()
            && self.damping_coeffs.coeffs_is_valid()
            && self.decay_coeffs.coeffs_is_valid()
            && self.phase_gen_coeffs.coeffs_is_valid()
            && self.drywet_coeffs.coeffs_is_valid()
            && self.smooth_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &ReverbState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("reverb_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.predelay_coeffs.state_is_valid(&state.predelay_state)
            && self.delay_id1_coeffs.state_is_valid(&state.delay_id1_state)
            && self.delay_id2_coeffs.state_is_valid(&state.delay_id2_state)
            && self.delay_id3_coeffs.state_is_valid(&state.delay_id3_state)
            && self.delay_id4_coeffs.state_is_valid(&state.delay_id4_state)
            && self.delay_dd1_coeffs.state_is_valid(&state.delay_dd1_state)
            && self.delay_dd2_coeffs.state_is_valid(&state.delay_dd2_state)
            && self.delay_dd3_coeffs.state_is_valid(&state.delay_dd3_state)
            && self.delay_dd4_coeffs.state_is_valid(&state.delay_dd4_state)
            && self.delay_d1_coeffs.state_is_valid(&state.delay_d1_state)
            && self.delay_d2_coeffs.state_is_valid(&state.delay_d2_state)
            && self.delay_d3_coeffs.state_is_valid(&state.delay_d3_state)
            && self.delay_d4_coeffs.state_is_valid(&state.delay_d4_state)
            && self.bandwidth_coeffs.state_is_valid(&state.bandwidth_state)
            && self.damping_coeffs.state_is_valid(&state.damping_1_state)
            && self.damping_coeffs.state_is_valid(&state.damping_2_state)
    }
}

impl Default for ReverbCoeffs {
    fn default() -> Self {
        Self::new()
    }
}
