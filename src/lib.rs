//! # Tessella: Composable Real-Time Audio DSP Primitives
//!
//! > *"A tessella is one small tile of a mosaic. Each one is trivial on its
//! > own; the picture comes from how they fit together."*
//!
//! `tessella` is a Rust library of small real-time audio DSP primitives —
//! filters, delays, dynamics, waveshapers, modulation effects — designed to
//! be embedded inside audio engines, synthesizers, and effect plug-ins.
//! Every primitive obeys one uniform contract, so larger processors are
//! built by composing smaller ones rather than by re-implementing parameter
//! smoothing and lifecycle plumbing each time.
//!
//! ## The Coeffs/State Contract
//!
//! Each primitive is a pair of types:
//!
//! - **Coeffs** — parameters and derived coefficients, shared by every
//!   voice that must stay in sync (one filter sweep driving eight unison
//!   voices costs one coefficient update per sample, not eight);
//! - **State** — per-voice memory (filter history, delay-line contents,
//!   oscillator phase), never shared between voices.
//!
//! The lifecycle is fixed and checked (under the `debug`/`debug-deep`
//! features) at every step:
//!
//! ```text
//! Coeffs:  new() → set_sample_rate(fs) → reset_coeffs() ─┐
//! State:   new() → [mem_set(buf)] → reset_state(x0) ←────┘ (epoch-coupled)
//!
//! per block:   update_coeffs_ctrl()
//! per sample:  update_coeffs_audio(), then process1() per voice
//! ```
//!
//! `process()` bundles the per-block/per-sample choreography for one voice;
//! `process_multi()` does it for N voices sharing one Coeffs, iterating
//! samples in the outer loop and channels in the inner one so that every
//! channel sees the identical coefficient trajectory.
//!
//! ## Click-Free Parameters
//!
//! Parameter changes never step: every audible parameter runs through the
//! [`one_pole`] smoother, a one-pole low-pass with independent up/down time
//! constants and "sticky" snap-to-target thresholds that keep settled
//! smoothers from generating denormal dust. The smoother advances once per
//! sample in `update_coeffs_audio`, which is also where expensive
//! re-derivations (`tan`, `exp`) hide behind change detection.
//!
//! ## Module Map
//!
//! | Layer | Modules |
//! |-------|---------|
//! | utilities | [`math`], [`buf`] |
//! | generators & memory | [`one_pole`], [`delay`], [`phase_gen`], [`osc_sin`] |
//! | filters | [`svf`], [`lp1`], [`hp1`], [`mm1`], [`ap1`], [`hs1`], [`ls1`], [`peak`], [`notch`], [`pink_filt`] |
//! | dynamics | [`env_follow`], [`comp`], [`noise_gate`], [`ppm`] |
//! | nonlinear | [`satur`], [`clip`], [`osc_pulse`], [`sr_reduce`] |
//! | modulation & mix | [`ring_mod`], [`drywet`], [`gain`], [`trem`], [`phaser`], [`wah`] |
//! | composites | [`comb`], [`cab`], [`drive`], [`fuzz`], [`reverb`] |
//!
//! ## Quick Start
//!
//! ```rust
//! use tessella::prelude::*;
//!
//! // a state-variable filter shared by two voices
//! let mut coeffs = SvfCoeffs::new();
//! coeffs.set_cutoff(1000.0);
//! coeffs.set_q(0.707);
//! coeffs.set_sample_rate(48000.0);
//! coeffs.reset_coeffs();
//!
//! let mut states = [SvfState::new(), SvfState::new()];
//! coeffs.reset_state_multi(&mut states, &[0.0, 0.0], None);
//!
//! let left = [0.0f32; 64];
//! let right = [0.0f32; 64];
//! let mut out_l = [0.0f32; 64];
//! let mut out_r = [0.0f32; 64];
//! {
//!     let inputs: [&[f32]; 2] = [&left, &right];
//!     let mut lows: [&mut [f32]; 2] = [&mut out_l, &mut out_r];
//!     coeffs.process_multi(&mut states, &inputs, Some(&mut lows), None, None);
//! }
//! ```
//!
//! ## Real-Time Guarantees
//!
//! Nothing on the audio path allocates, blocks, or performs I/O. Primitives
//! that need backing storage (the delay-bearing ones) report their size via
//! `mem_req()` and have the caller bind a buffer with `mem_set()` before
//! use — when and how to allocate stays the caller's decision. All
//! operations run to completion in time bounded by the sample count,
//! channel count, and delay lengths.
//!
//! ## Error Handling
//!
//! There are no `Result`s on the audio path. Contract violations (out-of-
//! range parameters, wrong lifecycle order, a State used with a Coeffs it
//! was not reset against) are programming errors: they panic under the
//! `debug`/`debug-deep` features and are unchecked otherwise. Numeric edge
//! cases (division guards, log-of-zero floors, prewarp clamping) are
//! handled silently in release and debug alike.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod ap1;
pub mod buf;
pub mod cab;
pub mod clip;
pub mod comb;
pub mod comp;
mod debug;
pub mod delay;
pub mod drive;
pub mod drywet;
pub mod env_follow;
pub mod fuzz;
pub mod gain;
pub mod hp1;
pub mod hs1;
pub mod lp1;
pub mod ls1;
pub mod math;
pub mod mm1;
pub mod noise_gate;
pub mod notch;
pub mod one_pole;
pub mod osc_pulse;
pub mod osc_sin;
pub mod peak;
pub mod phase_gen;
pub mod phaser;
pub mod pink_filt;
pub mod ppm;
pub mod reverb;
pub mod ring_mod;
pub mod satur;
pub mod sr_reduce;
pub mod svf;
pub mod trem;
pub mod wah;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ap1::{Ap1Coeffs, Ap1State};
    pub use crate::cab::{CabCoeffs, CabState};
    pub use crate::clip::{ClipCoeffs, ClipState};
    pub use crate::comb::{CombCoeffs, CombState};
    pub use crate::comp::{CompCoeffs, CompState};
    pub use crate::delay::{DelayCoeffs, DelayState};
    pub use crate::drive::{DriveCoeffs, DriveState};
    pub use crate::drywet::DryWetCoeffs;
    pub use crate::env_follow::{EnvFollowCoeffs, EnvFollowState};
    pub use crate::fuzz::{FuzzCoeffs, FuzzState};
    pub use crate::gain::GainCoeffs;
    pub use crate::hp1::{Hp1Coeffs, Hp1State};
    pub use crate::hs1::{Hs1Coeffs, Hs1State};
    pub use crate::lp1::{Lp1Coeffs, Lp1State};
    pub use crate::ls1::{Ls1Coeffs, Ls1State};
    pub use crate::mm1::{Mm1Coeffs, Mm1State};
    pub use crate::noise_gate::{NoiseGateCoeffs, NoiseGateState};
    pub use crate::notch::{NotchCoeffs, NotchState};
    pub use crate::one_pole::{OnePoleCoeffs, OnePoleState, StickyMode};
    pub use crate::osc_pulse::OscPulseCoeffs;
    pub use crate::peak::{PeakCoeffs, PeakState};
    pub use crate::phase_gen::{PhaseGenCoeffs, PhaseGenState};
    pub use crate::phaser::{PhaserCoeffs, PhaserState};
    pub use crate::pink_filt::{PinkFiltCoeffs, PinkFiltState};
    pub use crate::ppm::{PpmCoeffs, PpmState};
    pub use crate::reverb::{ReverbCoeffs, ReverbState};
    pub use crate::ring_mod::RingModCoeffs;
    pub use crate::satur::{SaturCoeffs, SaturState};
    pub use crate::sr_reduce::{SrReduceCoeffs, SrReduceState};
    pub use crate::svf::{SvfCoeffs, SvfState};
    pub use crate::trem::{TremCoeffs, TremState};
    pub use crate::wah::{WahCoeffs, WahState};
}
