//! A stereo channel strip: shared coefficients driving two channels in
//! lock-step through `process_multi` — high-pass rumble filter, peak EQ,
//! and a compressor keyed from its own input, with PPM metering.
//!
//! Run with: `cargo run --example channel_strip`

use tessella::prelude::*;

const FS: f32 = 48000.0;
const BLOCK: usize = 512;
const SECONDS: usize = 2;

fn main() {
    let mut hp = Hp1Coeffs::new();
    hp.set_cutoff(40.0);
    hp.set_sample_rate(FS);
    hp.reset_coeffs();
    let mut hp_states = [Hp1State::new(), Hp1State::new()];
    hp.reset_state_multi(&mut hp_states, &[0.0, 0.0], None);

    let mut eq = PeakCoeffs::new();
    eq.set_cutoff(2500.0);
    eq.set_peak_gain_db(4.0);
    eq.set_bandwidth(1.5);
    eq.set_sample_rate(FS);
    eq.reset_coeffs();
    let mut eq_states = [PeakState::new(), PeakState::new()];
    eq.reset_state_multi(&mut eq_states, &[0.0, 0.0], None);

    let mut comp = CompCoeffs::new();
    comp.set_thresh_dbfs(-18.0);
    comp.set_ratio(1.0 / 3.0);
    comp.set_attack_tau(0.005);
    comp.set_release_tau(0.12);
    comp.set_gain_db(4.0);
    comp.set_sample_rate(FS);
    comp.reset_coeffs();
    let mut comp_states = [CompState::new(), CompState::new()];
    comp.reset_state_multi(&mut comp_states, &[0.0, 0.0], &[0.0, 0.0], None);

    let mut meter = PpmCoeffs::new();
    meter.set_integration_tau(0.005);
    meter.set_sample_rate(FS);
    meter.reset_coeffs();
    let mut meter_states = [PpmState::new(), PpmState::new()];
    meter.reset_state_multi(&mut meter_states, &[0.0, 0.0], None);

    let mut left = vec![0.0f32; BLOCK];
    let mut right = vec![0.0f32; BLOCK];
    let mut tmp_l = vec![0.0f32; BLOCK];
    let mut tmp_r = vec![0.0f32; BLOCK];

    let n_blocks = SECONDS * FS as usize / BLOCK;
    for blk in 0..n_blocks {
        // program material: a beating pair, louder in the second half
        for i in 0..BLOCK {
            let t = (blk * BLOCK + i) as f32 / FS;
            let level = if t < 1.0 { 0.2 } else { 0.8 };
            left[i] = level * (core::f32::consts::TAU * 220.0 * t).sin();
            right[i] = level * (core::f32::consts::TAU * 221.5 * t).sin();
        }

        {
            let xs: [&[f32]; 2] = [&left, &right];
            let mut ys: [&mut [f32]; 2] = [&mut tmp_l, &mut tmp_r];
            hp.process_multi(&mut hp_states, &xs, &mut ys);
        }
        {
            let xs: [&[f32]; 2] = [&tmp_l, &tmp_r];
            let mut ys: [&mut [f32]; 2] = [&mut left, &mut right];
            eq.process_multi(&mut eq_states, &xs, &mut ys);
        }
        {
            let xs: [&[f32]; 2] = [&left, &right];
            let scs: [&[f32]; 2] = [&left, &right];
            let mut ys: [&mut [f32]; 2] = [&mut tmp_l, &mut tmp_r];
            comp.process_multi(&mut comp_states, &xs, &scs, &mut ys);
        }
        {
            let xs: [&[f32]; 2] = [&tmp_l, &tmp_r];
            meter.process_multi(&mut meter_states, &xs, None);
        }

        if blk % 16 == 0 {
            println!(
                "{:5} ms | L {:6.1} dBFS | R {:6.1} dBFS",
                blk * BLOCK * 1000 / FS as usize,
                meter.get_y_z1(&meter_states[0]),
                meter.get_y_z1(&meter_states[1]),
            );
        }
    }
}
