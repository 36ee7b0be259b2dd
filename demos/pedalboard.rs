//! A guitar-style effects chain: noise gate, overdrive, cabinet, and a
//! stereo reverb, processing a synthetic plucked riff.
//!
//! Run with: `cargo run --example pedalboard`

use tessella::prelude::*;

const FS: f32 = 48000.0;
const BLOCK: usize = 512;

/// A crude plucked string: an exponentially decaying detuned pair.
fn pluck(freq: f32, t: f32) -> f32 {
    let env = (-6.0 * t).exp();
    let a = (core::f32::consts::TAU * freq * t).sin();
    let b = (core::f32::consts::TAU * freq * 1.003 * t).sin();
    0.5 * env * (a + 0.6 * b)
}

fn main() {
    let mut gate = NoiseGateCoeffs::new();
    gate.set_thresh_dbfs(-50.0);
    gate.set_ratio(4.0);
    gate.set_attack_tau(0.001);
    gate.set_release_tau(0.05);
    gate.set_sample_rate(FS);
    gate.reset_coeffs();
    let mut gate_state = NoiseGateState::new();
    gate.reset_state(&mut gate_state, 0.0, None);

    let mut drive = DriveCoeffs::new();
    drive.set_drive(0.7);
    drive.set_tone(0.6);
    drive.set_volume(0.8);
    drive.set_sample_rate(FS);
    drive.reset_coeffs();
    let mut drive_state = DriveState::new();
    drive.reset_state(&mut drive_state, 0.0);

    let mut cab = CabCoeffs::new();
    cab.set_sample_rate(FS);
    cab.reset_coeffs();
    let mut cab_state = CabState::new();
    cab.reset_state(&mut cab_state, 0.0);

    let mut reverb = ReverbCoeffs::new();
    reverb.set_sample_rate(FS);
    let mut reverb_state = ReverbState::new();
    reverb.mem_set(
        &mut reverb_state,
        vec![0.0; reverb.mem_req()].into_boxed_slice(),
    );
    reverb.set_predelay(0.02);
    reverb.set_bandwidth(9000.0);
    reverb.set_damping(3500.0);
    reverb.set_decay(0.6);
    reverb.set_wet(0.25);
    reverb.reset_coeffs();
    reverb.reset_state(&mut reverb_state, 0.0, 0.0);

    let notes = [82.41f32, 110.0, 146.83, 110.0]; // E2 A2 D3 A2
    let mut x = [0.0f32; BLOCK];
    let mut y = [0.0f32; BLOCK];
    let mut yl = [0.0f32; BLOCK];
    let mut yr = [0.0f32; BLOCK];

    let mut peak_l = 0.0f32;
    let mut peak_r = 0.0f32;
    let n_blocks = 2 * FS as usize / BLOCK;
    for blk in 0..n_blocks {
        for (i, v) in x.iter_mut().enumerate() {
            let t_abs = (blk * BLOCK + i) as f32 / FS;
            let note = notes[(t_abs * 2.0) as usize % notes.len()];
            *v = pluck(note, t_abs % 0.5);
        }
        let dry = x;
        gate.process(&mut gate_state, &dry, Some(&dry), &mut y);
        let gated = y;
        drive.process(&mut drive_state, &gated, &mut y);
        let driven = y;
        cab.process(&mut cab_state, &driven, &mut y);
        let mono = y;
        reverb.process(&mut reverb_state, &mono, &mono, &mut yl, &mut yr);

        peak_l = yl.iter().fold(peak_l, |m, v| m.max(v.abs()));
        peak_r = yr.iter().fold(peak_r, |m, v| m.max(v.abs()));
    }

    println!("rendered {} blocks", n_blocks);
    println!("peak L: {peak_l:.3}  peak R: {peak_r:.3}");
}
