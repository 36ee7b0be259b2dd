//! A minimal subtractive synth voice: antialiased pulse oscillator into a
//! swept state-variable filter, with tremolo on the output.
//!
//! Renders one second of audio at 48 kHz and prints a coarse level trace.
//!
//! Run with: `cargo run --example synth_voice`

use tessella::prelude::*;

const FS: f32 = 48000.0;
const BLOCK: usize = 512;

fn main() {
    // oscillator: phase generator driving the pulse shaper
    let mut phase_gen = PhaseGenCoeffs::new();
    phase_gen.set_frequency(110.0);
    phase_gen.set_sample_rate(FS);
    phase_gen.reset_coeffs();
    let mut phase_state = PhaseGenState::new();
    phase_gen.reset_state(&mut phase_state, 0.0);

    let mut pulse = OscPulseCoeffs::new();
    pulse.set_antialiasing(true);
    pulse.set_pulse_width(0.33);
    pulse.set_sample_rate(FS);
    pulse.reset_coeffs();

    // filter: resonant low-pass swept downward over the note
    let mut filter = SvfCoeffs::new();
    filter.set_cutoff(4000.0);
    filter.set_q(4.0);
    filter.set_sample_rate(FS);
    filter.reset_coeffs();
    let mut filter_state = SvfState::new();
    filter.reset_state(&mut filter_state, 0.0);

    // tremolo for some motion
    let mut trem = TremCoeffs::new();
    trem.set_rate(5.0);
    trem.set_amount(0.4);
    trem.set_sample_rate(FS);
    trem.reset_coeffs();
    let mut trem_state = TremState::new();
    trem.reset_state(&mut trem_state, 0.0);

    let mut meter = PpmCoeffs::new();
    meter.set_sample_rate(FS);
    meter.reset_coeffs();
    let mut meter_state = PpmState::new();
    meter.reset_state(&mut meter_state, 0.0);

    let mut phase = [0.0f32; BLOCK];
    let mut inc = [0.0f32; BLOCK];
    let mut osc = [0.0f32; BLOCK];
    let mut out = [0.0f32; BLOCK];

    let n_blocks = FS as usize / BLOCK;
    for blk in 0..n_blocks {
        // sweep the cutoff from 4 kHz down to 400 Hz over the second
        let t = blk as f32 / n_blocks as f32;
        filter.set_cutoff(4000.0 * (1.0 - t) + 400.0 * t);

        phase_gen.process(&mut phase_state, &mut phase, &mut inc);
        pulse.process(&phase, &inc, &mut osc);
        filter.process(&mut filter_state, &osc, Some(&mut out), None, None);
        let filtered = out;
        trem.process(&mut trem_state, &filtered, &mut out);
        meter.process(&mut meter_state, &out, None);

        if blk % 8 == 0 {
            let db = meter.get_y_z1(&meter_state);
            let bars = ((db + 60.0).max(0.0) / 3.0) as usize;
            println!("{:5} ms | {:6.1} dBFS | {}", blk * BLOCK * 1000 / FS as usize, db, "#".repeat(bars));
        }
    }
}
