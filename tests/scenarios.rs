//! End-to-end scenarios exercising whole primitive stacks at fs = 48 kHz,
//! the way a host would drive them: full lifecycle, block processing,
//! realistic parameter values, and post-hoc signal measurements.

use tessella::prelude::*;

const FS: f32 = 48000.0;

fn sine(freq: f32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (core::f32::consts::TAU * freq * i as f32 / FS).sin())
        .collect()
}

fn rms(x: &[f32]) -> f32 {
    (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
}

/// Single-bin magnitude probe (Goertzel-style direct correlation).
fn bin_magnitude(x: &[f32], freq: f32) -> f32 {
    let w = core::f32::consts::TAU * freq / FS;
    let (mut re, mut im) = (0.0f32, 0.0f32);
    for (i, &v) in x.iter().enumerate() {
        re += v * (w * i as f32).cos();
        im += v * (w * i as f32).sin();
    }
    2.0 * (re * re + im * im).sqrt() / x.len() as f32
}

// Scenario 1: one-pole smoother step response.
#[test]
fn smoother_step() {
    let mut coeffs = OnePoleCoeffs::new();
    coeffs.set_sample_rate(FS);
    coeffs.set_cutoff(1000.0);
    coeffs.reset_coeffs();
    let mut state = OnePoleState::new();
    coeffs.reset_state(&mut state, 0.0);

    let x = vec![1.0f32; 1024];
    let mut y = vec![0.0f32; 1024];
    coeffs.process(&mut state, &x, &mut y);

    let mut prev = 0.0f32;
    for &v in &y {
        assert!(v.is_finite() && (0.0..=1.0).contains(&v));
        assert!(v >= prev);
        prev = v;
    }
    let crossing = y.iter().position(|&v| v >= 0.632).expect("never crossed");
    assert!((5..=9).contains(&crossing), "crossed at {crossing}");
}

// Scenario 2: SVF notch at 1 kHz rejects a 1 kHz sine.
#[test]
fn svf_notch_at_1k() {
    let mut coeffs = SvfCoeffs::new();
    coeffs.set_cutoff(1000.0);
    coeffs.set_q(1.0);
    coeffs.set_sample_rate(FS);
    coeffs.reset_coeffs();
    let mut state = SvfState::new();
    coeffs.reset_state(&mut state, 0.0);

    let x = sine(1000.0, 512 + 4096);
    let mut lp = vec![0.0f32; x.len()];
    let mut hp = vec![0.0f32; x.len()];
    for blk in 0..x.len() / 512 {
        let r = blk * 512..(blk + 1) * 512;
        coeffs.process(
            &mut state,
            &x[r.clone()],
            Some(&mut lp[r.clone()]),
            None,
            Some(&mut hp[r]),
        );
    }
    let notch: Vec<f32> = lp[512..].iter().zip(&hp[512..]).map(|(a, b)| a + b).collect();
    assert!(rms(&notch) < 0.05, "notch rms {}", rms(&notch));
}

// Scenario 3: delay-line round trip with a 100-sample tap.
#[test]
fn delay_round_trip() {
    let mut coeffs = DelayCoeffs::new(0.01);
    coeffs.set_sample_rate(FS);
    assert_eq!(coeffs.mem_req(), 481);
    let mut state = DelayState::new();
    coeffs.mem_set(&mut state, vec![0.0f32; 481].into_boxed_slice());
    coeffs.reset_coeffs();
    coeffs.reset_state(&mut state, 0.0);
    coeffs.set_delay(100.0 / FS);

    let mut x = vec![0.0f32; 512];
    x[0] = 1.0;
    let mut y = vec![0.0f32; 512];
    coeffs.process(&mut state, &x, &mut y);
    for (n, &v) in y.iter().enumerate() {
        if n == 100 {
            assert!((v - 1.0).abs() < 1e-5, "y[100] = {v}");
        } else {
            assert!(v.abs() < 1e-5, "y[{n}] = {v}");
        }
    }
}

// Scenario 4: compressor, 4:1 above -20 dBFS, on a full-scale sine.
#[test]
fn compressor_four_to_one() {
    let mut coeffs = CompCoeffs::new();
    coeffs.set_thresh_dbfs(-20.0);
    coeffs.set_ratio(0.25);
    coeffs.set_attack_tau(0.01);
    coeffs.set_release_tau(0.1);
    coeffs.set_gain_lin(1.0);
    coeffs.set_sample_rate(FS);
    coeffs.reset_coeffs();
    let mut state = CompState::new();
    coeffs.reset_state(&mut state, 0.0, 0.0);

    let x = sine(1000.0, 4800);
    let mut y = vec![0.0f32; 4800];
    for blk in 0..x.len() / 480 {
        let r = blk * 480..(blk + 1) * 480;
        coeffs.process(&mut state, &x[r.clone()], &x[r.clone()], &mut y[r]);
    }
    let amp = rms(&y[3800..]) * core::f32::consts::SQRT_2;
    let expected = 10.0f32.powf(-15.0 / 20.0);
    assert!(
        (amp - expected).abs() / expected < 0.1,
        "sustained amplitude {amp}, expected {expected}"
    );
}

// Scenario 5: reverb impulse response — a live, decaying, stereo tail.
#[test]
fn reverb_tail() {
    let mut coeffs = ReverbCoeffs::new();
    coeffs.set_sample_rate(FS);
    let mut state = ReverbState::new();
    coeffs.mem_set(&mut state, vec![0.0f32; coeffs.mem_req()].into_boxed_slice());
    coeffs.set_predelay(0.01);
    coeffs.set_bandwidth(8000.0);
    coeffs.set_damping(4000.0);
    coeffs.set_decay(0.7);
    coeffs.set_wet(1.0);
    coeffs.reset_coeffs();
    coeffs.reset_state(&mut state, 0.0, 0.0);

    let n = 48000;
    let mut xl = vec![0.0f32; n];
    let mut xr = vec![0.0f32; n];
    xl[0] = 1.0;
    xr[0] = 1.0;
    let mut yl = vec![0.0f32; n];
    let mut yr = vec![0.0f32; n];
    for blk in 0..n / 512 {
        let r = blk * 512..(blk + 1) * 512;
        coeffs.process(
            &mut state,
            &xl[r.clone()],
            &xr[r.clone()],
            &mut yl[r.clone()],
            &mut yr[r],
        );
    }

    assert!(yl.iter().chain(&yr).all(|v| v.is_finite()));

    // non-zero for at least one second
    assert!(yl[n - 2400..].iter().any(|v| v.abs() > 1e-6));

    // L and R differ
    let max_diff = yl
        .iter()
        .zip(&yr)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(max_diff > 1e-3);

    // log-domain envelope decays monotonically after the first 100 ms,
    // measured on coarse 100 ms windows
    let mut prev_db = f32::INFINITY;
    for w in 1..10 {
        let win = &yl[w * 4800..(w + 1) * 4800];
        let db = 20.0 * rms(win).max(1e-12).log10();
        assert!(db < prev_db, "window {w} not decaying ({db} dB >= {prev_db} dB)");
        prev_db = db;
    }
}

// Scenario 6: antialiased pulse with a pulse-width sweep.
#[test]
fn pulse_pw_sweep_antialiased() {
    let mut pg = PhaseGenCoeffs::new();
    pg.set_frequency(220.0);
    pg.set_sample_rate(FS);
    pg.reset_coeffs();
    let mut pg_state = PhaseGenState::new();
    pg.reset_state(&mut pg_state, 0.0);

    let mut pulse = OscPulseCoeffs::new();
    pulse.set_antialiasing(true);
    pulse.set_sample_rate(FS);
    pulse.reset_coeffs();

    // sweep PW 0.1 -> 0.9 over one second, block by block
    let n = 48000;
    let mut y = vec![0.0f32; n];
    let mut phase = vec![0.0f32; 512];
    let mut inc = vec![0.0f32; 512];
    for blk in 0..n / 512 {
        let t = blk as f32 * 512.0 / n as f32;
        pulse.set_pulse_width(0.1 + 0.8 * t);
        pg.process(&mut pg_state, &mut phase, &mut inc);
        pulse.process(&phase, &inc, &mut y[blk * 512..(blk + 1) * 512]);
    }
    assert!(y.iter().all(|&v| v.is_finite() && v.abs() <= 1.05));

    // stationary segment at PW 0.25: folded images of the harmonic series
    // must sit below -40 dBFS
    pulse.set_pulse_width(0.25);
    let m = 8192;
    let mut z = vec![0.0f32; m];
    for blk in 0..m / 512 {
        pg.process(&mut pg_state, &mut phase, &mut inc);
        pulse.process(&phase, &inc, &mut z[blk * 512..(blk + 1) * 512]);
    }
    // skip the pulse-width transition
    let z = &z[2048..];
    for k in [129u32, 135, 150, 180, 200] {
        let alias = FS - 220.0 * k as f32;
        assert!((1000.0..20000.0).contains(&alias));
        let mag = bin_magnitude(z, alias);
        assert!(
            mag < 0.01,
            "alias at {alias} Hz (k = {k}) is {:.1} dBFS",
            20.0 * mag.log10()
        );
    }
}

// P1: every primitive stays finite over 1024 arbitrary finite samples.
#[test]
fn finiteness_sweep() {
    let x: Vec<f32> = (0..1024)
        .map(|i| (i as f32 * 0.37).sin() * (1.0 + (i as f32 * 0.011).cos()))
        .collect();
    let mut y = vec![0.0f32; 1024];

    macro_rules! check {
        ($y:expr) => {
            assert!($y.iter().all(|v: &f32| v.is_finite()))
        };
    }

    let mut c = Lp1Coeffs::new();
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = Lp1State::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);

    let mut c = Hs1Coeffs::new();
    c.set_high_gain_db(15.0);
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = Hs1State::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);

    let mut c = Ls1Coeffs::new();
    c.set_dc_gain_db(-15.0);
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = Ls1State::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);

    let mut c = SaturCoeffs::new();
    c.set_gain(3.0);
    c.set_bias(0.2);
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = SaturState::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);

    let mut c = PhaserCoeffs::new();
    c.set_rate(3.0);
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = PhaserState::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);

    let mut c = TremCoeffs::new();
    c.set_rate(4.0);
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = TremState::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);

    let mut c = CabCoeffs::new();
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = CabState::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);

    let mut c = DriveCoeffs::new();
    c.set_drive(0.8);
    c.set_volume(0.8);
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = DriveState::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);

    let mut c = FuzzCoeffs::new();
    c.set_fuzz(0.8);
    c.set_volume(0.8);
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = FuzzState::new();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    check!(y);
}

// P4: process_multi equals per-channel sequential process.
#[test]
fn multi_equals_sequential() {
    let x0 = sine(300.0, 512);
    let x1 = sine(700.0, 512);

    let mut coeffs = NotchCoeffs::new();
    coeffs.set_cutoff(500.0);
    coeffs.set_sample_rate(FS);
    coeffs.reset_coeffs();
    let mut states = [NotchState::new(), NotchState::new()];
    coeffs.reset_state_multi(&mut states, &[0.0, 0.0], None);

    let mut m0 = vec![0.0f32; 512];
    let mut m1 = vec![0.0f32; 512];
    {
        let xs: [&[f32]; 2] = [&x0, &x1];
        let mut ys: [&mut [f32]; 2] = [&mut m0, &mut m1];
        coeffs.process_multi(&mut states, &xs, &mut ys);
    }

    let mut coeffs2 = NotchCoeffs::new();
    coeffs2.set_cutoff(500.0);
    coeffs2.set_sample_rate(FS);
    coeffs2.reset_coeffs();
    let mut s0 = NotchState::new();
    let mut s1 = NotchState::new();
    coeffs2.reset_state(&mut s0, 0.0);
    coeffs2.reset_state(&mut s1, 0.0);
    let mut q0 = vec![0.0f32; 512];
    let mut q1 = vec![0.0f32; 512];
    let mut coeffs3 = coeffs2.clone();
    coeffs2.process(&mut s0, &x0, &mut q0);
    coeffs3.process(&mut s1, &x1, &mut q1);

    for i in 0..512 {
        assert!((m0[i] - q0[i]).abs() < 1e-7);
        assert!((m1[i] - q1[i]).abs() < 1e-7);
    }
}

// P2: default-parameter primitives pass audio through untouched.
#[test]
fn default_passthrough() {
    let x = sine(440.0, 1024);
    let mut y = vec![0.0f32; 1024];

    // gain at unity
    let mut c = GainCoeffs::new();
    c.set_sample_rate(FS);
    c.reset_coeffs();
    c.process(&x, &mut y);
    for i in 0..1024 {
        assert!((y[i] - x[i]).abs() < 1e-5 * x[i].abs().max(1.0));
    }

    // compressor at ratio 1
    let mut c = CompCoeffs::new();
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let mut s = CompState::new();
    c.reset_state(&mut s, 0.0, 0.0);
    c.process(&mut s, &x, &x, &mut y);
    for i in 0..1024 {
        assert!((y[i] - x[i]).abs() < 1e-5 * x[i].abs().max(1.0));
    }

    // ring mod at amount 0 passes the modulator
    let mut c = RingModCoeffs::new();
    c.set_amount(0.0);
    c.set_sample_rate(FS);
    c.reset_coeffs();
    let car = sine(50.0, 1024);
    c.process(&x, &car, &mut y);
    for i in 0..1024 {
        assert!((y[i] - x[i]).abs() < 1e-5 * x[i].abs().max(1.0));
    }

    // comb with blend 1, ff = fb = 0
    let mut c = CombCoeffs::new(0.01);
    c.set_sample_rate(FS);
    let mut s = CombState::new();
    c.mem_set(&mut s, vec![0.0; c.mem_req()].into_boxed_slice());
    c.reset_coeffs();
    c.reset_state(&mut s, 0.0);
    c.process(&mut s, &x, &mut y);
    for i in 0..1024 {
        assert!((y[i] - x[i]).abs() < 1e-5 * x[i].abs().max(1.0));
    }
}

// P5: a state reset against an older coefficient epoch is detected.
#[cfg(feature = "debug-deep")]
#[test]
fn stale_state_epoch_detection() {
    let mut coeffs = SvfCoeffs::new();
    coeffs.set_sample_rate(FS);
    coeffs.reset_coeffs();
    let mut state = SvfState::new();
    coeffs.reset_state(&mut state, 0.0);
    assert!(coeffs.state_is_valid(&state));
    coeffs.reset_coeffs();
    assert!(!coeffs.state_is_valid(&state));
    coeffs.reset_state(&mut state, 0.0);
    assert!(coeffs.state_is_valid(&state));
}
