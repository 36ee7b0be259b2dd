//! DSP Performance Benchmarks
//!
//! Benchmarks for validating that the primitives meet real-time audio
//! processing requirements at common buffer sizes and voice counts.
//!
//! ## Real-Time Audio Constraints
//!
//! For real-time audio, a buffer must be processed before the next one
//! arrives. The time budget is:
//!
//! ```text
//! time_budget = buffer_size / sample_rate
//! ```
//!
//! At 48 kHz that is 1.33 ms for 64 samples and 10.67 ms for 512. A
//! primitive that cannot process a 512-sample block in a small fraction of
//! that budget has no business on an audio thread.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tessella::prelude::*;

const SAMPLE_RATE: f32 = 48000.0;
const BUFFER_SIZES: [usize; 4] = [64, 128, 256, 512];
const VOICE_COUNTS: [usize; 4] = [1, 4, 8, 16];

fn sine(freq: f32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (core::f32::consts::TAU * freq * i as f32 / SAMPLE_RATE).sin())
        .collect()
}

fn bench_one_pole(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_pole");
    for &n in &BUFFER_SIZES {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut coeffs = OnePoleCoeffs::new();
            coeffs.set_sample_rate(SAMPLE_RATE);
            coeffs.set_cutoff(1000.0);
            coeffs.reset_coeffs();
            let mut state = OnePoleState::new();
            coeffs.reset_state(&mut state, 0.0);
            let x = sine(440.0, n);
            let mut y = vec![0.0f32; n];
            b.iter(|| {
                coeffs.process(&mut state, black_box(&x), &mut y);
                black_box(y[n - 1])
            });
        });
    }
    group.finish();
}

fn bench_svf(c: &mut Criterion) {
    let mut group = c.benchmark_group("svf");
    for &n in &BUFFER_SIZES {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut coeffs = SvfCoeffs::new();
            coeffs.set_cutoff(1200.0);
            coeffs.set_q(2.0);
            coeffs.set_sample_rate(SAMPLE_RATE);
            coeffs.reset_coeffs();
            let mut state = SvfState::new();
            coeffs.reset_state(&mut state, 0.0);
            let x = sine(440.0, n);
            let mut lp = vec![0.0f32; n];
            b.iter(|| {
                coeffs.process(&mut state, black_box(&x), Some(&mut lp), None, None);
                black_box(lp[n - 1])
            });
        });
    }
    group.finish();
}

fn bench_svf_multi_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("svf_multi_voice");
    let n = 256;
    for &voices in &VOICE_COUNTS {
        group.throughput(Throughput::Elements((n * voices) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(voices),
            &voices,
            |b, &voices| {
                let mut coeffs = SvfCoeffs::new();
                coeffs.set_cutoff(800.0);
                coeffs.set_sample_rate(SAMPLE_RATE);
                coeffs.reset_coeffs();
                let mut states: Vec<SvfState> = (0..voices).map(|_| SvfState::new()).collect();
                let x0 = vec![0.0f32; voices];
                coeffs.reset_state_multi(&mut states, &x0, None);
                let inputs: Vec<Vec<f32>> =
                    (0..voices).map(|v| sine(220.0 * (v + 1) as f32, n)).collect();
                let mut outputs: Vec<Vec<f32>> = vec![vec![0.0f32; n]; voices];
                b.iter(|| {
                    let xs: Vec<&[f32]> = inputs.iter().map(|v| v.as_slice()).collect();
                    let mut ys: Vec<&mut [f32]> =
                        outputs.iter_mut().map(|v| v.as_mut_slice()).collect();
                    coeffs.process_multi(&mut states, &xs, Some(&mut ys), None, None);
                    black_box(outputs[0][n - 1])
                });
            },
        );
    }
    group.finish();
}

fn bench_comp(c: &mut Criterion) {
    let mut group = c.benchmark_group("comp");
    let n = 512;
    group.throughput(Throughput::Elements(n as u64));
    group.bench_function("512", |b| {
        let mut coeffs = CompCoeffs::new();
        coeffs.set_thresh_dbfs(-20.0);
        coeffs.set_ratio(0.25);
        coeffs.set_attack_tau(0.01);
        coeffs.set_release_tau(0.1);
        coeffs.set_sample_rate(SAMPLE_RATE);
        coeffs.reset_coeffs();
        let mut state = CompState::new();
        coeffs.reset_state(&mut state, 0.0, 0.0);
        let x = sine(440.0, n);
        let mut y = vec![0.0f32; n];
        b.iter(|| {
            coeffs.process(&mut state, black_box(&x), black_box(&x), &mut y);
            black_box(y[n - 1])
        });
    });
    group.finish();
}

fn bench_clip_antialiased(c: &mut Criterion) {
    let mut group = c.benchmark_group("clip");
    let n = 512;
    group.throughput(Throughput::Elements(n as u64));
    group.bench_function("512", |b| {
        let mut coeffs = ClipCoeffs::new();
        coeffs.set_gain(4.0);
        coeffs.set_gain_compensation(true);
        coeffs.set_sample_rate(SAMPLE_RATE);
        coeffs.reset_coeffs();
        let mut state = ClipState::new();
        coeffs.reset_state(&mut state, 0.0);
        let x = sine(440.0, n);
        let mut y = vec![0.0f32; n];
        b.iter(|| {
            coeffs.process(&mut state, black_box(&x), &mut y);
            black_box(y[n - 1])
        });
    });
    group.finish();
}

fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverb");
    for &n in &BUFFER_SIZES {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut coeffs = ReverbCoeffs::new();
            coeffs.set_sample_rate(SAMPLE_RATE);
            let mut state = ReverbState::new();
            coeffs.mem_set(&mut state, vec![0.0; coeffs.mem_req()].into_boxed_slice());
            coeffs.set_decay(0.7);
            coeffs.set_wet(0.3);
            coeffs.reset_coeffs();
            coeffs.reset_state(&mut state, 0.0, 0.0);
            let xl = sine(440.0, n);
            let xr = sine(330.0, n);
            let mut yl = vec![0.0f32; n];
            let mut yr = vec![0.0f32; n];
            b.iter(|| {
                coeffs.process(&mut state, black_box(&xl), black_box(&xr), &mut yl, &mut yr);
                black_box(yl[n - 1])
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_one_pole,
    bench_svf,
    bench_svf_multi_voice,
    bench_comp,
    bench_clip_antialiased,
    bench_reverb
);
criterion_main!(benches);
