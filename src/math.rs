//! Math Facade
//!
//! Every primitive in the crate does its arithmetic through this module
//! rather than calling `libm` (or `std`) directly. The facade pins down the
//! exact set of routines the DSP code relies on, together with their domains,
//! and keeps the crate `no_std`-friendly.
//!
//! Conventions:
//!
//! - All functions operate on `f32`.
//! - Out-of-domain and NaN inputs are contract violations (checked under the
//!   `debug` feature), with the exception of [`sign`], [`abs`], and
//!   [`copysign`], which are NaN-safe by construction (pure bit
//!   manipulation).
//! - `*2pi` variants take normalized arguments: `sin2pi(x)` is the sine of
//!   `2π·x`.

use crate::debug::dsp_debug_assert;
use libm::Libm;

/// Returns `1.0` if `x > 0`, `-1.0` if `x < 0`, and `0.0` if `x == 0`.
///
/// NaN-safe: operates on the bit pattern only.
#[inline]
pub fn sign(x: f32) -> f32 {
    const Y: [f32; 4] = [0.0, 1.0, 0.0, -1.0];
    let u = x.to_bits();
    let nonzero = u32::min(u & 0x7fff_ffff, 1);
    Y[(nonzero | ((u >> 30) & 0x2)) as usize]
}

/// Absolute value of `x`, NaN-safe (clears the sign bit).
#[inline]
pub fn abs(x: f32) -> f32 {
    f32::from_bits(x.to_bits() & 0x7fff_ffff)
}

/// Returns the magnitude of `x` with the sign of `y`, NaN-safe.
#[inline]
pub fn copysign(x: f32, y: f32) -> f32 {
    f32::from_bits((x.to_bits() & 0x7fff_ffff) | (y.to_bits() & 0x8000_0000))
}

/// Minimum of two finite values.
#[inline]
pub fn min(a: f32, b: f32) -> f32 {
    if a < b {
        a
    } else {
        b
    }
}

/// Maximum of two finite values.
#[inline]
pub fn max(a: f32, b: f32) -> f32 {
    if a > b {
        a
    } else {
        b
    }
}

/// Clamps `x` into `[m, upper]`. `upper` must be >= `m`.
#[inline]
pub fn clip(x: f32, m: f32, upper: f32) -> f32 {
    dsp_debug_assert!(upper >= m);
    min(max(x, m), upper)
}

/// Largest integer less than or equal to `x`. `x` must be finite.
#[inline]
pub fn floor(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::floor(x)
}

/// Smallest integer greater than or equal to `x`. `x` must be finite.
#[inline]
pub fn ceil(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::ceil(x)
}

/// `x` rounded to the nearest integer, halfway cases away from zero.
#[inline]
pub fn round(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::round(x)
}

/// `x` rounded towards zero.
#[inline]
pub fn trunc(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::trunc(x)
}

/// Splits `x` into its floor and fractional parts, `x == i + f` with
/// `f` in `[0, 1)`.
#[inline]
pub fn intfrac(x: f32) -> (f32, f32) {
    dsp_debug_assert!(x.is_finite());
    let i = floor(x);
    (i, x - i)
}

/// Reciprocal of `x`.
///
/// Safe range: `|x|` in `[2^-90, 2^90]`.
#[inline]
pub fn rcp(x: f32) -> f32 {
    dsp_debug_assert!(abs(x) >= 8.077936e-28 && abs(x) <= 1.237940e27);
    1.0 / x
}

/// Sine of `2π·x`. `x` must be finite.
#[inline]
pub fn sin2pi(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::sin(core::f32::consts::TAU * x)
}

/// Cosine of `2π·x`. `x` must be finite.
#[inline]
pub fn cos2pi(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::cos(core::f32::consts::TAU * x)
}

/// Tangent of `2π·x`. `x` must not be too close to an odd multiple of 1/4.
#[inline]
pub fn tan2pi(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::tan(core::f32::consts::TAU * x)
}

/// Tangent of `x` (radians). `x` must not be too close to a pole.
#[inline]
pub fn tan(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::tan(x)
}

/// Base-2 logarithm. `x` must be >= 1.175494350822287e-38 (normal range).
#[inline]
pub fn log2(x: f32) -> f32 {
    dsp_debug_assert!(x >= 1.175_494_4e-38);
    Libm::<f32>::log2(x)
}

/// Natural logarithm. Same domain as [`log2`].
#[inline]
pub fn ln(x: f32) -> f32 {
    dsp_debug_assert!(x >= 1.175_494_4e-38);
    Libm::<f32>::log(x)
}

/// `ln(1 + x)`, accurate near zero. `x` must be > -1.
#[inline]
pub fn ln1p(x: f32) -> f32 {
    dsp_debug_assert!(x > -1.0);
    Libm::<f32>::log1p(x)
}

/// 2 raised to `x`. `x` must be <= ~128; `-inf` maps to `0`.
#[inline]
pub fn pow2(x: f32) -> f32 {
    dsp_debug_assert!(!(x >= 128.0) && !x.is_nan());
    Libm::<f32>::exp2(x)
}

/// e raised to `x`. `x` must be <= ~88.722; `-inf` maps to `0`.
#[inline]
pub fn exp(x: f32) -> f32 {
    dsp_debug_assert!(!(x > 88.722) && !x.is_nan());
    Libm::<f32>::exp(x)
}

/// dB to linear ratio: `10^(x/20)`.
#[inline]
pub fn db2lin(x: f32) -> f32 {
    pow2(0.166_096_4 * x)
}

/// Linear ratio to dB: `20·log10(x)`. Same domain as [`log2`].
#[inline]
pub fn lin2db(x: f32) -> f32 {
    20.0 * 0.301_029_99 * log2(x)
}

/// Square root. `x` must be >= 0.
#[inline]
pub fn sqrt(x: f32) -> f32 {
    dsp_debug_assert!(x >= 0.0);
    Libm::<f32>::sqrt(x)
}

/// Hyperbolic tangent. `x` must be finite.
#[inline]
pub fn tanh(x: f32) -> f32 {
    dsp_debug_assert!(x.is_finite());
    Libm::<f32>::tanh(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.5), 1.0);
        assert_eq!(sign(-0.001), -1.0);
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        // NaN-safe: must not panic, returns some value from the table
        let _ = sign(f32::NAN);
    }

    #[test]
    fn test_abs_copysign() {
        assert_eq!(abs(-2.5), 2.5);
        assert_eq!(abs(2.5), 2.5);
        assert_eq!(copysign(3.0, -1.0), -3.0);
        assert_eq!(copysign(-3.0, 1.0), 3.0);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip(5.0, -1.0, 1.0), 1.0);
        assert_eq!(clip(-5.0, -1.0, 1.0), -1.0);
        assert_eq!(clip(0.5, -1.0, 1.0), 0.5);
    }

    #[test]
    fn test_intfrac() {
        let (i, f) = intfrac(3.25);
        assert_eq!(i, 3.0);
        assert_relative_eq!(f, 0.25);
        let (i, f) = intfrac(-1.25);
        assert_eq!(i, -2.0);
        assert_relative_eq!(f, 0.75);
    }

    #[test]
    fn test_trig_accuracy() {
        // absolute error bound 0.011 from the facade contract
        for k in 0..100 {
            let x = k as f32 * 0.01;
            assert!((sin2pi(x) - (core::f32::consts::TAU * x).sin()).abs() < 0.011);
        }
    }

    #[test]
    fn test_exp_log_family() {
        assert_relative_eq!(pow2(3.0), 8.0, max_relative = 6.2e-4);
        assert_relative_eq!(log2(8.0), 3.0, max_relative = 1.5e-2);
        assert_relative_eq!(db2lin(-20.0), 0.1, max_relative = 6.2e-4);
        assert_relative_eq!(lin2db(0.1), -20.0, max_relative = 1.5e-2);
        assert_eq!(pow2(f32::NEG_INFINITY), 0.0);
        assert_eq!(exp(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_rcp_sqrt() {
        assert_relative_eq!(rcp(4.0), 0.25, max_relative = 1.3e-5);
        assert_relative_eq!(sqrt(2.0), core::f32::consts::SQRT_2, max_relative = 7e-6);
    }
}
