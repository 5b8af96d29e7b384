//! Special function evaluations used by the interpreters.
//!
//! All functions are total over `f64`: inputs outside the real domain
//! (poles, branch cuts) yield `NaN` rather than an error, so a single bad
//! row never aborts the evaluation of a whole dataset.
//!
//! # Methods
//!
//! - **Gamma / Psi**: Lanczos approximation and asymptotic series with
//!   reflection for arguments below 1/2
//! - **Erf / Norm**: Maclaurin series near zero, continued fraction for the
//!   complementary function in the tails
//! - **Integral functions** (Dawson, Ei, Si, Ci, Shi, Chi, Fresnel): composite
//!   Simpson quadrature of a bounded integrand near zero, leading asymptotic
//!   expansions for large arguments; Si and Ci switch to a complex continued
//!   fraction above 4
//! - **Airy**: power series on `[-8, 6]`, asymptotic expansions outside

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Composite Simpson rule over `[a, b]` with `n` panels (`n` rounded up to even).
fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64, n: usize) -> f64 {
    let n = (n.max(2) + 1) & !1;
    #[allow(
        clippy::cast_precision_loss,
        reason = "Panel counts are far below 2^52"
    )]
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        #[allow(
            clippy::cast_precision_loss,
            reason = "Panel counts are far below 2^52"
        )]
        let t = a + h * i as f64;
        sum += if i % 2 == 1 { 4.0 * f(t) } else { 2.0 * f(t) };
    }
    sum * h / 3.0
}

/// Panel count for integrands whose curvature grows with `|x|`
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Callers bound |x| before asking for panels"
)]
fn panels(x: f64, oscillating: bool) -> usize {
    let m = x.abs().max(1.0).ceil() as usize;
    if oscillating { 128 * m * m } else { 64 * m }
}

pub fn gamma(x: f64) -> f64 {
    if x.is_nan() || (x <= 0.0 && x.fract() == 0.0) {
        return f64::NAN;
    }
    const G: f64 = 7.0;
    const C: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        PI / ((PI * x).sin() * gamma(1.0 - x))
    } else {
        let x = x - 1.0;
        let mut ag = C[0];
        for (i, &coeff) in C.iter().enumerate().skip(1) {
            #[allow(clippy::cast_precision_loss, reason = "i < 9")]
            let i = i as f64;
            ag += coeff / (x + i);
        }
        let t = x + G + 0.5;
        // t^(x + 1/2) overflows on its own well before gamma does
        let p = t.powf(0.5 * (x + 0.5));
        (2.0 * PI).sqrt() * p * ((-t).exp() * p) * ag
    }
}

/// Digamma function, the logarithmic derivative of [`gamma`]
pub fn psi(x: f64) -> f64 {
    if x.is_nan() || (x <= 0.0 && x.fract() == 0.0) {
        return f64::NAN;
    }
    if x < 0.5 {
        return psi(1.0 - x) - PI * (PI * x).cos() / (PI * x).sin();
    }
    let mut xv = x;
    let mut result = 0.0;
    while xv < 10.0 {
        result -= 1.0 / xv;
        xv += 1.0;
    }
    // Denominators 2k / B_2k of the Bernoulli terms, k = 1..=5
    let inv2 = 1.0 / (xv * xv);
    let tail = [12.0, -120.0, 252.0, -240.0, 132.0]
        .iter()
        .rev()
        .fold(0.0, |acc, d| (acc + 1.0 / d) * inv2);
    result + xv.ln() - 0.5 / xv - tail
}

/// Complementary error function for `x >= 2` by continued fraction (modified Lentz)
fn erfc_tail(x: f64) -> f64 {
    const TINY: f64 = 1e-300;
    // erfc(x) = exp(-x²)/sqrt(pi) * 1/(x + (1/2)/(x + 1/(x + (3/2)/(x + ...))))
    let mut f = x;
    let mut c = x;
    let mut d = 0.0;
    for n in 1..200_i32 {
        let a = f64::from(n) * 0.5;
        d = x + a * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = x + a / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = c * d;
        f *= delta;
        if (delta - 1.0).abs() < 1e-16 {
            break;
        }
    }
    (-x * x).exp() / (PI.sqrt() * f)
}

fn erf_series(x: f64) -> f64 {
    let mut sum = 0.0;
    let mut factorial = 1.0;
    let mut power = x;
    for n in 0..60_i32 {
        let term = power / (factorial * f64::from(2 * n + 1));
        if n % 2 == 0 {
            sum += term;
        } else {
            sum -= term;
        }
        factorial *= f64::from(n + 1);
        power *= x * x;
        if term.abs() < f64::EPSILON * sum.abs() {
            break;
        }
    }
    2.0 / PI.sqrt() * sum
}

pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        f64::NAN
    } else if x.abs() < 2.0 {
        erf_series(x)
    } else {
        x.signum() * (1.0 - erfc_tail(x.abs()))
    }
}

pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        f64::NAN
    } else if x.abs() < 2.0 {
        1.0 - erf_series(x)
    } else if x > 0.0 {
        erfc_tail(x)
    } else {
        2.0 - erfc_tail(-x)
    }
}

/// Standard normal cumulative distribution function
pub fn norm(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Modified Bessel function of the first kind, order zero
pub fn bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let y = (x / 3.75).powi(2);
        1.0 + y
            * (3.515_622_9
                + y * (3.089_942_4
                    + y * (1.206_749_2 + y * (0.265_973_2 + y * (0.036_076_8 + y * 0.004_581_3)))))
    } else {
        let y = 3.75 / ax;
        let term = ax.exp() / ax.sqrt();
        term * (0.398_942_28
            + y * (0.013_285_92
                + y * (0.002_253_19
                    + y * (-0.001_575_65
                        + y * (0.009_162_81
                            + y * (-0.020_577_06
                                + y * (0.026_355_37 + y * (-0.016_476_33 + y * 0.003_923_77))))))))
    }
}

/// Dawson's integral `F(x) = exp(-x²) ∫₀ˣ exp(t²) dt`
pub fn dawson(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let ax = x.abs();
    if ax > 10.0 {
        let x2 = x * x;
        let inv = 1.0 / x2;
        return 1.0 / (2.0 * x)
            * (1.0 + inv * (0.5 + inv * (0.75 + inv * (1.875 + inv * 6.562_5))));
    }
    simpson(|t| (t * t - x * x).exp(), 0.0, x, panels(x, true))
}

/// Exponential integral `Ei(x)`
pub fn exponential_integral_ei(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x < -1.0 {
        return -exponential_integral_e1(-x);
    }
    if x > 50.0 {
        return x.exp() / x * factorial_series(x, 7);
    }
    let integrand = |t: f64| if t == 0.0 { 1.0 } else { t.exp_m1() / t };
    EULER_GAMMA + x.abs().ln() + simpson(integrand, 0.0, x, panels(x, false))
}

/// `E1(z)` for `z > 1` by continued fraction (modified Lentz)
fn exponential_integral_e1(z: f64) -> f64 {
    const TINY: f64 = 1e-300;
    let mut b = z + 1.0;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..1_000_i32 {
        let an = -f64::from(i * i);
        b += 2.0;
        d = 1.0 / (an * d + b);
        c = b + an / c;
        let delta = c * d;
        h *= delta;
        if (delta - 1.0).abs() < 1e-16 {
            break;
        }
    }
    h * (-z).exp()
}

/// Sine integral `Si(x) = ∫₀ˣ sin(t)/t dt`
pub fn sine_integral(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x.abs() > 4.0 {
        return x.signum() * sine_cosine_tail(x.abs()).0;
    }
    let integrand = |t: f64| if t == 0.0 { 1.0 } else { t.sin() / t };
    simpson(integrand, 0.0, x, panels(x, true))
}

/// Cosine integral `Ci(x) = γ + ln x + ∫₀ˣ (cos(t) - 1)/t dt`, real for `x > 0`
pub fn cosine_integral(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x > 4.0 {
        return sine_cosine_tail(x).1;
    }
    let integrand = |t: f64| {
        if t == 0.0 {
            0.0
        } else {
            let s = (t / 2.0).sin();
            -2.0 * s * s / t
        }
    };
    EULER_GAMMA + x.ln() + simpson(integrand, 0.0, x, panels(x, true))
}

/// `(Si(x), Ci(x))` for `x > 4` from the continued fraction of `E1(ix)` (modified Lentz)
fn sine_cosine_tail(x: f64) -> (f64, f64) {
    const TINY: f64 = 1e-300;
    let mut b = (1.0, x);
    let mut c = (1.0 / TINY, 0.0);
    let mut d = complex_inv(b);
    let mut h = d;
    for i in 1..1_000_i32 {
        let a = -f64::from(i * i);
        b.0 += 2.0;
        d = complex_inv((a.mul_add(d.0, b.0), a.mul_add(d.1, b.1)));
        let inv_c = complex_inv(c);
        c = (a.mul_add(inv_c.0, b.0), a.mul_add(inv_c.1, b.1));
        let delta = complex_mul(c, d);
        h = complex_mul(h, delta);
        if (delta.0 - 1.0).abs() + delta.1.abs() < f64::EPSILON {
            break;
        }
    }
    let (sin, cos) = x.sin_cos();
    let (re, im) = complex_mul(h, (cos, -sin));
    (FRAC_PI_2 + im, -re)
}

fn complex_mul(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
}

fn complex_inv((re, im): (f64, f64)) -> (f64, f64) {
    let norm = re.hypot(im);
    (re / norm / norm, -im / norm / norm)
}

/// Hyperbolic sine integral `Shi(x) = ∫₀ˣ sinh(t)/t dt`
pub fn hyperbolic_sine_integral(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x.abs() > 50.0 {
        return x.signum() * hyperbolic_tail(x.abs());
    }
    let integrand = |t: f64| if t == 0.0 { 1.0 } else { t.sinh() / t };
    simpson(integrand, 0.0, x, panels(x, false))
}

/// Hyperbolic cosine integral `Chi(x) = γ + ln x + ∫₀ˣ (cosh(t) - 1)/t dt`, real for `x > 0`
pub fn hyperbolic_cosine_integral(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x > 50.0 {
        return hyperbolic_tail(x);
    }
    let integrand = |t: f64| {
        if t == 0.0 {
            0.0
        } else {
            let s = (t / 2.0).sinh();
            2.0 * s * s / t
        }
    };
    EULER_GAMMA + x.ln() + simpson(integrand, 0.0, x, panels(x, false))
}

/// Shared asymptotic form of Shi and Chi: `e^x / 2x * Σ k!/x^k`
fn hyperbolic_tail(x: f64) -> f64 {
    x.exp() * 0.5 / x * factorial_series(x, 6)
}

/// `Σ k!/x^k` over the first `terms` terms
fn factorial_series(x: f64, terms: u32) -> f64 {
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..terms {
        term *= f64::from(k) / x;
        sum += term;
    }
    sum
}

/// Fresnel integrals `(S(x), C(x))` with the `π t²/2` convention
fn fresnel(x: f64) -> (f64, f64) {
    if x.is_nan() {
        return (f64::NAN, f64::NAN);
    }
    let ax = x.abs();
    if ax > 8.0 {
        let pix = PI * ax;
        let pi2x4 = PI * PI * ax.powi(4);
        let f = (1.0 - 3.0 / pi2x4) / pix;
        let g = (1.0 - 15.0 / pi2x4) / (PI * pix * ax * ax);
        let arg = FRAC_PI_2 * ax * ax;
        let s = 0.5 - f * arg.cos() - g * arg.sin();
        let c = 0.5 + f * arg.sin() - g * arg.cos();
        return (x.signum() * s, x.signum() * c);
    }
    let n = panels(x, true);
    let s = simpson(|t| (FRAC_PI_2 * t * t).sin(), 0.0, x, n);
    let c = simpson(|t| (FRAC_PI_2 * t * t).cos(), 0.0, x, n);
    (s, c)
}

pub fn fresnel_sine_integral(x: f64) -> f64 {
    fresnel(x).0
}

pub fn fresnel_cosine_integral(x: f64) -> f64 {
    fresnel(x).1
}

/// Coefficients `u_k` of the Airy asymptotic expansions
const AIRY_U: [f64; 6] = [
    1.0,
    0.069_444_444_444_444_44,
    0.037_133_487_654_320_99,
    0.037_993_059_127_800_64,
    0.057_649_190_412_669_75,
    0.116_099_064_025_515,
];

/// Airy functions `(Ai(x), Bi(x))`
fn airy(x: f64) -> (f64, f64) {
    const C1: f64 = 0.355_028_053_887_817_2;
    const C2: f64 = 0.258_819_403_792_806_8;
    const SQRT_3: f64 = 1.732_050_807_568_877_2;

    if x.is_nan() {
        return (f64::NAN, f64::NAN);
    }
    if x > 6.0 {
        let zeta = 2.0 / 3.0 * x.powf(1.5);
        let pre = 1.0 / (PI.sqrt() * x.powf(0.25));
        let mut ai_sum = 0.0;
        let mut bi_sum = 0.0;
        let mut zeta_k = 1.0;
        for (k, u) in AIRY_U.iter().enumerate() {
            let term = u / zeta_k;
            ai_sum += if k % 2 == 0 { term } else { -term };
            bi_sum += term;
            zeta_k *= zeta;
        }
        return (0.5 * pre * (-zeta).exp() * ai_sum, pre * zeta.exp() * bi_sum);
    }
    if x < -8.0 {
        let ax = -x;
        let zeta = 2.0 / 3.0 * ax.powf(1.5);
        let pre = 1.0 / (PI.sqrt() * ax.powf(0.25));
        let z2 = zeta * zeta;
        let p = AIRY_U[0] - AIRY_U[2] / z2 + AIRY_U[4] / (z2 * z2);
        let q = AIRY_U[1] / zeta - AIRY_U[3] / (z2 * zeta) + AIRY_U[5] / (z2 * z2 * zeta);
        let (sin, cos) = (zeta + FRAC_PI_4).sin_cos();
        return (pre * (sin * p - cos * q), pre * (cos * p + sin * q));
    }

    let x3 = x * x * x;
    let mut f = 1.0;
    let mut g = x;
    let mut f_term = 1.0;
    let mut g_term = x;
    for k in 0..200_i32 {
        let k3 = 3.0 * f64::from(k);
        f_term *= x3 / ((k3 + 2.0) * (k3 + 3.0));
        g_term *= x3 / ((k3 + 3.0) * (k3 + 4.0));
        f += f_term;
        g += g_term;
        if f_term.abs() < f64::EPSILON * f.abs() && g_term.abs() < f64::EPSILON * g.abs() {
            break;
        }
    }
    (C1 * f - C2 * g, SQRT_3 * (C1 * f + C2 * g))
}

pub fn airy_a(x: f64) -> f64 {
    airy(x).0
}

pub fn airy_b(x: f64) -> f64 {
    airy(x).1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let err = (actual - expected).abs() / expected.abs().max(1.0);
        assert!(err <= tol, "{actual} vs {expected}: error {err:e}");
    }

    #[test]
    fn test_gamma_and_psi() {
        assert_close(gamma(5.0), 24.0, 1e-10);
        assert_close(gamma(0.5), PI.sqrt(), 1e-10);
        assert!(gamma(0.0).is_nan());
        assert!(gamma(-2.0).is_nan());
        assert_close(psi(1.0), -EULER_GAMMA, 1e-8);
        assert!(psi(-1.0).is_nan());
        assert!(psi(f64::NAN).is_nan());
        assert_close(psi(-0.5), 0.036_489_973_978_576_52, 1e-12);
        assert_close(psi(3.5), 1.103_156_640_645_243_5, 1e-12);
    }

    #[test]
    fn test_gamma_large_arguments() {
        let factorial: f64 = (1..150_u32).map(f64::from).product();
        let value = gamma(150.0);
        assert!(value.is_finite());
        assert_close(value, factorial, 1e-10);
        assert!(gamma(171.5).is_finite());
    }

    #[test]
    fn test_erf_family() {
        assert_close(erf(1.0), 0.842_700_792_949_714_9, 1e-12);
        assert_close(erf(-1.0), -0.842_700_792_949_714_9, 1e-12);
        assert_close(erf(3.0), 0.999_977_909_503_001_4, 1e-12);
        assert_close(erfc(3.0), 2.209_049_699_858_544e-5, 1e-9);
        assert_close(norm(0.0), 0.5, 1e-14);
        assert_close(norm(1.96), 0.975_002_104_851_780_1, 1e-9);
        assert_eq!(erf(0.0), 0.0);
    }

    #[test]
    fn test_bessel_i0() {
        assert_close(bessel_i0(0.0), 1.0, 1e-12);
        assert_close(bessel_i0(1.0), 1.266_065_877_752_008_4, 1e-6);
        assert_close(bessel_i0(5.0), 27.239_871_823_604_45, 1e-6);
    }

    #[test]
    fn test_integral_functions() {
        assert_close(dawson(1.0), 0.538_079_506_912_768_4, 1e-7);
        assert_close(dawson(-1.0), -0.538_079_506_912_768_4, 1e-7);
        assert_close(exponential_integral_ei(1.0), 1.895_117_816_355_936_8, 1e-7);
        assert_close(
            exponential_integral_ei(-1.0),
            -0.219_383_934_395_520_3,
            1e-7,
        );
        assert_close(sine_integral(1.0), 0.946_083_070_367_183, 1e-8);
        assert_close(cosine_integral(1.0), 0.337_403_922_900_968_1, 1e-8);
        assert_close(hyperbolic_sine_integral(1.0), 1.057_250_875_375_728_5, 1e-8);
        assert_close(
            hyperbolic_cosine_integral(1.0),
            0.837_866_940_980_208_2,
            1e-8,
        );
        assert_close(fresnel_sine_integral(1.0), 0.438_259_147_390_354_8, 1e-8);
        assert_close(fresnel_cosine_integral(1.0), 0.779_893_400_376_822_8, 1e-8);
        assert!(cosine_integral(-1.0).is_nan());
        assert_eq!(exponential_integral_ei(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_large_argument_branches() {
        assert_close(sine_integral(100.0), 1.562_225_466_889_056, 1e-6);
        assert_close(fresnel_sine_integral(20.0), 0.484_084_535_925_954, 1e-9);
        assert_close(dawson(20.0), 0.025_031_367_926_403_7, 1e-9);
        assert_close(
            exponential_integral_ei(-5.0),
            -0.001_148_295_591_275_33,
            1e-9,
        );
        assert_close(airy_a(10.0), 1.104_753_255_289_868_6e-10, 1e-12);
    }

    #[test]
    fn test_sine_cosine_integral_switch() {
        // Quadrature below 4, continued fraction above
        let delta = 1e-6;
        let si_step = sine_integral(4.0 + delta) - sine_integral(4.0 - delta);
        let ci_step = cosine_integral(4.0 + delta) - cosine_integral(4.0 - delta);
        assert!((si_step - 2.0 * delta * 4.0_f64.sin() / 4.0).abs() < 1e-10);
        assert!((ci_step - 2.0 * delta * 4.0_f64.cos() / 4.0).abs() < 1e-10);

        assert_close(sine_integral(10.0), 1.658_347_594_218_874, 1e-12);
        assert_close(sine_integral(-10.0), -1.658_347_594_218_874, 1e-12);
        assert_close(cosine_integral(10.0), -0.045_456_433_004_455_37, 1e-12);
    }

    #[test]
    fn test_airy() {
        assert_close(airy_a(0.0), 0.355_028_053_887_817_2, 1e-12);
        assert_close(airy_b(0.0), 0.614_926_627_446_000_7, 1e-12);
        assert_close(airy_a(1.0), 0.135_292_416_312_881_4, 1e-10);
        assert_close(airy_b(1.0), 1.207_423_594_952_871_3, 1e-10);
        assert_close(airy_a(-2.0), 0.227_407_428_201_685_6, 1e-9);
    }
}
