//! Pure-math functions supporting the field kernels.

use num_traits::Float;

/// Iteration cap for the AGM elliptic-integral iteration. Bounds worst-case
/// latency as the parameter approaches 1, trading accuracy for guaranteed
/// termination; a capped-out result is degraded, not erroneous.
const AGM_ITMAX: usize = 100;

/// Floating-point scalar for the field kernels.
///
/// Implemented for `f32` and `f64`. The two instantiations are independent
/// code paths: every intermediate value is held in `Self`, and the AGM
/// tolerance is chosen per precision so the elliptic-integral iteration can
/// actually converge in the narrower type.
pub trait Scalar: Float + Send + Sync {
    /// Convergence tolerance for the AGM iteration; must sit above the
    /// machine epsilon of the type.
    const AGM_TOL: Self;
    /// (H/m) `mu_0 / (4 pi)`, folded to collapse some algebra and reduce
    /// float error.
    const MU0_OVER_4PI: Self;
    /// (H/m) `mu_0 / pi`.
    const MU0_OVER_PI: Self;
    const PI: Self;
    const FRAC_PI_2: Self;
    const TWO: Self;
    const HALF: Self;
}

impl Scalar for f64 {
    const AGM_TOL: Self = 1e-12;
    const MU0_OVER_4PI: Self = 1e-7;
    const MU0_OVER_PI: Self = 4e-7;
    const PI: Self = core::f64::consts::PI;
    const FRAC_PI_2: Self = core::f64::consts::FRAC_PI_2;
    const TWO: Self = 2.0;
    const HALF: Self = 0.5;
}

impl Scalar for f32 {
    const AGM_TOL: Self = 1e-6;
    const MU0_OVER_4PI: Self = 1e-7;
    const MU0_OVER_PI: Self = 4e-7;
    const PI: Self = core::f32::consts::PI;
    const FRAC_PI_2: Self = core::f32::consts::FRAC_PI_2;
    const TWO: Self = 2.0;
    const HALF: Self = 0.5;
}

/// Complete elliptic integral of the first kind.
///
/// Parameterized by the parameter `m = k^2` (not the modulus `k`), matching
/// scipy's convention, for `m` in `[0, 1)`. Evaluated by descending Gauss
/// arithmetic-geometric-mean iteration: `K(m) = pi / (2 * agm(1, sqrt(1-m)))`.
///
/// For `m` within [`Scalar::AGM_TOL`] of 1, where the integral diverges,
/// returns the sentinel value −1; callers must treat results that consumed
/// the sentinel as untrusted.
///
/// # References
///
///   \[1\] M. Abramowitz and I. A. Stegun, *Handbook of mathematical functions:
///         with formulas, graphs, and mathematical tables*. 1970. Section 17.6.
#[inline]
pub fn ellipk<T: Scalar>(m: T) -> T {
    if (m - T::one()).abs() <= T::AGM_TOL {
        return -T::one();
    }

    let mut a = T::one();
    let mut g = (T::one() - m).sqrt();
    for _ in 0..AGM_ITMAX {
        if (a - g).abs() <= T::AGM_TOL {
            break;
        }
        let a1 = T::HALF * (a + g);
        let g1 = (a * g).sqrt();
        a = a1;
        g = g1;
    }

    T::FRAC_PI_2 / a
}

/// Complete elliptic integral of the second kind.
///
/// Parameterized by the parameter `m = k^2`, matching scipy's convention,
/// for `m` in `[0, 1]`. Uses the companion series over the same AGM sequence
/// as [`ellipk`]: `E(m) = K(m) * (1 - sum(2^(n-1) * c_n))` with
/// `c_n = |a_n^2 - g_n^2|`.
///
/// `E(1) = 1` and `E(0) = pi/2` are returned in closed form.
///
/// # References
///
///   \[1\] M. Abramowitz and I. A. Stegun, *Handbook of mathematical functions:
///         with formulas, graphs, and mathematical tables*. 1970. Section 17.6.
#[inline]
pub fn ellipe<T: Scalar>(m: T) -> T {
    if (m - T::one()).abs() <= T::AGM_TOL {
        return T::one();
    }
    if m.abs() <= T::AGM_TOL {
        return T::FRAC_PI_2;
    }

    let mut a = T::one();
    let mut g = (T::one() - m).sqrt();
    // c_0 = |a_0^2 - g_0^2| = m, weighted by 2^(-1)
    let mut sum = T::HALF * (a * a - g * g).abs();
    let mut pow2 = T::HALF;
    for _ in 0..AGM_ITMAX {
        let a1 = T::HALF * (a + g);
        let g1 = (a * g).sqrt();
        pow2 = pow2 + pow2;
        let ds = pow2 * (a1 * a1 - g1 * g1).abs();
        sum = sum + ds;
        a = a1;
        g = g1;
        if ds <= T::AGM_TOL {
            break;
        }
    }

    (T::one() - sum) * T::FRAC_PI_2 / a
}

/// 3D $(x^2 + y^2 + z^2)^{1/2}$ using `mul_add` to perform all addition in
/// extended registers. Zero for the zero vector, which downstream code uses
/// as a division-by-zero trigger for singular geometry.
#[inline]
pub fn rss3<T: Scalar>(x: T, y: T, z: T) -> T {
    x.mul_add(x, y.mul_add(y, z.powi(2))).sqrt()
}

/// Evaluate the cross products for each axis component
/// separately using `mul_add` which would not be assumed usable
/// in a more general implementation.
#[inline]
pub fn cross3<T: Scalar>(x0: T, y0: T, z0: T, x1: T, y1: T, z1: T) -> (T, T, T) {
    let xy = -x1 * y0;
    let yz = -y1 * z0;
    let zx = -z1 * x0;
    let cx = y0.mul_add(z1, yz);
    let cy = z0.mul_add(x1, zx);
    let cz = x0.mul_add(y1, xy);

    (cx, cy, cz)
}

/// Scalar dot product using `mul_add`.
#[inline]
pub fn dot3<T: Scalar>(x0: T, y0: T, z0: T, x1: T, y1: T, z1: T) -> T {
    x0.mul_add(x1, y0.mul_add(y1, z0 * z1))
}
