//! Field of circular current loops ("rings") centered on the z axis, with a
//! circular conductor cross-section.

use rayon::{
    iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator},
    slice::{ParallelSlice, ParallelSliceMut},
};

use crate::chunksize;
use crate::error::{Diagnostics, FieldError};
use crate::math::{ellipe, ellipk, Scalar};
use crate::sources::Ring;

/// Flux density contribution from a batch of rings to a batch of observation
/// nodes, accumulated into `out`.
///
/// # Arguments
///
/// * `xyzp`:         (m) node coords, each length `n`
/// * `rings`:        ring sources, length `r`
/// * `mu_r`:         (nondim) relative permeability of the medium
/// * `check_inside`: apply the uniform-current-density correction for nodes
///                   inside the conductor cross-section
/// * `out`:          (T) bx, by, bz at nodes, each length `n`, accumulated
///                   in place
///
/// # Commentary
///
/// Each ring lies in the plane `z = height` centered on the z axis; nodes are
/// translated into the ring's local frame before evaluation. With
/// `alpha^2 = (rho - R)^2 + z^2` and `beta^2 = (rho + R)^2 + z^2`, the
/// elliptic parameter is `k^2 = 1 - alpha^2 / beta^2` and the general
/// off-axis loop field is
///
/// * `Bx = C x z / (2 alpha^2 beta rho^2) * ((R^2 + r^2) E - alpha^2 K)`
/// * `By = (y / x) Bx` (the horizontal component is radial by axisymmetry)
/// * `Bz = C / (2 alpha^2 beta) * ((R^2 - r^2) E + alpha^2 K)`
///
/// with `C = mu_r * mu_0 * I / pi` and `r^2` the squared node distance from
/// the ring center.
///
/// `alpha^2` is the squared distance from the node to the filament circle, so
/// the interior correction scales the contribution by `alpha^2 / r_minor^2`
/// inside the conductor; exactly on the filament the corrected contribution
/// is zero.
///
/// The `By` decomposition is singular for nodes with `x = 0` (including the
/// symmetry axis); such nodes, and nodes whose elliptic parameter reaches its
/// sentinel (`k^2 -> 1`, on or next to the filament circle), are reported in
/// the returned [`Diagnostics`] rather than aborting the batch. Evaluate
/// on-axis profiles at a small non-zero `x` instead.
///
/// # References
///
///   \[1\] J. C. Simpson, J. E. Lane, C. D. Immer, R. C. Youngquist, and T. Steinrock,
///         “Simple Analytic Expressions for the Magnetic Field of a Circular Current Loop,”
///         Jan. 01, 2001. Accessed: Sep. 06, 2022. [Online]. Available: <https://ntrs.nasa.gov/citations/20010038494>
pub fn flux_density_ring<T: Scalar>(
    xyzp: (&[T], &[T], &[T]),
    rings: &[Ring<T>],
    mu_r: T,
    check_inside: bool,
    out: (&mut [T], &mut [T], &mut [T]),
) -> Result<Diagnostics, FieldError> {
    // Unpack
    let (x, y, z) = xyzp;
    let (bx_out, by_out, bz_out) = out;

    // Check lengths; Error before any output mutation
    let n = x.len();
    if n == 0 {
        return Err(FieldError::EmptyInput("nodes"));
    }
    if rings.is_empty() {
        return Err(FieldError::EmptyInput("rings"));
    }
    if y.len() != n || z.len() != n {
        return Err(FieldError::LengthMismatch("node coords"));
    }
    if bx_out.len() != n || by_out.len() != n || bz_out.len() != n {
        return Err(FieldError::LengthMismatch("output"));
    }

    // Node-only quantities, shared by every ring in the batch
    let mut rho2 = vec![T::zero(); n]; // [m^2] squared distance from the z axis
    let mut rho = vec![T::zero(); n]; // [m]
    for j in 0..n {
        rho2[j] = x[j].mul_add(x[j], y[j] * y[j]);
        rho[j] = rho2[j].sqrt();
    }

    // Per-call, per-ring scratch
    let mut zl = vec![T::zero(); n]; // [m] node z in the ring's local frame
    let mut r2 = vec![T::zero(); n]; // [m^2] squared distance from the ring center
    let mut alpha2 = vec![T::zero(); n]; // [m^2]
    let mut beta = vec![T::zero(); n]; // [m]
    let mut k2 = vec![T::zero(); n]; // [nondim] elliptic parameter
    let mut kk = vec![T::zero(); n];
    let mut ee = vec![T::zero(); n];
    let mut flagged = vec![false; n];

    // Outer loop over sources
    for ring in rings {
        let rr = ring.major_radius; // [m]
        let rr2 = rr * rr; // [m^2]
        let rm2 = ring.minor_radius * ring.minor_radius; // [m^2]

        // C = mu_r * mu_0 * I / pi
        let c = mu_r * T::MU0_OVER_PI * ring.current; // [H-A/m]

        // Translate nodes into the ring's local frame, where the loop lies
        // in the plane z = 0
        for j in 0..n {
            zl[j] = z[j] - ring.height;
            r2[j] = zl[j].mul_add(zl[j], rho2[j]);
        }

        // alpha^2 = (rho - R)^2 + z^2 is the squared distance from the node
        // to the filament circle in the r-z plane; beta^2 = (rho + R)^2 + z^2
        for j in 0..n {
            alpha2[j] = rr2 + r2[j] - T::TWO * rr * rho[j];
        }
        for j in 0..n {
            let beta2 = rr2 + r2[j] + T::TWO * rr * rho[j];
            beta[j] = beta2.sqrt();
            k2[j] = T::one() - alpha2[j] / beta2;
        }
        for j in 0..n {
            kk[j] = ellipk(k2[j]);
        }
        for j in 0..n {
            ee[j] = ellipe(k2[j]);
        }

        for j in 0..n {
            // Uniform-current-density correction against the conductor
            // minor radius
            let jc = if check_inside {
                if alpha2[j] <= T::zero() {
                    T::zero()
                } else if alpha2[j] >= rm2 {
                    T::one()
                } else {
                    alpha2[j] / rm2
                }
            } else {
                T::one()
            };

            if check_inside && jc == T::zero() {
                // Exactly on the filament circle the corrected contribution
                // vanishes
                continue;
            }

            // Singular formulation inputs: the By = (y/x) Bx decomposition
            // at x = 0, and the elliptic sentinel as k^2 -> 1
            if x[j] == T::zero() || k2[j] >= T::one() - T::AGM_TOL {
                flagged[j] = true;
            }

            let a2b = T::TWO * alpha2[j] * beta[j]; // [m^3]

            let bx_c = (c * x[j] * zl[j]) / (a2b * rho2[j])
                * ((rr2 + r2[j]) * ee[j] - alpha2[j] * kk[j]); // [T]
            let by_c = (y[j] / x[j]) * bx_c; // [T]
            let bz_c = c / a2b * ((rr2 - r2[j]) * ee[j] + alpha2[j] * kk[j]); // [T]

            bx_out[j] = jc.mul_add(bx_c, bx_out[j]);
            by_out[j] = jc.mul_add(by_c, by_out[j]);
            bz_out[j] = jc.mul_add(bz_c, bz_out[j]);
        }
    }

    Ok(Diagnostics::from_flags(&flagged))
}

/// Flux density contribution from a batch of rings to a batch of observation
/// nodes, accumulated into `out`.
///
/// This variant is parallelized over chunks of observation nodes and produces
/// results identical to [`flux_density_ring`]; the serial kernel stays
/// reentrant and stateless, so chunks only share the read-only inputs.
///
/// For argument documentation and commentary, see [`flux_density_ring`].
pub fn flux_density_ring_par<T: Scalar>(
    xyzp: (&[T], &[T], &[T]),
    rings: &[Ring<T>],
    mu_r: T,
    check_inside: bool,
    out: (&mut [T], &mut [T], &mut [T]),
) -> Result<Diagnostics, FieldError> {
    // Unpack
    let (x, y, z) = xyzp;
    let (bx, by, bz) = out;

    // Check lengths before any chunk is dispatched
    let n = x.len();
    if n == 0 {
        return Err(FieldError::EmptyInput("nodes"));
    }
    if rings.is_empty() {
        return Err(FieldError::EmptyInput("rings"));
    }
    if y.len() != n || z.len() != n {
        return Err(FieldError::LengthMismatch("node coords"));
    }
    if bx.len() != n || by.len() != n || bz.len() != n {
        return Err(FieldError::LengthMismatch("output"));
    }

    // Chunk inputs
    let nchunk = chunksize(n);
    let xc = x.par_chunks(nchunk);
    let yc = y.par_chunks(nchunk);
    let zc = z.par_chunks(nchunk);
    let bxc = bx.par_chunks_mut(nchunk);
    let byc = by.par_chunks_mut(nchunk);
    let bzc = bz.par_chunks_mut(nchunk);

    // Run calcs, mapping chunk-local diagnostics back to batch indices
    let diagnostics = (bxc, byc, bzc, xc, yc, zc)
        .into_par_iter()
        .enumerate()
        .map(|(i, (bx, by, bz, x, y, z))| {
            let d = flux_density_ring((x, y, z), rings, mu_r, check_inside, (bx, by, bz))?;
            Ok::<_, FieldError>(d.offset(i * nchunk))
        })
        .try_reduce(Diagnostics::default, |acc, d| Ok(acc.merge(d)))?;

    Ok(diagnostics)
}
