//! Biot-Savart field of straight finite wire segments with a circular
//! conductor cross-section.

use rayon::{
    iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator},
    slice::{ParallelSlice, ParallelSliceMut},
};

use crate::chunksize;
use crate::error::{Diagnostics, FieldError};
use crate::math::{cross3, dot3, rss3, Scalar};
use crate::sources::WireSegment;

/// Biot-Savart flux density contribution from a batch of wire segments to a
/// batch of observation nodes, accumulated into `out`.
///
/// # Arguments
///
/// * `xyzp`:         (m) node coords, each length `n`
/// * `wires`:        wire segment sources, length `w`
/// * `mu_r`:         (nondim) relative permeability of the medium
/// * `check_inside`: apply the uniform-current-density correction for nodes
///                   inside the conductor cross-section
/// * `out`:          (T) bx, by, bz at nodes, each length `n`, accumulated
///                   in place
///
/// # Commentary
///
/// For each segment, the field direction at a node is `u = c x a`, where `a`
/// is the segment vector and `c` points from the node to the segment end;
/// `|u| / |a|` is the perpendicular distance from the node to the segment's
/// infinite axis. Scaling `u` by `d / |u|^2` gives the infinite-wire
/// magnitude, and the factor `dot(a, c)/|c| - dot(a, b)/|b|` (the difference
/// of endpoint angle cosines, carrying a factor of `|a|` that cancels)
/// projects it onto the finite segment.
///
/// The interior correction scales the contribution by `(rho / radius)^2`
/// for nodes inside the conductor, modeling a uniform current density, and
/// is applied before the finite-segment projection: the projection factor
/// can be negative for nodes beyond an endpoint and must not interact with
/// the squared-distance correction. Exactly on the conductor axis the
/// corrected contribution is zero.
///
/// Nodes that coincide with a segment endpoint, or that lie on a segment's
/// infinite axis without the interior correction zeroing them, produce
/// non-finite contributions; their indices are reported in the returned
/// [`Diagnostics`] rather than aborting the batch.
pub fn flux_density_wire<T: Scalar>(
    xyzp: (&[T], &[T], &[T]),
    wires: &[WireSegment<T>],
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
    if wires.is_empty() {
        return Err(FieldError::EmptyInput("wires"));
    }
    if y.len() != n || z.len() != n {
        return Err(FieldError::LengthMismatch("node coords"));
    }
    if bx_out.len() != n || by_out.len() != n || bz_out.len() != n {
        return Err(FieldError::LengthMismatch("output"));
    }

    // Per-call scratch, each sized to the node count and released on return
    let mut bx = vec![T::zero(); n]; // [m] node -> segment start
    let mut by = vec![T::zero(); n];
    let mut bz = vec![T::zero(); n];
    let mut cx = vec![T::zero(); n]; // [m] node -> segment end
    let mut cy = vec![T::zero(); n];
    let mut cz = vec![T::zero(); n];
    let mut ux = vec![T::zero(); n]; // [m^2] c x a
    let mut uy = vec![T::zero(); n];
    let mut uz = vec![T::zero(); n];
    // Only allocate the correction buffers if we have to
    let (mut rho, mut jc) = match check_inside {
        true => (vec![T::zero(); n], vec![T::zero(); n]),
        false => (Vec::new(), Vec::new()),
    };
    let mut flagged = vec![false; n];

    // Outer loop over sources
    for w in wires {
        // d = mu_r * mu_0 * I / (4 pi)
        let d = mu_r * T::MU0_OVER_4PI * w.current; // [H-A/m]

        // Segment vector, start to end; non-zero for valid sources
        let a = w.direction(); // [m]
        let inv_mag_a = rss3(a[0], a[1], a[2]).recip(); // [m^-1]

        // Vectors from each node to the segment start (b) and end (c).
        // Loops are grouped by node coordinate to keep the arrays in cache.
        for j in 0..n {
            bx[j] = w.a0[0] - x[j];
            cx[j] = w.a1[0] - x[j];
        }
        for j in 0..n {
            by[j] = w.a0[1] - y[j];
            cy[j] = w.a1[1] - y[j];
        }
        for j in 0..n {
            bz[j] = w.a0[2] - z[j];
            cz[j] = w.a1[2] - z[j];
        }

        // u = c x a, perpendicular to both the segment and the node-to-end
        // vector
        for j in 0..n {
            let (px, py, pz) = cross3(cx[j], cy[j], cz[j], a[0], a[1], a[2]);
            ux[j] = px;
            uy[j] = py;
            uz[j] = pz;
        }

        // Perpendicular distance from each node to the segment's infinite
        // axis, and the uniform-current-density correction factor
        if check_inside {
            for j in 0..n {
                rho[j] = inv_mag_a * rss3(ux[j], uy[j], uz[j]); // [m]
            }

            let inv_r2 = (w.radius * w.radius).recip(); // [m^-2]
            for j in 0..n {
                jc[j] = if rho[j] <= T::zero() {
                    T::zero()
                } else if rho[j] >= w.radius {
                    T::one()
                } else {
                    (rho[j] * rho[j]) * inv_r2
                };
            }
        }

        // Scale to the infinite-wire magnitude, apply the correction, project
        // onto the finite segment, and accumulate
        for j in 0..n {
            if check_inside && jc[j] == T::zero() {
                // On the conductor axis the corrected contribution vanishes
                continue;
            }

            let denom = dot3(ux[j], uy[j], uz[j], ux[j], uy[j], uz[j]); // [m^4] |c x a|^2
            let mag_b = rss3(bx[j], by[j], bz[j]); // [m]
            let mag_c = rss3(cx[j], cy[j], cz[j]); // [m]
            if denom == T::zero() || mag_b == T::zero() || mag_c == T::zero() {
                // Node on the segment's axis or coincident with an endpoint;
                // the contribution is non-finite by construction
                flagged[j] = true;
            }

            let mut g = d / denom; // [T/m^2]
            if check_inside {
                g = g * jc[j];
            }

            // cos(theta1) - cos(theta2) subtended at the node by the segment
            // endpoints, scaled by |a|
            let f = dot3(a[0], a[1], a[2], cx[j], cy[j], cz[j]) / mag_c
                - dot3(a[0], a[1], a[2], bx[j], by[j], bz[j]) / mag_b; // [m]

            let s = g * f; // [T/m]
            bx_out[j] = s.mul_add(ux[j], bx_out[j]);
            by_out[j] = s.mul_add(uy[j], by_out[j]);
            bz_out[j] = s.mul_add(uz[j], bz_out[j]);
        }
    }

    Ok(Diagnostics::from_flags(&flagged))
}

/// Biot-Savart flux density contribution from a batch of wire segments to a
/// batch of observation nodes, accumulated into `out`.
///
/// This variant is parallelized over chunks of observation nodes and produces
/// results identical to [`flux_density_wire`]; the serial kernel stays
/// reentrant and stateless, so chunks only share the read-only inputs.
///
/// For argument documentation and commentary, see [`flux_density_wire`].
pub fn flux_density_wire_par<T: Scalar>(
    xyzp: (&[T], &[T], &[T]),
    wires: &[WireSegment<T>],
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
    if wires.is_empty() {
        return Err(FieldError::EmptyInput("wires"));
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
            let d = flux_density_wire((x, y, z), wires, mu_r, check_inside, (bx, by, bz))?;
            Ok::<_, FieldError>(d.offset(i * nchunk))
        })
        .try_reduce(Diagnostics::default, |acc, d| Ok(acc.merge(d)))?;

    Ok(diagnostics)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{approx, logspace};
    use crate::MU_0;

    /// A long segment along z, observed near its midplane, as a stand-in for
    /// an infinite wire
    fn long_wire(current: f64, radius: f64) -> WireSegment<f64> {
        WireSegment::new([0.0, 0.0, -1e6], [0.0, 0.0, 1e6], current, radius)
    }

    /// Without interior correction, the field at perpendicular distance rho
    /// from a very long wire converges to mu_0 * I / (2 pi rho), pointing
    /// along +y for a node on +x with current toward +z.
    #[test]
    fn test_infinite_wire_limit() {
        let wires = [long_wire(1.0, 0.0)];
        let (x, y, z) = (&[1e-3][..], &[0.0][..], &[0.0][..]);
        let (mut bx, mut by, mut bz) = ([0.0], [0.0], [0.0]);

        let diag =
            flux_density_wire((x, y, z), &wires, 1.0, false, (&mut bx, &mut by, &mut bz)).unwrap();
        assert!(diag.is_clean());

        let expected = MU_0 * 1.0 / (2.0 * core::f64::consts::PI * 1e-3); // = 2e-4 T
        assert!(approx(expected, by[0], 1e-9, 0.0));
        assert_eq!(bx[0], 0.0);
        assert_eq!(bz[0], 0.0);
    }

    /// Same limit through the f32 instantiation, with single-precision
    /// tolerance
    #[test]
    fn test_infinite_wire_limit_f32() {
        let wires = [WireSegment::new(
            [0.0f32, 0.0, -1e6],
            [0.0, 0.0, 1e6],
            1.0,
            0.0,
        )];
        let (x, y, z) = (&[1e-3f32][..], &[0.0f32][..], &[0.0f32][..]);
        let (mut bx, mut by, mut bz) = ([0.0f32], [0.0f32], [0.0f32]);

        flux_density_wire((x, y, z), &wires, 1.0, false, (&mut bx, &mut by, &mut bz)).unwrap();

        let expected = 2e-4f32;
        assert!(
            (by[0] - expected).abs() / expected < 1e-3,
            "by = {}, expected {expected}",
            by[0]
        );
    }

    /// Nodes deep inside a thick conductor: the corrected field follows the
    /// linear-in-rho interior law mu_0 * I * rho / (2 pi R^2) and every
    /// result is finite
    #[test]
    fn test_nodes_inside_conductor() {
        let current = 200.0;
        let radius = 0.1;
        let wires = [long_wire(current, radius)];

        let x = logspace(-9.0, -5.0, 5);
        let y = vec![0.0; 5];
        let z = vec![0.0; 5];
        let (mut bx, mut by, mut bz) = (vec![0.0; 5], vec![0.0; 5], vec![0.0; 5]);

        let diag = flux_density_wire(
            (&x, &y, &z),
            &wires,
            1.0,
            true,
            (&mut bx, &mut by, &mut bz),
        )
        .unwrap();
        assert!(diag.is_clean());

        for j in 0..5 {
            assert!(bx[j].is_finite() && by[j].is_finite() && bz[j].is_finite());
            assert_eq!(bx[j], 0.0);
            assert_eq!(bz[j], 0.0);

            // Interior law: the 1/rho falloff times the (rho/R)^2 correction
            let expected = MU_0 * current * x[j] / (2.0 * core::f64::consts::PI * radius * radius);
            assert!(approx(expected, by[j], 1e-6, 0.0), "node {j}");
        }

        // Without the correction the same nodes see the thin-filament
        // 1/rho falloff, decreasing as x grows
        let (mut bx, mut by, mut bz) = (vec![0.0; 5], vec![0.0; 5], vec![0.0; 5]);
        flux_density_wire(
            (&x, &y, &z),
            &wires,
            1.0,
            false,
            (&mut bx, &mut by, &mut bz),
        )
        .unwrap();
        for j in 0..5 {
            let expected = MU_0 * current / (2.0 * core::f64::consts::PI * x[j]);
            assert!(approx(expected, by[j], 1e-6, 0.0), "node {j}");
        }
        for j in 1..5 {
            assert!(by[j] < by[j - 1]);
        }
    }

    /// Strictly inside the conductor the corrected magnitude is strictly
    /// below the thin-filament magnitude; exactly on the axis it is zero
    #[test]
    fn test_interior_correction_bounds() {
        let wires = [long_wire(10.0, 0.2)];
        let (x, y, z) = (&[0.05, 0.0][..], &[0.0, 0.0][..], &[0.0, 0.0][..]);

        let (mut bx_c, mut by_c, mut bz_c) = ([0.0; 2], [0.0; 2], [0.0; 2]);
        let diag = flux_density_wire(
            (x, y, z),
            &wires,
            1.0,
            true,
            (&mut bx_c, &mut by_c, &mut bz_c),
        )
        .unwrap();
        // The on-axis node is zeroed by the correction, not singular
        assert!(diag.is_clean());

        let (mut bx_u, mut by_u, mut bz_u) = ([0.0; 2], [0.0; 2], [0.0; 2]);
        flux_density_wire(
            (x, y, z),
            &wires,
            1.0,
            false,
            (&mut bx_u, &mut by_u, &mut bz_u),
        )
        .unwrap();

        let mag_c = rss3(bx_c[0], by_c[0], bz_c[0]);
        let mag_u = rss3(bx_u[0], by_u[0], bz_u[0]);
        assert!(mag_c > 0.0);
        assert!(mag_c < mag_u);
        // rho = 0.05, R = 0.2 -> jc = 1/16
        assert!(approx(mag_u / 16.0, mag_c, 1e-12, 0.0));

        // Exactly zero on the conductor axis
        assert_eq!((bx_c[1], by_c[1], bz_c[1]), (0.0, 0.0, 0.0));
    }

    /// Evaluating sources one at a time and summing matches evaluating them
    /// in one call; scaling every current by a power of two scales the output
    /// exactly
    #[test]
    fn test_superposition_and_linearity() {
        let wires = [
            WireSegment::new([-1.0, 0.3, -2.0], [0.5, -0.2, 2.0], 3.0, 0.01),
            WireSegment::new([0.7, 1.1, -1.0], [0.7, -1.3, 1.5], -2.0, 0.01),
        ];
        let x = [0.3, -0.4, 1.2];
        let y = [0.1, 0.9, -0.8];
        let z = [-0.6, 0.2, 0.4];

        let (mut bx, mut by, mut bz) = ([0.0; 3], [0.0; 3], [0.0; 3]);
        flux_density_wire(
            (&x, &y, &z),
            &wires,
            1.0,
            false,
            (&mut bx, &mut by, &mut bz),
        )
        .unwrap();

        let (mut bx1, mut by1, mut bz1) = ([0.0; 3], [0.0; 3], [0.0; 3]);
        for w in wires.iter() {
            flux_density_wire(
                (&x, &y, &z),
                core::slice::from_ref(w),
                1.0,
                false,
                (&mut bx1, &mut by1, &mut bz1),
            )
            .unwrap();
        }

        for j in 0..3 {
            assert!(approx(bx[j], bx1[j], 1e-14, 1e-18));
            assert!(approx(by[j], by1[j], 1e-14, 1e-18));
            assert!(approx(bz[j], bz1[j], 1e-14, 1e-18));
        }

        // Power-of-two current scaling is exact in floating point
        let scaled: Vec<WireSegment<f64>> = wires
            .iter()
            .map(|w| WireSegment::new(w.a0, w.a1, 2.0 * w.current, w.radius))
            .collect();
        let (mut bx2, mut by2, mut bz2) = ([0.0; 3], [0.0; 3], [0.0; 3]);
        flux_density_wire(
            (&x, &y, &z),
            &scaled,
            1.0,
            false,
            (&mut bx2, &mut by2, &mut bz2),
        )
        .unwrap();
        for j in 0..3 {
            assert_eq!(bx2[j], 2.0 * bx[j]);
            assert_eq!(by2[j], 2.0 * by[j]);
            assert_eq!(bz2[j], 2.0 * bz[j]);
        }
    }

    /// A node coincident with a segment endpoint, or on the bare filament
    /// axis, is reported as degenerate instead of silently poisoning the
    /// batch
    #[test]
    fn test_degenerate_nodes_flagged() {
        let wires = [WireSegment::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], 5.0, 0.0)];
        // Node 0: at the segment start. Node 1: on the axis beyond the end.
        // Node 2: ordinary.
        let x = [0.0, 0.0, 0.5];
        let y = [0.0, 0.0, 0.0];
        let z = [0.0, 2.0, 0.5];
        let (mut bx, mut by, mut bz): ([f64; 3], [f64; 3], [f64; 3]) =
            ([0.0; 3], [0.0; 3], [0.0; 3]);

        let diag = flux_density_wire(
            (&x, &y, &z),
            &wires,
            1.0,
            false,
            (&mut bx, &mut by, &mut bz),
        )
        .unwrap();

        assert_eq!(diag.degenerate_nodes(), &[0, 1]);
        assert!(bx[2].is_finite() && by[2].is_finite() && bz[2].is_finite());
    }

    /// Structural errors abort before mutating the output
    #[test]
    fn test_structural_errors() {
        let wires = [long_wire(1.0, 0.0)];
        let (mut bx, mut by, mut bz) = ([7.0; 2], [7.0; 2], [7.0; 2]);

        let r = flux_density_wire(
            (&[][..], &[][..], &[][..]),
            &wires,
            1.0,
            false,
            (&mut [], &mut [], &mut []),
        );
        assert_eq!(r.unwrap_err(), FieldError::EmptyInput("nodes"));

        let r = flux_density_wire(
            (&[1.0, 2.0][..], &[0.0, 0.0][..], &[0.0, 0.0][..]),
            &[],
            1.0,
            false,
            (&mut bx, &mut by, &mut bz),
        );
        assert_eq!(r.unwrap_err(), FieldError::EmptyInput("wires"));

        let r = flux_density_wire(
            (&[1.0, 2.0][..], &[0.0][..], &[0.0, 0.0][..]),
            &wires,
            1.0,
            false,
            (&mut bx, &mut by, &mut bz),
        );
        assert_eq!(r.unwrap_err(), FieldError::LengthMismatch("node coords"));

        // Output untouched by the failed calls
        assert!(bx.iter().chain(&by).chain(&bz).all(|&v| v == 7.0));
    }

    /// The parallel variant produces the exact same values and diagnostics
    /// as the serial one
    #[test]
    fn test_serial_vs_parallel() {
        const NOBS: usize = 257; // Deliberately not a multiple of the core count
        let wires = [
            WireSegment::new([-1.0, 0.3, -2.0], [0.5, -0.2, 2.0], 3.0, 0.05),
            WireSegment::new([0.7, 1.1, -1.0], [0.7, -1.3, 1.5], -2.0, 0.05),
        ];

        let x: Vec<f64> = (0..NOBS).map(|i| (i as f64).sin()).collect();
        let y: Vec<f64> = (0..NOBS).map(|i| (i as f64).cos()).collect();
        let z: Vec<f64> = (0..NOBS).map(|i| 0.01 * i as f64 - 1.0).collect();

        let (mut bx0, mut by0, mut bz0) = (vec![0.0; NOBS], vec![0.0; NOBS], vec![0.0; NOBS]);
        let d0 = flux_density_wire(
            (&x, &y, &z),
            &wires,
            1.0,
            true,
            (&mut bx0, &mut by0, &mut bz0),
        )
        .unwrap();

        let (mut bx1, mut by1, mut bz1) = (vec![0.0; NOBS], vec![0.0; NOBS], vec![0.0; NOBS]);
        let d1 = flux_density_wire_par(
            (&x, &y, &z),
            &wires,
            1.0,
            true,
            (&mut bx1, &mut by1, &mut bz1),
        )
        .unwrap();

        assert_eq!(d0, d1);
        for j in 0..NOBS {
            assert_eq!(bx0[j], bx1[j]);
            assert_eq!(by0[j], by1[j]);
            assert_eq!(bz0[j], bz1[j]);
        }
    }
}
