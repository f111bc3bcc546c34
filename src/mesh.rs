//! Filamentization of idealized coil geometry into [`WireSegment`] chains
//! for the wire-segment field evaluator.

use core::f64::consts::PI;

use nalgebra::{Rotation3, Vector3};

use crate::error::FieldError;
use crate::sources::WireSegment;

/// Rotation taking the +z axis onto `direction`.
///
/// `rotation_between` fails for nearly-antiparallel vectors, which is handled
/// with an explicit half-turn, and can produce NaN entries for
/// nearly-parallel vectors, where no rotation is required.
fn frame_rotation(direction: &Vector3<f64>) -> Rotation3<f64> {
    match Rotation3::rotation_between(&Vector3::z(), direction) {
        Some(rot) if !rot.into_inner().iter().any(|v| v.is_nan()) => rot,
        _ if direction[2] > 0.0 => Rotation3::identity(),
        _ => Rotation3::from_axis_angle(&Vector3::x_axis(), PI),
    }
}

/// Discretize a circular current loop into a closed chain of wire segments.
///
/// # Arguments
///
/// * `center`:           (m) loop center
/// * `normal`:           loop plane normal; need not be unit length. Positive
///                       current is right-handed about it.
/// * `radius`:           (m) loop radius, > 0
/// * `current`:          (A) loop current, carried by every segment
/// * `conductor_radius`: (m) cross-section radius carried to every segment
/// * `nseg`:             number of segments, >= 3
///
/// # Commentary
///
/// The polygonal approximation is inscribed in the loop circle; the field it
/// produces converges to the true loop field like `(pi / nseg)^2`. The chain
/// is closed exactly: the last segment ends on the first segment's start
/// point rather than on a second trigonometric evaluation of it.
pub fn segment_circular_loop(
    center: [f64; 3],
    normal: [f64; 3],
    radius: f64,
    current: f64,
    conductor_radius: f64,
    nseg: usize,
) -> Result<Vec<WireSegment<f64>>, FieldError> {
    if nseg < 3 {
        return Err(FieldError::InvalidGeometry("loop needs at least 3 segments"));
    }
    if !(radius > 0.0) {
        return Err(FieldError::InvalidGeometry("loop radius must be positive"));
    }
    let nvec = Vector3::from(normal);
    if nvec.norm() == 0.0 {
        return Err(FieldError::InvalidGeometry("loop normal must be non-zero"));
    }

    let rot = frame_rotation(&nvec);
    let cvec = Vector3::from(center);

    let mut points = Vec::with_capacity(nseg + 1);
    for i in 0..=nseg {
        let theta = 2.0 * PI * (i as f64) / (nseg as f64); // [rad]
        let p = rot * Vector3::new(radius * theta.cos(), radius * theta.sin(), 0.0) + cvec;
        points.push([p.x, p.y, p.z]);
    }
    // Close the chain exactly against trig roundoff
    points[nseg] = points[0];

    Ok(points
        .windows(2)
        .map(|w| WireSegment::new(w[0], w[1], current, conductor_radius))
        .collect())
}

/// Discretize a helical winding about a straight axis into wire segments.
///
/// # Arguments
///
/// * `origin`:           (m) center of the winding's start plane
/// * `axis`:             winding axis direction; need not be unit length.
///                       The winding advances `pitch` along it per turn and
///                       positive current is right-handed about it.
/// * `radius`:           (m) winding radius, > 0
/// * `pitch`:            (m) axial advance per turn
/// * `nturns`:           number of full turns, >= 1
/// * `current`:          (A) winding current, carried by every segment
/// * `conductor_radius`: (m) cross-section radius carried to every segment
/// * `nseg_per_turn`:    segments per turn, >= 3
#[allow(clippy::too_many_arguments)]
pub fn segment_helix(
    origin: [f64; 3],
    axis: [f64; 3],
    radius: f64,
    pitch: f64,
    nturns: usize,
    current: f64,
    conductor_radius: f64,
    nseg_per_turn: usize,
) -> Result<Vec<WireSegment<f64>>, FieldError> {
    if nseg_per_turn < 3 {
        return Err(FieldError::InvalidGeometry(
            "helix needs at least 3 segments per turn",
        ));
    }
    if nturns == 0 {
        return Err(FieldError::InvalidGeometry("helix needs at least 1 turn"));
    }
    if !(radius > 0.0) {
        return Err(FieldError::InvalidGeometry("helix radius must be positive"));
    }
    let avec = Vector3::from(axis);
    if avec.norm() == 0.0 {
        return Err(FieldError::InvalidGeometry("helix axis must be non-zero"));
    }

    let rot = frame_rotation(&avec);
    let ovec = Vector3::from(origin);

    let nseg = nturns * nseg_per_turn;
    let mut points = Vec::with_capacity(nseg + 1);
    for i in 0..=nseg {
        let frac = (i as f64) / (nseg_per_turn as f64); // [turns]
        let theta = 2.0 * PI * frac; // [rad]
        let p = rot * Vector3::new(radius * theta.cos(), radius * theta.sin(), pitch * frac) + ovec;
        points.push([p.x, p.y, p.z]);
    }

    Ok(points
        .windows(2)
        .map(|w| WireSegment::new(w[0], w[1], current, conductor_radius))
        .collect())
}
