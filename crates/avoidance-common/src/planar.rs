//! 2D geometry operations
//!
//! Planar constructions used by the reference hull and the polygon shape.
//! They work on `glam` vectors in the local frame of an obstacle.

use crate::{Error, Result, Vector};
use glam::DVec2;

/// Converts the first two components of a vector into a `DVec2`
#[inline]
pub fn to_dvec2(v: &Vector) -> DVec2 {
    DVec2::new(v[0], v[1])
}

/// Converts a `DVec2` into a two-component vector
#[inline]
pub fn from_dvec2(v: DVec2) -> Vector {
    Vector::from_vec(vec![v.x, v.y])
}

/// Polar angle of a 2D point
#[inline]
pub fn polar_angle(v: DVec2) -> f64 {
    v.y.atan2(v.x)
}

/// Double tangent from an external point to an ellipse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseTangents {
    /// Unit directions from the external point toward each tangent point
    pub directions: [DVec2; 2],
    /// Points of contact on the ellipse
    pub points: [DVec2; 2],
}

/// Tangents from `edge_point` to the axis-aligned ellipse with semi-axes `axes`
/// centered at the origin.
///
/// The contact point `points[1]` follows `points[0]` counter-clockwise about the
/// ellipse center, sweeping the arc that faces `edge_point`.
///
/// The construction maps the ellipse onto the unit circle, where the tangent
/// condition (zero discriminant of the line/ellipse intersection) reduces to
/// `|q|^2 - 1 >= 0` for the scaled point `q`.
pub fn tangents_to_ellipse(edge_point: DVec2, axes: DVec2) -> Result<EllipseTangents> {
    if axes.x <= 0.0 || axes.y <= 0.0 {
        return Err(Error::Geometry(format!("ellipse axes must be positive, got {axes}")));
    }

    let scaled = edge_point / axes;
    let discriminant = scaled.length_squared() - 1.0;
    if discriminant < 0.0 {
        return Err(Error::Geometry(format!(
            "no tangent from {edge_point} to ellipse with axes {axes} (discriminant {discriminant})"
        )));
    }

    let center_angle = polar_angle(scaled);
    let half_opening = (1.0 / scaled.length()).clamp(-1.0, 1.0).acos();

    let points = [
        DVec2::from_angle(center_angle - half_opening) * axes,
        DVec2::from_angle(center_angle + half_opening) * axes,
    ];
    let directions = [
        (points[0] - edge_point).normalize_or_zero(),
        (points[1] - edge_point).normalize_or_zero(),
    ];

    Ok(EllipseTangents { directions, points })
}

/// Intersection of the ray `origin + t * direction` (t >= 0) with the segment `a`-`b`.
///
/// Returns the ray parameter and the segment parameter in [0, 1].
pub fn ray_segment_intersection(origin: DVec2, direction: DVec2, a: DVec2, b: DVec2) -> Option<(f64, f64)> {
    let edge = b - a;
    let denominator = direction.perp_dot(edge);
    if denominator.abs() < 1e-12 {
        return None;
    }

    let to_start = a - origin;
    let ray_t = to_start.perp_dot(edge) / denominator;
    let segment_t = to_start.perp_dot(direction) / denominator;

    const EDGE_TOLERANCE: f64 = 1e-9;
    if ray_t >= 0.0 && (-EDGE_TOLERANCE..=1.0 + EDGE_TOLERANCE).contains(&segment_t) {
        Some((ray_t, segment_t.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Squared distance from `point` to the segment `a`-`b`
pub fn distance_point_segment_sqr(point: DVec2, a: DVec2, b: DVec2) -> f64 {
    let edge = b - a;
    let length_sqr = edge.length_squared();
    let t = if length_sqr > 0.0 {
        ((point - a).dot(edge) / length_sqr).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (a + edge * t).distance_squared(point)
}
