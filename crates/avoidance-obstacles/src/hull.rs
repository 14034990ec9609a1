//! Reference hull for planar ellipses whose reference point was moved outside
//!
//! The hull replaces the arc of the ellipse facing the reference point by the
//! two tangent segments through a slightly pushed-out edge point. Positions
//! whose polar angle lies in the cone spanned by the two tangent points use the
//! hull, everything else keeps the ellipse.

use avoidance_common::planar::{polar_angle, ray_segment_intersection, tangents_to_ellipse};
use avoidance_common::{angle_difference_directional_2pi, Result};
use glam::DVec2;

/// Default extension of the edge point beyond the reference point, relative to the axes norm
pub const RELATIVE_HULL_MARGIN: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceHull {
    /// Apex of the hull, just beyond the reference point
    pub edge_point: DVec2,
    /// Contact points of the tangents, `[1]` counter-clockwise of `[0]`
    pub tangent_points: [DVec2; 2],
    /// Outward normals of the segments `T0 -> P` and `P -> T1`
    pub normals: [DVec2; 2],
}

impl ReferenceHull {
    /// Builds the hull around `reference_point` for the ellipse with semi-axes `axes`.
    ///
    /// Returns `None` if the pushed-out reference point is still inside the ellipse.
    pub fn around(reference_point: DVec2, axes: DVec2, relative_hull_margin: f64) -> Result<Option<Self>> {
        let magnitude = reference_point.length();
        if magnitude == 0.0 {
            return Ok(None);
        }

        let extension = axes.length() * relative_hull_margin;
        let edge_point = reference_point * (1.0 + extension / magnitude);
        if (edge_point / axes).length() <= 1.0 {
            return Ok(None);
        }

        let tangents = tangents_to_ellipse(edge_point, axes)?;
        let tangent_points = tangents.points;
        let normals = [
            outward_normal(tangent_points[0], edge_point),
            outward_normal(edge_point, tangent_points[1]),
        ];

        Ok(Some(Self {
            edge_point,
            tangent_points,
            normals,
        }))
    }

    fn opening_angle(&self) -> f64 {
        angle_difference_directional_2pi(polar_angle(self.tangent_points[1]), polar_angle(self.tangent_points[0]))
    }

    /// Angle of `position` measured counter-clockwise from the first tangent point,
    /// `None` outside the hull cone.
    fn angle_in_cone(&self, position: DVec2) -> Option<f64> {
        if position == DVec2::ZERO {
            return None;
        }
        let angle = angle_difference_directional_2pi(polar_angle(position), polar_angle(self.tangent_points[0]));
        (angle <= self.opening_angle()).then_some(angle)
    }

    /// Whether the polar angle of `position` falls within the hull cone
    pub fn covers(&self, position: DVec2) -> bool {
        self.angle_in_cone(position).is_some()
    }

    /// Distance from the local origin to the hull along `position`, if the hull applies
    pub fn local_radius(&self, position: DVec2) -> Option<f64> {
        self.angle_in_cone(position)?;
        let direction = position.normalize();
        [
            (self.tangent_points[0], self.edge_point),
            (self.edge_point, self.tangent_points[1]),
        ]
        .into_iter()
        .filter_map(|(a, b)| ray_segment_intersection(DVec2::ZERO, direction, a, b).map(|(t, _)| t))
        .reduce(f64::max)
    }

    /// Gamma with respect to the hull outline, if the hull applies
    pub fn gamma(&self, position: DVec2) -> Option<f64> {
        self.local_radius(position).map(|radius| position.length() / radius)
    }

    /// Outward normal blended by the angular position across the hull, if it applies
    pub fn normal(&self, position: DVec2) -> Option<DVec2> {
        let angle = self.angle_in_cone(position)?;
        let opening = self.opening_angle();
        let fraction = if opening > 0.0 { angle / opening } else { 0.5 };
        Some(((1.0 - fraction) * self.normals[0] + fraction * self.normals[1]).normalize_or_zero())
    }
}

/// Unit normal of the segment `a`-`b` pointing away from the origin
fn outward_normal(a: DVec2, b: DVec2) -> DVec2 {
    let normal = (b - a).perp().normalize_or_zero();
    if normal.dot(a) < 0.0 {
        -normal
    } else {
        normal
    }
}
