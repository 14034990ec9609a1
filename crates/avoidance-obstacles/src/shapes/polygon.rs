//! Planar polygon shape
//!
//! The outline may be non-convex and need not be star-shaped with respect to
//! the local origin. Gamma is the ratio of the distance to the origin over the
//! distance to the outline along the same ray.

use super::ObstacleGeometry;
use avoidance_common::planar::{distance_point_segment_sqr, from_dvec2, ray_segment_intersection, to_dvec2};
use avoidance_common::{Error, Result, Vector};
use glam::DVec2;

const ON_EDGE_DISTANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Margin-inflated vertices in counter-clockwise order
    vertices: Vec<DVec2>,
    star_shaped: bool,
}

impl Polygon {
    /// Creates a polygon from its outline; each vertex is pushed radially by `margin`
    pub fn new(mut vertices: Vec<DVec2>, margin: f64) -> Self {
        if signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }

        let vertices: Vec<DVec2> = vertices
            .into_iter()
            .map(|v| {
                let length = v.length();
                if length > 0.0 {
                    v * ((length + margin) / length)
                } else {
                    v
                }
            })
            .collect();

        // Star-shaped about the origin iff it lies on the inner side of every edge
        let star_shaped = edges(&vertices).all(|(a, b)| (b - a).perp_dot(-a) > 0.0);

        Self { vertices, star_shaped }
    }

    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    fn edges(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        edges(&self.vertices)
    }

    /// Ray parameters of all hits of the ray with the outline
    fn ray_hits(&self, origin: DVec2, direction: DVec2) -> impl Iterator<Item = f64> + '_ {
        self.edges()
            .filter_map(move |(a, b)| ray_segment_intersection(origin, direction, a, b).map(|(t, _)| t))
    }

    fn max_vertex_distance(&self) -> f64 {
        self.vertices.iter().map(|v| v.length()).fold(0.0, f64::max)
    }

    fn contains(&self, point: DVec2) -> bool {
        // Even-odd rule along +x
        let crossings = self
            .ray_hits(point, DVec2::X)
            .filter(|t| *t > 0.0)
            .count();
        crossings % 2 == 1
    }
}

fn edges(vertices: &[DVec2]) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
    (0..vertices.len()).map(move |ii| (vertices[ii], vertices[(ii + 1) % vertices.len()]))
}

/// Whether the origin lies strictly inside the outline (winding number, any orientation)
pub(crate) fn encloses_origin(vertices: &[DVec2]) -> bool {
    let on_outline = edges(vertices)
        .any(|(a, b)| distance_point_segment_sqr(DVec2::ZERO, a, b) <= ON_EDGE_DISTANCE * ON_EDGE_DISTANCE);
    if on_outline {
        return false;
    }
    let winding: f64 = edges(vertices).map(|(a, b)| a.perp_dot(b).atan2(a.dot(b))).sum();
    winding.abs() > std::f64::consts::PI
}

fn signed_area(vertices: &[DVec2]) -> f64 {
    0.5 * edges(vertices).map(|(a, b)| a.perp_dot(b)).sum::<f64>()
}

/// Outward normal of a counter-clockwise edge
fn edge_normal(a: DVec2, b: DVec2) -> DVec2 {
    let edge = b - a;
    DVec2::new(edge.y, -edge.x).normalize_or_zero()
}

impl ObstacleGeometry for Polygon {
    fn dimension(&self) -> usize {
        2
    }

    fn gamma(&self, position: &Vector) -> f64 {
        let point = to_dvec2(position);
        let distance = point.length();
        if distance == 0.0 {
            return 0.0;
        }
        distance / self.local_radius(position)
    }

    fn normal(&self, position: &Vector) -> Vector {
        let point = to_dvec2(position);
        if point.length() == 0.0 {
            return Vector::zeros(2);
        }

        let inside = self.contains(point);
        let mut sum = DVec2::ZERO;
        for (a, b) in self.edges() {
            let normal = edge_normal(a, b);
            let distance_sqr = distance_point_segment_sqr(point, a, b);
            if distance_sqr.sqrt() < ON_EDGE_DISTANCE {
                return from_dvec2(normal);
            }

            // Outside, only edges facing the point contribute
            if !inside && normal.dot(point - a) <= 0.0 {
                continue;
            }
            sum += normal / distance_sqr;
        }

        from_dvec2(sum.normalize_or_zero())
    }

    fn surface_intersection(&self, direction: &Vector, from_point: &Vector) -> Result<Vector> {
        let direction = to_dvec2(direction).normalize_or_zero();
        if direction == DVec2::ZERO {
            return Err(Error::Geometry("zero ray direction".to_string()));
        }

        let origin = to_dvec2(from_point);
        self.ray_hits(origin, direction)
            .min_by(f64::total_cmp)
            .map(|t| from_dvec2(origin + direction * t))
            .ok_or_else(|| Error::Geometry("ray misses the polygon".to_string()))
    }

    fn local_radius(&self, direction: &Vector) -> f64 {
        let direction = to_dvec2(direction).normalize_or_zero();
        if direction == DVec2::ZERO {
            return self.max_vertex_distance();
        }

        let hits = self.ray_hits(DVec2::ZERO, direction);
        let radius = if self.star_shaped {
            hits.min_by(f64::total_cmp)
        } else {
            hits.max_by(f64::total_cmp)
        };
        radius.unwrap_or_else(|| self.max_vertex_distance())
    }

    fn reference_length(&self) -> f64 {
        self.max_vertex_distance()
    }

    fn is_star_shaped(&self) -> bool {
        self.star_shaped
    }
}
