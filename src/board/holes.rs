//! Through-hole boundaries and wall faces.
//!
//! Every hole boundary is a counter-clockwise (viewed from +Z) cycle of
//! segments. The same segments are emitted at `z = 0` and `z = thickness`;
//! the bottom ring is cut into the bottom face, the top ring into the top
//! face, and the wall faces join the two rings.

use glam::{DVec2, DVec3};

use super::Hole;
use crate::geometry::{
    add_circle, add_cylinder, add_edge, add_face, add_line, add_plane, add_vertex, safe_unit,
    LoopEdge,
};
use crate::step::{Edge, Face, Ref, Repository, Vertex};

/// One piece of a hole boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Counter-clockwise circular arc from `start` to `end`.
    Arc {
        /// Arc centre.
        center: DVec2,
        /// Arc radius.
        radius: f64,
        /// Start point.
        start: DVec2,
        /// End point.
        end: DVec2,
    },
    /// Straight segment.
    Line {
        /// Start point.
        start: DVec2,
        /// End point.
        end: DVec2,
    },
}

impl Segment {
    /// Start point of the segment.
    #[must_use]
    pub const fn start(&self) -> DVec2 {
        match *self {
            Self::Arc { start, .. } | Self::Line { start, .. } => start,
        }
    }

    /// End point of the segment.
    #[must_use]
    pub const fn end(&self) -> DVec2 {
        match *self {
            Self::Arc { end, .. } | Self::Line { end, .. } => end,
        }
    }
}

/// Boundary of a round hole: two semicircles, so each ring has two arcs.
#[must_use]
pub fn circle_boundary(center: DVec2, diameter: f64) -> Vec<Segment> {
    let radius = diameter / 2.0;
    let east = center + DVec2::new(radius, 0.0);
    let west = center - DVec2::new(radius, 0.0);
    vec![
        Segment::Arc {
            center,
            radius,
            start: east,
            end: west,
        },
        Segment::Arc {
            center,
            radius,
            start: west,
            end: east,
        },
    ]
}

/// Boundary of a pill (stadium) hole.
///
/// The unrotated shape is laid out around the origin, then every point is
/// rotated by `rotation_degrees` about the hole centre. Both horizontal
/// (`width >= height`) and vertical pills are traversed counter-clockwise.
#[must_use]
pub fn pill_boundary(
    center: DVec2,
    width: f64,
    height: f64,
    rotation_degrees: f64,
) -> Vec<Segment> {
    let radius = width.min(height) / 2.0;
    let half_span = (width - height).abs() / 2.0;

    let local = if width >= height {
        let right = DVec2::new(half_span, 0.0);
        let left = DVec2::new(-half_span, 0.0);
        let c0 = DVec2::new(half_span, -radius);
        let c1 = DVec2::new(half_span, radius);
        let c2 = DVec2::new(-half_span, radius);
        let c3 = DVec2::new(-half_span, -radius);
        [
            Segment::Arc {
                center: right,
                radius,
                start: c0,
                end: c1,
            },
            Segment::Line { start: c1, end: c2 },
            Segment::Arc {
                center: left,
                radius,
                start: c2,
                end: c3,
            },
            Segment::Line { start: c3, end: c0 },
        ]
    } else {
        let upper = DVec2::new(0.0, half_span);
        let lower = DVec2::new(0.0, -half_span);
        let c0 = DVec2::new(radius, -half_span);
        let c1 = DVec2::new(radius, half_span);
        let c2 = DVec2::new(-radius, half_span);
        let c3 = DVec2::new(-radius, -half_span);
        [
            Segment::Line { start: c0, end: c1 },
            Segment::Arc {
                center: upper,
                radius,
                start: c1,
                end: c2,
            },
            Segment::Line { start: c2, end: c3 },
            Segment::Arc {
                center: lower,
                radius,
                start: c3,
                end: c0,
            },
        ]
    };

    let rotation = DVec2::from_angle(rotation_degrees.to_radians());
    let place = |p: DVec2| center + rotation.rotate(p);
    local
        .into_iter()
        .map(|segment| match segment {
            Segment::Arc {
                center: c,
                radius,
                start,
                end,
            } => Segment::Arc {
                center: place(c),
                radius,
                start: place(start),
                end: place(end),
            },
            Segment::Line { start, end } => Segment::Line {
                start: place(start),
                end: place(end),
            },
        })
        .collect()
}

/// Boundary segments for any hole.
#[must_use]
pub fn hole_boundary(hole: &Hole) -> Vec<Segment> {
    match *hole {
        Hole::Circle { x, y, diameter } => circle_boundary(DVec2::new(x, y), diameter),
        Hole::Pill {
            x,
            y,
            width,
            height,
            rotation_degrees,
        } => pill_boundary(DVec2::new(x, y), width, height, rotation_degrees),
    }
}

/// Topology of one built hole.
#[derive(Debug, Clone)]
pub struct HoleTopology {
    /// Ring at `z = 0`, one edge per segment, counter-clockwise.
    pub bottom: Vec<Ref<Edge>>,
    /// Ring at `z = thickness`, one edge per segment, counter-clockwise.
    pub top: Vec<Ref<Edge>>,
    /// Wall faces.
    pub walls: Vec<Ref<Face>>,
}

impl HoleTopology {
    /// Inner loop for the bottom face (normal −Z).
    #[must_use]
    pub fn bottom_loop(&self) -> Vec<LoopEdge> {
        self.bottom.iter().map(|&e| (e, true)).collect()
    }

    /// Inner loop for the top face (normal +Z).
    #[must_use]
    pub fn top_loop(&self) -> Vec<LoopEdge> {
        self.top.iter().rev().map(|&e| (e, false)).collect()
    }
}

/// Emits the rings and wall faces of one hole.
pub fn build_hole(repo: &mut Repository, hole: &Hole, thickness: f64) -> HoleTopology {
    let segments = hole_boundary(hole);
    let (bottom_vertices, bottom) = build_ring(repo, &segments, 0.0);
    let (top_vertices, top) = build_ring(repo, &segments, thickness);

    let walls = match *hole {
        Hole::Circle { x, y, diameter } => {
            // One cylinder bounded by both rings; no seam edge.
            let cylinder = add_cylinder(repo, DVec3::new(x, y, 0.0), DVec3::Z, diameter / 2.0);
            let outer: Vec<LoopEdge> = bottom.iter().rev().map(|&e| (e, false)).collect();
            let inner: Vec<LoopEdge> = top.iter().map(|&e| (e, true)).collect();
            vec![add_face(repo, cylinder, &outer, &[inner], false)]
        }
        Hole::Pill { .. } => {
            let verticals: Vec<Ref<Edge>> = segments
                .iter()
                .enumerate()
                .map(|(k, segment)| {
                    let p = segment.start();
                    let line = add_line(repo, p.extend(0.0), p.extend(thickness));
                    add_edge(repo, bottom_vertices[k], top_vertices[k], line)
                })
                .collect();

            let count = segments.len();
            segments
                .iter()
                .enumerate()
                .map(|(k, segment)| {
                    let next = (k + 1) % count;
                    let edges = [
                        (bottom[k], false),
                        (verticals[k], true),
                        (top[k], true),
                        (verticals[next], false),
                    ];
                    match *segment {
                        Segment::Arc { center, radius, .. } => {
                            let surface = add_cylinder(repo, center.extend(0.0), DVec3::Z, radius);
                            add_face(repo, surface, &edges, &[], false)
                        }
                        Segment::Line { start, end } => {
                            let along = safe_unit((end - start).extend(0.0));
                            let into_hole = DVec3::new(-along.y, along.x, 0.0);
                            let surface = add_plane(repo, start.extend(0.0), into_hole, along);
                            add_face(repo, surface, &edges, &[], true)
                        }
                    }
                })
                .collect()
        }
    };

    HoleTopology { bottom, top, walls }
}

/// Emits one vertex per segment start and one edge per segment at height
/// `z`.
fn build_ring(
    repo: &mut Repository,
    segments: &[Segment],
    z: f64,
) -> (Vec<Ref<Vertex>>, Vec<Ref<Edge>>) {
    let vertices: Vec<Ref<Vertex>> = segments
        .iter()
        .map(|s| add_vertex(repo, s.start().extend(z)))
        .collect();

    let count = segments.len();
    let edges = segments
        .iter()
        .enumerate()
        .map(|(k, segment)| {
            let curve = match *segment {
                Segment::Arc { center, radius, .. } => {
                    add_circle(repo, center.extend(z), DVec3::Z, radius)
                }
                Segment::Line { start, end } => add_line(repo, start.extend(z), end.extend(z)),
            };
            add_edge(repo, vertices[k], vertices[(k + 1) % count], curve)
        })
        .collect();

    (vertices, edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-9
    }

    fn assert_closed_ccw(segments: &[Segment]) {
        for (k, s) in segments.iter().enumerate() {
            let next = &segments[(k + 1) % segments.len()];
            assert!(close(s.end(), next.start()), "segment {k} does not meet {}", k + 1);
        }
        // Shoelace over segment endpoints plus arc midpoints.
        let mut points = Vec::new();
        for s in segments {
            points.push(s.start());
            if let Segment::Arc {
                center,
                radius,
                start,
                ..
            } = *s
            {
                let offset = start - center;
                let a = offset.y.atan2(offset.x) + std::f64::consts::FRAC_PI_2;
                points.push(center + DVec2::from_angle(a) * radius);
            }
        }
        let area: f64 = (0..points.len())
            .map(|i| points[i].perp_dot(points[(i + 1) % points.len()]))
            .sum();
        assert!(area > 0.0, "boundary is not counter-clockwise");
    }

    #[test]
    fn circle_boundary_is_two_semicircles() {
        let segments = circle_boundary(DVec2::new(2.5, 2.5), 3.2);
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| matches!(s, Segment::Arc { .. })));
        assert_closed_ccw(&segments);
    }

    #[test]
    fn horizontal_pill_is_ccw() {
        let segments = pill_boundary(DVec2::ZERO, 4.0, 2.0, 0.0);
        assert!(matches!(segments[0], Segment::Arc { .. }));
        assert!(close(segments[1].start(), DVec2::new(1.0, 1.0)));
        assert!(close(segments[1].end(), DVec2::new(-1.0, 1.0)));
        assert_closed_ccw(&segments);
    }

    #[test]
    fn vertical_pill_is_ccw() {
        let segments = pill_boundary(DVec2::new(1.0, 1.0), 2.0, 5.0, 0.0);
        assert!(matches!(segments[0], Segment::Line { .. }));
        assert!(close(segments[0].start(), DVec2::new(2.0, -0.5)));
        assert!(close(segments[0].end(), DVec2::new(2.0, 2.5)));
        assert_closed_ccw(&segments);
    }

    #[test]
    fn rotation_is_about_the_hole_centre() {
        let center = DVec2::new(10.0, -3.0);
        let segments = pill_boundary(center, 4.0, 2.0, 90.0);
        // The right cap centre (center + (1, 0)) rotates onto center + (0, 1).
        let Segment::Arc { center: cap, .. } = segments[0] else {
            panic!("expected arc");
        };
        assert!(close(cap, center + DVec2::new(0.0, 1.0)));
        assert_closed_ccw(&segments);
    }

    #[test]
    fn square_pill_has_degenerate_sides() {
        let segments = pill_boundary(DVec2::ZERO, 2.0, 2.0, 30.0);
        assert_eq!(segments.len(), 4);
        let Segment::Line { start, end } = segments[1] else {
            panic!("expected line");
        };
        assert!(close(start, end));
    }

    #[test]
    fn pill_walls_are_two_cylinders_and_two_planes() {
        let mut repo = Repository::new();
        let hole = Hole::Pill {
            x: 0.0,
            y: 0.0,
            width: 3.0,
            height: 1.0,
            rotation_degrees: 45.0,
        };
        let topo = build_hole(&mut repo, &hole, 1.6);
        assert_eq!(topo.walls.len(), 4);
        assert_eq!(topo.bottom.len(), 4);
        assert_eq!(topo.top.len(), 4);
    }
}
