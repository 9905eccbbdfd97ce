//! Geometry primitives and rigid-body transforms.
//!
//! Helpers here create the point/direction/placement/curve/surface records
//! the board builder and mesh fallback need, and provide the rotation math
//! shared with the merge engine.
//!
//! Rotations are given in degrees and applied about the origin in X, then
//! Y, then Z order.

use glam::{DMat3, DVec3};

use crate::step::{
    Curve, Direction, Edge, EdgeLoop, Face, FaceBound, OrientedEdge, Placement, Point, Ref,
    Repository, Surface, Vector, Vertex,
};

/// Lengths below this are treated as zero when deriving unit directions.
pub const LENGTH_EPSILON: f64 = 1e-9;

/// Returns `v` normalised, or the unit X axis when `v` is (nearly) zero
/// or not finite.
///
/// Degenerate geometry such as a collapsed pill side produces zero-length
/// edges; those still need a valid direction.
#[must_use]
pub fn safe_unit(v: DVec3) -> DVec3 {
    let length = v.length();
    if length.is_finite() && length > LENGTH_EPSILON {
        v / length
    } else {
        DVec3::X
    }
}

/// Returns a unit vector perpendicular to `axis`.
#[must_use]
pub fn perpendicular(axis: DVec3) -> DVec3 {
    let axis = safe_unit(axis);
    let helper = if axis.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
    safe_unit(helper - axis * helper.dot(axis))
}

/// Rotation matrix for Euler angles in degrees, applied X, then Y, then Z.
#[must_use]
pub fn rotation_xyz(degrees: DVec3) -> DMat3 {
    DMat3::from_rotation_z(degrees.z.to_radians())
        * DMat3::from_rotation_y(degrees.y.to_radians())
        * DMat3::from_rotation_x(degrees.x.to_radians())
}

/// Rotation plus translation with an optional uniform scale.
///
/// Points map as `p' = R · (s · p) + t`; directions as `normalize(R · d)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    /// Euler rotation in degrees (X, then Y, then Z).
    pub rotation_degrees: DVec3,
    /// Translation in millimetres, applied after rotation.
    pub translation: DVec3,
    /// Uniform scale applied before rotation.
    pub scale: f64,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        rotation_degrees: DVec3::ZERO,
        translation: DVec3::ZERO,
        scale: 1.0,
    };

    /// Creates a transform without scaling.
    #[must_use]
    pub const fn new(rotation_degrees: DVec3, translation: DVec3) -> Self {
        Self {
            rotation_degrees,
            translation,
            scale: 1.0,
        }
    }

    /// Sets the uniform scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// The rotation part as a matrix.
    #[must_use]
    pub fn rotation(&self) -> DMat3 {
        rotation_xyz(self.rotation_degrees)
    }

    /// Scales and rotates a point without translating it.
    #[must_use]
    pub fn orient_point(&self, p: DVec3) -> DVec3 {
        self.rotation() * (p * self.scale)
    }

    /// Maps a point through the full transform.
    #[must_use]
    pub fn apply_point(&self, p: DVec3) -> DVec3 {
        self.orient_point(p) + self.translation
    }

    /// Rotates a direction and renormalises it.
    #[must_use]
    pub fn apply_direction(&self, d: DVec3) -> DVec3 {
        safe_unit(self.rotation() * d)
    }

    /// Scales a length (radius, vector magnitude).
    #[must_use]
    pub fn apply_length(&self, length: f64) -> f64 {
        length * self.scale
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Bounds3 {
    /// Bounding box of a set of points, or `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(
            Self {
                min: first,
                max: first,
            },
            |b, p| Self {
                min: b.min.min(p),
                max: b.max.max(p),
            },
        ))
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths of the box.
    #[must_use]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }
}

/// Appends a `CARTESIAN_POINT`.
pub fn add_point(repo: &mut Repository, p: DVec3) -> Ref<Point> {
    repo.add(Point::from(p))
}

/// Appends a unit `DIRECTION`.
pub fn add_direction(repo: &mut Repository, d: DVec3) -> Ref<Direction> {
    repo.add(Direction::from(safe_unit(d)))
}

/// Appends a `VERTEX_POINT` (with its own point) at `p`.
pub fn add_vertex(repo: &mut Repository, p: DVec3) -> Ref<Vertex> {
    let point = add_point(repo, p);
    repo.add(Vertex { point })
}

/// Appends an `AXIS2_PLACEMENT_3D` with origin, Z axis and X hint.
pub fn add_placement(
    repo: &mut Repository,
    origin: DVec3,
    axis: DVec3,
    ref_direction: DVec3,
) -> Ref<Placement> {
    let location = add_point(repo, origin);
    let axis = add_direction(repo, axis);
    let ref_direction = add_direction(repo, ref_direction);
    repo.add(Placement {
        location,
        axis: Some(axis),
        ref_direction: Some(ref_direction),
    })
}

/// Appends a `LINE` from `from` towards `to`.
///
/// The vector magnitude is the segment length, never less than
/// [`LENGTH_EPSILON`].
pub fn add_line(repo: &mut Repository, from: DVec3, to: DVec3) -> Ref<Curve> {
    let delta = to - from;
    let point = add_point(repo, from);
    let orientation = add_direction(repo, delta);
    let vector = repo.add(Vector {
        orientation,
        magnitude: delta.length().max(LENGTH_EPSILON),
    });
    repo.add(Curve::Line { point, vector })
}

/// Appends a `CIRCLE` centred at `center` in the plane normal to `axis`.
pub fn add_circle(repo: &mut Repository, center: DVec3, axis: DVec3, radius: f64) -> Ref<Curve> {
    let placement = add_placement(repo, center, axis, perpendicular(axis));
    repo.add(Curve::Circle { placement, radius })
}

/// Appends a `PLANE` through `origin` with normal `normal`.
pub fn add_plane(
    repo: &mut Repository,
    origin: DVec3,
    normal: DVec3,
    ref_direction: DVec3,
) -> Ref<Surface> {
    let placement = add_placement(repo, origin, normal, ref_direction);
    repo.add(Surface::Plane { placement })
}

/// Appends a `CYLINDRICAL_SURFACE` about `axis` through `origin`.
pub fn add_cylinder(
    repo: &mut Repository,
    origin: DVec3,
    axis: DVec3,
    radius: f64,
) -> Ref<Surface> {
    let placement = add_placement(repo, origin, axis, perpendicular(axis));
    repo.add(Surface::Cylinder { placement, radius })
}

/// An edge used in a loop: `true` traverses start → end.
pub type LoopEdge = (Ref<Edge>, bool);

/// Appends an `EDGE_CURVE` running along its curve's own direction.
pub fn add_edge(
    repo: &mut Repository,
    start: Ref<Vertex>,
    end: Ref<Vertex>,
    curve: Ref<Curve>,
) -> Ref<Edge> {
    repo.add(Edge {
        start,
        end,
        curve,
        same_sense: true,
    })
}

/// Appends an `EDGE_LOOP` of oriented edges.
pub fn add_loop(repo: &mut Repository, edges: &[LoopEdge]) -> Ref<EdgeLoop> {
    let edges = edges
        .iter()
        .map(|&(edge, forward)| repo.add(OrientedEdge { edge, forward }))
        .collect();
    repo.add(EdgeLoop { edges })
}

/// Appends an `ADVANCED_FACE` with one outer bound and any number of
/// inner bounds.
pub fn add_face(
    repo: &mut Repository,
    surface: Ref<Surface>,
    outer: &[LoopEdge],
    inner: &[Vec<LoopEdge>],
    same_sense: bool,
) -> Ref<Face> {
    let outer_loop = add_loop(repo, outer);
    let mut bounds = vec![repo.add(FaceBound {
        edge_loop: outer_loop,
        outer: true,
        same_sense: true,
    })];
    for edges in inner {
        let edge_loop = add_loop(repo, edges);
        bounds.push(repo.add(FaceBound {
            edge_loop,
            outer: false,
            same_sense: true,
        }));
    }
    repo.add(Face {
        surface,
        bounds,
        same_sense,
    })
}
