//! Entity kinds stored in a [`Repository`](super::Repository).
//!
//! Every entity is one variant of [`Entity`]. Modeled kinds hold typed
//! [`Ref`] handles to other entities; anything this crate does not model is
//! kept as a [`RawEntity`] whose argument text is scanned for `#<id>`
//! references on demand.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use glam::DVec3;

use super::refs::{rewrite_refs, scan_refs};

/// A typed handle to an entity inside one repository.
///
/// The integer id only has meaning relative to the repository that issued
/// it. Resolution goes through [`Repository::get`](super::Repository::get).
pub struct Ref<T> {
    id: u64,
    kind: PhantomData<fn() -> T>,
}

impl<T> Ref<T> {
    /// Wraps a raw entity id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            kind: PhantomData,
        }
    }

    /// Returns the raw entity id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.id
    }

    fn remap(&mut self, remap: &mut impl FnMut(u64) -> u64) {
        self.id = remap(self.id);
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Ref<T> {}

impl<T> PartialOrd for Ref<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ref<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id)
    }
}

/// A 3-D cartesian point in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point {
    /// Returns the point as a vector.
    #[must_use]
    pub const fn to_vec(self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }
}

impl From<DVec3> for Point {
    fn from(v: DVec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// A 3-D direction. Unit length wherever it serves as a placement axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction {
    /// X component.
    pub dx: f64,
    /// Y component.
    pub dy: f64,
    /// Z component.
    pub dz: f64,
}

impl Direction {
    /// Returns the direction as a vector.
    #[must_use]
    pub const fn to_vec(self) -> DVec3 {
        DVec3::new(self.dx, self.dy, self.dz)
    }
}

impl From<DVec3> for Direction {
    fn from(v: DVec3) -> Self {
        Self {
            dx: v.x,
            dy: v.y,
            dz: v.z,
        }
    }
}

/// A direction with a magnitude; the parametric direction of a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    /// Unit orientation.
    pub orientation: Ref<Direction>,
    /// Length of the vector in millimetres.
    pub magnitude: f64,
}

/// A right-handed local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Frame origin.
    pub location: Ref<Point>,
    /// Local Z axis. Defaults to global Z when absent.
    pub axis: Option<Ref<Direction>>,
    /// Local X axis hint. Defaults to global X when absent.
    pub ref_direction: Option<Ref<Direction>>,
}

/// A curve carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    /// Infinite straight line through `point` along `vector`.
    Line {
        /// A point on the line.
        point: Ref<Point>,
        /// Line direction.
        vector: Ref<Vector>,
    },
    /// Full circle in the XY plane of `placement`.
    Circle {
        /// Centre and orientation of the circle.
        placement: Ref<Placement>,
        /// Radius in millimetres.
        radius: f64,
    },
}

/// A surface carried by a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    /// Plane through the placement origin, normal along the placement axis.
    Plane {
        /// Plane frame.
        placement: Ref<Placement>,
    },
    /// Circular cylinder about the placement axis.
    Cylinder {
        /// Cylinder frame; the axis is the cylinder axis.
        placement: Ref<Placement>,
        /// Radius in millimetres.
        radius: f64,
    },
}

/// A topological vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Vertex location.
    pub point: Ref<Point>,
}

/// A bounded piece of a curve between two vertices.
///
/// A full circle uses the same vertex for `start` and `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Start vertex.
    pub start: Ref<Vertex>,
    /// End vertex.
    pub end: Ref<Vertex>,
    /// Underlying curve.
    pub curve: Ref<Curve>,
    /// Whether the edge runs along the curve's own parametric direction.
    pub same_sense: bool,
}

/// An edge used inside a loop, possibly reversed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedEdge {
    /// The underlying edge.
    pub edge: Ref<Edge>,
    /// `true` traverses start → end.
    pub forward: bool,
}

/// A closed cycle of oriented edges.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLoop {
    /// Edges in traversal order.
    pub edges: Vec<Ref<OrientedEdge>>,
}

/// A loop bounding a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBound {
    /// The loop.
    pub edge_loop: Ref<EdgeLoop>,
    /// Outer boundary (`true`) or hole (`false`).
    pub outer: bool,
    /// Whether the loop is used in its own orientation.
    pub same_sense: bool,
}

/// A bounded portion of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Underlying surface.
    pub surface: Ref<Surface>,
    /// Bounds, exactly one of them outer.
    pub bounds: Vec<Ref<FaceBound>>,
    /// Whether the face normal agrees with the surface normal.
    pub same_sense: bool,
}

/// A closed set of faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Shell {
    /// Faces of the shell.
    pub faces: Vec<Ref<Face>>,
}

/// A manifold solid body.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    /// Body name.
    pub name: String,
    /// Bounding shell.
    pub shell: Ref<Shell>,
}

/// A STEP record this crate does not model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEntity {
    /// `KEYWORD(args)`.
    Simple {
        /// Entity type keyword, upper case.
        keyword: String,
        /// Unparsed argument list without the outer parentheses.
        args: String,
    },
    /// `( A(...) B(...) ... )` complex instance.
    Complex {
        /// Unparsed body without the outer parentheses.
        body: String,
    },
}

impl RawEntity {
    /// Creates a simple raw record.
    pub fn simple(keyword: impl Into<String>, args: impl Into<String>) -> Self {
        Self::Simple {
            keyword: keyword.into(),
            args: args.into(),
        }
    }

    /// Creates a complex raw record.
    pub fn complex(body: impl Into<String>) -> Self {
        Self::Complex { body: body.into() }
    }

    /// Returns the argument or body text.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Simple { args, .. } => args,
            Self::Complex { body } => body,
        }
    }

    /// Returns the keyword, or every top-level constituent keyword of a
    /// complex record.
    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        match self {
            Self::Simple { keyword, .. } => vec![keyword.as_str()],
            Self::Complex { body } => complex_keywords(body),
        }
    }

    fn text_mut(&mut self) -> &mut String {
        match self {
            Self::Simple { args, .. } => args,
            Self::Complex { body } => body,
        }
    }
}

/// Keywords at parenthesis depth 0 of a complex body, e.g.
/// `LENGTH_UNIT() NAMED_UNIT(*)` → `[LENGTH_UNIT, NAMED_UNIT]`.
fn complex_keywords(body: &str) -> Vec<&str> {
    let mut keywords = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start: Option<usize> = None;

    for (i, ch) in body.char_indices() {
        if in_string {
            if ch == '\'' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '\'' => in_string = true,
            '(' => {
                if depth == 0 {
                    if let Some(s) = start.take() {
                        keywords.push(body[s..i].trim());
                    }
                }
                depth += 1;
            }
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && (c.is_ascii_alphanumeric() || c == '_' || c == '-') => {
                if start.is_none() {
                    start = Some(i);
                }
            }
            _ => {
                if depth == 0 {
                    start = None;
                }
            }
        }
    }
    keywords
}

/// Any entity stored in a repository.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// `CARTESIAN_POINT`.
    Point(Point),
    /// `DIRECTION`.
    Direction(Direction),
    /// `VECTOR`.
    Vector(Vector),
    /// `AXIS2_PLACEMENT_3D`.
    Placement(Placement),
    /// `LINE` / `CIRCLE`.
    Curve(Curve),
    /// `PLANE` / `CYLINDRICAL_SURFACE`.
    Surface(Surface),
    /// `VERTEX_POINT`.
    Vertex(Vertex),
    /// `EDGE_CURVE`.
    Edge(Edge),
    /// `ORIENTED_EDGE`.
    OrientedEdge(OrientedEdge),
    /// `EDGE_LOOP`.
    EdgeLoop(EdgeLoop),
    /// `FACE_OUTER_BOUND` / `FACE_BOUND`.
    FaceBound(FaceBound),
    /// `ADVANCED_FACE`.
    Face(Face),
    /// `CLOSED_SHELL`.
    Shell(Shell),
    /// `MANIFOLD_SOLID_BREP`.
    Solid(Solid),
    /// Anything else.
    Raw(RawEntity),
}

impl Entity {
    /// Returns the STEP keywords this entity is written as.
    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        let keyword = match self {
            Self::Point(_) => "CARTESIAN_POINT",
            Self::Direction(_) => "DIRECTION",
            Self::Vector(_) => "VECTOR",
            Self::Placement(_) => "AXIS2_PLACEMENT_3D",
            Self::Curve(Curve::Line { .. }) => "LINE",
            Self::Curve(Curve::Circle { .. }) => "CIRCLE",
            Self::Surface(Surface::Plane { .. }) => "PLANE",
            Self::Surface(Surface::Cylinder { .. }) => "CYLINDRICAL_SURFACE",
            Self::Vertex(_) => "VERTEX_POINT",
            Self::Edge(_) => "EDGE_CURVE",
            Self::OrientedEdge(_) => "ORIENTED_EDGE",
            Self::EdgeLoop(_) => "EDGE_LOOP",
            Self::FaceBound(b) if b.outer => "FACE_OUTER_BOUND",
            Self::FaceBound(_) => "FACE_BOUND",
            Self::Face(_) => "ADVANCED_FACE",
            Self::Shell(_) => "CLOSED_SHELL",
            Self::Solid(_) => "MANIFOLD_SOLID_BREP",
            Self::Raw(raw) => return raw.keywords(),
        };
        vec![keyword]
    }

    /// Returns every entity id this entity refers to.
    #[must_use]
    pub fn references(&self) -> Vec<u64> {
        match self {
            Self::Point(_) | Self::Direction(_) => Vec::new(),
            Self::Vector(v) => vec![v.orientation.id()],
            Self::Placement(p) => std::iter::once(p.location.id())
                .chain(p.axis.map(Ref::id))
                .chain(p.ref_direction.map(Ref::id))
                .collect(),
            Self::Curve(Curve::Line { point, vector }) => vec![point.id(), vector.id()],
            Self::Curve(Curve::Circle { placement, .. })
            | Self::Surface(Surface::Plane { placement } | Surface::Cylinder { placement, .. }) => {
                vec![placement.id()]
            }
            Self::Vertex(v) => vec![v.point.id()],
            Self::Edge(e) => vec![e.start.id(), e.end.id(), e.curve.id()],
            Self::OrientedEdge(o) => vec![o.edge.id()],
            Self::EdgeLoop(l) => l.edges.iter().map(|r| r.id()).collect(),
            Self::FaceBound(b) => vec![b.edge_loop.id()],
            Self::Face(f) => f
                .bounds
                .iter()
                .map(|r| r.id())
                .chain(std::iter::once(f.surface.id()))
                .collect(),
            Self::Shell(s) => s.faces.iter().map(|r| r.id()).collect(),
            Self::Solid(s) => vec![s.shell.id()],
            Self::Raw(raw) => scan_refs(raw.text()),
        }
    }

    /// Rewrites every reference held by this entity through `remap`.
    pub fn remap_refs(&mut self, mut remap: impl FnMut(u64) -> u64) {
        let f = &mut remap;
        match self {
            Self::Point(_) | Self::Direction(_) => {}
            Self::Vector(v) => v.orientation.remap(f),
            Self::Placement(p) => {
                p.location.remap(f);
                if let Some(axis) = p.axis.as_mut() {
                    axis.remap(f);
                }
                if let Some(ref_direction) = p.ref_direction.as_mut() {
                    ref_direction.remap(f);
                }
            }
            Self::Curve(Curve::Line { point, vector }) => {
                point.remap(f);
                vector.remap(f);
            }
            Self::Curve(Curve::Circle { placement, .. })
            | Self::Surface(Surface::Plane { placement } | Surface::Cylinder { placement, .. }) => {
                placement.remap(f);
            }
            Self::Vertex(v) => v.point.remap(f),
            Self::Edge(e) => {
                e.start.remap(f);
                e.end.remap(f);
                e.curve.remap(f);
            }
            Self::OrientedEdge(o) => o.edge.remap(f),
            Self::EdgeLoop(l) => l.edges.iter_mut().for_each(|r| r.remap(f)),
            Self::FaceBound(b) => b.edge_loop.remap(f),
            Self::Face(face) => {
                face.bounds.iter_mut().for_each(|r| r.remap(f));
                face.surface.remap(f);
            }
            Self::Shell(s) => s.faces.iter_mut().for_each(|r| r.remap(f)),
            Self::Solid(s) => s.shell.remap(f),
            Self::Raw(raw) => {
                let text = raw.text_mut();
                *text = rewrite_refs(text, f);
            }
        }
    }
}

/// A modeled entity kind that can be stored and resolved through a typed
/// [`Ref`].
pub trait Kind: Sized {
    /// Wraps the value into an [`Entity`].
    fn into_entity(self) -> Entity;

    /// Borrows the value back out of an [`Entity`] of the matching kind.
    fn from_entity(entity: &Entity) -> Option<&Self>;
}

macro_rules! impl_kind {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Kind for $ty {
                fn into_entity(self) -> Entity {
                    Entity::$ty(self)
                }

                fn from_entity(entity: &Entity) -> Option<&Self> {
                    match entity {
                        Entity::$ty(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_kind!(
    Point,
    Direction,
    Vector,
    Placement,
    Curve,
    Surface,
    Vertex,
    Edge,
    OrientedEdge,
    EdgeLoop,
    FaceBound,
    Face,
    Shell,
    Solid,
);

impl Kind for RawEntity {
    fn into_entity(self) -> Entity {
        Entity::Raw(self)
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Raw(raw) => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complex_keywords_are_top_level_only() {
        let raw = RawEntity::complex("LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.)");
        assert_eq!(raw.keywords(), vec!["LENGTH_UNIT", "NAMED_UNIT", "SI_UNIT"]);
    }

    #[test]
    fn complex_keywords_skip_nested_typed_values() {
        let raw = RawEntity::complex(
            "GEOMETRIC_REPRESENTATION_CONTEXT(3) GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#4)) \
             REPRESENTATION_CONTEXT('a (b)','c')",
        );
        assert_eq!(
            raw.keywords(),
            vec![
                "GEOMETRIC_REPRESENTATION_CONTEXT",
                "GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT",
                "REPRESENTATION_CONTEXT"
            ]
        );
    }

    #[test]
    fn references_cover_typed_and_raw() {
        let face = Entity::Face(Face {
            surface: Ref::new(9),
            bounds: vec![Ref::new(3), Ref::new(4)],
            same_sense: true,
        });
        assert_eq!(face.references(), vec![3, 4, 9]);

        let raw = Entity::Raw(RawEntity::simple("STYLED_ITEM", "'color',(#5),#6"));
        assert_eq!(raw.references(), vec![5, 6]);
    }

    #[test]
    fn optional_placement_refs() {
        let placement = Entity::Placement(Placement {
            location: Ref::new(1),
            axis: None,
            ref_direction: Some(Ref::new(3)),
        });
        assert_eq!(placement.references(), vec![1, 3]);
    }

    #[test]
    fn remap_rewrites_every_reference() {
        let mut edge = Entity::Edge(Edge {
            start: Ref::new(1),
            end: Ref::new(2),
            curve: Ref::new(3),
            same_sense: true,
        });
        edge.remap_refs(|id| id * 10);
        assert_eq!(edge.references(), vec![10, 20, 30]);

        let mut raw = Entity::Raw(RawEntity::simple("PCURVE", "'',#7,#8"));
        raw.remap_refs(|id| id + 1);
        assert_eq!(raw.references(), vec![8, 9]);
    }

    #[test]
    fn face_bound_keyword_depends_on_outer_flag() {
        let outer = Entity::FaceBound(FaceBound {
            edge_loop: Ref::new(1),
            outer: true,
            same_sense: true,
        });
        let inner = Entity::FaceBound(FaceBound {
            edge_loop: Ref::new(1),
            outer: false,
            same_sense: true,
        });
        assert_eq!(outer.keywords(), vec!["FACE_OUTER_BOUND"]);
        assert_eq!(inner.keywords(), vec!["FACE_BOUND"]);
    }
}
