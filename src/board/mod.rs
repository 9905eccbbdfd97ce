//! Board solid builder.
//!
//! Produces one closed `MANIFOLD_SOLID_BREP` for a board: a prism over a
//! counter-clockwise outline with circular and pill through-holes.
//!
//! Face layout:
//!
//! - bottom face (`z = 0`, normal −Z) with one inner bound per hole
//! - top face (`z = thickness`, normal +Z) with one inner bound per hole
//! - one planar side face per outline edge
//! - hole walls: one cylinder per round hole, two cylinders and two planes
//!   per pill
//!
//! Every edge is shared by exactly two faces, traversed in opposite
//! directions.

pub mod holes;

use glam::{DVec2, DVec3};
use thiserror::Error;

use crate::geometry::{add_edge, add_face, add_line, add_plane, add_vertex, safe_unit, LoopEdge};
use crate::step::{Edge, Face, Ref, Repository, Shell, Solid, Vertex};

pub use holes::{hole_boundary, HoleTopology, Segment};

/// A through-hole, in board millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hole {
    /// Round drill.
    Circle {
        /// Centre X.
        x: f64,
        /// Centre Y.
        y: f64,
        /// Diameter.
        diameter: f64,
    },
    /// Slot with semicircular ends.
    Pill {
        /// Centre X.
        x: f64,
        /// Centre Y.
        y: f64,
        /// Extent along X before rotation.
        width: f64,
        /// Extent along Y before rotation.
        height: f64,
        /// Counter-clockwise rotation about the centre, in degrees.
        rotation_degrees: f64,
    },
}

impl Hole {
    /// Returns `true` if every dimension is finite and positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Circle { x, y, diameter } => {
                x.is_finite() && y.is_finite() && diameter.is_finite() && diameter > 0.0
            }
            Self::Pill {
                x,
                y,
                width,
                height,
                rotation_degrees,
            } => {
                x.is_finite()
                    && y.is_finite()
                    && rotation_degrees.is_finite()
                    && width.is_finite()
                    && height.is_finite()
                    && width > 0.0
                    && height > 0.0
            }
        }
    }
}

/// Board geometry errors. These abort the conversion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoardError {
    /// The outline has fewer than three distinct points.
    #[error("Board outline needs at least 3 points, got {count}")]
    TooFewOutlinePoints {
        /// Number of usable points.
        count: usize,
    },

    /// Thickness is not a positive finite number.
    #[error("Invalid board thickness: {thickness}")]
    InvalidThickness {
        /// The rejected value.
        thickness: f64,
    },

    /// A hole has a non-positive or non-finite dimension.
    #[error("Invalid hole #{index}: {hole:?}")]
    InvalidHole {
        /// Position in the hole list.
        index: usize,
        /// The rejected hole.
        hole: Hole,
    },

    /// An outline coordinate is NaN or infinite.
    #[error("Board outline point {index} is not finite")]
    NonFiniteOutline {
        /// Position in the outline.
        index: usize,
    },
}

/// Everything needed to build a board solid.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSpec {
    /// Outline polygon in board millimetres.
    pub outline: Vec<DVec2>,
    /// Board thickness in mm.
    pub thickness: f64,
    /// Through-holes.
    pub holes: Vec<Hole>,
}

impl BoardSpec {
    /// A `width` × `height` rectangle centred on `center`.
    #[must_use]
    pub fn rectangle(width: f64, height: f64, center: DVec2, thickness: f64) -> Self {
        let half = DVec2::new(width / 2.0, height / 2.0);
        Self {
            outline: vec![
                center + DVec2::new(-half.x, -half.y),
                center + DVec2::new(half.x, -half.y),
                center + DVec2::new(half.x, half.y),
                center + DVec2::new(-half.x, half.y),
            ],
            thickness,
            holes: Vec::new(),
        }
    }

    /// A board with an explicit outline.
    #[must_use]
    pub const fn with_outline(outline: Vec<DVec2>, thickness: f64) -> Self {
        Self {
            outline,
            thickness,
            holes: Vec::new(),
        }
    }

    /// Replaces the hole list.
    #[must_use]
    pub fn with_holes(mut self, holes: Vec<Hole>) -> Self {
        self.holes = holes;
        self
    }

    /// Checks thickness and holes and returns the outline ready for
    /// building: closing duplicate dropped, wound counter-clockwise.
    ///
    /// # Errors
    ///
    /// Returns a [`BoardError`] describing the first problem found.
    pub fn normalized_outline(&self) -> Result<Vec<DVec2>, BoardError> {
        if !self.thickness.is_finite() || self.thickness <= 0.0 {
            return Err(BoardError::InvalidThickness {
                thickness: self.thickness,
            });
        }
        if let Some(index) = self.outline.iter().position(|p| !p.is_finite()) {
            return Err(BoardError::NonFiniteOutline { index });
        }
        if let Some((index, hole)) = self.holes.iter().enumerate().find(|(_, h)| !h.is_valid()) {
            return Err(BoardError::InvalidHole { index, hole: *hole });
        }

        let mut outline = self.outline.clone();
        if outline.len() > 1 && outline.first() == outline.last() {
            outline.pop();
        }
        if outline.len() < 3 {
            return Err(BoardError::TooFewOutlinePoints {
                count: outline.len(),
            });
        }
        if signed_area(&outline) < 0.0 {
            tracing::debug!("Board outline is clockwise, reversing");
            outline.reverse();
        }
        Ok(outline)
    }
}

/// Twice the signed polygon area; positive for counter-clockwise.
fn signed_area(points: &[DVec2]) -> f64 {
    (0..points.len())
        .map(|i| points[i].perp_dot(points[(i + 1) % points.len()]))
        .sum()
}

/// Builds the board solid into `repo` and returns it.
///
/// # Errors
///
/// Returns a [`BoardError`] if the outline, thickness or a hole is invalid.
/// Nothing is written to `repo` in that case.
pub fn build_board_solid(
    repo: &mut Repository,
    spec: &BoardSpec,
    name: &str,
) -> Result<Ref<Solid>, BoardError> {
    let outline = spec.normalized_outline()?;
    let thickness = spec.thickness;

    let (bottom_vertices, bottom) = outline_ring(repo, &outline, 0.0);
    let (top_vertices, top) = outline_ring(repo, &outline, thickness);
    let verticals: Vec<Ref<Edge>> = outline
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let line = add_line(repo, p.extend(0.0), p.extend(thickness));
            add_edge(repo, bottom_vertices[i], top_vertices[i], line)
        })
        .collect();

    let hole_topologies: Vec<HoleTopology> = spec
        .holes
        .iter()
        .map(|hole| holes::build_hole(repo, hole, thickness))
        .collect();

    let origin = outline[0];
    let mut faces: Vec<Ref<Face>> = Vec::new();

    let bottom_outer: Vec<LoopEdge> = bottom.iter().rev().map(|&e| (e, false)).collect();
    let bottom_inner: Vec<Vec<LoopEdge>> =
        hole_topologies.iter().map(HoleTopology::bottom_loop).collect();
    let bottom_plane = add_plane(repo, origin.extend(0.0), DVec3::NEG_Z, DVec3::X);
    faces.push(add_face(repo, bottom_plane, &bottom_outer, &bottom_inner, true));

    let top_outer: Vec<LoopEdge> = top.iter().map(|&e| (e, true)).collect();
    let top_inner: Vec<Vec<LoopEdge>> =
        hole_topologies.iter().map(HoleTopology::top_loop).collect();
    let top_plane = add_plane(repo, origin.extend(thickness), DVec3::Z, DVec3::X);
    faces.push(add_face(repo, top_plane, &top_outer, &top_inner, true));

    let count = outline.len();
    for i in 0..count {
        let j = (i + 1) % count;
        let along = safe_unit((outline[j] - outline[i]).extend(0.0));
        let outward = DVec3::new(along.y, -along.x, 0.0);
        let plane = add_plane(repo, outline[i].extend(0.0), outward, along);
        let edges = [
            (bottom[i], true),
            (verticals[j], true),
            (top[i], false),
            (verticals[i], false),
        ];
        faces.push(add_face(repo, plane, &edges, &[], true));
    }

    for topology in &hole_topologies {
        faces.extend_from_slice(&topology.walls);
    }

    tracing::debug!(
        faces = faces.len(),
        holes = spec.holes.len(),
        "Built board shell"
    );

    let shell = repo.add(Shell { faces });
    Ok(repo.add(Solid {
        name: name.to_string(),
        shell,
    }))
}

/// One vertex and one line edge per outline point at height `z`.
fn outline_ring(
    repo: &mut Repository,
    outline: &[DVec2],
    z: f64,
) -> (Vec<Ref<Vertex>>, Vec<Ref<Edge>>) {
    let vertices: Vec<Ref<Vertex>> = outline
        .iter()
        .map(|p| add_vertex(repo, p.extend(z)))
        .collect();
    let count = outline.len();
    let edges = (0..count)
        .map(|i| {
            let j = (i + 1) % count;
            let line = add_line(repo, outline[i].extend(z), outline[j].extend(z));
            add_edge(repo, vertices[i], vertices[j], line)
        })
        .collect();
    (vertices, edges)
}
