//! Triangle-mesh fallback for components without a STEP model.
//!
//! Each triangle becomes one planar face. Vertices and edges are shared
//! between neighbouring triangles, so a closed mesh yields a closed shell.

use std::collections::HashMap;

use glam::DVec3;
use thiserror::Error;

use crate::circuit::{BoardLayer, CadComponent, PcbComponent};
use crate::geometry::{add_edge, add_face, add_line, add_plane, add_vertex, safe_unit, RigidTransform};
use crate::merge::BoardFrame;
use crate::step::{Edge, Ref, Repository, Shell, Solid, Vertex};

/// Mesh conversion errors. Recovered as geometry warnings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The mesh has no triangles.
    #[error("Mesh has no triangles")]
    Empty,

    /// A triangle refers to a vertex that does not exist.
    #[error("Triangle {triangle} refers to missing vertex {index}")]
    IndexOutOfRange {
        /// Triangle position.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
    },

    /// A triangle has (nearly) zero area.
    #[error("Triangle {triangle} is degenerate")]
    Degenerate {
        /// Triangle position.
        triangle: usize,
    },

    /// Some edge is not shared by exactly two triangles in opposite
    /// directions.
    #[error("Mesh is not closed: edge {a}-{b} is used {count} time(s) in that direction")]
    NotClosed {
        /// Edge start vertex.
        a: u32,
        /// Edge end vertex.
        b: u32,
        /// Uses in the a → b direction.
        count: usize,
    },
}

/// An indexed triangle mesh with counter-clockwise (outward) winding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions in mm.
    pub positions: Vec<DVec3>,
    /// Vertex indices, three per triangle.
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Axis-aligned box between `min` and `max`.
    #[must_use]
    pub fn cuboid(min: DVec3, max: DVec3) -> Self {
        let positions = (0..8)
            .map(|i| {
                DVec3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect();
        let triangles = vec![
            [0, 2, 3],
            [0, 3, 1],
            [4, 5, 7],
            [4, 7, 6],
            [0, 1, 5],
            [0, 5, 4],
            [2, 6, 7],
            [2, 7, 3],
            [0, 4, 6],
            [0, 6, 2],
            [1, 3, 7],
            [1, 7, 5],
        ];
        Self {
            positions,
            triangles,
        }
    }

    /// Returns a copy with every position mapped through `transform`.
    #[must_use]
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            positions: self
                .positions
                .iter()
                .map(|p| transform.apply_point(*p))
                .collect(),
            triangles: self.triangles.clone(),
        }
    }

    fn validate(&self) -> Result<(), MeshError> {
        if self.triangles.is_empty() {
            return Err(MeshError::Empty);
        }

        let mut directed: HashMap<(u32, u32), usize> = HashMap::new();
        for (triangle, corners) in self.triangles.iter().enumerate() {
            let mut points = [DVec3::ZERO; 3];
            for (slot, &index) in corners.iter().enumerate() {
                points[slot] = *self
                    .positions
                    .get(index as usize)
                    .ok_or(MeshError::IndexOutOfRange { triangle, index })?;
            }
            let area = (points[1] - points[0]).cross(points[2] - points[0]).length();
            if area <= f64::EPSILON {
                return Err(MeshError::Degenerate { triangle });
            }
            for k in 0..3 {
                *directed
                    .entry((corners[k], corners[(k + 1) % 3]))
                    .or_default() += 1;
            }
        }

        for (&(a, b), &count) in &directed {
            if count != 1 || directed.get(&(b, a)) != Some(&1) {
                return Err(MeshError::NotClosed { a, b, count });
            }
        }
        Ok(())
    }
}

/// Builds a closed faceted solid from `mesh`.
///
/// # Errors
///
/// Returns a [`MeshError`] if the mesh is empty, has bad indices or
/// degenerate triangles, or is not closed. Nothing is written to `repo`
/// in that case.
pub fn mesh_to_solid(
    repo: &mut Repository,
    mesh: &TriangleMesh,
    name: &str,
) -> Result<Ref<Solid>, MeshError> {
    mesh.validate()?;

    let mut vertices: HashMap<u32, Ref<Vertex>> = HashMap::new();
    let mut edges: HashMap<(u32, u32), Ref<Edge>> = HashMap::new();
    let mut faces = Vec::with_capacity(mesh.triangles.len());

    for corners in &mesh.triangles {
        let points = corners.map(|i| mesh.positions[i as usize]);
        let mut loop_edges = Vec::with_capacity(3);

        for k in 0..3 {
            let (a, b) = (corners[k], corners[(k + 1) % 3]);
            let key = (a.min(b), a.max(b));
            let edge = if let Some(edge) = edges.get(&key) {
                *edge
            } else {
                let start = *vertices
                    .entry(key.0)
                    .or_insert_with(|| add_vertex(repo, mesh.positions[key.0 as usize]));
                let end = *vertices
                    .entry(key.1)
                    .or_insert_with(|| add_vertex(repo, mesh.positions[key.1 as usize]));
                let line = add_line(
                    repo,
                    mesh.positions[key.0 as usize],
                    mesh.positions[key.1 as usize],
                );
                let edge = add_edge(repo, start, end, line);
                edges.insert(key, edge);
                edge
            };
            loop_edges.push((edge, a == key.0));
        }

        let normal = (points[1] - points[0]).cross(points[2] - points[0]);
        let plane = add_plane(repo, points[0], normal, safe_unit(points[1] - points[0]));
        faces.push(add_face(repo, plane, &loop_edges, &[], true));
    }

    let shell = repo.add(Shell { faces });
    Ok(repo.add(Solid {
        name: name.to_string(),
        shell,
    }))
}

/// Placed bounding box of a footprint.
///
/// The footprint size comes from the CAD record's `size` when present,
/// otherwise from the footprint's width and height with `default_height`
/// as its height. Top-side boxes sit on the board's top surface; bottom-side
/// boxes hang below `z = 0`.
#[must_use]
pub fn component_box(
    component: &PcbComponent,
    cad: Option<&CadComponent>,
    frame: &BoardFrame,
    default_height: f64,
) -> TriangleMesh {
    let size = cad.and_then(|c| c.size).map_or_else(
        || DVec3::new(component.width, component.height, default_height),
        DVec3::from,
    );
    let layer = cad.and_then(|c| c.layer).unwrap_or(component.layer);
    let (bottom, top) = match layer {
        BoardLayer::Top => (frame.thickness, frame.thickness + size.z),
        BoardLayer::Bottom => (-size.z, 0.0),
    };

    let half = DVec3::new(size.x / 2.0, size.y / 2.0, 0.0);
    let local = TriangleMesh::cuboid(
        DVec3::new(-half.x, -half.y, bottom),
        DVec3::new(half.x, half.y, top),
    );
    let placement = RigidTransform::new(
        DVec3::new(0.0, 0.0, component.rotation),
        DVec3::new(component.center.x, component.center.y, 0.0),
    );
    local.transformed(&placement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Point2;
    use crate::step::Entity;

    fn footprint(width: f64, height: f64, layer: BoardLayer) -> PcbComponent {
        PcbComponent {
            pcb_component_id: "pc1".to_string(),
            center: Point2 { x: 5.0, y: 5.0 },
            width,
            height,
            rotation: 90.0,
            layer,
        }
    }

    #[test]
    fn cuboid_is_closed_and_outward() {
        let mesh = TriangleMesh::cuboid(DVec3::ZERO, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.validate(), Ok(()));

        let center = DVec3::new(0.5, 1.0, 1.5);
        for t in &mesh.triangles {
            let [a, b, c] = t.map(|i| mesh.positions[i as usize]);
            let normal = (b - a).cross(c - a);
            assert!(normal.dot(a - center) > 0.0, "triangle {t:?} faces inward");
        }
    }

    #[test]
    fn cuboid_solid_shares_vertices_and_edges() {
        let mut repo = Repository::new();
        let mesh = TriangleMesh::cuboid(DVec3::ZERO, DVec3::ONE);
        let solid = mesh_to_solid(&mut repo, &mesh, "box").unwrap();

        let count = |pred: fn(&Entity) -> bool| repo.iter().filter(|(_, e)| pred(e)).count();
        assert_eq!(count(|e| matches!(e, Entity::Vertex(_))), 8);
        assert_eq!(count(|e| matches!(e, Entity::Edge(_))), 18);
        assert_eq!(count(|e| matches!(e, Entity::Face(_))), 12);

        let shell = repo.get(repo.get(solid).unwrap().shell).unwrap();
        assert_eq!(shell.faces.len(), 12);
    }

    #[test]
    fn rejects_open_and_broken_meshes() {
        let mut repo = Repository::new();
        assert_eq!(
            mesh_to_solid(&mut repo, &TriangleMesh::default(), "x"),
            Err(MeshError::Empty)
        );

        let mut open = TriangleMesh::cuboid(DVec3::ZERO, DVec3::ONE);
        open.triangles.pop();
        assert!(matches!(
            mesh_to_solid(&mut repo, &open, "x"),
            Err(MeshError::NotClosed { .. })
        ));

        let mut bad = TriangleMesh::cuboid(DVec3::ZERO, DVec3::ONE);
        bad.triangles[3] = [0, 1, 42];
        assert_eq!(
            mesh_to_solid(&mut repo, &bad, "x"),
            Err(MeshError::IndexOutOfRange {
                triangle: 3,
                index: 42
            })
        );

        let flat = TriangleMesh::cuboid(DVec3::ZERO, DVec3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            mesh_to_solid(&mut repo, &flat, "x"),
            Err(MeshError::Degenerate { .. })
        ));

        assert!(repo.is_empty());
    }

    #[test]
    fn top_box_sits_on_the_board() {
        let frame = BoardFrame { thickness: 1.6 };
        let mesh = component_box(&footprint(4.0, 2.0, BoardLayer::Top), None, &frame, 1.0);
        let min_z = mesh.positions.iter().map(|p| p.z).fold(f64::MAX, f64::min);
        let max_z = mesh.positions.iter().map(|p| p.z).fold(f64::MIN, f64::max);
        assert!((min_z - 1.6).abs() < 1e-12);
        assert!((max_z - 2.6).abs() < 1e-12);

        // Rotated 90°: the 4 mm side now runs along Y.
        let max_y = mesh.positions.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        assert!((max_y - 7.0).abs() < 1e-9);
    }

    #[test]
    fn bottom_box_hangs_below() {
        let frame = BoardFrame { thickness: 1.6 };
        let mesh = component_box(&footprint(1.0, 1.0, BoardLayer::Bottom), None, &frame, 0.5);
        let max_z = mesh.positions.iter().map(|p| p.z).fold(f64::MIN, f64::max);
        let min_z = mesh.positions.iter().map(|p| p.z).fold(f64::MAX, f64::min);
        assert!(max_z.abs() < 1e-12);
        assert!((min_z + 0.5).abs() < 1e-12);
    }
}
