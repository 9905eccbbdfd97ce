//! Circuit description records.
//!
//! The converter consumes a flat JSON array of tagged records. Only the
//! handful of fields needed for the 3-D model are read; any other record
//! type is accepted and ignored.
//!
//! ```json
//! [
//!   { "type": "pcb_board", "width": 20, "height": 15, "thickness": 1.6 },
//!   { "type": "pcb_hole", "hole_shape": "circle", "x": 2.5, "y": 2.5, "hole_diameter": 3.2 },
//!   { "type": "pcb_component", "pcb_component_id": "pc1",
//!     "center": { "x": 0, "y": 0 }, "width": 2, "height": 1 },
//!   { "type": "cad_component", "cad_component_id": "cad1", "pcb_component_id": "pc1",
//!     "position": { "x": 0, "y": 0, "z": 1.6 }, "model_step_url": "models/r0603.step" }
//! ]
//! ```

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::board::Hole;

/// A 2-D point in board millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// X position in mm.
    pub x: f64,
    /// Y position in mm.
    pub y: f64,
}

impl From<Point2> for DVec2 {
    fn from(p: Point2) -> Self {
        Self::new(p.x, p.y)
    }
}

/// A 3-D point or rotation triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    /// X component.
    #[serde(default)]
    pub x: f64,
    /// Y component.
    #[serde(default)]
    pub y: f64,
    /// Z component.
    #[serde(default)]
    pub z: f64,
}

impl From<Point3> for DVec3 {
    fn from(p: Point3) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

/// Board side a component is mounted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardLayer {
    /// Top copper side (z = thickness).
    #[default]
    Top,
    /// Bottom copper side (z = 0).
    Bottom,
}

/// One record of a circuit description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CircuitRecord {
    /// Board outline and stack-up.
    PcbBoard(PcbBoard),
    /// Unplated drill.
    PcbHole(HoleGeometry),
    /// Plated drill; only the drill geometry is used.
    PcbPlatedHole(PlatedHole),
    /// Placed footprint.
    PcbComponent(PcbComponent),
    /// 3-D pose and model of a component.
    CadComponent(CadComponent),
    /// Any record type the converter does not read.
    #[serde(other)]
    Other,
}

/// Board dimensions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PcbBoard {
    /// Width in mm (used when no outline is given).
    #[serde(default)]
    pub width: Option<f64>,
    /// Height in mm (used when no outline is given).
    #[serde(default)]
    pub height: Option<f64>,
    /// Board centre (used when no outline is given).
    #[serde(default)]
    pub center: Option<Point2>,
    /// Board thickness in mm.
    #[serde(default)]
    pub thickness: Option<f64>,
    /// Explicit counter-clockwise outline.
    #[serde(default)]
    pub outline: Option<Vec<Point2>>,
}

/// Drill geometry, tagged by `hole_shape`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "hole_shape", rename_all = "snake_case")]
pub enum HoleGeometry {
    /// Round drill.
    Circle {
        /// Centre X in mm.
        x: f64,
        /// Centre Y in mm.
        y: f64,
        /// Drill diameter in mm.
        hole_diameter: f64,
    },
    /// Slot with semicircular ends.
    #[serde(alias = "oval")]
    Pill {
        /// Centre X in mm.
        x: f64,
        /// Centre Y in mm.
        y: f64,
        /// Extent along X before rotation, in mm.
        hole_width: f64,
        /// Extent along Y before rotation, in mm.
        hole_height: f64,
        /// Counter-clockwise rotation in degrees.
        #[serde(default)]
        ccw_rotation: f64,
    },
    /// A hole shape the board builder does not cut.
    #[serde(other)]
    Unsupported,
}

impl HoleGeometry {
    /// Converts to a board hole, or `None` for unsupported shapes.
    #[must_use]
    pub const fn to_hole(&self) -> Option<Hole> {
        match *self {
            Self::Circle {
                x,
                y,
                hole_diameter,
            } => Some(Hole::Circle {
                x,
                y,
                diameter: hole_diameter,
            }),
            Self::Pill {
                x,
                y,
                hole_width,
                hole_height,
                ccw_rotation,
            } => Some(Hole::Pill {
                x,
                y,
                width: hole_width,
                height: hole_height,
                rotation_degrees: ccw_rotation,
            }),
            Self::Unsupported => None,
        }
    }
}

/// Plated drill as written by circuit tools.
///
/// The record is tagged by pad `shape` (`circle`, `oval`, `pill` or a
/// `*_hole_with_rect_pad` variant), with the drill in `hole_shape` for the
/// rect-pad variants. Older files tag the drill directly with `hole_shape`.
/// Fields are all optional so one unreadable hole never rejects the whole
/// circuit; [`PlatedHole::drill`] reports it as unsupported instead.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlatedHole {
    /// Pad shape tag.
    #[serde(default)]
    pub shape: Option<String>,
    /// Drill shape of rect-pad variants and older records.
    #[serde(default)]
    pub hole_shape: Option<String>,
    /// Centre X in mm.
    #[serde(default)]
    pub x: Option<f64>,
    /// Centre Y in mm.
    #[serde(default)]
    pub y: Option<f64>,
    /// Round drill diameter in mm.
    #[serde(default)]
    pub hole_diameter: Option<f64>,
    /// Slot extent along X before rotation, in mm.
    #[serde(default)]
    pub hole_width: Option<f64>,
    /// Slot extent along Y before rotation, in mm.
    #[serde(default)]
    pub hole_height: Option<f64>,
    /// Counter-clockwise rotation of the pad in degrees.
    #[serde(default)]
    pub ccw_rotation: Option<f64>,
    /// Counter-clockwise rotation of the drill alone in degrees.
    #[serde(default)]
    pub hole_ccw_rotation: Option<f64>,
}

impl PlatedHole {
    /// Resolves the drill geometry, or [`HoleGeometry::Unsupported`] when the
    /// shape is unknown or a required dimension is missing.
    #[must_use]
    pub fn drill(&self) -> HoleGeometry {
        let drill_shape = match self.shape.as_deref() {
            Some(pad) if pad.ends_with("_with_rect_pad") => self
                .hole_shape
                .as_deref()
                .or_else(|| pad.split('_').next()),
            Some(pad) => Some(pad),
            None => self.hole_shape.as_deref(),
        };
        let (Some(x), Some(y)) = (self.x, self.y) else {
            return HoleGeometry::Unsupported;
        };

        match (drill_shape, self.hole_diameter, self.hole_width, self.hole_height) {
            (Some("circle" | "circular"), Some(hole_diameter), _, _) => HoleGeometry::Circle {
                x,
                y,
                hole_diameter,
            },
            (Some("pill" | "oval" | "rotated"), _, Some(hole_width), Some(hole_height)) => {
                HoleGeometry::Pill {
                    x,
                    y,
                    hole_width,
                    hole_height,
                    ccw_rotation: self
                        .hole_ccw_rotation
                        .or(self.ccw_rotation)
                        .unwrap_or_default(),
                }
            }
            _ => HoleGeometry::Unsupported,
        }
    }
}

/// A placed footprint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PcbComponent {
    /// Footprint id.
    pub pcb_component_id: String,
    /// Footprint centre.
    pub center: Point2,
    /// Footprint width in mm.
    #[serde(default)]
    pub width: f64,
    /// Footprint height in mm.
    #[serde(default)]
    pub height: f64,
    /// Rotation about Z in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Mounting side.
    #[serde(default)]
    pub layer: BoardLayer,
}

/// 3-D pose and optional external model of a component.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CadComponent {
    /// CAD component id.
    pub cad_component_id: String,
    /// The footprint this model belongs to.
    #[serde(default)]
    pub pcb_component_id: Option<String>,
    /// Model origin in board millimetres.
    #[serde(default)]
    pub position: Point3,
    /// Euler rotation in degrees (X, then Y, then Z).
    #[serde(default)]
    pub rotation: Point3,
    /// URL or path of a STEP model.
    #[serde(default, alias = "model_step_path")]
    pub model_step_url: Option<String>,
    /// Multiplier converting model units to millimetres.
    #[serde(default)]
    pub model_unit_to_mm_scale_factor: Option<f64>,
    /// Board side; enables automatic seating on that side.
    #[serde(default)]
    pub layer: Option<BoardLayer>,
    /// Extra Z offset from the seated surface, in mm.
    #[serde(default)]
    pub z_offset: f64,
    /// Bounding size of the component body, in mm.
    #[serde(default)]
    pub size: Option<Point3>,
}

/// Parses a JSON circuit description.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or a known record type is
/// missing required fields.
pub fn parse_circuit_json(text: &str) -> Result<Vec<CircuitRecord>, serde_json::Error> {
    serde_json::from_str(text)
}

/// Returns the first board record.
#[must_use]
pub fn find_board(records: &[CircuitRecord]) -> Option<&PcbBoard> {
    records.iter().find_map(|r| match r {
        CircuitRecord::PcbBoard(board) => Some(board),
        _ => None,
    })
}

/// Returns the drill geometry of every hole record (plated and unplated)
/// in input order.
#[must_use]
pub fn holes(records: &[CircuitRecord]) -> Vec<HoleGeometry> {
    records
        .iter()
        .filter_map(|r| match r {
            CircuitRecord::PcbHole(h) => Some(h.clone()),
            CircuitRecord::PcbPlatedHole(h) => Some(h.drill()),
            _ => None,
        })
        .collect()
}

/// Returns every footprint record in input order.
#[must_use]
pub fn pcb_components(records: &[CircuitRecord]) -> Vec<&PcbComponent> {
    records
        .iter()
        .filter_map(|r| match r {
            CircuitRecord::PcbComponent(c) => Some(c),
            _ => None,
        })
        .collect()
}

/// Returns every CAD component record in input order.
#[must_use]
pub fn cad_components(records: &[CircuitRecord]) -> Vec<&CadComponent> {
    records
        .iter()
        .filter_map(|r| match r {
            CircuitRecord::CadComponent(c) => Some(c),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mixed_records() {
        let json = r#"[
            { "type": "source_component", "name": "R1" },
            { "type": "pcb_board", "width": 20, "height": 15, "thickness": 1.6 },
            { "type": "pcb_hole", "hole_shape": "circle", "x": 2.5, "y": 2.5, "hole_diameter": 3.2 },
            { "type": "pcb_plated_hole", "hole_shape": "oval", "x": 0, "y": 0,
              "hole_width": 2, "hole_height": 1, "outer_width": 3, "outer_height": 2 },
            { "type": "pcb_plated_hole", "hole_shape": "circular_hole_with_rect_pad", "x": 1, "y": 1 },
            { "type": "pcb_component", "pcb_component_id": "pc1",
              "center": { "x": 1, "y": 2 }, "width": 3, "height": 4, "layer": "bottom" },
            { "type": "cad_component", "cad_component_id": "cad1", "pcb_component_id": "pc1",
              "position": { "x": 1, "y": 2, "z": 0 }, "model_step_url": "part.step" }
        ]"#;

        let records = parse_circuit_json(json).unwrap();
        assert_eq!(records.len(), 7);
        assert_eq!(records[0], CircuitRecord::Other);

        let board = find_board(&records).unwrap();
        assert_eq!(board.width, Some(20.0));
        assert_eq!(board.thickness, Some(1.6));

        let holes = holes(&records);
        assert_eq!(holes.len(), 3);
        assert!(matches!(
            holes[0].to_hole(),
            Some(Hole::Circle { diameter, .. }) if (diameter - 3.2).abs() < 1e-12
        ));
        assert!(matches!(holes[1].to_hole(), Some(Hole::Pill { .. })));
        assert!(holes[2].to_hole().is_none());

        let pcb = pcb_components(&records);
        assert_eq!(pcb[0].layer, BoardLayer::Bottom);

        let cad = cad_components(&records);
        assert_eq!(cad[0].model_step_url.as_deref(), Some("part.step"));
        assert_eq!(cad[0].rotation, Point3::default());
        assert_eq!(cad[0].layer, None);
    }

    #[test]
    fn plated_holes_tagged_by_pad_shape() {
        let json = r#"[
            { "type": "pcb_plated_hole", "shape": "circle", "x": 1, "y": 1,
              "hole_diameter": 1, "outer_diameter": 2, "layers": ["top", "bottom"] },
            { "type": "pcb_plated_hole", "shape": "pill", "x": 0, "y": 0,
              "hole_width": 3, "hole_height": 1, "outer_width": 4, "outer_height": 2,
              "ccw_rotation": 90 },
            { "type": "pcb_plated_hole", "shape": "circular_hole_with_rect_pad",
              "hole_shape": "circle", "x": 2, "y": 3, "hole_diameter": 0.8,
              "rect_pad_width": 1.5, "rect_pad_height": 1.5 },
            { "type": "pcb_plated_hole", "shape": "rotated_pill_hole_with_rect_pad",
              "hole_shape": "pill", "x": 0, "y": 0, "hole_width": 2, "hole_height": 1,
              "hole_ccw_rotation": 45, "rect_pad_width": 3, "rect_pad_height": 2 },
            { "type": "pcb_plated_hole", "shape": "hexagon", "x": 0, "y": 0 },
            { "type": "pcb_plated_hole", "x": 0, "y": 0 }
        ]"#;

        let records = parse_circuit_json(json).unwrap();
        let holes = holes(&records);
        assert_eq!(holes.len(), 6);
        assert_eq!(
            holes[0].to_hole(),
            Some(Hole::Circle {
                x: 1.0,
                y: 1.0,
                diameter: 1.0
            })
        );
        assert!(matches!(
            holes[1].to_hole(),
            Some(Hole::Pill { rotation_degrees, .. }) if (rotation_degrees - 90.0).abs() < 1e-12
        ));
        assert!(matches!(
            holes[2].to_hole(),
            Some(Hole::Circle { diameter, .. }) if (diameter - 0.8).abs() < 1e-12
        ));
        assert!(matches!(
            holes[3].to_hole(),
            Some(Hole::Pill { rotation_degrees, .. }) if (rotation_degrees - 45.0).abs() < 1e-12
        ));
        assert!(holes[4].to_hole().is_none());
        assert!(holes[5].to_hole().is_none());
    }

    #[test]
    fn pill_rotation_defaults_to_zero() {
        let json = r#"[{ "type": "pcb_hole", "hole_shape": "pill", "x": 0, "y": 0,
                         "hole_width": 3, "hole_height": 1 }]"#;
        let records = parse_circuit_json(json).unwrap();
        let Some(Hole::Pill {
            rotation_degrees, ..
        }) = holes(&records)[0].to_hole()
        else {
            panic!("expected pill");
        };
        assert!(rotation_degrees.abs() < f64::EPSILON);
    }

    #[test]
    fn board_with_outline() {
        let json = r#"[{ "type": "pcb_board",
            "outline": [ {"x":0,"y":0}, {"x":10,"y":0}, {"x":5,"y":8} ] }]"#;
        let records = parse_circuit_json(json).unwrap();
        let outline = find_board(&records).unwrap().outline.as_ref().unwrap();
        assert_eq!(outline.len(), 3);
        assert_eq!(DVec2::from(outline[2]), DVec2::new(5.0, 8.0));
    }

    #[test]
    fn reject_malformed_json() {
        assert!(parse_circuit_json("[{ \"type\": \"pcb_board\", ").is_err());
    }
}
