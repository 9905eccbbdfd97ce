//! STEP (ISO 10303-21) entity graph.
//!
//! This module owns the in-memory representation of a STEP data section and
//! its text encoding:
//!
//! - [`Repository`] — id-indexed entity store with *append* and *place-at*
//!   insertion
//! - [`Entity`] and the modeled kinds (points through solids) plus
//!   [`RawEntity`] for everything else
//! - [`parse_step`] — Part 21 text → repository
//! - [`write_step`] — repository → Part 21 text
//!
//! # Example
//!
//! ```
//! use pcb_step_export::step::{parse_step, write_step, Point, Repository, StepHeader};
//!
//! let mut repo = Repository::new();
//! repo.add(Point { x: 1.0, y: 2.0, z: 0.0 });
//!
//! let text = write_step(&repo, &StepHeader::now("example.step"));
//! let back = parse_step(&text).unwrap();
//! assert_eq!(back.len(), 1);
//! ```

pub mod entity;
pub mod error;
pub mod parse;
pub mod refs;
pub mod repository;
pub mod write;

pub use entity::{
    Curve, Direction, Edge, EdgeLoop, Entity, Face, FaceBound, Kind, OrientedEdge, Placement,
    Point, RawEntity, Ref, Shell, Solid, Surface, Vector, Vertex,
};
pub use error::{StepError, StepResult};
pub use parse::parse_step;
pub use repository::Repository;
pub use write::{write_step, StepHeader};
