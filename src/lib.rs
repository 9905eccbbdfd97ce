//! pcb-step-export: circuit board to STEP solid model converter
//!
//! This library turns a circuit description (board outline, thickness,
//! drill holes, placed components) into an ISO-10303-21 (STEP AP214) file
//! that mechanical CAD tools can open.
//!
//! # Architecture
//!
//! - **Entity graph**: an id-indexed repository of typed STEP entities with
//!   a Part 21 reader and writer
//! - **Board builder**: a closed B-rep of the board with circular and pill
//!   through-holes
//! - **Merge engine**: foreign component models are filtered, pruned,
//!   transformed, renumbered and spliced into the board's file
//! - **Mesh fallback**: components without a model become boxes
//!
//! # Modules
//!
//! - [`step`] — Entity graph, parsing and serialization
//! - [`geometry`] — Geometry primitives and rigid transforms
//! - [`circuit`] — Circuit description records
//! - [`board`] — Board solid builder
//! - [`merge`] — External model merging and fetching
//! - [`mesh`] — Triangle-mesh fallback solids
//! - [`assembly`] — End-to-end conversion
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//!
//! # Example
//!
//! ```
//! use pcb_step_export::assembly::{ConversionOptions, Converter};
//! use pcb_step_export::circuit::parse_circuit_json;
//!
//! let records = parse_circuit_json(
//!     r#"[{ "type": "pcb_board", "width": 20, "height": 15, "thickness": 1.6 }]"#,
//! )
//! .unwrap();
//! let converter = Converter::new(ConversionOptions::default());
//! let conversion = tokio_test::block_on(converter.convert(&records)).unwrap();
//! assert!(conversion.step.contains("MANIFOLD_SOLID_BREP"));
//! ```

pub mod assembly;
pub mod board;
pub mod circuit;
pub mod config;
pub mod error;
pub mod geometry;
pub mod merge;
pub mod mesh;
pub mod step;
