//! End-to-end board export tests.
//!
//! These tests convert circuit descriptions into STEP text and check the
//! topology that comes out, both in the text and after parsing it back.

use pcb_step_export::assembly::{ConversionOptions, Converter};
use pcb_step_export::circuit::parse_circuit_json;
use pcb_step_export::step::{parse_step, Entity, Repository, Surface};

fn convert(json: &str) -> String {
    let records = parse_circuit_json(json).expect("valid circuit description");
    let converter = Converter::new(ConversionOptions {
        include_components: false,
        ..ConversionOptions::default()
    });
    tokio_test::block_on(converter.convert(&records))
        .expect("conversion succeeds")
        .step
}

fn count(step: &str, keyword: &str) -> usize {
    step.matches(&format!(" = {keyword}(")).count()
}

fn board_with_holes(holes: &str) -> String {
    format!(
        r#"[{{ "type": "pcb_board", "width": 20, "height": 15, "thickness": 1.6 }}{holes}]"#
    )
}

fn circle_hole(x: f64, y: f64, diameter: f64) -> String {
    format!(
        r#", {{ "type": "pcb_hole", "hole_shape": "circle", "x": {x}, "y": {y}, "hole_diameter": {diameter} }}"#
    )
}

fn pill_hole(width: f64, height: f64, rotation: f64) -> String {
    format!(
        r#", {{ "type": "pcb_hole", "hole_shape": "pill", "x": 2, "y": -1,
               "hole_width": {width}, "hole_height": {height}, "ccw_rotation": {rotation} }}"#
    )
}

fn cylinders(repo: &Repository) -> usize {
    repo.iter()
        .filter(|(_, e)| matches!(e, Entity::Surface(Surface::Cylinder { .. })))
        .count()
}

// =============================================================================
// Document structure
// =============================================================================

#[test]
fn test_board_with_one_hole() {
    let step = convert(&board_with_holes(&circle_hole(0.0, 0.0, 3.2)));

    assert!(step.starts_with("ISO-10303-21;"));
    assert!(step.trim_end().ends_with("END-ISO-10303-21;"));
    assert!(step.contains("FILE_SCHEMA(('AUTOMOTIVE_DESIGN"));
    assert_eq!(count(&step, "MANIFOLD_SOLID_BREP"), 1);
    assert_eq!(count(&step, "CIRCLE"), 4);
    assert_eq!(count(&step, "CYLINDRICAL_SURFACE"), 1);
    assert!(step.contains(",1.6)"), "top face sits at the board thickness");
}

#[test]
fn test_every_id_is_defined_once() {
    let step = convert(&board_with_holes(&circle_hole(3.0, 3.0, 1.0)));
    let repo = parse_step(&step).expect("output parses");

    for (_, entity) in repo.iter() {
        for id in entity.references() {
            assert!(repo.contains(id), "#{id} is referenced but not defined");
        }
    }
    let defined = step.lines().filter(|l| l.starts_with('#')).count();
    assert_eq!(defined, repo.len());
}

// =============================================================================
// Holes
// =============================================================================

#[test]
fn test_circle_holes_scale_linearly() {
    for n in 0..4 {
        let holes: String = (0..n)
            .map(|i| circle_hole(-6.0 + 4.0 * f64::from(i), 2.0, 1.0))
            .collect();
        let step = convert(&board_with_holes(&holes));
        let n = usize::try_from(n).expect("small count");
        assert_eq!(count(&step, "CIRCLE"), 4 * n);
        assert_eq!(count(&step, "CYLINDRICAL_SURFACE"), n);
        assert_eq!(count(&step, "ADVANCED_FACE"), 6 + n);
    }
}

#[test]
fn test_pill_hole_at_any_rotation() {
    for rotation in [0.0, 30.0, 90.0, 135.0, 270.0] {
        for (width, height) in [(4.0, 1.5), (1.5, 4.0)] {
            let step = convert(&board_with_holes(&pill_hole(width, height, rotation)));
            assert_eq!(
                count(&step, "CYLINDRICAL_SURFACE"),
                2,
                "{width}x{height} at {rotation} degrees"
            );
            // Top, bottom, four sides and two straight walls.
            assert_eq!(count(&step, "PLANE"), 8);
            assert_eq!(count(&step, "ADVANCED_FACE"), 10);
        }
    }
}

#[test]
fn test_unsupported_hole_is_skipped_with_warning() {
    let json = board_with_holes(
        r#", { "type": "pcb_hole", "hole_shape": "square", "x": 0, "y": 0, "hole_size": 1 }"#,
    );
    let records = parse_circuit_json(&json).expect("valid circuit description");
    let conversion = tokio_test::block_on(
        Converter::new(ConversionOptions::default()).convert(&records),
    )
    .expect("conversion succeeds");

    assert_eq!(conversion.warnings.len(), 1);
    assert_eq!(count(&conversion.step, "CYLINDRICAL_SURFACE"), 0);
}

#[test]
fn test_plated_holes_are_cut() {
    let holes = r#", { "type": "pcb_plated_hole", "shape": "circle", "x": 4, "y": 4,
                      "hole_diameter": 1, "outer_diameter": 2 },
                    { "type": "pcb_plated_hole", "shape": "pill_hole_with_rect_pad",
                      "hole_shape": "pill", "x": -4, "y": 0, "hole_width": 2.5,
                      "hole_height": 1, "rect_pad_width": 3, "rect_pad_height": 1.5 },
                    { "type": "pcb_plated_hole", "shape": "polygon", "x": 0, "y": 0 }"#;
    let records = parse_circuit_json(&board_with_holes(holes)).expect("valid circuit description");
    let conversion = tokio_test::block_on(
        Converter::new(ConversionOptions::default()).convert(&records),
    )
    .expect("conversion succeeds");

    // One round wall plus two pill caps; the polygon pad is skipped.
    assert_eq!(count(&conversion.step, "CYLINDRICAL_SURFACE"), 3);
    assert_eq!(conversion.warnings.len(), 1);
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_parse_back_preserves_topology() {
    let holes = format!("{}{}", circle_hole(-5.0, 0.0, 2.0), pill_hole(3.0, 1.0, 45.0));
    let step = convert(&board_with_holes(&holes));
    let repo = parse_step(&step).expect("output parses");

    let solids = repo.solids();
    assert_eq!(solids.len(), 1);
    let solid = repo.require(solids[0]).expect("solid resolves");
    let shell = repo.require(solid.shell).expect("shell resolves");
    // Six board faces, one circle wall, four pill walls.
    assert_eq!(shell.faces.len(), 11);
    assert_eq!(cylinders(&repo), 3);

    let again = pcb_step_export::step::write_step(
        &repo,
        &pcb_step_export::step::StepHeader::now("again.step"),
    );
    let reparsed = parse_step(&again).expect("rewritten output parses");
    assert_eq!(reparsed.len(), repo.len());
    assert_eq!(reparsed.solids().len(), 1);
}

#[test]
fn test_clockwise_outline_is_accepted() {
    let json = r#"[{ "type": "pcb_board", "thickness": 1.0,
        "outline": [{"x":0,"y":0},{"x":0,"y":10},{"x":10,"y":10},{"x":10,"y":0}] }]"#;
    let step = convert(json);
    let repo = parse_step(&step).expect("output parses");
    let shell = repo
        .require(repo.require(repo.solids()[0]).expect("solid").shell)
        .expect("shell");
    assert_eq!(shell.faces.len(), 6);
}

#[test]
fn test_invalid_thickness_is_fatal() {
    let records = parse_circuit_json(
        r#"[{ "type": "pcb_board", "width": 20, "height": 15, "thickness": -1 }]"#,
    )
    .expect("valid circuit description");
    let result = tokio_test::block_on(
        Converter::new(ConversionOptions::default()).convert(&records),
    );
    assert!(result.is_err());
}
