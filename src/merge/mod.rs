//! Merging foreign STEP models into a target repository.
//!
//! A component model goes through a fixed pipeline:
//!
//! 1. parse the text into its own [`Repository`]
//! 2. [`filter_excluded`] drops product, context and presentation records
//! 3. [`prune_dangling`] removes whatever the filter stranded
//! 4. [`adjust_placement`] seats the model on a board side (optional)
//! 5. [`apply_transform`] moves every point and direction
//! 6. [`remap_ids`] and [`splice`] copy the result into the target
//!
//! Steps 1 to 5 touch only the model's own repository and can run in
//! parallel for many models; [`splice`] must be called sequentially.

pub mod error;
pub mod fetch;

use std::collections::BTreeMap;

use glam::{DMat3, DVec3};

use crate::circuit::BoardLayer;
use crate::geometry::{safe_unit, Bounds3, RigidTransform};
use crate::step::{
    parse_step, Curve, Direction, Entity, Ref, Repository, Solid, StepResult, Surface,
};

pub use error::{FetchError, ModelError};
pub use fetch::{fetch_with_timeout, DefaultFetcher, FetchModel};

/// Record types describing the foreign file's own product structure,
/// units, contexts and styling. The target file provides its own.
pub const EXCLUDED_KEYWORDS: &[&str] = &[
    "APPLICATION_CONTEXT",
    "APPLICATION_PROTOCOL_DEFINITION",
    "PRODUCT",
    "PRODUCT_CONTEXT",
    "PRODUCT_CATEGORY",
    "PRODUCT_RELATED_PRODUCT_CATEGORY",
    "PRODUCT_CATEGORY_RELATIONSHIP",
    "PRODUCT_DEFINITION",
    "PRODUCT_DEFINITION_CONTEXT",
    "PRODUCT_DEFINITION_FORMATION",
    "PRODUCT_DEFINITION_FORMATION_WITH_SPECIFIED_SOURCE",
    "PRODUCT_DEFINITION_SHAPE",
    "DESIGN_CONTEXT",
    "MECHANICAL_CONTEXT",
    "SHAPE_DEFINITION_REPRESENTATION",
    "SHAPE_REPRESENTATION",
    "ADVANCED_BREP_SHAPE_REPRESENTATION",
    "MANIFOLD_SURFACE_SHAPE_REPRESENTATION",
    "FACETED_BREP_SHAPE_REPRESENTATION",
    "GEOMETRICALLY_BOUNDED_WIREFRAME_SHAPE_REPRESENTATION",
    "SHAPE_REPRESENTATION_RELATIONSHIP",
    "REPRESENTATION_RELATIONSHIP",
    "REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION",
    "ITEM_DEFINED_TRANSFORMATION",
    "CONTEXT_DEPENDENT_SHAPE_REPRESENTATION",
    "NEXT_ASSEMBLY_USAGE_OCCURRENCE",
    "PROPERTY_DEFINITION",
    "PROPERTY_DEFINITION_REPRESENTATION",
    "REPRESENTATION",
    "SHAPE_ASPECT",
    "GEOMETRIC_REPRESENTATION_CONTEXT",
    "GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT",
    "GLOBAL_UNIT_ASSIGNED_CONTEXT",
    "REPRESENTATION_CONTEXT",
    "NAMED_UNIT",
    "SI_UNIT",
    "LENGTH_UNIT",
    "PLANE_ANGLE_UNIT",
    "SOLID_ANGLE_UNIT",
    "CONVERSION_BASED_UNIT",
    "DIMENSIONAL_EXPONENTS",
    "LENGTH_MEASURE_WITH_UNIT",
    "PLANE_ANGLE_MEASURE_WITH_UNIT",
    "UNCERTAINTY_MEASURE_WITH_UNIT",
    "MECHANICAL_DESIGN_GEOMETRIC_PRESENTATION_REPRESENTATION",
    "DRAUGHTING_MODEL",
    "PRESENTATION_LAYER_ASSIGNMENT",
    "PRESENTATION_STYLE_ASSIGNMENT",
    "STYLED_ITEM",
    "OVER_RIDING_STYLED_ITEM",
    "SURFACE_STYLE_USAGE",
    "SURFACE_SIDE_STYLE",
    "SURFACE_STYLE_FILL_AREA",
    "SURFACE_STYLE_RENDERING",
    "SURFACE_STYLE_RENDERING_WITH_PROPERTIES",
    "SURFACE_STYLE_TRANSPARENT",
    "FILL_AREA_STYLE",
    "FILL_AREA_STYLE_COLOUR",
    "COLOUR_RGB",
    "DRAUGHTING_PRE_DEFINED_COLOUR",
    "CURVE_STYLE",
    "DRAUGHTING_PRE_DEFINED_CURVE_FONT",
    "INVISIBILITY",
];

/// Returns `true` if any keyword of `entity` is excluded.
#[must_use]
pub fn is_excluded(entity: &Entity) -> bool {
    entity
        .keywords()
        .iter()
        .any(|k| EXCLUDED_KEYWORDS.contains(k))
}

/// Removes excluded records. Returns how many were removed.
pub fn filter_excluded(repo: &mut Repository) -> usize {
    let doomed: Vec<u64> = repo
        .iter()
        .filter(|(_, e)| is_excluded(e))
        .map(|(id, _)| id)
        .collect();
    for id in &doomed {
        repo.remove(*id);
    }
    doomed.len()
}

/// Removes every entity that refers to an absent id, repeating until
/// nothing changes. Returns how many were removed.
pub fn prune_dangling(repo: &mut Repository) -> usize {
    let mut removed = 0;
    loop {
        let dangling: Vec<u64> = repo
            .iter()
            .filter(|(_, e)| e.references().iter().any(|r| !repo.contains(*r)))
            .map(|(id, _)| id)
            .collect();
        if dangling.is_empty() {
            return removed;
        }
        removed += dangling.len();
        for id in dangling {
            repo.remove(id);
        }
    }
}

/// The board a model is seated on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardFrame {
    /// Board thickness in mm; the top surface is at this height.
    pub thickness: f64,
}

/// Where and how a model is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPlacement {
    /// Target position in board millimetres.
    pub position: DVec3,
    /// Euler rotation in degrees (X, then Y, then Z).
    pub rotation_degrees: DVec3,
    /// Model units to millimetres.
    pub scale: Option<f64>,
    /// Board side to seat the model on. `None` uses `position` as is.
    pub layer: Option<BoardLayer>,
    /// Gap between the board surface and the model, in mm.
    pub z_offset: f64,
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation_degrees: DVec3::ZERO,
            scale: None,
            layer: None,
            z_offset: 0.0,
        }
    }
}

impl ModelPlacement {
    /// The transform before any seating adjustment.
    #[must_use]
    pub fn transform(&self) -> RigidTransform {
        RigidTransform::new(self.rotation_degrees, self.position)
            .with_scale(self.scale.unwrap_or(1.0))
    }
}

/// Recentres the model on `transform.translation` in XY and seats it
/// against the requested board side.
///
/// `top` puts the model's lowest point at `thickness + z_offset`.
/// `bottom` first flips the model 180° about X, then puts its highest point
/// at `-z_offset`. A model without points is left alone.
pub fn adjust_placement(
    repo: &Repository,
    transform: &mut RigidTransform,
    layer: BoardLayer,
    frame: &BoardFrame,
    z_offset: f64,
) {
    if layer == BoardLayer::Bottom {
        transform.rotation_degrees.x += 180.0;
    }

    let points = repo.iter().filter_map(|(_, e)| match e {
        Entity::Point(p) => Some(transform.orient_point(p.to_vec())),
        _ => None,
    });
    let Some(bounds) = Bounds3::from_points(points) else {
        return;
    };

    let center = bounds.center();
    let target = transform.translation;
    transform.translation.x = target.x - center.x;
    transform.translation.y = target.y - center.y;
    transform.translation.z = match layer {
        BoardLayer::Top => frame.thickness + z_offset - bounds.min.z,
        BoardLayer::Bottom => -z_offset - bounds.max.z,
    };
}

/// Applies `transform` to every geometric entity in place.
///
/// Points are scaled, rotated and translated. Directions are rotated and
/// renormalised. Radii and vector magnitudes are scaled. Under a rotation,
/// placements with an omitted (`$`) axis or reference direction get
/// explicit rotated directions appended to `repo`.
pub fn apply_transform(repo: &mut Repository, transform: &RigidTransform) {
    let implicit = if transform.rotation().abs_diff_eq(DMat3::IDENTITY, 1e-12) {
        Vec::new()
    } else {
        implicit_axes(repo)
    };

    for (_, entity) in repo.iter_mut() {
        match entity {
            Entity::Point(p) => *p = transform.apply_point(p.to_vec()).into(),
            Entity::Direction(d) => *d = transform.apply_direction(d.to_vec()).into(),
            Entity::Vector(v) => v.magnitude = transform.apply_length(v.magnitude),
            Entity::Curve(Curve::Circle { radius, .. })
            | Entity::Surface(Surface::Cylinder { radius, .. }) => {
                *radius = transform.apply_length(*radius);
            }
            Entity::Placement(_)
            | Entity::Curve(Curve::Line { .. })
            | Entity::Surface(Surface::Plane { .. })
            | Entity::Vertex(_)
            | Entity::Edge(_)
            | Entity::OrientedEdge(_)
            | Entity::EdgeLoop(_)
            | Entity::FaceBound(_)
            | Entity::Face(_)
            | Entity::Shell(_)
            | Entity::Solid(_)
            | Entity::Raw(_) => {}
        }
    }

    for (id, axis, ref_direction) in implicit {
        let axis = axis.map(|z| repo.add(Direction::from(transform.apply_direction(z))));
        let ref_direction =
            ref_direction.map(|x| repo.add(Direction::from(transform.apply_direction(x))));
        if let Some(Entity::Placement(placement)) = repo.entity_mut(id) {
            placement.axis = axis.or(placement.axis);
            placement.ref_direction = ref_direction.or(placement.ref_direction);
        }
    }
}

/// A placement id with the model-frame axes it leaves implicit.
type ImplicitAxes = (u64, Option<DVec3>, Option<DVec3>);

/// Resolves the implicit axes of every placement in its own frame.
///
/// An absent axis is global Z. An absent reference direction is global X
/// (or global Z for an axis along X) projected perpendicular to the axis.
fn implicit_axes(repo: &Repository) -> Vec<ImplicitAxes> {
    repo.iter()
        .filter_map(|(id, entity)| {
            let Entity::Placement(placement) = entity else {
                return None;
            };
            if placement.axis.is_some() && placement.ref_direction.is_some() {
                return None;
            }
            let z = placement
                .axis
                .and_then(|r| repo.get(r))
                .map_or(DVec3::Z, |d| safe_unit(d.to_vec()));
            let x = placement.ref_direction.is_none().then(|| {
                let hint = if z.x.abs() > 1.0 - 1e-12 {
                    DVec3::Z
                } else {
                    DVec3::X
                };
                safe_unit(hint - z * hint.dot(z))
            });
            Some((id, placement.axis.is_none().then_some(z), x))
        })
        .collect()
}

/// Renumbers `source` into a contiguous block starting at `first_id`,
/// in ascending source id order, rewriting every reference.
#[must_use]
pub fn remap_ids(source: Repository, first_id: u64) -> Vec<(u64, Entity)> {
    let mapping: BTreeMap<u64, u64> = source
        .ids()
        .into_iter()
        .zip(first_id..)
        .collect();

    source
        .into_entities()
        .map(|(old, mut entity)| {
            entity.remap_refs(|id| mapping.get(&id).copied().unwrap_or(id));
            (mapping[&old], entity)
        })
        .collect()
}

/// Copies `source` into `target` after its current largest id and returns
/// the solids it contributed.
///
/// # Errors
///
/// Returns an error if an id is already taken, which only happens when
/// `target` is modified concurrently.
pub fn splice(target: &mut Repository, source: Repository) -> StepResult<Vec<Ref<Solid>>> {
    let first_id = target.max_id() + 1;
    let mut solids = Vec::new();
    for (id, entity) in remap_ids(source, first_id) {
        if matches!(entity, Entity::Solid(_)) {
            solids.push(Ref::new(id));
        }
        target.place_at(id, entity)?;
    }
    Ok(solids)
}

/// Splices a prepared model into `target`.
///
/// # Errors
///
/// Returns [`ModelError::NoSolids`] without touching `target` when `model`
/// holds no solid, or [`ModelError::Merge`] if splicing fails.
pub fn splice_prepared(
    target: &mut Repository,
    model: Repository,
) -> Result<Vec<Ref<Solid>>, ModelError> {
    if model.solids().is_empty() {
        return Err(ModelError::NoSolids);
    }
    splice(target, model).map_err(ModelError::Merge)
}

/// Runs parse, filter, prune, seating and transform on one model.
///
/// # Errors
///
/// Returns [`ModelError::Parse`] for invalid text and
/// [`ModelError::NoSolids`] when filtering leaves no solid behind.
pub fn prepare_model(
    text: &str,
    placement: &ModelPlacement,
    frame: &BoardFrame,
) -> Result<Repository, ModelError> {
    let mut repo = parse_step(text).map_err(ModelError::Parse)?;
    let parsed = repo.len();
    let filtered = filter_excluded(&mut repo);
    let pruned = prune_dangling(&mut repo);
    tracing::debug!(parsed, filtered, pruned, "Cleaned model entities");

    if repo.solids().is_empty() {
        return Err(ModelError::NoSolids);
    }

    let mut transform = placement.transform();
    if let Some(layer) = placement.layer {
        adjust_placement(&repo, &mut transform, layer, frame, placement.z_offset);
    }
    apply_transform(&mut repo, &transform);
    Ok(repo)
}

/// Prepares a model and splices it into `target`.
///
/// # Errors
///
/// Returns any [`prepare_model`] error, or [`ModelError::Merge`] if
/// splicing fails.
pub fn merge_model(
    target: &mut Repository,
    text: &str,
    placement: &ModelPlacement,
    frame: &BoardFrame,
) -> Result<Vec<Ref<Solid>>, ModelError> {
    let prepared = prepare_model(text, placement, frame)?;
    splice_prepared(target, prepared)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::step::{Direction, Placement, Point, RawEntity, Shell};

    const BLOCK: &str = include_str!("../../tests/fixtures/block.step");

    fn id_set(repo: &Repository) -> BTreeSet<u64> {
        repo.ids().into_iter().collect()
    }

    fn raw(keyword: &str, args: &str) -> Entity {
        Entity::Raw(RawEntity::simple(keyword, args))
    }

    #[test]
    fn prune_removes_only_stranded_entities() {
        let mut repo = Repository::new();
        let a = repo.add_entity(raw("PRODUCT", "'A','A','',()"));
        let b = repo.add_entity(raw("PRODUCT_DEFINITION_FORMATION_X", &format!("'','',#{a}")));
        let p = repo.add(Point {
            x: 1.0,
            y: 0.0,
            z: 0.0,
        });
        let keep = repo.add_entity(raw("BOUNDED_THING", &format!("#{}", p.id())));

        assert_eq!(filter_excluded(&mut repo), 1);
        assert_eq!(prune_dangling(&mut repo), 1);
        assert!(!repo.contains(a));
        assert!(!repo.contains(b));
        assert!(repo.contains(p.id()));
        assert!(repo.contains(keep));
    }

    #[test]
    fn prune_reaches_a_fixed_point() {
        let mut repo = Repository::new();
        let gone = 100;
        let first = repo.add_entity(raw("A_THING", &format!("#{gone}")));
        let second = repo.add_entity(raw("B_THING", &format!("(#{first})")));
        let third = repo.add_entity(raw("C_THING", &format!("#{second},'#1'")));
        assert_eq!(prune_dangling(&mut repo), 3);
        assert!(repo.is_empty());
        assert!(!repo.contains(third));
    }

    #[test]
    fn string_hashes_are_not_references() {
        let mut repo = Repository::new();
        repo.add_entity(raw("NOTE", "'see #999'"));
        assert_eq!(prune_dangling(&mut repo), 0);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn complex_unit_records_are_excluded() {
        let unit = Entity::Raw(RawEntity::complex(
            "LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.)",
        ));
        assert!(is_excluded(&unit));
        let curve = Entity::Raw(RawEntity::complex(
            "BOUNDED_CURVE() B_SPLINE_CURVE(3,(#1,#2),.UNSPECIFIED.,.F.,.F.) CURVE()",
        ));
        assert!(!is_excluded(&curve));
    }

    #[test]
    fn fixture_cleans_to_one_solid() {
        let mut repo = parse_step(BLOCK).unwrap();
        filter_excluded(&mut repo);
        prune_dangling(&mut repo);

        let solids = repo.solids();
        assert_eq!(solids.len(), 1);
        let shell = repo.get(repo.get(solids[0]).unwrap().shell).unwrap();
        assert_eq!(shell.faces.len(), 6);
        assert!(repo.iter().all(|(_, e)| !is_excluded(e)));
        for (_, entity) in repo.iter() {
            assert!(entity.references().iter().all(|r| repo.contains(*r)));
        }
    }

    #[test]
    fn transform_moves_points_and_renormalizes_directions() {
        let mut repo = Repository::new();
        let p = repo.add(Point {
            x: 1.0,
            y: 0.0,
            z: 0.0,
        });
        let d = repo.add(Direction {
            dx: 1.0,
            dy: 0.0,
            dz: 0.0,
        });
        let flat = repo.add_entity(raw("CARTESIAN_POINT", "'',(1.,0.)"));

        let t = RigidTransform::new(DVec3::new(0.0, 0.0, 90.0), DVec3::new(0.0, 0.0, 5.0))
            .with_scale(2.0);
        apply_transform(&mut repo, &t);

        let moved = repo.get(p).unwrap().to_vec();
        assert!((moved - DVec3::new(0.0, 2.0, 5.0)).length() < 1e-9);
        let turned = repo.get(d).unwrap().to_vec();
        assert!((turned - DVec3::Y).length() < 1e-9);
        assert_eq!(repo.entity(flat), Some(&raw("CARTESIAN_POINT", "'',(1.,0.)")));
    }

    #[test]
    fn implicit_placement_axes_follow_the_rotation() {
        let text = "ISO-10303-21;\nDATA;\n\
            #1=CARTESIAN_POINT('',(0.,0.,0.));\n\
            #2=AXIS2_PLACEMENT_3D('',#1,$,$);\n\
            #3=CYLINDRICAL_SURFACE('',#2,2.);\n\
            #4=DIRECTION('',(1.,0.,0.));\n\
            #5=AXIS2_PLACEMENT_3D('',#1,#4,$);\n\
            ENDSEC;\nEND-ISO-10303-21;\n";
        let mut repo = parse_step(text).unwrap();
        let t = RigidTransform::new(DVec3::new(90.0, 0.0, 0.0), DVec3::ZERO);
        apply_transform(&mut repo, &t);

        let resolve = |r: Option<Ref<Direction>>| repo.get(r.unwrap()).unwrap().to_vec();
        let bare = *repo.get(Ref::<Placement>::new(2)).unwrap();
        assert!((resolve(bare.axis) - DVec3::NEG_Y).length() < 1e-9);
        assert!((resolve(bare.ref_direction) - DVec3::X).length() < 1e-9);

        // Axis along X: the implicit reference direction is Z projected.
        let along_x = *repo.get(Ref::<Placement>::new(5)).unwrap();
        assert_eq!(along_x.axis, Some(Ref::new(4)));
        assert!((resolve(along_x.ref_direction) - DVec3::NEG_Y).length() < 1e-9);

        let mut unrotated = parse_step(text).unwrap();
        let before = unrotated.len();
        apply_transform(&mut unrotated, &RigidTransform::new(DVec3::ZERO, DVec3::X));
        assert_eq!(unrotated.len(), before);
        let still_bare = unrotated.get(Ref::<Placement>::new(2)).unwrap();
        assert_eq!(still_bare.axis, None);
        assert_eq!(prune_dangling(&mut repo), 0);
    }

    #[test]
    fn top_seating_puts_model_on_the_board() {
        let mut repo = parse_step(BLOCK).unwrap();
        filter_excluded(&mut repo);
        prune_dangling(&mut repo);

        let frame = BoardFrame { thickness: 1.6 };
        let mut t = RigidTransform::new(DVec3::ZERO, DVec3::new(10.0, 5.0, 0.0));
        adjust_placement(&repo, &mut t, BoardLayer::Top, &frame, 0.0);
        apply_transform(&mut repo, &t);

        let bounds = Bounds3::from_points(repo.iter().filter_map(|(_, e)| match e {
            Entity::Point(p) => Some(p.to_vec()),
            _ => None,
        }))
        .unwrap();
        assert!((bounds.min.z - 1.6).abs() < 1e-9);
        assert!((bounds.center().x - 10.0).abs() < 1e-9);
        assert!((bounds.center().y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn bottom_seating_flips_and_hangs_below() {
        let mut repo = parse_step(BLOCK).unwrap();
        filter_excluded(&mut repo);
        prune_dangling(&mut repo);

        let frame = BoardFrame { thickness: 1.6 };
        let mut t = RigidTransform::new(DVec3::ZERO, DVec3::new(0.0, 0.0, 0.0));
        adjust_placement(&repo, &mut t, BoardLayer::Bottom, &frame, 0.5);
        assert!((t.rotation_degrees.x - 180.0).abs() < 1e-12);
        apply_transform(&mut repo, &t);

        let max_z = repo
            .iter()
            .filter_map(|(_, e)| match e {
                Entity::Point(p) => Some(p.z),
                _ => None,
            })
            .fold(f64::MIN, f64::max);
        assert!((max_z + 0.5).abs() < 1e-9);
    }

    #[test]
    fn remap_is_contiguous_and_rewrites_refs() {
        let mut source = Repository::new();
        let p = source.add(Point {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        });
        source
            .place_at(10, raw("THING", &format!("#{},'#{}'", p.id(), p.id())))
            .unwrap();

        let remapped = remap_ids(source, 50);
        assert_eq!(remapped.len(), 2);
        assert_eq!(remapped[0].0, 50);
        assert_eq!(remapped[1], (51, raw("THING", "#50,'#1'")));
    }

    #[test]
    fn merging_twice_gives_disjoint_ranges() {
        let mut target = Repository::new();
        target.add(Point {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        });
        let placement = ModelPlacement::default();
        let frame = BoardFrame { thickness: 1.6 };

        let before = id_set(&target);
        let first = merge_model(&mut target, BLOCK, &placement, &frame).unwrap();
        let after_first = id_set(&target);
        let second = merge_model(&mut target, BLOCK, &placement, &frame).unwrap();
        let after_second = id_set(&target);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0], second[0]);

        let first_range: BTreeSet<u64> = after_first.difference(&before).copied().collect();
        let second_range: BTreeSet<u64> = after_second.difference(&after_first).copied().collect();
        assert_eq!(first_range.len(), second_range.len());
        assert!(first_range.is_disjoint(&second_range));
        assert!(first_range.iter().all(|id| *id > 1));

        // Each merged solid resolves to its own shell.
        let shell_a = target.get(first[0]).unwrap().shell;
        let shell_b = target.get(second[0]).unwrap().shell;
        assert_ne!(shell_a, shell_b);
        let _: &Shell = target.get(shell_b).unwrap();
    }

    #[test]
    fn solidless_model_is_not_spliced() {
        let mut target = Repository::new();
        target.add(Point {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        });
        let mut model = Repository::new();
        model.add(Point {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        });

        let result = splice_prepared(&mut target, model);
        assert!(matches!(result, Err(ModelError::NoSolids)));
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn invalid_text_is_a_parse_error() {
        let placement = ModelPlacement::default();
        let frame = BoardFrame { thickness: 1.6 };
        let err = prepare_model("not a step file", &placement, &frame).unwrap_err();
        assert!(matches!(err, ModelError::Parse(_)));
    }

    #[test]
    fn metadata_only_file_has_no_solids() {
        let text = "ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n#1=PRODUCT('a','a','',());\nENDSEC;\nEND-ISO-10303-21;\n";
        let err = prepare_model(text, &ModelPlacement::default(), &BoardFrame { thickness: 1.0 })
            .unwrap_err();
        assert!(matches!(err, ModelError::NoSolids));
    }
}
