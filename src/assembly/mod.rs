//! Conversion of a circuit description into one STEP document.
//!
//! [`Converter::convert`] runs the whole pipeline:
//!
//! 1. resolve the board from the input records and options
//! 2. emit product, unit and context records
//! 3. build the board solid
//! 4. prepare every external model concurrently, then splice them in
//!    input order
//! 5. add a box for every component no model covered
//! 6. style each solid by its role and wrap all solids in one shape
//!    representation
//!
//! Only an unresolvable or invalid board is fatal. Model and mesh failures
//! are logged and returned as [`ConversionWarning`]s.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use glam::{DVec2, DVec3};
use tracing::{debug, info, warn};

use crate::board::{build_board_solid, BoardSpec};
use crate::circuit::{cad_components, find_board, holes, pcb_components, CadComponent, CircuitRecord};
use crate::error::ConversionError;
use crate::geometry::add_placement;
use crate::merge::{
    fetch_with_timeout, prepare_model, splice_prepared, BoardFrame, DefaultFetcher,
    FetchModel, ModelError, ModelPlacement,
};
use crate::mesh::{component_box, mesh_to_solid};
use crate::step::write::{quote, real};
use crate::step::{write_step, Entity, Placement, RawEntity, Ref, Repository, Solid, StepHeader};

/// Board thickness used when neither the input nor the options give one.
pub const DEFAULT_THICKNESS: f64 = 1.6;

/// Product name used when none is configured.
pub const DEFAULT_PRODUCT_NAME: &str = "PCB";

/// Settings for one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// Overrides the board width (mm).
    pub board_width: Option<f64>,
    /// Overrides the board height (mm).
    pub board_height: Option<f64>,
    /// Overrides the board thickness (mm).
    pub board_thickness: Option<f64>,
    /// Product and board solid name.
    pub product_name: String,
    /// Emit component geometry at all.
    pub include_components: bool,
    /// Resolve `model_step_url` references.
    pub include_external_models: bool,
    /// Model text keyed by reference; bypasses fetching.
    pub preloaded_models: HashMap<String, String>,
    /// Limit on each model fetch. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
    /// Board colour, RGB in `0..=1`.
    pub board_color: [f64; 3],
    /// Component colour, RGB in `0..=1`.
    pub component_color: [f64; 3],
    /// Height of fallback boxes without an explicit size (mm).
    pub default_component_height: f64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            board_width: None,
            board_height: None,
            board_thickness: None,
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            include_components: true,
            include_external_models: true,
            preloaded_models: HashMap::new(),
            fetch_timeout: Some(Duration::from_secs(30)),
            board_color: [0.05, 0.4, 0.15],
            component_color: [0.2, 0.2, 0.2],
            default_component_height: 1.0,
        }
    }
}

/// Whether a solid is the board or a component; selects its colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolidRole {
    /// The board itself.
    Board,
    /// A merged model or fallback box.
    Component,
}

impl SolidRole {
    const fn color(self, options: &ConversionOptions) -> [f64; 3] {
        match self {
            Self::Board => options.board_color,
            Self::Component => options.component_color,
        }
    }
}

/// Category of a recovered failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// An external model could not be fetched, parsed or merged.
    ExternalModel,
    /// Generated geometry was skipped.
    Geometry,
}

/// A failure that did not abort the conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionWarning {
    /// Category.
    pub kind: WarningKind,
    /// Component (or record) the warning is about.
    pub component: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.message)
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The STEP document.
    pub step: String,
    /// Recovered failures, in the order they happened.
    pub warnings: Vec<ConversionWarning>,
    /// Number of solids in the document, board included.
    pub solid_count: usize,
    /// CAD and PCB component ids covered by an external model.
    pub handled_components: BTreeSet<String>,
}

/// Converts circuit descriptions to STEP.
#[derive(Clone)]
pub struct Converter {
    options: ConversionOptions,
    fetcher: Arc<dyn FetchModel>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// Creates a converter that fetches models with [`DefaultFetcher`].
    #[must_use]
    pub fn new(options: ConversionOptions) -> Self {
        let fetcher = Arc::new(DefaultFetcher::new(options.fetch_timeout));
        Self { options, fetcher }
    }

    /// Replaces the model fetcher.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn FetchModel>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// The options this converter runs with.
    #[must_use]
    pub const fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Converts `records` into a STEP document.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Configuration`] if the board dimensions
    /// cannot be resolved and [`ConversionError::Board`] if the board
    /// geometry is invalid.
    pub async fn convert(&self, records: &[CircuitRecord]) -> Result<Conversion, ConversionError> {
        let mut warnings = Vec::new();
        let spec = self.resolve_board(records, &mut warnings)?;
        let name = self.options.product_name.as_str();

        let mut repo = Repository::new();
        let shared = add_shared_records(&mut repo, name);
        let board = build_board_solid(&mut repo, &spec, name)?;
        info!(
            holes = spec.holes.len(),
            thickness = spec.thickness,
            "Built board solid"
        );

        let frame = BoardFrame {
            thickness: spec.thickness,
        };
        let mut solids = vec![(board, SolidRole::Board)];
        let mut handled = BTreeSet::new();

        if self.options.include_components && self.options.include_external_models {
            self.merge_models(records, frame, &mut repo, &mut solids, &mut handled, &mut warnings)
                .await;
        }
        if self.options.include_components {
            self.add_fallback_boxes(records, frame, &handled, &mut repo, &mut solids, &mut warnings);
        }

        self.add_presentation(&mut repo, &shared, &solids);

        let step = write_step(&repo, &StepHeader::now(format!("{name}.step")));
        info!(
            solids = solids.len(),
            entities = repo.len(),
            warnings = warnings.len(),
            "Conversion finished"
        );

        Ok(Conversion {
            step,
            warnings,
            solid_count: solids.len(),
            handled_components: handled,
        })
    }

    fn resolve_board(
        &self,
        records: &[CircuitRecord],
        warnings: &mut Vec<ConversionWarning>,
    ) -> Result<BoardSpec, ConversionError> {
        let board = find_board(records);
        let thickness = self
            .options
            .board_thickness
            .or_else(|| board.and_then(|b| b.thickness))
            .unwrap_or(DEFAULT_THICKNESS);

        let overridden = self.options.board_width.is_some() || self.options.board_height.is_some();
        let outline = board
            .and_then(|b| b.outline.as_ref())
            .filter(|o| !o.is_empty() && !overridden);
        let width = self.options.board_width.or_else(|| board.and_then(|b| b.width));
        let height = self.options.board_height.or_else(|| board.and_then(|b| b.height));
        let center = board.and_then(|b| b.center).map_or(DVec2::ZERO, DVec2::from);

        let spec = match (outline, width, height) {
            (Some(outline), _, _) => BoardSpec::with_outline(
                outline.iter().copied().map(DVec2::from).collect(),
                thickness,
            ),
            (None, Some(w), Some(h)) => {
                if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
                    return Err(ConversionError::configuration(format!(
                        "board dimensions must be positive, got {w} x {h}"
                    )));
                }
                BoardSpec::rectangle(w, h, center, thickness)
            }
            _ => {
                return Err(ConversionError::configuration(
                    "board dimensions unavailable: need an outline or a width and height",
                ));
            }
        };

        let mut cut = Vec::new();
        for (index, geometry) in holes(records).into_iter().enumerate() {
            if let Some(hole) = geometry.to_hole() {
                cut.push(hole);
            } else {
                warn!(hole = index, "Skipping hole with unsupported shape");
                warnings.push(ConversionWarning {
                    kind: WarningKind::Geometry,
                    component: format!("hole {index}"),
                    message: "unsupported hole shape skipped".to_string(),
                });
            }
        }
        Ok(spec.with_holes(cut))
    }

    async fn merge_models(
        &self,
        records: &[CircuitRecord],
        frame: BoardFrame,
        repo: &mut Repository,
        solids: &mut Vec<(Ref<Solid>, SolidRole)>,
        handled: &mut BTreeSet<String>,
        warnings: &mut Vec<ConversionWarning>,
    ) {
        let jobs: Vec<(&CadComponent, &str)> = cad_components(records)
            .into_iter()
            .filter_map(|cad| {
                cad.model_step_url
                    .as_deref()
                    .filter(|r| !r.trim().is_empty())
                    .map(|r| (cad, r))
            })
            .collect();
        if jobs.is_empty() {
            return;
        }
        debug!(models = jobs.len(), "Preparing external models");

        let handles: Vec<_> = jobs
            .iter()
            .map(|(cad, reference)| {
                tokio::spawn(prepare_component(
                    (*reference).to_string(),
                    self.options.preloaded_models.get(*reference).cloned(),
                    Arc::clone(&self.fetcher),
                    self.options.fetch_timeout,
                    placement_for(cad),
                    frame,
                ))
            })
            .collect();

        // Splice strictly in input order so ids never race.
        for ((cad, reference), handle) in jobs.iter().zip(handles) {
            let prepared = handle
                .await
                .unwrap_or_else(|e| Err(ModelError::task(e.to_string())));
            let merged = prepared.and_then(|model| splice_prepared(repo, model));

            match merged {
                Ok(new_solids) => {
                    info!(
                        component = %cad.cad_component_id,
                        reference,
                        solids = new_solids.len(),
                        "Merged external model"
                    );
                    handled.insert(cad.cad_component_id.clone());
                    if let Some(pcb_id) = &cad.pcb_component_id {
                        handled.insert(pcb_id.clone());
                    }
                    solids.extend(new_solids.into_iter().map(|s| (s, SolidRole::Component)));
                }
                Err(err) => {
                    warn!(component = %cad.cad_component_id, reference, error = %err, "Skipping external model");
                    warnings.push(model_warning(cad, reference, &err));
                }
            }
        }
    }

    fn add_fallback_boxes(
        &self,
        records: &[CircuitRecord],
        frame: BoardFrame,
        handled: &BTreeSet<String>,
        repo: &mut Repository,
        solids: &mut Vec<(Ref<Solid>, SolidRole)>,
        warnings: &mut Vec<ConversionWarning>,
    ) {
        let cads = cad_components(records);
        for component in pcb_components(records) {
            let id = component.pcb_component_id.as_str();
            if handled.contains(id) {
                continue;
            }
            let cad = cads
                .iter()
                .find(|c| c.pcb_component_id.as_deref() == Some(id))
                .copied();
            let mesh = component_box(
                component,
                cad,
                &frame,
                self.options.default_component_height,
            );
            match mesh_to_solid(repo, &mesh, id) {
                Ok(solid) => solids.push((solid, SolidRole::Component)),
                Err(err) => {
                    warn!(component = id, error = %err, "Skipping component box");
                    warnings.push(ConversionWarning {
                        kind: WarningKind::Geometry,
                        component: id.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    fn add_presentation(
        &self,
        repo: &mut Repository,
        shared: &SharedRecords,
        solids: &[(Ref<Solid>, SolidRole)],
    ) {
        let styled: Vec<u64> = solids
            .iter()
            .map(|(solid, role)| add_style(repo, *solid, role.color(&self.options)))
            .collect();
        add_raw(
            repo,
            "MECHANICAL_DESIGN_GEOMETRIC_PRESENTATION_REPRESENTATION",
            format!("'',{},#{}", id_list(styled), shared.context),
        );

        let items = std::iter::once(shared.origin.id())
            .chain(solids.iter().map(|(s, _)| s.id()))
            .collect();
        let representation = add_raw(
            repo,
            "ADVANCED_BREP_SHAPE_REPRESENTATION",
            format!(
                "{},{},#{}",
                quote(&self.options.product_name),
                id_list(items),
                shared.context
            ),
        );
        add_raw(
            repo,
            "SHAPE_DEFINITION_REPRESENTATION",
            format!("#{},#{representation}", shared.product_shape),
        );
    }
}

/// Fetches (unless preloaded) and prepares one model off the async
/// runtime.
async fn prepare_component(
    reference: String,
    preloaded: Option<String>,
    fetcher: Arc<dyn FetchModel>,
    timeout: Option<Duration>,
    placement: ModelPlacement,
    frame: BoardFrame,
) -> Result<Repository, ModelError> {
    let text = match preloaded {
        Some(text) => text,
        None => fetch_with_timeout(fetcher, reference.clone(), timeout).await?,
    };
    if text.trim().is_empty() {
        return Err(ModelError::empty(reference));
    }
    tokio::task::spawn_blocking(move || prepare_model(&text, &placement, &frame))
        .await
        .map_err(|e| ModelError::task(e.to_string()))?
}

fn placement_for(cad: &CadComponent) -> ModelPlacement {
    ModelPlacement {
        position: DVec3::from(cad.position),
        rotation_degrees: DVec3::from(cad.rotation),
        scale: cad.model_unit_to_mm_scale_factor,
        layer: cad.layer,
        z_offset: cad.z_offset,
    }
}

fn model_warning(cad: &CadComponent, reference: &str, err: &ModelError) -> ConversionWarning {
    ConversionWarning {
        kind: WarningKind::ExternalModel,
        component: cad.cad_component_id.clone(),
        message: format!("{reference}: {err}"),
    }
}

/// Records every solid's representation points back to.
struct SharedRecords {
    context: u64,
    product_shape: u64,
    origin: Ref<Placement>,
}

fn add_raw(repo: &mut Repository, keyword: &str, args: impl Into<String>) -> u64 {
    repo.add_entity(Entity::Raw(RawEntity::simple(keyword, args)))
}

fn add_complex(repo: &mut Repository, body: impl Into<String>) -> u64 {
    repo.add_entity(Entity::Raw(RawEntity::complex(body)))
}

fn id_list(ids: Vec<u64>) -> String {
    let items: Vec<String> = ids.into_iter().map(|id| format!("#{id}")).collect();
    format!("({})", items.join(","))
}

/// Product, unit and context records for an AP214 part.
fn add_shared_records(repo: &mut Repository, product_name: &str) -> SharedRecords {
    let name = quote(product_name);
    let application = add_raw(
        repo,
        "APPLICATION_CONTEXT",
        "'core data for automotive mechanical design processes'",
    );
    add_raw(
        repo,
        "APPLICATION_PROTOCOL_DEFINITION",
        format!("'international standard','automotive_design',2000,#{application}"),
    );
    let product_context = add_raw(
        repo,
        "PRODUCT_CONTEXT",
        format!("'',#{application},'mechanical'"),
    );
    let product = add_raw(
        repo,
        "PRODUCT",
        format!("{name},{name},'',(#{product_context})"),
    );
    add_raw(
        repo,
        "PRODUCT_RELATED_PRODUCT_CATEGORY",
        format!("'part',$,(#{product})"),
    );
    let formation = add_raw(
        repo,
        "PRODUCT_DEFINITION_FORMATION",
        format!("'','',#{product}"),
    );
    let definition_context = add_raw(
        repo,
        "PRODUCT_DEFINITION_CONTEXT",
        format!("'part definition',#{application},'design'"),
    );
    let definition = add_raw(
        repo,
        "PRODUCT_DEFINITION",
        format!("'design','',#{formation},#{definition_context}"),
    );
    let product_shape = add_raw(
        repo,
        "PRODUCT_DEFINITION_SHAPE",
        format!("'','',#{definition}"),
    );

    let length = add_complex(repo, "LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.)");
    let angle = add_complex(repo, "NAMED_UNIT(*) PLANE_ANGLE_UNIT() SI_UNIT($,.RADIAN.)");
    let solid_angle = add_complex(repo, "NAMED_UNIT(*) SI_UNIT($,.STERADIAN.) SOLID_ANGLE_UNIT()");
    let uncertainty = add_raw(
        repo,
        "UNCERTAINTY_MEASURE_WITH_UNIT",
        format!("LENGTH_MEASURE(1.E-07),#{length},'distance_accuracy_value','confusion accuracy'"),
    );
    let context = add_complex(
        repo,
        format!(
            "GEOMETRIC_REPRESENTATION_CONTEXT(3) \
             GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{uncertainty})) \
             GLOBAL_UNIT_ASSIGNED_CONTEXT((#{length},#{angle},#{solid_angle})) \
             REPRESENTATION_CONTEXT('Context #1','3D Context with UNIT and UNCERTAINTY')"
        ),
    );
    let origin = add_placement(repo, DVec3::ZERO, DVec3::Z, DVec3::X);

    SharedRecords {
        context,
        product_shape,
        origin,
    }
}

/// `COLOUR_RGB` through `STYLED_ITEM` for one solid. Returns the styled
/// item id.
fn add_style(repo: &mut Repository, solid: Ref<Solid>, color: [f64; 3]) -> u64 {
    let [r, g, b] = color.map(|c| real(c.clamp(0.0, 1.0)));
    let colour = add_raw(repo, "COLOUR_RGB", format!("'',{r},{g},{b}"));
    let fill_colour = add_raw(repo, "FILL_AREA_STYLE_COLOUR", format!("'',#{colour}"));
    let fill = add_raw(repo, "FILL_AREA_STYLE", format!("'',(#{fill_colour})"));
    let surface_fill = add_raw(repo, "SURFACE_STYLE_FILL_AREA", format!("#{fill}"));
    let side = add_raw(repo, "SURFACE_SIDE_STYLE", format!("'',(#{surface_fill})"));
    let usage = add_raw(repo, "SURFACE_STYLE_USAGE", format!(".BOTH.,#{side}"));
    let assignment = add_raw(repo, "PRESENTATION_STYLE_ASSIGNMENT", format!("(#{usage})"));
    add_raw(
        repo,
        "STYLED_ITEM",
        format!("'color',(#{assignment}),#{}", solid.id()),
    )
}

/// Converts `records` with a default-fetching [`Converter`].
///
/// # Errors
///
/// See [`Converter::convert`].
pub async fn convert_circuit_to_step(
    records: &[CircuitRecord],
    options: ConversionOptions,
) -> Result<Conversion, ConversionError> {
    Converter::new(options).convert(records).await
}
