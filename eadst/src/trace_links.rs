//! Field tracing: linking outbreak premises with trace-back / trace-forward lines

use layerstore::{
    Coord, Feature, FeatureId, FeatureStore, FieldType, Geometry, GeometryKind, LayerSpec, NewFeature, StoreError,
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::records::OUTBREAK_LAYER;

/// Line layer holding trace links
pub const TRACE_LAYER: &str = "Trace_Links";

/// Default pick radius, in layer units
pub const DEFAULT_SEARCH_RADIUS: f64 = 0.01;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Layer Outbreak_Points must exist to start tracing")]
    NoOutbreakLayer,

    #[error("No outbreak point within {radius} of ({x}, {y})")]
    NothingNearby { x: f64, y: f64, radius: f64 },

    #[error("Cannot link feature {0} to itself")]
    SelfLink(FeatureId),

    #[error("Feature {0} is not a point")]
    NotAPoint(FeatureId),

    #[error("Unknown trace direction {0:?} (expected back or forward)")]
    UnknownDirection(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which way infection is thought to have moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirection {
    /// Linked premise is the suspected source of the index case
    Back,
    /// Index case may have infected the linked premise
    Forward,
}

impl TraceDirection {
    pub fn label(&self) -> &'static str {
        match self {
            TraceDirection::Back => "Trace-Back",
            TraceDirection::Forward => "Trace-Forward",
        }
    }
}

impl fmt::Display for TraceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TraceDirection {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "back" | "trace-back" | "traceback" => Ok(TraceDirection::Back),
            "forward" | "trace-forward" | "traceforward" => Ok(TraceDirection::Forward),
            _ => Err(TraceError::UnknownDirection(s.to_string())),
        }
    }
}

/// Schema of the trace link layer
pub fn trace_layer_spec(crs: &str) -> LayerSpec {
    LayerSpec::new(TRACE_LAYER, GeometryKind::LineString, crs)
        .field("Source_ID", FieldType::Text)
        .field("Dest_ID", FieldType::Text)
        .field("Trace_Type", FieldType::Text)
}

/// Closest feature to `click` no farther than `radius`; ties go to the lowest id
pub fn nearest_feature(features: &[Feature], click: Coord, radius: f64) -> Option<&Feature> {
    features
        .iter()
        .map(|f| (f.geometry.distance_to(&click), f))
        .filter(|(d, _)| *d <= radius)
        .min_by(|(da, fa), (db, fb)| da.total_cmp(db).then(fa.id.cmp(&fb.id)))
        .map(|(_, f)| f)
}

/// Event ID of an outbreak feature, falling back to its feature id
fn event_label(feature: &Feature) -> String {
    feature
        .get("Event_ID")
        .as_text()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| feature.id.to_string())
}

/// Result of one pick
#[derive(Debug, Clone, PartialEq)]
pub enum TracePick {
    /// First pick: the index case is now selected
    IndexCase(Feature),
    /// Second pick: both ends of a link are known; the tracer is reset
    Pair { index: Feature, linked: Feature },
}

/// Two-step picker: index case first, then the linked premise
#[derive(Debug, Clone)]
pub struct FieldTracer {
    radius: f64,
    index_case: Option<Feature>,
}

impl FieldTracer {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            index_case: None,
        }
    }

    pub fn index_case(&self) -> Option<&Feature> {
        self.index_case.as_ref()
    }

    pub fn reset(&mut self) {
        self.index_case = None;
    }

    /// Pick the outbreak point nearest `click`.
    ///
    /// Picking the index case again as the linked premise is rejected and
    /// keeps the index case selected.
    pub fn pick(&mut self, store: &dyn FeatureStore, click: Coord) -> Result<TracePick, TraceError> {
        debug!(x = click.x, y = click.y, radius = self.radius, "FieldTracer::pick: called");
        if store.find_layer(OUTBREAK_LAYER)?.is_none() {
            return Err(TraceError::NoOutbreakLayer);
        }
        let features = store.features(OUTBREAK_LAYER)?;
        let picked = nearest_feature(&features, click, self.radius)
            .cloned()
            .ok_or(TraceError::NothingNearby {
                x: click.x,
                y: click.y,
                radius: self.radius,
            })?;

        match self.index_case.take() {
            None => {
                info!(id = picked.id, event = %event_label(&picked), "Index case selected");
                self.index_case = Some(picked.clone());
                Ok(TracePick::IndexCase(picked))
            }
            Some(index) if index.id == picked.id => {
                let id = index.id;
                self.index_case = Some(index);
                Err(TraceError::SelfLink(id))
            }
            Some(index) => Ok(TracePick::Pair { index, linked: picked }),
        }
    }
}

/// Append a trace link between `index` and `linked` to the trace layer.
///
/// Trace-back draws linked → index with the linked premise as source;
/// trace-forward draws index → linked with the index case as source.
pub fn create_link(
    store: &mut dyn FeatureStore,
    index: &Feature,
    linked: &Feature,
    direction: TraceDirection,
    crs: &str,
) -> Result<FeatureId, TraceError> {
    if index.id == linked.id {
        return Err(TraceError::SelfLink(index.id));
    }
    let index_point = index.geometry.as_point().ok_or(TraceError::NotAPoint(index.id))?;
    let linked_point = linked.geometry.as_point().ok_or(TraceError::NotAPoint(linked.id))?;

    let (source, dest, from, to) = match direction {
        TraceDirection::Back => (linked, index, linked_point, index_point),
        TraceDirection::Forward => (index, linked, index_point, linked_point),
    };

    let layer = store.get_or_create(&trace_layer_spec(crs))?;
    let feature = NewFeature::new(Geometry::line(from, to))
        .with("Source_ID", event_label(source))
        .with("Dest_ID", event_label(dest))
        .with("Trace_Type", direction.label());
    let ids = store.append(&layer.name, vec![feature])?;
    let id = ids.first().copied().ok_or_else(|| StoreError::Corrupt {
        layer: layer.name.clone(),
        message: "append returned no id".to_string(),
    })?;

    info!(%direction, source = %event_label(source), dest = %event_label(dest), "Created trace link");
    Ok(id)
}
