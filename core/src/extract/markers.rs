use crate::error::{CoreError, CoreResult};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TRIGGER_MARKERS_VERSION: &str = "trigger_markers_v1";

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerClass {
    CONNECTIVE,
    THRESHOLD,
    DURATION,
    TIMING,
}

/// Where the condition text sits relative to the marker.
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Placement {
    /// Postpositional: clause start through the marker.
    SUFFIX,
    /// Prepositional: marker through the clause end.
    PREFIX,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerDef {
    pub marker_id: String,
    pub class: MarkerClass,
    pub pattern: String,
    pub placement: Placement,
    #[serde(default)]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerCatalog {
    pub catalog_version: String,
    pub trigger_classes: Vec<MarkerClass>,
    pub temporal_classes: Vec<MarkerClass>,
    pub markers: Vec<MarkerDef>,
}

impl MarkerCatalog {
    pub fn embedded() -> CoreResult<Self> {
        let json = include_str!("trigger_markers_v1.json");
        let catalog: MarkerCatalog = serde_json::from_str(json)?;
        if catalog.catalog_version != TRIGGER_MARKERS_VERSION {
            return Err(CoreError::Config(
                "embedded marker catalog is not trigger_markers_v1".to_string(),
            ));
        }
        Ok(catalog)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledMarker {
    pub marker_id: String,
    pub class: MarkerClass,
    pub placement: Placement,
    pub regex: Regex,
}

/// Marker catalog with every pattern compiled. Built once per engine.
#[derive(Debug, Clone)]
pub struct CompiledMarkers {
    markers: Vec<CompiledMarker>,
    trigger_classes: BTreeSet<MarkerClass>,
    temporal_classes: BTreeSet<MarkerClass>,
}

impl CompiledMarkers {
    pub fn compile(catalog: &MarkerCatalog) -> CoreResult<Self> {
        let mut seen = BTreeSet::new();
        let mut markers = Vec::with_capacity(catalog.markers.len());
        for def in &catalog.markers {
            if !seen.insert(def.marker_id.as_str()) {
                return Err(CoreError::Config(format!(
                    "duplicate marker id {}",
                    def.marker_id
                )));
            }
            let regex = RegexBuilder::new(&def.pattern)
                .case_insensitive(def.case_insensitive)
                .build()
                .map_err(|e| {
                    CoreError::Config(format!(
                        "marker {} has an invalid pattern: {}",
                        def.marker_id, e
                    ))
                })?;
            markers.push(CompiledMarker {
                marker_id: def.marker_id.clone(),
                class: def.class,
                placement: def.placement,
                regex,
            });
        }
        Ok(Self {
            markers,
            trigger_classes: catalog.trigger_classes.iter().copied().collect(),
            temporal_classes: catalog.temporal_classes.iter().copied().collect(),
        })
    }

    /// Markers that may start an extracted condition, in catalog order.
    pub fn triggers(&self) -> impl Iterator<Item = &CompiledMarker> {
        self.markers
            .iter()
            .filter(move |m| self.trigger_classes.contains(&m.class))
    }

    pub fn has_temporal(&self, text: &str) -> bool {
        self.markers
            .iter()
            .filter(|m| self.temporal_classes.contains(&m.class))
            .any(|m| m.regex.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
