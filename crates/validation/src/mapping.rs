//! Attribute name <-> source label resolution per entity level.
//!
//! Also decides which attributes a surface subtype is validated for, and
//! fans raw thematic properties out into per-attribute reference rows.

use std::collections::BTreeMap;

use crate::config::AttributesConfig;
use crate::model::{EntityLevel, ReferenceRecord, SurfaceKind, ThematicProperty};

/// Attributes whose meaning is tied to an inclined plane; only roofs carry them.
const ROOF_ONLY_ATTRIBUTES: &[&str] = &["tilt", "azimuth"];

const ROOF_ONLY: &[SurfaceKind] = &[SurfaceKind::Roof];

/// Surface subtypes an attribute is validated for. `None` means every subtype.
pub fn surface_type_filter(attribute_name: &str) -> Option<&'static [SurfaceKind]> {
    if ROOF_ONLY_ATTRIBUTES.contains(&attribute_name) {
        Some(ROOF_ONLY)
    } else {
        None
    }
}

pub fn applies_to(attribute_name: &str, kind: SurfaceKind) -> bool {
    surface_type_filter(attribute_name).map_or(true, |kinds| kinds.contains(&kind))
}

/// Computed attribute name <-> reference source label, for one entity level.
///
/// Several computed attributes may share one label (`min_height` and
/// `max_height` both read `value`), so the reverse direction maps a label
/// to every attribute that reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMapping {
    level: EntityLevel,
    by_attribute: BTreeMap<String, String>,
    by_label: BTreeMap<String, Vec<String>>,
}

impl AttributeMapping {
    /// Resolve the mapping for `level` from the attribute config.
    ///
    /// Entries without a source label are skipped.
    pub fn resolve(config: &AttributesConfig, level: EntityLevel) -> Self {
        let pairs = config
            .for_level(level)
            .values()
            .filter(|spec| spec.is_mapped())
            .flat_map(|spec| {
                let label = spec.source_label.trim();
                spec.computed_names()
                    .into_iter()
                    .map(move |name| (name.to_string(), label.to_string()))
            });

        Self::from_pairs(level, pairs)
    }

    /// Build from explicit (computed name, source label) pairs. Empty labels are skipped.
    pub fn from_pairs<A, L>(level: EntityLevel, pairs: impl IntoIterator<Item = (A, L)>) -> Self
    where
        A: Into<String>,
        L: Into<String>,
    {
        let mut by_attribute = BTreeMap::new();
        for (attribute, label) in pairs {
            let label = label.into();
            if label.trim().is_empty() {
                continue;
            }
            by_attribute.insert(attribute.into(), label);
        }

        let mut by_label: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (attribute, label) in &by_attribute {
            by_label.entry(label.clone()).or_default().push(attribute.clone());
        }

        Self {
            level,
            by_attribute,
            by_label,
        }
    }

    pub fn level(&self) -> EntityLevel {
        self.level
    }

    /// (computed name, source label) pairs, ordered by computed name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_attribute.iter().map(|(a, l)| (a.as_str(), l.as_str()))
    }

    pub fn source_label(&self, attribute_name: &str) -> Option<&str> {
        self.by_attribute.get(attribute_name).map(String::as_str)
    }

    pub fn attributes_for_label(&self, source_label: &str) -> &[String] {
        self.by_label.get(source_label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_attribute.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_attribute.is_empty()
    }

    /// Split into the attributes validated for `kind` and the names filtered out.
    pub fn restricted_to(&self, kind: SurfaceKind) -> (Self, Vec<String>) {
        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .by_attribute
            .iter()
            .partition(|(attribute, _)| applies_to(attribute, kind));

        let mapping = Self::from_pairs(
            self.level,
            kept.into_iter().map(|(a, l)| (a.clone(), l.clone())),
        );
        (mapping, dropped.into_iter().map(|(a, _)| a.clone()).collect())
    }

    /// Normalize raw properties into per-attribute reference rows.
    ///
    /// A property fans out to every attribute sharing its label; properties
    /// with unmapped labels are dropped.
    pub fn expand_reference(&self, properties: &[ThematicProperty]) -> Vec<ReferenceRecord> {
        let mut out = Vec::new();
        for prop in properties {
            for attribute in self.attributes_for_label(&prop.source_label) {
                out.push(ReferenceRecord {
                    feature_id: prop.feature_id,
                    attribute_name: attribute.clone(),
                    thematic_value: prop.value,
                });
            }
        }
        out
    }
}
