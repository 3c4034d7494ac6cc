//! Building layer model and population attribute handling

use geo::MultiPolygon;
use serde_json::Value;

use crate::Error;
use crate::model::Crs;

/// Attribute column kind, as inferred from the source layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Real,
    Text,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Real)
    }
}

/// Attribute column descriptor of a building layer.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Building footprint with its raw population attribute value.
///
/// The attribute stays raw (`serde_json::Value`) so that parsing remains
/// a per-building recoverable step during aggregation: a malformed value
/// in one building never aborts the overlay.
#[derive(Debug, Clone)]
pub struct Building {
    pub footprint: MultiPolygon<f64>,
    pub population: Value,
}

/// Read-only building layer in a single CRS.
#[derive(Debug, Clone)]
pub struct BuildingLayer {
    buildings: Vec<Building>,
    fields: Vec<FieldDescriptor>,
    crs: Crs,
}

impl BuildingLayer {
    pub fn new(buildings: Vec<Building>, fields: Vec<FieldDescriptor>, crs: Crs) -> Self {
        Self {
            buildings,
            fields,
            crs,
        }
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

/// Field names that hold population counts in the survey datasets this
/// tool was written against, tried as exact matches first.
const EXACT_CANDIDATES: &[&str] = &["Насел", "att_mn", "att_nig", "population", "pop"];

/// Candidates tried as case-insensitive substrings of the field name.
const SUBSTRING_CANDIDATES: &[&str] = &[
    "population",
    "pop",
    "население",
    "жители",
    "people",
    "residents",
    "жильцы",
];

/// Identifier-like fields that the numeric fallback must never pick.
const ID_FIELDS: &[&str] = &["no", "id", "fid", "objectid"];

/// Resolves which attribute column carries population counts.
///
/// Exact candidate names win, then case-insensitive substring matches,
/// then the first numeric column that is not an identifier.
///
/// # Errors
///
/// Returns [`Error::FieldNotFound`] when no column qualifies.
pub fn resolve_population_field(fields: &[FieldDescriptor]) -> Result<String, Error> {
    for candidate in EXACT_CANDIDATES {
        if let Some(field) = fields.iter().find(|f| f.name == *candidate) {
            return Ok(field.name.clone());
        }
    }

    for candidate in SUBSTRING_CANDIDATES {
        if let Some(field) = fields
            .iter()
            .find(|f| f.name.to_lowercase().contains(candidate))
        {
            return Ok(field.name.clone());
        }
    }

    fields
        .iter()
        .find(|f| f.kind.is_numeric() && !ID_FIELDS.contains(&f.name.to_lowercase().as_str()))
        .map(|f| f.name.clone())
        .ok_or(Error::FieldNotFound)
}

/// Parses a raw population attribute value.
///
/// Accepts numbers and numeric strings, normalizing comma decimal
/// separators ("12,5" becomes 12.5). Returns `None` for null, empty or
/// non-numeric values; callers treat those as zero population.
pub fn parse_population(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let normalized = s.trim().replace(',', ".");
            if normalized.is_empty() {
                None
            } else {
                normalized.parse().ok()
            }
        }
        _ => None,
    }
}
