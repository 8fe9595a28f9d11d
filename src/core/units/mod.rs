//! Dimensional unit conversion.
//!
//! A [`UnitRegistry`] maps unit names and synonyms (English and Spanish) to a
//! [`UnitDef`]: a dimension plus an affine mapping onto that dimension's base unit.
//! [`engine::UnitEngine`] finds convertible fields in a document and rewrites them.

pub mod detect;
pub mod engine;
pub mod registry;

pub use detect::{Candidate, Shape};
pub use engine::{ConversionRecord, ConversionReport, TargetSpec, UnitEngine};
pub use registry::{normalize_token, profile, UnitRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical category governing which units may be converted into each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Length,
    Mass,
    Volume,
    Pressure,
    Temperature,
    Speed,
    Area,
    Dimensionless,
}

impl Dimension {
    pub const ALL: [Dimension; 8] = [
        Dimension::Length,
        Dimension::Mass,
        Dimension::Volume,
        Dimension::Pressure,
        Dimension::Temperature,
        Dimension::Speed,
        Dimension::Area,
        Dimension::Dimensionless,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Length => "length",
            Dimension::Mass => "mass",
            Dimension::Volume => "volume",
            Dimension::Pressure => "pressure",
            Dimension::Temperature => "temperature",
            Dimension::Speed => "speed",
            Dimension::Area => "area",
            Dimension::Dimensionless => "dimensionless",
        }
    }

    /// Accepts English and Spanish category names.
    pub fn from_name(name: &str) -> Option<Dimension> {
        match crate::core::document::nkey(name).as_str() {
            "length" | "longitud" | "distance" | "distancia" => Some(Dimension::Length),
            "mass" | "masa" | "weight" | "peso" => Some(Dimension::Mass),
            "volume" | "volumen" | "capacity" | "capacidad" => Some(Dimension::Volume),
            "pressure" | "presion" => Some(Dimension::Pressure),
            "temperature" | "temperatura" => Some(Dimension::Temperature),
            "speed" | "velocity" | "velocidad" => Some(Dimension::Speed),
            "area" | "superficie" => Some(Dimension::Area),
            "dimensionless" | "count" | "cantidad" | "unidades" => Some(Dimension::Dimensionless),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `base = (value + offset) * factor`. Offset is non-zero only for temperatures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitDef {
    pub symbol: String,
    pub dimension: Dimension,
    pub factor: f64,
    pub offset: f64,
}

impl UnitDef {
    pub fn new(symbol: impl Into<String>, dimension: Dimension, factor: f64) -> Self {
        Self {
            symbol: symbol.into(),
            dimension,
            factor,
            offset: 0.0,
        }
    }

    pub fn to_base(&self, value: f64) -> f64 {
        (value + self.offset) * self.factor
    }

    pub fn from_base(&self, base: f64) -> f64 {
        base / self.factor - self.offset
    }

    /// Same dimension and the same mapping onto the base unit.
    pub fn is_compatible(&self, other: &UnitDef) -> bool {
        let scale = self.factor.abs().max(other.factor.abs()).max(f64::MIN_POSITIVE);
        self.dimension == other.dimension
            && ((self.factor - other.factor).abs() / scale) < 1e-9
            && (self.offset - other.offset).abs() < 1e-9
    }
}

/// A magnitude in a known unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: UnitDef,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: UnitDef) -> Self {
        Self { magnitude, unit }
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension
    }

    pub fn convert_to(&self, target: &UnitDef) -> Result<Quantity, UnitError> {
        if self.dimension() != target.dimension {
            return Err(UnitError::DimensionMismatch {
                from: self.unit.symbol.clone(),
                from_dimension: self.dimension(),
                to: target.symbol.clone(),
                to_dimension: target.dimension,
            });
        }
        let magnitude = target.from_base(self.unit.to_base(self.magnitude));
        if !magnitude.is_finite() {
            return Err(UnitError::InvalidDefinition {
                name: target.symbol.clone(),
                reason: "conversion produced a non-finite value".to_string(),
            });
        }
        Ok(Quantity::new(magnitude, target.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("cannot convert {from} ({from_dimension}) to {to} ({to_dimension})")]
    DimensionMismatch {
        from: String,
        from_dimension: Dimension,
        to: String,
        to_dimension: Dimension,
    },

    #[error("no target unit for dimension {0}")]
    NoTarget(Dimension),

    #[error("unit '{name}' is already registered with an incompatible definition")]
    Conflict { name: String },

    #[error("invalid unit definition for '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },
}
