use super::{Dimension, Quantity, UnitDef, UnitError};
use crate::core::document::nkey;
use std::collections::HashMap;
use std::sync::RwLock;

struct Builtin {
    symbol: &'static str,
    dimension: Dimension,
    factor: f64,
    offset: f64,
    aliases: &'static [&'static str],
}

const fn unit(
    symbol: &'static str,
    dimension: Dimension,
    factor: f64,
    aliases: &'static [&'static str],
) -> Builtin {
    Builtin {
        symbol,
        dimension,
        factor,
        offset: 0.0,
        aliases,
    }
}

use Dimension::*;

const BUILTINS: &[Builtin] = &[
    // length, base m
    unit("mm", Length, 1e-3, &["milimetro", "milimetros", "millimeter", "millimeters", "millimetre"]),
    unit("cm", Length, 1e-2, &["centimetro", "centimetros", "centimeter", "centimeters", "centimetre"]),
    unit("m", Length, 1.0, &["mt", "mts", "metro", "metros", "meter", "meters", "metre", "metres"]),
    unit("km", Length, 1e3, &["kilometro", "kilometros", "kilometer", "kilometers", "kilometre"]),
    unit("µm", Length, 1e-6, &["μm", "um", "micron", "microns", "micrometro", "micrometer"]),
    unit("in", Length, 0.0254, &["inch", "inches", "pulgada", "pulgadas", "\"", "''"]),
    unit("ft", Length, 0.3048, &["foot", "feet", "pie", "pies", "'"]),
    unit("yd", Length, 0.9144, &["yard", "yards", "yarda", "yardas"]),
    unit("mi", Length, 1609.344, &["mile", "miles", "milla", "millas"]),
    // mass, base kg
    unit("mg", Mass, 1e-6, &["miligramo", "miligramos", "milligram", "milligrams"]),
    unit("g", Mass, 1e-3, &["gr", "grs", "gramo", "gramos", "gram", "grams"]),
    unit("kg", Mass, 1.0, &["kgs", "kilo", "kilos", "kilogramo", "kilogramos", "kilogram", "kilograms"]),
    unit("t", Mass, 1e3, &["tn", "ton", "tonelada", "toneladas", "tonne", "tonnes"]),
    unit("lb", Mass, 0.45359237, &["lbs", "libra", "libras", "pound", "pounds"]),
    unit("oz", Mass, 0.028349523125, &["onza", "onzas", "ounce", "ounces"]),
    // volume, base L
    unit("mL", Volume, 1e-3, &["ml", "mililitro", "mililitros", "milliliter", "milliliters", "cm^3", "cc"]),
    unit("L", Volume, 1.0, &["l", "lt", "lts", "litro", "litros", "liter", "liters", "litre", "litres"]),
    unit("m^3", Volume, 1e3, &["metrocubico", "metroscubicos", "cubicmeter", "cubicmeters"]),
    unit("mm^3", Volume, 1e-6, &[]),
    unit("gal", Volume, 3.785411784, &["galon", "galones", "gallon", "gallons"]),
    unit("qt", Volume, 0.946352946, &["quart", "quarts"]),
    unit("pt", Volume, 0.473176473, &["pint", "pints", "pinta", "pintas"]),
    unit("fl_oz", Volume, 0.0295735295625, &["floz", "fluidounce", "fluidounces"]),
    // pressure, base Pa
    unit("Pa", Pressure, 1.0, &["pascal", "pascales", "pascals"]),
    unit("kPa", Pressure, 1e3, &["kilopascal", "kilopascales", "kilopascals"]),
    unit("MPa", Pressure, 1e6, &["megapascal", "megapascales", "megapascals"]),
    unit("bar", Pressure, 1e5, &["bares", "bars"]),
    unit("mbar", Pressure, 100.0, &["milibar", "millibar", "millibars"]),
    unit("psi", Pressure, 6894.757293168, &[]),
    unit("atm", Pressure, 101325.0, &["atmosfera", "atmosferas", "atmosphere", "atmospheres"]),
    // speed, base m/s
    unit("m/s", Speed, 1.0, &["mps", "metrosporsegundo", "meterspersecond"]),
    unit("km/h", Speed, 1.0 / 3.6, &["kmh", "kph", "km/hr", "kilometrosporhora", "kilometersperhour"]),
    unit("mph", Speed, 0.44704, &["mi/h", "millasporhora", "milesperhour"]),
    unit("kn", Speed, 0.514444444444, &["kt", "knot", "knots", "nudo", "nudos"]),
    // area, base m^2
    unit("mm^2", Area, 1e-6, &[]),
    unit("cm^2", Area, 1e-4, &[]),
    unit("m^2", Area, 1.0, &["metrocuadrado", "metroscuadrados", "squaremeter", "squaremeters"]),
    unit("km^2", Area, 1e6, &[]),
    unit("in^2", Area, 0.00064516, &["sqin"]),
    unit("ft^2", Area, 0.09290304, &["sqft"]),
    unit("ha", Area, 1e4, &["hectarea", "hectareas", "hectare", "hectares"]),
    unit("acre", Area, 4046.8564224, &["acres"]),
    // counts, base unit
    unit("unit", Dimensionless, 1.0, &["units", "unidad", "unidades", "u", "ud", "uds", "un", "pcs", "pc", "pieza", "piezas", "piece", "pieces", "ea", "each"]),
    unit("dozen", Dimensionless, 12.0, &["dozens", "docena", "docenas"]),
];

const TEMPERATURES: &[Builtin] = &[
    Builtin {
        symbol: "degC",
        dimension: Temperature,
        factor: 1.0,
        offset: 273.15,
        aliases: &["°c", "c", "celsius", "gradoscelsius", "gradosc", "centigrados"],
    },
    Builtin {
        symbol: "degF",
        dimension: Temperature,
        factor: 5.0 / 9.0,
        offset: 459.67,
        aliases: &["°f", "f", "fahrenheit", "gradosfahrenheit", "gradosf"],
    },
    Builtin {
        symbol: "K",
        dimension: Temperature,
        factor: 1.0,
        offset: 0.0,
        aliases: &["kelvin", "kelvins"],
    },
];

/// Canonical lookup form of a unit token: folded, spaceless, with `^` exponents.
///
/// `"m²"`, `"M2"` and `"m 2"` all become `"m^2"`; `"Kilómetros."` becomes `"kilometros"`.
pub fn normalize_token(raw: &str) -> String {
    let mut token: String = nkey(raw)
        .replace('º', "°")
        .replace('²', "^2")
        .replace('³', "^3")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    while token.ends_with('.') {
        token.pop();
    }
    let bytes = token.as_bytes();
    if bytes.len() >= 2 && !token.contains('^') {
        let last = bytes[bytes.len() - 1];
        let prev = bytes[bytes.len() - 2];
        if (last == b'2' || last == b'3') && prev.is_ascii_alphabetic() {
            token.insert(token.len() - 1, '^');
        }
    }
    token
}

/// Per-dimension targets for a named measurement system.
pub fn profile(name: &str) -> Option<HashMap<Dimension, &'static str>> {
    let entries: &[(Dimension, &'static str)] = match nkey(name).as_str() {
        "imperial" | "imperiales" | "us" | "usa" => &[
            (Length, "ft"),
            (Mass, "lb"),
            (Volume, "gal"),
            (Pressure, "psi"),
            (Area, "ft^2"),
            (Temperature, "degF"),
            (Speed, "mph"),
        ],
        "metric" | "metrico" | "si" | "mks" | "internacional" => &[
            (Length, "m"),
            (Mass, "kg"),
            (Volume, "L"),
            (Pressure, "bar"),
            (Area, "m^2"),
            (Temperature, "degC"),
            (Speed, "km/h"),
        ],
        _ => return None,
    };
    Some(entries.iter().copied().collect())
}

/// Append-only unit table shared by every document in a run.
pub struct UnitRegistry {
    units: RwLock<HashMap<String, UnitDef>>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    pub fn new() -> Self {
        let mut units = HashMap::new();
        for builtin in BUILTINS.iter().chain(TEMPERATURES) {
            let def = UnitDef {
                symbol: builtin.symbol.to_string(),
                dimension: builtin.dimension,
                factor: builtin.factor,
                offset: builtin.offset,
            };
            units.insert(normalize_token(builtin.symbol), def.clone());
            for alias in builtin.aliases {
                units.insert(normalize_token(alias), def.clone());
            }
        }
        Self {
            units: RwLock::new(units),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<UnitDef> {
        let token = normalize_token(name);
        if token.is_empty() {
            return None;
        }
        let units = self.units.read().ok()?;
        if let Some(def) = units.get(&token) {
            return Some(def.clone());
        }
        singular_forms(&token)
            .into_iter()
            .find_map(|candidate| units.get(&candidate).cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn quantity(&self, magnitude: f64, unit: &str) -> Result<Quantity, UnitError> {
        let def = self
            .lookup(unit)
            .ok_or_else(|| UnitError::UnknownUnit(unit.to_string()))?;
        Ok(Quantity::new(magnitude, def))
    }

    /// Register `def` under `name`. Re-registering a compatible definition is a no-op.
    pub fn register(&self, name: &str, def: UnitDef) -> Result<UnitDef, UnitError> {
        let token = normalize_token(name);
        if token.is_empty() {
            return Err(UnitError::InvalidDefinition {
                name: name.to_string(),
                reason: "empty unit name".to_string(),
            });
        }
        let mut units = self
            .units
            .write()
            .map_err(|_| UnitError::InvalidDefinition {
                name: name.to_string(),
                reason: "unit registry lock poisoned".to_string(),
            })?;
        if let Some(existing) = units.get(&token) {
            if existing.is_compatible(&def) {
                return Ok(existing.clone());
            }
            return Err(UnitError::Conflict {
                name: name.to_string(),
            });
        }
        tracing::debug!(unit = %token, dimension = %def.dimension, factor = def.factor, "registered unit");
        units.insert(token.clone(), def.clone());
        for alias in plural_forms(&token) {
            units.entry(alias).or_insert_with(|| def.clone());
        }
        Ok(def)
    }

    /// Define `1 name = amount reference` and register it.
    pub fn define(&self, name: &str, amount: f64, reference: &str) -> Result<UnitDef, UnitError> {
        let reference_def = self
            .lookup(reference)
            .ok_or_else(|| UnitError::UnknownUnit(reference.to_string()))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(UnitError::InvalidDefinition {
                name: name.to_string(),
                reason: format!("amount must be positive, got {}", amount),
            });
        }
        if reference_def.offset != 0.0 {
            return Err(UnitError::InvalidDefinition {
                name: name.to_string(),
                reason: "cannot scale an offset unit".to_string(),
            });
        }
        let symbol = nkey(name);
        let def = UnitDef::new(
            symbol.clone(),
            reference_def.dimension,
            amount * reference_def.factor,
        );
        self.register(&symbol, def)
    }
}

fn singular_forms(token: &str) -> Vec<String> {
    let mut out = Vec::new();
    if token.len() > 3 {
        if let Some(stem) = token.strip_suffix("es") {
            out.push(stem.to_string());
        }
    }
    if token.len() > 2 {
        if let Some(stem) = token.strip_suffix('s') {
            out.push(stem.to_string());
        }
    }
    out
}

fn plural_forms(token: &str) -> Vec<String> {
    if token.ends_with('s') {
        return singular_forms(token);
    }
    let last_is_vowel = token.ends_with(['a', 'e', 'i', 'o', 'u']);
    if last_is_vowel {
        vec![format!("{}s", token)]
    } else {
        vec![format!("{}s", token), format!("{}es", token)]
    }
}
