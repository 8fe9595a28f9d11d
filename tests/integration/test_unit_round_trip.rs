use docplan::core::units::{Dimension, UnitEngine, UnitError, UnitRegistry};
use serde_json::json;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9 * b.abs().max(1.0)
}

#[test]
fn test_length_and_mass_round_trip() {
    let registry = UnitRegistry::new();
    for (value, from, via) in [
        (12.5, "cm", "in"),
        (3.0, "km", "mi"),
        (250.0, "g", "oz"),
        (2.0, "L", "gal"),
        (1.2, "bar", "psi"),
    ] {
        let original = registry.quantity(value, from).unwrap();
        let there = original.convert_to(&registry.lookup(via).unwrap()).unwrap();
        let back = there.convert_to(&original.unit).unwrap();
        assert!(close(back.magnitude, value), "{} {} via {}", value, from, via);
    }
}

#[test]
fn test_temperature_uses_offsets() {
    let registry = UnitRegistry::new();
    let boiling = registry.quantity(100.0, "celsius").unwrap();
    let fahrenheit = boiling.convert_to(&registry.lookup("degF").unwrap()).unwrap();
    assert!(close(fahrenheit.magnitude, 212.0));
    let kelvin = fahrenheit.convert_to(&registry.lookup("K").unwrap()).unwrap();
    assert!(close(kelvin.magnitude, 373.15));
}

#[test]
fn test_aliases_resolve_in_both_languages() {
    let registry = UnitRegistry::new();
    for alias in ["milímetros", "millimeters", "MM", "pulgadas", "inches", "m²", "kilos"] {
        assert!(registry.contains(alias), "{}", alias);
    }
    assert_eq!(registry.lookup("pulgadas").unwrap().symbol, "in");
    assert_eq!(registry.lookup("m2").unwrap().dimension, Dimension::Area);
}

#[test]
fn test_custom_unit_definition_and_conflict() {
    let registry = UnitRegistry::new();
    registry.define("cajon", 10.0, "kg").unwrap();
    let crate_of = registry.quantity(3.0, "cajones").unwrap();
    let kilos = crate_of.convert_to(&registry.lookup("kg").unwrap()).unwrap();
    assert!(close(kilos.magnitude, 30.0));

    assert!(registry.define("cajon", 10.0, "kg").is_ok());
    assert!(matches!(
        registry.define("cajon", 12.0, "kg"),
        Err(UnitError::Conflict { .. })
    ));
    assert!(registry.define("bolsa", 0.0, "kg").is_err());
}

#[test]
fn test_document_conversion_and_back() {
    let registry = UnitRegistry::new();
    let engine = UnitEngine::new(&registry, 6);
    let mut doc = json!({
        "items": [
            {"largo": "1,5 m", "ancho": {"valor": 40, "unidad": "cm"}},
            {"largo": "2 m", "ancho": {"valor": 35, "unidad": "cm"}}
        ]
    });
    let original = doc.clone();

    let to_inches = engine.resolve_name("in").unwrap();
    let report = engine.convert_document(&mut doc, &to_inches, &[]);
    assert_eq!(report.converted.len(), 4);
    assert!(report.skipped.is_empty());
    assert_eq!(doc["items"][1]["ancho"]["unidad"], "in");

    let to_metric = engine.resolve_name("metric").unwrap();
    engine.convert_document(&mut doc, &to_metric, &[]);
    assert_eq!(doc["items"][0]["largo"], "1.5 m");
    assert_eq!(doc["items"][0]["ancho"]["unidad"], "m");
    assert_ne!(doc, original);
}
