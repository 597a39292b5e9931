//! Field normalizer for loosely-structured delivery records.
//!
//! Incoming records come from spreadsheets and ad-hoc JSON exports, so the
//! same column shows up as `"Litros de entrega"`, `"LITROS"` or `"litros"`.
//! Keys are folded to a canonical spelling (no diacritics, lowercase,
//! underscores for whitespace) and each canonical field is resolved through
//! an ordered alias table.
//!
//! Pure functions only: no I/O, no allocation beyond the returned values.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Cell values that spreadsheet exports emit for an empty cell.
const MISSING_PLACEHOLDERS: &[&str] = &["nan", "none", "null"];

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// A field of a delivery point, independent of how the source spelled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Vehicle,
    Name,
    Day,
    Liters,
    Phone,
    Latitude,
    Longitude,
}

/// Ordered alias table: the first alias present in a record wins.
///
/// Aliases are written in their normalized form (see [`normalize_key`]).
pub const FIELD_ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Vehicle,
        &["camion", "id_camion", "camion_id", "vehiculo", "vehicle"],
    ),
    (
        CanonicalField::Name,
        &[
            "nombre",
            "jefe_hogar",
            "jefe_de_hogar",
            "nombre_jefe_de_hogar",
            "nombre_(jefe_de_hogar)",
            "name",
        ],
    ),
    (CanonicalField::Day, &["dia", "dia_asignado", "day"]),
    (
        CanonicalField::Liters,
        &["litros", "litros_de_entrega", "litros_entrega", "liters"],
    ),
    (CanonicalField::Phone, &["telefono", "fono", "phone"]),
    (CanonicalField::Latitude, &["latitud", "lat", "latitude"]),
    (
        CanonicalField::Longitude,
        &["longitud", "lon", "lng", "long", "longitude"],
    ),
];

impl CanonicalField {
    pub const ALL: &'static [CanonicalField] = &[
        Self::Vehicle,
        Self::Name,
        Self::Day,
        Self::Liters,
        Self::Phone,
        Self::Latitude,
        Self::Longitude,
    ];

    /// Ordered aliases for this field.
    pub fn aliases(self) -> &'static [&'static str] {
        FIELD_ALIASES
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Key and value normalization
// ---------------------------------------------------------------------------

/// Remove combining marks after canonical decomposition ("Camión" -> "Camion").
pub fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Fold a source key to its canonical spelling.
///
/// `"  Litros de Entrega "` -> `"litros_de_entrega"`, `"Día"` -> `"dia"`.
pub fn normalize_key(key: &str) -> String {
    let folded = strip_diacritics(key.trim()).to_lowercase();
    WHITESPACE_RE.replace_all(&folded, "_").into_owned()
}

/// Render a JSON value as trimmed text, or `None` when it carries no data.
///
/// Strings are trimmed; numbers and booleans use their JSON spelling.
/// `null`, arrays, objects, blank strings and spreadsheet placeholders such
/// as `"nan"` are all treated as absent.
pub fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() || is_missing_placeholder(&text) {
        None
    } else {
        Some(text)
    }
}

fn is_missing_placeholder(text: &str) -> bool {
    MISSING_PLACEHOLDERS
        .iter()
        .any(|p| text.eq_ignore_ascii_case(p))
}

/// Parse a number that may use a decimal comma (`"12,5"` -> `12.5`).
///
/// Returns `None` for unparsable or non-finite input.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let value: f64 = text.trim().replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

/// Lenient numeric read of a JSON value (number or numeric string).
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        other => value_text(other).and_then(|t| parse_decimal(&t)),
    }
}

// ---------------------------------------------------------------------------
// Normalized record
// ---------------------------------------------------------------------------

/// A record whose keys are normalized and whose values are present text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, String>,
}

impl NormalizedRecord {
    /// Normalize every key of a JSON object.
    ///
    /// Keys are visited in sorted order (`serde_json::Map` does not keep
    /// source order), so when two source keys fold to the same canonical key
    /// the one sorting first among those carrying a value is kept: `"Litros"`
    /// wins over `"litros"`.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut fields = BTreeMap::new();
        for (key, value) in object {
            if let Some(text) = value_text(value) {
                fields.entry(normalize_key(key)).or_insert(text);
            }
        }
        Self { fields }
    }

    /// Value of a canonical field, probing its aliases in order.
    pub fn resolve(&self, field: CanonicalField) -> Option<&str> {
        field
            .aliases()
            .iter()
            .find_map(|alias| self.fields.get(*alias))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> NormalizedRecord {
        NormalizedRecord::from_object(value.as_object().expect("object"))
    }

    #[test]
    fn normalize_key_strips_accents_case_and_spaces() {
        assert_eq!(normalize_key("Día"), "dia");
        assert_eq!(normalize_key("  ID Camión "), "id_camion");
        assert_eq!(normalize_key("Litros de\tEntrega"), "litros_de_entrega");
        assert_eq!(normalize_key("Teléfono"), "telefono");
    }

    #[test]
    fn every_alias_resolves_to_the_same_value() {
        for field in CanonicalField::ALL {
            for alias in field.aliases() {
                let mut object = Map::new();
                object.insert((*alias).to_string(), json!("valor"));
                let rec = NormalizedRecord::from_object(&object);
                assert_eq!(rec.resolve(*field), Some("valor"), "{field:?} via {alias}");
            }
        }
    }

    #[test]
    fn aliases_match_after_source_key_normalization() {
        let rec = record(json!({ "LITROS DE ENTREGA": "30", "Jefe de Hogar": "Ana" }));
        assert_eq!(rec.resolve(CanonicalField::Liters), Some("30"));
        assert_eq!(rec.resolve(CanonicalField::Name), Some("Ana"));
    }

    #[test]
    fn first_present_alias_wins() {
        let rec = record(json!({ "litros_entrega": "5", "litros": "7" }));
        assert_eq!(rec.resolve(CanonicalField::Liters), Some("7"));

        let rec = record(json!({ "litros_entrega": "5", "litros": "" }));
        assert_eq!(rec.resolve(CanonicalField::Liters), Some("5"));
    }

    #[test]
    fn placeholders_and_blanks_are_absent() {
        let rec = record(json!({
            "nombre": "  ",
            "telefono": "NaN",
            "dia": "None",
            "lat": null,
            "lon": [1, 2],
        }));
        assert!(rec.is_empty());
        assert_eq!(rec.resolve(CanonicalField::Name), None);
    }

    #[test]
    fn numbers_render_as_text() {
        let rec = record(json!({ "litros": 20, "lat": -33.05 }));
        assert_eq!(rec.resolve(CanonicalField::Liters), Some("20"));
        assert_eq!(rec.resolve(CanonicalField::Latitude), Some("-33.05"));
    }

    #[test]
    fn colliding_keys_keep_the_first_in_sorted_order() {
        let rec = record(json!({ "litros": "7", "Litros": "5" }));
        assert_eq!(rec.resolve(CanonicalField::Liters), Some("5"));

        let rec = record(json!({ "litros": "7", "Litros": "" }));
        assert_eq!(rec.resolve(CanonicalField::Liters), Some("7"));
    }

    #[test]
    fn parse_decimal_accepts_comma() {
        assert_eq!(parse_decimal("12,5"), Some(12.5));
        assert_eq!(parse_decimal(" 7 "), Some(7.0));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("inf"), None);
    }

    #[test]
    fn value_as_f64_reads_numbers_and_strings() {
        assert_eq!(value_as_f64(&json!(3)), Some(3.0));
        assert_eq!(value_as_f64(&json!("-71,5")), Some(-71.5));
        assert_eq!(value_as_f64(&json!(null)), None);
    }
}
