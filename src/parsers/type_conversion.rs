use crate::event::FieldValue;

/// Scalar types a raw logfmt value can be classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    String,
}

/// Order in which types are tried. `String` is last and always succeeds,
/// so every value gets classified.
pub const INFERENCE_ORDER: [FieldType; 4] = [
    FieldType::Bool,
    FieldType::Int,
    FieldType::Float,
    FieldType::String,
];

/// Convert a raw value to the given type, or `None` if it doesn't parse as that type
pub fn try_convert(value: &str, field_type: FieldType) -> Option<FieldValue> {
    match field_type {
        FieldType::Bool => parse_bool(value).map(FieldValue::Bool),
        FieldType::Int => value.parse::<i64>().ok().map(FieldValue::Int),
        FieldType::Float => parse_float(value).map(FieldValue::Float),
        FieldType::String => Some(FieldValue::Str(value.to_string())),
    }
}

/// Classify a raw value into the first type of `INFERENCE_ORDER` that accepts it
pub fn infer_value(value: &str) -> FieldValue {
    INFERENCE_ORDER
        .iter()
        .find_map(|field_type| try_convert(value, *field_type))
        .unwrap_or_else(|| FieldValue::Str(value.to_string()))
}

/// Parse a float, refusing anything that isn't finite.
///
/// Out-of-range literals such as `1e400` would otherwise turn into infinity,
/// and JSON has no way to carry infinity or NaN. Those values, including the
/// spellings `inf` and `nan`, stay strings. Hex floats (`0x1p3`) are not
/// recognized and stay strings too.
pub fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Boolean literals accepted in logfmt values. Includes `1`/`0`, which
/// therefore classify as booleans rather than integers.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
