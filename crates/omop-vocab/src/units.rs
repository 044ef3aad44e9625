//! Unit conversions between members of a coded unit set.

/// Unit pairs `convert` understands.
pub const SUPPORTED_CONVERSIONS: &[(&str, &str)] = &[
    ("fahrenheit", "celsius"),
    ("celsius", "fahrenheit"),
    ("kpa", "mmhg"),
    ("mmhg", "kpa"),
    ("mg_dl", "mmol_l"),
    ("mmol_l", "mg_dl"),
];

const MMHG_PER_KPA: f64 = 7.500_62;
// mg/dL ↔ mmol/L is analyte specific; glucose is the only coded set using it.
const GLUCOSE_MG_DL_PER_MMOL_L: f64 = 18.016;

pub fn is_supported(from: &str, to: &str) -> bool {
    from == to || SUPPORTED_CONVERSIONS.contains(&(from, to))
}

/// Converts `value` from unit `from` to unit `to`, both unit names of the
/// concept table. Returns `None` for unsupported pairs.
pub fn convert(value: f64, from: &str, to: &str) -> Option<f64> {
    if from == to {
        return Some(value);
    }
    let converted = match (from, to) {
        ("fahrenheit", "celsius") => (value - 32.0) * 5.0 / 9.0,
        ("celsius", "fahrenheit") => value * 9.0 / 5.0 + 32.0,
        ("kpa", "mmhg") => value * MMHG_PER_KPA,
        ("mmhg", "kpa") => value / MMHG_PER_KPA,
        ("mg_dl", "mmol_l") => value / GLUCOSE_MG_DL_PER_MMOL_L,
        ("mmol_l", "mg_dl") => value * GLUCOSE_MG_DL_PER_MMOL_L,
        _ => return None,
    };
    Some(converted)
}
