// 🔢 Numeric Normalizer
// Locale-formatted cell text ("12,345.50", "₹ 1,200", "–") → f64 or missing

// ============================================================================
// CLEANING
// ============================================================================

/// Tokens that stand for "no value" in the source tables
const MISSING_TOKENS: &[&str] = &["", "-", "–", "—"];

/// Case-insensitive missing tokens (pandas round-trips these as text)
const MISSING_WORDS: &[&str] = &["nan", "none"];

/// Currency glyphs, including the rupee sign as it looks after a bad
/// UTF-8 → Latin-1 → UTF-8 round trip
const CURRENCY_ARTIFACTS: &[&str] = &["â‚¹", "\u{20b9}", "\u{fffd}", "Rs.", "Rs", "INR"];

/// Strip separators and currency noise, leaving the bare numeric token
///
/// Missing-value detection happens on the result, so an artifact-only cell
/// like "â‚¹" cleans to "" and counts as missing.
pub fn clean_numeric_text(raw: &str) -> String {
    let mut cleaned = raw.trim().replace(',', "");
    for artifact in CURRENCY_ARTIFACTS {
        if cleaned.contains(artifact) {
            cleaned = cleaned.replace(artifact, "");
        }
    }
    cleaned.trim().to_string()
}

/// True when an already-cleaned token means "no value"
pub fn is_missing_token(cleaned: &str) -> bool {
    MISSING_TOKENS.contains(&cleaned)
        || MISSING_WORDS
            .iter()
            .any(|w| cleaned.eq_ignore_ascii_case(w))
}

/// Parse a raw cell into a finite number, or `None` for explicit-missing
///
/// Never fails: anything that is not a finite number after cleaning is
/// missing. Zero stays `Some(0.0)`.
pub fn normalize_cell(raw: &str) -> Option<f64> {
    let cleaned = clean_numeric_text(raw);
    if is_missing_token(&cleaned) {
        return None;
    }
    cleaned.parse::<f64>().ok().and_then(finite)
}

/// Keep finite numbers, turn NaN/inf into explicit-missing
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

// ============================================================================
// CELL INPUT TRAIT
// ============================================================================

/// Anything a table cell may arrive as: text or an already-parsed number
pub trait CellInput {
    fn normalize(&self) -> Option<f64>;
}

impl CellInput for str {
    fn normalize(&self) -> Option<f64> {
        normalize_cell(self)
    }
}

impl CellInput for String {
    fn normalize(&self) -> Option<f64> {
        normalize_cell(self)
    }
}

impl CellInput for f64 {
    fn normalize(&self) -> Option<f64> {
        finite(*self)
    }
}

impl CellInput for i64 {
    fn normalize(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl<T: CellInput + ?Sized> CellInput for &T {
    fn normalize(&self) -> Option<f64> {
        (**self).normalize()
    }
}

impl<T: CellInput> CellInput for Option<T> {
    fn normalize(&self) -> Option<f64> {
        self.as_ref().and_then(|v| v.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tokens() {
        for token in ["", "-", "–", "nan", "None", "NaN", "  -  ", "—"] {
            assert_eq!(normalize_cell(token), None, "token {:?}", token);
        }
    }

    #[test]
    fn test_comma_grouped_numbers() {
        assert_eq!(normalize_cell("12,345.50"), Some(12345.50));
        assert_eq!(normalize_cell(" 1,23,456 "), Some(123456.0));
        assert_eq!(normalize_cell("-4,500"), Some(-4500.0));
    }

    #[test]
    fn test_currency_glyphs() {
        assert_eq!(normalize_cell("₹1,200"), Some(1200.0));
        assert_eq!(normalize_cell("â‚¹ 75.5"), Some(75.5));
        assert_eq!(normalize_cell("Rs. 10"), Some(10.0));
        assert_eq!(normalize_cell("â‚¹"), None);
    }

    #[test]
    fn test_zero_is_not_missing() {
        assert_eq!(normalize_cell("0"), Some(0.0));
        assert_eq!(normalize_cell("0.00"), Some(0.0));
    }

    #[test]
    fn test_garbage_is_missing() {
        assert_eq!(normalize_cell("n.a."), None);
        assert_eq!(normalize_cell("12abc"), None);
        assert_eq!(normalize_cell("inf"), None);
        assert_eq!(normalize_cell("NaN"), None);
    }

    #[test]
    fn test_cell_input_numeric() {
        assert_eq!(3.5_f64.normalize(), Some(3.5));
        assert_eq!(f64::NAN.normalize(), None);
        assert_eq!(f64::INFINITY.normalize(), None);
        assert_eq!(42_i64.normalize(), Some(42.0));
        assert_eq!(Some("1,000").normalize(), Some(1000.0));
        assert_eq!(None::<&str>.normalize(), None);
        assert_eq!("7".to_string().normalize(), Some(7.0));
    }
}
