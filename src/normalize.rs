/// Returns the canonical matching key for a product name.
///
/// Leading and trailing whitespace is removed, every inner run of whitespace
/// collapses to a single space, and the result is upper-cased, so names typed
/// slightly differently in the catalog and the order still match.
///
/// # Examples
///
/// ```
/// # use pedido::normalize::normalize_key;
/// assert_eq!(normalize_key("  Perfume   a\t(100ml) "), "PERFUME A (100ML)");
/// assert_eq!(normalize_key("   "), "");
/// ```
#[must_use]
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Normalizes a column header for lookup: like [`normalize_key`], but
/// lower-cased.
pub(crate) fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_fn_folds_case_and_whitespace() {
        assert_eq!(normalize_key("Perfume A"), normalize_key(" perfume  A "));
        assert_eq!(normalize_key("eau de\u{a0}toilette"), "EAU DE TOILETTE");
        assert_eq!(normalize_key("Crème"), "CRÈME");
    }

    #[test]
    fn normalize_header_fn_lower_cases() {
        assert_eq!(normalize_header("  Precio   Compra "), "precio compra");
        assert_eq!(normalize_header("DESCUENTO_%"), "descuento_%");
    }
}
