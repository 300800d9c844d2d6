use url::form_urlencoded;

/// Query parameters the gateway may use for the transaction reference, in priority order.
pub const REFERENCE_PARAMS: [&str; 2] = ["ref_payco", "x_ref_payco"];

/// Extracts the transaction reference from a redirect URL or bare query string.
///
/// Accepts `https://shop/respuesta?ref_payco=X`, `?ref_payco=X` and `ref_payco=X`. `ref_payco` wins over
/// `x_ref_payco`; for each name only its first occurrence counts, and an empty value counts as absent.
pub fn payment_reference_from_query(input: &str) -> Option<String> {
    let query = match input.split_once('?') {
        Some((_, q)) => q,
        None if input.contains("://") => return None,
        None => input,
    };
    let query = query.split('#').next().unwrap_or_default();
    REFERENCE_PARAMS.iter().find_map(|name| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == *name)
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn both_parameter_names_resolve() {
        assert_eq!(payment_reference_from_query("?ref_payco=X").as_deref(), Some("X"));
        assert_eq!(payment_reference_from_query("?x_ref_payco=X").as_deref(), Some("X"));
        assert_eq!(
            payment_reference_from_query("https://almastore.co/respuesta?foo=1&x_ref_payco=abc%2F12#top").as_deref(),
            Some("abc/12")
        );
        assert_eq!(payment_reference_from_query("ref_payco=77").as_deref(), Some("77"));
    }

    #[test]
    fn ref_payco_wins() {
        assert_eq!(payment_reference_from_query("?x_ref_payco=B&ref_payco=A").as_deref(), Some("A"));
        assert_eq!(payment_reference_from_query("?ref_payco=&x_ref_payco=B").as_deref(), Some("B"));
        assert_eq!(payment_reference_from_query("?ref_payco=A&ref_payco=C").as_deref(), Some("A"));
    }

    #[test]
    fn missing_reference() {
        assert_eq!(payment_reference_from_query(""), None);
        assert_eq!(payment_reference_from_query("?"), None);
        assert_eq!(payment_reference_from_query("?ref_payco="), None);
        assert_eq!(payment_reference_from_query("https://almastore.co/respuesta"), None);
        assert_eq!(payment_reference_from_query("?reference=X"), None);
    }
}
