/// Link to open for a stored attachment. Scheme-less links get `https://`;
/// links already starting with `http://` or `https://` (any case) are kept.
pub fn normalize_link(link: &str) -> String {
    let has_scheme = ["http://", "https://"].iter().any(|scheme| {
        link.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    });

    if has_scheme {
        link.to_string()
    } else {
        format!("https://{link}")
    }
}
