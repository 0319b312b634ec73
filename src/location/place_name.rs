//! Place-name extraction from query parameters and map path segments.

use regex::Regex;
use std::sync::LazyLock;

/// Query parameters that may carry a place name, in priority order.
const NAME_PARAMS: &[&str] = &["name", "q", "address", "place", "location"];

static PARAM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NAME_PARAMS
        .iter()
        .map(|param| {
            Regex::new(&format!(r"[?&]{}=([^&#]+)", regex::escape(param)))
                .expect("valid name parameter regex")
        })
        .collect()
});

static PATH_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"/maps/place/([^/?#]+)").expect("valid place path regex"),
        Regex::new(r"/maps/search/([^/?#]+)").expect("valid search path regex"),
    ]
});

/// Pull a free-text place name out of a URL. `None` is the normal outcome
/// for URLs that carry no name.
pub fn extract_location_name(url: &str) -> Option<String> {
    PARAM_PATTERNS
        .iter()
        .chain(PATH_PATTERNS.iter())
        .find_map(|re| re.captures(url).and_then(|caps| caps.get(1)))
        .map(|m| decode_component(m.as_str()))
        .filter(|name| !name.trim().is_empty())
}

/// Percent-decode a URL component, treating `+` as a space. Malformed escapes
/// leave the text as-is.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.trim().to_string(),
        Err(_) => spaced.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_param_wins_over_q() {
        let url = "https://maps.apple.com/place?q=Cafe&name=Garden%20By%20Su&address=Main";
        assert_eq!(extract_location_name(url), Some("Garden By Su".to_string()));
    }

    #[test]
    fn test_q_param() {
        assert_eq!(
            extract_location_name("https://www.google.com/maps?q=Eiffel+Tower%2C+Paris"),
            Some("Eiffel Tower, Paris".to_string())
        );
    }

    #[test]
    fn test_address_place_location() {
        assert_eq!(
            extract_location_name("https://x.test/?address=499%2F1%20Main%20Road"),
            Some("499/1 Main Road".to_string())
        );
        assert_eq!(extract_location_name("https://x.test/?place=Louvre"), Some("Louvre".to_string()));
        assert_eq!(
            extract_location_name("https://x.test/?foo=1&location=Central%20Park"),
            Some("Central Park".to_string())
        );
    }

    #[test]
    fn test_place_and_search_paths() {
        assert_eq!(
            extract_location_name("https://www.google.com/maps/place/Cubbon+Park/@12.97,77.59,17z"),
            Some("Cubbon Park".to_string())
        );
        assert_eq!(
            extract_location_name("https://maps.google.com/maps/search/MG+Road+Metro"),
            Some("MG Road Metro".to_string())
        );
    }

    #[test]
    fn test_param_must_be_a_whole_name() {
        // "faq=" and "nickname=" are not the "q"/"name" parameters.
        assert_eq!(extract_location_name("https://x.test/help?faq=1"), None);
        assert_eq!(extract_location_name("https://x.test/?nickname=bob"), None);
    }

    #[test]
    fn test_malformed_escape_kept_raw() {
        assert_eq!(extract_location_name("https://x.test/?q=100%zz"), Some("100%zz".to_string()));
    }

    #[test]
    fn test_none_when_absent() {
        assert_eq!(extract_location_name("https://maps.apple.com/?ll=1,2"), None);
        assert_eq!(extract_location_name("Eiffel Tower, Paris"), None);
        assert_eq!(extract_location_name("https://x.test/?q=+"), None);
    }
}
