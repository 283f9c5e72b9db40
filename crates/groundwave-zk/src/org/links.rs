//! `id:` link extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static ID_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[\[id:([0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12})\](?:\[[^\]]*\])?\]",
    )
    .expect("id link pattern is valid")
});

/// Targets of all `[[id:UUID]]` and `[[id:UUID][label]]` links, in order.
///
/// Duplicates are kept.
pub fn extract_links(body: &str) -> Vec<Uuid> {
    ID_LINK
        .captures_iter(body)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| Uuid::parse_str(m.as_str()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const B: &str = "33333333-3333-3333-3333-333333333333";
    const C: &str = "44444444-4444-4444-4444-444444444444";

    fn ids(body: &str) -> Vec<String> {
        extract_links(body).iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_labelled_and_bare_links() {
        let body = format!("See [[id:{B}][B note]] and [[id:{C}]].");
        assert_eq!(ids(&body), vec![B, C]);
    }

    #[test]
    fn test_duplicates_preserved() {
        let body = format!("[[id:{C}]] [[id:{B}][x]] [[id:{C}][again]]");
        assert_eq!(ids(&body), vec![C, B, C]);
    }

    #[test]
    fn test_uppercase_target_canonicalized() {
        let body = "[[id:ABCDEF01-2345-6789-ABCD-EF0123456789][Up]]";
        assert_eq!(ids(body), vec!["abcdef01-2345-6789-abcd-ef0123456789"]);
    }

    #[test]
    fn test_non_id_links_ignored() {
        let body = "[[https://example.com][web]] [[file:a.org]] [[id:not-a-uuid]]";
        assert!(extract_links(body).is_empty());
    }

    #[test]
    fn test_unclosed_link_ignored() {
        let body = format!("[[id:{B}][dangling");
        assert!(extract_links(&body).is_empty());
    }
}
