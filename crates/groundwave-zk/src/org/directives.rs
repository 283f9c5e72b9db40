//! Header directives and property drawers.

use chrono::NaiveDate;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, not_line_ending, space0};
use nom::error::VerboseError;
use nom::sequence::tuple;
use nom::IResult;
use uuid::Uuid;

use groundwave_core::defaults::DEFAULT_NOTE_TITLE;
use groundwave_core::parse_note_id;

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

fn hash_key_value(i: &str) -> PResult<'_, (&str, &str)> {
    // #+key: value
    let (i, (_, key, _, _, val)) = tuple((
        tag("#+"),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
        char(':'),
        space0,
        not_line_ending,
    ))(i)?;
    Ok((i, (key, val.trim())))
}

fn property_key_value(i: &str) -> PResult<'_, (&str, &str)> {
    // :KEY: value
    let (i, (_, key, _, _, val)) = tuple((
        char(':'),
        take_while1(|c: char| c != ':' && !c.is_whitespace()),
        char(':'),
        space0,
        not_line_ending,
    ))(i)?;
    Ok((i, (key, val.trim())))
}

/// Split a `#+KEY: value` line into its key and trimmed value.
pub fn parse_keyword(line: &str) -> Option<(&str, &str)> {
    hash_key_value(line.trim()).ok().map(|(_, kv)| kv)
}

/// Heading when the line starts with one-or-more `*` then a space.
pub fn is_heading_line(s: &str) -> bool {
    let stars = s.chars().take_while(|c| *c == '*').count();
    stars >= 1 && s[stars..].starts_with(' ')
}

fn keyword_value<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    body.lines()
        .filter_map(parse_keyword)
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// The first `:ID:` property holding a UUID inside a `:PROPERTIES:` drawer.
pub fn extract_id(body: &str) -> Option<Uuid> {
    let mut in_drawer = false;
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(":PROPERTIES:") {
            in_drawer = true;
            continue;
        }
        if !in_drawer {
            continue;
        }
        if trimmed.eq_ignore_ascii_case(":END:") {
            in_drawer = false;
            continue;
        }
        if let Ok((_, (key, value))) = property_key_value(trimmed) {
            if key.eq_ignore_ascii_case("ID") {
                if let Ok(id) = parse_note_id(value) {
                    return Some(id);
                }
            }
        }
    }
    None
}

/// Value of the first `#+TITLE:` directive, or the default title.
pub fn extract_title(body: &str) -> String {
    match keyword_value(body, "TITLE") {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => DEFAULT_NOTE_TITLE.to_string(),
    }
}

/// Whether some `#+access:` line carries the value `public`.
///
/// Both directive and value compare case-insensitively after trimming.
pub fn is_public(body: &str) -> bool {
    body.lines()
        .filter_map(parse_keyword)
        .any(|(k, v)| k.eq_ignore_ascii_case("access") && v.eq_ignore_ascii_case("public"))
}

/// Day named by the first `#+DATE:` directive.
///
/// Accepts a bare `YYYY-MM-DD` or an Org timestamp such as
/// `<2024-03-02 Sat>` or `[2024-03-02 Sat 10:00]`.
pub fn extract_date_override(body: &str) -> Option<NaiveDate> {
    let value = keyword_value(body, "DATE")?;
    let value = value.trim_start_matches(['<', '[']);
    let day = value.get(..10)?;
    let tail = &value[10..];
    if !(tail.is_empty() || tail.starts_with([' ', '>', ']'])) {
        return None;
    }
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = "\
:PROPERTIES:
:ID:       22222222-2222-2222-2222-222222222222
:END:
#+TITLE: Second Note
#+access: public

Body links to [[id:33333333-3333-3333-3333-333333333333][X]].
";

    #[test]
    fn test_parse_keyword() {
        assert_eq!(parse_keyword("#+TITLE: Hello"), Some(("TITLE", "Hello")));
        assert_eq!(parse_keyword("  #+date:2024-01-01  "), Some(("date", "2024-01-01")));
        assert_eq!(parse_keyword("#+BEGIN_SRC rust"), None);
        assert_eq!(parse_keyword("plain text"), None);
    }

    #[test]
    fn test_extract_id() {
        assert_eq!(
            extract_id(NOTE).map(|id| id.to_string()).as_deref(),
            Some("22222222-2222-2222-2222-222222222222")
        );
    }

    #[test]
    fn test_extract_id_outside_drawer_ignored() {
        let body = ":ID: 22222222-2222-2222-2222-222222222222\n#+TITLE: x\n";
        assert!(extract_id(body).is_none());
    }

    #[test]
    fn test_extract_id_skips_invalid_then_finds_valid() {
        let body = "\
:PROPERTIES:
:ID: nope
:END:
* Heading
:PROPERTIES:
:id: 44444444-4444-4444-4444-444444444444
:END:
";
        assert_eq!(
            extract_id(body).map(|id| id.to_string()).as_deref(),
            Some("44444444-4444-4444-4444-444444444444")
        );
    }

    #[test]
    fn test_extract_id_other_properties_ignored() {
        let body = ":PROPERTIES:\n:CUSTOM_ID: 22222222-2222-2222-2222-222222222222\n:END:\n";
        assert!(extract_id(body).is_none());
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title(NOTE), "Second Note");
        assert_eq!(extract_title("no title here"), DEFAULT_NOTE_TITLE);
        assert_eq!(extract_title("#+title:   Lower  \n#+TITLE: Second"), "Lower");
        assert_eq!(extract_title("#+TITLE:\n"), DEFAULT_NOTE_TITLE);
    }

    #[test]
    fn test_is_public() {
        assert!(is_public(NOTE));
        assert!(is_public("  #+ACCESS:   Public  "));
        assert!(!is_public("#+access: internal"));
        assert!(!is_public("#+access: public-ish"));
        assert!(!is_public("no directive"));
        assert!(!is_public("see #+access: public inline"));
    }

    #[test]
    fn test_extract_date_override() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(extract_date_override("#+DATE: 2024-03-02"), Some(d));
        assert_eq!(extract_date_override("#+date: <2024-03-02 Sat>"), Some(d));
        assert_eq!(extract_date_override("#+DATE: [2024-03-02 Sat 10:00]"), Some(d));
        assert_eq!(extract_date_override("#+DATE: March 2nd"), None);
        assert_eq!(extract_date_override("#+DATE: 2024-03-02x"), None);
        assert_eq!(extract_date_override("nothing"), None);
    }

    #[test]
    fn test_is_heading_line() {
        assert!(is_heading_line("* Top"));
        assert!(is_heading_line("*** Deep"));
        assert!(!is_heading_line("*bold* text"));
        assert!(!is_heading_line(" * indented"));
        assert!(!is_heading_line("*"));
    }
}
