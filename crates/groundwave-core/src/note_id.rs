//! Note identifier validation.
//!
//! Notes are identified by the UUID in their `:ID:` property. Only the
//! RFC 4122 hyphenated textual form (`8-4-4-4-12` hex digits) is accepted at
//! the boundary; the simple, braced and URN forms that [`Uuid::parse_str`]
//! also understands are rejected. The canonical form is lowercase.

use uuid::Uuid;

use crate::{Error, Result};

/// Length of the hyphenated textual form.
const HYPHENATED_LEN: usize = 36;

/// Parse a note id in hyphenated form.
///
/// # Example
///
/// ```
/// use groundwave_core::note_id::parse_note_id;
///
/// let id = parse_note_id("22222222-2222-2222-2222-222222222222").unwrap();
/// assert_eq!(id.to_string(), "22222222-2222-2222-2222-222222222222");
/// assert!(parse_note_id("not-a-uuid").is_err());
/// ```
pub fn parse_note_id(raw: &str) -> Result<Uuid> {
    let trimmed = raw.trim();
    if !has_hyphenated_shape(trimmed) {
        return Err(Error::InvalidId(raw.to_string()));
    }
    Uuid::parse_str(trimmed).map_err(|_| Error::InvalidId(raw.to_string()))
}

/// Whether `raw` is a well-formed note id.
pub fn is_note_id(raw: &str) -> bool {
    parse_note_id(raw).is_ok()
}

/// Canonical (lowercase, hyphenated) form of a note id.
///
/// # Example
///
/// ```
/// use groundwave_core::note_id::canonical_note_id;
///
/// let id = canonical_note_id("AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE").unwrap();
/// assert_eq!(id, "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
/// ```
pub fn canonical_note_id(raw: &str) -> Result<String> {
    parse_note_id(raw).map(|id| id.to_string())
}

fn has_hyphenated_shape(s: &str) -> bool {
    if s.len() != HYPHENATED_LEN {
        return false;
    }
    s.bytes().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}
