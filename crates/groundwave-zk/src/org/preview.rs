//! Journal previews: the opening paragraphs of a daily note.

use groundwave_core::defaults::{PREVIEW_MAX_CHARS, PREVIEW_MAX_PARAGRAPHS};

use super::directives::{is_heading_line, parse_keyword};

/// Preview source text, still in Org markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub text: String,
    /// Content was dropped, either whole paragraphs or by truncation.
    pub has_more: bool,
}

/// Collect up to two paragraphs of body text, skipping the property drawer,
/// `#+` directive lines and headlines, and cap the result at 480 characters.
pub fn build_preview(body: &str) -> Preview {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_properties = false;
    let mut has_more = false;

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(":PROPERTIES:") {
            in_properties = true;
            continue;
        }
        if in_properties {
            if trimmed.eq_ignore_ascii_case(":END:") {
                in_properties = false;
            }
            continue;
        }
        if parse_keyword(trimmed).is_some() || is_heading_line(line) {
            continue;
        }

        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }
        if paragraphs.len() == PREVIEW_MAX_PARAGRAPHS {
            has_more = true;
            break;
        }
        current.push(line.trim_end());
    }
    if !current.is_empty() && paragraphs.len() < PREVIEW_MAX_PARAGRAPHS {
        paragraphs.push(current);
    }

    let mut text = paragraphs
        .iter()
        .map(|p| p.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.chars().count() > PREVIEW_MAX_CHARS {
        text = text.chars().take(PREVIEW_MAX_CHARS).collect();
        has_more = true;
    }

    Preview { text, has_more }
}
