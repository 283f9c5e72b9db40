//! Org-mode parsing and rendering.
//!
//! Extraction functions never fail: ill-formed input yields defaults.
//! Only [`render_html`] can fail, and only on input it cannot structure
//! (unterminated blocks, bodies that are not UTF-8).

mod directives;
mod html;
mod inline;
mod links;
mod preview;

pub use directives::{
    extract_date_override, extract_id, extract_title, is_heading_line, is_public, parse_keyword,
};
pub use html::{decode_body, render_html};
pub use links::extract_links;
pub use preview::{build_preview, Preview};
