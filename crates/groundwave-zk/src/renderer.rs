//! Note rendering on top of the cache.
//!
//! Rendering for the public base path `/note` marks every anchor that
//! points at a non-public note with the `restricted-link` class, using the
//! current link snapshot. Before the first link build nothing is marked.

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

use groundwave_core::defaults::{PUBLIC_NOTE_BASE_PATH, RESTRICTED_LINK_CLASS};
use groundwave_core::{parse_note_id, ChatNote, Error, Note, Result};

use crate::cache::ZkCache;
use crate::link_index::LinkSnapshot;
use crate::org::{decode_body, extract_id, extract_title, is_public, render_html};

static ANCHOR_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a\s[^>]*>").expect("anchor pattern is valid"));

static NOTE_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\shref="/note/([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})""#)
        .expect("note href pattern is valid")
});

static CLASS_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sclass="([^"]*)""#).expect("class pattern is valid"));

impl ZkCache {
    /// Resolve, fetch and render the note with `id`.
    #[instrument(skip(self, cancel), fields(subsystem = "zk", component = "renderer", op = "render_note"))]
    pub async fn render_note(
        &self,
        id: &str,
        base_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Note> {
        let id = parse_note_id(id)?;
        let (filename, body) = self.load_note(id, cancel).await?;
        self.build_note(id, filename, &body, base_path).await
    }

    /// Render the configured index note without id resolution.
    pub async fn render_index_note(
        &self,
        base_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Note> {
        let filename = self.config.index_filename().to_string();
        self.render_named(filename, base_path, cancel).await
    }

    /// Render the home note, or the index note when no home is configured.
    pub async fn render_home_note(
        &self,
        base_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Note> {
        match self.config.home_filename() {
            Some(home) => self.render_named(home.to_string(), base_path, cancel).await,
            None => self.render_index_note(base_path, cancel).await,
        }
    }

    /// Raw Org source of the note with `id`.
    pub async fn chat_note(&self, id: &str, cancel: &CancellationToken) -> Result<ChatNote> {
        let id = parse_note_id(id)?;
        let (_, body) = self.load_note(id, cancel).await?;
        Ok(ChatNote {
            id,
            title: extract_title(&body),
            raw_body: body,
        })
    }

    async fn render_named(
        &self,
        filename: String,
        base_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Note> {
        let body = self.fetch_body(&filename, cancel).await?;
        let id = extract_id(&body).unwrap_or_else(Uuid::nil);
        self.build_note(id, filename, &body, base_path).await
    }

    async fn build_note(
        &self,
        id: Uuid,
        filename: String,
        body: &str,
        base_path: &str,
    ) -> Result<Note> {
        let mut html_body = render_html(body, base_path)?;
        if base_path == PUBLIC_NOTE_BASE_PATH {
            if let Some(links) = self.links_snapshot().await {
                html_body = annotate_restricted_links(&html_body, &links);
            }
        }
        Ok(Note {
            id,
            title: extract_title(body),
            filename,
            is_public: is_public(body),
            html_body,
        })
    }

    /// Resolve and fetch, healing a stale resolver entry once.
    async fn load_note(&self, id: Uuid, cancel: &CancellationToken) -> Result<(String, String)> {
        let id_str = id.to_string();
        let was_cached = self.resolver.cached(&id).await.is_some();
        let filename = self.resolver.resolve(&id_str, cancel).await?;

        match self.fetch_body(&filename, cancel).await {
            Ok(body) if !was_cached || extract_id(&body) == Some(id) => return Ok((filename, body)),
            Ok(_) => debug!(note_id = %id, filename = %filename, "Cached file no longer holds id"),
            Err(Error::RemoteStatus { status: 404, .. }) if was_cached => {
                debug!(note_id = %id, filename = %filename, "Cached file is gone")
            }
            Err(e) => return Err(e),
        }

        self.resolver.forget(&id).await;
        let filename = self.resolver.resolve(&id_str, cancel).await?;
        let body = self.fetch_body(&filename, cancel).await?;
        Ok((filename, body))
    }

    async fn fetch_body(&self, filename: &str, cancel: &CancellationToken) -> Result<String> {
        let bytes = self
            .source
            .fetch(&self.config.file_url(filename), cancel)
            .await?;
        decode_body(&bytes).map(str::to_owned)
    }
}

/// Add the restricted class to anchors targeting non-public notes.
pub(crate) fn annotate_restricted_links(html: &str, links: &LinkSnapshot) -> String {
    ANCHOR_TAG
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let restricted = NOTE_HREF
                .captures(tag)
                .and_then(|c| Uuid::parse_str(&c[1]).ok())
                .is_some_and(|target| !links.is_public(&target));
            if restricted {
                add_class(tag, RESTRICTED_LINK_CLASS)
            } else {
                tag.to_string()
            }
        })
        .into_owned()
}

fn add_class(tag: &str, class: &str) -> String {
    if let Some(existing) = CLASS_ATTR.captures(tag) {
        if existing[1].split_whitespace().any(|c| c == class) {
            return tag.to_string();
        }
        let merged = if existing[1].trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {}", existing[1].trim(), class)
        };
        let replacement = format!(" class=\"{}\"", merged);
        return CLASS_ATTR.replace(tag, NoExpand(&replacement)).into_owned();
    }
    let open = tag.trim_end_matches('>');
    format!("{} class=\"{}\">", open, class)
}
