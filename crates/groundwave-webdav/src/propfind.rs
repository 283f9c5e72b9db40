//! PROPFIND multistatus parsing.
//!
//! Each `<D:response>` becomes one [`RemoteEntry`]. Namespace prefixes are
//! ignored; only local names are matched. The entry describing the requested
//! collection itself is dropped.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::trace;
use url::Url;

use groundwave_core::{Error, RemoteEntry, Result};

/// Request body asking for the properties the listing needs.
pub const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
    <d:getlastmodified/>
  </d:prop>
</d:propfind>"#;

#[derive(Debug, Clone, Copy)]
enum Field {
    Href,
    ContentLength,
    LastModified,
}

#[derive(Debug, Default)]
struct PartialEntry {
    href: String,
    is_dir: bool,
    size: Option<u64>,
    modified: Option<DateTime<Utc>>,
}

/// Parse a multistatus body returned for a PROPFIND on `request_url`.
pub fn parse_multistatus(xml: &str, request_url: &str) -> Result<Vec<RemoteEntry>> {
    let own_path = href_path(request_url)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<PartialEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"response" => current = Some(PartialEntry::default()),
                b"href" => field = Some(Field::Href),
                b"getcontentlength" => field = Some(Field::ContentLength),
                b"getlastmodified" => field = Some(Field::LastModified),
                b"collection" => {
                    if let Some(entry) = current.as_mut() {
                        entry.is_dir = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"collection" {
                    if let Some(entry) = current.as_mut() {
                        entry.is_dir = true;
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::Serialization(format!("Bad multistatus text: {}", e)))?;
                    let text = text.trim();
                    match f {
                        Field::Href => entry.href.push_str(text),
                        Field::ContentLength => entry.size = text.parse().ok(),
                        Field::LastModified => {
                            entry.modified = DateTime::parse_from_rfc2822(text)
                                .ok()
                                .map(|dt| dt.with_timezone(&Utc))
                        }
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"response" => {
                    if let Some(partial) = current.take() {
                        if let Some(entry) = finish_entry(partial, &own_path)? {
                            trace!(path = %entry.path, is_dir = entry.is_dir, "Listing entry");
                            entries.push(entry);
                        }
                    }
                }
                b"href" | b"getcontentlength" | b"getlastmodified" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Serialization(format!(
                    "Malformed multistatus at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn finish_entry(partial: PartialEntry, own_path: &str) -> Result<Option<RemoteEntry>> {
    if partial.href.is_empty() {
        return Ok(None);
    }
    let path = href_path(&partial.href)?;
    if path.trim_end_matches('/') == own_path.trim_end_matches('/') {
        return Ok(None);
    }
    let name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    if name.is_empty() {
        return Ok(None);
    }
    Ok(Some(RemoteEntry {
        path,
        name,
        is_dir: partial.is_dir,
        size: partial.size,
        modified: partial.modified,
    }))
}

/// Percent-decoded path of an absolute URL or a bare href path.
fn href_path(href: &str) -> Result<String> {
    let raw_path = if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href)
            .map_err(|e| Error::Serialization(format!("Bad href {}: {}", href, e)))?
            .path()
            .to_string()
    } else {
        href.to_string()
    };
    urlencoding::decode(&raw_path)
        .map(|p| p.into_owned())
        .map_err(|e| Error::Serialization(format!("Bad href encoding {}: {}", href, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/zk/</d:href>
    <d:propstat>
      <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/zk/a.org</d:href>
    <d:propstat>
      <d:prop>
        <d:resourcetype/>
        <d:getcontentlength>42</d:getcontentlength>
        <d:getlastmodified>Mon, 01 Jan 2024 10:00:00 GMT</d:getlastmodified>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/zk/daily/</d:href>
    <d:propstat>
      <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/zk/my%20note.org</d:href>
    <d:propstat>
      <d:prop><d:resourcetype/></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn test_parse_skips_self_entry() {
        let entries = parse_multistatus(LISTING, "https://host/zk/").unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.path != "/zk/"));
    }

    #[test]
    fn test_parse_file_properties() {
        let entries = parse_multistatus(LISTING, "https://host/zk/").unwrap();
        let a = &entries[0];
        assert_eq!(a.name, "a.org");
        assert_eq!(a.path, "/zk/a.org");
        assert!(!a.is_dir);
        assert_eq!(a.size, Some(42));
        assert_eq!(
            a.modified.unwrap().to_rfc3339(),
            "2024-01-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_parse_collection() {
        let entries = parse_multistatus(LISTING, "https://host/zk/").unwrap();
        let daily = &entries[1];
        assert_eq!(daily.name, "daily");
        assert!(daily.is_dir);
    }

    #[test]
    fn test_parse_decodes_names() {
        let entries = parse_multistatus(LISTING, "https://host/zk/").unwrap();
        assert_eq!(entries[2].name, "my note.org");
        assert!(entries[2].size.is_none());
    }

    #[test]
    fn test_parse_absolute_hrefs_and_other_prefix() {
        let xml = r#"<multistatus xmlns="DAV:">
  <response><href>https://host/zk/</href></response>
  <response><href>https://host/zk/b.org</href>
    <propstat><prop><getcontentlength>7</getcontentlength></prop></propstat>
  </response>
</multistatus>"#;
        let entries = parse_multistatus(xml, "https://host/zk").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "b.org");
        assert_eq!(entries[0].size, Some(7));
    }

    #[test]
    fn test_parse_empty_multistatus() {
        let xml = r#"<?xml version="1.0"?><d:multistatus xmlns:d="DAV:"/>"#;
        assert!(parse_multistatus(xml, "https://host/zk/").unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_xml() {
        let xml = "<d:multistatus xmlns:d=\"DAV:\"><d:response><d:href>/zk/a.org</d:multistatus>";
        assert!(parse_multistatus(xml, "https://host/zk/").is_err());
    }
}
