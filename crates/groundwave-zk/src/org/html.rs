//! Block-level Org to HTML rendering.
//!
//! | Construct | Output |
//! |-----------|--------|
//! | `* Headline :tags:` | `<h2>` .. `<h6>` (level + 1), tags dropped |
//! | paragraph | `<p>` |
//! | `- item`, `1. item`, `[X]` checkboxes | `<ul>` / `<ol>` with `<li>` |
//! | `\| a \| b \|` | `<table>` |
//! | `-----` | `<hr>` |
//! | `#+BEGIN_SRC lang` | `<pre class="src src-lang"><code>` |
//! | `#+BEGIN_EXAMPLE` | `<pre class="example">` |
//! | `#+BEGIN_QUOTE`, `#+BEGIN_CENTER` | `<blockquote>`, `<div class="center">` |
//! | drawers, `#+KEY:` lines, `# comments` | omitted |
//!
//! Output is deterministic: the same body and base path always give the
//! same HTML.

use once_cell::sync::Lazy;
use regex::Regex;

use groundwave_core::{Error, Result};

use super::directives::{is_heading_line, parse_keyword};
use super::inline::{escape_html, render_inline};

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)([-+]|\d+[.)])\s+(.*)$").expect("list item pattern is valid")
});

static DRAWER_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:[A-Za-z_-]+:$").expect("drawer pattern is valid"));

static HEADLINE_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+:[\w@#%:]+:\s*$").expect("tag pattern is valid"));

/// Decode a fetched body, failing on invalid UTF-8.
pub fn decode_body(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| Error::Render(format!("note body is not valid UTF-8: {}", e)))
}

/// Render an Org body to HTML.
///
/// `[[id:X][T]]` becomes `<a href="{base_path}/X">T</a>`.
pub fn render_html(body: &str, base_path: &str) -> Result<String> {
    let lines: Vec<&str> = body.lines().collect();
    let mut renderer = Renderer::new(base_path);
    renderer.render_lines(&lines)?;
    Ok(renderer.finish())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ListKind {
    Unordered,
    Ordered,
}

struct Renderer<'a> {
    base_path: &'a str,
    out: String,
    paragraph: Vec<&'a str>,
    list: Option<(ListKind, Vec<String>)>,
    table: Vec<Vec<String>>,
}

impl<'a> Renderer<'a> {
    fn new(base_path: &'a str) -> Self {
        Self {
            base_path,
            out: String::new(),
            paragraph: Vec::new(),
            list: None,
            table: Vec::new(),
        }
    }

    fn finish(mut self) -> String {
        self.flush_all();
        self.out
    }

    fn render_lines(&mut self, lines: &[&'a str]) -> Result<()> {
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim();

            if trimmed.is_empty() {
                self.flush_all();
                i += 1;
                continue;
            }

            if let Some((kind, args)) = block_start(trimmed) {
                let end = find_block_end(lines, i + 1, &kind).ok_or_else(|| {
                    Error::Render(format!(
                        "unterminated #+BEGIN_{} block at line {}",
                        kind,
                        i + 1
                    ))
                })?;
                self.flush_all();
                self.render_block(&kind, args, &lines[i + 1..end])?;
                i = end + 1;
                continue;
            }

            if DRAWER_START.is_match(trimmed) && !trimmed.eq_ignore_ascii_case(":END:") {
                if let Some(end) = lines[i + 1..]
                    .iter()
                    .position(|l| l.trim().eq_ignore_ascii_case(":END:"))
                {
                    i += end + 2;
                    continue;
                }
            }

            if trimmed.starts_with("#+") && parse_keyword(trimmed).is_some() {
                i += 1;
                continue;
            }
            if trimmed == "#" || trimmed.starts_with("# ") {
                i += 1;
                continue;
            }

            if is_heading_line(line) {
                self.flush_all();
                self.render_headline(line);
                i += 1;
                continue;
            }

            if trimmed.len() >= 5 && trimmed.chars().all(|c| c == '-') {
                self.flush_all();
                self.out.push_str("<hr>\n");
                i += 1;
                continue;
            }

            if trimmed.starts_with('|') {
                self.flush_paragraph();
                self.flush_list();
                self.push_table_row(trimmed);
                i += 1;
                continue;
            }
            self.flush_table();

            if let Some(caps) = LIST_ITEM.captures(line) {
                self.flush_paragraph();
                let bullet = caps.get(2).map_or("-", |m| m.as_str());
                let kind = if bullet.starts_with(|c: char| c.is_ascii_digit()) {
                    ListKind::Ordered
                } else {
                    ListKind::Unordered
                };
                let text = caps.get(3).map_or("", |m| m.as_str());
                self.push_list_item(kind, text);
                i += 1;
                continue;
            }

            if line.starts_with(char::is_whitespace) {
                if let Some((_, items)) = self.list.as_mut() {
                    if let Some(last) = items.last_mut() {
                        last.push('\n');
                        last.push_str(trimmed);
                        i += 1;
                        continue;
                    }
                }
            }

            self.flush_list();
            self.paragraph.push(trimmed);
            i += 1;
        }
        Ok(())
    }

    fn render_headline(&mut self, line: &str) {
        let stars = line.chars().take_while(|c| *c == '*').count();
        let level = (stars + 1).min(6);
        let title = HEADLINE_TAGS.replace(line[stars..].trim(), "");
        self.out.push_str(&format!(
            "<h{level}>{}</h{level}>\n",
            render_inline(title.trim(), self.base_path)
        ));
    }

    fn render_block(&mut self, kind: &str, args: &str, inner: &[&'a str]) -> Result<()> {
        match kind {
            "SRC" => {
                let lang = args.split_whitespace().next().unwrap_or("");
                if lang.is_empty() {
                    self.out.push_str("<pre class=\"src\"><code>");
                } else {
                    self.out.push_str(&format!(
                        "<pre class=\"src src-{}\"><code>",
                        escape_html(lang)
                    ));
                }
                self.out.push_str(&escape_html(&inner.join("\n")));
                self.out.push_str("</code></pre>\n");
            }
            "QUOTE" | "CENTER" => {
                let (open, close) = if kind == "QUOTE" {
                    ("<blockquote>\n", "</blockquote>\n")
                } else {
                    ("<div class=\"center\">\n", "</div>\n")
                };
                let mut nested = Renderer::new(self.base_path);
                nested.render_lines(inner)?;
                self.out.push_str(open);
                self.out.push_str(&nested.finish());
                self.out.push_str(close);
            }
            "VERSE" => {
                let rendered: Vec<String> = inner
                    .iter()
                    .map(|l| render_inline(l.trim_end(), self.base_path))
                    .collect();
                self.out.push_str("<p class=\"verse\">");
                self.out.push_str(&rendered.join("<br>\n"));
                self.out.push_str("</p>\n");
            }
            "COMMENT" => {}
            _ => {
                self.out.push_str("<pre class=\"example\">");
                self.out.push_str(&escape_html(&inner.join("\n")));
                self.out.push_str("</pre>\n");
            }
        }
        Ok(())
    }

    fn push_list_item(&mut self, kind: ListKind, text: &str) {
        if let Some((current, _)) = &self.list {
            if *current != kind {
                self.flush_list();
            }
        }
        let (_, items) = self.list.get_or_insert_with(|| (kind, Vec::new()));
        items.push(text.to_string());
    }

    fn push_table_row(&mut self, trimmed: &str) {
        if trimmed.starts_with("|-") {
            return;
        }
        let inner = trimmed.trim_start_matches('|');
        let inner = inner.strip_suffix('|').unwrap_or(inner);
        self.table
            .push(inner.split('|').map(|c| c.trim().to_string()).collect());
    }

    fn flush_all(&mut self) {
        self.flush_paragraph();
        self.flush_list();
        self.flush_table();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join("\n");
        self.paragraph.clear();
        self.out.push_str("<p>");
        self.out.push_str(&render_inline(&text, self.base_path));
        self.out.push_str("</p>\n");
    }

    fn flush_list(&mut self) {
        let Some((kind, items)) = self.list.take() else {
            return;
        };
        let tag = match kind {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        };
        self.out.push_str(&format!("<{}>\n", tag));
        for item in items {
            let (class, text) = checkbox(&item);
            match class {
                Some(class) => self.out.push_str(&format!("<li class=\"{}\">", class)),
                None => self.out.push_str("<li>"),
            }
            self.out.push_str(&render_inline(text, self.base_path));
            self.out.push_str("</li>\n");
        }
        self.out.push_str(&format!("</{}>\n", tag));
    }

    fn flush_table(&mut self) {
        if self.table.is_empty() {
            return;
        }
        self.out.push_str("<table>\n");
        for row in self.table.drain(..) {
            self.out.push_str("<tr>");
            for cell in row {
                self.out.push_str("<td>");
                self.out.push_str(&render_inline(&cell, self.base_path));
                self.out.push_str("</td>");
            }
            self.out.push_str("</tr>\n");
        }
        self.out.push_str("</table>\n");
    }
}

/// `#+BEGIN_KIND args` -> (uppercased KIND, args)
fn block_start(trimmed: &str) -> Option<(String, &str)> {
    let prefix = trimmed.get(..8)?;
    if !prefix.eq_ignore_ascii_case("#+BEGIN_") {
        return None;
    }
    let rest = &trimmed[8..];
    let (kind, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if kind.is_empty() {
        return None;
    }
    Some((kind.to_ascii_uppercase(), args.trim()))
}

fn find_block_end(lines: &[&str], from: usize, kind: &str) -> Option<usize> {
    let end_marker = format!("#+END_{}", kind);
    (from..lines.len()).find(|&j| lines[j].trim().eq_ignore_ascii_case(&end_marker))
}

fn checkbox(item: &str) -> (Option<&'static str>, &str) {
    for (marker, class) in [("[ ]", "off"), ("[X]", "on"), ("[x]", "on"), ("[-]", "trans")] {
        if let Some(rest) = item.strip_prefix(marker) {
            return (Some(class), rest.trim_start());
        }
    }
    (None, item)
}
