//! Inline markup: emphasis, code, and links.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1, take_until, take_while1};
use nom::character::complete::char;
use nom::error::{VerboseError, VerboseErrorKind};
use nom::IResult;

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq)]
enum Inline {
    Text(String),
    Code(String),
    Verbatim(String),
    Emphasis {
        kind: Emphasis,
        children: Vec<Inline>,
    },
    Link {
        target: String,
        desc: Option<Vec<Inline>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Emphasis {
    Bold,
    Italic,
    Underline,
    Strike,
}

/// Render a run of inline Org markup to HTML.
pub(crate) fn render_inline(text: &str, base_path: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for node in parse_inlines_str(text) {
        write_inline(&node, base_path, &mut out);
    }
    out
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn fail<'a, T>(i: &'a str, ctx: &'static str) -> PResult<'a, T> {
    Err(nom::Err::Error(VerboseError {
        errors: vec![(i, VerboseErrorKind::Context(ctx))],
    }))
}

/* ------------------------------ PARSING ------------------------------ */

fn parse_inlines_str(s: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut i = s;
    let mut prev: Option<char> = None;
    while !i.is_empty() {
        match inline_atom(i, prev) {
            Ok((rest, node)) => {
                prev = i[..i.len() - rest.len()].chars().last();
                out.push(node);
                i = rest;
            }
            Err(_) => {
                let mut chars = i.chars();
                if let Some(ch) = chars.next() {
                    out.push(Inline::Text(ch.to_string()));
                    prev = Some(ch);
                }
                i = chars.as_str();
            }
        }
    }
    coalesce_text(&mut out);
    out
}

/// Emphasis may only open at the start of a run or after whitespace and
/// opening punctuation.
fn can_open(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '-' | '(' | '{' | '\'' | '"'),
    }
}

fn can_close(rest: &str) -> bool {
    match rest.chars().next() {
        None => true,
        Some(c) => {
            c.is_whitespace()
                || matches!(
                    c,
                    '-' | '.' | ',' | ';' | ':' | '!' | '?' | '\'' | ')' | '}' | '"' | '['
                )
        }
    }
}

fn inline_atom(i: &str, prev: Option<char>) -> PResult<'_, Inline> {
    if !can_open(prev) {
        return alt((parse_link_bracketed, parse_text_chunk))(i);
    }
    alt((
        parse_link_bracketed,
        parse_code_like('~', Inline::Code),
        parse_code_like('=', Inline::Verbatim),
        parse_emph_with('*', Emphasis::Bold),
        parse_emph_with('/', Emphasis::Italic),
        parse_emph_with('_', Emphasis::Underline),
        parse_emph_with('+', Emphasis::Strike),
        parse_autolink,
        parse_text_chunk,
    ))(i)
}

fn coalesce_text(xs: &mut Vec<Inline>) {
    let mut out = Vec::with_capacity(xs.len());
    for x in xs.drain(..) {
        if let (Some(Inline::Text(prev)), Inline::Text(s)) = (out.last_mut(), &x) {
            prev.push_str(s);
        } else {
            out.push(x);
        }
    }
    *xs = out;
}

fn parse_emph_with(delim: char, kind: Emphasis) -> impl Fn(&str) -> PResult<'_, Inline> {
    move |i: &str| {
        let (i, _) = char(delim)(i)?;
        let (i, body) = take_till1(move |c: char| c == delim)(i)?;
        let (i, _) = char(delim)(i)?;
        if body.starts_with(char::is_whitespace)
            || body.ends_with(char::is_whitespace)
            || !can_close(i)
        {
            return fail(i, "emphasis-bounds");
        }
        Ok((
            i,
            Inline::Emphasis {
                kind,
                children: parse_inlines_str(body),
            },
        ))
    }
}

fn parse_code_like(delim: char, make: fn(String) -> Inline) -> impl Fn(&str) -> PResult<'_, Inline> {
    move |i: &str| {
        let (i, _) = char(delim)(i)?;
        let (i, body) = take_till1(move |c: char| c == delim)(i)?;
        let (i, _) = char(delim)(i)?;
        if body.starts_with(char::is_whitespace)
            || body.ends_with(char::is_whitespace)
            || !can_close(i)
        {
            return fail(i, "code-bounds");
        }
        Ok((i, make(body.to_string())))
    }
}

fn parse_link_bracketed(i: &str) -> PResult<'_, Inline> {
    let (i, _) = tag("[[")(i)?;
    let (i, target) = take_till1(|c: char| c == ']' || c == '\n')(i)?;
    if let Ok((i, _)) = tag::<_, _, VerboseError<&str>>("]]")(i) {
        return Ok((
            i,
            Inline::Link {
                target: target.trim().to_string(),
                desc: None,
            },
        ));
    }
    let (i, _) = tag("][")(i)?;
    let (i, desc) = take_until("]]")(i)?;
    let (i, _) = tag("]]")(i)?;
    Ok((
        i,
        Inline::Link {
            target: target.trim().to_string(),
            desc: Some(parse_inlines_str(desc)),
        },
    ))
}

fn parse_autolink(i: &str) -> PResult<'_, Inline> {
    let (_, scheme) = alt((tag("https://"), tag("http://")))(i)?;
    let (_, url) = take_while1(|c: char| !c.is_whitespace() && !matches!(c, ')' | ']' | '>' | '<'))(i)?;
    let url = url.trim_end_matches(['.', ',', ';', ':', '!', '?']);
    if url.len() <= scheme.len() {
        return fail(i, "autolink-empty");
    }
    Ok((
        &i[url.len()..],
        Inline::Link {
            target: url.to_string(),
            desc: None,
        },
    ))
}

fn parse_text_chunk(i: &str) -> PResult<'_, Inline> {
    fn is_plain(c: char) -> bool {
        !matches!(c, '[' | '*' | '/' | '_' | '+' | '~' | '=' | 'h')
    }
    let (i, s) = take_while1(is_plain)(i)?;
    Ok((i, Inline::Text(s.to_string())))
}

/* ------------------------------ RENDERING ----------------------------- */

fn write_children(children: &[Inline], base_path: &str, out: &mut String) {
    for child in children {
        write_inline(child, base_path, out);
    }
}

fn write_inline(node: &Inline, base_path: &str, out: &mut String) {
    match node {
        Inline::Text(s) => out.push_str(&escape_html(s)),
        Inline::Code(s) => {
            out.push_str("<code>");
            out.push_str(&escape_html(s));
            out.push_str("</code>");
        }
        Inline::Verbatim(s) => {
            out.push_str("<code class=\"verbatim\">");
            out.push_str(&escape_html(s));
            out.push_str("</code>");
        }
        Inline::Emphasis { kind, children } => {
            let (open, close) = match kind {
                Emphasis::Bold => ("<b>", "</b>"),
                Emphasis::Italic => ("<i>", "</i>"),
                Emphasis::Underline => ("<span class=\"underline\">", "</span>"),
                Emphasis::Strike => ("<del>", "</del>"),
            };
            out.push_str(open);
            write_children(children, base_path, out);
            out.push_str(close);
        }
        Inline::Link { target, desc } => write_link(target, desc.as_deref(), base_path, out),
    }
}

fn write_link(target: &str, desc: Option<&[Inline]>, base_path: &str, out: &mut String) {
    let href = if let Some(id) = target.strip_prefix("id:") {
        Some(format!("{}/{}", base_path.trim_end_matches('/'), id.trim()))
    } else if target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("mailto:")
    {
        Some(target.to_string())
    } else {
        None
    };

    let close = match &href {
        Some(href) => {
            out.push_str("<a href=\"");
            out.push_str(&escape_html(href));
            out.push_str("\">");
            "</a>"
        }
        None => {
            out.push_str("<span class=\"link\">");
            "</span>"
        }
    };
    match desc {
        Some(children) if !children.is_empty() => write_children(children, base_path, out),
        _ => {
            let label = target
                .strip_prefix("id:")
                .or_else(|| target.strip_prefix("file:"))
                .unwrap_or(target);
            out.push_str(&escape_html(label));
        }
    }
    out.push_str(close);
}
