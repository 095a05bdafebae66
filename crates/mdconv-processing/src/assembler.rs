//! Document assembly
//!
//! Combines sanitized metadata and content into the inputs each engine
//! consumes: markdown for pandoc, a styled HTML document for weasyprint and
//! cloud uploads. Output depends only on the inputs.

use ammonia::{Builder, UrlRelative};
use mdconv_core::DocumentMetadata;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

pub const UNTITLED: &str = "Untitled Document";
const HTML_FALLBACK_TITLE: &str = "Document";

/// Keys rendered first, in this order, when present.
const WELL_KNOWN_KEYS: [&str; 3] = ["author", "date", "tags"];

static BODY_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*)</body\s*>").expect("static regex"));

/// Body HTML reaches the PDF renderer, which follows `file:` URLs and
/// attachment links. Only remote and inline resources survive; relative URLs
/// are kept when they are in-document fragments.
static BODY_SANITIZER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::default();
    builder
        .url_schemes(HashSet::from(["http", "https", "mailto", "data"]))
        .url_relative(UrlRelative::Custom(Box::new(fragment_only)))
        .add_generic_attributes(["id", "class"])
        .add_tags(["input"])
        .add_tag_attributes("input", ["type", "checked", "disabled"]);
    builder
});

fn fragment_only(url: &str) -> Option<Cow<'_, str>> {
    url.starts_with('#').then_some(Cow::Borrowed(url))
}

/// Base styling shared by every HTML rendition. Page rules are prepended per
/// document since the running header carries the title.
const BASE_STYLES: &str = r#"
body {
    font-family: 'Georgia', serif;
    font-size: 11pt;
    line-height: 1.6;
    color: #333;
}

h1, h2, h3, h4, h5, h6 {
    font-family: 'Helvetica', sans-serif;
    color: #000;
    page-break-after: avoid;
}

h1 {
    font-size: 24pt;
    margin-top: 0;
    border-bottom: 2px solid #333;
    padding-bottom: 10pt;
}

h2 {
    font-size: 18pt;
    margin-top: 20pt;
    border-bottom: 1px solid #999;
    padding-bottom: 5pt;
}

h3 {
    font-size: 14pt;
    margin-top: 15pt;
}

p {
    margin: 0.5em 0;
    text-align: justify;
}

code {
    background-color: #f4f4f4;
    padding: 2px 4px;
    border-radius: 3px;
    font-family: 'Courier New', monospace;
    font-size: 9pt;
    color: #c7254e;
}

pre {
    background-color: #f4f4f4;
    padding: 10pt;
    border-left: 3px solid #666;
    page-break-inside: avoid;
    margin: 1em 0;
}

pre code {
    background-color: transparent;
    padding: 0;
    color: inherit;
}

blockquote {
    border-left: 4px solid #ddd;
    padding-left: 15pt;
    margin-left: 0;
    color: #666;
    font-style: italic;
}

table {
    border-collapse: collapse;
    width: 100%;
    margin: 15pt 0;
    page-break-inside: avoid;
}

th, td {
    border: 1px solid #ddd;
    padding: 8pt;
    text-align: left;
}

th {
    background-color: #f4f4f4;
    font-weight: bold;
}

img {
    max-width: 100%;
    height: auto;
}

a {
    color: #0066cc;
    text-decoration: none;
}

.front-matter {
    border: 2px solid #333;
    background-color: #f9f9f9;
    padding: 15pt;
    margin-bottom: 20pt;
    page-break-after: avoid;
}

.front-matter p {
    margin: 0.25em 0;
    text-align: left;
}

hr {
    border: none;
    border-top: 1px solid #ccc;
    margin: 2em 0;
}
"#;

/// What the content body is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Markdown,
    Html,
}

/// Engine-ready renditions of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    /// Title from metadata, if any
    pub title: Option<String>,
    pub markdown: String,
    pub html: String,
}

impl AssembledDocument {
    /// Name used for documents created in cloud storage.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED)
    }
}

#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    include_front_matter: bool,
}

impl DocumentAssembler {
    pub fn new(include_front_matter: bool) -> Self {
        Self {
            include_front_matter,
        }
    }

    /// Assemble a markdown document.
    pub fn assemble(&self, metadata: &DocumentMetadata, content: &str) -> AssembledDocument {
        self.assemble_source(metadata, content, SourceKind::Markdown)
    }

    pub fn assemble_source(
        &self,
        metadata: &DocumentMetadata,
        content: &str,
        source: SourceKind,
    ) -> AssembledDocument {
        let title = metadata.title();
        let show_front_matter = self.include_front_matter && !metadata.is_empty();

        let markdown = if show_front_matter {
            format!("{}{}", front_matter_markdown(metadata), content)
        } else {
            content.to_string()
        };

        let body = match source {
            SourceKind::Markdown => render_markdown(content),
            SourceKind::Html => sanitize_body(extract_html_body(content)),
        };
        let front_matter = if show_front_matter {
            front_matter_html(metadata)
        } else {
            String::new()
        };

        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}{}</style>\n</head>\n<body>\n{}{}</body>\n</html>\n",
            escape_html(title.as_deref().unwrap_or(HTML_FALLBACK_TITLE)),
            page_rules(title.as_deref().unwrap_or_default()),
            BASE_STYLES,
            front_matter,
            body,
        );

        AssembledDocument {
            title,
            markdown,
            html,
        }
    }
}

/// Paged-media rules: A4, page counter footer, running title header, and a
/// clean first page.
pub fn page_rules(title: &str) -> String {
    format!(
        r#"
@page {{
    size: A4;
    margin: 1in 0.75in;

    @bottom-center {{
        content: "Page " counter(page) " of " counter(pages);
        font-size: 10pt;
        color: #666;
        font-family: 'Helvetica', sans-serif;
    }}

    @top-right {{
        content: "{}";
        font-size: 9pt;
        color: #999;
        font-family: 'Helvetica', sans-serif;
    }}
}}

@page :first {{
    @bottom-center {{
        content: "";
    }}
    @top-right {{
        content: "";
    }}
}}
"#,
        escape_css_string(title)
    )
}

/// Render markdown to an HTML fragment.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(content, options);
    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, parser);
    sanitize_body(&out)
}

/// Strip scripts, styles, attachment links and local resource references
/// from a body fragment.
pub fn sanitize_body(fragment: &str) -> String {
    BODY_SANITIZER.clean(fragment).to_string()
}

/// Inner `<body>` of a full HTML document, or the input when it is a fragment.
pub fn extract_html_body(content: &str) -> &str {
    BODY_CONTENT
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content)
}

/// `snake_case` / `kebab-case` key to a title-cased label.
pub fn label_for(key: &str) -> String {
    key.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain-text rendering of a metadata value.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, value_text(v)))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// Metadata entries in display order, title excluded.
fn ordered_entries(metadata: &DocumentMetadata) -> Vec<(&str, &Value)> {
    let mut entries: Vec<(&str, &Value)> = WELL_KNOWN_KEYS
        .iter()
        .filter_map(|key| metadata.get(key).map(|v| (*key, v)))
        .collect();

    entries.extend(
        metadata
            .iter()
            .filter(|(k, _)| k.as_str() != "title" && !WELL_KNOWN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v)),
    );
    entries
}

fn front_matter_markdown(metadata: &DocumentMetadata) -> String {
    let title = metadata.title();
    let mut out = format!("# {}\n\n", title.as_deref().unwrap_or(UNTITLED));

    for (key, value) in ordered_entries(metadata) {
        out.push_str(&format!("**{}:** {}  \n", label_for(key), value_text(value)));
    }

    out.push_str("\n---\n\n");
    out
}

fn front_matter_html(metadata: &DocumentMetadata) -> String {
    let title = metadata.title();
    let mut out = format!(
        "<div class=\"front-matter\">\n<h1>{}</h1>\n",
        escape_html(title.as_deref().unwrap_or(UNTITLED))
    );

    for (key, value) in ordered_entries(metadata) {
        out.push_str(&format!(
            "<p><strong>{}:</strong> {}</p>\n",
            escape_html(&label_for(key)),
            escape_html(&value_text(value))
        ));
    }

    out.push_str("</div>\n<hr>\n");
    out
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Escape text for a double-quoted CSS string inside a `<style>` element.
fn escape_css_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '"' => out.push_str("\\22 "),
            '\\' => out.push_str("\\5C "),
            '<' => out.push_str("\\3C "),
            '>' => out.push_str("\\3E "),
            '\n' | '\r' => out.push(' '),
            c if c.is_control() => {}
            _ => out.push(c),
        }
    }
    out
}
