//! Static HTML gallery listing every packaged bookmarklet.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::domain::model::PackagedBookmarklet;

const BUILTIN_TEMPLATE: &str = include_str!("../../assets/gallery.html");
const TEMPLATE_NAME: &str = "gallery";

/// Renders the gallery page from packaged bookmarklets.
pub struct GalleryGenerator {
    title: String,
    custom_template: Option<PathBuf>,
}

impl GalleryGenerator {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            custom_template: None,
        }
    }

    /// Use a template file instead of the built-in page.
    pub fn with_template(mut self, path: Option<PathBuf>) -> Self {
        self.custom_template = path;
        self
    }

    /// Render with the current UTC time as the generation stamp.
    pub fn render_now(&self, bookmarklets: &[PackagedBookmarklet]) -> Result<String> {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format gallery timestamp")?;
        self.render(bookmarklets, &generated_at)
    }

    /// Render the page. Output depends only on the inputs.
    pub fn render(&self, bookmarklets: &[PackagedBookmarklet], generated_at: &str) -> Result<String> {
        let context = build_context(&self.title, bookmarklets, generated_at)?;

        let source = match &self.custom_template {
            Some(path) => load_template(path)?,
            None => BUILTIN_TEMPLATE.to_owned(),
        };

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template(TEMPLATE_NAME, &source)
            .map_err(|err| anyhow!("invalid gallery template: {err}"))?;
        env.get_template(TEMPLATE_NAME)
            .and_then(|template| template.render(&context))
            .map_err(|err| anyhow!("failed to render gallery: {err}"))
    }
}

fn load_template(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to load gallery template from {}", path.display()))
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape text for a single- or double-quoted JavaScript string literal.
pub fn escape_js(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Serialize)]
struct GalleryContext {
    title: String,
    generated_at: String,
    count: usize,
    category_count: usize,
    total_kb: u64,
    categories: Vec<GalleryCategory>,
    names_json: String,
}

#[derive(Serialize)]
struct GalleryCategory {
    name: String,
    items: Vec<GalleryItem>,
}

/// Every string field is already escaped for the context it lands in.
#[derive(Serialize)]
struct GalleryItem {
    index: usize,
    name: String,
    description: String,
    author: String,
    size: usize,
    href: String,
    label_js: String,
    code: String,
}

fn build_context(
    title: &str,
    bookmarklets: &[PackagedBookmarklet],
    generated_at: &str,
) -> Result<GalleryContext> {
    let mut grouped: BTreeMap<&str, Vec<GalleryItem>> = BTreeMap::new();
    for (index, bookmarklet) in bookmarklets.iter().enumerate() {
        let meta = &bookmarklet.meta;
        grouped.entry(meta.category.as_str()).or_default().push(GalleryItem {
            index,
            name: escape_html(&meta.name),
            description: escape_html(&meta.description),
            author: escape_html(&meta.author),
            size: bookmarklet.size,
            href: escape_html(&bookmarklet.code),
            // Lands in a JS string inside an HTML attribute.
            label_js: escape_html(&escape_js(&meta.name)),
            code: escape_html(&bookmarklet.code),
        });
    }

    let total_bytes: usize = bookmarklets.iter().map(|b| b.size).sum();
    let names: Vec<&str> = bookmarklets.iter().map(|b| b.meta.name.as_str()).collect();
    let names_json = serde_json::to_string(&names)
        .context("failed to encode bookmarklet names")?
        .replace('<', "\\u003c");

    let categories: Vec<GalleryCategory> = grouped
        .into_iter()
        .map(|(name, items)| GalleryCategory {
            name: escape_html(name),
            items,
        })
        .collect();

    Ok(GalleryContext {
        title: escape_html(title),
        generated_at: escape_html(generated_at),
        count: bookmarklets.len(),
        category_count: categories.len(),
        total_kb: (total_bytes as f64 / 1024.0).round() as u64,
        categories,
        names_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::BookmarkletMeta;

    fn packaged(name: &str, category: &str, code: &str) -> PackagedBookmarklet {
        PackagedBookmarklet {
            meta: BookmarkletMeta {
                name: name.into(),
                description: format!("{name} description"),
                category: category.into(),
                author: "tester".into(),
            },
            filename: format!("{name}.js"),
            code: code.into(),
            size: code.len(),
            helpers: Vec::new(),
        }
    }

    #[test]
    fn escapes_html_and_js_contexts() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
        assert_eq!(escape_js("it's \"q\"\n\\"), "it\\'s \\\"q\\\"\\n\\\\");
    }

    #[test]
    fn groups_by_sorted_category_and_reports_totals() -> Result<()> {
        let items = vec![
            packaged("Zed", "Tools", "javascript:1"),
            packaged("Alpha", "Azure", &format!("javascript:{}", "x".repeat(2037))),
            packaged("Beta", "Tools", "javascript:2"),
        ];
        let html = GalleryGenerator::new("Gallery").render(&items, "2024-01-01T00:00:00Z")?;

        let azure = html.find("Azure (1)").expect("azure category");
        let tools = html.find("Tools (2)").expect("tools category");
        assert!(azure < tools);
        assert!(html.find("Zed").unwrap() < html.find("Beta").unwrap());
        assert!(html.contains(r#"<div class="stat-number">3</div>"#));
        assert!(html.contains(r#"<div class="stat-number">2</div>"#));
        assert!(html.contains(r#"<div class="stat-number">2KB</div>"#));
        assert!(html.contains("id=\"code-1\""));
        assert!(html.contains("Generated on 2024-01-01T00:00:00Z"));
        Ok(())
    }

    #[test]
    fn hostile_metadata_cannot_break_out_of_markup() -> Result<()> {
        let mut item = packaged("x", "General", "javascript:alert(\"</textarea>\")");
        item.meta.name = "Bad'\"<script>".into();
        let html = GalleryGenerator::new("Gallery").render(&[item], "now")?;

        assert!(!html.contains("<script>alert"));
        assert!(!html.contains("Bad'\"<script>"));
        assert!(html.contains("Bad&#39;&quot;&lt;script&gt;"));
        assert!(html.contains("'Bad\\&#39;\\&quot;&lt;script&gt;'"));
        assert!(html.contains("&lt;/textarea&gt;"));
        assert!(html.contains(r#"["Bad'\"\u003cscript>"]"#));
        Ok(())
    }

    #[test]
    fn same_input_and_timestamp_render_identically() -> Result<()> {
        let items = vec![packaged("One", "General", "javascript:void 0")];
        let generator = GalleryGenerator::new("Gallery");
        assert_eq!(generator.render(&items, "t")?, generator.render(&items, "t")?);
        Ok(())
    }

    #[test]
    fn custom_template_file_is_used() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("page.j2");
        fs::write(&path, "{{ count }} in {{ category_count }}")?;
        let html = GalleryGenerator::new("Gallery")
            .with_template(Some(path))
            .render(&[packaged("One", "General", "javascript:0")], "t")?;
        assert_eq!(html, "1 in 1");
        Ok(())
    }
}
