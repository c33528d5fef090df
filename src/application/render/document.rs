//! Plain Markdown to sanitised HTML, outside the block pipeline.

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::{
    Arena, format_html,
    options::{ListStyleType, Options},
    parse_document,
};
use once_cell::sync::Lazy;

use super::types::RenderError;

static OPTIONS: Lazy<Options<'static>> = Lazy::new(default_options);
static SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(build_sanitizer);

/// Convert Markdown to HTML and strip anything outside the allow-list.
pub fn markdown_to_html(markdown: &str) -> Result<String, RenderError> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &OPTIONS);

    let mut html = String::new();
    format_html(root, &OPTIONS, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;

    Ok(SANITIZER.clean(&html).to_string())
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.underline = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.tasklist_classes = true;
    render.list_style = ListStyleType::Dash;
    render.r#unsafe = true;

    options
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "img",
        "input",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> =
        HashSet::from(["class", "id", "title", "lang", "dir", "data-footnote-ref", "data-footnotes"]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["alt", "width", "height", "loading"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}
