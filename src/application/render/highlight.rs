use once_cell::sync::Lazy;
use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use super::rich_text::escape_html;
use super::types::RenderError;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

pub(crate) fn highlight_code(
    language: &str,
    caption: Option<&str>,
    code: &str,
) -> Result<String, RenderError> {
    let syntax_set = &*SYNTAX_SET;
    let syntax =
        find_syntax(syntax_set, language).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, CLASS_STYLE);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: language.to_string(),
                message: err.to_string(),
            })?;
    }

    let highlighted = generator.finalize();
    let lang = escape_html(&language.to_ascii_lowercase());
    let caption_html = caption
        .filter(|c| !c.is_empty())
        .map(|c| format!("<figcaption>{}</figcaption>", escape_html(c)))
        .unwrap_or_default();

    Ok(format!(
        "<figure class=\"code-block\"><pre class=\"syntax-highlight syntax-lang-{lang}\" data-language=\"{lang}\"><code class=\"language-{lang} syntax-code\">{highlighted}</code></pre>{caption_html}</figure>"
    ))
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_language_emits_classed_spans() {
        let html = highlight_code("rust", None, "fn main() {}").expect("highlights");
        assert!(html.contains("syntax-lang-rust"));
        assert!(html.contains("<span class=\"syntax-"));
    }

    #[test]
    fn plaintext_falls_back_and_escapes() {
        let html = highlight_code("plaintext", Some("demo"), "<b>&</b>").expect("highlights");
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(html.contains("<figcaption>demo</figcaption>"));
    }
}
