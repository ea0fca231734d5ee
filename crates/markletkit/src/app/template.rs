//! Embedding `template.html` / `styles.css` into a unit's logic file.

const HTML_PLACEHOLDER: &str = "{{HTML_CONTENT}}";
const CSS_PLACEHOLDER: &str = "{{CSS_CONTENT}}";

/// Replace the quoted placeholders with JSON string literals of the
/// template and stylesheet. Missing files or missing placeholders are left
/// alone.
pub fn substitute_templates(
    logic: &str,
    template: Option<&str>,
    styles: Option<&str>,
) -> Result<String, serde_json::Error> {
    let mut code = logic.to_owned();
    if let Some(template) = template {
        code = replace_placeholder(&code, HTML_PLACEHOLDER, template)?;
    }
    if let Some(styles) = styles {
        code = replace_placeholder(&code, CSS_PLACEHOLDER, styles)?;
    }
    Ok(code)
}

/// Whether any placeholder token is still present.
pub fn has_placeholders(code: &str) -> bool {
    code.contains(HTML_PLACEHOLDER) || code.contains(CSS_PLACEHOLDER)
}

fn replace_placeholder(
    code: &str,
    placeholder: &str,
    contents: &str,
) -> Result<String, serde_json::Error> {
    let literal = serde_json::to_string(contents)?;
    for quote in ['\'', '"'] {
        let quoted = format!("{quote}{placeholder}{quote}");
        if code.contains(&quoted) {
            return Ok(code.replacen(&quoted, &literal, 1));
        }
    }
    tracing::debug!(placeholder, "placeholder not found; leaving logic unchanged");
    Ok(code.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    type Result<T> = std::result::Result<T, serde_json::Error>;

    #[test]
    fn embeds_both_templates_as_json_strings() -> Result<()> {
        let logic = "const HTML = '{{HTML_CONTENT}}';\nconst CSS = \"{{CSS_CONTENT}}\";";
        let code = substitute_templates(logic, Some("<div id=\"x\">\n</div>"), Some("a { b: 'c'; }"))?;
        assert_eq!(
            code,
            "const HTML = \"<div id=\\\"x\\\">\\n</div>\";\nconst CSS = \"a { b: 'c'; }\";"
        );
        assert!(!has_placeholders(&code));
        Ok(())
    }

    #[test]
    fn missing_placeholder_is_not_an_error() -> Result<()> {
        let logic = "console.log('no templates here');";
        let code = substitute_templates(logic, Some("<p></p>"), None)?;
        assert_eq!(code, logic);
        Ok(())
    }

    #[test]
    fn only_the_first_occurrence_is_replaced() -> Result<()> {
        let logic = "a('{{HTML_CONTENT}}'); b('{{HTML_CONTENT}}');";
        let code = substitute_templates(logic, Some("x"), None)?;
        assert_eq!(code, "a(\"x\"); b('{{HTML_CONTENT}}');");
        Ok(())
    }
}
