use std::path::Path;

use handlebars::Handlebars;

const REDIRECT_TEMPLATE: &str = "redirect";
const DEFAULT_REDIRECT_PAGE: &str = include_str!("../templates/redirect.hbs");

/// Renders the bounce page used by links with the `html` redirect method.
#[derive(Clone, Debug)]
pub struct Renderer {
    handlebars: Handlebars<'static>,
}

impl Renderer {
    /// Uses the page bundled with the binary.
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_template_string(REDIRECT_TEMPLATE, DEFAULT_REDIRECT_PAGE)?;
        Ok(Self { handlebars })
    }

    /// Loads the bounce page from a template file instead.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, handlebars::TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_template_file(REDIRECT_TEMPLATE, path)?;
        Ok(Self { handlebars })
    }

    pub fn redirect_page(&self, target: &str) -> Result<String, handlebars::RenderError> {
        self.handlebars
            .render(REDIRECT_TEMPLATE, &serde_json::json!({ "URL": target }))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_bundled_page_embeds_target() {
        let page = Renderer::new().unwrap().redirect_page("https://example.com/a").unwrap();
        assert!(page.contains(r#"href="https://example.com/a""#));
        assert!(page.contains("url=https://example.com/a"));
    }

    #[test]
    fn test_target_is_escaped() {
        let page = Renderer::new()
            .unwrap()
            .redirect_page(r#"https://example.com/?q="><script>alert(1)</script>"#)
            .unwrap();
        assert!(!page.contains("<script>alert(1)"));
        assert!(page.contains("&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn test_template_from_file() {
        let mut file = tempfile::Builder::new().suffix(".hbs").tempfile().unwrap();
        write!(file, "go to {{{{URL}}}}").unwrap();

        let renderer = Renderer::from_file(file.path()).unwrap();
        assert_eq!(renderer.redirect_page("https://example.com").unwrap(), "go to https://example.com");
    }

    #[test]
    fn test_missing_template_file() {
        assert!(Renderer::from_file("/nonexistent/redirect.hbs").is_err());
    }
}
