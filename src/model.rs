use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How a resolved link is delivered to the client.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMethod {
    /// Plain `302 Found` with a `Location` header.
    #[default]
    Http,
    /// A rendered bounce page with the target embedded.
    Html,
}

impl RedirectMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectMethod::Http => "http",
            RedirectMethod::Html => "html",
        }
    }

    /// Lenient normalization for stored rows and admin input: anything
    /// unrecognized (including the empty string) becomes `Http`.
    pub fn normalize(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

/// Strict parse for client requests. `js` is accepted as an alias for `html`.
impl FromStr for RedirectMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "http" => Ok(RedirectMethod::Http),
            "html" | "js" => Ok(RedirectMethod::Html),
            _ => Err(Error::UnsupportedRedirectType(s.to_string())),
        }
    }
}

impl std::fmt::Display for RedirectMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link is the row stored for each short code.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Link {
    pub short: String,  // primary key, never empty
    pub target: String, // destination URL
    pub redirect: RedirectMethod,
    pub created: chrono::DateTime<Utc>,
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} ({})", self.short, self.target, self.redirect)?;
        write!(f, " [created: {}]", self.created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_methods() {
        assert_eq!("http".parse::<RedirectMethod>().unwrap(), RedirectMethod::Http);
        assert_eq!("html".parse::<RedirectMethod>().unwrap(), RedirectMethod::Html);
        assert_eq!("HTML".parse::<RedirectMethod>().unwrap(), RedirectMethod::Html);
    }

    #[test]
    fn test_parse_empty_is_http() {
        assert_eq!("".parse::<RedirectMethod>().unwrap(), RedirectMethod::Http);
    }

    // js was the old name of the bounce page
    #[test]
    fn test_parse_js_alias() {
        assert_eq!("js".parse::<RedirectMethod>().unwrap(), RedirectMethod::Html);
    }

    #[test]
    fn test_parse_unknown_is_rejected() {
        let err = "meta".parse::<RedirectMethod>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedRedirectType(ref m) if m == "meta"));
    }

    #[test]
    fn test_normalize_coerces_unknown() {
        assert_eq!(RedirectMethod::normalize("meta"), RedirectMethod::Http);
        assert_eq!(RedirectMethod::normalize(""), RedirectMethod::Http);
        assert_eq!(RedirectMethod::normalize("html"), RedirectMethod::Html);
    }

    #[test]
    fn test_display_link() {
        let link = Link {
            short: "promo".to_string(),
            target: "https://example.com/a".to_string(),
            redirect: RedirectMethod::Html,
            created: chrono::Utc::now(),
        };
        assert!(link.to_string().starts_with("promo -> https://example.com/a (html)"));
    }
}
