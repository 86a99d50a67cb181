use url::{Url, form_urlencoded};

use crate::{
    db::{DbError, LinkStore},
    error::{Error, Result},
    generator::CodeGenerator,
    model::RedirectMethod,
};

/// Path segments a requested short code may not take over.
pub const RESERVED: &[&str] = &["query"];

/// Upper bound on insert attempts for one shorten request.
const MAX_ATTEMPTS: usize = 5;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Public prefix of every short URL, e.g. `https://lu.example/`.
    pub base_url: String,
    pub max_url_length: usize,
    pub max_short_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:29315/".to_string(),
            max_url_length: 255,
            max_short_length: 20,
        }
    }
}

/// Third-party search pages a shorten request can wrap its input into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchShortcut {
    Google,
    DuckDuckGo,
}

impl SearchShortcut {
    pub fn wrap(&self, query: &str) -> String {
        let escaped: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        match self {
            SearchShortcut::Google => format!("http://lmgtfy.com/?q={escaped}"),
            SearchShortcut::DuckDuckGo => format!("http://lmddgtfy.net/?q={}", escaped.replace('+', " ")),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ShortenRequest {
    pub url: String,
    /// Code asked for by the client. Empty counts as absent.
    pub short: Option<String>,
    /// Raw redirect type from the client, parsed strictly.
    pub redirect: Option<String>,
    pub search: Option<SearchShortcut>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Shortened {
    pub short: String,
    /// Target as stored, after any search rewrite.
    pub target: String,
    pub redirect: RedirectMethod,
    /// `false` when an existing link was handed back.
    pub created: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolved {
    pub short: String,
    pub target: String,
    pub redirect: RedirectMethod,
}

/// Validates shorten and resolve requests and runs them against a store.
#[derive(Clone, Debug)]
pub struct Shortener<S, G> {
    store: S,
    generator: G,
    config: ServiceConfig,
}

impl<S: LinkStore, G: CodeGenerator> Shortener<S, G> {
    pub fn new(store: S, generator: G, config: ServiceConfig) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    /// Full public URL for a short code.
    pub fn short_url(&self, short: &str) -> String {
        format!("{}{}", self.config.base_url, short)
    }

    pub fn shorten(&self, request: ShortenRequest) -> Result<Shortened> {
        if request.url.is_empty() {
            return Err(Error::MissingUrl);
        }

        let requested = match request.short.as_deref() {
            Some(short) if !short.is_empty() => Some(self.validate_short(short)?),
            _ => None,
        };

        let redirect: RedirectMethod = request.redirect.as_deref().unwrap_or_default().parse()?;

        let target = match request.search {
            // lmddgtfy wants its query with raw spaces, store it as built
            Some(SearchShortcut::DuckDuckGo) => {
                let wrapped = SearchShortcut::DuckDuckGo.wrap(&request.url);
                self.validate_target(&wrapped)?;
                wrapped
            }
            Some(search) => self.validate_target(&search.wrap(&request.url))?,
            None => self.validate_target(&request.url)?,
        };

        let shortened = match requested {
            Some(short) => self.shorten_requested(short, target, redirect)?,
            None => self.shorten_generated(target, redirect)?,
        };
        tracing::debug!(
            short = %shortened.short,
            target = %shortened.target,
            created = shortened.created,
            "shortened"
        );
        Ok(shortened)
    }

    /// Accepts a bare code or a full short URL of this service.
    ///
    /// Codes are looked up as given first and lowercased second, so links
    /// made through `shorten` resolve whatever case the client uses.
    pub fn resolve(&self, value: &str) -> Result<Resolved> {
        let short = self.extract_short(value)?;
        if short.len() > self.config.max_short_length {
            return Err(Error::UrlTooLong {
                max: self.config.max_short_length,
            });
        }
        if short.is_empty() {
            return Err(Error::NotFound(value.to_string()));
        }

        let link = match self.store.lookup(&short) {
            Err(DbError::NotFound(_)) if short.chars().any(char::is_uppercase) => {
                self.store.lookup(&short.to_lowercase())?
            }
            found => found?,
        };
        Ok(Resolved {
            short: link.short,
            target: link.target,
            redirect: link.redirect,
        })
    }

    fn validate_short(&self, short: &str) -> Result<String> {
        let short = short.to_lowercase();
        if !short
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | ' '))
        {
            return Err(Error::IllegalCharacters(short));
        }
        if short.len() > self.config.max_short_length {
            return Err(Error::ShortTooLong {
                max: self.config.max_short_length,
            });
        }
        if RESERVED.contains(&short.as_str()) {
            return Err(Error::Reserved(short));
        }
        Ok(short)
    }

    /// Returns the target in the normalized form `Url` serializes it to.
    fn validate_target(&self, target: &str) -> Result<String> {
        let parsed = Url::parse(target).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if self.is_short_url(&parsed) {
            return Err(Error::AlreadyShortened(target.to_string()));
        }
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(Error::IllegalScheme(other.to_string())),
        }
        if parsed.host().is_none() {
            return Err(Error::InvalidUrl(format!("{target} has no host")));
        }

        if parsed.as_str().len() > self.config.max_url_length {
            return Err(Error::UrlTooLong {
                max: self.config.max_url_length,
            });
        }
        Ok(parsed.into())
    }

    /// Whether `url` points below `base_url`, whatever its scheme or host case.
    fn is_short_url(&self, url: &Url) -> bool {
        self.short_path(url).is_some()
    }

    /// Path of `url` under `base_url`, still percent-encoded.
    fn short_path<'a>(&self, url: &'a Url) -> Option<&'a str> {
        let base = Url::parse(&self.config.base_url).ok()?;
        if url.host() != base.host() || url.port() != base.port() {
            return None;
        }
        url.path().strip_prefix(base.path())
    }

    fn extract_short(&self, value: &str) -> Result<String> {
        if !value.contains("://") {
            return Ok(value.to_string());
        }
        let url = Url::parse(value).map_err(|_| Error::NotAShortenedUrl(value.to_string()))?;
        match self.short_path(&url) {
            Some(path) => Ok(url_escape::decode(path.trim_end_matches('/')).into_owned()),
            None => Err(Error::NotAShortenedUrl(value.to_string())),
        }
    }

    fn shorten_requested(&self, short: String, target: String, redirect: RedirectMethod) -> Result<Shortened> {
        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(existing) = self.claimed(&short, &target)? {
                return Ok(existing);
            }
            match self.store.insert_if_absent(&target, &short, redirect) {
                Ok((short, existing)) => {
                    return Ok(Shortened {
                        short,
                        target,
                        redirect,
                        created: !existing,
                    });
                }
                // someone got there first, look again
                Err(DbError::Conflict(e)) => tracing::debug!(attempt, %short, "insert raced: {e}"),
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::Storage(format!("could not store {short} after {MAX_ATTEMPTS} attempts")))
    }

    /// Existing link under `short`: the same target is handed back, any other
    /// target means the code is taken.
    fn claimed(&self, short: &str, target: &str) -> Result<Option<Shortened>> {
        match self.store.lookup(short) {
            Ok(link) if link.target == target => Ok(Some(Shortened {
                short: link.short,
                target: link.target,
                redirect: link.redirect,
                created: false,
            })),
            Ok(_) => Err(Error::AlreadyInUse(short.to_string())),
            Err(DbError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn shorten_generated(&self, target: String, redirect: RedirectMethod) -> Result<Shortened> {
        for attempt in 1..=MAX_ATTEMPTS {
            let code = self.generator.generate();
            if RESERVED.contains(&code.as_str()) {
                continue;
            }
            match self.store.insert_if_absent(&target, &code, redirect) {
                Ok((short, existing)) => {
                    return Ok(Shortened {
                        short,
                        target,
                        redirect,
                        created: !existing,
                    });
                }
                Err(DbError::Conflict(e)) => tracing::debug!(attempt, %code, "generated code rejected: {e}"),
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::Storage(format!("no free short code after {MAX_ATTEMPTS} attempts")))
    }
}
