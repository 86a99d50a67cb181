use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod admin;
pub mod db;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod model;
pub mod render;
pub mod routes;
pub mod service;

pub type LinkService = service::Shortener<db::Db, generator::RandomCodeGenerator>;

/// Shared state handed to every request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: Arc<LinkService>,
    pub renderer: render::Renderer,
    /// Log the `X-Forwarded-For` address instead of the peer.
    pub trust_headers: bool,
}

impl AppState {
    pub fn new(service: LinkService, renderer: render::Renderer) -> Self {
        Self {
            service: Arc::new(service),
            renderer,
            trust_headers: false,
        }
    }

    pub fn with_trust_headers(mut self, trust_headers: bool) -> Self {
        self.trust_headers = trust_headers;
        self
    }
}

/// Body of `POST /query`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct QueryRequest {
    pub action: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "redirect-type", default, skip_serializing_if = "Option::is_none")]
    pub redirect_type: Option<String>,
    #[serde(rename = "short-request", default, skip_serializing_if = "Option::is_none")]
    pub short_request: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(rename = "redirect-type", default, skip_serializing_if = "Option::is_none")]
    pub redirect_type: Option<model::RedirectMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "error-long", default, skip_serializing_if = "Option::is_none")]
    pub error_long: Option<String>,
}

impl From<&error::Error> for QueryResponse {
    fn from(e: &error::Error) -> Self {
        QueryResponse {
            error: Some(e.kind().to_string()),
            error_long: Some(e.to_string()),
            ..Default::default()
        }
    }
}
