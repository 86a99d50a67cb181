use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use warp::http::{HeaderValue, StatusCode, header};

use crate::{
    AppState, LinkService, QueryRequest, QueryResponse,
    error::Error,
    model::RedirectMethod,
    service::{SearchShortcut, ShortenRequest},
};

fn status(e: &Error) -> StatusCode {
    match e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::AlreadyInUse(_) => StatusCode::CONFLICT,
        e if e.is_server_error() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn error_reply(e: &Error, client: &str) -> Result<Box<dyn warp::Reply>, Infallible> {
    if e.is_server_error() {
        tracing::error!(%client, "{e}");
    } else {
        tracing::warn!(%client, "rejected request: {e}");
    }
    let reply = warp::reply::with_status(warp::reply::json(&QueryResponse::from(e)), status(e));
    Ok(Box::new(reply))
}

/// Address logged for a request: the first `X-Forwarded-For` entry when the
/// proxy in front is trusted, otherwise the peer address.
pub fn client_address(remote: Option<SocketAddr>, forwarded_for: Option<&str>, trust_headers: bool) -> String {
    let forwarded = forwarded_for
        .filter(|_| trust_headers)
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|address| !address.is_empty());
    match (forwarded, remote) {
        (Some(address), _) => address.to_string(),
        (None, Some(remote)) => remote.to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Runs blocking store work off the async workers.
async fn blocking<T, F>(service: &Arc<LinkService>, f: F) -> crate::error::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&LinkService) -> crate::error::Result<T> + Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| Error::Storage(format!("worker failed: {e}")))?
}

/// `POST /query`: shorten, search-shorten or unshorten.
pub async fn query(request: QueryRequest, client: String, state: AppState) -> Result<Box<dyn warp::Reply>, Infallible> {
    let search = match request.action.as_str() {
        "unshorten" => return unshorten(request.url, client, state).await,
        "shorten" => None,
        "google" => Some(SearchShortcut::Google),
        "duckduckgo" => Some(SearchShortcut::DuckDuckGo),
        other => return error_reply(&Error::UnknownAction(other.to_string()), &client),
    };

    let shorten_request = ShortenRequest {
        url: request.url,
        short: request.short_request,
        redirect: request.redirect_type,
        search,
    };
    match blocking(&state.service, move |service| service.shorten(shorten_request)).await {
        Ok(shortened) => {
            let short_url = state.service.short_url(&shortened.short);
            tracing::debug!(%client, "shortened {} into {}", &shortened.target, &short_url);
            let response = QueryResponse {
                result: Some(short_url.clone()),
                short: Some(shortened.short),
                redirect_type: Some(shortened.redirect),
                created: Some(shortened.created),
                ..Default::default()
            };
            let code = if shortened.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            let reply = warp::reply::with_header(
                warp::reply::with_status(warp::reply::json(&response), code),
                "Location",
                short_url,
            );
            Ok(Box::new(reply))
        }
        Err(e) => error_reply(&e, &client),
    }
}

async fn unshorten(url: String, client: String, state: AppState) -> Result<Box<dyn warp::Reply>, Infallible> {
    match blocking(&state.service, move |service| service.resolve(&url)).await {
        Ok(resolved) => {
            tracing::debug!(%client, "queried the target of {}", &resolved.short);
            let response = QueryResponse {
                result: Some(resolved.target),
                short: Some(resolved.short),
                redirect_type: Some(resolved.redirect),
                ..Default::default()
            };
            Ok(Box::new(warp::reply::json(&response)))
        }
        Err(e) => error_reply(&e, &client),
    }
}

/// `GET /{short}`: follow a short link.
pub async fn get(short: &str, client: String, state: AppState) -> Result<Box<dyn warp::Reply>, Infallible> {
    let short = url_escape::decode(short).into_owned();
    tracing::debug!(%client, "requested target of {}", &short);

    let resolved = match blocking(&state.service, move |service| service.resolve(&short)).await {
        Ok(resolved) => resolved,
        Err(e) => return error_reply(&e, &client),
    };

    match resolved.redirect {
        // search shortcut targets may carry raw spaces
        RedirectMethod::Http => match HeaderValue::from_str(&resolved.target.replace(' ', "%20")) {
            Ok(location) => Ok(Box::new(warp::reply::with_header(StatusCode::FOUND, header::LOCATION, location))),
            Err(e) => error_reply(
                &Error::Storage(format!("stored target of {} is not a valid Location: {e}", resolved.short)),
                &client,
            ),
        },
        RedirectMethod::Html => match state.renderer.redirect_page(&resolved.target) {
            Ok(page) => Ok(Box::new(warp::reply::html(page))),
            Err(e) => error_reply(&Error::Storage(format!("failed to render redirect page: {e}")), &client),
        },
    }
}
