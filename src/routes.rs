use std::{convert::Infallible, net::SocketAddr};

use warp::Filter;

use crate::{AppState, QueryRequest, handlers};

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body() -> impl Filter<Extract = (QueryRequest,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(1024 * 16).and(warp::body::json())
}

fn client(trust_headers: bool) -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::addr::remote()
        .and(warp::header::optional::<String>("x-forwarded-for"))
        .map(move |remote: Option<SocketAddr>, forwarded_for: Option<String>| {
            handlers::client_address(remote, forwarded_for.as_deref(), trust_headers)
        })
}

fn query(state: AppState) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::post()
        .and(warp::path("query"))
        .and(warp::path::end())
        .and(json_body())
        .and(client(state.trust_headers))
        .and(with_state(state))
        .and_then(handlers::query)
}

fn get(state: AppState) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::get()
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(client(state.trust_headers))
        .and(with_state(state))
        .and_then(|short: String, client: String, state: AppState| async move {
            handlers::get(&short, client, state).await
        })
}

pub fn get_routes(state: AppState) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    query(state.clone()).or(get(state))
}
