use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use linkshort::{AppState, db::Db, generator::RandomCodeGenerator, render::Renderer, service};
use shadow_rs::shadow;
use tracing_subscriber::EnvFilter;

shadow!(build);

#[derive(Parser, Debug)]
#[command(version = build::VERSION, long_version = build::CLAP_LONG_VERSION, about = "A small URL shortener", long_about = "")]
struct Args {
    /// Public prefix of every short URL, including the trailing slash.
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:29315/")]
    base_url: String,
    #[arg(long, env = "HOST", default_value = "127.0.0.1:29315")]
    host: SocketAddr,
    /// Directory holding linkshort.db.
    #[arg(long, env = "SQLITE_PATH", default_value = ".")]
    sqlite_path: PathBuf,
    /// Handlebars template for html redirects. The bundled page is used when unset.
    #[arg(long, env = "REDIRECT_TEMPLATE")]
    redirect_template: Option<PathBuf>,
    #[arg(long, env = "MAX_URL_LENGTH", default_value_t = 255)]
    max_url_length: usize,
    #[arg(long, env = "MAX_SHORT_LENGTH", default_value_t = 20)]
    max_short_length: usize,
    /// Log the client address from X-Forwarded-For. Only set this behind a proxy.
    #[arg(long, env = "TRUST_HEADERS")]
    trust_headers: bool,
    /// Do not read admin commands from stdin.
    #[arg(long, env = "NO_ADMIN_STDIN")]
    no_admin_stdin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // construct a subscriber that prints formatted traces to stdout
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    // use that subscriber to process traces emitted after this point
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    tracing::info!("{:?}", &args);

    // database config
    let db_path = args.sqlite_path.join("linkshort.db");
    let db = Db::open(&db_path)?; // startup fails without storage
    tracing::info!("sqlitedb: {} ({} links)", db_path.display(), db.count()?);

    // templating config
    let renderer = match &args.redirect_template {
        Some(path) => Renderer::from_file(path)?,
        None => Renderer::new()?,
    };

    if !args.no_admin_stdin {
        let admin_db = db.clone();
        std::thread::spawn(move || linkshort::admin::listen(&admin_db, std::io::stdin().lock()));
    }

    let config = service::ServiceConfig {
        base_url: args.base_url,
        max_url_length: args.max_url_length,
        max_short_length: args.max_short_length,
    };
    let state = AppState::new(service::Shortener::new(db, RandomCodeGenerator, config), renderer)
        .with_trust_headers(args.trust_headers);
    let routes = linkshort::routes::get_routes(state);

    tracing::info!("starting warp server: {}", &args.host);
    warp::serve(routes)
        .bind(args.host)
        .await
        .graceful(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for CTRL+C: {e}");
            }
        })
        .run()
        .await;

    tracing::info!("gracefully exited.");
    tokio::time::sleep(Duration::from_secs(2)).await;

    Ok(())
}
