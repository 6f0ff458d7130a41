use std::{env, fs::OpenOptions, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use rentledger::{
    AppConfig, AppState, PollPolicy, build_router, content_store::SqliteContentStore,
    graceful_shutdown, logging_middleware,
};

/// The REST API server for rentledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The host that asset URLs point at, defaults to "localhost:{port}".
    #[arg(long)]
    asset_host: Option<String>,

    /// Where anonymous callers are sent to sign in.
    #[arg(long, default_value = "/sign-in")]
    sign_in_url: String,

    /// The request header in which the authenticating proxy passes the signed-in
    /// user's ID to the sign-in callback. Sign-in is disabled when unset.
    #[arg(long)]
    identity_header: Option<String>,

    /// The company name printed at the top of reports.
    #[arg(long, default_value = "LUPA Ventures Inc.")]
    company_name: String,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// How many seconds a looked-up role is trusted for.
    #[arg(long, default_value_t = 60)]
    role_cache_ttl: u64,

    /// Log request and response bodies.
    #[arg(long)]
    log_bodies: bool,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let asset_host = args
        .asset_host
        .unwrap_or_else(|| format!("localhost:{}", args.port));
    let conn = Connection::open(&args.db_path).expect("Could not open the database.");
    let content_store = SqliteContentStore::new(conn, &asset_host)
        .expect("Could not initialize the database.");

    let config = AppConfig {
        sign_in_url: args.sign_in_url,
        identity_header: args.identity_header,
        company_name: args.company_name,
        local_timezone: args.timezone,
        role_cache_ttl: Duration::from_secs(args.role_cache_ttl),
        poll_policy: PollPolicy::default(),
    };
    let state = AppState::new(Arc::new(content_store), &secret, config)
        .expect("Could not create the app state.");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let mut router = add_tracing_layer(build_router(state));

    if args.log_bodies {
        router = router.layer(middleware::from_fn(logging_middleware));
    }

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly.");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file))
        .with_filter(filter::LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
