pub mod api;
pub mod commands;
pub mod db;
pub mod socket;
pub mod utils;

use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::any,
};
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use sea_orm::Database;
use std::net::SocketAddr;
use tracing_log::AsTrace;

use tally_common::error::TallyError;

use api::ApiState;

/// The Tally server
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity,

    /// Bridge authentication token
    #[arg(short, long)]
    auth: String,

    /// IP address and port to bind to
    #[arg(short, long)]
    bind: String,

    /// Path to sqlite database file
    #[arg(short, long)]
    database: String,
}

async fn authenticate(
    State(state): State<ApiState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    match auth_header {
        Some(auth_header) if auth_header == state.auth => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

////////////////////////////////////////////////////////////////////////////////
// PUBLIC FUNCTION
////////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> Result<(), TallyError> {
    let args = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.log_level_filter().as_trace())
        .init();

    println!("Server is running!");

    let uri = format!("sqlite://{}?mode=rwc", args.database);
    let db = Database::connect(&uri).await?;
    db::migration::migrate(&db).await?;

    let state = ApiState {
        db,
        auth: args.auth,
    };

    let app = Router::new()
        .route("/ws", any(socket::handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state);

    let addr: SocketAddr = args.bind.parse().expect("Unable to parse bind address");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
