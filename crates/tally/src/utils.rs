#[cfg(test)]
use crate::api::ApiState;
#[cfg(test)]
use crate::db;
#[cfg(test)]
use crate::socket;
#[cfg(test)]
use axum::{Router, routing::any};
#[cfg(test)]
use axum_test::{TestServer, TestWebSocket};
#[cfg(test)]
use sea_orm::{Database, DatabaseConnection};
#[cfg(test)]
use sea_orm_migration::MigratorTrait;
#[cfg(test)]
use std::net::SocketAddr;

#[cfg(test)]
pub async fn get_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db::migration::Migrator::refresh(&db).await.unwrap();
    db
}

#[cfg(test)]
pub async fn get_test_socket() -> TestWebSocket {
    let db = get_test_db().await;

    let state = ApiState {
        db,
        auth: "test".into(),
    };

    let app = Router::new()
        .route("/ws", any(socket::handler))
        .with_state(state);

    let server = TestServer::builder()
        .http_transport()
        .build(app.into_make_service_with_connect_info::<SocketAddr>())
        .unwrap();
    server.get_websocket("/ws").await.into_websocket().await
}
