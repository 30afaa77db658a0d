use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::game::session::GameSnapshot;
use crate::services::puzzle_source::{parse_client_date, PuzzleKind};
use crate::services::session_manager::SessionManager;
use crate::OddestOneOutError;

// Structures pour l'API Web
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewGameRequest {
    #[serde(default = "default_kind")]
    pub kind: PuzzleKind,
    /// Client's local date, `YYYY-MM-DD`. Server's local date when absent.
    pub date: Option<String>,
}

fn default_kind() -> PuzzleKind {
    PuzzleKind::Today
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewGameResponse {
    pub session_id: String,
    pub snapshot: GameSnapshot,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SelectRequest {
    pub row: usize,
    pub word: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StandoutRequest {
    pub row: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
}

// Configuration pour le serveur Web UI
#[derive(Debug, Clone)]
pub struct WebUiConfig {
    pub port: u16,
    pub host: String,
}

impl Default for WebUiConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Maps crate errors onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(pub OddestOneOutError);

impl From<OddestOneOutError> for ApiError {
    fn from(error: OddestOneOutError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OddestOneOutError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            OddestOneOutError::InvalidDate(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ApiResponse {
            status: "error".to_string(),
            message: self.0.to_string(),
        };
        (status, ResponseJson(body)).into_response()
    }
}

type ApiResult<T> = Result<ResponseJson<T>, ApiError>;

pub struct WebUiServer {
    config: WebUiConfig,
    manager: SessionManager,
}

impl WebUiServer {
    pub fn new(config: WebUiConfig, manager: SessionManager) -> Self {
        Self { config, manager }
    }

    pub async fn start(&self) -> crate::Result<()> {
        let app = create_router(self.manager.clone());
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| OddestOneOutError::Server(format!("invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr).await?;

        log::info!(
            "🌐 Oddest One Out server starting on http://localhost:{}",
            self.config.port
        );

        axum::serve(listener, app).await?;
        Ok(())
    }
}

pub fn create_router(manager: SessionManager) -> Router {
    Router::new()
        .route("/api/status", get(api_status))
        .route("/api/games", post(api_new_game))
        .route("/api/games/{id}", get(api_get_game).delete(api_delete_game))
        .route("/api/games/{id}/select", post(api_select_word))
        .route("/api/games/{id}/check", post(api_run_check))
        .route("/api/games/{id}/standout", post(api_standout))
        .route("/api/games/{id}/restart", post(api_restart))
        .fallback_service(ServeDir::new("web"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(manager)
}

// Handlers
async fn api_status(State(manager): State<SessionManager>) -> ResponseJson<ApiResponse> {
    ResponseJson(ApiResponse {
        status: "ready".to_string(),
        message: format!("{} active sessions", manager.session_count().await),
    })
}

async fn api_new_game(
    State(manager): State<SessionManager>,
    Json(request): Json<NewGameRequest>,
) -> ApiResult<NewGameResponse> {
    let date = match request.date {
        Some(date) => {
            parse_client_date(&date)?;
            date
        }
        None => chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
    };
    let (session_id, snapshot) = manager.create_session(request.kind, &date).await;
    Ok(ResponseJson(NewGameResponse {
        session_id,
        snapshot,
    }))
}

async fn api_get_game(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
) -> ApiResult<GameSnapshot> {
    Ok(ResponseJson(manager.snapshot(&id).await?))
}

async fn api_delete_game(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if manager.remove_session(&id).await {
        log::info!("🗑️ Session {} deleted", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(OddestOneOutError::SessionNotFound(id).into())
    }
}

async fn api_select_word(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<GameSnapshot> {
    Ok(ResponseJson(
        manager.select_word(&id, request.row, request.word).await?,
    ))
}

async fn api_run_check(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
) -> ApiResult<GameSnapshot> {
    Ok(ResponseJson(manager.run_check(&id).await?))
}

async fn api_standout(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
    Json(request): Json<StandoutRequest>,
) -> ApiResult<GameSnapshot> {
    Ok(ResponseJson(
        manager.submit_standout_guess(&id, request.row).await?,
    ))
}

async fn api_restart(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
) -> ApiResult<GameSnapshot> {
    Ok(ResponseJson(manager.restart(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::sequence::AnimationTimings;
    use crate::services::puzzle_source::{ConfiguredSource, StaticPuzzleSource};

    fn manager() -> SessionManager {
        SessionManager::new(
            ConfiguredSource::Static(StaticPuzzleSource::default()),
            AnimationTimings::instant(),
        )
    }

    #[test]
    fn test_web_ui_config_default() {
        let config = WebUiConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_new_game_request_defaults_to_today() {
        let request: NewGameRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.kind, PuzzleKind::Today);
        assert!(request.date.is_none());

        let request: NewGameRequest =
            serde_json::from_str(r#"{"kind":"random_past","date":"2026-10-19"}"#).unwrap();
        assert_eq!(request.kind, PuzzleKind::RandomPast);
    }

    #[test]
    fn test_api_error_status_codes() {
        let response = ApiError(OddestOneOutError::SessionNotFound("x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError(OddestOneOutError::InvalidDate("x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError(OddestOneOutError::PuzzleSource("x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_api_status_endpoint() {
        let manager = manager();
        manager.create_session(PuzzleKind::Today, "2026-10-19").await;
        let response = api_status(State(manager)).await;
        assert_eq!(response.0.status, "ready");
        assert_eq!(response.0.message, "1 active sessions");
    }

    #[tokio::test]
    async fn test_new_game_rejects_bad_date() {
        let request = NewGameRequest {
            kind: PuzzleKind::Today,
            date: Some("19/10/2026".to_string()),
        };
        let result = api_new_game(State(manager()), Json(request)).await;
        assert!(matches!(result, Err(ApiError(OddestOneOutError::InvalidDate(_)))));
    }
}
