use crate::agent::Agent;
use crate::api::types::{AskRequest, AskResponse, ErrorResponse};
use crate::error::SamvadaError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct ApiState {
    agent: Arc<Agent>,
}

/// failed request, rendered as a structured body instead of a bare fault
pub struct ApiError(SamvadaError);

impl From<SamvadaError> for ApiError {
    fn from(e: SamvadaError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.root() {
            SamvadaError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ if self.0.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: "could not complete request".to_string(),
            detail: self.0.root().to_string(),
            stage: self.0.stage().map(|s| s.to_string()),
        };

        tracing::error!(
            status = status.as_u16(),
            stage = ?body.stage,
            "request failed: {}",
            self.0
        );
        (status, Json(body)).into_response()
    }
}

/// POST /ask
async fn ask(
    State(state): State<ApiState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| SamvadaError::InvalidRequest(e.body_text()))?;
    let history = req.history();
    tracing::info!(history_len = history.len(), "ask request received");

    let outcome = state.agent.ask(&req.user_input, history).await?;

    Ok(Json(AskResponse {
        response: outcome.response,
        messages: outcome.messages.into_iter().map(|m| m.content).collect(),
    }))
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(agent: Arc<Agent>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(ask))
        .route("/health", get(health))
        .with_state(ApiState { agent })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::graph::{StageContext, StageId};
    use crate::testing::{scalar, FakeDatabase, ScriptedModel};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(model: ScriptedModel, db: FakeDatabase) -> Router {
        let ctx = StageContext::new(Arc::new(model), Arc::new(db), AgentConfig::default());
        create_router(Arc::new(Agent::new(ctx).unwrap()))
    }

    async fn post_ask(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/ask")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_greeting_over_http() {
        let app = router(
            ScriptedModel::new().reply("CONVERSATIONAL: Hello, I am a database assistant"),
            FakeDatabase::erp(),
        );

        let (status, body) =
            post_ask(app, json!({ "user_input": "Hi there", "messages": [] })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Hello, I am a database assistant");
        assert_eq!(
            body["messages"],
            json!(["Hi there", "Hello, I am a database assistant"])
        );
    }

    #[tokio::test]
    async fn test_history_is_returned_with_new_turns() {
        let app = router(
            ScriptedModel::new()
                .reply("CANNOT_ANSWER")
                .reply("")
                .reply("How many customers are there?")
                .execute_query("SELECT COUNT(*) AS n FROM customer")
                .reply("1")
                .reply("You have 1 customer."),
            FakeDatabase::erp().with_result(scalar("n", "1")),
        );

        let (status, body) = post_ask(
            app,
            json!({ "user_input": "How many customers?", "messages": ["Hello!"] }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "You have 1 customer.");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0], "Hello!");
        assert_eq!(messages[1], "How many customers?");
        assert_eq!(messages.last().unwrap(), "You have 1 customer.");
    }

    #[tokio::test]
    async fn test_model_failure_returns_structured_error() {
        let app = router(ScriptedModel::new().fail("rate limited"), FakeDatabase::erp());

        let (status, body) = post_ask(app, json!({ "user_input": "Hi" })).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "could not complete request");
        assert_eq!(body["stage"], StageId::ConversationalQa.as_str());
        assert!(body["detail"].as_str().unwrap().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_empty_question_is_unprocessable() {
        let app = router(ScriptedModel::new(), FakeDatabase::erp());
        let (status, body) = post_ask(app, json!({ "user_input": "  " })).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["stage"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let app = router(ScriptedModel::new(), FakeDatabase::erp());
        let (status, body) = post_ask(app, json!({ "messages": ["Hello!"] })).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("user_input"));
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(ScriptedModel::new(), FakeDatabase::erp());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
