//! HTTP gateway for starting scrapper jobs.
//!
//! One route does the work: `POST /start-scrapper-job` takes a JSON body
//! naming a directory under the jobs directory, runs it in a container, and
//! answers with the container's captured stdout. Validation problems come
//! back as 400, everything else that goes wrong as 500, both shaped as
//! `{"status":"error","message":...}`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::sandbox::{JobRunner, JobSpec, resolve_job_dir};

/// Shared state for the gateway.
#[derive(Clone)]
pub struct GatewayState {
    /// Process-wide job runner holding the Docker connection.
    pub runner: Arc<JobRunner>,
    /// Base directory all job paths must resolve inside.
    pub jobs_dir: PathBuf,
}

/// The public HTTP server.
pub struct Gateway;

impl Gateway {
    /// Build the axum router.
    pub fn router(state: GatewayState) -> Router {
        Router::new()
            .route("/start-scrapper-job", post(start_job))
            .route("/health", get(health))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serve on the given port until the process is stopped.
    pub async fn start(state: GatewayState, port: u16) -> std::io::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("gateway listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, Self::router(state)).await
    }
}

/// Incoming job request body.
///
/// `programDirectory` is modeled as optional so its absence produces a 400
/// naming the field instead of the framework's generic rejection. Unknown
/// fields pass through ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRequest {
    #[serde(default)]
    program_directory: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}

async fn start_job(
    State(state): State<GatewayState>,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let Some(raw_dir) = req.program_directory else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing required field programDirectory",
        );
    };

    let job_id = Uuid::new_v4();

    let host_dir = match resolve_job_dir(&state.jobs_dir, &raw_dir) {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(job_id = %job_id, directory = %raw_dir, "rejected job request: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let spec = JobSpec::new(host_dir);
    tracing::info!(job_id = %job_id, directory = %spec.host_dir.display(), "starting scrapper job");

    match state.runner.execute(&spec).await {
        Ok(output) => {
            tracing::info!(job_id = %job_id, "scrapper job succeeded");
            // The job's stdout is the response body; by convention it is the
            // job script's own JSON.
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                output,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(
                job_id = %job_id,
                directory = %spec.host_dir.display(),
                "scrapper job failed: {}",
                e
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn error_response(code: StatusCode, message: impl Into<String>) -> Response {
    (
        code,
        Json(ErrorBody {
            status: "error",
            message: message.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    /// State backed by a lazily-connected Docker client. The tests below
    /// never reach a Docker API call, so no daemon is needed.
    fn test_state(jobs_dir: PathBuf) -> GatewayState {
        let docker = bollard::Docker::connect_with_http(
            "http://localhost:2375",
            120,
            bollard::API_DEFAULT_VERSION,
        )
        .unwrap();
        GatewayState {
            runner: Arc::new(JobRunner::new(docker)),
            jobs_dir,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/start-scrapper-job")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let router = Gateway::router(test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn missing_program_directory_names_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let router = Gateway::router(test_state(dir.path().to_path_buf()));

        let response = router.oneshot(post_json("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .contains("programDirectory")
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let router = Gateway::router(test_state(dir.path().to_path_buf()));

        let response = router.oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn escaping_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = dir.path().join("jobs");
        std::fs::create_dir(&jobs).unwrap();
        std::fs::create_dir(dir.path().join("outside")).unwrap();
        let router = Gateway::router(test_state(jobs));

        let response = router
            .oneshot(post_json(r#"{"programDirectory": "../outside"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn unknown_extra_fields_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let router = Gateway::router(test_state(dir.path().to_path_buf()));

        // Extra fields must not cause a parse rejection; the missing
        // directory is still the reported problem.
        let response = router
            .oneshot(post_json(r#"{"priority": "high"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .contains("programDirectory")
        );
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let router = Gateway::router(test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/some-other-route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
