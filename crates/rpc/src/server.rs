use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use profil_core::{InputRecord, Prediction, Predictor};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared per-process state: the predictor plus request bookkeeping.
/// Everything behind the Arc is read-only or atomic, so handlers never lock.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        Self {
            predictor: Arc::new(predictor),
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    model_version: u32,
    feature_count: usize,
    req_total: u64,
}

/// `/predict` always answers 200: either the ranked predictions or a
/// structured error payload. Request failures must never crash or leak a
/// bare 5xx; the clients only understand this envelope.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PredictResponse {
    Success { predictions: Vec<Prediction> },
    Failure { error: String },
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    axum::serve(listener, app)
        .await
        .context("prediction API server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind API listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind API listener on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    // browser clients call this API cross-origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/predict", post(handle_predict))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn handle_root(State(state): State<SharedState>) -> Json<RootResponse> {
    state.record_request();
    Json(RootResponse {
        message: "Obesity Profile Prediction API",
        status: "healthy",
        version: profil_core::VERSION,
    })
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_seconds(),
        model_version: state.predictor.model_version(),
        feature_count: state.predictor.feature_count(),
        req_total,
    })
}

async fn handle_predict(
    State(state): State<SharedState>,
    Json(record): Json<InputRecord>,
) -> Json<PredictResponse> {
    state.record_request();

    match state.predictor.predict(&record) {
        Ok(predictions) => Json(PredictResponse::Success { predictions }),
        Err(err) => {
            warn!("prediction request failed: {err}");
            Json(PredictResponse::Failure {
                error: err.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use profil_core::model::{Node, ProfileClassifier, ProfileModel, Tree};
    use profil_core::{
        Artifacts, ConditionVocabularies, EncoderSet, LabelEncoder, PROFILE_LABELS,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn create_test_state() -> SharedState {
        let classifiers = PROFILE_LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| ProfileClassifier {
                target: label.to_string(),
                bias: -0.1 * i as f64,
                trees: vec![Tree {
                    nodes: vec![Node {
                        feature_index: 0,
                        threshold: 0.0,
                        left: 0,
                        right: 0,
                        value: Some(0.5),
                    }],
                }],
            })
            .collect();

        let model = ProfileModel {
            version: 1,
            feature_count: 3,
            classifiers,
            metadata: HashMap::new(),
        };

        let mut encoders = HashMap::new();
        encoders.insert(
            "Sexe".to_string(),
            LabelEncoder {
                classes: vec!["F".into(), "M".into()],
            },
        );

        let artifacts = Artifacts {
            model,
            encoders: EncoderSet::new(encoders),
            feature_order: vec!["Sexe".into(), "Age".into(), "fh_diabete".into()],
            vocabularies: ConditionVocabularies {
                family: vec!["diabete".into()],
                psy: vec!["depression".into()],
                treatment: vec!["cortisone".into()],
                medical: vec!["chirurgie".into()],
            },
        };

        Arc::new(AppState::new(Predictor::new(artifacts)))
    }

    fn predict_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn full_record() -> Value {
        json!({
            "terrain familial": "diabete, non",
            "trouble psy": "non",
            "traitements": "non",
            "TT medical": "non",
            "Sexe": "M",
            "Age": 34
        })
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn predict_returns_ranked_predictions() {
        let app = build_router(create_test_state());

        let response = app.oneshot(predict_request(full_record())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        let predictions = body["predictions"].as_array().unwrap();
        assert_eq!(predictions.len(), PROFILE_LABELS.len());

        let first = &predictions[0];
        assert_eq!(first["profile"], "digestif");
        assert!(first["percentage"].as_str().unwrap().ends_with('%'));

        let probabilities: Vec<f64> = predictions
            .iter()
            .map(|p| p["probability"].as_f64().unwrap())
            .collect();
        for pair in probabilities.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[tokio::test]
    async fn predict_with_missing_field_returns_error_payload() {
        let app = build_router(create_test_state());

        let mut record = full_record();
        record.as_object_mut().unwrap().remove("trouble psy");

        let response = app.oneshot(predict_request(record)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["error"], "missing required field `trouble psy`");
        assert!(body.get("predictions").is_none());
    }

    #[tokio::test]
    async fn service_keeps_serving_after_a_failed_request() {
        let state = create_test_state();

        let mut broken = full_record();
        broken.as_object_mut().unwrap().remove("TT medical");
        let response = build_router(state.clone())
            .oneshot(predict_request(broken))
            .await
            .unwrap();
        assert!(response_json(response).await.get("error").is_some());

        let response = build_router(state)
            .oneshot(predict_request(full_record()))
            .await
            .unwrap();
        assert!(response_json(response).await.get("predictions").is_some());
    }

    #[tokio::test]
    async fn root_reports_service_identity() {
        let app = build_router(create_test_state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["message"], "Obesity Profile Prediction API");
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn health_reports_model_shape() {
        let app = build_router(create_test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_version"], 1);
        assert_eq!(body["feature_count"], 3);
    }
}
