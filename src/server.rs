use crate::config::AppConfig;
use crate::data::{load_model, Readiness};
use crate::render::{render_loading_page, render_page, render_svg};
use crate::tooltip::{HoverState, Pointer};
use crate::types::{EducationRecord, MapModel, RenderedCounty};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

pub struct AppState {
    pub config: AppConfig,
    pub readiness: Readiness,
}

/// Optional hover for the declarative endpoints: `?fips=1001&x=120&y=340`.
#[derive(Debug, Default, Deserialize)]
pub struct HoverParams {
    fips: Option<u32>,
    x: Option<f64>,
    y: Option<f64>,
}

impl HoverParams {
    fn hover_state(&self, model: &MapModel) -> HoverState {
        let mut hover = HoverState::Idle;
        if let Some(county) = self.fips.and_then(|fips| model.county(fips)) {
            let pointer = Pointer {
                x: self.x.unwrap_or(0.0),
                y: self.y.unwrap_or(0.0),
            };
            hover.enter(county, pointer);
        }
        hover
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    x: f64,
    y: f64,
}

#[derive(Serialize)]
pub struct CountyResponse {
    fips: Option<u32>,
    education: f64,
    fill: &'static str,
    record: Option<EducationRecord>,
}

impl From<&RenderedCounty> for CountyResponse {
    fn from(county: &RenderedCounty) -> Self {
        Self {
            fips: county.fips,
            education: county.education(),
            fill: county.fill,
            record: county.record.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct StatusResponse {
    ready: bool,
}

const NOT_READY: (StatusCode, &str) = (StatusCode::SERVICE_UNAVAILABLE, "map is still loading");

pub fn router(state: Arc<AppState>) -> Router {
    let output_service = ServeDir::new(&state.config.output.dir);

    Router::new()
        .route("/", get(page_handler))
        .route("/map.svg", get(svg_handler))
        .route("/api/status", get(status_handler))
        .route("/api/query", get(query_handler))
        .route("/api/counties/:fips", get(county_handler))
        .nest_service("/output", output_service)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Load both datasets in the background. On failure the state never becomes
/// ready and every page keeps showing the loading presentation.
pub fn spawn_loader(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match load_model(&state.config.input).await {
            Ok(model) => {
                let counties = model.counties.len();
                if state.readiness.mark_loaded(model) {
                    info!(counties, "map ready");
                }
            }
            Err(e) => error!(error = %e, "failed to load datasets; staying in loading state"),
        }
    })
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState {
        config,
        readiness: Readiness::new(),
    });

    spawn_loader(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn page_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HoverParams>,
) -> Html<String> {
    match state.readiness.model() {
        Some(model) => Html(render_page(&model, &params.hover_state(&model))),
        None => Html(render_loading_page()),
    }
}

async fn svg_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HoverParams>,
) -> Response {
    let Some(model) = state.readiness.model() else {
        return NOT_READY.into_response();
    };
    let svg = render_svg(&model, &params.hover_state(&model));
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response()
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ready: state.readiness.is_ready(),
    })
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Response {
    let Some(model) = state.readiness.model() else {
        return NOT_READY.into_response();
    };
    let hit: Option<CountyResponse> = model.county_at(params.x, params.y).map(Into::into);
    Json(hit).into_response()
}

async fn county_handler(State(state): State<Arc<AppState>>, Path(fips): Path<u32>) -> Response {
    let Some(model) = state.readiness.model() else {
        return NOT_READY.into_response();
    };
    match model.county(fips) {
        Some(county) => Json(CountyResponse::from(county)).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no county with FIPS {fips}")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::test_support::sample_model;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn state(loaded: bool) -> Arc<AppState> {
        let readiness = Readiness::new();
        if loaded {
            readiness.mark_loaded(sample_model());
        }
        Arc::new(AppState {
            config: AppConfig::default(),
            readiness,
        })
    }

    async fn fetch(state: Arc<AppState>, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn serves_loading_page_until_ready() {
        let (status, body) = fetch(state(false), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Loading choropleth map..."));
        assert!(!body.contains("<svg"));

        let (status, _) = fetch(state(false), "/map.svg").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (_, body) = fetch(state(false), "/api/status").await;
        assert_eq!(body, r#"{"ready":false}"#);
    }

    #[tokio::test]
    async fn serves_map_once_ready() {
        let (status, body) = fetch(state(true), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"id="title""#));
        assert!(body.contains(r#"data-fips="1001""#));

        let (_, body) = fetch(state(true), "/api/status").await;
        assert_eq!(body, r#"{"ready":true}"#);
    }

    #[tokio::test]
    async fn hover_params_render_emphasis_and_tooltip() {
        let (_, body) = fetch(state(true), "/?fips=1003&x=100&y=100").await;
        assert!(body.contains(r#"data-education="61" style="opacity:1"#));

        let (status, svg) = fetch(state(true), "/map.svg?fips=1003").await;
        assert_eq!(status, StatusCode::OK);
        let line = svg.lines().find(|l| l.contains(r#"data-fips="1003""#)).unwrap();
        assert!(line.contains(r##"stroke="#333" stroke-width="2""##));
    }

    #[tokio::test]
    async fn query_hit_tests_in_map_coordinates() {
        let (_, body) = fetch(state(true), "/api/query?x=0.5&y=0.5").await;
        let hit: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(hit["fips"], 1001);
        assert_eq!(hit["fill"], "#c6dbef");
        assert_eq!(hit["record"]["area_name"], "Autauga County");

        let (_, body) = fetch(state(true), "/api/query?x=500&y=500").await;
        assert_eq!(body, "null");
    }

    #[tokio::test]
    async fn county_lookup() {
        let (_, body) = fetch(state(true), "/api/counties/9999").await;
        let county: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(county["education"], 0.0);
        assert_eq!(county["fill"], "#ccc");
        assert!(county["record"].is_null());

        let (status, _) = fetch(state(true), "/api/counties/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_load_stays_in_loading_state() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let mut config = AppConfig::default();
        config.input = InputConfig {
            education: missing.display().to_string(),
            topology: missing.display().to_string(),
        };
        let state = Arc::new(AppState {
            config,
            readiness: Readiness::new(),
        });

        spawn_loader(state.clone()).await.unwrap();
        assert!(!state.readiness.is_ready());

        let (_, body) = fetch(state, "/").await;
        assert!(body.contains("Loading choropleth map..."));
    }
}
