use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use kachingko_core::capture::ReceiptImage;
use kachingko_core::config::Settings;
use kachingko_core::domain::{ExpenseRecord, ReceiptItem};
use kachingko_core::extract::{ExtractionOutcome, ReceiptExtractor, ScanGate};
use kachingko_core::insights::{
    self, BudgetStatus, CategorySpend, DailySpend, GoalProgress, GoalUpdate, RewardSummary,
};
use kachingko_core::llm::gemini::GeminiClient;
use kachingko_core::storage::{
    self, ExpenseStore, GoalStore, ItemDeletion, JsonFileStore, JsonGoalFile,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let extractor = match GeminiClient::from_settings(&settings) {
        Ok(client) => {
            let timeout = client.timeout();
            Some(
                ReceiptExtractor::new(Arc::new(client), settings.currency.clone())
                    .with_timeout(timeout),
            )
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "model client unavailable; scans disabled");
            None
        }
    };

    tracing::info!(path = %settings.store_path.display(), "using expense store");
    let store: Arc<dyn ExpenseStore> = Arc::new(JsonFileStore::new(&settings.store_path));
    let goals: Arc<dyn GoalStore> = Arc::new(JsonGoalFile::new(&settings.goal_path));

    let state = AppState {
        store,
        goals,
        extractor,
        gate: ScanGate::new(),
        settings: Arc::new(settings),
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/scans", post(post_scan))
        .route("/expenses", get(list_expenses))
        .route("/expenses/:id", delete(delete_expense))
        .route("/expenses/:id/items/:index", delete(delete_expense_item))
        .route("/budget", get(get_budget))
        .route("/rewards", get(get_rewards))
        .route("/goal", get(get_goal).patch(patch_goal))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ExpenseStore>,
    goals: Arc<dyn GoalStore>,
    extractor: Option<ReceiptExtractor>,
    gate: ScanGate,
    settings: Arc<Settings>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn internal(e: anyhow::Error) -> ApiError {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %e, "request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

#[derive(Debug, Deserialize)]
struct ScanRequest {
    /// Data URI, e.g. `data:image/jpeg;base64,...`.
    image: String,
    #[serde(default)]
    save: bool,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum ScanStatus {
    Items,
    Empty,
}

#[derive(Debug, Serialize)]
struct ScanResponse {
    status: ScanStatus,
    items: Vec<ReceiptItem>,
    total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_id: Option<Uuid>,
}

async fn post_scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let Some(extractor) = &state.extractor else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "receipt scanning is not configured",
        ));
    };

    let image = ReceiptImage::from_data_uri(&req.image).map_err(|e| {
        tracing::warn!(error = %e, "rejected receipt image");
        api_error(StatusCode::UNPROCESSABLE_ENTITY, e.user_message())
    })?;

    let now = chrono::Utc::now();
    let offset = state.settings.utc_offset().map_err(internal)?;
    let record_date = kachingko_core::time::resolve_record_date(req.date.as_deref(), now, offset)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let _permit = state
        .gate
        .try_acquire()
        .map_err(|e| api_error(StatusCode::CONFLICT, e.to_string()))?;

    let result = match extractor.extract(&image).await {
        Ok(ExtractionOutcome::Items(result)) => result,
        Ok(ExtractionOutcome::Empty { .. }) => {
            return Ok(Json(ScanResponse {
                status: ScanStatus::Empty,
                items: Vec::new(),
                total: 0.0,
                record_id: None,
            }))
        }
        Err(failed) => {
            let user_message = failed.user_message();
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(failed));
            return Err(api_error(StatusCode::BAD_GATEWAY, user_message));
        }
    };

    let record = ExpenseRecord::from_extraction(result, record_date, now);
    let total = record.total;
    if !req.save {
        return Ok(Json(ScanResponse {
            status: ScanStatus::Items,
            items: record.items,
            total,
            record_id: None,
        }));
    }

    let id = record.id;
    let items = record.items.clone();
    state.store.append(record).await.map_err(internal)?;
    tracing::info!(%id, %record_date, "saved receipt");

    Ok(Json(ScanResponse {
        status: ScanStatus::Items,
        items,
        total,
        record_id: Some(id),
    }))
}

async fn list_expenses(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExpenseRecord>>, ApiError> {
    let records = state.store.list().await.map_err(internal)?;
    Ok(Json(insights::newest_first(records)))
}

async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if storage::delete_record(state.store.as_ref(), id)
        .await
        .map_err(internal)?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "no such receipt"))
    }
}

#[derive(Debug, Serialize)]
struct ItemDeleted {
    item: ReceiptItem,
    record_removed: bool,
}

async fn delete_expense_item(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ItemDeleted>, ApiError> {
    match storage::delete_item(state.store.as_ref(), id, index)
        .await
        .map_err(internal)?
    {
        ItemDeletion::Removed(item) => Ok(Json(ItemDeleted {
            item,
            record_removed: false,
        })),
        ItemDeletion::RemovedWithRecord(item) => Ok(Json(ItemDeleted {
            item,
            record_removed: true,
        })),
        ItemDeletion::NotFound => Err(api_error(StatusCode::NOT_FOUND, "no such item")),
    }
}

#[derive(Debug, Deserialize)]
struct BudgetQuery {
    date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct BudgetView {
    year: i32,
    month: u32,
    status: BudgetStatus,
    categories: Vec<CategorySpend>,
    daily: Vec<DailySpend>,
}

async fn get_budget(
    State(state): State<AppState>,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<BudgetView>, ApiError> {
    let records = state.store.list().await.map_err(internal)?;
    let offset = state.settings.utc_offset().map_err(internal)?;
    let (year, month) = match query.date {
        Some(d) => {
            use chrono::Datelike;
            (d.year(), d.month())
        }
        None => kachingko_core::time::current_month(chrono::Utc::now(), offset),
    };

    let spent = insights::monthly_total(&records, year, month);
    Ok(Json(BudgetView {
        year,
        month,
        status: BudgetStatus::new(state.settings.budget_limit, spent),
        categories: insights::spend_by_category(&records, query.date),
        daily: insights::spend_by_date(&records),
    }))
}

async fn get_rewards(State(state): State<AppState>) -> Result<Json<RewardSummary>, ApiError> {
    let records = state.store.list().await.map_err(internal)?;
    Ok(Json(RewardSummary::from_records(&records)))
}

async fn get_goal(State(state): State<AppState>) -> Result<Json<GoalProgress>, ApiError> {
    let goal = state.goals.load_goal().await.map_err(internal)?;
    Ok(Json(GoalProgress::from(goal)))
}

async fn patch_goal(
    State(state): State<AppState>,
    Json(update): Json<GoalUpdate>,
) -> Result<Json<GoalProgress>, ApiError> {
    let saved = state.goals.load_goal().await.map_err(internal)?;
    let goal = update
        .apply(&saved)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    state.goals.save_goal(&goal).await.map_err(internal)?;
    tracing::info!(percent = goal.progress_percent(), "financial goal updated");
    Ok(Json(GoalProgress::from(goal)))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use kachingko_core::llm::{Provider, VisionModel, VisionRequest};
    use kachingko_core::storage::{MemoryGoalStore, MemoryStore};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;

    struct CannedModel(Option<&'static str>);

    #[async_trait::async_trait]
    impl VisionModel for CannedModel {
        fn provider(&self) -> Provider {
            Provider::Fake
        }

        async fn generate(&self, _request: VisionRequest) -> anyhow::Result<String> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => anyhow::bail!("upstream unavailable"),
            }
        }
    }

    fn state(reply: Option<&'static str>) -> AppState {
        AppState {
            store: Arc::new(MemoryStore::default()),
            goals: Arc::new(MemoryGoalStore::default()),
            extractor: Some(ReceiptExtractor::new(Arc::new(CannedModel(reply)), "PHP")),
            gate: ScanGate::new(),
            settings: Arc::new(Settings {
                gemini_api_key: None,
                sentry_dsn: None,
                store_path: PathBuf::from("unused.json"),
                goal_path: PathBuf::from("unused-goal.json"),
                currency: "PHP".to_string(),
                utc_offset_hours: 8,
                budget_limit: 15_000.0,
            }),
        }
    }

    async fn call(state: AppState, req: Request<Body>) -> (StatusCode, Value) {
        let res = app(state).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn scan_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/scans")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn patch_goal_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("PATCH")
            .uri("/goal")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const COFFEE: &str =
        "```json\n{\"items\":[{\"name\":\"Coffee\",\"price\":4.5,\"category\":\"Food\"}]}\n```";

    #[tokio::test]
    async fn saved_scan_shows_up_in_history_and_rewards() {
        let state = state(Some(COFFEE));
        let (status, body) = call(
            state.clone(),
            scan_request(json!({
                "image": "data:image/jpeg;base64,AAAA",
                "save": true,
                "date": "2026-05-02"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "items");
        assert_eq!(body["items"][0]["name"], "Coffee");
        assert_eq!(body["total"], 4.5);
        assert!(body["record_id"].is_string());

        let (status, history) = call(state.clone(), get("/expenses")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["date"], "2026-05-02");

        let (_, rewards) = call(state, get("/rewards")).await;
        assert_eq!(rewards["scans"], 1);
        assert_eq!(rewards["points"], 0);
    }

    #[tokio::test]
    async fn unsaved_scan_leaves_store_untouched() {
        let state = state(Some(COFFEE));
        let (status, body) = call(
            state.clone(),
            scan_request(json!({"image": "data:image/jpeg;base64,AAAA"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("record_id").is_none());
        assert!(state.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scan_outcomes_map_to_statuses() {
        let (status, body) = call(
            state(Some(COFFEE)),
            scan_request(json!({"image": "data:application/pdf;base64,AAAA"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Please select a valid image file.");

        let (status, body) = call(
            state(Some("Sorry, this image is too blurry.")),
            scan_request(json!({"image": "data:image/jpeg;base64,AAAA"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "empty");

        let (status, body) = call(
            state(None),
            scan_request(json!({"image": "data:image/jpeg;base64,AAAA"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to process receipt. Please try again.");
    }

    #[tokio::test]
    async fn concurrent_scan_is_refused() {
        let state = state(Some(COFFEE));
        let _busy = state.gate.try_acquire().unwrap();
        let (status, _) = call(
            state.clone(),
            scan_request(json!({"image": "data:image/jpeg;base64,AAAA"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn budget_reports_requested_month() {
        let state = state(Some(COFFEE));
        call(
            state.clone(),
            scan_request(json!({
                "image": "data:image/jpeg;base64,AAAA",
                "save": true,
                "date": "2026-05-02"
            })),
        )
        .await;

        let (status, budget) = call(state, get("/budget?date=2026-05-02")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(budget["year"], 2026);
        assert_eq!(budget["month"], 5);
        assert_eq!(budget["status"]["spent"], 4.5);
        assert_eq!(budget["categories"][0]["category"], "Food");
    }

    #[tokio::test]
    async fn goal_edits_are_saved_and_progress_is_capped() {
        let state = state(Some(COFFEE));

        let (status, goal) = call(state.clone(), get("/goal")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(goal["target"], 10_000.0);
        assert_eq!(goal["percent"], 0);

        let (status, goal) = call(
            state.clone(),
            patch_goal_request(json!({"description": "Emergency fund", "current": 6500.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(goal["percent"], 65);
        assert_eq!(goal["remaining"], 3500.0);

        let (_, goal) = call(state.clone(), patch_goal_request(json!({"current": 12000.0}))).await;
        assert_eq!(goal["percent"], 100);
        assert_eq!(goal["description"], "Emergency fund");

        let (status, body) = call(state.clone(), patch_goal_request(json!({"target": 0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid financial goal: target must be a positive amount");

        let (_, goal) = call(state, get("/goal")).await;
        assert_eq!(goal["current"], 12000.0);
    }
}
