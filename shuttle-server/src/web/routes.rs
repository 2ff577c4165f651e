//! HTTP route handlers.

use askama::Template;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, Utc};
use tower_http::services::ServeDir;
use tracing::{error, warn};

use crate::domain::{DomainError, InvalidStopId, StopId, format_clock, haversine_km, nearest_stop};
use crate::tracker::{AlertError, plan_alert};

use super::dto::*;
use super::state::AppState;
use super::templates::*;

/// Lead time used when an alert request does not give one.
const DEFAULT_ALERT_LEAD_MINS: f64 = 5.0;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
        .route("/api/arrivals", get(arrivals))
        .route("/api/stops", get(stops))
        .route("/api/stops/nearest", get(nearest))
        .route("/api/vehicles", get(vehicles))
        .route("/api/status", get(status))
        .route("/api/alerts/plan", get(alert_plan))
        .route("/api/refresh", post(refresh))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The arrival board page.
async fn index_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let now = Local::now();
    let snapshot = state.tracker.snapshot(&now).await;
    let last_updated = snapshot.last_updated.map(|t| t.with_timezone(&Local));

    let template = IndexTemplate::new(
        &snapshot,
        state.tracker.route(),
        format_clock(last_updated.as_ref()),
    );
    let html = template.render().map_err(|e| AppError::Internal {
        message: format!("Template error: {}", e),
    })?;
    Ok(Html(html))
}

/// Per-stop arrivals in the current mode.
async fn arrivals(State(state): State<AppState>) -> Json<ArrivalsResponse> {
    let snapshot = state.tracker.snapshot(&Local::now()).await;
    let last_updated_label = format_clock(
        snapshot
            .last_updated
            .map(|t| t.with_timezone(&Local))
            .as_ref(),
    );

    Json(ArrivalsResponse {
        mode: snapshot.mode,
        label: snapshot.mode.label(),
        live_fresh: snapshot.live_fresh,
        last_updated: snapshot.last_updated,
        last_updated_label,
        arrivals: snapshot.arrivals,
    })
}

/// Route outline and stops.
async fn stops(State(state): State<AppState>) -> Response {
    let route = state.tracker.route();
    Json(StopsResponse {
        route: route.outline(),
        stops: route.stops(),
    })
    .into_response()
}

/// The stop nearest a position, or the first stop without one.
async fn nearest(
    State(state): State<AppState>,
    Query(query): Query<NearestStopQuery>,
) -> Result<Response, AppError> {
    let position = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(DomainError::InvalidCoordinates { lat, lng }.into());
            }
            Some((lat, lng))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest {
                message: "lat and lng must be given together".to_string(),
            });
        }
    };

    let route = state.tracker.route();
    let candidates = route.plain_stops();
    let stop = nearest_stop(&candidates, position)
        .and_then(|s| route.stop(&s.id))
        .ok_or_else(|| AppError::NotFound {
            message: "route has no stops".to_string(),
        })?;

    let distance_km = match (position, stop.stop.lat, stop.stop.lng) {
        (Some((lat, lng)), Some(s_lat), Some(s_lng)) => Some(haversine_km(lat, lng, s_lat, s_lng)),
        _ => None,
    };

    Ok(Json(NearestStopResponse { stop, distance_km }).into_response())
}

/// Vehicle positions along the loop.
async fn vehicles(State(state): State<AppState>) -> Json<VehiclesResponse> {
    let snapshot = state.tracker.snapshot(&Utc::now()).await;
    Json(VehiclesResponse {
        mode: snapshot.mode,
        vehicles: snapshot.vehicles,
    })
}

/// Service status, feed health and telemetry counters.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: state.tracker.service().await,
        feeds: state.tracker.feed_summary().await,
        telemetry: state.tracker.telemetry().counters(),
    })
}

/// Plan an arrival alert.
async fn alert_plan(
    State(state): State<AppState>,
    Query(query): Query<AlertPlanQuery>,
) -> Result<Json<AlertPlanResponse>, AppError> {
    let stop = StopId::parse(&query.stop).map_err(DomainError::from)?;
    if state.tracker.route().stop(&stop).is_none() {
        return Err(DomainError::UnknownStop(stop).into());
    }

    let now = Local::now();
    let snapshot = state.tracker.snapshot(&now).await;
    let lead = query.lead.unwrap_or(DEFAULT_ALERT_LEAD_MINS);
    let plan = plan_alert(&snapshot.arrivals, &stop, lead, snapshot.service.state)?;

    let fire_at = now.with_timezone(&Utc) + plan.delay();
    Ok(Json(AlertPlanResponse { plan, fire_at }))
}

/// Fetch the live feed now.
async fn refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let status = state.refresher.refresh_now().await;
    let mode = state.tracker.tick(Utc::now()).await;
    Json(RefreshResponse { status, mode })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Conflict { message: String },
    Internal { message: String },
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UnknownStop(_) => AppError::NotFound {
                message: e.to_string(),
            },
            DomainError::InvalidStopId(_) | DomainError::InvalidCoordinates { .. } => {
                AppError::BadRequest {
                    message: e.to_string(),
                }
            }
        }
    }
}

impl From<InvalidStopId> for AppError {
    fn from(e: InvalidStopId) -> Self {
        DomainError::from(e).into()
    }
}

impl From<AlertError> for AppError {
    fn from(e: AlertError) -> Self {
        let message = e.to_string();
        match e {
            AlertError::InvalidLead(_) => AppError::BadRequest { message },
            AlertError::UnknownStop(_) | AlertError::NoArrivalBeyondLead { .. } => {
                AppError::NotFound { message }
            }
            AlertError::ServicePaused => AppError::Conflict { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::{RouteGeometry, Vehicle};
    use crate::feeds::{LiveEta, LiveFeed, MockFeedClient, StatusPayload};
    use crate::tracker::{DataMode, FeedStatus, Refresher, Telemetry, Tracker, TrackerConfig};

    async fn app_state(mock: MockFeedClient) -> AppState {
        let tracker = Arc::new(Tracker::new(
            TrackerConfig::default(),
            RouteGeometry::campus(),
            Telemetry::new(),
        ));
        let refresher = Arc::new(Refresher::new(Arc::clone(&tracker), mock));
        refresher.refresh_live().await;
        refresher.refresh_status().await;
        AppState::new(tracker, refresher)
    }

    fn live_feed(eta: f64) -> LiveFeed {
        let mut feed = LiveFeed::default();
        feed.etas.insert(
            "commons".into(),
            vec![LiveEta {
                vehicle_id: Some("t1".into()),
                eta_minutes: Some(eta),
            }],
        );
        feed.vehicles.push(Vehicle {
            id: "t1".into(),
            progress: None,
        });
        feed
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn arrivals_in_live_mode() {
        let mock = MockFeedClient::new();
        mock.set_live(live_feed(6.0)).await;
        let state = app_state(mock).await;

        let Json(resp) = arrivals(State(state)).await;
        assert_eq!(resp.mode, DataMode::Live);
        assert_eq!(resp.label, "Live ETA");
        assert_eq!(resp.arrivals.len(), 8);
        let commons = &resp.arrivals[&StopId::parse("commons").unwrap()];
        assert_eq!(commons.source, DataMode::Live);
        assert!(commons.times[0] <= 6.0);
    }

    #[tokio::test]
    async fn nearest_stop_by_coordinates() {
        let state = app_state(MockFeedClient::new()).await;

        let resp = nearest(
            State(state.clone()),
            Query(NearestStopQuery {
                lat: Some(28.0629),
                lng: Some(-80.6268),
            }),
        )
        .await
        .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["stop"]["id"], "bridge");
        assert!(json["distanceKm"].as_f64().unwrap() < 0.01);

        // No position: first stop.
        let resp = nearest(
            State(state.clone()),
            Query(NearestStopQuery {
                lat: None,
                lng: None,
            }),
        )
        .await
        .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["stop"]["id"], "commons");
        assert!(json["distanceKm"].is_null());
    }

    #[tokio::test]
    async fn nearest_stop_rejects_bad_coordinates() {
        let state = app_state(MockFeedClient::new()).await;
        let err = nearest(
            State(state.clone()),
            Query(NearestStopQuery {
                lat: Some(95.0),
                lng: Some(0.0),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = nearest(
            State(state),
            Query(NearestStopQuery {
                lat: Some(28.0),
                lng: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn alert_plan_uses_board() {
        let mock = MockFeedClient::new();
        mock.set_live(live_feed(12.0)).await;
        let state = app_state(mock).await;

        let Json(resp) = alert_plan(
            State(state),
            Query(AlertPlanQuery {
                stop: "commons".into(),
                lead: Some(5.0),
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.plan.source, DataMode::Live);
        assert!(resp.plan.delay_ms > 0);
        assert!(resp.fire_at > Utc::now());
    }

    #[tokio::test]
    async fn alert_plan_errors() {
        let mock = MockFeedClient::new();
        mock.set_status(StatusPayload {
            state: Some("off".into()),
            ..StatusPayload::default()
        })
        .await;
        let state = app_state(mock).await;

        let query = |stop: &str| {
            Query(AlertPlanQuery {
                stop: stop.into(),
                lead: None,
            })
        };

        let err = alert_plan(State(state.clone()), query("Not An Id"))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = alert_plan(State(state.clone()), query("nowhere"))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = alert_plan(State(state), query("commons")).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn manual_refresh_reports_outcome() {
        let mock = MockFeedClient::new();
        let state = app_state(mock.clone()).await;

        let Json(resp) = refresh(State(state.clone())).await;
        assert_eq!(resp.status, FeedStatus::Error);
        assert_eq!(resp.mode, DataMode::Schedule);

        mock.set_live(live_feed(3.0)).await;
        let Json(resp) = refresh(State(state)).await;
        assert_eq!(resp.status, FeedStatus::Success);
        assert_eq!(resp.mode, DataMode::Live);
    }

    #[tokio::test]
    async fn status_lists_feeds_and_counters() {
        let state = app_state(MockFeedClient::new()).await;
        let Json(resp) = status(State(state)).await;
        assert_eq!(resp.feeds.live.status, FeedStatus::Error);
        assert_eq!(resp.service.state.as_str(), "on");
        assert_eq!(resp.telemetry.get("live_eta_error"), Some(&1));
    }

    #[tokio::test]
    async fn stops_and_vehicles() {
        let mock = MockFeedClient::new();
        mock.set_live(live_feed(3.0)).await;
        let state = app_state(mock).await;

        let json = body_json(stops(State(state.clone())).await).await;
        assert_eq!(json["stops"].as_array().unwrap().len(), 8);
        assert_eq!(json["route"]["width"], 1000.0);
        assert!(json["stops"][0]["ratioX"].is_number());

        let Json(resp) = vehicles(State(state)).await;
        assert_eq!(resp.vehicles.len(), 1);
        assert!(resp.vehicles[0].estimated);
    }

    #[tokio::test]
    async fn index_renders() {
        let state = app_state(MockFeedClient::new()).await;
        let Html(html) = index_page(State(state)).await.unwrap();
        assert!(html.contains("Service running"));
        assert!(html.contains("Schedule estimate"));
    }

    #[test]
    fn error_status_codes() {
        let err: AppError = AlertError::ServicePaused.into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);

        let err: AppError = AlertError::InvalidLead(-1.0).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = AppError::Internal {
            message: "boom".into(),
        };
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
