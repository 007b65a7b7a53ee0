//! HTTP handler functions for the safety map API.

use actix_web::{HttpResponse, web};
use safety_map_geofence::NewZone;
use safety_map_models::{BoundingBox, SafetyError};
use safety_map_reviews::AreaRef;
use safety_map_scoring::safety_score;
use safety_map_server_models::{
    ApiHealth, ApiReview, ApiReviewArea, ApiZone, ApiZoneCheck, AreaSummary, CheckPointRequest,
    CreateZoneRequest, ListAreasParams, ListReviewsParams, NearbyParams, SearchParams,
    SubmitReviewRequest, SubmitReviewResponse,
};

use crate::AppState;

/// Maximum number of areas returned by a bulk listing.
const LIST_AREAS_LIMIT: usize = 3000;
/// Maximum number of areas returned by a nearby query.
const NEARBY_LIMIT: usize = 2000;
/// Default nearby radius in kilometers.
const DEFAULT_RADIUS_KM: f64 = 25.0;

/// Maps a domain error to its HTTP response.
///
/// `Conflict` never reaches a handler under normal operation (creation
/// races are re-resolved internally), so it maps to a server error.
fn error_response(err: &SafetyError) -> HttpResponse {
    match err {
        SafetyError::InvalidArgument { message } => {
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
        }
        SafetyError::NotFound { message } => {
            HttpResponse::NotFound().json(serde_json::json!({ "error": message }))
        }
        SafetyError::Conflict { .. } | SafetyError::Internal { .. } => {
            log::error!("Request failed: {err}");
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "error": "internal server error" }))
        }
    }
}

/// Parses a `bbox` query parameter: `west,south,east,north`.
fn parse_bbox(s: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = s.split(',').filter_map(|p| p.trim().parse().ok()).collect();
    if parts.len() == 4 {
        Some(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
    } else {
        None
    }
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/geo/check`
///
/// Reports which risk zones contain the given point.
pub async fn check_point(
    state: web::Data<AppState>,
    body: web::Json<CheckPointRequest>,
) -> HttpResponse {
    match state.matcher.check_point(body.lat, body.lng).await {
        Ok(check) => HttpResponse::Ok().json(ApiZoneCheck::from(check)),
        Err(err) => error_response(&err),
    }
}

/// `GET /api/geo/zones`
///
/// Lists all zones, newest first.
pub async fn list_zones(state: web::Data<AppState>) -> HttpResponse {
    match state.matcher.list_zones().await {
        Ok(zones) => {
            let zones: Vec<ApiZone> = zones.into_iter().map(ApiZone::from).collect();
            HttpResponse::Ok().json(zones)
        }
        Err(err) => error_response(&err),
    }
}

/// `POST /api/geo/zones`
///
/// Validates and stores a new risk zone.
pub async fn create_zone(
    state: web::Data<AppState>,
    body: web::Json<CreateZoneRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let Some(ring) = body.polygon.exterior().map(<[(f64, f64)]>::to_vec) else {
        return error_response(&SafetyError::invalid("polygon must have an exterior ring"));
    };

    let new = NewZone {
        name: body.name,
        description: body.description,
        risk_level: body.risk_level,
        risk_score: body.risk_score,
        polygon: ring,
    };

    match state.matcher.create_zone(new).await {
        Ok(zone) => HttpResponse::Created().json(ApiZone::from(zone)),
        Err(err) => error_response(&err),
    }
}

/// `GET /api/safety-scores`
///
/// Lists area summaries, optionally filtered by bounding box.
pub async fn list_areas(
    state: web::Data<AppState>,
    params: web::Query<ListAreasParams>,
) -> HttpResponse {
    let bbox = match params.bbox.as_deref() {
        Some(raw) => match parse_bbox(raw) {
            Some(bbox) => Some(bbox),
            None => {
                return error_response(&SafetyError::invalid(
                    "bbox must be west,south,east,north",
                ));
            }
        },
        None => None,
    };

    match state.storage.list_areas(LIST_AREAS_LIMIT).await {
        Ok(areas) => {
            let summaries: Vec<AreaSummary> = areas
                .iter()
                .filter(|area| match (&bbox, area.location) {
                    (Some(bbox), Some((lng, lat))) => bbox.contains(lng, lat),
                    (Some(_), None) => false,
                    (None, _) => true,
                })
                .map(|area| {
                    let score = safety_score(area.crime_rate, area.infra_score, area.sentiment);
                    AreaSummary::new(area, score)
                })
                .collect();
            HttpResponse::Ok().json(summaries)
        }
        Err(err) => error_response(&SafetyError::from(err)),
    }
}

/// `GET /api/safety-scores/nearby`
///
/// Lists area summaries within a radius of a point, nearest first.
pub async fn nearby_areas(
    state: web::Data<AppState>,
    params: web::Query<NearbyParams>,
) -> HttpResponse {
    if !params.lat.is_finite()
        || !params.lng.is_finite()
        || !(-90.0..=90.0).contains(&params.lat)
        || !(-180.0..=180.0).contains(&params.lng)
    {
        return error_response(&SafetyError::invalid("lat and lng must be valid coordinates"));
    }
    let radius = params.radius.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius.is_finite() || radius <= 0.0 {
        return error_response(&SafetyError::invalid("radius must be a positive number"));
    }

    let hits = state
        .spatial
        .areas_within(params.lat, params.lng, radius, NEARBY_LIMIT);

    let mut summaries = Vec::with_capacity(hits.len());
    for (id, _distance) in hits {
        match state.storage.get_area(&id).await {
            Ok(Some(area)) => {
                let score = safety_score(area.crime_rate, area.infra_score, area.sentiment);
                summaries.push(AreaSummary::new(&area, score));
            }
            // Indexed but not stored: a consistency bug, not a user error.
            Ok(None) => log::warn!("Area {id} is in the spatial index but not in storage"),
            Err(err) => return error_response(&SafetyError::from(err)),
        }
    }

    HttpResponse::Ok().json(summaries)
}

/// `GET /api/safety-scores/search`
///
/// Searches areas by name with the exact / prefix / contains ladder.
pub async fn search_areas(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> HttpResponse {
    match state.ingestor.resolver().search(&params.q).await {
        Ok(areas) => {
            let summaries: Vec<AreaSummary> = areas
                .iter()
                .map(|area| {
                    let score = safety_score(area.crime_rate, area.infra_score, area.sentiment);
                    AreaSummary::new(area, score)
                })
                .collect();
            HttpResponse::Ok().json(summaries)
        }
        Err(err) => error_response(&err),
    }
}

/// `POST /api/reviews`
///
/// Validates and stores a review, returning it alongside the refreshed
/// area aggregates.
pub async fn submit_review(
    state: web::Data<AppState>,
    body: web::Json<SubmitReviewRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let Some(rating) = body.rating else {
        return error_response(&SafetyError::invalid(
            "rating must be an integer between 1 and 5",
        ));
    };

    let area_ref = AreaRef {
        id: body.area_id,
        name: body.area_name,
    };

    match state
        .ingestor
        .submit(&area_ref, rating, body.text.as_deref())
        .await
    {
        Ok((review, area)) => {
            let score = safety_score(area.crime_rate, area.infra_score, area.sentiment);
            HttpResponse::Created().json(SubmitReviewResponse {
                review: ApiReview::from(review),
                area: ApiReviewArea::new(&area, score),
            })
        }
        Err(err) => error_response(&err),
    }
}

/// `GET /api/reviews`
///
/// Lists reviews newest first, optionally filtered by area.
pub async fn list_reviews(
    state: web::Data<AppState>,
    params: web::Query<ListReviewsParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let area_ref = AreaRef {
        id: params.area_id,
        name: params.area_name,
    };

    match state.ingestor.list_reviews(&area_ref, params.limit).await {
        Ok(reviews) => {
            let reviews: Vec<ApiReview> = reviews.into_iter().map(ApiReview::from).collect();
            HttpResponse::Ok().json(reviews)
        }
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};
    use safety_map_spatial::SpatialIndex;
    use safety_map_storage::{MemoryStorage, Storage};

    use super::*;

    fn app_state() -> web::Data<AppState> {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let spatial = Arc::new(SpatialIndex::new());
        web::Data::new(AppState::new(storage, spatial))
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new().app_data($state.clone()).service(
                    web::scope("/api")
                        .route("/health", web::get().to(health))
                        .route("/geo/check", web::post().to(check_point))
                        .route("/geo/zones", web::get().to(list_zones))
                        .route("/geo/zones", web::post().to(create_zone))
                        .route("/safety-scores", web::get().to(list_areas))
                        .route("/safety-scores/nearby", web::get().to(nearby_areas))
                        .route("/safety-scores/search", web::get().to(search_areas))
                        .route("/reviews", web::get().to(list_reviews))
                        .route("/reviews", web::post().to(submit_review)),
                ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test_app!(app_state());
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
    }

    #[actix_web::test]
    async fn zone_create_then_check_round_trip() {
        let state = app_state();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/geo/zones")
            .set_json(serde_json::json!({
                "name": "Market cordon",
                "riskLevel": "high",
                "riskScore": 90.0,
                "polygon": {
                    "type": "Polygon",
                    "coordinates": [[[91.0, 25.0], [92.0, 25.0], [92.0, 26.0], [91.0, 26.0], [91.0, 25.0]]]
                }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);

        let req = test::TestRequest::post()
            .uri("/api/geo/check")
            .set_json(serde_json::json!({ "lat": 25.5, "lng": 91.5 }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["inside"], true);
        assert_eq!(body["riskLevel"], "high");
        assert_eq!(body["matchedZones"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::post()
            .uri("/api/geo/check")
            .set_json(serde_json::json!({ "lat": 10.0, "lng": 80.0 }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["inside"], false);
        assert_eq!(body["riskLevel"], "safe");
    }

    #[actix_web::test]
    async fn degenerate_zone_is_rejected() {
        let app = test_app!(app_state());
        let req = test::TestRequest::post()
            .uri("/api/geo/zones")
            .set_json(serde_json::json!({
                "name": "Line",
                "riskLevel": "low",
                "riskScore": 10.0,
                "polygon": { "coordinates": [[[91.0, 25.0], [92.0, 25.0]]] }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn review_submission_creates_area_and_returns_aggregates() {
        let app = test_app!(app_state());

        let req = test::TestRequest::post()
            .uri("/api/reviews")
            .set_json(serde_json::json!({ "place": "Shillong", "stars": 5, "comment": "felt safe" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["area"]["name"], "Shillong");
        assert_eq!(body["area"]["ratingCount"], 1);
        assert_eq!(body["review"]["rating"], 5);

        let req = test::TestRequest::get()
            .uri("/api/reviews?areaName=shillong")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn missing_or_bad_rating_is_a_bad_request() {
        let app = test_app!(app_state());

        let req = test::TestRequest::post()
            .uri("/api/reviews")
            .set_json(serde_json::json!({ "areaName": "Imphal" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = test::TestRequest::post()
            .uri("/api/reviews")
            .set_json(serde_json::json!({ "areaName": "Imphal", "rating": 9 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn unknown_area_id_is_not_found() {
        let app = test_app!(app_state());
        let req = test::TestRequest::post()
            .uri("/api/reviews")
            .set_json(serde_json::json!({ "areaId": "ghost", "rating": 3 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn list_areas_filters_by_bbox_and_rejects_bad_bbox() {
        let state = app_state();
        {
            let mut inside = safety_map_models::Area::neutral("a1".into(), "Gangtok".into());
            inside.location = Some((88.61, 27.33));
            let mut outside = safety_map_models::Area::neutral("a2".into(), "Imphal".into());
            outside.location = Some((93.94, 24.82));
            state.storage.insert_area(inside).await.unwrap();
            state.storage.insert_area(outside).await.unwrap();
        }
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/safety-scores?bbox=88,27,89,28")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let areas = body.as_array().unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0]["name"], "Gangtok");
        assert_eq!(areas[0]["safety_score"], 50);

        let req = test::TestRequest::get()
            .uri("/api/safety-scores?bbox=oops")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn nearby_sorts_by_distance_and_validates_input() {
        let state = app_state();
        {
            let mut near = safety_map_models::Area::neutral("a1".into(), "Gangtok".into());
            near.location = Some((88.61, 27.33));
            let mut far = safety_map_models::Area::neutral("a2".into(), "Namchi".into());
            far.location = Some((88.36, 27.17));
            state.storage.insert_area(near).await.unwrap();
            state.storage.insert_area(far).await.unwrap();
            state.spatial.insert_area("a1", 88.61, 27.33);
            state.spatial.insert_area("a2", 88.36, 27.17);
        }
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/safety-scores/nearby?lat=27.33&lng=88.62&radius=50")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let areas = body.as_array().unwrap();
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0]["name"], "Gangtok");

        let req = test::TestRequest::get()
            .uri("/api/safety-scores/nearby?lat=91&lng=88.62")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn search_returns_ladder_matches() {
        let state = app_state();
        state
            .storage
            .insert_area(safety_map_models::Area::neutral(
                "a1".into(),
                "Shillong, Meghalaya".into(),
            ))
            .await
            .unwrap();
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/safety-scores/search?q=shillong")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "Shillong, Meghalaya");
    }
}
