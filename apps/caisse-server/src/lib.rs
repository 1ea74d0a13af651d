//! # Caisse Server Library
//!
//! HTTP API behind the cashier, admin and history screens.
//!
//! ## Module Organization
//! ```text
//! caisse_server/
//! ├── lib.rs          ◄─── You are here (router & tracing setup)
//! ├── main.rs         ◄─── Binary: config, database, serve, shutdown
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState + FromRef
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── session.rs  ◄─── Cart, selection, catalog cache, checkout gate
//! │   └── config.rs   ◄─── CAISSE_* settings
//! ├── handlers/
//! │   ├── mod.rs      ◄─── Health, config, shared helpers
//! │   ├── product.rs  ◄─── Product CRUD
//! │   ├── event.rs    ◄─── Event CRUD
//! │   ├── point_of_sale.rs
//! │   ├── sale.rs     ◄─── History, export, KPI
//! │   └── session.rs  ◄─── Selection, cart, checkout
//! └── error.rs        ◄─── API error type for handlers
//! ```
//!
//! ## Routes
//! ```text
//! GET    /health
//! GET    /api/config
//!
//! GET    /api/session                         cashier view
//! GET    /api/session/catalog
//! PUT    /api/session/event                   { eventId }
//! PUT    /api/session/point-of-sale           { pointOfSaleId, confirm }
//! POST   /api/session/cart/:product_id        +1
//! DELETE /api/session/cart/:product_id        -1
//! DELETE /api/session/cart/:product_id/all
//! DELETE /api/session/cart
//! POST   /api/session/checkout                { paymentMode }
//!
//! GET|POST            /api/products
//! GET|PUT|DELETE      /api/products/:id
//! GET|POST            /api/events
//! GET|PUT|DELETE      /api/events/:id
//! GET|POST            /api/points-of-sale
//! GET|PUT|DELETE      /api/points-of-sale/:id
//! GET|POST            /api/sales
//! GET                 /api/sales/export.csv
//! GET                 /api/sales/report
//! GET|PUT|DELETE      /api/sales/:id
//! ```

pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use handlers::{event, point_of_sale, product, sale, session};
use state::AppState;

/// Builds the full router around `state`.
pub fn build_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/", get(session::get_session))
        .route("/catalog", get(session::get_catalog))
        .route("/event", put(session::select_event))
        .route("/point-of-sale", put(session::select_point_of_sale))
        .route("/cart", delete(session::clear_cart))
        .route(
            "/cart/:product_id",
            post(session::add_to_cart).delete(session::remove_from_cart),
        )
        .route("/cart/:product_id/all", delete(session::remove_product_from_cart))
        .route("/checkout", post(session::checkout));

    let api = Router::new()
        .route("/config", get(handlers::get_config))
        .nest("/session", session_routes)
        .route(
            "/products",
            get(product::list_products).post(product::create_product),
        )
        .route(
            "/products/:id",
            get(product::get_product)
                .put(product::update_product)
                .delete(product::delete_product),
        )
        .route("/events", get(event::list_events).post(event::create_event))
        .route(
            "/events/:id",
            get(event::get_event)
                .put(event::update_event)
                .delete(event::delete_event),
        )
        .route(
            "/points-of-sale",
            get(point_of_sale::list_points_of_sale).post(point_of_sale::create_point_of_sale),
        )
        .route(
            "/points-of-sale/:id",
            get(point_of_sale::get_point_of_sale)
                .put(point_of_sale::update_point_of_sale)
                .delete(point_of_sale::delete_point_of_sale),
        )
        .route("/sales", get(sale::list_sales).post(sale::create_sale))
        .route("/sales/export.csv", get(sale::export_csv))
        .route("/sales/report", get(sale::report))
        .route(
            "/sales/:id",
            get(sale::get_sale)
                .put(sale::update_sale)
                .delete(sale::delete_sale),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug logs
/// - `RUST_LOG=caisse=trace` - Show trace for caisse crates only
/// - Default: INFO, DEBUG for caisse crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caisse=debug,tower_http=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use caisse_core::export::CSV_HEADER;
    use caisse_db::{Database, DbConfig};

    use super::*;
    use crate::state::{ConfigState, DbState, SessionState};

    async fn app() -> Router {
        app_with(ConfigState::default()).await
    }

    async fn app_with(config: ConfigState) -> Router {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        build_router(AppState {
            db: DbState::new(db),
            session: SessionState::default(),
            config: Arc::new(config),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    fn decimal(value: &Value) -> Decimal {
        Decimal::from_str(value.as_str().unwrap()).unwrap()
    }

    /// Event "Festival" with stand "Stand Merch" and an unlinked T-shirt.
    async fn seed(app: &Router) -> (String, String, String) {
        let (status, event) = send(
            app,
            Method::POST,
            "/api/events",
            Some(json!({ "name": "Festival", "startDate": "2026-07-03" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let event_id = event["id"].as_str().unwrap().to_string();

        let (status, stand) = send(
            app,
            Method::POST,
            "/api/points-of-sale",
            Some(json!({ "eventId": event_id, "name": "Stand Merch" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let stand_id = stand["id"].as_str().unwrap().to_string();

        let (status, product) = send(
            app,
            Method::POST,
            "/api/products",
            Some(json!({
                "name": "T-shirt",
                "unitPriceInclusiveTax": "25.00",
                "taxRatePercent": "8.1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let product_id = product["id"].as_str().unwrap().to_string();

        (event_id, stand_id, product_id)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "up");
    }

    #[tokio::test]
    async fn test_config_is_public() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/api/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currency"], "CHF");
        assert_eq!(body["requirePointOfSale"], true);
    }

    #[tokio::test]
    async fn test_cart_and_checkout_flow() {
        let app = app().await;
        let (event_id, stand_id, product_id) = seed(&app).await;

        let (status, view) = send(
            &app,
            Method::PUT,
            "/api/session/event",
            Some(json!({ "eventId": event_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["pointOfSaleId"], stand_id.as_str());

        let cart_uri = format!("/api/session/cart/{product_id}");
        send(&app, Method::POST, &cart_uri, None).await;
        let (_, view) = send(&app, Method::POST, &cart_uri, None).await;
        assert_eq!(view["cart"][0]["quantity"], 2);
        assert_eq!(decimal(&view["preview"]["totals"]["totalInclusiveTax"]), dec!(50.00));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/session/checkout",
            Some(json!({ "paymentMode": "card" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(decimal(&body["sale"]["totalInclusiveTax"]), dec!(50.00));
        assert_eq!(decimal(&body["sale"]["totalExclusiveTax"]), dec!(46.25));
        assert_eq!(body["sale"]["pointOfSaleId"], stand_id.as_str());

        let (_, view) = send(&app, Method::GET, "/api/session", None).await;
        assert_eq!(view["cart"], json!([]));

        let (_, sales) = send(&app, Method::GET, "/api/sales", None).await;
        assert_eq!(sales.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_without_event_is_refused() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/session/checkout",
            Some(json!({ "paymentMode": "cash" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "NO_EVENT_SELECTED");
    }

    #[tokio::test]
    async fn test_checkout_with_empty_cart_is_refused() {
        let app = app().await;
        let (event_id, _, _) = seed(&app).await;
        send(&app, Method::PUT, "/api/session/event", Some(json!({ "eventId": event_id }))).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/session/checkout",
            Some(json!({ "paymentMode": "card" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "EMPTY_CART");
    }

    #[tokio::test]
    async fn test_checkout_with_malformed_body_keeps_envelope() {
        let app = app().await;
        let (status, body) = send(&app, Method::POST, "/api/session/checkout", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/session/checkout",
            Some(json!({ "paymentMode": "twint" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_stand_change_with_cart_needs_confirmation() {
        let app = app().await;
        let (event_id, _, product_id) = seed(&app).await;
        let (_, other) = send(
            &app,
            Method::POST,
            "/api/points-of-sale",
            Some(json!({ "eventId": event_id, "name": "Bar" })),
        )
        .await;
        let other_id = other["id"].as_str().unwrap();

        send(&app, Method::PUT, "/api/session/event", Some(json!({ "eventId": event_id }))).await;
        send(&app, Method::POST, &format!("/api/session/cart/{product_id}"), None).await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/session/point-of-sale",
            Some(json!({ "pointOfSaleId": other_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, view) = send(
            &app,
            Method::PUT,
            "/api/session/point-of-sale",
            Some(json!({ "pointOfSaleId": other_id, "confirm": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["pointOfSaleId"], other_id);
        assert_eq!(view["cart"], json!([]));
    }

    #[tokio::test]
    async fn test_create_sale_recomputes_totals() {
        let app = app().await;
        let (event_id, stand_id, product_id) = seed(&app).await;

        let (status, sale) = send(
            &app,
            Method::POST,
            "/api/sales",
            Some(json!({
                "eventId": event_id,
                "pointOfSaleId": stand_id,
                "paymentMode": "cash",
                "lines": [{
                    "productId": product_id,
                    "quantity": 3,
                    "unitPriceInclusiveTax": "10.00",
                    "taxRatePercent": "0.081",
                    "lineSubtotalInclusiveTax": "999"
                }],
                "totalInclusiveTax": "1.00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(decimal(&sale["totalInclusiveTax"]), dec!(30.00));
        assert_eq!(decimal(&sale["lines"][0]["taxRatePercent"]), dec!(8.1));
    }

    #[tokio::test]
    async fn test_create_sale_reports_every_invalid_field() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/sales",
            Some(json!({
                "paymentMode": "card",
                "lines": [{ "productId": "p1", "quantity": 0, "unitPriceInclusiveTax": "5", "taxRatePercent": "8.1" }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["fields"],
            json!(["eventId", "pointOfSaleId", "lines[0].quantity"])
        );
    }

    #[tokio::test]
    async fn test_create_sale_requires_point_of_sale_when_scoped() {
        let sale = |event_id: &str, product_id: &str| {
            json!({
                "eventId": event_id,
                "paymentMode": "cash",
                "lines": [{
                    "productId": product_id,
                    "quantity": 1,
                    "unitPriceInclusiveTax": "25.00",
                    "taxRatePercent": "8.1"
                }]
            })
        };

        let app = app().await;
        let (event_id, _, product_id) = seed(&app).await;
        let (status, body) = send(&app, Method::POST, "/api/sales", Some(sale(&event_id, &product_id))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"], json!(["pointOfSaleId"]));
        let (_, sales) = send(&app, Method::GET, "/api/sales", None).await;
        assert_eq!(sales, json!([]));

        let unscoped = app_with(ConfigState {
            require_point_of_sale: false,
            ..ConfigState::default()
        })
        .await;
        let (event_id, _, product_id) = seed(&unscoped).await;
        let (status, body) = send(&unscoped, Method::POST, "/api/sales", Some(sale(&event_id, &product_id))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["pointOfSaleId"], Value::Null);
    }

    #[tokio::test]
    async fn test_create_sale_rejects_out_of_range_price() {
        let app = app().await;
        let (event_id, stand_id, product_id) = seed(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/sales",
            Some(json!({
                "eventId": event_id,
                "pointOfSaleId": stand_id,
                "paymentMode": "card",
                "lines": [{
                    "productId": product_id,
                    "quantity": 2,
                    "unitPriceInclusiveTax": "79228162514264337593543950335",
                    "taxRatePercent": "8.1"
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"], json!(["lines[0].unitPriceInclusiveTax"]));

        let (status, _) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_csv_export_has_header() {
        let app = app().await;
        let request = Request::builder()
            .uri("/api/sales/export.csv")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(csv.lines().next(), Some(CSV_HEADER.join(",").as_str()));
    }

    #[tokio::test]
    async fn test_deactivated_product_leaves_cart() {
        let app = app().await;
        let (event_id, _, product_id) = seed(&app).await;
        send(&app, Method::PUT, "/api/session/event", Some(json!({ "eventId": event_id }))).await;
        send(&app, Method::POST, &format!("/api/session/cart/{product_id}"), None).await;

        let (status, _) = send(&app, Method::DELETE, &format!("/api/products/{product_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, view) = send(&app, Method::GET, "/api/session", None).await;
        assert_eq!(view["cart"], json!([]));

        let (status, _) = send(&app, Method::POST, &format!("/api/session/cart/{product_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_product_of_another_stand_cannot_enter_cart() {
        let app = app().await;
        let (event_id, stand_id, _) = seed(&app).await;
        let (_, tent) = send(
            &app,
            Method::POST,
            "/api/points-of-sale",
            Some(json!({ "eventId": event_id, "name": "Zelt" })),
        )
        .await;
        let (status, poster) = send(
            &app,
            Method::POST,
            "/api/products",
            Some(json!({
                "name": "Poster",
                "unitPriceInclusiveTax": "15.00",
                "pointOfSaleIds": [tent["id"]]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let poster_id = poster["id"].as_str().unwrap();

        send(&app, Method::PUT, "/api/session/event", Some(json!({ "eventId": event_id }))).await;
        let (status, view) = send(
            &app,
            Method::PUT,
            "/api/session/point-of-sale",
            Some(json!({ "pointOfSaleId": stand_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["pointOfSaleId"], stand_id.as_str());

        let (status, _) = send(&app, Method::POST, &format!("/api/session/cart/{poster_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, view) = send(&app, Method::GET, "/api/session", None).await;
        assert_eq!(view["cart"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_sale_is_not_found() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/api/sales/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
