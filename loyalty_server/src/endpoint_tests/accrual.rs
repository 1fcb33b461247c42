use std::time::Duration;

use actix_web::{
    http::{header::RETRY_AFTER, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use loyalty_engine::{
    reconciler::{CalculationHandler, EngineConfig, ReconciliationEngine},
    test_utils::prepare_env::new_test_database,
    AccrualApi,
    SqliteDatabase,
};
use serde_json::json;

use super::helpers::{parse_json, send};
use crate::{accrual_routes::accrual_routes, rate_limit::RateLimiter};

macro_rules! accrual_app {
    ($db:expr, $limit:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AccrualApi::new($db.clone())))
                .app_data(web::Data::new(RateLimiter::per_minute($limit)))
                .configure(accrual_routes::<SqliteDatabase>),
        )
        .await
    };
}

fn register_goods(match_text: &str, reward: f64, reward_type: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/goods")
        .set_json(json!({ "match": match_text, "reward": reward, "reward_type": reward_type }))
}

fn register_order(order: &str, goods: serde_json::Value) -> TestRequest {
    TestRequest::post().uri("/api/orders").set_json(json!({ "order": order, "goods": goods }))
}

fn order_state(order: &str) -> TestRequest {
    TestRequest::get().uri(&format!("/api/orders/{order}"))
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = accrual_app!(db, 0);
    let (status, body) = send(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn register_reward_rules() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = accrual_app!(db, 0);
    let (status, _) = send(&app, register_goods("Bork", 10.0, "%").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, register_goods("Bork", 5.0, "pt").to_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, register_goods("LG", 5.0, "pt").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, register_goods("Philips", 5.0, "bonus").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send(&app, register_goods("Philips", -5.0, "pt").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(parse_json(&body)["error"].as_str().unwrap().contains("negative"));
    let req = TestRequest::post().uri("/api/goods").set_json(json!({ "reward": 5.0 })).to_request();
    assert_eq!(send(&app, req).await.0, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn delete_reward_rules() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = accrual_app!(db, 0);
    send(&app, register_goods("Bork", 10.0, "%").to_request()).await;
    let req = TestRequest::delete().uri("/api/goods/Bork").to_request();
    assert_eq!(send(&app, req).await.0, StatusCode::OK);
    let req = TestRequest::delete().uri("/api/goods/Bork").to_request();
    assert_eq!(send(&app, req).await.0, StatusCode::NOT_FOUND);
    // A deleted rule can be registered again
    let (status, _) = send(&app, register_goods("Bork", 7.0, "%").to_request()).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn register_receipts() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = accrual_app!(db, 0);
    let goods = json!([{ "description": "Bork Blender", "price": 5000.0 }]);
    let (status, _) = send(&app, register_order("12345678903", goods.clone()).to_request()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = send(&app, register_order("12345678903", goods.clone()).to_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, register_order("12345678901", goods.clone()).to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, register_order("", goods.clone()).to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, register_order("abc", goods).to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::post().uri("/api/orders").set_json(json!({ "goods": [] })).to_request();
    assert_eq!(send(&app, req).await.0, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn query_order_states() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = accrual_app!(db, 0);
    let (status, _) = send(&app, order_state("12345678903").to_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, order_state("12345678901").to_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, order_state("abc").to_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    send(&app, register_goods("Bork", 5.0, "%").to_request()).await;
    let goods = json!([{ "description": "Bork Kettle", "price": 145.99 }, { "description": "Spoon", "price": 3.0 }]);
    send(&app, register_order("12345678903", goods).to_request()).await;
    let (status, body) = send(&app, order_state("12345678903").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(&body), json!({ "order": "12345678903", "status": "REGISTERED" }));

    let config = EngineConfig { period: Duration::from_millis(50), pool_size: 1, ..Default::default() };
    let engine = ReconciliationEngine::new(CalculationHandler::new(db.clone()), config);
    assert_eq!(engine.run_cycle().await.applied, 1);
    let (status, body) = send(&app, order_state("12345678903").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(&body), json!({ "order": "12345678903", "status": "PROCESSED", "accrual": 7.3 }));
}

#[actix_web::test]
async fn order_queries_are_rate_limited() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = accrual_app!(db, 2);
    assert_eq!(send(&app, order_state("18").to_request()).await.0, StatusCode::NO_CONTENT);
    assert_eq!(send(&app, order_state("26").to_request()).await.0, StatusCode::NO_CONTENT);
    let res = test::call_service(&app, order_state("34").to_request()).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = res.headers().get(RETRY_AFTER).unwrap().to_str().unwrap().parse::<u64>().unwrap();
    assert!((1..=60).contains(&retry_after));
    // Other routes are not limited
    let (status, _) = send(&app, register_goods("Bork", 5.0, "%").to_request()).await;
    assert_eq!(status, StatusCode::OK);
}
