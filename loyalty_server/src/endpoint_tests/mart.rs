use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use loyalty_common::MinorUnits;
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType},
    test_utils::prepare_env::new_test_database,
    LedgerApi,
    LedgerManagement,
    RegisterOrderResult,
    SqliteDatabase,
};
use serde_json::json;

use super::helpers::{parse_json, send};
use crate::{helpers::USER_ID_HEADER, routes::mart_routes};

macro_rules! mart_app {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(LedgerApi::new($db.clone())))
                .configure(mart_routes::<SqliteDatabase>),
        )
        .await
    };
}

fn upload(user: i64, order: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/user/orders")
        .insert_header((USER_ID_HEADER, user.to_string()))
        .set_payload(order.to_string())
}

fn get(user: i64, path: &str) -> TestRequest {
    TestRequest::get().uri(path).insert_header((USER_ID_HEADER, user.to_string()))
}

fn withdraw(user: i64, order: &str, sum: f64) -> TestRequest {
    TestRequest::post()
        .uri("/api/user/balance/withdraw")
        .insert_header((USER_ID_HEADER, user.to_string()))
        .set_json(json!({ "order": order, "sum": sum }))
}

async fn credit(db: &SqliteDatabase, order: &str, user: i64, amount: i64) {
    let number = order.parse::<OrderNumber>().unwrap();
    let id = match db.register_order(&number, user).await.unwrap() {
        RegisterOrderResult::Registered(id) | RegisterOrderResult::AlreadyOwnedBySameUser(id) => id,
        RegisterOrderResult::OwnedByOtherUser => panic!("Order {order} belongs to someone else"),
    };
    db.apply_reconciliation_result(id, user, OrderStatusType::Processed, MinorUnits::from(amount)).await.unwrap();
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = mart_app!(db);
    let (status, body) = send(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn requests_without_a_user_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = mart_app!(db);
    let req = TestRequest::post().uri("/api/user/orders").set_payload("12345678903").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(parse_json(&body)["error"].as_str().unwrap().contains("loyalty_user_id"));
    let req = TestRequest::get().uri("/api/user/balance").insert_header((USER_ID_HEADER, "bob")).to_request();
    assert_eq!(send(&app, req).await.0, StatusCode::UNAUTHORIZED);
    assert!(db.fetch_pending_orders(10).await.unwrap().is_empty());
}

#[actix_web::test]
async fn upload_orders() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = mart_app!(db);
    let (status, _) = send(&app, upload(1, "12345678903").to_request()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = send(&app, upload(1, "12345678903\n").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, upload(2, "12345678903").to_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, get(2, "/api/user/balance").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, upload(1, "not-a-number").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, upload(1, "").to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, upload(1, "12345678901").to_request()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(db.fetch_pending_orders(10).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn list_orders() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = mart_app!(db);
    let (status, body) = send(&app, get(3, "/api/user/orders").to_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    credit(&db, "18", 3, 50_000).await;
    send(&app, upload(3, "26").to_request()).await;
    let (status, body) = send(&app, get(3, "/api/user/orders").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let orders = parse_json(&body);
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["number"], "26");
    assert_eq!(orders[0]["status"], "NEW");
    assert!(orders[0].get("accrual").is_none());
    assert_eq!(orders[1]["number"], "18");
    assert_eq!(orders[1]["status"], "PROCESSED");
    assert_eq!(orders[1]["accrual"], 500.0);
    assert!(orders[1]["uploaded_at"].is_string());
    // Other users' orders are not visible
    let (status, _) = send(&app, get(4, "/api/user/orders").to_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn fetch_balance() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = mart_app!(db);
    let (status, _) = send(&app, get(5, "/api/user/balance").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    send(&app, upload(5, "34").to_request()).await;
    let (status, body) = send(&app, get(5, "/api/user/balance").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(&body), json!({ "current": 0.0, "withdrawn": 0.0 }));
    credit(&db, "34", 5, 72_950).await;
    let (_, body) = send(&app, get(5, "/api/user/balance").to_request()).await;
    assert_eq!(parse_json(&body), json!({ "current": 729.5, "withdrawn": 0.0 }));
}

#[actix_web::test]
async fn withdraw_points() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = mart_app!(db);
    credit(&db, "42", 6, 10_000).await;

    let (status, _) = send(&app, withdraw(6, "2377225624", 150.0).to_request()).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    let (status, _) = send(&app, withdraw(6, "  ", 10.0).to_request()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send(&app, withdraw(6, "2377225624", 0.0).to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, withdraw(6, "2377225624", -5.0).to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send(&app, withdraw(6, "2377225624", 75.25).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(&body), json!({ "current": 24.75, "withdrawn": 75.25 }));

    let account = db.fetch_user_balance(6).await.unwrap().unwrap();
    assert_eq!(account.balance, MinorUnits::from(2_475));
    assert_eq!(account.withdrawn, MinorUnits::from(7_525));
}

#[actix_web::test]
async fn withdrawal_references_are_free_form() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = mart_app!(db);
    credit(&db, "42", 8, 10_000).await;

    // Neither reference is a Luhn-valid order number, and neither was ever uploaded
    let (status, _) = send(&app, withdraw(8, "gift-card-2024", 10.0).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, withdraw(8, "2377225625", 15.0).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(&body), json!({ "current": 75.0, "withdrawn": 25.0 }));

    let (_, body) = send(&app, get(8, "/api/user/withdrawals").to_request()).await;
    let withdrawals = parse_json(&body);
    let orders = withdrawals.as_array().unwrap().iter().map(|w| w["order"].clone()).collect::<Vec<_>>();
    assert_eq!(orders, vec![json!("2377225625"), json!("gift-card-2024")]);
}

#[actix_web::test]
async fn list_withdrawals() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let app = mart_app!(db);
    let (status, _) = send(&app, get(7, "/api/user/withdrawals").to_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    credit(&db, "59", 7, 1_000).await;
    let (status, _) = send(&app, get(7, "/api/user/withdrawals").to_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    send(&app, withdraw(7, "67", 2.0).to_request()).await;
    send(&app, withdraw(7, "75", 3.0).to_request()).await;
    let (status, body) = send(&app, get(7, "/api/user/withdrawals").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let withdrawals = parse_json(&body);
    let withdrawals = withdrawals.as_array().unwrap();
    assert_eq!(withdrawals.len(), 2);
    assert_eq!(withdrawals[0]["order"], "75");
    assert_eq!(withdrawals[0]["sum"], 3.0);
    assert_eq!(withdrawals[1]["order"], "67");
    assert!(withdrawals[1]["processed_at"].is_string());
}
