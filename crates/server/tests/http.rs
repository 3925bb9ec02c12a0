use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, FeeRate, MIN_PIN_HASH_COST, Money, NewAccount, NewPaymentMethod};
use migration::MigratorTrait;
use server::{AuthKeys, ServerState, router};

const SECRET: &str = "test-secret";
const PIN: &str = "123456";

struct TestApp {
    router: Router,
    keys: Arc<AuthKeys>,
    engine: Arc<Engine>,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder()
            .database(db)
            .pin_hash_cost(MIN_PIN_HASH_COST)
            .build()
            .await
            .unwrap();
        let engine = Arc::new(engine);
        let keys = Arc::new(AuthKeys::new(SECRET, Duration::from_secs(600)).unwrap());
        let router = router(ServerState {
            engine: Arc::clone(&engine),
            keys: Arc::clone(&keys),
        });
        Self {
            router,
            keys,
            engine,
        }
    }

    async fn open(&self, name: &str, phone: &str, balance_minor: i64) -> (i64, String) {
        let account = self
            .engine
            .open_account(
                NewAccount::new(name, phone, PIN).opening_balance(Money::new(balance_minor)),
            )
            .await
            .unwrap();
        (account.id, self.keys.issue(account.id).unwrap())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = TestApp::new().await;

    let request = Request::get("/account").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["retryable"], false);

    let (status, _) = app.get("/account", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let app = TestApp::new().await;
    let (id, _) = app.open("Alice", "0811", 0).await;
    let forged = AuthKeys::new("other-secret", Duration::from_secs(600))
        .unwrap()
        .issue(id)
        .unwrap();

    let (status, _) = app.get("/account", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn account_endpoint_shows_the_caller() {
    let app = TestApp::new().await;
    let (id, token) = app.open("Alice", "0811", 10_000).await;

    let (status, body) = app.get("/account", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["full_name"], "Alice");
    assert_eq!(body["phone"], "0811");
    assert_eq!(body["balance_minor"], 10_000);
}

#[tokio::test]
async fn transfer_by_phone_charges_the_fee() {
    let app = TestApp::new().await;
    let (_, alice) = app.open("Alice", "0811", 10_000).await;
    let (_, bob) = app.open("Bob", "0822", 10_000).await;

    let (status, body) = app
        .post(
            "/transactions/transfer",
            &alice,
            json!({
                "receiver_phone": "0822",
                "amount_minor": 5_000,
                "description": "dinner",
                "pin": PIN,
                "reference_number": null,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount_minor"], 5_000);
    assert_eq!(body["fee_minor"], 50);
    assert_eq!(body["new_balance_minor"], 4_950);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["receiver_name"], "Bob");
    assert_eq!(body["replayed"], false);
    assert!(body["reference_number"].as_str().unwrap().starts_with("TRX"));

    let (_, account) = app.get("/account", &bob).await;
    assert_eq!(account["balance_minor"], 15_000);
}

#[tokio::test]
async fn transfer_errors_map_to_statuses() {
    let app = TestApp::new().await;
    let (_, alice) = app.open("Alice", "0811", 1_000).await;
    app.open("Bob", "0822", 0).await;

    let transfer = |phone: &str, amount: i64, pin: &str| {
        json!({
            "receiver_phone": phone,
            "amount_minor": amount,
            "description": null,
            "pin": pin,
            "reference_number": null,
        })
    };

    let (status, body) = app
        .post("/transactions/transfer", &alice, transfer("0822", 5_000, PIN))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["retryable"], false);
    assert!(body["error"].as_str().unwrap().contains("Insufficient funds"));

    let (status, _) = app
        .post("/transactions/transfer", &alice, transfer("0822", 100, "999999"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/transactions/transfer", &alice, transfer("0899", 100, PIN))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/transactions/transfer", &alice, transfer("0811", 100, PIN))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, account) = app.get("/account", &alice).await;
    assert_eq!(account["balance_minor"], 1_000);
}

#[tokio::test]
async fn retried_transfer_is_replayed_over_http() {
    let app = TestApp::new().await;
    let (_, alice) = app.open("Alice", "0811", 10_000).await;
    app.open("Bob", "0822", 0).await;

    let body = |amount: i64| {
        json!({
            "receiver_phone": "0822",
            "amount_minor": amount,
            "description": null,
            "pin": PIN,
            "reference_number": "order-17",
        })
    };

    let (status, first) = app.post("/transactions/transfer", &alice, body(1_000)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = app.post("/transactions/transfer", &alice, body(1_000)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["replayed"], true);
    assert_eq!(second["transaction_id"], first["transaction_id"]);
    assert_eq!(second["new_balance_minor"], 8_990);

    let (status, _) = app.post("/transactions/transfer", &alice, body(2_000)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn topup_and_history_pagination() {
    let app = TestApp::new().await;
    let (_, alice) = app.open("Alice", "0811", 0).await;
    app.open("Bob", "0822", 0).await;
    let method = app
        .engine
        .new_payment_method(NewPaymentMethod::new(
            "Card",
            Money::new(500),
            Money::new(100_000),
            FeeRate::from_percent(2),
        ))
        .await
        .unwrap();

    let topup = |amount: i64| {
        json!({
            "amount_minor": amount,
            "payment_method_id": method.id,
            "description": null,
            "reference_number": null,
        })
    };

    let (status, body) = app.post("/transactions/topup", &alice, topup(2_000)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fee_minor"], 40);
    assert_eq!(body["new_balance_minor"], 2_000);

    let (status, _) = app.post("/transactions/topup", &alice, topup(499)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(
            "/transactions/transfer",
            &alice,
            json!({
                "receiver_phone": "0822",
                "amount_minor": 1_000,
                "description": null,
                "pin": PIN,
                "reference_number": null,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, page) = app.get("/transactions/history?limit=1", &alice).await;
    assert_eq!(status, StatusCode::OK);
    let items = page["transactions"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "transfer");
    assert_eq!(items[0]["effect_minor"], -1_010);
    let cursor = page["next_cursor"].as_str().unwrap().to_string();

    let (status, rest) = app
        .get(&format!("/transactions/history?limit=1&cursor={cursor}"), &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = rest["transactions"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "topup");
    assert_eq!(items[0]["effect_minor"], 2_000);
    assert!(rest["next_cursor"].is_null());

    let (status, _) = app
        .get("/transactions/history?cursor=garbage", &alice)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
