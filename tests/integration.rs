use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use parcel_flow::api::rest::router;
use parcel_flow::auth::token::{hash_password, AuthSettings, TokenAuthority};
use parcel_flow::config::FeeSchedule;
use parcel_flow::models::user::{Role, User};
use parcel_flow::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

const PASSWORD: &str = "parcel-pass-1";

struct Harness {
    app: axum::Router,
    state: Arc<AppState>,
    admin: Account,
}

/// A registered user and the bearer token from logging in as them.
struct Account {
    id: String,
    token: String,
}

async fn setup() -> Harness {
    let state = Arc::new(AppState::new(
        1024,
        FeeSchedule::default(),
        &AuthSettings::for_tests(),
    ));
    let mut admin = User::new(
        "Ops Admin".to_string(),
        "ops@example.com".to_string(),
        "01500000000".to_string(),
        "Head Office, Motijheel".to_string(),
        Role::Admin,
    );
    admin.password_hash = hash_password(PASSWORD.to_string(), 4 /* bcrypt minimum cost; bcrypt::MIN_COST is private */)
        .await
        .unwrap();
    let admin = state.insert_user(admin);

    let app = router(state.clone(), "static");
    let token = login_token(&app, "ops@example.com", PASSWORD).await;

    Harness {
        app,
        state,
        admin: Account {
            id: admin.id.to_string(),
            token,
        },
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn call(h: &Harness, req: Request<Body>) -> (StatusCode, Value) {
    send(&h.app, req).await
}

async fn login_token(app: &axum::Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["token_type"], "Bearer");
    body["data"]["access_token"].as_str().unwrap().to_string()
}

async fn register(h: &Harness, mut body: Value) -> Account {
    body["password"] = json!(PASSWORD);
    let email = body["email"].as_str().unwrap().to_string();

    let (status, body) = call(h, request("POST", "/user/register", None, Some(body))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"].get("password_hash").is_none());

    Account {
        id: body["data"]["id"].as_str().unwrap().to_string(),
        token: login_token(&h.app, &email, PASSWORD).await,
    }
}

async fn register_sender(h: &Harness) -> Account {
    register(
        h,
        json!({
            "name": "Nadia Sender",
            "email": "nadia@example.com",
            "phone": "01611111111",
            "address": "House 7, Road 2, Banani",
            "role": "SENDER"
        }),
    )
    .await
}

async fn register_receiver(h: &Harness) -> Account {
    register(
        h,
        json!({
            "name": "Karim Receiver",
            "email": "karim@example.com",
            "phone": "01722222222",
            "address": "Agrabad C/A, Chattogram",
            "role": "RECEIVER"
        }),
    )
    .await
}

async fn register_agent(h: &Harness) -> Account {
    let agent = register(
        h,
        json!({
            "name": "Rafi Agent",
            "email": "rafi@example.com",
            "phone": "01833333333",
            "address": "Mirpur 10, Dhaka City",
            "role": "DELIVERY_AGENT",
            "agent_profile": {
                "vehicle_type": "bike",
                "license_number": "DHA-778899",
                "experience_level": "expert"
            }
        }),
    )
    .await;

    let (status, body) = call(
        h,
        request(
            "PATCH",
            "/user/available-status",
            Some(&agent.token),
            Some(json!({
                "available_status": "AVAILABLE",
                "location": { "lat": 23.8067, "lng": 90.3686 }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    agent
}

async fn create_parcel(h: &Harness, sender: &Account) -> String {
    let (status, body) = call(
        h,
        request(
            "POST",
            "/parcel/create-parcel",
            Some(&sender.token),
            Some(json!({
                "parcel_type": "Electronics",
                "weight_kg": 2.0,
                "receiver_phone": "01722222222",
                "pickup_address": {
                    "address": "Banani 11, Dhaka",
                    "latitude": 23.7937,
                    "longitude": 90.4066
                },
                "delivery_address": {
                    "address": "Agrabad, Chattogram",
                    "latitude": 22.3260,
                    "longitude": 91.8121
                },
                "delivery_date": "2030-01-15T10:00:00Z"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["tracking_id"].as_str().unwrap().to_string()
}

async fn set_status(
    h: &Harness,
    user: &Account,
    tracking_id: &str,
    status: &str,
) -> (StatusCode, Value) {
    call(
        h,
        request(
            "PATCH",
            &format!("/parcel/status/{tracking_id}"),
            Some(&user.token),
            Some(json!({ "status": status })),
        ),
    )
    .await
}

#[tokio::test]
async fn health_returns_ok() {
    let h = setup().await;
    let (status, body) = call(&h, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["users"], 1);
    assert_eq!(body["parcels"], 0);
    assert_eq!(body["updates_in_flight"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let h = setup().await;
    let response = h
        .app
        .clone()
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("parcels_created_total"));
}

#[tokio::test]
async fn get_me_requires_a_valid_token() {
    let h = setup().await;

    let (status, body) = call(&h, request("GET", "/user/get-me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(&h, request("GET", "/user/get-me", Some("not-a-token"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&h, request("GET", "/user/get-me", Some(&h.admin.token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "ADMIN");
}

#[tokio::test]
async fn forged_credentials_cannot_act_as_admin() {
    let h = setup().await;
    let sender = register_sender(&h).await;
    register_receiver(&h).await;
    let tracking_id = create_parcel(&h, &sender).await;
    let approve = || Some(json!({ "status": "APPROVED" }));
    let uri = format!("/parcel/status/{tracking_id}");

    // The admin's account id on its own is not a credential.
    let (status, _) = call(&h, request("PATCH", &uri, Some(&h.admin.id), approve())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let raw_id = Request::builder()
        .method("PATCH")
        .uri(&uri)
        .header("x-user-id", &h.admin.id)
        .header("content-type", "application/json")
        .body(Body::from(approve().unwrap().to_string()))
        .unwrap();
    let (status, _) = call(&h, raw_id).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forger = TokenAuthority::new(&AuthSettings {
        jwt_secret: "guessed-secret".to_string(),
        ..AuthSettings::for_tests()
    });
    let forged = forger.issue(h.admin.id.parse().unwrap()).unwrap();
    let (status, _) = call(&h, request("PATCH", &uri, Some(&forged), approve())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&h, request("PATCH", &uri, None, approve())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(
        h.state.parcels.get(&tracking_id).unwrap().status.to_string(),
        "REQUESTED"
    );
}

#[tokio::test]
async fn wrong_password_is_refused() {
    let h = setup().await;
    register_sender(&h).await;

    let (status, body) = call(
        &h,
        request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "nadia@example.com", "password": "not-my-password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["data"].get("access_token").is_none());
}

#[tokio::test]
async fn logged_out_token_stops_working() {
    let h = setup().await;
    let sender = register_sender(&h).await;

    let (status, _) = call(&h, request("POST", "/auth/logout", Some(&sender.token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&h, request("GET", "/user/get-me", Some(&sender.token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&h, request("POST", "/auth/logout", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&h, request("GET", "/user/get-me", Some(&h.admin.token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_roles_cannot_be_self_registered() {
    let h = setup().await;
    let (status, body) = call(
        &h,
        request(
            "POST",
            "/user/register",
            None,
            Some(json!({
                "name": "Mallory",
                "email": "mallory@example.com",
                "phone": "01999999999",
                "address": "Somewhere in Dhaka",
                "role": "SUPER_ADMIN",
                "password": PASSWORD
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn created_parcel_is_requested_and_publicly_trackable() {
    let h = setup().await;
    let sender = register_sender(&h).await;
    register_receiver(&h).await;
    let tracking_id = create_parcel(&h, &sender).await;

    let (status, body) = call(
        &h,
        request("GET", &format!("/parcel/single-parcel/{tracking_id}"), None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "REQUESTED");
    assert_eq!(body["data"]["fee"], 60.0);
    assert_eq!(body["data"]["tracking_events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn public_tracking_reveals_no_account_ids() {
    let h = setup().await;
    let sender = register_sender(&h).await;
    let receiver = register_receiver(&h).await;
    let agent = register_agent(&h).await;
    let tracking_id = create_parcel(&h, &sender).await;

    set_status(&h, &h.admin, &tracking_id, "APPROVED").await;
    let (status, _) = call(
        &h,
        request(
            "PATCH",
            &format!("/parcel/assign-delivery-agent/{tracking_id}"),
            Some(&h.admin.token),
            Some(json!({ "delivery_agent": agent.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = h
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/parcel/single-parcel/{tracking_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let raw = body_string(response).await;

    for id in [&h.admin.id, &sender.id, &receiver.id, &agent.id] {
        assert!(!raw.contains(id.as_str()), "public tracking leaked {id}");
    }
    let body: Value = serde_json::from_str(&raw).unwrap();
    for field in ["sender", "receiver", "delivery_agent"] {
        assert!(body["data"].get(field).is_none(), "{field} is exposed");
    }
    let latest = body["data"]["tracking_events"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(latest["status"], "ASSIGNED");
    assert_eq!(latest["updated_by"], "ADMIN");
    assert!(latest.get("actor_id").is_none());
}

#[tokio::test]
async fn unknown_tracking_id_returns_404() {
    let h = setup().await;
    let (status, body) = call(
        &h,
        request("GET", "/parcel/single-parcel/TRK-20000101-FFFFFFFF", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn receiver_cannot_approve_and_gets_422() {
    let h = setup().await;
    let sender = register_sender(&h).await;
    let receiver = register_receiver(&h).await;
    let tracking_id = create_parcel(&h, &sender).await;

    let (status, body) = set_status(&h, &receiver, &tracking_id, "APPROVED").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("RECEIVER"));
}

#[tokio::test]
async fn stale_expected_status_returns_409() {
    let h = setup().await;
    let sender = register_sender(&h).await;
    register_receiver(&h).await;
    let tracking_id = create_parcel(&h, &sender).await;

    let (status, _) = set_status(&h, &h.admin, &tracking_id, "APPROVED").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &h,
        request(
            "PATCH",
            &format!("/parcel/status/{tracking_id}"),
            Some(&sender.token),
            Some(json!({ "status": "CANCELLED", "expected_status": "REQUESTED" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("APPROVED"));
}

#[tokio::test]
async fn transitions_endpoint_offers_role_specific_options() {
    let h = setup().await;
    let sender = register_sender(&h).await;
    let receiver = register_receiver(&h).await;
    let tracking_id = create_parcel(&h, &sender).await;
    let uri = format!("/parcel/transitions/{tracking_id}");

    let (status, body) = call(&h, request("GET", &uri, Some(&sender.token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["next"],
        json!(["APPROVED", "BLOCKED", "CANCELLED"])
    );

    let (_, body) = call(&h, request("GET", &uri, Some(&receiver.token), None)).await;
    assert_eq!(body["data"]["next"], json!([]));
}

#[tokio::test]
async fn full_delivery_lifecycle() {
    let h = setup().await;
    let sender = register_sender(&h).await;
    let receiver = register_receiver(&h).await;
    let agent = register_agent(&h).await;
    let tracking_id = create_parcel(&h, &sender).await;

    let (status, _) = set_status(&h, &h.admin, &tracking_id, "APPROVED").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &h,
        request(
            "PATCH",
            &format!("/parcel/assign-delivery-agent/{tracking_id}"),
            Some(&h.admin.token),
            Some(json!({ "delivery_agent": agent.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "ASSIGNED");
    assert_eq!(body["data"]["delivery_agent"], agent.id.as_str());

    let (_, me) = call(&h, request("GET", "/user/get-me", Some(&agent.token), None)).await;
    assert_eq!(me["data"]["available_status"], "BUSY");

    let (_, assigned) = call(
        &h,
        request("GET", "/parcel/delivery-agent", Some(&agent.token), None),
    )
    .await;
    assert_eq!(assigned["data"].as_array().unwrap().len(), 1);

    for next in ["PICKEDUP", "ON_THE_WAY", "DELIVERED"] {
        let (status, body) = set_status(&h, &agent, &tracking_id, next).await;
        assert_eq!(status, StatusCode::OK, "{next}: {body}");
    }

    let (status, body) = set_status(&h, &receiver, &tracking_id, "CONFIRMED").await;
    assert_eq!(status, StatusCode::OK);

    let history: Vec<&str> = body["data"]["tracking_events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        history,
        vec![
            "REQUESTED",
            "APPROVED",
            "ASSIGNED",
            "PICKEDUP",
            "ON_THE_WAY",
            "DELIVERED",
            "CONFIRMED"
        ]
    );

    let (_, me) = call(&h, request("GET", "/user/get-me", Some(&agent.token), None)).await;
    assert_eq!(me["data"]["available_status"], "AVAILABLE");

    let (status, _) = set_status(&h, &receiver, &tracking_id, "RETURNED").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(h.state.in_flight.is_empty());
}

#[tokio::test]
async fn blocked_user_is_refused() {
    let h = setup().await;
    let sender = register_sender(&h).await;

    let (status, body) = call(
        &h,
        request(
            "PATCH",
            &format!("/user/block/{}", sender.id),
            Some(&h.admin.token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_blocked"], true);

    let (status, _) = call(
        &h,
        request("GET", "/parcel/all-sender-parcel", Some(&sender.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_listing_is_admin_only() {
    let h = setup().await;
    let sender = register_sender(&h).await;

    let (status, _) = call(&h, request("GET", "/user/all-user", Some(&sender.token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &h,
        request("GET", "/user/all-user?role=SENDER", Some(&h.admin.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn sidebar_follows_caller_role() {
    let h = setup().await;

    let (status, body) = call(&h, request("GET", "/user/sidebar", Some(&h.admin.token), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["default_route"], "/admin/all-user");
    assert_eq!(
        body["data"]["sections"][0]["title"],
        "User and Parcel Management"
    );
}

#[tokio::test]
async fn authorize_endpoint_applies_route_gate() {
    let h = setup().await;
    let sender = register_sender(&h).await;

    let (_, body) = call(
        &h,
        request("GET", "/user/authorize?route=/admin/all-user", None, None),
    )
    .await;
    assert_eq!(body["data"]["decision"], "REDIRECT_LOGIN");
    assert_eq!(body["data"]["redirect"], "/login");

    let (_, body) = call(
        &h,
        request(
            "GET",
            "/user/authorize?route=/admin/all-user",
            Some(&sender.token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"]["decision"], "REDIRECT_UNAUTHORIZED");
    assert_eq!(body["data"]["redirect"], "/unauthorized");

    let (_, body) = call(
        &h,
        request(
            "GET",
            "/user/authorize?route=/sender/all-parcel",
            Some(&sender.token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"]["decision"], "RENDER");
    assert!(body["data"]["redirect"].is_null());
}
