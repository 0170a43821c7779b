use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, APARTMENT_GROUP_ID, CURRENT_USER_ID, DEFAULT_API_KEY, FRIEND_ID, STRANGER_ID};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn bearer() -> String {
    format!("Bearer {DEFAULT_API_KEY}")
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, bearer())
        .body(String::new())
        .unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::AUTHORIZATION, bearer())
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_token_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/v3.0/get_current_user")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(!body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/v3.0/get_groups")
                .header(http::header::AUTHORIZATION, "Bearer wrong")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- users ---

#[tokio::test]
async fn current_user_is_wrapped_in_user_key() {
    let resp = app().oneshot(get_request("/api/v3.0/get_current_user")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["user"]["id"], CURRENT_USER_ID);
    assert_eq!(body["user"]["default_currency"], "USD");
}

#[tokio::test]
async fn stranger_profile_is_forbidden() {
    let resp = app()
        .oneshot(get_request(&format!("/api/v3.0/get_user/{STRANGER_ID}")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let resp = app().oneshot(get_request("/api/v3.0/get_user/9999")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_id_returns_400() {
    let resp = app().oneshot(get_request("/api/v3.0/get_user/abc")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_user_applies_fields() {
    let resp = app()
        .oneshot(json_request(
            &format!("/api/v3.0/update_user/{CURRENT_USER_ID}"),
            r#"{"first_name":"Ahmad","locale":"fa","password":"secret"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["user"]["first_name"], "Ahmad");
    assert_eq!(body["user"]["locale"], "fa");
    assert_eq!(body["user"]["last_name"], "Petrucci");
}

#[tokio::test]
async fn update_other_user_is_forbidden() {
    let resp = app()
        .oneshot(json_request(
            &format!("/api/v3.0/update_user/{FRIEND_ID}"),
            r#"{"first_name":"Nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_unknown_field_returns_400() {
    let resp = app()
        .oneshot(json_request(
            &format!("/api/v3.0/update_user/{CURRENT_USER_ID}"),
            r#"{"shoe_size":"44"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["errors"]["shoe_size"].is_array());
}

// --- groups / friends ---

#[tokio::test]
async fn group_lookup() {
    let resp = app()
        .oneshot(get_request(&format!("/api/v3.0/get_group/{APARTMENT_GROUP_ID}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["group"]["name"], "Apartment");
    assert_eq!(body["group"]["members"].as_array().unwrap().len(), 2);

    let resp = app().oneshot(get_request("/api/v3.0/get_group/4242")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn friends_then_delete_friend() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/api/v3.0/get_friends"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["friends"][0]["id"], FRIEND_ID);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(&format!("/api/v3.0/delete_friend/{FRIEND_ID}"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], true);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(&format!("/api/v3.0/delete_friend/{FRIEND_ID}"), ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], false);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/api/v3.0/get_friends"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert!(body["friends"].as_array().unwrap().is_empty());
}

// --- expenses ---

#[tokio::test]
async fn create_expense_by_share_then_fetch() {
    use tower::Service;

    let mut app = app().into_service();
    let payload = json!({
        "cost": "25",
        "description": "Grocery run",
        "details": "",
        "date": "",
        "repeat_interval": "",
        "currency_code": "USD",
        "category_id": 15,
        "group_id": 0,
        "users__0__user_id": CURRENT_USER_ID,
        "users__0__paid_share": "25",
        "users__0__owed_share": "15",
        "users__1__user_id": FRIEND_ID,
        "users__1__paid_share": "0",
        "users__1__owed_share": "10"
    });

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/api/v3.0/create_expense", &payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["errors"], json!({}));
    let created = &body["expenses"][0];
    assert_eq!(created["users"][1]["user_id"], FRIEND_ID);
    assert_eq!(created["users"][1]["net_balance"], "-10.00");
    let id = created["id"].as_u64().unwrap();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/api/v3.0/get_expense/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["expense"]["description"], "Grocery run");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/api/v3.0/get_expenses"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["expenses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unbalanced_shares_are_rejected_in_band() {
    let payload = json!({
        "cost": "25",
        "users__0__user_id": CURRENT_USER_ID,
        "users__0__paid_share": "20",
        "users__0__owed_share": "25"
    });
    let resp = app()
        .oneshot(json_request("/api/v3.0/create_expense", &payload.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["expenses"].as_array().unwrap().is_empty());
    assert!(body["errors"]["base"][0].as_str().unwrap().contains("paid shares"));
}

#[tokio::test]
async fn split_equally_divides_among_group_members() {
    let payload = json!({
        "cost": "30",
        "description": "Internet",
        "currency_code": "USD",
        "group_id": APARTMENT_GROUP_ID,
        "split_equally": true
    });
    let resp = app()
        .oneshot(json_request("/api/v3.0/create_expense", &payload.to_string()))
        .await
        .unwrap();

    let body = body_json(resp).await;
    let users = body["expenses"][0]["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u["owed_share"] == "15.00"));
}

#[tokio::test]
async fn missing_expense_is_not_found() {
    let resp = app().oneshot(get_request("/api/v3.0/get_expense/1")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- reference data ---

#[tokio::test]
async fn currencies_and_categories() {
    let resp = app().oneshot(get_request("/api/v3.0/get_currencies")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["currencies"][0]["currency_code"], "USD");

    let resp = app().oneshot(get_request("/api/v3.0/get_categories")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["categories"][0]["subcategories"][0]["name"], "Cleaning");
}
