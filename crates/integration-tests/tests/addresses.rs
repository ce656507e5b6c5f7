//! Address book endpoints over HTTP.

use axum::http::StatusCode;
use serde_json::json;

use msgrocery_integration_tests::TestApp;

fn full_address() -> serde_json::Value {
    json!({
        "fullName": "Asha Rao",
        "phoneNumber": 9_876_543_210_u64,
        "pincode": 560_001,
        "area": "MG Road",
        "city": "Bengaluru",
        "state": "Karnataka"
    })
}

#[tokio::test]
async fn test_add_and_list_addresses() {
    let app = TestApp::new();
    let token = TestApp::token("u1");

    let (status, body) = app
        .post_json("/api/user/add-address", Some(&token), &json!({"address": full_address()}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Address added successfully");
    assert_eq!(body["address"]["userId"], "u1");
    assert_eq!(body["address"]["phoneNumber"], "9876543210");
    let id = body["address"]["_id"].clone();

    let (status, body) = app.get("/api/user/get-address", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["addresses"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["addresses"][0]["_id"], id);

    // Other users see nothing
    let (_, body) = app.get("/api/user/get-address", Some(&TestApp::token("u2"))).await;
    assert_eq!(body, json!({"success": true, "addresses": []}));
}

#[tokio::test]
async fn test_incomplete_address_is_rejected() {
    let app = TestApp::new();
    let token = TestApp::token("u1");
    let mut address = full_address();
    address["city"] = json!("   ");

    let (status, body) = app
        .post_json("/api/user/add-address", Some(&token), &json!({"address": address}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All address fields are required");

    let (status, body) = app
        .post_json("/api/user/add-address", Some(&token), &json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Address data missing");
}
