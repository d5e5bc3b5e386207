//! End-to-end tests against a mock HTTP server using the reqwest transport

use std::time::Duration;

use halwalk_core::{ClientConfig, Error, FollowOptions, HalClient, Handlers, Outcome, RequestOptions};
use httpmock::prelude::*;
use serde_json::{json, Value};

fn client_for(server: &MockServer) -> HalClient {
    let config = ClientConfig::new()
        .with_base_url(&server.base_url())
        .unwrap()
        .with_header("Authorization", "Bearer test-token");
    HalClient::new(config).unwrap()
}

#[tokio::test]
async fn test_get_and_follow_over_http() {
    let server = MockServer::start_async().await;

    let me = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/me")
                .header("accept", "application/hal+json, application/json;q=0.8")
                .header("authorization", "Bearer test-token");
            then.status(200)
                .header("Content-Type", "application/hal+json")
                .json_body(json!({
                    "name": "Marty",
                    "_links": {
                        "self": {"href": "/me"},
                        "cars": {"href": "/me/cars{?model}", "templated": true}
                    }
                }));
        })
        .await;
    let cars = server
        .mock_async(|when, then| {
            when.method(GET).path("/me/cars").query_param("model", "DeLorean");
            then.status(200).json_body(json!([{"model": "DeLorean", "year": 1981}]));
        })
        .await;

    let client = client_for(&server);
    let found = client
        .get("/me", &RequestOptions::new())
        .unwrap()
        .on(Handlers::new().on(
            "200",
            client.then_follow("cars", FollowOptions::new().with_var("model", "DeLorean")),
        ))
        .on(Handlers::new().on("200", |body: Value, _| Outcome::Value(body[0]["year"].clone())))
        .value()
        .await
        .unwrap();

    assert_eq!(found, Some(json!(1981)));
    me.assert_async().await;
    cars.assert_async().await;
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/me/cars")
                .header("content-type", "application/json")
                .json_body(json!({"model": "DeLorean"}));
            then.status(201)
                .header("Location", "/me/cars/1")
                .body("");
        })
        .await;

    let client = client_for(&server);
    let location = client
        .post("/me/cars", &json!({"model": "DeLorean"}), &RequestOptions::new())
        .unwrap()
        .on(Handlers::new().on("201", |body: Value, reply: halwalk_core::Reply| {
            assert_eq!(body, Value::Null);
            let location = reply
                .single()
                .and_then(|response| response.header("location").map(str::to_string));
            Outcome::from(location.map(Value::String))
        }))
        .value()
        .await
        .unwrap();

    assert_eq!(location, Some(json!("/me/cars/1")));
    create.assert_async().await;
}

#[tokio::test]
async fn test_error_status_routes_to_class_handler() {
    let server = MockServer::start_async().await;
    let missing = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/me/cars/9");
            then.status(404).json_body(json!({"error": "no such car"}));
        })
        .await;

    let client = client_for(&server);
    let message = client
        .delete("/me/cars/9", &RequestOptions::new())
        .unwrap()
        .on(Handlers::new()
            .on("2xx", |_, _| Outcome::Value(json!("deleted")))
            .on("4xx", |body: Value, _| Outcome::Value(body["error"].clone())))
        .value()
        .await
        .unwrap();

    assert_eq!(message, Some(json!("no such car")));
    missing.assert_async().await;
}

#[tokio::test]
async fn test_timeout_is_a_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_millis(500)).body("{}");
        })
        .await;

    let client = client_for(&server);
    let result = client
        .get("/slow", &RequestOptions::new().with_timeout(Duration::from_millis(50)))
        .unwrap()
        .on(Handlers::new().on("xxx", |_, _| Outcome::Value(json!("handled"))))
        .await;

    assert!(matches!(result, Err(Error::Transport { .. })));
}

#[tokio::test]
async fn test_connection_refused_is_a_transport_error() {
    let config = ClientConfig::new().with_base_url("http://127.0.0.1:9").unwrap();
    let client = HalClient::new(config).unwrap();

    let result = client.head("/", &RequestOptions::new()).unwrap().await;
    assert!(result.unwrap_err().is_transport());
}
