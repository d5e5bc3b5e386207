//! Integration tests for relation following


use halwalk_core::{ClientConfig, Error, FollowOptions, Handlers, Method, Outcome, Reply, RequestOptions, Status};
use serde_json::{json, Value};
use test_support::{client, log_capture, ScriptedTransport};

fn marty() -> Value {
    json!({
        "name": "Marty",
        "_links": {
            "self": {"href": "/me"},
            "cars": {"href": "/me/cars"},
            "friends": [{"href": "/friends/doc"}, {"href": "/friends/jennifer"}],
            "search": {"href": "/cars{?model}", "templated": true}
        },
        "_embedded": {
            "address": {"street": "9303 Lyon Drive", "city": "Hill Valley"}
        }
    })
}

fn body() -> Handlers {
    Handlers::new().on("2xx", |body: Value, _| Outcome::Value(body))
}

#[tokio::test]
async fn test_embedded_relation_needs_no_request() {
    let transport = ScriptedTransport::new();
    let client = client(&transport, ClientConfig::default());

    let status = std::sync::Arc::new(std::sync::Mutex::new(None));
    let seen = status.clone();
    let address = client
        .follow(&marty(), "address", FollowOptions::new())
        .on(Handlers::new().on("200", move |body: Value, reply: Reply| {
            *seen.lock().unwrap() = Some(reply.status());
            Outcome::Value(body)
        }))
        .value()
        .await
        .unwrap();

    assert_eq!(address, Some(json!({"street": "9303 Lyon Drive", "city": "Hill Valley"})));
    assert_eq!(*status.lock().unwrap(), Some(Status::Code(200)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_linked_relation_issues_one_get() {
    let transport = ScriptedTransport::new();
    transport.respond("/me/cars", 200, json!([{"model": "DeLorean"}]));
    let client = client(&transport, ClientConfig::default());

    let cars = client
        .follow(&marty(), "cars", FollowOptions::new())
        .on(body())
        .value()
        .await
        .unwrap();

    assert_eq!(cars, Some(json!([{"model": "DeLorean"}])));
    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::GET);
    assert_eq!(calls[0].url, "/me/cars");
}

#[tokio::test]
async fn test_missing_relation_resolves_to_norel() {
    let transport = ScriptedTransport::new();
    let client = client(&transport, ClientConfig::default());
    let representation = json!({"_links": {"self": {"href": "/me"}}});

    let expected = representation.clone();
    let result = client
        .follow(&representation, "foo", FollowOptions::new())
        .on(Handlers::new().on("norel", move |body: Value, reply: Reply| {
            assert_eq!(body, Value::Null);
            let response = reply.single().cloned();
            let info = response
                .as_ref()
                .and_then(|r| r.no_relation_info())
                .map(|(relation, rep)| (relation.to_string(), rep.clone()));
            assert_eq!(info, Some(("foo".to_string(), expected.clone())));
            Outcome::Value(json!("missing"))
        }))
        .value()
        .await
        .unwrap();

    assert_eq!(result, Some(json!("missing")));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_norel_is_not_caught_by_wildcards() {
    let transport = ScriptedTransport::new();
    let (errors, sink) = log_capture();
    let client = client(&transport, ClientConfig::new().with_log_error(sink));

    let result = client
        .follow(&marty(), "boats", FollowOptions::new())
        .on(Handlers::new().on("xxx", |_, _| Outcome::Value(json!("wildcard"))))
        .await;

    assert!(matches!(result, Err(Error::Unhandled { ref status, .. }) if status == "norel"));
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("boats"));
    assert!(errors[0].contains("Marty"));
}

#[tokio::test]
async fn test_templated_link_is_expanded() {
    let transport = ScriptedTransport::new();
    transport.respond("/cars?model=DeLorean", 200, json!([]));
    let client = client(&transport, ClientConfig::default());

    client
        .follow(&marty(), "search", FollowOptions::new().with_var("model", "DeLorean"))
        .await
        .unwrap();
    client
        .follow(&marty(), "search", FollowOptions::new().with_var("model", "De Lorean & Co"))
        .await
        .unwrap();

    let urls: Vec<String> = transport.calls().into_iter().map(|c| c.url).collect();
    assert_eq!(urls, vec!["/cars?model=DeLorean", "/cars?model=De%20Lorean%20%26%20Co"]);
}

#[tokio::test]
async fn test_follow_resolves_against_base_url() {
    let transport = ScriptedTransport::new();
    transport.respond("http://api.test/me/cars", 200, json!([]));
    let config = ClientConfig::new().with_base_url("http://api.test").unwrap();
    let client = client(&transport, config);

    client.follow(&marty(), "cars", FollowOptions::new()).await.unwrap();
    assert_eq!(transport.calls_to("http://api.test/me/cars"), 1);
}

#[tokio::test]
async fn test_follow_all_keeps_link_order() {
    let transport = ScriptedTransport::new();
    transport.respond("/friends/doc", 200, json!({"name": "Doc"}));
    transport.respond("/friends/jennifer", 200, json!({"name": "Jennifer"}));
    let gate = transport.hold("/friends/doc");
    let client = client(&transport, ClientConfig::default());

    let pending = client.follow_all(&marty(), "friends", FollowOptions::new());
    let release = async {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        gate.notify_one();
    };
    let (friends, _) = futures::future::join(pending.on(body()).value(), release).await;

    assert_eq!(friends.unwrap(), Some(json!([{"name": "Doc"}, {"name": "Jennifer"}])));
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn test_follow_without_all_takes_first_link() {
    let transport = ScriptedTransport::new();
    transport.respond("/friends/doc", 200, json!({"name": "Doc"}));
    let client = client(&transport, ClientConfig::default());

    let doc = client
        .follow(&marty(), "friends", FollowOptions::new())
        .on(body())
        .value()
        .await
        .unwrap();

    assert_eq!(doc, Some(json!({"name": "Doc"})));
    assert_eq!(transport.calls_to("/friends/jennifer"), 0);
}

#[tokio::test]
async fn test_follow_all_failure_carries_every_outcome() {
    let transport = ScriptedTransport::new();
    transport.respond("/friends/doc", 200, json!({"name": "Doc"}));
    transport.fail("/friends/jennifer", "connection reset");
    let client = client(&transport, ClientConfig::default());

    let result = client
        .follow_all(&marty(), "friends", FollowOptions::new())
        .on(body())
        .await;

    let err = result.unwrap_err();
    let outcomes = err.outcomes().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(Error::Transport { .. })));
    assert!(err.to_string().contains("1 of 2"));
}

#[tokio::test]
async fn test_follow_all_over_empty_embedded_list() {
    let transport = ScriptedTransport::new();
    let client = client(&transport, ClientConfig::default());
    let garage = json!({"_embedded": {"cars": []}});

    let cars = client
        .follow_all(&garage, "cars", FollowOptions::new())
        .on(Handlers::new().on("200", |body: Value, _| Outcome::Value(body)))
        .value()
        .await
        .unwrap();

    assert_eq!(cars, Some(json!([])));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_follow_all_over_empty_link_list() {
    let transport = ScriptedTransport::new();
    let client = client(&transport, ClientConfig::default());
    let garage = json!({"_links": {"self": {"href": "/me"}, "cars": []}});
    assert!(halwalk_core::can_follow(&garage, "cars"));

    let handlers = || {
        Handlers::new()
            .on("200", |body: Value, _| Outcome::Value(json!({"200": body})))
            .on("norel", |_, _| Outcome::Value(json!("norel")))
    };
    let cars = client
        .follow_all(&garage, "cars", FollowOptions::new())
        .on(handlers())
        .value()
        .await
        .unwrap();
    assert_eq!(cars, Some(json!({"200": []})));

    let single = client
        .follow(&garage, "cars", FollowOptions::new())
        .on(handlers())
        .value()
        .await
        .unwrap();
    assert_eq!(single, Some(json!({"200": null})));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_links_without_href_are_not_a_missing_relation() {
    let transport = ScriptedTransport::new();
    let client = client(&transport, ClientConfig::default());
    let broken = json!({"_links": {"cars": {"title": "no href"}}});

    let status = client
        .follow(&broken, "cars", FollowOptions::new())
        .on(Handlers::new()
            .on("200", |_, _| Outcome::Value(json!("empty")))
            .on("norel", |_, _| Outcome::Value(json!("norel"))))
        .value()
        .await
        .unwrap();

    assert_eq!(status, Some(json!("empty")));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_follow_all_wraps_single_embedded_item() {
    let transport = ScriptedTransport::new();
    let client = client(&transport, ClientConfig::default());

    let addresses = client
        .follow_all(&marty(), "address", FollowOptions::new())
        .on(body())
        .value()
        .await
        .unwrap();

    assert_eq!(addresses, Some(json!([{"street": "9303 Lyon Drive", "city": "Hill Valley"}])));
}

#[tokio::test]
async fn test_mixed_statuses_only_match_full_wildcard() {
    let transport = ScriptedTransport::new();
    transport.respond("/friends/doc", 200, json!({"name": "Doc"}));
    transport.respond_text("/friends/jennifer", 404, "<html>not found</html>");
    let client = client(&transport, ClientConfig::default());

    let handlers = Handlers::new()
        .on("200", |_, _| Outcome::Value(json!("ok")))
        .on("404", |_, _| Outcome::Value(json!("missing")))
        .on("2xx|4xx", |_, _| Outcome::Value(json!("class")))
        .on("xxx", |body: Value, reply: Reply| {
            assert_eq!(reply.status(), Status::Unknown);
            Outcome::Value(body)
        });
    let friends = client
        .follow_all(&marty(), "friends", FollowOptions::new())
        .on(handlers)
        .value()
        .await
        .unwrap();

    assert_eq!(friends, Some(json!([{"name": "Doc"}, null])));
}

#[tokio::test]
async fn test_then_follow_chains_requests() {
    let transport = ScriptedTransport::new();
    transport.respond("/me", 200, marty());
    transport.respond("/me/cars", 200, json!([{"model": "DeLorean"}]));
    let client = client(&transport, ClientConfig::default());

    let cars = client
        .get("/me", &RequestOptions::new())
        .unwrap()
        .on(Handlers::new().on("200", client.then_follow("cars", FollowOptions::new())))
        .on(body())
        .value()
        .await
        .unwrap();

    assert_eq!(cars, Some(json!([{"model": "DeLorean"}])));
    let urls: Vec<String> = transport.calls().into_iter().map(|c| c.url).collect();
    assert_eq!(urls, vec!["/me", "/me/cars"]);
}

#[tokio::test]
async fn test_then_follow_all_chains_requests() {
    let transport = ScriptedTransport::new();
    transport.respond("/me", 200, marty());
    transport.respond("/friends/doc", 200, json!({"name": "Doc"}));
    transport.respond("/friends/jennifer", 200, json!({"name": "Jennifer"}));
    let client = client(&transport, ClientConfig::default());

    let names = client
        .get("/me", &RequestOptions::new())
        .unwrap()
        .on(Handlers::new().on("200", client.then_follow_all("friends", FollowOptions::new())))
        .on(Handlers::new().on("200", |body: Value, _| {
            let names: Vec<Value> = body
                .as_array()
                .map(|friends| friends.iter().map(|f| f["name"].clone()).collect())
                .unwrap_or_default();
            Outcome::Value(Value::Array(names))
        }))
        .value()
        .await
        .unwrap();

    assert_eq!(names, Some(json!(["Doc", "Jennifer"])));
}

#[tokio::test]
async fn test_follow_with_unsafe_method_skips_embedded_and_sends_body() {
    let transport = ScriptedTransport::new();
    transport.respond("/me/cars", 201, json!({"model": "DeLorean"}));
    let client = client(&transport, ClientConfig::default());
    let representation = json!({
        "_links": {"cars": {"href": "/me/cars"}},
        "_embedded": {"cars": [{"model": "Pinto"}]}
    });

    let created = client
        .follow(
            &representation,
            "cars",
            FollowOptions::new()
                .with_method(Method::POST)
                .with_body(json!({"model": "DeLorean"}))
                .with_header("X-Request-Id", "42"),
        )
        .on(Handlers::new().on("201", |body: Value, _| Outcome::Value(body)))
        .value()
        .await
        .unwrap();

    assert_eq!(created, Some(json!({"model": "DeLorean"})));
    let calls = transport.calls();
    assert_eq!(calls[0].method, Method::POST);
    assert_eq!(calls[0].body.as_deref(), Some("{\"model\":\"DeLorean\"}"));
    assert_eq!(calls[0].headers["x-request-id"], "42");
}
