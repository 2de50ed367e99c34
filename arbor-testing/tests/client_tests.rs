//! TestClient against a small site.

use arbor_core::*;
use arbor_testing::*;

fn site(spy: &Spy) -> Site {
    let root = ResourceTable::builder()
        .leaf("index", spy.page("index", "home"))
        .leaf(
            "cached",
            spy.page("cached", "fresh").pre(pre_fn(|_, _| {
                Box::pin(async { Ok(Some(Reply::from("from cache"))) })
            })),
        )
        .leaf(
            "echo",
            Endpoint::page(
                Signature::compile([Parameter::str("word")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move { Ok(Reply::text(args.str("word")?.to_uppercase())) })
                }),
            ),
        )
        .leaf(
            "whoami",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(|ctx, _| {
                    let name = ctx.request().cookies().get("user").cloned();
                    Box::pin(async move {
                        Ok(Reply::text(name.unwrap_or_else(|| "nobody".into())))
                    })
                }),
            ),
        )
        .leaf(
            "login",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(|_, _| Box::pin(async { Err(Error::from(Redirect::completion("/", None))) })),
            ),
        )
        .leaf(
            "stats",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(|_, _| {
                    Box::pin(async { Reply::json(&serde_json::json!({ "hits": 2 })) })
                }),
            ),
        )
        .build()
        .unwrap();
    Site::new([root])
}

#[tokio::test]
async fn test_get_and_spy() {
    let spy = Spy::new();
    let client = TestClient::new(site(&spy));

    let response = client.get("/").await;
    assert_success(&response);
    assert_body(&response, "home");
    assert_eq!(spy.calls(), ["index"]);
}

#[tokio::test]
async fn test_pre_hook_keeps_handler_idle() {
    let spy = Spy::new();
    let client = TestClient::new(site(&spy));

    assert_body(&client.get("/cached").await, "from cache");
    assert!(spy.never_called());
}

#[tokio::test]
async fn test_query_form_and_path_arguments() {
    let client = TestClient::new(site(&Spy::new()));

    assert_body(&client.get("/echo/hi").await, "HI");
    let request = TestRequestBuilder::get("/echo").query("word", "query").build();
    assert_body(&client.send(request).await, "QUERY");
    assert_body(&client.post_form("/echo", &[("word", "form")]).await, "FORM");
}

#[tokio::test]
async fn test_cookies() {
    let client = TestClient::new(site(&Spy::new()));

    assert_body(&client.get("/whoami").await, "nobody");
    let request = TestRequestBuilder::get("/whoami").cookie("user", "ada").build();
    assert_body(&client.send(request).await, "ada");
}

#[tokio::test]
async fn test_failures_and_redirects() {
    let client = TestClient::new(site(&Spy::new()));

    assert_not_found(&client.get("/nowhere").await);
    assert_not_found(&client.get("/echo").await);
    assert_redirect(&client.request("POST", "/login").await, 303, "/");
}

#[tokio::test]
async fn test_json_reply() {
    let client = TestClient::new(site(&Spy::new()));

    let response = client.get("/stats").await;
    assert_header(&response, "Content-Type", "application/json");
    assert_json(&response, &serde_json::json!({ "hits": 2 }));
}

#[tokio::test]
async fn test_resolve_helpers() {
    let client = TestClient::new(site(&Spy::new()));

    assert_resolved(&client.resolve(Request::get("/echo/x")).await, "X");
    assert_unresolved(&client.resolve(Request::get("/nowhere")).await);
    assert_eq!(client.resolve_text("/").await.unwrap(), "home");
}
