//! HTTP API integration tests: listing, feeds, covers, rescans.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{body_bytes, body_to_string, TestHarness};

#[tokio::test]
async fn health_endpoint() {
    let h = TestHarness::new();
    let response = h.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn list_books_after_rescan() {
    let h = TestHarness::new();
    h.write("dune", "01.mp3", "duration=60;album=Dune;artist=Frank Herbert;track=1");
    h.write("dune", "02.mp3", "duration=90;album=Dune;artist=Frank Herbert;track=2");

    let response = h.get("/books").await;
    assert_eq!(body_to_string(response.into_body()).await, "[]");

    let report = h.rescan().await;
    assert_eq!(report.added, 1);

    let response = h.get("/books").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    let books = json.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Dune");
    assert_eq!(books[0]["author"], "Frank Herbert");
    assert_eq!(books[0]["files"], 2);
    assert_eq!(books[0]["duration"], 150.0);
    assert_eq!(
        books[0]["feed_url"],
        format!("http://localhost/books/{}/feed.xml", h.book_id("dune"))
    );
}

#[tokio::test]
async fn feed_served_with_rss_content_type() {
    let h = TestHarness::new();
    h.write("dune", "01.mp3", "duration=60;album=Dune");
    h.rescan().await;

    let response = h
        .send(
            Request::get(format!("/books/{}/feed.xml", h.book_id("dune")))
                .header(header::HOST, "books.local:8080")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/rss+xml; charset=utf-8"
    );
    assert!(response.headers().contains_key(header::ETAG));
    assert!(response.headers().contains_key(header::LAST_MODIFIED));

    let xml = body_to_string(response.into_body()).await;
    assert!(xml.contains("<title>Dune</title>"));
    assert!(xml.contains(&format!(
        "http://books.local:8080{}",
        h.file_url("dune", "01.mp3")
    )));
}

#[tokio::test]
async fn feed_unknown_book_is_404() {
    let h = TestHarness::new();
    let response = h.get("/books/0123456789abcdef/feed.xml").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn feed_is_idempotent() {
    let h = TestHarness::new();
    h.write("dune", "01.mp3", "duration=60;album=Dune");
    h.write("dune", "02.mp3", "duration=60;album=Dune");
    h.write("dune", "abook", "chapters:\n  - title: Prologue\n  - start: 70\n    title: Part Two\n");
    h.rescan().await;

    let uri = format!("/books/{}/feed.xml", h.book_id("dune"));
    let first = body_bytes(h.get(&uri).await.into_body()).await;
    let second = body_bytes(h.get(&uri).await.into_body()).await;
    assert_eq!(first, second);

    // A rescan with no changes keeps the document byte-identical.
    h.rescan().await;
    let third = body_bytes(h.get(&uri).await.into_body()).await;
    assert_eq!(first, third);
}

#[tokio::test]
async fn feed_conditional_get() {
    let h = TestHarness::new();
    h.write("dune", "01.mp3", "duration=60;album=Dune");
    h.rescan().await;
    let uri = format!("/books/{}/feed.xml", h.book_id("dune"));

    let response = h.get(&uri).await;
    let etag = response.headers()[header::ETAG].to_str().unwrap().to_string();
    let last_modified = response.headers()[header::LAST_MODIFIED]
        .to_str()
        .unwrap()
        .to_string();

    let response = h
        .send(
            Request::get(&uri)
                .header(header::IF_NONE_MATCH, &etag)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(response.into_body()).await.is_empty());

    let response = h
        .send(
            Request::get(&uri)
                .header(header::IF_MODIFIED_SINCE, &last_modified)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    let response = h
        .send(
            Request::get(&uri)
                .header(header::IF_NONE_MATCH, "\"stale\"")
                .header(header::IF_MODIFIED_SINCE, &last_modified)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn head_feed_has_no_body() {
    let h = TestHarness::new();
    h.write("dune", "01.mp3", "duration=60;album=Dune");
    h.rescan().await;

    let response = h
        .send(
            Request::builder()
                .method(Method::HEAD)
                .uri(format!("/books/{}/feed.xml", h.book_id("dune")))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn cover_endpoint() {
    let h = TestHarness::new();
    h.write("dune", "01.mp3", "duration=60;album=Dune");
    h.write("dune", "cover.jpg", b"\xff\xd8\xff\xe0fakejpeg");
    h.write("bare", "01.mp3", "duration=60;album=Bare");
    h.rescan().await;

    let response = h.get(&format!("/books/{}/cover", h.book_id("dune"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        body_bytes(response.into_body()).await,
        b"\xff\xd8\xff\xe0fakejpeg"
    );

    let response = h.get(&format!("/books/{}/cover", h.book_id("bare"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let xml = body_to_string(
        h.get(&format!("/books/{}/feed.xml", h.book_id("dune")))
            .await
            .into_body(),
    )
    .await;
    assert!(xml.contains(&format!("/books/{}/cover", h.book_id("dune"))));
}

#[tokio::test]
async fn rescan_endpoint_returns_report() {
    let h = TestHarness::new();
    h.write("dune", "01.mp3", "duration=60;album=Dune");

    let response = h
        .send(
            Request::post("/library/rescan")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(json["added"], 1);
    assert_eq!(json["books"], 1);

    std::fs::remove_dir_all(h.root.path().join("dune")).unwrap();
    let response = h
        .send(
            Request::post("/library/rescan")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let json: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(json["removed"], 1);
    assert_eq!(json["books"], 0);

    let response = h.get(&format!("/books/{}/feed.xml", h.book_id("dune"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_url_used_for_links() {
    let h = TestHarness::with_config(|c| {
        c.server.public_url = Some("https://books.example.org/".into());
    });
    h.write("dune", "01.mp3", "duration=60;album=Dune");
    h.rescan().await;

    let xml = body_to_string(
        h.get(&format!("/books/{}/feed.xml", h.book_id("dune")))
            .await
            .into_body(),
    )
    .await;
    assert!(xml.contains(&format!(
        "https://books.example.org{}",
        h.file_url("dune", "01.mp3")
    )));
}
