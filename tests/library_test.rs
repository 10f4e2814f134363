//! Library behaviour observed through the HTTP surface and the index.

mod common;

use axum::http::StatusCode;
use common::{body_to_string, TestHarness};

async fn titles(h: &TestHarness) -> Vec<String> {
    let json: serde_json::Value =
        serde_json::from_str(&body_to_string(h.get("/books").await.into_body()).await).unwrap();
    json.as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn override_takes_precedence_and_reverts() {
    let h = TestHarness::new();
    h.write("book", "01.mp3", "duration=30;album=Chapter One");
    h.rescan().await;
    assert_eq!(titles(&h).await, vec!["Chapter One"]);

    let sidecar = h.write("book", "abook", "title: My Book\nauthor: Jane Doe\n");
    let report = h.rescan().await;
    assert_eq!(report.updated, 1);
    assert_eq!(titles(&h).await, vec!["My Book"]);

    let book = h.ctx.library.book(&h.book_id("book")).unwrap();
    assert_eq!(book.author, "Jane Doe");

    std::fs::remove_file(sidecar).unwrap();
    h.rescan().await;
    assert_eq!(titles(&h).await, vec!["Chapter One"]);
}

#[tokio::test]
async fn invalid_override_degrades_to_tags() {
    let h = TestHarness::new();
    h.write("book", "01.mp3", "duration=30;album=Tagged");
    h.write("book", "abook", "title: [unclosed\n");
    let report = h.rescan().await;

    assert_eq!(titles(&h).await, vec!["Tagged"]);
    assert!(!report.issues.is_empty());
}

#[tokio::test]
async fn corrupt_file_is_skipped() {
    let h = TestHarness::new();
    for n in 1..=4 {
        h.write("book", &format!("{n:02}.mp3"), format!("duration=10;album=Book;track={n}"));
    }
    h.write("book", "05.mp3", "CORRUPT");

    let report = h.rescan().await;
    assert_eq!(report.books, 1);
    assert_eq!(report.issues.len(), 1);
    assert!(report.issues[0].path.ends_with("05.mp3"));

    let book = h.ctx.library.book(&h.book_id("book")).unwrap();
    assert_eq!(book.files.len(), 4);
    assert!((book.total_duration() - 40.0).abs() < 1e-9);
    assert!(book.files.iter().all(|f| f.file_name != "05.mp3"));

    let response = h.get(&h.file_url("book", "05.mp3")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn directories_without_audio_produce_no_book() {
    let h = TestHarness::new();
    h.write("notes", "readme.txt", "nothing to see");
    h.write("broken", "01.mp3", "CORRUPT");
    h.write("good", "01.mp3", "duration=10;album=Good");

    let report = h.rescan().await;
    assert_eq!(report.books, 1);
    assert_eq!(titles(&h).await, vec!["Good"]);
}

#[tokio::test]
async fn ordering_is_stable_across_rescans() {
    let h = TestHarness::new();
    h.write("book", "b.mp3", "duration=10;album=Book;track=1");
    h.write("book", "a.mp3", "duration=10;album=Book;track=2");
    h.write("book", "c.mp3", "duration=10;album=Book;track=3");
    h.rescan().await;
    let first: Vec<String> = h
        .ctx
        .library
        .book(&h.book_id("book"))
        .unwrap()
        .files
        .iter()
        .map(|f| f.file_name.clone())
        .collect();
    assert_eq!(first, vec!["b.mp3", "a.mp3", "c.mp3"]);

    // Touch the directory so the book is rebuilt rather than reused.
    h.write("book", "abook", "description: again\n");
    h.rescan().await;
    let second: Vec<String> = h
        .ctx
        .library
        .book(&h.book_id("book"))
        .unwrap()
        .files
        .iter()
        .map(|f| f.file_name.clone())
        .collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn chapters_lie_within_the_book() {
    let h = TestHarness::new();
    h.write("book", "01.mp3", "duration=100;album=Book");
    h.write("book", "02.mp3", "duration=50;album=Book");
    h.write(
        "book",
        "abook",
        "chapters:\n  - start: 0\n    title: One\n  - start: \"01:30\"\n    title: Two\n",
    );
    h.rescan().await;

    let book = h.ctx.library.book(&h.book_id("book")).unwrap();
    let total = book.total_duration();
    assert_eq!(book.chapters.len(), 2);
    assert_eq!(book.chapters[1].start, 90.0);
    assert!(book.chapters.iter().all(|c| c.start >= 0.0 && c.start < total));

    let xml = body_to_string(
        h.get(&format!("/books/{}/feed.xml", h.book_id("book")))
            .await
            .into_body(),
    )
    .await;
    assert!(xml.contains("psc:chapters"));
    assert!(xml.contains("00:01:30.000"));
}

#[tokio::test]
async fn out_of_range_chapters_are_dropped() {
    let h = TestHarness::new();
    h.write("book", "01.mp3", "duration=100;album=Book");
    h.write(
        "book",
        "abook",
        "title: Kept\nchapters:\n  - start: 0\n    title: One\n  - start: 500\n    title: Beyond\n",
    );
    let report = h.rescan().await;

    let book = h.ctx.library.book(&h.book_id("book")).unwrap();
    assert_eq!(book.title, "Kept");
    assert!(book.chapters.iter().all(|c| c.start < book.total_duration()));
    assert!(report.issues.iter().any(|i| i.message.contains("chapter")));
}
