//! Preview server routing.

use community_map::server::preview_router;
use std::fs;

#[tokio::test]
async fn root_serves_the_generated_document() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("map.html");
    fs::write(&document, "<!DOCTYPE html><title>map</title>").unwrap();
    fs::write(dir.path().join("legend.png"), [0u8, 1, 2]).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = preview_router(&document);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let index = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert!(index.status().is_success());
    assert_eq!(index.text().await.unwrap(), "<!DOCTYPE html><title>map</title>");

    let asset = reqwest::get(format!("http://{}/legend.png", addr)).await.unwrap();
    assert_eq!(asset.bytes().await.unwrap().as_ref(), &[0u8, 1, 2]);

    let missing = reqwest::get(format!("http://{}/nope.js", addr)).await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
