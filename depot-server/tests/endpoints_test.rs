//! Integration tests for the sparse index, the internal API, the frontend
//! and the service endpoints

use axum::http::{header, StatusCode};
use serde_json::{json, Value};

mod common;
use common::{
    auth, crate_archive, origin_head_message, publish, register, registry, registry_with,
    INTERNAL_TOKEN, PUBLIC_URL,
};

fn bearer(token: &str) -> axum::http::HeaderValue {
    auth(&format!("Bearer {token}"))
}

#[tokio::test]
async fn test_health_and_status() {
    let reg = registry();

    let response = reg.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "healthy" }));

    let status: Value = reg.server.get("/status").await.json();
    assert_eq!(status["service"], "depot");
    assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(status["index"], "git2");
    assert_eq!(status["storage"], "disk");
}

#[tokio::test]
async fn test_sparse_index() {
    let reg = registry();
    let token = register(&reg.server, "alice@example.com").await;
    publish(&reg.server, &token, "sparse-me", "0.1.0")
        .await
        .assert_status_ok();
    publish(&reg.server, &token, "sparse-me", "0.2.0")
        .await
        .assert_status_ok();
    publish(&reg.server, &token, "ab", "1.0.0")
        .await
        .assert_status_ok();

    let config: Value = reg.server.get("/index/config.json").await.json();
    assert_eq!(config["dl"], format!("{PUBLIC_URL}/api/v1/crates"));
    assert_eq!(config["api"], PUBLIC_URL);
    assert!(config.get("auth-required").is_none());

    let response = reg.server.get("/index/sp/ar/sparse-me").await;
    response.assert_status_ok();
    let lines: Vec<Value> = response
        .text()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["vers"], "0.1.0");
    assert_eq!(lines[1]["vers"], "0.2.0");
    assert_eq!(lines[1]["yanked"], false);

    reg.server.get("/index/2/ab").await.assert_status_ok();

    // Paths that do not match the layout of the name
    reg.server
        .get("/index/xx/yy/sparse-me")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    reg.server
        .get("/index/sparse-me")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    reg.server
        .get("/index/mi/ss/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sparse_config_advertises_auth() {
    let reg = registry_with(|config| config.general.auth_required = true);
    let token = register(&reg.server, "alice@example.com").await;

    let response = reg
        .server
        .get("/index/config.json")
        .add_header(header::AUTHORIZATION, auth(&token))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["auth-required"], true);
}

#[tokio::test]
async fn test_internal_api_disabled_by_default() {
    let reg = registry();
    reg.server
        .get("/internal/index/url")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_internal_api() {
    let reg = registry_with(|config| {
        config.internal.enabled = true;
        config.internal.token = INTERNAL_TOKEN.to_string();
    });

    reg.server
        .get("/internal/index/url")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    reg.server
        .get("/internal/index/url")
        .add_header(header::AUTHORIZATION, bearer("wrong"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let url: Value = reg
        .server
        .get("/internal/index/url")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .json();
    assert_eq!(url["url"], reg.origin.to_str().unwrap());

    let config: Value = reg
        .server
        .get("/internal/index/config")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .json();
    assert_eq!(config["dl"], format!("{PUBLIC_URL}/api/v1/crates"));

    let record = json!({
        "name": "peer-crate",
        "vers": "0.1.0",
        "deps": [],
        "cksum": "c".repeat(64),
        "features": {},
        "yanked": false
    });
    reg.server
        .post("/internal/index/crates")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .json(&record)
        .await
        .assert_status(StatusCode::CREATED);

    let mut yanked = record.clone();
    yanked["yanked"] = json!(true);
    reg.server
        .put("/internal/index/crates/peer-crate/0.1.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .json(&yanked)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // The path has to name the record being replaced
    reg.server
        .put("/internal/index/crates/peer-crate/0.2.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .json(&yanked)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let records: Value = reg
        .server
        .get("/internal/index/crates/peer-crate")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .json();
    assert_eq!(records[0]["yanked"], true);

    reg.server
        .get("/internal/index/crates/nothing-here")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    reg.server
        .post("/internal/index/commit")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .json(&json!({ "message": "Updating crate `peer-crate#0.1.0`" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(
        origin_head_message(&reg.origin),
        "Updating crate `peer-crate#0.1.0`"
    );

    reg.server
        .post("/internal/index/refresh")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Uncommitted records are dropped by a rollback
    let mut pending = record.clone();
    pending["vers"] = json!("0.2.0");
    reg.server
        .post("/internal/index/crates")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .json(&pending)
        .await
        .assert_status(StatusCode::CREATED);
    reg.server
        .post("/internal/index/rollback")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let records: Value = reg
        .server
        .get("/internal/index/crates/peer-crate")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .json();
    assert_eq!(records.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_internal_storage() {
    let reg = registry_with(|config| {
        config.internal.enabled = true;
        config.internal.token = INTERNAL_TOKEN.to_string();
    });
    let archive = crate_archive("stored", "1.0.0");

    reg.server
        .put("/internal/storage/crates/stored/1.0.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .bytes(archive.clone().into())
        .await
        .assert_status(StatusCode::NO_CONTENT);
    reg.server
        .put("/internal/storage/readmes/stored/1.0.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .text("# stored")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = reg
        .server
        .get("/internal/storage/crates/stored/1.0.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().to_vec(), archive);

    let response = reg
        .server
        .get("/internal/storage/readmes/stored/1.0.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await;
    assert_eq!(response.text(), "# stored");

    reg.server
        .get("/internal/storage/crates/stored/2.0.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    reg.server
        .get("/internal/storage/docs/stored/1.0.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    reg.server
        .put("/internal/storage/readmes/stored/1.0.1")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .bytes(vec![0xff, 0xfe].into())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    reg.server
        .delete("/internal/storage/stored/1.0.0")
        .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    for kind in ["crates", "readmes"] {
        reg.server
            .get(&format!("/internal/storage/{kind}/stored/1.0.0"))
            .add_header(header::AUTHORIZATION, bearer(INTERNAL_TOKEN))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_frontend_pages() {
    let reg = registry_with(|config| config.frontend.title = "Acme Crates".to_string());
    let token = register(&reg.server, "alice@example.com").await;
    publish(&reg.server, &token, "front-page", "0.1.0")
        .await
        .assert_status_ok();
    publish(&reg.server, &token, "front-page", "0.2.0")
        .await
        .assert_status_ok();

    let home = reg.server.get("/").await;
    home.assert_status_ok();
    let html = home.text();
    assert!(html.contains("Acme Crates"));
    assert!(html.contains("front-page"));

    let page = reg.server.get("/crates/front-page").await;
    page.assert_status_ok();
    let html = page.text();
    assert!(html.contains("0.2.0"));
    assert!(html.contains("0.1.0"));
    assert!(html.contains("Version 0.2.0."));
    assert!(html.contains("alice"));

    let results = reg
        .server
        .get("/search")
        .add_query_param("q", "front")
        .await;
    results.assert_status_ok();
    assert!(results.text().contains("front-page"));

    reg.server
        .get("/most-downloaded")
        .await
        .assert_status_ok();
    reg.server
        .get("/crates/unknown")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_frontend_page_numbers_are_bounded() {
    let reg = registry();
    let token = register(&reg.server, "alice@example.com").await;
    publish(&reg.server, &token, "paged", "0.1.0")
        .await
        .assert_status_ok();

    for page in ["9223372036854775807", "-9223372036854775808", "0"] {
        reg.server
            .get("/most-downloaded")
            .add_query_param("page", page)
            .await
            .assert_status_ok();
        reg.server
            .get("/search")
            .add_query_param("q", "paged")
            .add_query_param("page", page)
            .await
            .assert_status_ok();
    }
}

#[tokio::test]
async fn test_frontend_can_be_disabled() {
    let reg = registry_with(|config| config.frontend.enabled = false);
    reg.server.get("/").await.assert_status(StatusCode::NOT_FOUND);
    reg.server.get("/health").await.assert_status_ok();
}
