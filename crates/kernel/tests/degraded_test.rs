#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Request-level behavior while the database is unreachable.
//!
//! Listing pages render with empty data, detail pages answer 503, and
//! guest favorites keep working because they live in the session.

mod common;

use axum::http::{StatusCode, header};
use serde_json::json;

use common::{TestApp, body_json, body_text, get, location};

const UNAVAILABLE: &str = "无法连接到数据库";

#[tokio::test]
async fn homepage_renders_degraded() {
    let app = TestApp::offline();
    let response = app.request(get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains(UNAVAILABLE));
    assert!(body.contains("暂无图片"));
}

#[tokio::test]
async fn listings_render_empty() {
    let app = TestApp::offline();
    for uri in ["/collection", "/explore", "/random", "/browse", "/geographies"] {
        let response = app.request(get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let body = body_text(response).await;
        assert!(body.contains(UNAVAILABLE), "{uri}");
    }
}

#[tokio::test]
async fn search_page_renders_degraded() {
    let app = TestApp::offline();
    let response = app
        .request(get("/search?q=%E9%BC%8E&era=%E5%95%86&sort=era_asc"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains(UNAVAILABLE));
    assert!(body.contains("鼎"));
    // The era filter is echoed back even though it has no facet list.
    assert!(body.contains(r#"name="era" value="商""#));
}

#[tokio::test]
async fn empty_search_redirects_home() {
    let app = TestApp::offline();
    for uri in ["/search", "/search?q=", "/search?q=%20%20"] {
        let response = app.request(get(uri)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/");
    }
}

#[tokio::test]
async fn json_search_reports_errors() {
    let app = TestApp::offline();

    let response = app.request(get("/api/search?q=")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.request(get("/api/search?q=bronze")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains(UNAVAILABLE));
}

#[tokio::test]
async fn non_numeric_artifact_id_redirects_home() {
    let app = TestApp::offline();
    let response = app.request(get("/artifact/abc")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn artifact_detail_is_unavailable() {
    let app = TestApp::offline();
    let response = app.request(get("/artifact/42")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(response).await.contains(UNAVAILABLE));
}

#[tokio::test]
async fn malformed_category_key_is_not_found() {
    let app = TestApp::offline();
    for uri in ["/culture/3", "/geography/not-a-key", "/culture/0123456789abcdeg"] {
        let response = app.request(get(uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let response = app.request(get("/culture/0123456789abcdef")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_reports_database_down() {
    let app = TestApp::offline();
    let response = app.request(get("/health")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({ "status": "unhealthy", "database": false })
    );
}

#[tokio::test]
async fn static_files_are_served_from_the_static_dir() {
    let app = TestApp::offline();

    let response = app.request(get("/static/css/site.css")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

    let response = app.request(get("/static/../Cargo.toml")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request(get("/static/images/missing.jpg")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guest_favorites_work_without_database() {
    let app = TestApp::offline();
    let mut browser = app.browser();

    let response = browser
        .post_json("/api/artifact/add_to_album", json!({ "artifact_id": 7 }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "已添加到默认收藏夹");

    let response = browser
        .post_json("/api/artifact/add_to_album", json!({ "artifact_id": "7" }))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "该文物已在收藏夹中");

    let page = body_text(browser.get("/user_center").await).await;
    assert!(page.contains("访客收藏"));
    assert!(page.contains("1 件"));

    let response = browser
        .post_json(
            "/api/album/remove_artifact",
            json!({ "album_id": "guest_default", "artifact_id": 7 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "已从图集中移除");

    let response = browser
        .post_json(
            "/api/album/remove_artifact",
            json!({ "album_id": "guest_default", "artifact_id": 7 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_to_album_validates_the_artifact_id() {
    let app = TestApp::offline();
    let mut browser = app.browser();

    let response = browser
        .post_json("/api/artifact/add_to_album", json!({ "artifact_id": "abc" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "文物ID格式错误");

    let response = browser
        .post_json("/api/artifact/add_to_album", json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "文物ID不能为空");

    let response = browser
        .send(common::form_request("/api/artifact/add_to_album", "artifact_id=3"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "请求数据无效");
}

#[tokio::test]
async fn member_only_album_api_rejects_guests() {
    let app = TestApp::offline();
    let mut browser = app.browser();

    for uri in ["/api/album/create", "/api/album/delete", "/api/album/rename"] {
        let response = browser.post_json(uri, json!({ "name": "x", "album_id": 1 })).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body_json(response).await["message"], "请先登录");
    }

    let response = browser
        .post_json("/api/album/remove_artifact", json!({ "album_id": 1, "artifact_id": 2 }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = browser.get("/api/albums").await;
    assert_eq!(body_json(response).await, json!({ "albums": [] }));
}

#[tokio::test]
async fn guest_pages() {
    let app = TestApp::offline();
    let mut browser = app.browser();

    let response = browser.get("/user/collections").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user_center");

    let response = browser.get("/album/5").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user_center");

    let response = browser.get("/album/guest").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("默认收藏夹"));

    let response = browser.get("/admin").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user_center");
}

#[tokio::test]
async fn login_validation_flashes_once() {
    let app = TestApp::offline();
    let mut browser = app.browser();

    let response = browser.post_form("/login", "email=&password=").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user_center");

    let page = body_text(browser.get("/user_center").await).await;
    assert!(page.contains("邮箱和密码不能为空"));

    let page = body_text(browser.get("/user_center").await).await;
    assert!(!page.contains("邮箱和密码不能为空"));
}

#[tokio::test]
async fn registration_rejects_short_passwords() {
    let app = TestApp::offline();
    let mut browser = app.browser();

    let response = browser
        .post_form("/register", "email=a%40example.org&password=123&username=")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let page = body_text(browser.get("/user_center").await).await;
    assert!(page.contains("flash-error"));
}

#[tokio::test]
async fn logout_clears_guest_favorites() {
    let app = TestApp::offline();
    let mut browser = app.browser();

    browser
        .post_json("/api/artifact/add_to_album", json!({ "artifact_id": 11 }))
        .await;
    let response = browser.get("/logout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let page = body_text(browser.get("/user_center").await).await;
    assert!(page.contains("已退出登录"));
    assert!(page.contains("0 件"));
}
