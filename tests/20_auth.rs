mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn profile_without_token_is_unauthorized() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(server.url("/api/v1/auth/profile")).await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "No token provided");
    Ok(())
}

#[tokio::test]
async fn profile_with_garbage_token_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::Client::new()
        .get(server.url("/api/v1/auth/profile"))
        .bearer_auth("definitely.not.valid")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["message"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn profile_returns_token_claims() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::Client::new()
        .get(server.url("/api/v1/auth/profile"))
        .bearer_auth(server.token()?)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["message"], "Profile fetched successfully");
    assert_eq!(body["data"]["email"], "recruiter@example.com");
    assert_eq!(body["data"]["company"]["name"], "Acme");
    Ok(())
}

#[tokio::test]
async fn session_cookie_is_accepted() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::Client::new()
        .get(server.url("/api/v1/auth/profile/"))
        .header("cookie", format!("auth_token={}", server.token()?))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_expires_cookie() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::Client::new().post(server.url("/api/v1/auth/logout")).send().await?;

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("auth_token=;"), "cookie: {}", cookie);
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(res.json::<Value>().await?["message"], "User logged out");
    Ok(())
}

#[tokio::test]
async fn login_requires_a_body() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::Client::new().post(server.url("/api/v1/auth/login")).send().await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
