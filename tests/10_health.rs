mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn root_reports_service_running() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(server.url("/")).await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("cache-control").map(|v| v.to_str().unwrap_or_default()),
        Some("no-cache, no-store, must-revalidate")
    );

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "success");
    assert!(body["message"].as_str().unwrap_or_default().ends_with(" is running smoothly!"));
    Ok(())
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    // Without a reachable database the endpoint still answers, with 503.
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );
    let _body = res.json::<serde_json::Value>().await?;
    Ok(())
}
