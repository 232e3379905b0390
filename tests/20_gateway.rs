mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use common::{profile_json, token_expiring_in, MockBackend, Reply};
use spendwise_client::config::ClientConfig;
use spendwise_client::error::LOGIN_REDIRECT;
use spendwise_client::gateway::paths;
use spendwise_client::session::ExportHistoryEntry;
use spendwise_client::{ApiRequest, GatewayError, Profile, RequestGateway, SessionManager};

fn signed_in(backend: &MockBackend, token: &str) -> Result<RequestGateway> {
    let session = Arc::new(SessionManager::in_memory());
    let profile: Profile = serde_json::from_value(profile_json())?;
    session.save(token, &profile);
    Ok(RequestGateway::new(&backend.config(), session)?)
}

#[tokio::test]
async fn bearer_token_attached_when_stored() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend.reply(paths::EXPENSE_CATEGORIES, Reply::ok(json!({"categories": []})));

    // Expired on purpose: the gateway forwards whatever is stored
    let token = token_expiring_in(Some(-60));
    let gateway = signed_in(&backend, &token)?;
    gateway.get_json(ApiRequest::get(paths::EXPENSE_CATEGORIES)).await?;

    let anonymous = RequestGateway::new(&backend.config(), Arc::new(SessionManager::in_memory()))?;
    anonymous.get_json(ApiRequest::get(paths::EXPENSE_CATEGORIES)).await?;

    let hits = backend.hits_for(paths::EXPENSE_CATEGORIES);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].authorization.as_deref(), Some(format!("Bearer {}", token).as_str()));
    assert_eq!(hits[1].authorization, None);
    Ok(())
}

#[tokio::test]
async fn auth_route_401_forces_logout_once() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend.reply(paths::AUTH_ME, Reply::json(401, json!({"msg": "Token has expired"})));

    let gateway = signed_in(&backend, &token_expiring_in(Some(3600)))?;
    let session = gateway.session().clone();
    session.record_export(ExportHistoryEntry::new("csv", "detailed", "month", "a.csv"));

    let mut request = ApiRequest::get(paths::AUTH_ME);
    let err = gateway.send(&mut request).await.unwrap_err();

    assert!(err.requires_login());
    assert_eq!(err.redirect_target(), Some(LOGIN_REDIRECT));
    assert!(request.has_retried());
    assert!(session.token().is_none());
    assert!(session.current_profile().is_none());
    assert!(session.export_history().is_empty());

    // Same logical request failing again: no second teardown
    let profile: Profile = serde_json::from_value(profile_json())?;
    session.save(&token_expiring_in(None), &profile);
    let again = gateway.send(&mut request).await.unwrap_err();
    assert!(matches!(again, GatewayError::Unauthorized(_)));
    assert!(session.has_token());
    Ok(())
}

#[tokio::test]
async fn business_route_401_is_soft() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend.reply(paths::EXPENSES, Reply::json(401, json!({"msg": "Missing Authorization Header"})));

    let gateway = signed_in(&backend, &token_expiring_in(Some(3600)))?;
    let err = gateway.get_json(ApiRequest::get(paths::EXPENSES)).await.unwrap_err();

    assert!(matches!(err, GatewayError::Unauthorized(ref m) if m == "Missing Authorization Header"));
    assert!(!err.requires_login());
    assert!(gateway.session().has_token());
    assert!(gateway.session().current_profile().is_some());
    Ok(())
}

#[tokio::test]
async fn server_errors_prefer_server_message() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend
        .reply(paths::EXPENSE_SUMMARY, Reply::json(500, json!({"error": "Failed to fetch summary: db down"})))
        .reply(paths::ANALYTICS_DAILY_TREND, Reply::json(503, json!({})));

    let gateway = signed_in(&backend, &token_expiring_in(None))?;

    let err = gateway.get_json(ApiRequest::get(paths::EXPENSE_SUMMARY)).await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(err.user_message(), "Failed to fetch summary: db down");

    let err = gateway.get_json(ApiRequest::get(paths::ANALYTICS_DAILY_TREND)).await.unwrap_err();
    assert_eq!(err.error_code(), "SERVER_ERROR");
    assert_eq!(err.user_message(), "Internal server error");
    Ok(())
}

#[tokio::test]
async fn client_errors_surface_unchanged() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend.reply(&paths::expense(42), Reply::json(404, json!({"error": "Expense not found"})));

    let gateway = signed_in(&backend, &token_expiring_in(None))?;
    let err = gateway.delete_json(&paths::expense(42)).await.unwrap_err();

    assert!(matches!(err, GatewayError::Client { status: 404, .. }));
    assert_eq!(err.user_message(), "Expense not found");
    assert!(gateway.session().has_token());
    Ok(())
}

#[tokio::test]
async fn no_listener_is_unreachable() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("free port");
    let config = ClientConfig::for_base_url(format!("http://127.0.0.1:{}", port));
    let gateway = RequestGateway::new(&config, Arc::new(SessionManager::in_memory()))?;

    let err = gateway.get_json(ApiRequest::get(paths::EXPENSES)).await.unwrap_err();
    assert!(err.is_unreachable());
    assert_eq!(err.status_code(), None);
    Ok(())
}

#[tokio::test]
async fn slow_backend_times_out_as_unreachable() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend.reply(
        paths::EXPENSES,
        Reply::ok(json!({"expenses": []})).delayed(Duration::from_millis(800)),
    );

    let mut config = backend.config();
    config.api.timeout_ms = 150;
    let session = Arc::new(SessionManager::in_memory());
    session.save(&token_expiring_in(None), &serde_json::from_value(profile_json())?);
    let gateway = RequestGateway::new(&config, session)?;

    let err = gateway.get_json(ApiRequest::get(paths::EXPENSES)).await.unwrap_err();
    assert!(err.is_unreachable());
    assert_eq!(err.status_code(), None);
    assert!(gateway.session().has_token());
    Ok(())
}

#[tokio::test]
async fn query_parameters_reach_backend() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend.reply(paths::ANALYTICS_DAILY_TREND, Reply::ok(json!({"data": []})));

    let gateway = signed_in(&backend, &token_expiring_in(None))?;
    gateway
        .get_json(ApiRequest::get(paths::ANALYTICS_DAILY_TREND).query("days", 7))
        .await?;

    let hit = &backend.hits_for(paths::ANALYTICS_DAILY_TREND)[0];
    assert_eq!(hit.query.as_deref(), Some("days=7"));
    Ok(())
}
