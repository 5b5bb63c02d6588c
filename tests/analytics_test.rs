use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prompt_golem::analytics::{
    capture_logged, Analytics, AnyAnalytics, HttpAnalytics, EVENT_REQUESTED,
};
use prompt_golem::config::AnalyticsConfig;
use prompt_golem::golem_error::GolemError;

fn config_for(server: &MockServer) -> AnalyticsConfig {
    AnalyticsConfig {
        enabled: true,
        base_url: server.uri(),
        api_key: "phc_test".to_string(),
    }
}

#[tokio::test]
async fn capture_posts_event_with_job_as_distinct_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/capture/"))
        .and(body_partial_json(json!({
            "api_key": "phc_test",
            "event": "optimization_requested",
            "properties": { "distinct_id": "job-1" },
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let analytics = AnyAnalytics::from_config(&config_for(&server)).unwrap();
    assert!(matches!(analytics, AnyAnalytics::Http(_)));
    analytics.capture(EVENT_REQUESTED, "job-1").await.unwrap();
}

#[tokio::test]
async fn rejected_capture_is_an_error_but_logged_capture_is_not() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/capture/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let analytics = HttpAnalytics::new(&config_for(&server)).unwrap();
    let err = analytics.capture(EVENT_REQUESTED, "job-1").await.unwrap_err();
    assert!(matches!(err, GolemError::UnexpectedStatus { status: 401, .. }));

    // Swallowed: returns unit.
    capture_logged(&analytics, EVENT_REQUESTED, "job-1").await;
}
