use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prompt_golem::config::StoreConfig;
use prompt_golem::golem_error::GolemError;
use prompt_golem::rest_store::RestStore;
use prompt_golem::store::{
    OptimizationStore, RunFilter, RunStore, SuggestionFilter, SuggestionStore,
};
use prompt_golem::types::{
    AnalysisType, Optimization, OptimizationUpdate, Run, RunState,
};

async fn store_for(server: &MockServer) -> RestStore {
    RestStore::new(&StoreConfig {
        base_url: server.uri(),
        api_key: "secret".to_string(),
        request_timeout_seconds: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn insert_optimization_posts_row_with_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/optimization"))
        .and(header("apikey", "secret"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "id": "job-1",
            "original_prompt": "Be nice.",
            "state": "pending",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    store
        .insert_optimization(&Optimization::new("job-1", "Be nice.", "", None))
        .await
        .unwrap();
}

#[tokio::test]
async fn insert_with_wrong_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/optimization"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let err = store
        .insert_optimization(&Optimization::new("job-1", "Be nice.", "", None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GolemError::UnexpectedStatus { status: 409, ref body } if body == "duplicate key"
    ));
}

#[tokio::test]
async fn update_optimization_patches_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/optimization"))
        .and(query_param("id", "eq.job-1"))
        .and(body_partial_json(json!({
            "state": "completed",
            "optimized_prompt": "Be kind.",
            "parent_id": "job-0",
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    store
        .update_optimization("job-1", &OptimizationUpdate::completed("Be kind.", Some("job-0")))
        .await
        .unwrap();
}

#[tokio::test]
async fn read_optimization_requires_exactly_one_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/optimization"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/optimization"))
        .and(query_param("id", "eq.job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "job-1",
            "original_prompt": "Be nice.",
            "optimized_prompt": "Be kind.",
            "instructions": "",
            "state": "completed",
            "parent_id": null,
            "created_at": "2026-01-01T00:00:00+00:00",
        }])))
        .mount(&server)
        .await;

    let store = store_for(&server).await;

    let err = store.read_optimization("missing").await.unwrap_err();
    assert!(matches!(err, GolemError::NotFound(_)));

    let job = store.read_optimization("job-1").await.unwrap();
    assert!(job.is_completed());
    assert_eq!(job.optimized_prompt, "Be kind.");
    assert_eq!(job.parent_id, None);
}

#[tokio::test]
async fn run_lifecycle_uses_run_table() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_partial_json(json!({ "type": "clarity", "state": "running" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/run"))
        .and(body_partial_json(json!({ "state": "failed" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let run = Run::started("job-1", AnalysisType::Clarity);
    store.insert_run(&run).await.unwrap();
    store.update_run(&run.id, RunState::Failed).await.unwrap();
}

#[tokio::test]
async fn read_runs_rejects_unknown_analysis_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/run"))
        .and(query_param("optimization_id", "eq.job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "r1", "optimization_id": "job-1", "type": "clarity", "state": "completed" },
            { "id": "r2", "optimization_id": "job-1", "type": "tone", "state": "completed" },
        ])))
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let err = store
        .read_runs(&RunFilter::for_job("job-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, GolemError::UnknownAnalysisType(ref t) if t == "tone"));
}

#[tokio::test]
async fn read_suggestions_filters_by_feedback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/suggestion"))
        .and(query_param("optimization_id", "eq.parent"))
        .and(query_param("user_feedback", "eq.-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "s1",
            "run_id": "r1",
            "optimization_id": "parent",
            "type": "conciseness",
            "target": "foo",
            "suggestion": "drop foo",
            "reasoning": "redundant",
            "user_feedback": -1,
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let rejected = store
        .read_suggestions(&SuggestionFilter::for_job("parent").with_feedback(-1))
        .await
        .unwrap();

    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].analysis_type, AnalysisType::Conciseness);
    assert!(rejected[0].is_rejected());
}

#[tokio::test]
async fn read_suggestion_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/suggestion"))
        .and(query_param("id", "eq.s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "s1",
            "run_id": "r1",
            "optimization_id": "job-1",
            "type": "clarity",
            "target": "foo",
            "suggestion": "say bar",
            "reasoning": "",
            "user_feedback": 0,
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let suggestion = store.read_suggestion("s1").await.unwrap();
    assert_eq!(suggestion.optimization_id, "job-1");
    assert_eq!(suggestion.analysis_type, AnalysisType::Clarity);
}

#[tokio::test]
async fn read_missing_suggestion_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/suggestion"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let err = store.read_suggestion("gone").await.unwrap_err();
    assert!(matches!(err, GolemError::NotFound(_)));
}

#[tokio::test]
async fn empty_suggestion_batch_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/suggestion"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    store.insert_suggestions(&[]).await.unwrap();
}

#[tokio::test]
async fn update_suggestion_sets_feedback() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/suggestion"))
        .and(query_param("id", "eq.s1"))
        .and(body_partial_json(json!({ "user_feedback": 1 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    store.update_suggestion("s1", 1).await.unwrap();
}
