//! Scrapes /metrics after driving traffic through an observed orchestrator.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use stratum_api::telemetry::PrometheusObserver;
use stratum_api::{create_api_router, ApiConfig, ApiState};
use stratum_storage::SharedProvider;
use stratum_test_utils::{
    FaultyProvider, MemoryCacheProvider, MockProvider, Operation, Orchestrator,
    OrchestratorConfig, PriorityTable, ProviderRegistry, TierId,
};
use tower::ServiceExt;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Value of the first sample of `name` whose labels contain every `label`.
fn sample(scrape: &str, name: &str, labels: &[&str]) -> Option<f64> {
    scrape
        .lines()
        .filter(|line| line.starts_with(&format!("{name}{{")))
        .find(|line| labels.iter().all(|label| line.contains(label)))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

#[tokio::test]
async fn scrape_reports_tier_calls_and_cache_lookups() -> TestResult {
    let cache = Arc::new(MemoryCacheProvider::unbounded());
    let database = Arc::new(FaultyProvider::new(MockProvider::new(TierId::DATABASE)));
    let providers: Vec<SharedProvider> = vec![
        cache.clone() as SharedProvider,
        Arc::new(MockProvider::new(TierId::FILE)) as SharedProvider,
        database.clone() as SharedProvider,
    ];
    let registry = ProviderRegistry::new(&PriorityTable::standard(), providers)?;
    let orchestrator = Orchestrator::new(registry, OrchestratorConfig::default())
        .with_observer(Arc::new(PrometheusObserver));

    let id = orchestrator.save("counted").await?;
    orchestrator.get_by_id(id.as_str()).await?;
    orchestrator.get_by_id(id.as_str()).await?;

    database.fail(Operation::Save);
    assert!(orchestrator.save("rolled back").await.is_err());

    let app = create_api_router(ApiState::new(orchestrator).with_cache(cache), &ApiConfig::default());
    let request = Request::builder().uri("/metrics").body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let scrape = String::from_utf8(body.to_vec())?;

    let calls = "stratum_provider_calls_total";
    let saved = sample(&scrape, calls, &[r#"tier="cache""#, r#"operation="save""#, r#"status="success""#]);
    assert!(saved >= Some(2.0), "cache saves missing:\n{scrape}");

    let failed = sample(&scrape, calls, &[r#"tier="database""#, r#"operation="save""#, r#"status="error""#]);
    assert!(failed >= Some(1.0), "database save failure missing:\n{scrape}");

    let rollbacks = sample(&scrape, calls, &[r#"tier="cache""#, r#"operation="rollback""#]);
    assert!(rollbacks >= Some(1.0), "rollback missing:\n{scrape}");

    assert_eq!(sample(&scrape, "stratum_cache_lookups", &[r#"result="hit""#]), Some(2.0));
    assert_eq!(sample(&scrape, "stratum_cache_lookups", &[r#"result="miss""#]), Some(0.0));
    assert!(scrape.lines().any(|line| line == "stratum_cache_hit_ratio 1"));
    Ok(())
}
