use jobscout_client::{M2mAuthenticator, ReqwestExchangeClient, StaticOracleSource};
use jobscout_core::{
    BackoffPolicy, CatalogQuery, CatalogReader, Crawler, CycleOutcome, CycleService, CycleSummary,
    MergeCache, MokaCache, OracleDirectory, SortField, SortOrder, SyncConfig,
    TracingCycleReporter,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::{listing_json, mount_page, mount_signin, page_json};

#[tokio::test]
async fn cycle_against_live_http_oracles() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_signin(&server, "cycle-tok").await;

    // Oracle A: two pages, one listing repeated across them.
    mount_page(
        &server,
        "/a",
        0,
        page_json(
            vec![listing_json("0x1", 80002, 0), listing_json("0x2", 80002, 10)],
            2,
        ),
    )
    .await;
    mount_page(
        &server,
        "/a",
        1,
        page_json(
            vec![listing_json("0x3", 80002, 20), listing_json("0x1", 80002, 0)],
            2,
        ),
    )
    .await;

    // Oracle B: down for the first cycle, then skipped by backoff.
    Mock::given(method("GET"))
        .and(path("/b/job"))
        .and(header("authorization", "Bearer cycle-tok"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let registry = json!({
        "80002": [
            {"address": "0xa", "role": "exchange_oracle", "url": format!("{}/a", server.uri()), "job_types": ["fortune"]},
            {"address": "0xb", "role": "exchange_oracle", "url": format!("{}/b", server.uri()), "job_types": ["fortune"]},
            {"address": "0xc", "role": "exchange_oracle", "job_types": ["fortune"]}
        ]
    });

    let config = SyncConfig::default().with_chain_ids(vec![80002]);
    let catalogs = MokaCache::new();
    let service = CycleService::new(
        M2mAuthenticator::new(&server.uri(), "secret")?,
        OracleDirectory::new(
            StaticOracleSource::from_json(&registry.to_string())?,
            MokaCache::new(),
            &config,
        ),
        Crawler::new(ReqwestExchangeClient::new()?, &config),
        MergeCache::new(catalogs.clone()),
        BackoffPolicy::new(config.max_skip_cycles),
    );

    let outcome = service.run_cycle(&TracingCycleReporter).await;
    assert_eq!(
        outcome,
        CycleOutcome::Completed(CycleSummary {
            crawled: 1,
            skipped: 0,
            failed: 1
        })
    );

    let reader = CatalogReader::new(catalogs);
    let query = CatalogQuery::new(0, 10).with_sort(SortField::CreatedAt, SortOrder::Desc);
    let page = reader.query_oracle("0xa", &query).await?;
    let escrows: Vec<_> = page.results.iter().map(|l| l.escrow_address.as_str()).collect();
    assert_eq!(escrows, vec!["0x3", "0x2", "0x1"]);
    assert_eq!(page.total_results, 3);

    let b = service.directory().find("0xb").await?;
    assert_eq!((b.consecutive_failures, b.skip_cycles_remaining), (1, 1));

    let outcome = service.run_cycle(&TracingCycleReporter).await;
    assert_eq!(
        outcome,
        CycleOutcome::Completed(CycleSummary {
            crawled: 1,
            skipped: 1,
            failed: 0
        })
    );
    assert_eq!(reader.query_oracle("0xa", &query).await?.total_results, 3);

    Ok(())
}

#[tokio::test]
async fn failed_sign_in_skips_every_oracle() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/m2m/signin"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![], 1)))
        .expect(0)
        .mount(&server)
        .await;

    let registry = json!({
        "80002": [{"address": "0xa", "role": "exchange_oracle", "url": server.uri()}]
    });
    let config = SyncConfig::default();
    let service = CycleService::new(
        M2mAuthenticator::new(&server.uri(), "secret")?,
        OracleDirectory::new(
            StaticOracleSource::from_json(&registry.to_string())?,
            MokaCache::new(),
            &config,
        ),
        Crawler::new(ReqwestExchangeClient::new()?, &config),
        MergeCache::new(MokaCache::new()),
        BackoffPolicy::default(),
    );

    assert_eq!(
        service.run_cycle(&TracingCycleReporter).await,
        CycleOutcome::AuthenticationFailed
    );
    Ok(())
}
