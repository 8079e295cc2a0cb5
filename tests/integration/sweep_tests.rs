//! End-to-end sweep tests: crawl both marketplaces, reconcile, persist

use crate::common::{olx_page, otodom_page, test_config, OLX_SEARCH_PATH, OTODOM_SEARCH_PATH};
use offer_tracker::crawler::Coordinator;
use offer_tracker::storage::{RunStatus, SqliteStorage, Storage};
use offer_tracker::{CrawlTarget, EstateType, ListingUrl, OfferType};
use std::collections::BTreeSet;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn target() -> CrawlTarget {
    CrawlTarget::new("katowice", OfferType::Rent, EstateType::Apartment)
}

fn coordinator(server: &MockServer) -> Coordinator {
    Coordinator::with_storage(
        test_config(&server.uri(), ""),
        "test_hash",
        SqliteStorage::new_in_memory().unwrap(),
    )
    .unwrap()
}

/// Serves one page of Otodom and OLX results
async fn serve(server: &MockServer, otodom_slugs: &[&str], olx_ids: &[&str]) {
    server.reset().await;

    Mock::given(method("GET"))
        .and(path(OTODOM_SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(otodom_page(otodom_slugs.len() as u64, otodom_slugs)),
        )
        .mount(server)
        .await;

    let hrefs: Vec<String> = olx_ids
        .iter()
        .map(|id| format!("/d/oferta/{}.html", id))
        .collect();
    let hrefs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
    Mock::given(method("GET"))
        .and(path(OLX_SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(olx_page(hrefs.len() as u64, &hrefs)),
        )
        .mount(server)
        .await;
}

/// Makes one marketplace answer with a server error
async fn fail(server: &MockServer, search_path: &str) {
    Mock::given(method("GET"))
        .and(path(search_path))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(server)
        .await;
}

fn active(coordinator: &Coordinator) -> BTreeSet<String> {
    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    storage
        .load_active(&target())
        .unwrap()
        .into_iter()
        .map(|r| r.url.into_string())
        .collect()
}

fn inactive(coordinator: &Coordinator) -> BTreeSet<String> {
    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    storage
        .load_inactive(&target())
        .unwrap()
        .into_iter()
        .map(|r| r.url.into_string())
        .collect()
}

fn otodom_url(server: &MockServer, slug: &str) -> String {
    format!("{}/pl/oferta/{}", server.uri(), slug)
}

fn olx_url(server: &MockServer, id: &str) -> String {
    format!("{}/d/oferta/{}.html", server.uri(), id)
}

#[tokio::test]
async fn test_sweeps_insert_deactivate_and_reactivate() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    // First sweep: everything is new
    serve(&server, &["a-ID1", "b-ID2"], &["x-CID3-IDx"]).await;
    let summary = coordinator.run_once().await.unwrap();
    assert_eq!(summary.targets, 1);
    assert_eq!(summary.reconciled, 1);
    assert_eq!(summary.inserted, 3);
    assert_eq!(
        active(&coordinator),
        BTreeSet::from([
            otodom_url(&server, "a-ID1"),
            otodom_url(&server, "b-ID2"),
            olx_url(&server, "x-CID3-IDx"),
        ])
    );

    // Second sweep: "b" vanished, "c" appeared
    serve(&server, &["a-ID1", "c-ID3"], &["x-CID3-IDx"]).await;
    let summary = coordinator.run_once().await.unwrap();
    assert_eq!(
        (summary.inserted, summary.reactivated, summary.deactivated),
        (1, 0, 1)
    );
    assert_eq!(inactive(&coordinator), BTreeSet::from([otodom_url(&server, "b-ID2")]));

    // Third sweep: "b" came back
    serve(&server, &["a-ID1", "b-ID2", "c-ID3"], &["x-CID3-IDx"]).await;
    let summary = coordinator.run_once().await.unwrap();
    assert_eq!(
        (summary.inserted, summary.reactivated, summary.deactivated),
        (0, 1, 0)
    );
    assert!(inactive(&coordinator).is_empty());
    assert_eq!(active(&coordinator).len(), 4);

    // Unchanged results leave the partition alone
    let summary = coordinator.run_once().await.unwrap();
    assert_eq!(
        (summary.inserted, summary.reactivated, summary.deactivated),
        (0, 0, 0)
    );
}

#[tokio::test]
async fn test_failed_marketplace_does_not_block_the_other() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    serve(&server, &["a-ID1"], &["x-CID3-IDx"]).await;
    fail(&server, OLX_SEARCH_PATH).await;

    let summary = coordinator.run_once().await.unwrap();
    assert_eq!(summary.failed_crawls, 1);
    assert_eq!(summary.reconciled, 1);
    assert_eq!(
        active(&coordinator),
        BTreeSet::from([otodom_url(&server, "a-ID1")])
    );
}

#[tokio::test]
async fn test_all_marketplaces_failing_skips_reconciliation() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    serve(&server, &["a-ID1", "b-ID2"], &[]).await;
    coordinator.run_once().await.unwrap();
    assert_eq!(active(&coordinator).len(), 2);

    serve(&server, &[], &[]).await;
    fail(&server, OTODOM_SEARCH_PATH).await;
    fail(&server, OLX_SEARCH_PATH).await;

    let summary = coordinator.run_once().await.unwrap();
    assert_eq!(summary.failed_crawls, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.deactivated, 0);
    assert_eq!(active(&coordinator).len(), 2);
}

#[tokio::test]
async fn test_empty_crawl_over_active_listings_is_skipped() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    serve(&server, &["a-ID1", "b-ID2"], &[]).await;
    coordinator.run_once().await.unwrap();

    serve(&server, &[], &[]).await;
    let summary = coordinator.run_once().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.deactivated, 0);
    assert_eq!(active(&coordinator).len(), 2);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server).with_dry_run(true);

    serve(&server, &["a-ID1", "b-ID2"], &["x-CID3-IDx"]).await;
    let summary = coordinator.run_once().await.unwrap();

    assert_eq!(summary.inserted, 3);
    assert!(active(&coordinator).is_empty());
    let storage = coordinator.storage();
    assert!(storage.lock().unwrap().get_latest_run().unwrap().is_none());
}

#[tokio::test]
async fn test_sweep_is_recorded_as_run() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    serve(&server, &["a-ID1"], &[]).await;
    coordinator.run_once().await.unwrap();

    let storage = coordinator.storage();
    let run = storage.lock().unwrap().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test_hash");
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_listing_urls_are_normalized_before_storage() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    serve(&server, &["a-ID1?utm_source=newsletter#gallery"], &[]).await;
    coordinator.run_once().await.unwrap();

    let stored = active(&coordinator);
    assert_eq!(stored.len(), 1);
    let url = stored.iter().next().unwrap();
    assert_eq!(url, &otodom_url(&server, "a-ID1"));
    assert_eq!(ListingUrl::parse(url).unwrap().as_str(), url);
}
