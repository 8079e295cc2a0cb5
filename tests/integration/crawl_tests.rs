//! Paginated crawl tests against mock marketplaces

use crate::common::{
    broken_page, olx_page, otodom_page, test_fetcher, unbounded_fetcher, OLX_SEARCH_PATH,
    OTODOM_SEARCH_PATH,
};
use std::time::Duration;
use offer_tracker::adapters::{
    OlxAdapter, OtodomAdapter, DEFAULT_COUNT_SELECTOR, DEFAULT_LISTING_SELECTOR,
};
use offer_tracker::crawler::{CrawlError, CrawlPhase, CrawlProgress, FetchError, PageCrawler};
use offer_tracker::{CrawlTarget, EstateType, ListingUrl, OfferType};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn target() -> CrawlTarget {
    CrawlTarget::new("katowice", OfferType::Rent, EstateType::Apartment)
}

fn otodom(server: &MockServer) -> OtodomAdapter {
    OtodomAdapter::new(Url::parse(&server.uri()).unwrap())
}

fn olx(server: &MockServer) -> OlxAdapter {
    OlxAdapter::new(
        Url::parse(&server.uri()).unwrap(),
        DEFAULT_COUNT_SELECTOR,
        DEFAULT_LISTING_SELECTOR,
    )
    .unwrap()
}

async fn mount_otodom_page(server: &MockServer, page: u32, body: String, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(OTODOM_SEARCH_PATH))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn listing(server: &MockServer, slug: &str) -> ListingUrl {
    ListingUrl::parse(&format!("{}/pl/oferta/{}", server.uri(), slug)).unwrap()
}

#[tokio::test]
async fn test_crawl_completes_at_total_count() {
    let server = MockServer::start().await;
    mount_otodom_page(&server, 1, otodom_page(5, &["a-ID1", "b-ID2", "c-ID3"]), 1).await;
    // "c" shifted onto page 2 and must not be counted twice
    mount_otodom_page(&server, 2, otodom_page(5, &["c-ID3", "d-ID4", "e-ID5"]), 1).await;
    mount_otodom_page(&server, 3, otodom_page(5, &["f-ID6"]), 0).await;

    let crawler = PageCrawler::new(test_fetcher(0), 150);
    let result = crawler.crawl(&otodom(&server), &target()).await.unwrap();

    assert_eq!(result.phase, CrawlPhase::Completed);
    assert!(result.is_complete());
    assert_eq!(result.total_offers, 5);
    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.urls.len(), 5);
    for slug in ["a-ID1", "b-ID2", "c-ID3", "d-ID4", "e-ID5"] {
        assert!(result.urls.contains(&listing(&server, slug)), "missing {}", slug);
    }
}

#[tokio::test]
async fn test_crawl_stops_past_page_ceiling() {
    let server = MockServer::start().await;
    for page in 1..=3u32 {
        let slugs = [format!("p{}-a", page), format!("p{}-b", page)];
        let slugs: Vec<&str> = slugs.iter().map(String::as_str).collect();
        mount_otodom_page(&server, page, otodom_page(100, &slugs), 1).await;
    }
    mount_otodom_page(&server, 4, otodom_page(100, &["p4-a"]), 0).await;

    let crawler = PageCrawler::new(test_fetcher(0), 2);
    let result = crawler.crawl(&otodom(&server), &target()).await.unwrap();

    assert_eq!(result.phase, CrawlPhase::CeilingReached);
    assert_eq!(result.pages_fetched, 3);
    assert_eq!(result.urls.len(), 6);
    assert!(result.urls.len() as u64 <= result.total_offers);
}

#[tokio::test]
async fn test_empty_pages_do_not_end_the_crawl() {
    let server = MockServer::start().await;
    mount_otodom_page(&server, 1, otodom_page(3, &["a-ID1"]), 1).await;
    mount_otodom_page(&server, 2, otodom_page(3, &["a-ID1"]), 1).await;
    mount_otodom_page(&server, 3, otodom_page(3, &["b-ID2", "c-ID3"]), 1).await;

    let crawler = PageCrawler::new(test_fetcher(0), 150);
    let result = crawler.crawl(&otodom(&server), &target()).await.unwrap();

    assert_eq!(result.phase, CrawlPhase::Completed);
    assert_eq!(result.pages_fetched, 3);
    assert_eq!(result.urls.len(), 3);
}

#[tokio::test]
async fn test_zero_offers_gives_empty_result() {
    let server = MockServer::start().await;
    mount_otodom_page(&server, 1, otodom_page(0, &[]), 1).await;
    mount_otodom_page(&server, 2, otodom_page(0, &[]), 0).await;

    let crawler = PageCrawler::new(test_fetcher(0), 150);
    let result = crawler.crawl(&otodom(&server), &target()).await.unwrap();

    assert_eq!(result.phase, CrawlPhase::Completed);
    assert!(result.urls.is_empty());
    assert_eq!(result.pages_fetched, 1);
}

#[tokio::test]
async fn test_discovery_failure_never_fetches_page_two() {
    let server = MockServer::start().await;
    // A malformed page is not retried even when retries remain
    mount_otodom_page(&server, 1, broken_page(), 1).await;
    mount_otodom_page(&server, 2, otodom_page(10, &["a-ID1"]), 0).await;

    let crawler = PageCrawler::new(test_fetcher(2), 150);
    let err = crawler.crawl(&otodom(&server), &target()).await.unwrap_err();

    assert!(matches!(err, CrawlError::Discovery { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_discovery_failure_surfaces_under_unbounded_retries() {
    let server = MockServer::start().await;
    mount_otodom_page(&server, 1, broken_page(), 1).await;

    let crawler = PageCrawler::new(unbounded_fetcher(), 150);
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        crawler.crawl(&otodom(&server), &target()),
    )
    .await
    .expect("crawl kept retrying a malformed page")
    .unwrap_err();

    assert!(matches!(err, CrawlError::Discovery { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_permanent_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OTODOM_SEARCH_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = PageCrawler::new(unbounded_fetcher(), 150);
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        crawler.crawl(&otodom(&server), &target()),
    )
    .await
    .expect("crawl kept retrying a 404")
    .unwrap_err();

    assert!(
        matches!(
            err,
            CrawlError::Network(FetchError::Status { status: 404, .. })
        ),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_malformed_later_page_fails_the_crawl() {
    let server = MockServer::start().await;
    mount_otodom_page(&server, 1, otodom_page(50, &["a-ID1", "b-ID2"]), 1).await;
    mount_otodom_page(&server, 2, broken_page(), 1).await;
    mount_otodom_page(&server, 3, otodom_page(50, &["c-ID3"]), 0).await;

    let crawler = PageCrawler::new(unbounded_fetcher(), 150);
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        crawler.crawl(&otodom(&server), &target()),
    )
    .await
    .expect("crawl kept retrying a malformed page")
    .unwrap_err();

    assert!(matches!(err, CrawlError::Parse { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OTODOM_SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_otodom_page(&server, 1, otodom_page(2, &["a-ID1", "b-ID2"]), 1).await;

    let crawler = PageCrawler::new(test_fetcher(3), 150);
    let result = crawler.crawl(&otodom(&server), &target()).await.unwrap();

    assert_eq!(result.urls.len(), 2);
    assert_eq!(result.pages_fetched, 1);
}

#[tokio::test]
async fn test_exhausted_retries_fail_without_partial_result() {
    let server = MockServer::start().await;
    mount_otodom_page(&server, 1, otodom_page(50, &["a-ID1", "b-ID2"]), 1).await;
    Mock::given(method("GET"))
        .and(path(OTODOM_SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let crawler = PageCrawler::new(test_fetcher(1), 150);
    let err = crawler.crawl(&otodom(&server), &target()).await.unwrap_err();

    assert!(
        matches!(
            err,
            CrawlError::Network(FetchError::Status { status: 500, .. })
        ),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_olx_crawl_shapes_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OLX_SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(olx_page(
            3,
            &[
                "/d/oferta/kawalerka-centrum-CID3-IDa1.html",
                "https://www.otodom.pl/pl/oferta/m2-katowice-ID9x.html",
                "/d/oferta/kawalerka-centrum-CID3-IDa1.html#gallery",
                "/d/oferta/dwa-pokoje-CID3-IDa2.html",
            ],
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(OLX_SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(olx_page(3, &[])))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = PageCrawler::new(test_fetcher(0), 150);
    let result = crawler.crawl(&olx(&server), &target()).await.unwrap();

    assert_eq!(result.phase, CrawlPhase::Completed);
    assert_eq!(result.urls.len(), 3);
    let own = ListingUrl::parse(&format!(
        "{}/d/oferta/kawalerka-centrum-CID3-IDa1.html",
        server.uri()
    ))
    .unwrap();
    let cross_posted = ListingUrl::parse("https://www.otodom.pl/pl/oferta/m2-katowice-ID9x").unwrap();
    assert!(result.urls.contains(&own));
    assert!(result.urls.contains(&cross_posted));
}

#[tokio::test]
async fn test_progress_is_published() {
    let server = MockServer::start().await;
    mount_otodom_page(&server, 1, otodom_page(4, &["a-ID1", "b-ID2"]), 1).await;
    mount_otodom_page(&server, 2, otodom_page(4, &["c-ID3", "d-ID4"]), 1).await;

    let (sender, receiver) = watch::channel(CrawlProgress::default());
    let crawler = PageCrawler::new(test_fetcher(0), 150);
    crawler
        .crawl_with_progress(&otodom(&server), &target(), &sender)
        .await
        .unwrap();

    let progress = *receiver.borrow();
    assert_eq!(progress.phase, CrawlPhase::Completed);
    assert_eq!(progress.page, 2);
    assert_eq!(progress.saved, 4);
    assert_eq!(progress.total, Some(4));
}

#[tokio::test]
async fn test_cancelled_crawl_sends_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(otodom_page(1, &["a-ID1"])))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let crawler = PageCrawler::new(test_fetcher(0), 150).with_cancellation(token);
    let err = crawler.crawl(&otodom(&server), &target()).await.unwrap_err();

    assert!(matches!(err, CrawlError::Cancelled { pages_fetched: 0 }));
}
