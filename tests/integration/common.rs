//! Shared fixtures: mock search pages and test configuration

use offer_tracker::config::{parse_config, Config};
use offer_tracker::crawler::{Fetcher, RetryPolicy};
use offer_tracker::config::HttpConfig;
use std::sync::Arc;

/// Otodom search page with a Next.js data island
pub fn otodom_page(total: u64, slugs: &[&str]) -> String {
    let items: Vec<serde_json::Value> = slugs
        .iter()
        .map(|slug| serde_json::json!({ "id": 1, "slug": slug }))
        .collect();
    let data = serde_json::json!({
        "props": {
            "pageProps": {
                "data": {
                    "searchAds": {
                        "items": items,
                        "pagination": { "totalResults": total, "itemsPerPage": 36 }
                    }
                }
            }
        }
    });

    format!(
        r#"<html><head><title>Otodom</title></head><body>
        <div id="__next"></div>
        <script id="__NEXT_DATA__" type="application/json">{}</script>
        </body></html>"#,
        data
    )
}

/// OLX search page with the count heading and listing cards
pub fn olx_page(total: u64, hrefs: &[&str]) -> String {
    let cards: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<div data-cy="l-card"><a class="css-rc5s2u" href="{}">offer</a></div>"#,
                href
            )
        })
        .collect();

    format!(
        r#"<html><body>
        <h3 class="css-1y5481k er34gjf0">Znaleźliśmy {} ogłoszeń</h3>
        {}
        </body></html>"#,
        total, cards
    )
}

/// Page without any of the expected structure
pub fn broken_page() -> String {
    "<html><body><p>Przepraszamy, coś poszło nie tak</p></body></html>".to_string()
}

/// Zero-delay fetcher with a bounded number of outer retries
pub fn test_fetcher(max_retries: usize) -> Arc<Fetcher> {
    fetcher_with(RetryPolicy::immediate(max_retries))
}

/// Zero-delay fetcher that retries transient failures without limit,
/// like the default configuration
pub fn unbounded_fetcher() -> Arc<Fetcher> {
    fetcher_with(RetryPolicy {
        max_retries: None,
        ..RetryPolicy::immediate(0)
    })
}

fn fetcher_with(policy: RetryPolicy) -> Arc<Fetcher> {
    let http = HttpConfig {
        timeout_secs: 5,
        ..HttpConfig::default()
    };
    Arc::new(Fetcher::new(&http, policy).unwrap())
}

/// Single-target configuration pointing both marketplaces at `base_url`
pub fn test_config(base_url: &str, extra: &str) -> Config {
    parse_config(&format!(
        r#"
[tracker]
cities = ["katowice"]
offers = ["rent"]
estates = ["apartment"]

[http]
timeout-secs = 5

[retry]
connect-retries = 0
read-retries = 0
backoff-base-ms = 0
backoff-cap-ms = 0
max-retries = 1

[output]
database-path = "unused.db"

[marketplaces.otodom]
base-url = "{base}"

[marketplaces.olx]
base-url = "{base}"

{extra}
"#,
        base = base_url,
        extra = extra
    ))
    .unwrap()
}

pub const OTODOM_SEARCH_PATH: &str = "/pl/oferty/wynajem/mieszkanie/katowice";
pub const OLX_SEARCH_PATH: &str = "/nieruchomosci/mieszkania/wynajem/katowice/";
