mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ok, status, ScriptedHttp, RANKINGS_HTML};
use table_scraper::error::FetchError;
use table_scraper::pipeline::fetch::Fetcher;
use table_scraper::pipeline::rate_limiter::{Limits, RateLimiter};

const URL: &str = "https://rankings.example.com/iems/";
const TIMEOUT: Duration = Duration::from_secs(5);

fn fetcher(http: Arc<ScriptedHttp>) -> Fetcher {
    Fetcher::new(http, RateLimiter::unlimited()).with_initial_backoff(Duration::ZERO)
}

#[tokio::test]
async fn test_persistent_503_exhausts_retries() {
    let http = Arc::new(ScriptedHttp::new().with(URL, vec![status(503, "busy")]));
    let err = fetcher(http.clone()).fetch(URL, TIMEOUT, 3).await.unwrap_err();

    assert_eq!(
        err,
        FetchError::RetriesExhausted {
            attempts: 3,
            last: Box::new(FetchError::HttpStatus(503)),
        }
    );
    assert_eq!(http.calls(URL), 3);
}

#[tokio::test]
async fn test_two_503s_then_success() {
    let http = Arc::new(ScriptedHttp::new().with(
        URL,
        vec![status(503, ""), status(503, ""), ok(RANKINGS_HTML)],
    ));
    let page = fetcher(http.clone()).fetch(URL, TIMEOUT, 3).await.unwrap();

    assert_eq!(page.status, 200);
    assert_eq!(page.attempts, 3);
    assert_eq!(http.calls(URL), 3);
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let http = Arc::new(ScriptedHttp::new().with(
        URL,
        vec![status(503, ""), Err(FetchError::Timeout), ok(RANKINGS_HTML)],
    ));
    let page = fetcher(http.clone()).fetch(URL, TIMEOUT, 3).await.unwrap();

    assert_eq!(page.status, 200);
    assert_eq!(page.attempts, 3);
    assert_eq!(page.final_url, URL);
    assert!(page.body.contains("Moondrop"));
    assert_eq!(http.calls(URL), 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let http = Arc::new(ScriptedHttp::new().with(URL, vec![status(404, "gone")]));
    let err = fetcher(http.clone()).fetch(URL, TIMEOUT, 5).await.unwrap_err();

    assert_eq!(err, FetchError::HttpStatus(404));
    assert_eq!(http.calls(URL), 1);
}

#[tokio::test]
async fn test_redirect_status_is_terminal() {
    let http = Arc::new(ScriptedHttp::new().with(URL, vec![status(304, "")]));
    let err = fetcher(http.clone()).fetch(URL, TIMEOUT, 3).await.unwrap_err();

    assert_eq!(err, FetchError::HttpStatus(304));
    assert_eq!(http.calls(URL), 1);
}

#[tokio::test]
async fn test_blank_body_fails_without_retry() {
    let http = Arc::new(ScriptedHttp::new().with(URL, vec![ok("  \n\t ")]));
    let err = fetcher(http.clone()).fetch(URL, TIMEOUT, 3).await.unwrap_err();

    assert_eq!(err, FetchError::EmptyBody);
    assert_eq!(http.calls(URL), 1);
}

#[tokio::test]
async fn test_zero_retries_still_makes_one_attempt() {
    let http = Arc::new(ScriptedHttp::new().with(URL, vec![Err(FetchError::ConnectionFailed("refused".into()))]));
    let err = fetcher(http.clone()).fetch(URL, TIMEOUT, 0).await.unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 1, .. }));
    assert_eq!(http.calls(URL), 1);
}

#[tokio::test]
async fn test_politeness_delay_spaces_attempts() {
    let http = Arc::new(ScriptedHttp::new().with(URL, vec![status(500, ""), ok(RANKINGS_HTML)]));
    let limiter = RateLimiter::new(Limits {
        min_interval: Duration::from_millis(100),
    });
    let fetcher = Fetcher::new(http.clone(), limiter).with_initial_backoff(Duration::ZERO);

    let start = std::time::Instant::now();
    let page = fetcher.fetch(URL, TIMEOUT, 3).await.unwrap();

    assert_eq!(page.attempts, 2);
    assert!(start.elapsed() >= Duration::from_millis(100));
}
