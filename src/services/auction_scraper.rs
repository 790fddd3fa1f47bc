use std::time::Duration;

use itertools::Itertools;
use rand::Rng;
use scraper::Html;
use thirtyfour::error::WebDriverResult;
use thirtyfour::WebDriver;
use url::Url;

use crate::configuration::ScraperSettings;
use crate::domain::{ListingRecord, SearchRequest};
use crate::services::browser::{self, BrowserKind};
use crate::services::{detection, extractor, http_session};

const CONTENT_WAIT: Duration = Duration::from_secs(20);

/// Outcome of a single backend attempt. Expected failures are values, not
/// errors; the orchestrator branches on the variant.
pub enum AttemptOutcome {
    Listings(Vec<ListingRecord>),
    Blocked,
    Failed(String),
}

/// Layered anti-detection scraper.
///
/// Per retry round the backends run in order: undetected browser, stealth
/// browser, HTTP client. An attempt only counts as a success when it yields
/// strictly more than one record, since a one-record result is the shape the
/// extractor produces when it found nothing. Callers depend on that
/// heuristic, keep it exact.
pub struct AuctionScraper {
    settings: ScraperSettings,
}

impl AuctionScraper {
    pub fn new(settings: ScraperSettings) -> Self {
        AuctionScraper { settings }
    }

    pub fn settings(&self) -> &ScraperSettings {
        &self.settings
    }

    /// Scrape auction listings for one keyword.
    ///
    /// Never panics and never returns an empty list: after exhausting every
    /// backend and retry round it returns a single synthetic failure record.
    pub async fn scrape(&self, request: &SearchRequest) -> Vec<ListingRecord> {
        let base_url = match Url::parse(&self.settings.base_url) {
            Ok(url) => url,
            Err(e) => {
                log::error!("Invalid base url '{}': {}", self.settings.base_url, e);
                return vec![ListingRecord::scrape_error(&request.keyword, &e.to_string())];
            }
        };

        let max_retries = request.max_retries.max(1);

        for round in 0..max_retries {
            log::info!(
                "Attempt {}/{} for '{}'",
                round + 1,
                max_retries,
                request.keyword
            );

            for kind in [BrowserKind::Undetected, BrowserKind::Stealth] {
                match browser::build_browser_session(kind, &self.settings).await {
                    Some(driver) => {
                        let outcome = self.attempt_with_browser(&driver, request, &base_url).await;
                        // Teardown happens before the outcome is inspected so
                        // no exit path can leak a browser process.
                        if let Err(e) = driver.quit().await {
                            log::warn!("Failed to quit {:?} browser session: {}", kind, e);
                        }
                        match outcome {
                            AttemptOutcome::Listings(records) if records.len() > 1 => {
                                return records;
                            }
                            AttemptOutcome::Listings(records) => log::info!(
                                "{:?} browser found no usable results ({} records)",
                                kind,
                                records.len()
                            ),
                            AttemptOutcome::Blocked => log::warn!(
                                "{:?} browser attempt blocked for '{}'",
                                kind,
                                request.keyword
                            ),
                            AttemptOutcome::Failed(reason) => {
                                log::error!("{:?} browser scraping failed: {}", kind, reason)
                            }
                        }
                    }
                    None => log::info!("{:?} browser backend unavailable, skipping", kind),
                }
            }

            match self.attempt_with_http(request, &base_url).await {
                AttemptOutcome::Listings(records) if records.len() > 1 => return records,
                AttemptOutcome::Listings(_) => log::info!("HTTP fallback found no usable results"),
                AttemptOutcome::Blocked => {
                    log::warn!("HTTP fallback blocked for '{}'", request.keyword)
                }
                AttemptOutcome::Failed(reason) => log::error!("HTTP fallback failed: {}", reason),
            }

            if round + 1 < max_retries {
                let backoff = self.random_delay(
                    self.settings.min_retry_backoff_ms,
                    self.settings.max_retry_backoff_ms,
                );
                log::info!("Waiting {:.1}s before retry", backoff.as_secs_f64());
                tokio::time::sleep(backoff).await;
            }
        }

        vec![ListingRecord::all_methods_failed(&request.keyword)]
    }

    async fn attempt_with_browser(
        &self,
        driver: &WebDriver,
        request: &SearchRequest,
        base_url: &Url,
    ) -> AttemptOutcome {
        match self.drive_search(driver, request, base_url).await {
            Ok(outcome) => outcome,
            Err(e) => AttemptOutcome::Failed(e.to_string()),
        }
    }

    async fn drive_search(
        &self,
        driver: &WebDriver,
        request: &SearchRequest,
        base_url: &Url,
    ) -> WebDriverResult<AttemptOutcome> {
        self.navigate_to_search(driver, &request.keyword).await?;

        browser::add_human_behavior(driver).await;
        tokio::time::sleep(self.random_delay(3_000, 5_000)).await;

        let mut page_source = driver.source().await?;
        if detection::is_blocked(&page_source) {
            let attempted = detection::attempt_captcha_resolution(
                driver,
                self.settings.allow_manual_captcha,
            )
            .await;
            if attempted {
                tokio::time::sleep(Duration::from_secs(5)).await;
                page_source = driver.source().await?;
            }
            if detection::is_blocked(&page_source) {
                return Ok(AttemptOutcome::Blocked);
            }
        }

        browser::wait_for_main_content(driver, CONTENT_WAIT).await;
        tokio::time::sleep(self.random_delay(2_000, 4_000)).await;

        let page_source = driver.source().await?;
        Ok(AttemptOutcome::Listings(
            self.parse_listings(base_url, &page_source, request),
        ))
    }

    /// Try each URL-encoding variant until one lands on a search page. If
    /// every variant redirects away (or fails to load) the attempt proceeds
    /// with whatever the browser is showing.
    async fn navigate_to_search(&self, driver: &WebDriver, keyword: &str) -> WebDriverResult<()> {
        let variants = search_url_variants(&self.settings.base_url, keyword);

        for (i, search_url) in variants.iter().enumerate() {
            log::info!("Trying search URL {}: {}", i + 1, search_url);
            if let Err(e) = driver.goto(search_url).await {
                log::warn!("Navigation to variant {} failed: {}", i + 1, e);
                continue;
            }

            // Give redirects a moment to land.
            tokio::time::sleep(Duration::from_secs(2)).await;

            let current = driver.current_url().await?;
            let current = current.as_str();
            if current.contains("search")
                || current.contains("results")
                || current.contains("auction")
            {
                log::info!("Landed on search page with URL variant {}", i + 1);
                return Ok(());
            }
            log::info!("URL variant {} redirected to {}", i + 1, current);
        }

        log::warn!("All URL variants redirected away, proceeding anyway");
        Ok(())
    }

    async fn attempt_with_http(&self, request: &SearchRequest, base_url: &Url) -> AttemptOutcome {
        let Some(client) = http_session::build_http_session(&self.settings) else {
            return AttemptOutcome::Failed("HTTP backend unavailable".to_string());
        };

        let mut last_error = None;
        for search_url in search_url_variants(&self.settings.base_url, &request.keyword) {
            log::info!("Trying HTTP fallback with URL: {}", search_url);

            let delay = self.random_delay(
                self.settings.min_request_delay_ms,
                self.settings.max_request_delay_ms,
            );
            tokio::time::sleep(delay).await;

            let response = client
                .get(&search_url)
                .headers(http_session::browser_like_headers(&self.settings))
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    log::warn!("HTTP fallback request failed: {}", e);
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            if !response.status().is_success() {
                log::warn!(
                    "HTTP fallback got status {} from {}",
                    response.status(),
                    search_url
                );
                last_error = Some(format!("status {}", response.status()));
                continue;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("Failed to read HTTP fallback body: {}", e);
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            if detection::is_blocked(&body) {
                return AttemptOutcome::Blocked;
            }

            // Any genuine extraction ends the variant loop, even a single
            // record; the retry loop applies its own success check.
            let records = self.parse_listings(base_url, &body, request);
            if !records[0].is_no_results() {
                log::info!("Found {} listings with URL: {}", records.len(), search_url);
                return AttemptOutcome::Listings(records);
            }
            log::info!("No results with URL: {}, trying next", search_url);
        }

        AttemptOutcome::Failed(last_error.unwrap_or_else(|| {
            format!("all search URL variants failed for '{}'", request.keyword)
        }))
    }

    fn parse_listings(
        &self,
        base_url: &Url,
        page_source: &str,
        request: &SearchRequest,
    ) -> Vec<ListingRecord> {
        let document = Html::parse_document(page_source);
        extractor::extract_listings(&document, &request.keyword, request.max_results, base_url)
    }

    fn random_delay(&self, min_ms: u64, max_ms: u64) -> Duration {
        let ms = if min_ms >= max_ms {
            min_ms
        } else {
            rand::thread_rng().gen_range(min_ms..=max_ms)
        };
        Duration::from_millis(ms)
    }
}

/// The search endpoint accepts several keyword encodings; some of them
/// trigger a redirect to the homepage depending on site version. Tried in
/// order, duplicates removed for single-word keywords.
pub fn search_url_variants(base_url: &str, keyword: &str) -> Vec<String> {
    let base = base_url.trim_end_matches('/');

    [
        keyword.replace(' ', "+"),
        keyword.replace(' ', "%20"),
        keyword.to_string(),
        keyword.replace(' ', "-"),
    ]
    .into_iter()
    .unique()
    .map(|encoded| format!("{}/search?keywords={}&sort=Closing", base, encoded))
    .collect()
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::{search_url_variants, AuctionScraper};
    use crate::configuration::ScraperSettings;
    use crate::domain::SearchRequest;

    /// Minimal HTTP server answering every request with the same page.
    /// Returns the bound address and a counter of requests served.
    async fn serve_page(body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));

        let counter = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (addr, requests)
    }

    fn unreachable_settings() -> ScraperSettings {
        // Port 9 is the discard service; nothing listens there in CI.
        ScraperSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            webdriver_url: "http://127.0.0.1:9".to_string(),
            max_results: 10,
            max_retries: 1,
            user_agent: None,
            allow_manual_captcha: false,
            min_request_delay_ms: 0,
            max_request_delay_ms: 0,
            min_retry_backoff_ms: 0,
            max_retry_backoff_ms: 0,
        }
    }

    #[tokio::test]
    async fn all_backends_failing_yields_single_failure_record() {
        let scraper = AuctionScraper::new(unreachable_settings());
        let request = SearchRequest {
            keyword: "x".to_string(),
            max_results: 10,
            max_retries: 1,
        };

        let records = scraper.scrape(&request).await;

        assert_eq!(records.len(), 1);
        assert!(records[0]
            .description
            .contains("All scraping methods failed for 'x'"));
        assert_eq!(records[0].price_text, "N/A");
        assert_eq!(records[0].end_date_text, "N/A");
        assert_eq!(records[0].image_url, "");
    }

    #[tokio::test]
    async fn blocked_page_is_never_returned_as_data() {
        let (addr, _) = serve_page(
            "<html><body>Access Denied\
             <div class='product'><a href='/item/1'>Decoy Listing</a>\
             <span class='price'>$10.00</span></div></body></html>",
        )
        .await;

        let mut settings = unreachable_settings();
        settings.base_url = format!("http://{}", addr);

        let scraper = AuctionScraper::new(settings);
        let request = SearchRequest {
            keyword: "lamp".to_string(),
            max_results: 10,
            max_retries: 1,
        };

        let records = scraper.scrape(&request).await;

        assert_eq!(records.len(), 1);
        assert!(records[0]
            .description
            .contains("All scraping methods failed"));
        assert!(!records
            .iter()
            .any(|r| r.description.contains("Decoy Listing")));
    }

    #[tokio::test]
    async fn single_listing_page_stops_the_variant_loop() {
        let (addr, requests) = serve_page(
            "<html><body>\
             <div class='product'><a href='/item/7'>Lone Lamp</a>\
             <span class='price'>$25.00</span></div></body></html>",
        )
        .await;

        let mut settings = unreachable_settings();
        settings.base_url = format!("http://{}", addr);

        let scraper = AuctionScraper::new(settings);
        let request = SearchRequest {
            // Two words, so four URL variants exist per round.
            keyword: "vintage lamp".to_string(),
            max_results: 10,
            max_retries: 1,
        };

        let records = scraper.scrape(&request).await;

        // One genuine record is still below the success threshold.
        assert_eq!(records.len(), 1);
        assert!(records[0]
            .description
            .contains("All scraping methods failed"));
        // The first variant already yielded an extraction, so the other
        // three were never requested.
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_base_url_yields_error_record() {
        let mut settings = unreachable_settings();
        settings.base_url = "not a url".to_string();

        let scraper = AuctionScraper::new(settings);
        let request = SearchRequest {
            keyword: "x".to_string(),
            max_results: 10,
            max_retries: 3,
        };

        let records = scraper.scrape(&request).await;

        assert_eq!(records.len(), 1);
        assert!(records[0]
            .description
            .starts_with("Error scraping results for 'x':"));
        assert_eq!(records[0].price_text, "N/A");
    }

    #[test]
    fn url_variants_cover_all_encodings() {
        let variants = search_url_variants("https://shopgoodwill.com/", "vintage watch");

        assert_eq!(
            variants,
            vec![
                "https://shopgoodwill.com/search?keywords=vintage+watch&sort=Closing",
                "https://shopgoodwill.com/search?keywords=vintage%20watch&sort=Closing",
                "https://shopgoodwill.com/search?keywords=vintage watch&sort=Closing",
                "https://shopgoodwill.com/search?keywords=vintage-watch&sort=Closing",
            ]
        );
    }

    #[test]
    fn single_word_keyword_dedupes_variants() {
        let variants = search_url_variants("https://shopgoodwill.com", "lamp");
        assert_eq!(
            variants,
            vec!["https://shopgoodwill.com/search?keywords=lamp&sort=Closing"]
        );
    }
}
