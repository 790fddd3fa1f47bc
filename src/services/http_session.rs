use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::configuration::ScraperSettings;

/// Fixed pool of realistic desktop user agents for the HTTP backend.
pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::thread_rng().gen_range(0..USER_AGENTS.len())]
}

/// Build the HTTP-client backend: cookie jar pre-seeded with synthetic
/// session cookies and a 30 second timeout. Returns `None` instead of
/// raising when the client cannot be constructed.
pub fn build_http_session(settings: &ScraperSettings) -> Option<reqwest::Client> {
    let base_url = match Url::parse(&settings.base_url) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("HTTP backend unavailable, invalid base url: {}", e);
            return None;
        }
    };

    let jar = Arc::new(Jar::default());
    let session_id: u32 = rand::thread_rng().gen_range(1_000_000..10_000_000);
    jar.add_cookie_str(&format!("session_id=session_{}", session_id), &base_url);
    jar.add_cookie_str("user_pref=en_US", &base_url);

    match reqwest::Client::builder()
        .cookie_provider(jar)
        .timeout(Duration::from_secs(30))
        .build()
    {
        Ok(client) => Some(client),
        Err(e) => {
            log::warn!("HTTP backend unavailable: {}", e);
            None
        }
    }
}

/// Header set mimicking a real browser navigation, with a fresh random user
/// agent per call. A configured custom user agent wins over the pool.
pub fn browser_like_headers(settings: &ScraperSettings) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let user_agent = settings
        .user_agent
        .as_deref()
        .unwrap_or_else(|| random_user_agent());
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }

    headers.insert(
        "Accept",
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("Accept-Encoding", HeaderValue::from_static("gzip, deflate"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Cache-Control", HeaderValue::from_static("max-age=0"));
    headers.insert("DNT", HeaderValue::from_static("1"));

    headers
}

#[cfg(test)]
mod tests {
    use super::{browser_like_headers, random_user_agent, USER_AGENTS};
    use crate::configuration::ScraperSettings;

    fn settings(user_agent: Option<String>) -> ScraperSettings {
        ScraperSettings {
            base_url: "https://shopgoodwill.com".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            max_results: 10,
            max_retries: 3,
            user_agent,
            allow_manual_captcha: false,
            min_request_delay_ms: 0,
            max_request_delay_ms: 0,
            min_retry_backoff_ms: 0,
            max_retry_backoff_ms: 0,
        }
    }

    #[test]
    fn random_user_agent_comes_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn headers_look_like_a_browser() {
        let headers = browser_like_headers(&settings(None));

        assert!(headers.contains_key("User-Agent"));
        assert_eq!(headers["DNT"], "1");
        assert_eq!(headers["Sec-Fetch-Mode"], "navigate");
        assert_eq!(headers["Accept-Language"], "en-US,en;q=0.5");
    }

    #[test]
    fn custom_user_agent_overrides_pool() {
        let headers = browser_like_headers(&settings(Some("gavel-test/1.0".to_string())));
        assert_eq!(headers["User-Agent"], "gavel-test/1.0");
    }
}
