use std::time::Duration;

use fake_user_agent::get_chrome_rua;
use rand::Rng;
use thirtyfour::error::WebDriverResult;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};

use crate::configuration::ScraperSettings;

/// Which flavor of browser session to build. Undetected additionally patches
/// navigator properties after startup; Stealth is the plain second-tier
/// fallback with the same launch flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Undetected,
    Stealth,
}

const STEALTH_ARGS: [&str; 10] = [
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-web-security",
    "--disable-features=VizDisplayCompositor",
    "--disable-extensions",
    "--disable-plugins",
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--start-maximized",
];

/// Realistic desktop window sizes to pick from.
const WINDOW_SIZES: [(u32, u32); 5] = [
    (1920, 1080),
    (1680, 1050),
    (1536, 864),
    (1440, 900),
    (1366, 768),
];

/// Scripts run after startup on the undetected flavor to hide the
/// automation fingerprint from navigator probes.
const NAVIGATOR_PATCHES: [&str; 3] = [
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})",
    "Object.defineProperty(navigator, 'plugins', {get: () => [1, 2, 3, 4, 5]})",
    "Object.defineProperty(navigator, 'languages', {get: () => ['en-US', 'en']})",
];

/// Build a browser session, or `None` when the driver is unreachable or
/// refuses the configuration. Construction failures never escape: the
/// orchestrator interprets `None` as "skip this backend".
pub async fn build_browser_session(
    kind: BrowserKind,
    settings: &ScraperSettings,
) -> Option<WebDriver> {
    match try_build(kind, settings).await {
        Ok(driver) => Some(driver),
        Err(e) => {
            log::warn!("{:?} browser backend unavailable: {}", kind, e);
            None
        }
    }
}

async fn try_build(kind: BrowserKind, settings: &ScraperSettings) -> WebDriverResult<WebDriver> {
    let mut caps = DesiredCapabilities::chrome();

    for arg in STEALTH_ARGS {
        caps.add_arg(arg)?;
    }

    let user_agent = settings
        .user_agent
        .clone()
        .unwrap_or_else(|| get_chrome_rua().to_string());
    caps.add_arg(&format!("--user-agent={}", user_agent))?;

    let (width, height) = {
        let mut rng = rand::thread_rng();
        WINDOW_SIZES[rng.gen_range(0..WINDOW_SIZES.len())]
    };
    caps.add_arg(&format!("--window-size={},{}", width, height))?;

    caps.add_experimental_option("excludeSwitches", serde_json::json!(["enable-automation"]))?;
    caps.add_experimental_option("useAutomationExtension", serde_json::json!(false))?;

    let driver = WebDriver::new(&settings.webdriver_url, caps).await?;
    driver.maximize_window().await?;

    if kind == BrowserKind::Undetected {
        for patch in NAVIGATOR_PATCHES {
            driver.execute(patch, Vec::new()).await?;
        }
    }

    Ok(driver)
}

/// Staged scroll positions with randomized dwell times, plus a probabilistic
/// reading pause. Failures here are logged and swallowed; behavior
/// simulation must never abort an attempt.
pub async fn add_human_behavior(driver: &WebDriver) {
    if let Err(e) = simulate_reading(driver).await {
        log::warn!("Error adding human behavior: {}", e);
    }
}

async fn simulate_reading(driver: &WebDriver) -> WebDriverResult<()> {
    let page_height = driver
        .execute("return document.body.scrollHeight", Vec::new())
        .await?
        .json()
        .as_u64()
        .unwrap_or(0);

    for position in [100u64, 300, 500] {
        if position >= page_height {
            break;
        }
        driver
            .execute(&format!("window.scrollTo(0, {});", position), Vec::new())
            .await?;
        let dwell = rand::thread_rng().gen_range(1.0..2.5);
        tokio::time::sleep(Duration::from_secs_f64(dwell)).await;
    }

    if rand::thread_rng().gen_bool(0.7) {
        let pause = rand::thread_rng().gen_range(2.0..4.0);
        tokio::time::sleep(Duration::from_secs_f64(pause)).await;
    }

    Ok(())
}

/// Bounded wait for the main content area to render. Proceeds on timeout
/// rather than failing; a partially rendered page is still worth parsing.
pub async fn wait_for_main_content(driver: &WebDriver, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let selector = By::Css("main, .container, .content, [class*='main']");
        if driver.find(selector).await.is_ok() {
            log::info!("Found main content area");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            log::warn!("Main content area not found, proceeding anyway");
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
