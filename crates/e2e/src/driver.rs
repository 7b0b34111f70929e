//! Browser sessions over the W3C WebDriver protocol
//!
//! Sessions are opened against a Selenium-compatible endpoint (local
//! chromedriver/geckodriver/safaridriver, a Selenium grid, or the remote test
//! grid used on CD). Only the handful of commands the UI tests need are
//! implemented.

use base64::Engine;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tradecheck_common::{Platform, RunOptions};

use crate::error::{E2eError, E2eResult};

/// W3C element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Device emulated for the `web-app` platform
pub const WEB_APP_DEVICE: &str = "iPhone 12 Pro";

/// Anything that can produce a PNG of what the user sees
pub trait Screenshotter {
    fn name(&self) -> &str;
    fn screenshot(&self) -> E2eResult<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
    Safari,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.to_lowercase().as_str() {
            "chrome" => Ok(Browser::Chrome),
            "firefox" => Ok(Browser::Firefox),
            "safari" => Ok(Browser::Safari),
            _ => Err(E2eError::UnsupportedBrowser(s.to_string())),
        }
    }
}

/// How to locate an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    fn strategy(&self) -> (&'static str, &str) {
        match self {
            Locator::Css(s) => ("css selector", s.as_str()),
            Locator::XPath(s) => ("xpath", s.as_str()),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (using, value) = self.strategy();
        write!(f, "{using}={value}")
    }
}

/// Environment-provided endpoints
#[derive(Debug, Clone, Default)]
pub struct DriverEnv {
    pub webdriver_url: Option<String>,
    pub testgrid_url: Option<String>,
    pub proxy_server: Option<String>,
}

impl DriverEnv {
    pub fn from_env() -> Self {
        Self {
            webdriver_url: std::env::var("WEBDRIVER_URL").ok(),
            testgrid_url: std::env::var("TESTGRID_URL").ok(),
            proxy_server: std::env::var("PROXY_SERVER").ok(),
        }
    }

    /// Endpoint to open sessions against
    pub fn endpoint(&self, cd: bool) -> String {
        let url = if cd {
            self.testgrid_url.clone()
        } else {
            self.webdriver_url.clone()
        };
        url.unwrap_or_else(|| "http://127.0.0.1:4444".to_string())
    }
}

/// Build the W3C `capabilities` payload for a new session
pub fn capabilities(browser: Browser, options: &RunOptions, env: &DriverEnv) -> Value {
    let mut always = json!({ "browserName": browser.as_str() });

    match browser {
        Browser::Chrome => {
            let mut args = vec!["--incognito".to_string()];
            if options.headless {
                args.push("--headless".to_string());
            }
            if options.cd {
                if let Some(proxy) = &env.proxy_server {
                    args.push(format!("--proxy-server={proxy}"));
                }
                always["aws:maxDurationSecs"] = json!(2400);
            }

            let mut chrome = json!({
                "args": args,
                "excludeSwitches": ["enable-logging", "enable-automation"],
                "prefs": {
                    "credentials_enable_service": false,
                    "profile.password_manager_enabled": false,
                },
            });
            if options.platform == Platform::WebApp {
                chrome["mobileEmulation"] = json!({ "deviceName": WEB_APP_DEVICE });
            }
            always["goog:chromeOptions"] = chrome;
        }
        Browser::Firefox => {
            let args: Vec<&str> = if options.headless { vec!["-headless"] } else { vec![] };
            always["moz:firefoxOptions"] = json!({ "args": args });
        }
        Browser::Safari => {
            // safaridriver has no headless mode
            if options.headless {
                warn!("Safari does not support headless mode, running headed");
            }
        }
    }

    json!({ "capabilities": { "alwaysMatch": always } })
}

/// One live WebDriver session
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: Mutex<Option<String>>,
    name: String,
}

impl WebDriverSession {
    /// Open a session and maximize its window
    pub fn start(endpoint: &str, browser: Browser, caps: &Value) -> E2eResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        let base_url = endpoint.trim_end_matches('/').to_string();

        info!("Starting {} session at {}", browser.as_str(), base_url);
        let resp = client.post(format!("{base_url}/session")).json(caps).send()?;
        let value = unwrap_response(resp)?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| E2eError::WebDriver {
                error: "session not created".to_string(),
                message: format!("no sessionId in {value}"),
            })?
            .to_string();

        let session = Self {
            client,
            base_url,
            name: format!("{}-{}", browser.as_str(), session_id.chars().take(8).collect::<String>()),
            session_id: Mutex::new(Some(session_id)),
        };
        session.command(reqwest::Method::POST, "/window/maximize", Some(json!({})))?;
        Ok(session)
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    fn command(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> E2eResult<Value> {
        let id = self.session_id().ok_or(E2eError::NoSession)?;
        let url = format!("{}/session/{}{}", self.base_url, id, path);
        debug!("WebDriver {} {}", method, path);

        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        unwrap_response(req.send()?)
    }

    pub fn navigate(&self, url: &str) -> E2eResult<()> {
        self.command(reqwest::Method::POST, "/url", Some(json!({ "url": url })))?;
        Ok(())
    }

    pub fn find(&self, locator: &Locator) -> E2eResult<String> {
        let (using, value) = locator.strategy();
        let found = self.command(
            reqwest::Method::POST,
            "/element",
            Some(json!({ "using": using, "value": value })),
        )?;
        found[ELEMENT_KEY]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| E2eError::WebDriver {
                error: "no such element".to_string(),
                message: locator.to_string(),
            })
    }

    pub fn click(&self, locator: &Locator) -> E2eResult<()> {
        let id = self.find(locator)?;
        self.command(reqwest::Method::POST, &format!("/element/{id}/click"), Some(json!({})))?;
        Ok(())
    }

    pub fn send_keys(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        let id = self.find(locator)?;
        self.command(
            reqwest::Method::POST,
            &format!("/element/{id}/value"),
            Some(json!({ "text": text })),
        )?;
        Ok(())
    }

    pub fn clear(&self, locator: &Locator) -> E2eResult<()> {
        let id = self.find(locator)?;
        self.command(reqwest::Method::POST, &format!("/element/{id}/clear"), Some(json!({})))?;
        Ok(())
    }

    pub fn text(&self, locator: &Locator) -> E2eResult<String> {
        let id = self.find(locator)?;
        let value = self.command(reqwest::Method::GET, &format!("/element/{id}/text"), None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// End the session. Safe to call twice.
    pub fn quit(&self) -> E2eResult<()> {
        if self.session_id().is_none() {
            return Ok(());
        }
        let result = self.command(reqwest::Method::DELETE, "", None);
        *self.session_id.lock() = None;
        info!("Closed session {}", self.name);
        result.map(|_| ())
    }
}

impl Screenshotter for WebDriverSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn screenshot(&self) -> E2eResult<Vec<u8>> {
        let value = self.command(reqwest::Method::GET, "/screenshot", None)?;
        let encoded = value.as_str().unwrap_or_default();
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}

/// Pull `value` out of a WebDriver response, mapping protocol errors.
fn unwrap_response(resp: reqwest::blocking::Response) -> E2eResult<Value> {
    let status = resp.status();
    let body: Value = resp.json()?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }
    Err(E2eError::WebDriver {
        error: value["error"].as_str().unwrap_or("unknown error").to_string(),
        message: value["message"].as_str().unwrap_or_default().to_string(),
    })
}

/// Opens drivers for the configured platform and tracks them for teardown
#[derive(Default)]
pub struct DriverManager {
    drivers: Vec<Arc<WebDriverSession>>,
}

impl DriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a driver for `options.platform`.
    ///
    /// Mobile platforms have no driver yet and yield `None`.
    pub fn get_driver(&mut self, options: &RunOptions, env: &DriverEnv) -> E2eResult<Option<Arc<WebDriverSession>>> {
        match options.platform {
            Platform::Web | Platform::WebApp => {
                let browser: Browser = options.browser.parse()?;
                let caps = capabilities(browser, options, env);
                let driver = Arc::new(WebDriverSession::start(&env.endpoint(options.cd), browser, &caps)?);
                self.drivers.push(Arc::clone(&driver));
                Ok(Some(driver))
            }
            Platform::Ios | Platform::Android => {
                warn!("No driver available for platform {:?}", options.platform);
                Ok(None)
            }
        }
    }

    pub fn drivers(&self) -> &[Arc<WebDriverSession>] {
        &self.drivers
    }

    /// Quit every driver this manager opened
    pub fn quit_all(&mut self) {
        for driver in self.drivers.drain(..) {
            if let Err(e) = driver.quit() {
                warn!("Failed to quit driver {}: {}", driver.name(), e);
            }
        }
    }
}

impl Drop for DriverManager {
    fn drop(&mut self) {
        self.quit_all();
    }
}
