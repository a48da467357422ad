use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;

/// Default HTTP request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_USER_AGENT: &str = concat!("tagwatch/", env!("CARGO_PKG_VERSION"));

/// Source of a tracked page's current HTML
pub trait PageFetcher {
    fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Plain HTTP GET with configured headers
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    headers: HashMap<String, String>,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(headers: HashMap<String, String>, user_agent: Option<String>) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
            .build()
            .into();
        Self {
            agent,
            headers,
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.headers.clone(), config.user_agent.clone())
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_html(&self, url: &str) -> Result<String> {
        let mut request = self.agent.get(url);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        request = request
            .header("User-Agent", &self.user_agent)
            .header("Cache-Control", "no-store");

        let response = request.call()?;
        let html = response.into_body().read_to_string()?;
        Ok(html)
    }
}
