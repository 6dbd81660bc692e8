//! ureq-backed transport.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::transport::{Method, Request, Response, Transport};
use ureq::{Agent, RequestBuilder};

/// Blocking HTTP transport for one base URL.
///
/// The agent pools connections and is shared by every worker thread.
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
    authorization: String,
}

impl HttpTransport {
    /// Transport for the management API port.
    #[must_use]
    pub fn manage(config: &ClientConfig) -> Self {
        Self::new(config, config.manage_base_url())
    }

    /// Transport for the admin API port.
    #[must_use]
    pub fn admin(config: &ClientConfig) -> Self {
        Self::new(config, config.admin_base_url())
    }

    fn new(config: &ClientConfig, base_url: String) -> Self {
        // Statuses are inspected by the caller, so 4xx/5xx must not be errors
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .build()
            .into();
        Self {
            agent,
            base_url,
            authorization: config.basic_auth(),
        }
    }

    /// Get the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl HttpTransport {
    fn prepare<B>(&self, builder: RequestBuilder<B>, request: &Request) -> RequestBuilder<B> {
        let builder = builder.header("Authorization", &self.authorization);
        request
            .query
            .iter()
            .fold(builder, |builder, (key, value)| builder.query(*key, value))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let url = self.url(&request.path);
        log::debug!("{} {}", request.method, self.url(&request.target()));

        let body = request.body.as_deref().unwrap_or_default();
        let content_type = request.content_type.unwrap_or("application/json");
        let mut response = match request.method {
            Method::Get => self
                .prepare(self.agent.get(&url), request)
                .header("Accept", "application/json")
                .call()?,
            Method::Delete => self.prepare(self.agent.delete(&url), request).call()?,
            Method::Post => self
                .prepare(self.agent.post(&url), request)
                .header("Content-Type", content_type)
                .send(body)?,
            Method::Put => self
                .prepare(self.agent.put(&url), request)
                .header("Content-Type", content_type)
                .send(body)?,
        };

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::trace!("{} {} -> {status}", request.method, url);
        Ok(Response::new(status, body))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
