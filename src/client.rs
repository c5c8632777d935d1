use std::time::Duration;

use crate::propagation;

/// Outbound http capability: issue a GET, obtain the response body as text,
/// propagate transport errors untouched.
///
/// Every request carries the current trace context in its headers, so the
/// downstream service joins the caller's trace.
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Builds a client whose requests are cut off after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    /// GETs `url` and returns the body text. Non-2xx responses and transport
    /// failures surface as errors, never as a partial body.
    pub async fn get_text(&self, url: &str) -> Result<String, reqwest::Error> {
        let mut request = self.inner.get(url).build()?;
        propagation::inject_context(request.headers_mut());

        let response = self.inner.execute(request).await?;
        response.error_for_status()?.text().await
    }
}
