//! HTTP access to the code-review APIs.
//!
//! The resolver only ever issues `GET` requests and reads the body as text,
//! so the seam is a single method. `ReqwestClient` is the blocking
//! implementation used by the binary.

use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};

/// Status and body of a finished request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP GET requests - allows mocking in tests
pub trait HttpClient {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse>;
}

/// Blocking `reqwest` client with a fixed timeout and user agent.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let user_agent = format!("depends-on/{}", env!("CARGO_PKG_VERSION"));
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse> {
        debug!("GET {}", url);
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = request.send().map_err(|e| Error::RemoteApi {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success_range() {
        let ok = HttpResponse {
            status: 204,
            body: String::new(),
        };
        let redirect = HttpResponse {
            status: 302,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::new().is_ok());
    }
}
