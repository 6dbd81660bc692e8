//! HTTP transport abstraction.
//!
//! Resource managers talk to the server through the [`Transport`] trait so
//! they can be tested without a network. [`http::HttpTransport`] is the real
//! implementation.
//!
//! # Testing
//!
//! Use [`MockTransport`] to script responses:
//!
//! ```
//! use manage::transport::{Method, MockTransport, Request, Transport};
//!
//! let mock = MockTransport::new();
//! mock.respond(Method::Get, "/admin/v1/timestamp", 200, "2024-01-15T10:00:00Z");
//!
//! let response = mock.send(&Request::get("/admin/v1/timestamp")).unwrap();
//! assert_eq!(response.body, "2024-01-15T10:00:00Z");
//! ```

pub mod http;

use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One request, with a path relative to the transport's base URL
///
/// Query parameters are kept unencoded; the transport encodes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<String>,
    pub content_type: Option<&'static str>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            ..Self::get(path)
        }
    }

    pub fn post(path: impl Into<String>, body: impl Into<String>, content_type: &'static str) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body.into()),
            content_type: Some(content_type),
        }
    }

    pub fn put(path: impl Into<String>, body: impl Into<String>, content_type: &'static str) -> Self {
        Self {
            method: Method::Put,
            ..Self::post(path, body, content_type)
        }
    }

    /// Add a query parameter
    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// Add a query parameter if there is one
    pub fn with_optional_query(self, param: Option<(&'static str, String)>) -> Self {
        match param {
            Some((key, value)) => self.with_query(key, value),
            None => self,
        }
    }

    /// Path plus encoded query string, as it appears on the wire
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

/// Status and body of a response
///
/// Non-2xx statuses are returned as responses, not errors; callers decide
/// what a 404 means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Turn a non-2xx response into an error for `request`
    pub fn error_for_status(self, request: &Request) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::status(
                request.method,
                request.target(),
                self.status,
                self.body,
            ))
        }
    }
}

/// Sends requests to one server
///
/// Implementations must be usable from many threads at once.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<Response>;
}

/// Transport that replays scripted responses.
///
/// Responses are queued per (method, target), where the target includes the
/// encoded query string; the last one for a key repeats.
/// Unscripted requests get a 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<(Method, String), VecDeque<Result<Response>>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    /// Create a new empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a method and path.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(method, path, Ok(Response::new(status, body)));
    }

    /// Queue a transport failure for a method and path.
    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.push(
            method,
            path,
            Err(Error::HttpError {
                message: message.to_string(),
            }),
        );
    }

    fn push(&self, method: Method, path: &str, response: Result<Response>) {
        let mut responses = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        responses
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

fn replay(response: &Result<Response>) -> Result<Response> {
    match response {
        Ok(response) => Ok(response.clone()),
        Err(e) => Err(Error::HttpError {
            message: e.to_string(),
        }),
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        let mut responses = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(queue) = responses.get_mut(&(request.method, request.target())) else {
            return Ok(Response::new(404, ""));
        };
        if queue.len() > 1 {
            queue.pop_front().map_or_else(|| Ok(Response::new(404, "")), |r| r)
        } else {
            queue.front().map_or_else(|| Ok(Response::new(404, "")), replay)
        }
    }
}
