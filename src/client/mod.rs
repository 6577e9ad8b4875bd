// This file is part of the terraform-provider-ibm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ETAG};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::session::iam::Authenticator;

mod error;

pub use error::{extract_message, ApiError, OrNotFound};

pub const MERGE_PATCH: &str = "application/merge-patch+json";

/// How requests authenticate against a service
#[derive(Clone)]
pub enum Auth {
    None,
    Bearer(Arc<Authenticator>),
    Basic { username: String, api_key: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(_) => f.write_str("Bearer"),
            Auth::Basic { username, .. } => write!(f, "Basic({username})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Exponential backoff with up to 10% of jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self
            .delay
            .saturating_mul(1 << attempt.min(16))
            .min(self.max_delay);
        let spread = base.as_millis() as u64 / 10;
        let jitter = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=spread)
        };
        base + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

/// REST client bound to the base URL of one service
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Auth,
    retry: RetryPolicy,
    default_query: Vec<(String, String)>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        auth: Auth,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url).map_err(|source| ApiError::Url {
            url: base_url.to_owned(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::Url {
                url: base_url.to_owned(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }
        Ok(Self {
            http,
            base_url: parsed,
            auth,
            retry,
            default_query: Vec::new(),
        })
    }

    /// Add a query parameter sent with every request
    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.default_query.push((key.to_owned(), value.into()));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url<S: AsRef<str>>(&self, segments: &[S]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment.as_ref());
            }
        }
        url
    }

    pub fn request<S: AsRef<str>>(&self, method: Method, segments: &[S]) -> ApiRequest<'_> {
        ApiRequest {
            client: self,
            method,
            url: self.url(segments),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::Empty,
            basic: None,
            error: None,
        }
    }

    pub fn get<S: AsRef<str>>(&self, segments: &[S]) -> ApiRequest<'_> {
        self.request(Method::GET, segments)
    }

    pub fn post<S: AsRef<str>>(&self, segments: &[S]) -> ApiRequest<'_> {
        self.request(Method::POST, segments)
    }

    pub fn put<S: AsRef<str>>(&self, segments: &[S]) -> ApiRequest<'_> {
        self.request(Method::PUT, segments)
    }

    pub fn patch<S: AsRef<str>>(&self, segments: &[S]) -> ApiRequest<'_> {
        self.request(Method::PATCH, segments)
    }

    pub fn delete<S: AsRef<str>>(&self, segments: &[S]) -> ApiRequest<'_> {
        self.request(Method::DELETE, segments)
    }
}

enum Body {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

pub struct ApiRequest<'c> {
    client: &'c ApiClient,
    method: Method,
    url: Url,
    query: Vec<(String, String)>,
    headers: Vec<(&'static str, String)>,
    body: Body,
    basic: Option<(String, String)>,
    error: Option<ApiError>,
}

impl<'c> ApiRequest<'c> {
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = Body::Json(value),
            Err(err) => self.error = Some(ApiError::Encode(err)),
        }
        self
    }

    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.body = Body::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic = Some((username.to_owned(), password.to_owned()));
        self
    }

    /// Send the request, retrying transient failures
    pub async fn send(mut self) -> Result<ApiResponse, ApiError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let mut url = self.url.clone();
        if !self.client.default_query.is_empty() || !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.client.default_query.iter().chain(self.query.iter()));
        }

        let retry = self.client.retry;
        let mut attempt = 0;
        loop {
            match self.attempt(&url).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < retry.max_retries && err.is_retryable() => {
                    let wait = retry.backoff(attempt);
                    tracing::debug!(
                        method = %self.method,
                        %url,
                        attempt,
                        ?wait,
                        "retrying after error: {err}"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        self.send().await?.json()
    }

    async fn attempt(&self, url: &Url) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .client
            .http
            .request(self.method.clone(), url.clone())
            .header(ACCEPT, "application/json");

        for (name, value) in &self.headers {
            builder = builder.header(*name, value);
        }

        builder = match &self.client.auth {
            Auth::None => builder,
            Auth::Bearer(authenticator) => {
                let bearer = authenticator
                    .bearer()
                    .await
                    .map_err(|err| ApiError::Token(Box::new(err)))?;
                builder.header(AUTHORIZATION, bearer)
            }
            Auth::Basic { username, api_key } => builder.basic_auth(username, Some(api_key)),
        };
        if let Some((username, password)) = &self.basic {
            builder = builder.basic_auth(username, Some(password));
        }

        builder = match &self.body {
            Body::Empty => builder,
            Body::Json(value) => {
                if !self.headers.iter().any(|(name, _)| *name == CONTENT_TYPE.as_str()) {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                }
                builder.body(value.to_string())
            }
            Body::Form(pairs) => builder.form(pairs),
        };

        tracing::trace!(method = %self.method, %url, "sending request");

        let response = builder.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        if status.is_success() {
            Ok(ApiResponse {
                url: url.to_string(),
                etag,
                body,
            })
        } else {
            Err(ApiError::Status {
                method: self.method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                message: extract_message(&body),
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub url: String,
    pub etag: Option<String>,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            &self.body
        };
        serde_json::from_str(body).map_err(|source| ApiError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Pagination token carried by the `start` query parameter of a `next.href` link
pub fn start_token(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let token = url
        .query_pairs()
        .find(|(key, _)| key == "start")
        .map(|(_, value)| value.into_owned());
    token
}
