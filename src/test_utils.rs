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

//! Loopback HTTP server answering canned responses, for client and resource tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::endpoints::EndpointsFile;
use crate::config::{Config, Service};
use crate::session::{ClientSession, SessionHandle};

pub(crate) fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("test HTTP client")
}

/// Unsigned JWT carrying `claims`
pub(crate) fn jwt(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// IAM token grant for user `IBMid-1` of account `acct-1`
pub(crate) fn iam_token() -> MockResponse {
    MockResponse::json(
        200,
        json!({
            "access_token": jwt(json!({
                "id": "IBMid-1",
                "iam_id": "IBMid-1",
                "iss": "https://iam.cloud.ibm.com/identity",
                "account": {"bss": "acct-1"},
            })),
            "refresh_token": "refresh",
            "expires_in": 3600,
        }),
    )
}

/// Settings with fast retries, so failing calls end quickly
pub(crate) fn test_config() -> Config {
    Config {
        retry_delay: Duration::from_millis(1),
        max_retries: 1,
        ..Default::default()
    }
}

/// Endpoints file sending every service to the mock, under its usual path prefix
pub(crate) fn mock_endpoints(server: &MockServer) -> EndpointsFile {
    let url = server.url();
    let mut entries = serde_json::Map::new();
    for service in Service::ALL {
        let Some(key) = service.env_key() else {
            continue;
        };
        let endpoint = match service {
            Service::Vpc | Service::PrivateDns | Service::TransitGateway => format!("{url}/v1"),
            Service::GlobalCatalog => format!("{url}/api/v1"),
            _ => url.clone(),
        };
        entries.insert(
            key.to_owned(),
            json!({ "public": { "us-south": endpoint } }),
        );
    }
    EndpointsFile::parse(&serde_json::Value::Object(entries).to_string())
        .expect("endpoints file")
}

/// API key session whose services all answer from the mock
///
/// The mock must grant IAM tokens, see [`MockBuilder::with_iam_token`].
pub(crate) async fn mock_session(server: &MockServer) -> ClientSession {
    let config = Config {
        api_key: Some("key".into()),
        classic_username: Some("user".into()),
        classic_api_key: Some("secret".into()),
        classic_endpoint: format!("{}/rest/v3", server.url()),
        ..test_config()
    };
    ClientSession::with_endpoints(config, Some(mock_endpoints(server)), http(), http())
        .await
        .expect("mock session")
}

/// Configured provider slot, as resources receive it
pub(crate) async fn mock_handle(server: &MockServer) -> SessionHandle {
    let handle = SessionHandle::default();
    handle.install(mock_session(server).await);
    handle
}

#[derive(Debug, Clone)]
pub(crate) struct MockResponse {
    status: u16,
    body: String,
    headers: Vec<(String, String)>,
}

impl MockResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, [(CONTENT_TYPE, "application/json")], self.body).into_response();
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

struct Route {
    method: String,
    path: String,
    responses: VecDeque<MockResponse>,
}

#[derive(Default)]
struct Shared {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Shared {
    /// Next response of the matching route, the last one repeating; 404 without a route
    fn respond(&self, request: &RecordedRequest) -> MockResponse {
        let mut routes = self.routes.lock().expect("routes lock");
        routes
            .iter_mut()
            .find(|route| route.method == request.method && route.path == request.path)
            .and_then(|route| {
                if route.responses.len() > 1 {
                    route.responses.pop_front()
                } else {
                    route.responses.front().cloned()
                }
            })
            .unwrap_or_else(|| MockResponse::json(404, json!({"message": "no mock route"})))
    }
}

async fn answer(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_owned(),
        query: uri.query().unwrap_or_default().to_owned(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    let response = shared.respond(&recorded);
    shared.requests.lock().expect("requests lock").push(recorded);
    response.into_response()
}

#[derive(Default)]
pub(crate) struct MockBuilder {
    routes: Vec<Route>,
}

impl MockBuilder {
    /// Answer `responses` in order, repeating the last one
    pub fn route(
        mut self,
        method: &str,
        path: &str,
        responses: impl IntoIterator<Item = MockResponse>,
    ) -> Self {
        self.routes.push(Route {
            method: method.to_owned(),
            path: path.to_owned(),
            responses: responses.into_iter().collect(),
        });
        self
    }

    pub fn on(self, method: &str, path: &str, response: MockResponse) -> Self {
        self.route(method, path, [response])
    }

    /// Grant IAM tokens, for sessions built by [`mock_session`]
    pub fn with_iam_token(self) -> Self {
        self.on("POST", "/identity/token", iam_token())
    }

    pub async fn start(self) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let shared = Arc::new(Shared {
            routes: Mutex::new(self.routes),
            requests: Mutex::default(),
        });

        let router = Router::new().fallback(answer).with_state(shared.clone());
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!("mock server stopped: {err}");
            }
        });

        MockServer { url, shared, task }
    }
}

pub(crate) struct MockServer {
    url: String,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub fn builder() -> MockBuilder {
        MockBuilder::default()
    }

    pub fn url(&self) -> String {
        self.url.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method && request.path == path)
            .collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
