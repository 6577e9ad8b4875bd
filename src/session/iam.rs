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

use futures::future::BoxFuture;
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::client::{ApiClient, ApiError};

use super::claims;

pub const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
pub const REFRESH_GRANT_TYPE: &str = "refresh_token";

/// Tokens are renewed when they expire in less than this many seconds
const EXPIRY_WINDOW: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expiration: Option<i64>,
}

#[derive(Clone)]
struct Token {
    access_token: String,
    refresh_token: Option<String>,
    expiration: i64,
}

impl Token {
    fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let expiration = response
            .expiration
            .or_else(|| response.expires_in.map(|expires_in| now + expires_in))
            .or_else(|| claims::expiration(&response.access_token))
            .unwrap_or(now);
        Self {
            refresh_token: response.refresh_token.or(previous_refresh),
            access_token: response.access_token,
            expiration,
        }
    }

    fn is_fresh(&self) -> bool {
        self.expiration - OffsetDateTime::now_utc().unix_timestamp() > EXPIRY_WINDOW
    }
}

/// IAM token provider shared by every cloud service client
pub struct Authenticator {
    identity: ApiClient,
    api_key: Option<String>,
    token: RwLock<Option<Token>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("identity", self.identity.base_url())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Authenticator exchanging an API key at `POST {iam}/identity/token`
    pub fn with_api_key(identity: ApiClient, api_key: String) -> Self {
        Self {
            identity,
            api_key: Some(api_key),
            token: RwLock::new(None),
        }
    }

    /// Authenticator starting from an existing token pair
    pub fn with_tokens(identity: ApiClient, access_token: String, refresh_token: String) -> Self {
        let access_token = access_token
            .strip_prefix("Bearer ")
            .map(str::to_owned)
            .unwrap_or(access_token);
        let expiration = claims::expiration(&access_token).unwrap_or_default();
        Self {
            identity,
            api_key: None,
            token: RwLock::new(Some(Token {
                access_token,
                refresh_token: Some(refresh_token),
                expiration,
            })),
        }
    }

    /// Fetch a new token, with the API key when there is one, otherwise with the refresh token
    pub async fn authenticate(&self) -> Result<(), ApiError> {
        let mut token = self.token.write().await;
        let refresh_token = token.as_ref().and_then(|token| token.refresh_token.clone());
        *token = Some(self.request_token(refresh_token).await?);
        Ok(())
    }

    /// Exchange the refresh token for a new token pair
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let mut token = self.token.write().await;
        let refresh_token = token
            .as_ref()
            .and_then(|token| token.refresh_token.clone())
            .ok_or_else(|| ApiError::Authentication("no IAM refresh token available".into()))?;
        let response = self.grant_refresh(&refresh_token).await?;
        *token = Some(Token::from_response(response, Some(refresh_token)));
        Ok(())
    }

    /// `Authorization` header value, renewing the token when it is about to expire
    pub fn bearer(&self) -> BoxFuture<'_, Result<String, ApiError>> {
        Box::pin(async move {
            if let Some(token) = self.token.read().await.as_ref() {
                if token.is_fresh() {
                    return Ok(format!("Bearer {}", token.access_token));
                }
            }

            let mut token = self.token.write().await;
            match token.as_ref() {
                Some(current) if current.is_fresh() => {
                    Ok(format!("Bearer {}", current.access_token))
                }
                current => {
                    tracing::debug!("renewing IAM token");
                    let refresh_token = current.and_then(|token| token.refresh_token.clone());
                    let renewed = self.request_token(refresh_token).await?;
                    let bearer = format!("Bearer {}", renewed.access_token);
                    *token = Some(renewed);
                    Ok(bearer)
                }
            }
        })
    }

    pub async fn access_token(&self) -> Option<String> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|token| token.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.token
            .read()
            .await
            .as_ref()
            .and_then(|token| token.refresh_token.clone())
    }

    async fn request_token(&self, refresh_token: Option<String>) -> Result<Token, ApiError> {
        let response = match (&self.api_key, &refresh_token) {
            (Some(api_key), _) => self.grant_api_key(api_key).await?,
            (None, Some(refresh_token)) => self.grant_refresh(refresh_token).await?,
            (None, None) => {
                return Err(ApiError::Authentication(
                    "neither an API key nor a refresh token is available".into(),
                ))
            }
        };
        Ok(Token::from_response(response, refresh_token))
    }

    async fn grant_api_key(&self, api_key: &str) -> Result<TokenResponse, ApiError> {
        self.identity
            .post(&["identity", "token"])
            .form(&[
                ("grant_type", APIKEY_GRANT_TYPE),
                ("apikey", api_key),
                ("response_type", "cloud_iam"),
            ])
            .send_json()
            .await
    }

    async fn grant_refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        self.identity
            .post(&["identity", "token"])
            .form(&[
                ("grant_type", REFRESH_GRANT_TYPE),
                ("refresh_token", refresh_token),
            ])
            .basic_auth("bx", "bx")
            .send_json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::client::{Auth, RetryPolicy};
    use crate::test_utils::{http, jwt, MockResponse, MockServer};

    fn identity(server: &MockServer, retries: u32) -> ApiClient {
        ApiClient::new(
            http(),
            &server.url(),
            Auth::None,
            RetryPolicy::new(retries, Duration::from_millis(1)),
        )
        .unwrap()
    }

    fn token_response(access_token: &str) -> MockResponse {
        let expiration = OffsetDateTime::now_utc().unix_timestamp() + 3600;
        MockResponse::json(
            200,
            json!({
                "access_token": access_token,
                "refresh_token": "refresh-2",
                "token_type": "Bearer",
                "expires_in": 3600,
                "expiration": expiration,
            }),
        )
    }

    #[tokio::test]
    async fn api_key_exchange() {
        let server = MockServer::builder()
            .on("POST", "/identity/token", token_response("access-1"))
            .start()
            .await;
        let auth = Authenticator::with_api_key(identity(&server, 0), "my-key".into());

        auth.authenticate().await.unwrap();
        assert_eq!(auth.access_token().await.as_deref(), Some("access-1"));
        assert_eq!(auth.refresh_token().await.as_deref(), Some("refresh-2"));
        assert_eq!(auth.bearer().await.unwrap(), "Bearer access-1");

        // A fresh token is reused
        auth.bearer().await.unwrap();
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].body,
            "grant_type=urn%3Aibm%3Aparams%3Aoauth%3Agrant-type%3Aapikey&apikey=my-key&response_type=cloud_iam"
        );
    }

    #[tokio::test]
    async fn api_key_exchange_retries_transient_failures() {
        let server = MockServer::builder()
            .route(
                "POST",
                "/identity/token",
                [
                    MockResponse::json(503, json!({"errorMessage": "busy"})),
                    token_response("access-1"),
                ],
            )
            .start()
            .await;
        let auth = Authenticator::with_api_key(identity(&server, 2), "my-key".into());
        auth.authenticate().await.unwrap();
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn invalid_api_key_is_reported() {
        let server = MockServer::builder()
            .on(
                "POST",
                "/identity/token",
                MockResponse::json(
                    400,
                    json!({"errorCode": "BXNIM0415E", "errorMessage": "Provided API key could not be found"}),
                ),
            )
            .start()
            .await;
        let auth = Authenticator::with_api_key(identity(&server, 3), "bad".into());
        let err = auth.authenticate().await.unwrap_err();
        assert!(err.to_string().contains("Provided API key could not be found"));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn refresh_uses_basic_auth() {
        let server = MockServer::builder()
            .on("POST", "/identity/token", token_response("access-2"))
            .start()
            .await;
        let auth = Authenticator::with_tokens(
            identity(&server, 0),
            "Bearer access-1".into(),
            "refresh-1".into(),
        );
        assert_eq!(auth.access_token().await.as_deref(), Some("access-1"));

        auth.refresh().await.unwrap();
        assert_eq!(auth.access_token().await.as_deref(), Some("access-2"));

        let requests = server.requests();
        assert_eq!(requests[0].header("authorization"), Some("Basic Yng6Yng="));
        assert_eq!(
            requests[0].body,
            "grant_type=refresh_token&refresh_token=refresh-1"
        );
    }

    #[tokio::test]
    async fn expired_tokens_are_renewed() {
        let server = MockServer::builder()
            .on("POST", "/identity/token", token_response("access-2"))
            .start()
            .await;
        let expired = jwt(json!({"iam_id": "IBMid-1", "exp": 1000}));
        let auth = Authenticator::with_tokens(identity(&server, 0), expired, "refresh-1".into());

        assert_eq!(auth.bearer().await.unwrap(), "Bearer access-2");
        assert_eq!(server.requests().len(), 1);
    }
}
