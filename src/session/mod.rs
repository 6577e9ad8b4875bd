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

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use lazy_static::lazy_static;
use time::OffsetDateTime;

use crate::classic::api::ClassicApi;
use crate::client::{ApiClient, Auth, RetryPolicy};
use crate::config::endpoints::{self, EndpointsFile};
use crate::config::{Config, Service};
use crate::dns::api::DnsApi;
use crate::iam::api::AccessGroupsApi;
use crate::resource_group::api::ResourceManagerApi;
use crate::resource_instance::api::ResourceControllerApi;
use crate::resource_instance::catalog::GlobalCatalogApi;
use crate::tagging::TaggingApi;
use crate::transit_gateway::api::TransitGatewayApi;
use crate::vpc::api::VpcApi;

pub mod claims;
pub mod iam;

pub use claims::UserConfig;
use iam::Authenticator;

lazy_static! {
    /// `version` query parameter of the dated APIs
    static ref API_VERSION: String = OffsetDateTime::now_utc().date().to_string();
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("ibmcloud_api_key or iam_token and iam_refresh_token must be provided. Please see the documentation on how to configure it")]
    EmptyCloudCredentials,
    #[error("iaas_classic_username and iaas_classic_api_key must be provided. Please see the documentation on how to configure them")]
    EmptyClassicCredentials,
    #[error("iam_token and iam_refresh_token must be provided together")]
    IncompleteTokenPair,
    #[error("error occurred while fetching the IAM token: {0}")]
    Authentication(String),
    #[error("error occurred while fetching account user details: {0}")]
    UserDetails(String),
    #[error("error occurred while configuring {service} service with endpoint `{url}`: {reason}")]
    Endpoint {
        service: Service,
        url: String,
        reason: String,
    },
    #[error("unable to load endpoints file `{path}`: {reason}")]
    EndpointsFile { path: String, reason: String },
    #[error("unable to build the HTTP client: {0}")]
    Http(String),
    #[error("the provider has not been configured")]
    NotConfigured,
}

type Factory = fn(&ClientSession, Service) -> Result<ApiClient, SessionError>;

struct Entry {
    factory: Factory,
    client: OnceLock<Result<ApiClient, SessionError>>,
}

/// Lazily built service clients, one entry per service
struct Registry {
    entries: BTreeMap<Service, Entry>,
}

impl Registry {
    fn new() -> Self {
        Self {
            entries: Service::ALL
                .into_iter()
                .map(|service| {
                    (
                        service,
                        Entry {
                            factory: factory_for(service),
                            client: OnceLock::new(),
                        },
                    )
                })
                .collect(),
        }
    }
}

fn factory_for(service: Service) -> Factory {
    match service {
        Service::Vpc => vpc_client,
        Service::TransitGateway => transit_gateway_client,
        Service::ClassicInfrastructure => classic_client,
        _ => iam_client,
    }
}

fn iam_client(session: &ClientSession, service: Service) -> Result<ApiClient, SessionError> {
    let authenticator = session.authenticator.clone()?;
    session.build_client(service, Auth::Bearer(authenticator), &session.http)
}

fn vpc_client(session: &ClientSession, service: Service) -> Result<ApiClient, SessionError> {
    Ok(iam_client(session, service)?
        .with_query("version", API_VERSION.as_str())
        .with_query("generation", session.config.generation.to_string()))
}

fn transit_gateway_client(
    session: &ClientSession,
    service: Service,
) -> Result<ApiClient, SessionError> {
    Ok(iam_client(session, service)?.with_query("version", API_VERSION.as_str()))
}

fn classic_client(session: &ClientSession, service: Service) -> Result<ApiClient, SessionError> {
    let config = &session.config;
    let auth = match (&config.classic_username, &config.classic_api_key) {
        (Some(username), Some(api_key)) => Auth::Basic {
            username: username.clone(),
            api_key: api_key.clone(),
        },
        _ => match &session.authenticator {
            Ok(authenticator) => Auth::Bearer(authenticator.clone()),
            Err(_) => return Err(SessionError::EmptyClassicCredentials),
        },
    };
    session.build_client(service, auth, &session.classic_http)
}

/// Authenticated handle building the per-service API clients
///
/// A client that fails to build does not prevent the others from working:
/// the error is kept and returned each time that service is requested.
pub struct ClientSession {
    config: Config,
    endpoints: Option<EndpointsFile>,
    http: reqwest::Client,
    classic_http: reqwest::Client,
    authenticator: Result<Arc<Authenticator>, SessionError>,
    user: Result<UserConfig, SessionError>,
    registry: Registry,
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, SessionError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(format!(
            "terraform-provider-ibm/{}",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .map_err(|err| SessionError::Http(err.to_string()))
}

impl ClientSession {
    pub async fn new(config: Config) -> Result<Self, SessionError> {
        let http = http_client(config.timeout)?;
        let classic_http = http_client(config.classic_timeout)?;
        let endpoints = match &config.endpoints_file {
            Some(path) => Some(EndpointsFile::load(path).await.map_err(|err| {
                SessionError::EndpointsFile {
                    path: path.clone(),
                    reason: err.to_string(),
                }
            })?),
            None => None,
        };
        Self::with_endpoints(config, endpoints, http, classic_http).await
    }

    pub(crate) async fn with_endpoints(
        config: Config,
        endpoints: Option<EndpointsFile>,
        http: reqwest::Client,
        classic_http: reqwest::Client,
    ) -> Result<Self, SessionError> {
        if config.iam_token.is_some() != config.iam_refresh_token.is_some() {
            return Err(SessionError::IncompleteTokenPair);
        }

        let mut session = Self {
            config,
            endpoints,
            http,
            classic_http,
            authenticator: Err(SessionError::EmptyCloudCredentials),
            user: Err(SessionError::EmptyCloudCredentials),
            registry: Registry::new(),
        };

        session.authenticator = session.authenticate().await?;
        session.user = match &session.authenticator {
            Ok(authenticator) => match authenticator.access_token().await {
                Some(token) => claims::user_details(&token, session.config.generation)
                    .map_err(|err| SessionError::UserDetails(err.to_string())),
                None => Err(SessionError::UserDetails(String::from(
                    "no access token available",
                ))),
            },
            Err(err) => Err(err.clone()),
        };
        if let Err(err) = &session.user {
            tracing::warn!("{err}");
        }

        Ok(session)
    }

    /// Establish the cloud credentials
    ///
    /// An API key exchange failure is kept for the services to report,
    /// while a failed token refresh aborts the session.
    async fn authenticate(&self) -> Result<Result<Arc<Authenticator>, SessionError>, SessionError> {
        let config = &self.config;
        match (&config.api_key, &config.iam_token, &config.iam_refresh_token) {
            (Some(api_key), _, _) => {
                let identity =
                    match self.build_client(Service::IamIdentity, Auth::None, &self.http) {
                        Ok(identity) => identity,
                        Err(err) => return Ok(Err(err)),
                    };
                let authenticator = Authenticator::with_api_key(identity, api_key.clone());
                match authenticator.authenticate().await {
                    Ok(()) => Ok(Ok(Arc::new(authenticator))),
                    Err(err) => {
                        tracing::warn!("IAM authentication failed: {err}");
                        Ok(Err(SessionError::Authentication(err.to_string())))
                    }
                }
            }
            (None, Some(access_token), Some(refresh_token)) => {
                let identity = self.build_client(Service::IamIdentity, Auth::None, &self.http)?;
                let authenticator = Authenticator::with_tokens(
                    identity,
                    access_token.clone(),
                    refresh_token.clone(),
                );
                authenticator
                    .refresh()
                    .await
                    .map_err(|err| SessionError::Authentication(err.to_string()))?;
                Ok(Ok(Arc::new(authenticator)))
            }
            _ => Ok(Err(SessionError::EmptyCloudCredentials)),
        }
    }

    fn build_client(
        &self,
        service: Service,
        auth: Auth,
        http: &reqwest::Client,
    ) -> Result<ApiClient, SessionError> {
        let url = endpoints::resolve(service, &self.config, self.endpoints.as_ref());
        tracing::debug!(%service, %url, "configuring service client");
        ApiClient::new(http.clone(), &url, auth, self.retry_policy()).map_err(|err| {
            SessionError::Endpoint {
                service,
                url,
                reason: err.to_string(),
            }
        })
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.max_retries, self.config.retry_delay)
    }

    /// Client of a service, built on first use
    pub fn client(&self, service: Service) -> Result<ApiClient, SessionError> {
        match self.registry.entries.get(&service) {
            Some(entry) => entry
                .client
                .get_or_init(|| (entry.factory)(self, service))
                .clone(),
            None => (factory_for(service))(self, service),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn user_details(&self) -> Result<&UserConfig, SessionError> {
        self.user.as_ref().map_err(Clone::clone)
    }

    pub fn authenticator(&self) -> Result<&Arc<Authenticator>, SessionError> {
        self.authenticator.as_ref().map_err(Clone::clone)
    }

    /// Console URL the resource controller links point to
    pub fn base_controller(&self) -> Result<&'static str, SessionError> {
        let user = self.user_details()?;
        Ok(if user.cloud_name == "staging" {
            "https://test.cloud.ibm.com"
        } else {
            "https://cloud.ibm.com"
        })
    }

    pub fn resource_manager_v2(&self) -> Result<ResourceManagerApi, SessionError> {
        self.client(Service::ResourceManager)
            .map(ResourceManagerApi::new)
    }

    pub fn resource_controller_v2(&self) -> Result<ResourceControllerApi, SessionError> {
        self.client(Service::ResourceController)
            .map(ResourceControllerApi::new)
    }

    pub fn global_catalog_v1(&self) -> Result<GlobalCatalogApi, SessionError> {
        self.client(Service::GlobalCatalog).map(GlobalCatalogApi::new)
    }

    pub fn global_tagging_v3(&self) -> Result<TaggingApi, SessionError> {
        self.client(Service::GlobalTagging).map(TaggingApi::new)
    }

    pub fn vpc_v1(&self) -> Result<VpcApi, SessionError> {
        self.client(Service::Vpc).map(VpcApi::new)
    }

    pub fn private_dns_v1(&self) -> Result<DnsApi, SessionError> {
        self.client(Service::PrivateDns).map(DnsApi::new)
    }

    pub fn transit_gateway_v1(&self) -> Result<TransitGatewayApi, SessionError> {
        self.client(Service::TransitGateway)
            .map(TransitGatewayApi::new)
    }

    pub fn iam_access_groups_v2(&self) -> Result<AccessGroupsApi, SessionError> {
        self.client(Service::IamAccessGroups)
            .map(AccessGroupsApi::new)
    }

    pub fn classic_infrastructure(&self) -> Result<ClassicApi, SessionError> {
        self.client(Service::ClassicInfrastructure)
            .map(ClassicApi::new)
    }

    #[cfg(test)]
    fn with_factory(mut self, service: Service, factory: Factory) -> Self {
        self.registry.entries.insert(
            service,
            Entry {
                factory,
                client: OnceLock::new(),
            },
        );
        self
    }
}

/// Session slot shared between the provider and its resources
#[derive(Debug, Default, Clone)]
pub struct SessionHandle(Arc<RwLock<Option<Arc<ClientSession>>>>);

impl SessionHandle {
    pub fn install(&self, session: ClientSession) {
        let mut slot = self.0.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(session));
    }

    pub fn get(&self) -> Result<Arc<ClientSession>, SessionError> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SessionError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::test_utils::{
        http, mock_endpoints, mock_session, test_config, MockResponse, MockServer,
    };

    async fn session(config: Config) -> Result<ClientSession, SessionError> {
        ClientSession::with_endpoints(config, None, http(), http()).await
    }

    /// Session whose IAM calls go to `server`
    async fn iam_session(
        server: &MockServer,
        config: Config,
    ) -> Result<ClientSession, SessionError> {
        ClientSession::with_endpoints(config, Some(mock_endpoints(server)), http(), http()).await
    }

    #[tokio::test]
    async fn missing_credentials_are_reported_per_service() {
        let session = session(Config::default()).await.unwrap();

        assert_eq!(
            session.vpc_v1().err(),
            Some(SessionError::EmptyCloudCredentials)
        );
        assert_eq!(
            session.global_tagging_v3().err(),
            Some(SessionError::EmptyCloudCredentials)
        );
        assert_eq!(
            session.user_details().err(),
            Some(SessionError::EmptyCloudCredentials)
        );
        assert_eq!(
            session.classic_infrastructure().err(),
            Some(SessionError::EmptyClassicCredentials)
        );
    }

    #[tokio::test]
    async fn classic_works_without_cloud_credentials() {
        let session = session(Config {
            classic_username: Some("user".into()),
            classic_api_key: Some("key".into()),
            ..Default::default()
        })
        .await
        .unwrap();

        assert!(session.classic_infrastructure().is_ok());
        assert!(session.vpc_v1().is_err());
    }

    #[tokio::test]
    async fn incomplete_token_pair_fails() {
        let err = session(Config {
            iam_token: Some("token".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
        assert_eq!(err, SessionError::IncompleteTokenPair);
    }

    #[tokio::test]
    async fn api_key_session() {
        let server = MockServer::builder().with_iam_token().start().await;
        let session = iam_session(
            &server,
            Config {
                api_key: Some("key".into()),
                ..test_config()
            },
        )
        .await
        .unwrap();

        let user = session.user_details().unwrap();
        assert_eq!(user.account_id, "acct-1");
        assert_eq!(user.user_id, "IBMid-1");
        assert_eq!(session.base_controller().unwrap(), "https://cloud.ibm.com");

        let grant = server.requests_to("POST", "/identity/token");
        assert_eq!(grant.len(), 1);
        assert!(grant[0]
            .body
            .contains("grant_type=urn%3Aibm%3Aparams%3Aoauth%3Agrant-type%3Aapikey"));

        let vpc = session.client(Service::Vpc).unwrap();
        assert_eq!(vpc.base_url().as_str(), format!("{}/v1", server.url()));
        // Classic falls back to the IAM token
        assert!(session.classic_infrastructure().is_ok());
    }

    #[tokio::test]
    async fn services_use_the_session_token() {
        let server = MockServer::builder()
            .with_iam_token()
            .on(
                "GET",
                "/v1/transit_gateways/tg-1",
                MockResponse::json(200, json!({"id": "tg-1", "name": "tg", "status": "available"})),
            )
            .start()
            .await;
        let session = mock_session(&server).await;

        let gateway = session
            .transit_gateway_v1()
            .unwrap()
            .get("tg-1")
            .await
            .unwrap();
        assert_eq!(gateway.name, "tg");

        let requests = server.requests_to("GET", "/v1/transit_gateways/tg-1");
        assert!(requests[0]
            .header("authorization")
            .is_some_and(|auth| auth.starts_with("Bearer ")));
    }

    #[tokio::test]
    async fn failed_api_key_exchange_is_deferred() {
        let server = MockServer::builder()
            .on(
                "POST",
                "/identity/token",
                MockResponse::json(400, json!({"errorMessage": "Provided API key could not be found"})),
            )
            .start()
            .await;
        let session = iam_session(
            &server,
            Config {
                api_key: Some("bad".into()),
                ..test_config()
            },
        )
        .await
        .unwrap();

        let err = session.private_dns_v1().err().unwrap();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert!(err
            .to_string()
            .contains("Provided API key could not be found"));
    }

    #[tokio::test]
    async fn failed_refresh_aborts_session() {
        let server = MockServer::builder()
            .on(
                "POST",
                "/identity/token",
                MockResponse::json(400, json!({"errorMessage": "refresh token expired"})),
            )
            .start()
            .await;
        let err = iam_session(
            &server,
            Config {
                iam_token: Some("access".into()),
                iam_refresh_token: Some("refresh".into()),
                ..test_config()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert!(err.to_string().contains("refresh token expired"));

        let grant = server.requests_to("POST", "/identity/token");
        assert_eq!(grant.len(), 1);
        assert!(grant[0].body.contains("grant_type=refresh_token"));
    }

    #[tokio::test]
    async fn construction_failures_are_isolated() {
        let server = MockServer::builder().with_iam_token().start().await;
        let mut config = Config {
            api_key: Some("key".into()),
            ..test_config()
        };
        config
            .endpoint_overrides
            .insert("IBMCLOUD_IS_NG_API_ENDPOINT".into(), "https://bad host".into());
        let session = iam_session(&server, config).await.unwrap();

        assert!(matches!(
            session.vpc_v1().err(),
            Some(SessionError::Endpoint {
                service: Service::Vpc,
                ..
            })
        ));
        assert!(session.transit_gateway_v1().is_ok());
        assert!(session.resource_controller_v2().is_ok());
    }

    #[tokio::test]
    async fn clients_are_built_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn counting(_: &ClientSession, service: Service) -> Result<ApiClient, SessionError> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Err(SessionError::Http(format!("{service} unavailable")))
        }

        let session = session(Config::default())
            .await
            .unwrap()
            .with_factory(Service::PrivateDns, counting);

        for _ in 0..3 {
            assert_eq!(
                session.private_dns_v1().err(),
                Some(SessionError::Http("Private DNS unavailable".into()))
            );
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(
            session.transit_gateway_v1().err(),
            Some(SessionError::EmptyCloudCredentials)
        );
    }

    #[test]
    fn handle_requires_configuration() {
        let handle = SessionHandle::default();
        assert_eq!(handle.get().err(), Some(SessionError::NotConfigured));
    }
}
