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

use serde::Deserialize;

use crate::client::{ApiClient, ApiError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: String,
    pub catalog_crn: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub rc_compatible: bool,
    pub service: Option<ServiceMetadata>,
    pub deployment: Option<DeploymentMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceMetadata {
    #[serde(default)]
    pub rc_provisionable: bool,
    #[serde(default)]
    pub iam_compatible: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentMetadata {
    #[serde(default)]
    pub location: String,
    pub target_crn: Option<String>,
}

impl CatalogEntry {
    pub fn rc_provisionable(&self) -> bool {
        self.metadata
            .service
            .as_ref()
            .is_some_and(|service| service.rc_provisionable)
    }

    pub fn location(&self) -> &str {
        self.metadata
            .deployment
            .as_ref()
            .map_or("", |deployment| deployment.location.as_str())
    }

    /// Target passed to the resource controller when provisioning on this deployment
    pub fn target(&self) -> &str {
        self.catalog_crn
            .as_deref()
            .or_else(|| {
                self.metadata
                    .deployment
                    .as_ref()
                    .and_then(|deployment| deployment.target_crn.as_deref())
            })
            .unwrap_or_else(|| self.location())
    }
}

#[derive(Debug, Deserialize)]
struct EntryList {
    #[serde(default)]
    resources: Vec<CatalogEntry>,
}

/// Global Catalog v1 API
#[derive(Debug, Clone)]
pub struct GlobalCatalogApi {
    client: ApiClient,
}

impl GlobalCatalogApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Service offering with exactly this name
    pub async fn find_service(&self, name: &str) -> Result<Option<CatalogEntry>, ApiError> {
        let list: EntryList = self
            .client
            .get::<&str>(&[])
            .query("q", format!("name:{name} active:true"))
            .query("complete", true)
            .send_json()
            .await?;
        Ok(list.resources.into_iter().find(|entry| entry.name == name))
    }

    pub async fn get(&self, id: &str) -> Result<CatalogEntry, ApiError> {
        self.client.get(&[id]).send_json().await
    }

    pub async fn plans(&self, service_id: &str) -> Result<Vec<CatalogEntry>, ApiError> {
        self.children(service_id, "plan").await
    }

    pub async fn deployments(&self, plan_id: &str) -> Result<Vec<CatalogEntry>, ApiError> {
        self.children(plan_id, "deployment").await
    }

    async fn children(&self, id: &str, kind: &str) -> Result<Vec<CatalogEntry>, ApiError> {
        let list: EntryList = self.client.get(&[id, kind]).send_json().await?;
        Ok(list.resources)
    }
}

/// Deployment of a plan available at `location`
///
/// Without a match, the locations the plan can be deployed to are returned instead.
pub fn select_deployment<'d>(
    deployments: &'d [CatalogEntry],
    location: &str,
) -> Result<&'d CatalogEntry, Vec<String>> {
    let compatible: Vec<&CatalogEntry> = deployments
        .iter()
        .filter(|deployment| deployment.metadata.rc_compatible)
        .collect();
    compatible
        .iter()
        .find(|deployment| deployment.location() == location)
        .copied()
        .ok_or_else(|| {
            compatible
                .iter()
                .map(|deployment| deployment.location().to_owned())
                .collect()
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::{Auth, RetryPolicy};
    use crate::test_utils::{http, MockResponse, MockServer};

    fn deployment(location: &str, rc_compatible: bool) -> CatalogEntry {
        serde_json::from_value(json!({
            "id": format!("plan-{location}"),
            "name": location,
            "kind": "deployment",
            "metadata": {
                "rc_compatible": rc_compatible,
                "deployment": {"location": location, "target_crn": format!("crn:v1:bluemix:public:resource-catalog::a/1::deployment:{location}")},
            },
        }))
        .unwrap()
    }

    #[test]
    fn deployments_are_filtered() {
        let deployments = vec![
            deployment("us-south", true),
            deployment("eu-de", true),
            deployment("jp-tok", false),
        ];

        let found = select_deployment(&deployments, "eu-de").unwrap();
        assert_eq!(
            found.target(),
            "crn:v1:bluemix:public:resource-catalog::a/1::deployment:eu-de"
        );

        assert_eq!(
            select_deployment(&deployments, "jp-tok").unwrap_err(),
            vec!["us-south", "eu-de"]
        );
    }

    #[test]
    fn catalog_crn_is_preferred() {
        let mut entry = deployment("global", true);
        entry.catalog_crn = Some("crn:catalog".into());
        assert_eq!(entry.target(), "crn:catalog");
        assert_eq!(CatalogEntry::default().target(), "");
    }

    #[tokio::test]
    async fn service_lookup() {
        let server = MockServer::builder()
            .on(
                "GET",
                "/api/v1",
                MockResponse::json(
                    200,
                    json!({"resources": [
                        {"id": "svc-2", "name": "cloud-object-storage-legacy", "kind": "service"},
                        {"id": "svc-1", "name": "cloud-object-storage", "kind": "service",
                         "metadata": {"service": {"rc_provisionable": true}}},
                    ]}),
                ),
            )
            .on(
                "GET",
                "/api/v1/svc-1/plan",
                MockResponse::json(200, json!({"resources": [{"id": "plan-1", "name": "lite"}]})),
            )
            .start()
            .await;
        let api = GlobalCatalogApi::new(
            ApiClient::new(
                http(),
                &format!("{}/api/v1", server.url()),
                Auth::None,
                RetryPolicy::default(),
            )
            .unwrap(),
        );

        let service = api
            .find_service("cloud-object-storage")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(service.id, "svc-1");
        assert!(service.rc_provisionable());

        let plans = api.plans(&service.id).await.unwrap();
        assert_eq!(plans[0].name, "lite");
    }
}
