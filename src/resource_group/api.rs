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

use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiError, OrNotFound};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourceGroup {
    pub id: String,
    pub crn: Option<String>,
    pub name: String,
    pub account_id: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub default: bool,
    pub quota_id: Option<String>,
    pub quota_url: Option<String>,
    pub payment_methods_url: Option<String>,
    pub teams_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceGroupList {
    #[serde(default)]
    resources: Vec<ResourceGroup>,
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    name: &'a str,
    account_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    name: &'a str,
}

/// Filters of the resource group listing
#[derive(Debug, Default, Clone, Copy)]
pub struct ListQuery<'a> {
    pub account_id: Option<&'a str>,
    pub name: Option<&'a str>,
    pub default: bool,
}

/// Resource Manager v2 API
#[derive(Debug, Clone)]
pub struct ResourceManagerApi {
    client: ApiClient,
}

impl ResourceManagerApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: ListQuery<'_>) -> Result<Vec<ResourceGroup>, ApiError> {
        let mut request = self
            .client
            .get(&["v2", "resource_groups"])
            .query_opt("account_id", query.account_id)
            .query_opt("name", query.name);
        if query.default {
            request = request.query("default", true);
        }
        let list: ResourceGroupList = request.send_json().await?;
        Ok(list.resources)
    }

    /// Default resource group of an account
    pub async fn default_group(&self, account_id: &str) -> Result<Option<ResourceGroup>, ApiError> {
        let groups = self
            .list(ListQuery {
                account_id: Some(account_id),
                default: true,
                ..Default::default()
            })
            .await?;
        Ok(groups.into_iter().next())
    }

    pub async fn get(&self, id: &str) -> Result<ResourceGroup, ApiError> {
        self.client
            .get(&["v2", "resource_groups", id])
            .send_json()
            .await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, ApiError> {
        Ok(self.get(id).await.or_not_found()?.is_some())
    }

    /// Create a resource group and return its id
    pub async fn create(&self, name: &str, account_id: &str) -> Result<String, ApiError> {
        let created: Created = self
            .client
            .post(&["v2", "resource_groups"])
            .json(&CreateRequest { name, account_id })
            .send_json()
            .await?;
        Ok(created.id)
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .patch(&["v2", "resource_groups", id])
            .json(&UpdateRequest { name })
            .send()
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&["v2", "resource_groups", id])
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::{Auth, RetryPolicy};
    use crate::test_utils::{http, MockResponse, MockServer};

    fn api(server: &MockServer) -> ResourceManagerApi {
        ResourceManagerApi::new(
            ApiClient::new(http(), &server.url(), Auth::None, RetryPolicy::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn default_group_lookup() {
        let server = MockServer::builder()
            .on(
                "GET",
                "/v2/resource_groups",
                MockResponse::json(
                    200,
                    json!({"resources": [{"id": "rg1", "name": "Default", "default": true, "state": "ACTIVE"}]}),
                ),
            )
            .start()
            .await;

        let group = api(&server).default_group("acct").await.unwrap().unwrap();
        assert_eq!(group.id, "rg1");
        assert!(group.default);
        assert_eq!(
            server.requests()[0].query,
            "account_id=acct&default=true"
        );
    }

    #[tokio::test]
    async fn exists_maps_not_found() {
        let server = MockServer::builder()
            .on(
                "GET",
                "/v2/resource_groups/gone",
                MockResponse::json(404, json!({"message": "not found"})),
            )
            .on(
                "GET",
                "/v2/resource_groups/rg1",
                MockResponse::json(200, json!({"id": "rg1", "name": "prod"})),
            )
            .start()
            .await;
        let api = api(&server);
        assert!(!api.exists("gone").await.unwrap());
        assert!(api.exists("rg1").await.unwrap());
    }
}
