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
use serde_json::{Map, Value};

use crate::client::{ApiClient, ApiError, OrNotFound};

pub const ACTIVE: &str = "active";
pub const IN_PROGRESS: &str = "in progress";
pub const INACTIVE: &str = "inactive";
pub const PROVISIONING: &str = "provisioning";
pub const FAILED: &str = "failed";
pub const REMOVED: &str = "removed";
pub const PENDING_RECLAMATION: &str = "pending_reclamation";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceInstance {
    pub id: String,
    pub guid: Option<String>,
    pub crn: Option<String>,
    #[serde(default)]
    pub name: String,
    pub region_id: Option<String>,
    pub resource_group_id: Option<String>,
    pub resource_plan_id: Option<String>,
    pub resource_id: Option<String>,
    pub state: Option<String>,
    pub dashboard_url: Option<String>,
    pub parameters: Option<Value>,
    pub extensions: Option<Value>,
    pub last_operation: Option<LastOperation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastOperation {
    pub state: Option<String>,
    pub description: Option<String>,
}

impl ResourceInstance {
    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or_default()
    }

    /// Human readable reason of the last failure
    pub fn failure(&self) -> String {
        self.last_operation
            .as_ref()
            .and_then(|operation| operation.description.clone())
            .unwrap_or_else(|| String::from("no details provided"))
    }

    /// Whether the instance is gone, even if the controller still remembers it
    pub fn is_removed(&self) -> bool {
        matches!(self.state(), REMOVED | PENDING_RECLAMATION)
    }
}

#[derive(Debug, Serialize)]
pub struct CreateInstance<'a> {
    pub name: &'a str,
    pub target: &'a str,
    pub resource_group: &'a str,
    pub resource_plan_id: &'a str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateInstance<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_plan_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

/// Resource Controller v2 API
#[derive(Debug, Clone)]
pub struct ResourceControllerApi {
    client: ApiClient,
}

impl ResourceControllerApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreateInstance<'_>) -> Result<ResourceInstance, ApiError> {
        self.client
            .post(&["v2", "resource_instances"])
            .json(request)
            .send_json()
            .await
    }

    pub async fn get(&self, id: &str) -> Result<ResourceInstance, ApiError> {
        self.client
            .get(&["v2", "resource_instances", id])
            .send_json()
            .await
    }

    /// Whether the instance exists and has not been removed
    pub async fn exists(&self, id: &str) -> Result<bool, ApiError> {
        Ok(self
            .get(id)
            .await
            .or_not_found()?
            .is_some_and(|instance| !instance.is_removed()))
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateInstance<'_>,
    ) -> Result<ResourceInstance, ApiError> {
        self.client
            .patch(&["v2", "resource_instances", id])
            .json(request)
            .send_json()
            .await
    }

    /// Delete an instance along with its service keys and aliases
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&["v2", "resource_instances", id])
            .query("recursive", true)
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

    fn api(server: &MockServer) -> ResourceControllerApi {
        ResourceControllerApi::new(
            ApiClient::new(http(), &server.url(), Auth::None, RetryPolicy::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn create_sends_target() {
        let server = MockServer::builder()
            .on(
                "POST",
                "/v2/resource_instances",
                MockResponse::json(
                    201,
                    json!({"id": "crn:v1:instance", "name": "cos", "state": "provisioning"}),
                ),
            )
            .start()
            .await;

        let created = api(&server)
            .create(&CreateInstance {
                name: "cos",
                target: "global",
                resource_group: "rg-1",
                resource_plan_id: "plan-1",
                parameters: Map::new(),
            })
            .await
            .unwrap();
        assert_eq!(created.state(), PROVISIONING);

        let requests = server.requests_to("POST", "/v2/resource_instances");
        assert_eq!(
            requests[0].json(),
            json!({"name": "cos", "target": "global", "resource_group": "rg-1", "resource_plan_id": "plan-1"})
        );
    }

    #[tokio::test]
    async fn delete_is_recursive() {
        let server = MockServer::builder()
            .on("DELETE", "/v2/resource_instances/abc", MockResponse::empty(204))
            .start()
            .await;

        api(&server).delete("abc").await.unwrap();
        let requests = server.requests_to("DELETE", "/v2/resource_instances/abc");
        assert_eq!(requests[0].query, "recursive=true");

        assert!(!api(&server).exists("other").await.unwrap());
    }

    #[test]
    fn removed_states() {
        let mut instance = ResourceInstance::default();
        assert!(!instance.is_removed());
        instance.state = Some(String::from(PENDING_RECLAMATION));
        assert!(instance.is_removed());
        assert_eq!(instance.failure(), "no details provided");
    }
}
