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

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub account_id: Option<String>,
    pub created_at: Option<String>,
    pub last_modified_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessGroupRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

/// IAM Access Groups v2 API
#[derive(Debug, Clone)]
pub struct AccessGroupsApi {
    client: ApiClient,
}

impl AccessGroupsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(
        &self,
        account_id: &str,
        request: &AccessGroupRequest<'_>,
    ) -> Result<AccessGroup, ApiError> {
        self.client
            .post(&["v2", "groups"])
            .query("account_id", account_id)
            .json(request)
            .send_json()
            .await
    }

    /// Access group and the ETag guarding its next update
    pub async fn get(&self, id: &str) -> Result<(AccessGroup, Option<String>), ApiError> {
        let response = self.client.get(&["v2", "groups", id]).send().await?;
        Ok((response.json()?, response.etag))
    }

    pub async fn exists(&self, id: &str) -> Result<bool, ApiError> {
        Ok(self.get(id).await.or_not_found()?.is_some())
    }

    /// Update an access group, failing if it changed since `etag` was read
    pub async fn update(
        &self,
        id: &str,
        etag: &str,
        request: &AccessGroupRequest<'_>,
    ) -> Result<(AccessGroup, Option<String>), ApiError> {
        let response = self
            .client
            .patch(&["v2", "groups", id])
            .header("if-match", etag)
            .json(request)
            .send()
            .await?;
        Ok((response.json()?, response.etag))
    }

    /// Delete an access group, even if it still has members
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&["v2", "groups", id])
            .query("force", true)
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

    fn api(server: &MockServer) -> AccessGroupsApi {
        AccessGroupsApi::new(
            ApiClient::new(http(), &server.url(), Auth::None, RetryPolicy::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn update_sends_if_match() {
        let server = MockServer::builder()
            .on(
                "GET",
                "/v2/groups/AccessGroupId-1",
                MockResponse::json(200, json!({"id": "AccessGroupId-1", "name": "devs"}))
                    .with_header("ETag", "1-abc"),
            )
            .on(
                "PATCH",
                "/v2/groups/AccessGroupId-1",
                MockResponse::json(
                    200,
                    json!({"id": "AccessGroupId-1", "name": "developers", "description": "team"}),
                )
                .with_header("ETag", "2-def"),
            )
            .start()
            .await;
        let api = api(&server);

        let (group, etag) = api.get("AccessGroupId-1").await.unwrap();
        assert_eq!(group.name, "devs");
        let etag = etag.unwrap();

        let (group, etag) = api
            .update(
                "AccessGroupId-1",
                &etag,
                &AccessGroupRequest {
                    name: "developers",
                    description: Some("team"),
                },
            )
            .await
            .unwrap();
        assert_eq!(group.description.as_deref(), Some("team"));
        assert_eq!(etag.as_deref(), Some("2-def"));

        let requests = server.requests_to("PATCH", "/v2/groups/AccessGroupId-1");
        assert_eq!(requests[0].header("if-match"), Some("1-abc"));
    }

    #[tokio::test]
    async fn delete_is_forced() {
        let server = MockServer::builder()
            .on("DELETE", "/v2/groups/g", MockResponse::empty(204))
            .start()
            .await;
        api(&server).delete("g").await.unwrap();
        assert_eq!(server.requests()[0].query, "force=true");
    }
}
