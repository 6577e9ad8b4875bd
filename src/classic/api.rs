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
use serde_json::json;

use crate::client::{ApiClient, ApiError, OrNotFound};

const SSH_KEY_SERVICE: &str = "SoftLayer_Security_Ssh_Key";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub label: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing)]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing)]
    pub create_date: Option<String>,
}

/// SoftLayer REST API, restricted to the services the provider manages.
///
/// Every call wraps its arguments in a `parameters` array.
#[derive(Debug, Clone)]
pub struct ClassicApi {
    client: ApiClient,
}

impl ClassicApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn create_ssh_key(&self, key: &SshKey) -> Result<SshKey, ApiError> {
        self.client
            .post(&[SSH_KEY_SERVICE])
            .json(&json!({ "parameters": [key] }))
            .send_json()
            .await
    }

    pub async fn get_ssh_key(&self, id: &str) -> Result<SshKey, ApiError> {
        self.client
            .get(&[SSH_KEY_SERVICE, id])
            .send_json()
            .await
    }

    pub async fn ssh_key_exists(&self, id: &str) -> Result<bool, ApiError> {
        Ok(self.get_ssh_key(id).await.or_not_found()?.is_some())
    }

    /// Only `label` and `notes` can be edited
    pub async fn edit_ssh_key(&self, id: &str, label: &str, notes: &str) -> Result<(), ApiError> {
        let edited: bool = self
            .client
            .put(&[SSH_KEY_SERVICE, id])
            .json(&json!({ "parameters": [{ "label": label, "notes": notes }] }))
            .send_json()
            .await?;
        if edited {
            Ok(())
        } else {
            Err(ApiError::Unexpected(format!(
                "the SSH key {id} could not be edited"
            )))
        }
    }

    pub async fn delete_ssh_key(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&[SSH_KEY_SERVICE, id])
            .send()
            .await?;
        Ok(())
    }
}
