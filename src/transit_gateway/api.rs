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

pub const PENDING: &str = "pending";
pub const AVAILABLE: &str = "available";
pub const FAILED: &str = "failed";
pub const DELETING: &str = "deleting";
pub const DELETED: &str = "deleted";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceGroupReference {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransitGateway {
    pub id: String,
    pub crn: Option<String>,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub status: String,
    pub resource_group: Option<ResourceGroupReference>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResourceGroupIdentity<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateGateway<'a> {
    pub name: &'a str,
    pub location: &'a str,
    pub global: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ResourceGroupIdentity<'a>>,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateGateway<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<bool>,
}

/// Transit Gateway v1 API
#[derive(Debug, Clone)]
pub struct TransitGatewayApi {
    client: ApiClient,
}

impl TransitGatewayApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreateGateway<'_>) -> Result<TransitGateway, ApiError> {
        self.client
            .post(&["transit_gateways"])
            .json(request)
            .send_json()
            .await
    }

    pub async fn get(&self, id: &str) -> Result<TransitGateway, ApiError> {
        self.client
            .get(&["transit_gateways", id])
            .send_json()
            .await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, ApiError> {
        Ok(self.get(id).await.or_not_found()?.is_some())
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateGateway<'_>,
    ) -> Result<TransitGateway, ApiError> {
        self.client
            .patch(&["transit_gateways", id])
            .json(request)
            .send_json()
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&["transit_gateways", id])
            .send()
            .await?;
        Ok(())
    }
}
