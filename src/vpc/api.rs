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

use crate::client::{start_token, ApiClient, ApiError, OrNotFound, MERGE_PATCH};

pub const PENDING: &str = "pending";
pub const AVAILABLE: &str = "available";
pub const FAILED: &str = "failed";
pub const UPDATING: &str = "updating";
pub const DELETING: &str = "deleting";
pub const DELETED: &str = "done";
pub const RETRY: &str = "retry";

const PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpAddress {
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CseSourceIp {
    pub ip: Option<IpAddress>,
    pub zone: Option<Reference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub name: String,
    pub crn: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub classic_access: bool,
    pub default_network_acl: Option<Reference>,
    pub default_security_group: Option<Reference>,
    pub default_routing_table: Option<Reference>,
    pub resource_group: Option<Reference>,
    #[serde(default)]
    pub cse_source_ips: Vec<CseSourceIp>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    pub zone: Option<Reference>,
    pub vpc: Option<Reference>,
    #[serde(default)]
    pub total_ipv4_address_count: i64,
    #[serde(default)]
    pub available_ipv4_address_count: i64,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct VpcPage {
    #[serde(default)]
    vpcs: Vec<Vpc>,
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct SubnetPage {
    #[serde(default)]
    subnets: Vec<Subnet>,
    next: Option<Link>,
}

#[derive(Debug, Serialize)]
pub struct ResourceGroupIdentity<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateVpc<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefix_management: Option<&'a str>,
    pub classic_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ResourceGroupIdentity<'a>>,
}

#[derive(Debug, Serialize)]
struct UpdateVpc<'a> {
    name: &'a str,
}

/// VPC v1 API
///
/// The client carries the `version` and `generation` query parameters.
#[derive(Debug, Clone)]
pub struct VpcApi {
    client: ApiClient,
}

impl VpcApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Every VPC of the region, following the `next` links
    pub async fn list_vpcs(&self) -> Result<Vec<Vpc>, ApiError> {
        let mut vpcs = Vec::new();
        let mut start = None;
        loop {
            let page: VpcPage = self
                .client
                .get(&["vpcs"])
                .query("limit", PAGE_LIMIT)
                .query_opt("start", start.as_deref())
                .send_json()
                .await?;
            vpcs.extend(page.vpcs);
            start = page.next.and_then(|next| start_token(&next.href));
            if start.is_none() {
                return Ok(vpcs);
            }
        }
    }

    pub async fn get_vpc(&self, id: &str) -> Result<Vpc, ApiError> {
        self.client.get(&["vpcs", id]).send_json().await
    }

    pub async fn vpc_exists(&self, id: &str) -> Result<bool, ApiError> {
        Ok(self.get_vpc(id).await.or_not_found()?.is_some())
    }

    pub async fn create_vpc(&self, request: &CreateVpc<'_>) -> Result<Vpc, ApiError> {
        self.client.post(&["vpcs"]).json(request).send_json().await
    }

    pub async fn rename_vpc(&self, id: &str, name: &str) -> Result<Vpc, ApiError> {
        self.client
            .patch(&["vpcs", id])
            .header("content-type", MERGE_PATCH)
            .json(&UpdateVpc { name })
            .send_json()
            .await
    }

    pub async fn delete_vpc(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&["vpcs", id]).send().await?;
        Ok(())
    }

    /// Subnets attached to the VPC `vpc_id`
    pub async fn subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, ApiError> {
        let mut subnets = Vec::new();
        let mut start = None;
        loop {
            let page: SubnetPage = self
                .client
                .get(&["subnets"])
                .query("limit", PAGE_LIMIT)
                .query_opt("start", start.as_deref())
                .send_json()
                .await?;
            subnets.extend(page.subnets.into_iter().filter(|subnet| {
                subnet
                    .vpc
                    .as_ref()
                    .and_then(|vpc| vpc.id.as_deref())
                    == Some(vpc_id)
            }));
            start = page.next.and_then(|next| start_token(&next.href));
            if start.is_none() {
                return Ok(subnets);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::{Auth, RetryPolicy};
    use crate::test_utils::{http, MockResponse, MockServer};

    fn api(server: &MockServer) -> VpcApi {
        VpcApi::new(
            ApiClient::new(
                http(),
                &format!("{}/v1", server.url()),
                Auth::None,
                RetryPolicy::default(),
            )
            .unwrap()
            .with_query("version", "2024-01-01")
            .with_query("generation", "2"),
        )
    }

    #[tokio::test]
    async fn subnets_follow_pages() {
        let server = MockServer::builder()
            .route(
                "GET",
                "/v1/subnets",
                [
                    MockResponse::json(
                        200,
                        json!({
                            "subnets": [
                                {"id": "s1", "name": "a", "status": "available", "vpc": {"id": "vpc-1"},
                                 "zone": {"name": "us-south-1"}, "total_ipv4_address_count": 256, "available_ipv4_address_count": 251},
                                {"id": "s2", "name": "b", "vpc": {"id": "vpc-2"}},
                            ],
                            "next": {"href": "https://us-south.iaas.cloud.ibm.com/v1/subnets?limit=100&start=page2"},
                        }),
                    ),
                    MockResponse::json(
                        200,
                        json!({"subnets": [{"id": "s3", "name": "c", "vpc": {"id": "vpc-1"}}]}),
                    ),
                ],
            )
            .start()
            .await;

        let subnets = api(&server).subnets("vpc-1").await.unwrap();
        let ids: Vec<&str> = subnets.iter().map(|subnet| subnet.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s3"]);
        assert_eq!(subnets[0].available_ipv4_address_count, 251);

        let requests = server.requests_to("GET", "/v1/subnets");
        assert_eq!(requests.len(), 2);
        assert!(requests[0].query.contains("generation=2"));
        assert!(requests[1].query.contains("start=page2"));
    }

    #[tokio::test]
    async fn rename_uses_merge_patch() {
        let server = MockServer::builder()
            .on(
                "PATCH",
                "/v1/vpcs/vpc-1",
                MockResponse::json(200, json!({"id": "vpc-1", "name": "renamed", "status": "available"})),
            )
            .start()
            .await;

        let vpc = api(&server).rename_vpc("vpc-1", "renamed").await.unwrap();
        assert_eq!(vpc.name, "renamed");

        let requests = server.requests_to("PATCH", "/v1/vpcs/vpc-1");
        assert_eq!(requests[0].header("content-type"), Some(MERGE_PATCH));
        assert_eq!(requests[0].json(), json!({"name": "renamed"}));
    }
}
