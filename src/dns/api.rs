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

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{ApiClient, ApiError, OrNotFound};

const PAGE_LIMIT: u64 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Zone {
    pub id: String,
    pub instance_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub label: Option<String>,
    pub state: Option<String>,
    pub created_on: Option<String>,
    pub modified_on: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZonePage {
    #[serde(default)]
    dnszones: Vec<Zone>,
    #[serde(default)]
    total_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CreateZone<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UpdateZone<'a> {
    pub description: &'a str,
    pub label: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Srv,
    Txt,
    Ptr,
}

impl RecordType {
    pub const ALL: [RecordType; 7] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Srv,
        RecordType::Txt,
        RecordType::Ptr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
            RecordType::Ptr => "PTR",
        }
    }

    /// Field of `rdata` holding the main record value
    fn value_key(self) -> &'static str {
        match self {
            RecordType::A | RecordType::Aaaa => "ip",
            RecordType::Cname => "cname",
            RecordType::Mx => "exchange",
            RecordType::Srv => "target",
            RecordType::Txt => "text",
            RecordType::Ptr => "ptrdname",
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|record_type| record_type.name() == s)
            .ok_or_else(|| format!("unsupported record type `{s}`"))
    }
}

/// Record data as it is configured: one value plus the MX and SRV extras
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rdata {
    pub value: String,
    pub preference: Option<i64>,
    pub port: Option<i64>,
    pub priority: Option<i64>,
    pub weight: Option<i64>,
}

impl Rdata {
    /// JSON `rdata` object of a record of type `record_type`
    pub fn expand(&self, record_type: RecordType) -> Result<Value, String> {
        let key = record_type.value_key();
        match record_type {
            RecordType::Mx => Ok(json!({
                key: self.value,
                "preference": self.preference.unwrap_or_default(),
            })),
            RecordType::Srv => {
                let (Some(port), Some(priority), Some(weight)) =
                    (self.port, self.priority, self.weight)
                else {
                    return Err(String::from(
                        "`port`, `priority` and `weight` are required for SRV records",
                    ));
                };
                Ok(json!({
                    key: self.value,
                    "port": port,
                    "priority": priority,
                    "weight": weight,
                }))
            }
            _ => Ok(json!({ key: self.value })),
        }
    }

    pub fn flatten(record_type: RecordType, rdata: &Value) -> Self {
        let number = |key: &str| rdata.get(key).and_then(Value::as_i64);
        let value = rdata
            .get(record_type.value_key())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        match record_type {
            RecordType::Mx => Rdata {
                value,
                preference: number("preference"),
                ..Default::default()
            },
            RecordType::Srv => Rdata {
                value,
                port: number("port"),
                priority: number("priority"),
                weight: number("weight"),
                ..Default::default()
            },
            _ => Rdata {
                value,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: Option<i64>,
    #[serde(default)]
    pub rdata: Value,
    pub service: Option<String>,
    pub protocol: Option<String>,
    pub created_on: Option<String>,
    pub modified_on: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<&'a str>,
    pub rdata: Value,
    pub ttl: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<&'a str>,
}

/// DNS Services v1 API
#[derive(Debug, Clone)]
pub struct DnsApi {
    client: ApiClient,
}

impl DnsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Every zone of a DNS Services instance, page by page
    pub async fn list_zones(&self, instance_id: &str) -> Result<Vec<Zone>, ApiError> {
        let mut zones = Vec::new();
        loop {
            let page: ZonePage = self
                .client
                .get(&["instances", instance_id, "dnszones"])
                .query("offset", zones.len())
                .query("limit", PAGE_LIMIT)
                .send_json()
                .await?;
            let fetched = page.dnszones.len();
            zones.extend(page.dnszones);
            if fetched == 0 || zones.len() as u64 >= page.total_count {
                return Ok(zones);
            }
        }
    }

    pub async fn create_zone(
        &self,
        instance_id: &str,
        request: &CreateZone<'_>,
    ) -> Result<Zone, ApiError> {
        self.client
            .post(&["instances", instance_id, "dnszones"])
            .json(request)
            .send_json()
            .await
    }

    pub async fn get_zone(&self, instance_id: &str, zone_id: &str) -> Result<Zone, ApiError> {
        self.client
            .get(&["instances", instance_id, "dnszones", zone_id])
            .send_json()
            .await
    }

    pub async fn zone_exists(&self, instance_id: &str, zone_id: &str) -> Result<bool, ApiError> {
        Ok(self
            .get_zone(instance_id, zone_id)
            .await
            .or_not_found()?
            .is_some())
    }

    pub async fn update_zone(
        &self,
        instance_id: &str,
        zone_id: &str,
        request: &UpdateZone<'_>,
    ) -> Result<Zone, ApiError> {
        self.client
            .patch(&["instances", instance_id, "dnszones", zone_id])
            .json(request)
            .send_json()
            .await
    }

    pub async fn delete_zone(&self, instance_id: &str, zone_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&["instances", instance_id, "dnszones", zone_id])
            .send()
            .await?;
        Ok(())
    }

    pub async fn create_record(
        &self,
        instance_id: &str,
        zone_id: &str,
        request: &RecordRequest<'_>,
    ) -> Result<ResourceRecord, ApiError> {
        self.client
            .post(&["instances", instance_id, "dnszones", zone_id, "resource_records"])
            .json(request)
            .send_json()
            .await
    }

    pub async fn get_record(
        &self,
        instance_id: &str,
        zone_id: &str,
        record_id: &str,
    ) -> Result<ResourceRecord, ApiError> {
        self.client
            .get(&[
                "instances",
                instance_id,
                "dnszones",
                zone_id,
                "resource_records",
                record_id,
            ])
            .send_json()
            .await
    }

    pub async fn record_exists(
        &self,
        instance_id: &str,
        zone_id: &str,
        record_id: &str,
    ) -> Result<bool, ApiError> {
        Ok(self
            .get_record(instance_id, zone_id, record_id)
            .await
            .or_not_found()?
            .is_some())
    }

    pub async fn update_record(
        &self,
        instance_id: &str,
        zone_id: &str,
        record_id: &str,
        request: &RecordRequest<'_>,
    ) -> Result<ResourceRecord, ApiError> {
        self.client
            .put(&[
                "instances",
                instance_id,
                "dnszones",
                zone_id,
                "resource_records",
                record_id,
            ])
            .json(request)
            .send_json()
            .await
    }

    pub async fn delete_record(
        &self,
        instance_id: &str,
        zone_id: &str,
        record_id: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete(&[
                "instances",
                instance_id,
                "dnszones",
                zone_id,
                "resource_records",
                record_id,
            ])
            .send()
            .await?;
        Ok(())
    }
}
