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
use std::time::Duration;

pub mod endpoints;

pub use endpoints::{Service, Visibility};

pub const DEFAULT_REGION: &str = "us-south";
pub const DEFAULT_CLASSIC_ENDPOINT: &str = "https://api.softlayer.com/rest/v3";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_GENERATION: i64 = 2;
pub const RETRY_API_DELAY: Duration = Duration::from_secs(5);

/// Resolved provider settings, after environment fallbacks and defaults
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub iam_token: Option<String>,
    pub iam_refresh_token: Option<String>,
    pub region: String,
    pub zone: Option<String>,
    pub resource_group: Option<String>,
    pub visibility: Visibility,
    pub endpoints_file: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub generation: i64,
    pub classic_username: Option<String>,
    pub classic_api_key: Option<String>,
    pub classic_endpoint: String,
    pub classic_timeout: Duration,
    /// Tags added to every taggable resource
    pub env_tags: Vec<String>,
    /// `IBMCLOUD_*_API_ENDPOINT` values found in the environment
    pub endpoint_overrides: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            iam_token: None,
            iam_refresh_token: None,
            region: DEFAULT_REGION.to_owned(),
            zone: None,
            resource_group: None,
            visibility: Visibility::Public,
            endpoints_file: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: RETRY_API_DELAY,
            generation: DEFAULT_GENERATION,
            classic_username: None,
            classic_api_key: None,
            classic_endpoint: DEFAULT_CLASSIC_ENDPOINT.to_owned(),
            classic_timeout: DEFAULT_TIMEOUT,
            env_tags: Vec::new(),
            endpoint_overrides: BTreeMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("iam_token", &self.iam_token.as_ref().map(|_| "<redacted>"))
            .field(
                "iam_refresh_token",
                &self.iam_refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .field("zone", &self.zone)
            .field("resource_group", &self.resource_group)
            .field("visibility", &self.visibility)
            .field("endpoints_file", &self.endpoints_file)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("generation", &self.generation)
            .field("classic_username", &self.classic_username)
            .field(
                "classic_api_key",
                &self.classic_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("classic_endpoint", &self.classic_endpoint)
            .field("env_tags", &self.env_tags)
            .field("endpoint_overrides", &self.endpoint_overrides)
            .finish()
    }
}

impl Config {
    /// Collect the endpoint overrides and environment tags from a variable lookup
    pub fn with_environment<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in Service::ALL.iter().filter_map(|service| service.env_key()) {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                self.endpoint_overrides.insert(key.to_owned(), value);
            }
        }
        if let Some(tags) = lookup("IC_ENV_TAGS") {
            self.env_tags = tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_owned)
                .collect();
        }
        self
    }
}

/// First non-empty value among `keys`
pub fn lookup_fallback<F>(keys: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
}
