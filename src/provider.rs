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

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueEmpty, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Provider};

use crate::classic::IbmComputeSshKeyResource;
use crate::config::{
    lookup_fallback, Config, Visibility, DEFAULT_CLASSIC_ENDPOINT, DEFAULT_GENERATION,
    DEFAULT_MAX_RETRIES, DEFAULT_REGION, DEFAULT_TIMEOUT,
};
use crate::dns::{IbmDnsResourceRecordResource, IbmDnsZoneResource, IbmDnsZonesDataSource};
use crate::iam::{IbmIamAccessGroupResource, IbmIamAuthTokenDataSource};
use crate::resource_group::{IbmResourceGroupDataSource, IbmResourceGroupResource};
use crate::resource_instance::IbmResourceInstanceResource;
use crate::session::{ClientSession, SessionHandle};
use crate::transit_gateway::IbmTgGatewayResource;
use crate::utils::{deprecated, optional, sensitive, ReportError};
use crate::vpc::{IbmIsVpcDataSource, IbmIsVpcResource};

#[derive(Debug, Default, Clone)]
pub struct IbmProvider {
    session: SessionHandle,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub ibmcloud_api_key: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub bluemix_api_key: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub iam_token: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub iam_refresh_token: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub region: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub zone: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub resource_group: ValueString<'a>,
    pub ibmcloud_timeout: ValueNumber,
    pub max_retries: ValueNumber,
    pub generation: ValueNumber,
    #[serde(borrow = "'a")]
    pub visibility: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub endpoints_file_path: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub iaas_classic_username: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub iaas_classic_api_key: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub iaas_classic_endpoint_url: ValueString<'a>,
    pub iaas_classic_timeout: ValueNumber,
}

/// Configured string, or the first non-empty environment variable among `keys`
fn resolve_string<F>(value: &ValueString, keys: &[&str], lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match value.as_deref_option() {
        Some(value) if !value.is_empty() => Some(value.to_owned()),
        _ => lookup_fallback(keys, lookup),
    }
}

fn resolve_number<F>(
    diags: &mut Diagnostics,
    name: &str,
    value: &ValueNumber,
    keys: &[&str],
    lookup: &F,
) -> Option<Option<i64>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Value::Value(number) = value {
        return Some(Some(*number));
    }
    match lookup_fallback(keys, lookup) {
        None => Some(None),
        Some(raw) => match raw.trim().parse() {
            Ok(number) => Some(Some(number)),
            Err(_) => {
                diags.error(
                    "Invalid numeric setting",
                    format!("`{raw}` from {} is not a number", keys.join(" or ")),
                    AttributePath::new(name.to_string()),
                );
                None
            }
        },
    }
}

fn seconds(
    diags: &mut Diagnostics,
    name: &str,
    value: Option<i64>,
    default: Duration,
) -> Option<Duration> {
    match value {
        None => Some(default),
        Some(secs) => match u64::try_from(secs) {
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => {
                diags.error_short(
                    format!("`{name}` must not be negative"),
                    AttributePath::new(name.to_string()),
                );
                None
            }
        },
    }
}

impl<'a> ProviderConfig<'a> {
    fn check(&self, diags: &mut Diagnostics) {
        let token = self.iam_token.as_deref_option().is_some_and(|t| !t.is_empty());
        let refresh = self
            .iam_refresh_token
            .as_deref_option()
            .is_some_and(|t| !t.is_empty());
        if token != refresh {
            let attribute = if token { "iam_refresh_token" } else { "iam_token" };
            diags.error(
                "Incomplete IAM token pair",
                "`iam_token` and `iam_refresh_token` must be provided together",
                AttributePath::new(attribute),
            );
        }
        if let Some(visibility) = self.visibility.as_deref_option() {
            if visibility.parse::<Visibility>().is_err() {
                diags.error(
                    "Invalid visibility",
                    format!(
                        "`visibility` must be one of: {}",
                        Visibility::ALLOWED.join(", ")
                    ),
                    AttributePath::new("visibility"),
                );
            }
        }
    }

    /// Resolve every setting against its environment fallbacks
    fn resolve<F>(&self, diags: &mut Diagnostics, lookup: F) -> Option<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = &lookup;
        let api_key = resolve_string(
            &self.ibmcloud_api_key,
            &["IC_API_KEY", "IBMCLOUD_API_KEY"],
            lookup,
        )
        .or_else(|| {
            resolve_string(
                &self.bluemix_api_key,
                &["BM_API_KEY", "BLUEMIX_API_KEY"],
                lookup,
            )
        });
        let iam_token = resolve_string(
            &self.iam_token,
            &["IC_IAM_TOKEN", "IBMCLOUD_IAM_TOKEN"],
            lookup,
        );
        let iam_refresh_token = resolve_string(
            &self.iam_refresh_token,
            &["IC_IAM_REFRESH_TOKEN", "IBMCLOUD_IAM_REFRESH_TOKEN"],
            lookup,
        );
        if iam_token.is_some() != iam_refresh_token.is_some() {
            diags.root_error(
                "Incomplete IAM token pair",
                "`iam_token` and `iam_refresh_token` must be provided together",
            );
            return None;
        }

        let visibility = match resolve_string(
            &self.visibility,
            &["IC_VISIBILITY", "IBMCLOUD_VISIBILITY"],
            lookup,
        ) {
            None => Visibility::default(),
            Some(visibility) => visibility.parse().or_report_at(
                diags,
                "Invalid visibility",
                AttributePath::new("visibility"),
            )?,
        };

        let timeout = resolve_number(
            diags,
            "ibmcloud_timeout",
            &self.ibmcloud_timeout,
            &["IC_TIMEOUT", "IBMCLOUD_TIMEOUT"],
            lookup,
        )?;
        let max_retries = resolve_number(
            diags,
            "max_retries",
            &self.max_retries,
            &["MAX_RETRIES"],
            lookup,
        )?;
        let generation = resolve_number(
            diags,
            "generation",
            &self.generation,
            &["IC_GENERATION", "IBMCLOUD_GENERATION"],
            lookup,
        )?;
        let classic_timeout = resolve_number(
            diags,
            "iaas_classic_timeout",
            &self.iaas_classic_timeout,
            &["IAAS_CLASSIC_TIMEOUT"],
            lookup,
        )?;

        let max_retries = match max_retries {
            None => DEFAULT_MAX_RETRIES,
            Some(retries) => u32::try_from(retries).or_report_at(
                diags,
                "Invalid retry count",
                AttributePath::new("max_retries"),
            )?,
        };

        let config = Config {
            api_key,
            iam_token,
            iam_refresh_token,
            region: resolve_string(
                &self.region,
                &["IC_REGION", "IBMCLOUD_REGION", "BM_REGION", "BLUEMIX_REGION"],
                lookup,
            )
            .unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            zone: resolve_string(&self.zone, &["IC_ZONE", "IBMCLOUD_ZONE"], lookup),
            resource_group: resolve_string(
                &self.resource_group,
                &["IC_RESOURCE_GROUP", "IBMCLOUD_RESOURCE_GROUP"],
                lookup,
            ),
            visibility,
            endpoints_file: resolve_string(
                &self.endpoints_file_path,
                &["IBMCLOUD_ENDPOINTS_FILE_PATH", "IC_ENDPOINTS_FILE_PATH"],
                lookup,
            ),
            timeout: seconds(diags, "ibmcloud_timeout", timeout, DEFAULT_TIMEOUT)?,
            max_retries,
            generation: generation.unwrap_or(DEFAULT_GENERATION),
            classic_username: resolve_string(
                &self.iaas_classic_username,
                &["IAAS_CLASSIC_USERNAME"],
                lookup,
            ),
            classic_api_key: resolve_string(
                &self.iaas_classic_api_key,
                &["IAAS_CLASSIC_API_KEY"],
                lookup,
            ),
            classic_endpoint: resolve_string(
                &self.iaas_classic_endpoint_url,
                &["IAAS_CLASSIC_ENDPOINT_URL"],
                lookup,
            )
            .unwrap_or_else(|| DEFAULT_CLASSIC_ENDPOINT.to_owned()),
            classic_timeout: seconds(
                diags,
                "iaas_classic_timeout",
                classic_timeout,
                DEFAULT_TIMEOUT,
            )?,
            ..Default::default()
        };
        Some(config.with_environment(lookup))
    }
}

#[async_trait]
impl Provider for IbmProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "ibmcloud_api_key" => sensitive(optional(AttributeType::String, "The IBM Cloud API Key")),
                    "bluemix_api_key" => deprecated(sensitive(optional(AttributeType::String, "The Bluemix API Key, use `ibmcloud_api_key` instead"))),
                    "iam_token" => sensitive(optional(AttributeType::String, "IAM Authentication token")),
                    "iam_refresh_token" => sensitive(optional(AttributeType::String, "IAM Authentication refresh token")),
                    "region" => optional(AttributeType::String, "The IBM cloud Region (for example 'us-south')"),
                    "zone" => optional(AttributeType::String, "The IBM cloud Region zone (for example 'us-south-1') for power resources"),
                    "resource_group" => optional(AttributeType::String, "The Resource group id"),
                    "ibmcloud_timeout" => optional(AttributeType::Number, "The timeout (in seconds) to set for any IBM Cloud API calls made"),
                    "max_retries" => optional(AttributeType::Number, "The retry count to set for API calls"),
                    "generation" => optional(AttributeType::Number, "Generation of Virtual Private Cloud"),
                    "visibility" => optional(AttributeType::String, "Visibility of the provider if it is private or public"),
                    "endpoints_file_path" => optional(AttributeType::String, "Path of the file that contains private and public regional endpoints mapping"),
                    "iaas_classic_username" => optional(AttributeType::String, "The Classic Infrastructure API user name"),
                    "iaas_classic_api_key" => sensitive(optional(AttributeType::String, "The Classic Infrastructure API key")),
                    "iaas_classic_endpoint_url" => optional(AttributeType::String, "The Classic Infrastructure Endpoint"),
                    "iaas_classic_timeout" => optional(AttributeType::Number, "The timeout (in seconds) to set for any Classic Infrastructure API calls made"),
                },
                description: Description::plain("ibm"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        config.check(diags);

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        if !matches!(config.bluemix_api_key, Value::Null) {
            diags.root_warning(
                "Deprecated attribute",
                "`bluemix_api_key` is deprecated, use `ibmcloud_api_key` instead",
            );
        }
        let config = config.resolve(diags, |key| std::env::var(key).ok())?;
        tracing::debug!(%terraform_version, ?config, "configuring provider");

        let session = ClientSession::new(config)
            .await
            .or_report(diags, "Error configuring the IBM Cloud session")?;
        self.session.install(session);
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::DynamicResource>>> {
        let session = &self.session;
        Some(map! {
            "resource_group"      => IbmResourceGroupResource::new(session.clone()),
            "resource_instance"   => IbmResourceInstanceResource::new(session.clone()),
            "is_vpc"              => IbmIsVpcResource::new(session.clone()),
            "dns_zone"            => IbmDnsZoneResource::new(session.clone()),
            "dns_resource_record" => IbmDnsResourceRecordResource::new(session.clone()),
            "tg_gateway"          => IbmTgGatewayResource::new(session.clone()),
            "iam_access_group"    => IbmIamAccessGroupResource::new(session.clone()),
            "compute_ssh_key"     => IbmComputeSshKeyResource::new(session.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::DynamicDataSource>>> {
        let session = &self.session;
        Some(map! {
            "resource_group" => IbmResourceGroupDataSource::new(session.clone()),
            "is_vpc"         => IbmIsVpcDataSource::new(session.clone()),
            "dns_zones"      => IbmDnsZonesDataSource::new(session.clone()),
            "iam_auth_token" => IbmIamAuthTokenDataSource::new(session.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::utils::string_value;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn configured_values_win_over_environment() {
        let mut diags = Diagnostics::default();
        let provider = ProviderConfig {
            region: string_value("eu-de"),
            max_retries: Value::Value(3),
            ..Default::default()
        };
        let config = provider
            .resolve(
                &mut diags,
                env(&[
                    ("IC_REGION", "us-east"),
                    ("MAX_RETRIES", "7"),
                    ("IBMCLOUD_API_KEY", "key"),
                    ("IC_TIMEOUT", "120"),
                ]),
            )
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(config.region, "eu-de");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.generation, DEFAULT_GENERATION);
        assert_eq!(config.classic_endpoint, DEFAULT_CLASSIC_ENDPOINT);
    }

    #[test]
    fn ibmcloud_key_wins_over_bluemix() {
        let mut diags = Diagnostics::default();
        let provider = ProviderConfig {
            bluemix_api_key: string_value("old"),
            ..Default::default()
        };
        let config = provider
            .resolve(&mut diags, env(&[("IC_API_KEY", "new")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("new"));

        let config = provider.resolve(&mut diags, env(&[])).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("old"));
    }

    #[test]
    fn rejects_incomplete_token_pair() {
        let mut diags = Diagnostics::default();
        let provider = ProviderConfig {
            iam_token: string_value("token"),
            ..Default::default()
        };
        provider.check(&mut diags);
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        assert!(ProviderConfig::default()
            .resolve(&mut diags, env(&[("IC_IAM_REFRESH_TOKEN", "refresh")]))
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn rejects_invalid_visibility() {
        let mut diags = Diagnostics::default();
        let provider = ProviderConfig {
            visibility: string_value("internal"),
            ..Default::default()
        };
        provider.check(&mut diags);
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        let config = ProviderConfig::default()
            .resolve(&mut diags, env(&[("IBMCLOUD_VISIBILITY", "private")]))
            .unwrap();
        assert_eq!(config.visibility, Visibility::Private);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let mut diags = Diagnostics::default();
        assert!(ProviderConfig::default()
            .resolve(&mut diags, env(&[("IC_GENERATION", "two")]))
            .is_none());
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        let provider = ProviderConfig {
            iaas_classic_timeout: Value::Value(-1),
            ..Default::default()
        };
        assert!(provider.resolve(&mut diags, env(&[])).is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn registers_every_type() {
        let provider = IbmProvider::default();
        let mut diags = Diagnostics::default();
        let resources = provider.get_resources(&mut diags).unwrap();
        assert_eq!(resources.len(), 8);
        assert!(resources.contains_key("is_vpc"));
        let data_sources = provider.get_data_sources(&mut diags).unwrap();
        assert_eq!(data_sources.len(), 4);
        assert!(data_sources.contains_key("iam_auth_token"));
    }
}
