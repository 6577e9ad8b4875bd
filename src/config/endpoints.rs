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
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::Config;

pub const CLOUD_ENDPOINT: &str = "cloud.ibm.com";

/// Which network the service endpoints are reached through
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    PublicAndPrivate,
}

impl Visibility {
    pub const ALLOWED: [&'static str; 3] = ["public", "private", "public-and-private"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::PublicAndPrivate => "public-and-private",
        }
    }

    fn is_private(&self) -> bool {
        !matches!(self, Visibility::Public)
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "public-and-private" => Ok(Visibility::PublicAndPrivate),
            _ => Err(format!("unsupported visibility `{s}`")),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend API families a session can build clients for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Service {
    IamIdentity,
    IamAccessGroups,
    ResourceManager,
    ResourceController,
    GlobalCatalog,
    GlobalTagging,
    Vpc,
    PrivateDns,
    TransitGateway,
    ClassicInfrastructure,
}

impl Service {
    pub const ALL: [Service; 10] = [
        Service::IamIdentity,
        Service::IamAccessGroups,
        Service::ResourceManager,
        Service::ResourceController,
        Service::GlobalCatalog,
        Service::GlobalTagging,
        Service::Vpc,
        Service::PrivateDns,
        Service::TransitGateway,
        Service::ClassicInfrastructure,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Service::IamIdentity => "IAM Identity",
            Service::IamAccessGroups => "IAM Access Groups",
            Service::ResourceManager => "Resource Manager",
            Service::ResourceController => "Resource Controller",
            Service::GlobalCatalog => "Global Catalog",
            Service::GlobalTagging => "Global Tagging",
            Service::Vpc => "VPC Infrastructure",
            Service::PrivateDns => "Private DNS",
            Service::TransitGateway => "Transit Gateway",
            Service::ClassicInfrastructure => "Classic Infrastructure",
        }
    }

    /// Environment variable (and endpoints file key) overriding the service URL
    pub fn env_key(self) -> Option<&'static str> {
        match self {
            Service::IamIdentity | Service::IamAccessGroups => Some("IBMCLOUD_IAM_API_ENDPOINT"),
            Service::ResourceManager => Some("IBMCLOUD_RESOURCE_MANAGEMENT_API_ENDPOINT"),
            Service::ResourceController => Some("IBMCLOUD_RESOURCE_CONTROLLER_API_ENDPOINT"),
            Service::GlobalCatalog => Some("IBMCLOUD_RESOURCE_CATALOG_API_ENDPOINT"),
            Service::GlobalTagging => Some("IBMCLOUD_GT_API_ENDPOINT"),
            Service::Vpc => Some("IBMCLOUD_IS_NG_API_ENDPOINT"),
            Service::PrivateDns => Some("IBMCLOUD_PRIVATE_DNS_API_ENDPOINT"),
            Service::TransitGateway => Some("IBMCLOUD_TG_API_ENDPOINT"),
            Service::ClassicInfrastructure => None,
        }
    }

    fn default_url(self, region: &str, visibility: Visibility, classic_endpoint: &str) -> String {
        let private = visibility.is_private();
        let us_region = matches!(region, "us-south" | "us-east");
        match self {
            Service::IamIdentity | Service::IamAccessGroups => match (private, us_region) {
                (false, _) => construct_endpoint("iam", CLOUD_ENDPOINT),
                (true, true) => construct_endpoint(&format!("private.{region}.iam"), CLOUD_ENDPOINT),
                (true, false) => construct_endpoint("private.iam", CLOUD_ENDPOINT),
            },
            Service::ResourceManager | Service::ResourceController => {
                match (visibility, us_region) {
                    (Visibility::Public, _) | (Visibility::PublicAndPrivate, false) => {
                        construct_endpoint("resource-controller", CLOUD_ENDPOINT)
                    }
                    (_, true) => construct_endpoint(
                        &format!("private.{region}.resource-controller"),
                        CLOUD_ENDPOINT,
                    ),
                    (Visibility::Private, false) => {
                        construct_endpoint("private.us-south.resource-controller", CLOUD_ENDPOINT)
                    }
                }
            }
            Service::GlobalCatalog if private => construct_endpoint(
                "private.globalcatalog",
                &format!("{CLOUD_ENDPOINT}/api/v1"),
            ),
            Service::GlobalCatalog => {
                construct_endpoint("globalcatalog", &format!("{CLOUD_ENDPOINT}/api/v1"))
            }
            Service::GlobalTagging if private => {
                let region = if us_region { region } else { "us-south" };
                construct_endpoint(
                    &format!("tags.private.{region}"),
                    &format!("global-search-tagging.{CLOUD_ENDPOINT}"),
                )
            }
            Service::GlobalTagging => construct_endpoint(
                "tags",
                &format!("global-search-tagging.{CLOUD_ENDPOINT}"),
            ),
            Service::Vpc if private => construct_endpoint(
                &format!("{region}.private.iaas"),
                &format!("{CLOUD_ENDPOINT}/v1"),
            ),
            Service::Vpc => {
                construct_endpoint(&format!("{region}.iaas"), &format!("{CLOUD_ENDPOINT}/v1"))
            }
            Service::PrivateDns if private => {
                construct_endpoint("api.private.dns-svcs", &format!("{CLOUD_ENDPOINT}/v1"))
            }
            Service::PrivateDns => {
                construct_endpoint("api.dns-svcs", &format!("{CLOUD_ENDPOINT}/v1"))
            }
            Service::TransitGateway if private => {
                construct_endpoint("private.transit", &format!("{CLOUD_ENDPOINT}/v1"))
            }
            Service::TransitGateway => {
                construct_endpoint("transit", &format!("{CLOUD_ENDPOINT}/v1"))
            }
            Service::ClassicInfrastructure if private => {
                String::from("https://api.service.softlayer.com/rest/v3")
            }
            Service::ClassicInfrastructure => classic_endpoint.to_owned(),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn construct_endpoint(subdomain: &str, domain: &str) -> String {
    format!("https://{subdomain}.{domain}")
}

/// Endpoint overrides loaded from `endpoints_file_path`
///
/// The file maps an endpoint key to a visibility, then to a region:
/// `{"IBMCLOUD_IS_NG_API_ENDPOINT": {"private": {"us-south": "https://..."}}}`
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct EndpointsFile(BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>);

impl EndpointsFile {
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub async fn load(path: &str) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(&content)?)
    }

    fn lookup(&self, key: &str, visibility: Visibility, region: &str) -> Option<&str> {
        self.0
            .get(key)?
            .get(visibility.as_str())?
            .get(region)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }
}

/// Normalize an endpoint given through the environment
pub fn env_endpoint(value: &str) -> String {
    if value.contains("https://") {
        value.to_owned()
    } else {
        format!("https://{value}/v1")
    }
}

/// Resolve the URL of a service: defaults, then endpoints file, then environment
pub fn resolve(service: Service, config: &Config, file: Option<&EndpointsFile>) -> String {
    let mut url = service.default_url(
        &config.region,
        config.visibility,
        &config.classic_endpoint,
    );

    let Some(key) = service.env_key() else {
        return url;
    };

    if config.visibility != Visibility::PublicAndPrivate {
        if let Some(found) = file.and_then(|file| file.lookup(key, config.visibility, &config.region))
        {
            url = found.to_owned();
        }
    }

    if let Some(value) = config.endpoint_overrides.get(key) {
        url = env_endpoint(value);
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(region: &str, visibility: Visibility) -> Config {
        Config {
            region: region.to_owned(),
            visibility,
            ..Default::default()
        }
    }

    #[test]
    fn public_defaults() {
        let config = config("eu-de", Visibility::Public);
        assert_eq!(
            resolve(Service::Vpc, &config, None),
            "https://eu-de.iaas.cloud.ibm.com/v1"
        );
        assert_eq!(
            resolve(Service::IamIdentity, &config, None),
            "https://iam.cloud.ibm.com"
        );
        assert_eq!(
            resolve(Service::GlobalCatalog, &config, None),
            "https://globalcatalog.cloud.ibm.com/api/v1"
        );
        assert_eq!(
            resolve(Service::ClassicInfrastructure, &config, None),
            "https://api.softlayer.com/rest/v3"
        );
    }

    #[test]
    fn private_endpoints_depend_on_region() {
        let us = config("us-east", Visibility::Private);
        let eu = config("eu-gb", Visibility::Private);
        assert_eq!(
            resolve(Service::IamIdentity, &us, None),
            "https://private.us-east.iam.cloud.ibm.com"
        );
        assert_eq!(
            resolve(Service::IamIdentity, &eu, None),
            "https://private.iam.cloud.ibm.com"
        );
        assert_eq!(
            resolve(Service::ResourceManager, &eu, None),
            "https://private.us-south.resource-controller.cloud.ibm.com"
        );
        assert_eq!(
            resolve(Service::GlobalTagging, &eu, None),
            "https://tags.private.us-south.global-search-tagging.cloud.ibm.com"
        );
        assert_eq!(
            resolve(Service::Vpc, &eu, None),
            "https://eu-gb.private.iaas.cloud.ibm.com/v1"
        );
    }

    #[test]
    fn public_and_private_keeps_public_resource_manager_outside_us() {
        let eu = config("eu-de", Visibility::PublicAndPrivate);
        assert_eq!(
            resolve(Service::ResourceController, &eu, None),
            "https://resource-controller.cloud.ibm.com"
        );
        let us = config("us-south", Visibility::PublicAndPrivate);
        assert_eq!(
            resolve(Service::ResourceController, &us, None),
            "https://private.us-south.resource-controller.cloud.ibm.com"
        );
    }

    #[test]
    fn endpoints_file_overrides_defaults() {
        let file = EndpointsFile::parse(
            r#"{
                "IBMCLOUD_IS_NG_API_ENDPOINT": {
                    "private": {"us-south": "https://vpc.example.com/v1"},
                    "public": {"us-south": ""}
                }
            }"#,
        )
        .unwrap();

        let private = config("us-south", Visibility::Private);
        assert_eq!(
            resolve(Service::Vpc, &private, Some(&file)),
            "https://vpc.example.com/v1"
        );

        // Empty entries are ignored
        let public = config("us-south", Visibility::Public);
        assert_eq!(
            resolve(Service::Vpc, &public, Some(&file)),
            "https://us-south.iaas.cloud.ibm.com/v1"
        );

        // Not consulted for public-and-private
        let both = config("us-south", Visibility::PublicAndPrivate);
        assert_eq!(
            resolve(Service::Vpc, &both, Some(&file)),
            "https://us-south.private.iaas.cloud.ibm.com/v1"
        );
    }

    #[test]
    fn environment_wins() {
        let mut config = config("us-south", Visibility::Public);
        config
            .endpoint_overrides
            .insert("IBMCLOUD_TG_API_ENDPOINT".into(), "tg.example.com".into());
        config.endpoint_overrides.insert(
            "IBMCLOUD_PRIVATE_DNS_API_ENDPOINT".into(),
            "https://dns.example.com/api".into(),
        );
        assert_eq!(
            resolve(Service::TransitGateway, &config, None),
            "https://tg.example.com/v1"
        );
        assert_eq!(
            resolve(Service::PrivateDns, &config, None),
            "https://dns.example.com/api"
        );
    }

    #[test]
    fn visibility_parsing() {
        assert_eq!(
            "public-and-private".parse::<Visibility>(),
            Ok(Visibility::PublicAndPrivate)
        );
        assert!("internal".parse::<Visibility>().is_err());
    }
}
