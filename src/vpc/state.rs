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

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueBool, ValueList, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::utils::{
    computed, option_value, optional_computed, required, string_set, string_value,
    timeouts_block, unknown_if_null, ValueTimeouts, WithNormalize, WithSchema, WithValidate,
};

use super::api::{Subnet, Vpc};

pub(super) const ADDRESS_PREFIX_MANAGEMENT: [&str; 2] = ["auto", "manual"];

lazy_static! {
    static ref NAME: Regex = Regex::new("^([a-z]|[a-z][-a-z0-9]*[a-z0-9])$").unwrap();
}

/// Check a VPC infrastructure name: lowercase letters, digits and dashes, at most 63 characters
pub(crate) fn validate_name(name: &str) -> Result<(), String> {
    if name.len() > 63 {
        return Err(format!("`{name}` is longer than 63 characters"));
    }
    if !NAME.is_match(name) {
        return Err(format!(
            "`{name}` must start with a lowercase letter, contain only lowercase letters, digits and dashes, and not end with a dash"
        ));
    }
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CseSourceAddress<'a> {
    #[serde(borrow = "'a")]
    pub address: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub zone_name: ValueString<'a>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetInfo<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub status: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub zone: ValueString<'a>,
    pub total_ipv4_address_count: ValueNumber,
    pub available_ipv4_address_count: ValueNumber,
}

fn cse_source_addresses_type() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::Object(HashMap::from([
        (String::from("address"), AttributeType::String),
        (String::from("zone_name"), AttributeType::String),
    ]))))
}

fn subnets_type() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::Object(HashMap::from([
        (String::from("id"), AttributeType::String),
        (String::from("name"), AttributeType::String),
        (String::from("status"), AttributeType::String),
        (String::from("zone"), AttributeType::String),
        (String::from("total_ipv4_address_count"), AttributeType::Number),
        (String::from("available_ipv4_address_count"), AttributeType::Number),
    ]))))
}

fn cse_source_addresses<'a>(vpc: &Vpc) -> ValueList<Value<CseSourceAddress<'a>>> {
    Value::Value(
        vpc.cse_source_ips
            .iter()
            .filter_map(|source| {
                Some(Value::Value(CseSourceAddress {
                    address: string_value(source.ip.as_ref()?.address.as_str()),
                    zone_name: option_value(source.zone.as_ref().and_then(|zone| zone.name.as_deref())),
                }))
            })
            .collect(),
    )
}

pub(super) fn subnets<'a>(subnets: Vec<Subnet>) -> ValueList<Value<SubnetInfo<'a>>> {
    Value::Value(
        subnets
            .into_iter()
            .map(|subnet| {
                Value::Value(SubnetInfo {
                    id: string_value(subnet.id),
                    name: string_value(subnet.name),
                    status: string_value(subnet.status),
                    zone: option_value(subnet.zone.and_then(|zone| zone.name)),
                    total_ipv4_address_count: Value::Value(subnet.total_ipv4_address_count),
                    available_ipv4_address_count: Value::Value(subnet.available_ipv4_address_count),
                })
            })
            .collect(),
    )
}

fn reference_id<'a>(reference: &Option<super::api::Reference>) -> ValueString<'a> {
    option_value(reference.as_ref().and_then(|reference| reference.id.as_deref()))
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub address_prefix_management: ValueString<'a>,
    pub classic_access: ValueBool,
    #[serde(borrow = "'a")]
    pub resource_group: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub tags: ValueList<ValueString<'a>>,
    #[serde(borrow = "'a")]
    pub status: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub crn: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub default_network_acl: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub default_security_group: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub default_routing_table: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub resource_group_name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub resource_controller_url: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub cse_source_addresses: ValueList<Value<CseSourceAddress<'a>>>,
    #[serde(borrow = "'a")]
    pub subnets: ValueList<Value<SubnetInfo<'a>>>,
    #[serde(borrow = "'a")]
    pub timeouts: ValueTimeouts<'a>,
}

impl<'a> WithSchema for ResourceState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Unique identifier of the VPC"),
                    "name" => required(AttributeType::String, "VPC name"),
                    "address_prefix_management" => optional_computed(AttributeType::String, "Address Prefix management value (`auto` or `manual`), only used at creation"),
                    "classic_access" => optional_computed(AttributeType::Bool, "Set to true if classic access needs to enabled to VPC"),
                    "resource_group" => optional_computed(AttributeType::String, "Resource group ID"),
                    "tags" => optional_computed(string_set(), "List of tags"),
                    "status" => computed(AttributeType::String, "VPC status"),
                    "crn" => computed(AttributeType::String, "The crn of the resource"),
                    "default_network_acl" => computed(AttributeType::String, "Default network ACL"),
                    "default_security_group" => computed(AttributeType::String, "Security group associated with VPC"),
                    "default_routing_table" => computed(AttributeType::String, "Default routing table associated with VPC"),
                    "resource_group_name" => computed(AttributeType::String, "The resource group name in which resource is provisioned"),
                    "resource_controller_url" => computed(AttributeType::String, "The URL of the IBM Cloud dashboard that can be used to explore and view details about this instance"),
                    "cse_source_addresses" => computed(cse_source_addresses_type(), "Cloud service endpoint source addresses"),
                    "subnets" => computed(subnets_type(), "Subnets of the VPC"),
                },
                blocks: map! {
                    "timeouts" => timeouts_block(),
                },
                description: Description::plain("Manage a Virtual Private Cloud"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for ResourceState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Some(name) = self.name.as_deref_option() {
            if let Err(err) = validate_name(name) {
                diags.error("Invalid VPC name", err, attr_path.clone().attribute("name"));
            }
        }
        if let Some(apm) = self.address_prefix_management.as_deref_option() {
            if !ADDRESS_PREFIX_MANAGEMENT.contains(&apm) {
                diags.error(
                    "Invalid `address_prefix_management`",
                    format!(
                        "`{apm}` is not one of: {}",
                        ADDRESS_PREFIX_MANAGEMENT.join(", ")
                    ),
                    attr_path.clone().attribute("address_prefix_management"),
                );
            }
        }
        self.timeouts
            .validate(diags, attr_path.attribute("timeouts"));
    }
}

impl<'a> WithNormalize for ResourceState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.address_prefix_management.is_null() {
            self.address_prefix_management = string_value("auto");
        }
        if self.classic_access.is_null() {
            self.classic_access = Value::Value(false);
        }
        unknown_if_null(&mut self.id);
        unknown_if_null(&mut self.resource_group);
        unknown_if_null(&mut self.tags);
        unknown_if_null(&mut self.status);
        unknown_if_null(&mut self.crn);
        unknown_if_null(&mut self.default_network_acl);
        unknown_if_null(&mut self.default_security_group);
        unknown_if_null(&mut self.default_routing_table);
        unknown_if_null(&mut self.resource_group_name);
        unknown_if_null(&mut self.resource_controller_url);
        unknown_if_null(&mut self.cse_source_addresses);
        unknown_if_null(&mut self.subnets);
    }
}

impl<'a> ResourceState<'a> {
    pub(super) fn set_vpc(&mut self, vpc: &Vpc) {
        self.id = string_value(vpc.id.as_str());
        self.name = string_value(vpc.name.as_str());
        self.classic_access = Value::Value(vpc.classic_access);
        self.status = string_value(vpc.status.as_str());
        self.crn = option_value(vpc.crn.as_deref());
        self.default_network_acl = reference_id(&vpc.default_network_acl);
        self.default_security_group = reference_id(&vpc.default_security_group);
        self.default_routing_table = reference_id(&vpc.default_routing_table);
        self.resource_group = reference_id(&vpc.resource_group);
        self.resource_group_name = option_value(
            vpc.resource_group
                .as_ref()
                .and_then(|group| group.name.as_deref()),
        );
        self.cse_source_addresses = cse_source_addresses(vpc);
        if self.address_prefix_management.is_null() || self.address_prefix_management.is_unknown() {
            self.address_prefix_management = string_value("auto");
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub classic_access: ValueBool,
    #[serde(borrow = "'a")]
    pub resource_group: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub tags: ValueList<ValueString<'a>>,
    #[serde(borrow = "'a")]
    pub status: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub crn: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub default_network_acl: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub default_security_group: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub default_routing_table: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub resource_group_name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub resource_controller_url: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub cse_source_addresses: ValueList<Value<CseSourceAddress<'a>>>,
    #[serde(borrow = "'a")]
    pub subnets: ValueList<Value<SubnetInfo<'a>>>,
}

impl<'a> WithSchema for DataSourceState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Unique identifier of the VPC"),
                    "name" => required(AttributeType::String, "Name of the VPC to look up"),
                    "classic_access" => computed(AttributeType::Bool, "Whether classic access is enabled"),
                    "resource_group" => computed(AttributeType::String, "Resource group ID"),
                    "tags" => computed(string_set(), "List of tags"),
                    "status" => computed(AttributeType::String, "VPC status"),
                    "crn" => computed(AttributeType::String, "The crn of the resource"),
                    "default_network_acl" => computed(AttributeType::String, "Default network ACL"),
                    "default_security_group" => computed(AttributeType::String, "Security group associated with VPC"),
                    "default_routing_table" => computed(AttributeType::String, "Default routing table associated with VPC"),
                    "resource_group_name" => computed(AttributeType::String, "The resource group name in which resource is provisioned"),
                    "resource_controller_url" => computed(AttributeType::String, "The URL of the IBM Cloud dashboard that can be used to explore and view details about this instance"),
                    "cse_source_addresses" => computed(cse_source_addresses_type(), "Cloud service endpoint source addresses"),
                    "subnets" => computed(subnets_type(), "Subnets of the VPC"),
                },
                description: Description::plain("Look up a Virtual Private Cloud by name"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for DataSourceState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Some(name) = self.name.as_deref_option() {
            if let Err(err) = validate_name(name) {
                diags.error("Invalid VPC name", err, attr_path.attribute("name"));
            }
        }
    }
}

impl<'a> DataSourceState<'a> {
    pub(super) fn set_vpc(&mut self, vpc: &Vpc) {
        self.id = string_value(vpc.id.as_str());
        self.name = string_value(vpc.name.as_str());
        self.classic_access = Value::Value(vpc.classic_access);
        self.status = string_value(vpc.status.as_str());
        self.crn = option_value(vpc.crn.as_deref());
        self.default_network_acl = reference_id(&vpc.default_network_acl);
        self.default_security_group = reference_id(&vpc.default_security_group);
        self.default_routing_table = reference_id(&vpc.default_routing_table);
        self.resource_group = reference_id(&vpc.resource_group);
        self.resource_group_name = option_value(
            vpc.resource_group
                .as_ref()
                .and_then(|group| group.name.as_deref()),
        );
        self.cse_source_addresses = cse_source_addresses(vpc);
    }
}
