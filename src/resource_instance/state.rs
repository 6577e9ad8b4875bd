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
use tf_provider::schema::{AttributeType, Block, Description, Schema};
use tf_provider::value::{ValueList, ValueMap, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::flex::flatten_json;
use crate::utils::{
    computed, option_value, optional, optional_computed, required, string_map, string_map_value,
    string_set, string_value, timeouts_block, unknown_if_null, ValueTimeouts, WithNormalize,
    WithSchema, WithValidate,
};

use super::api::ResourceInstance;

pub(super) const SERVICE_ENDPOINTS: [&str; 3] = ["public", "private", "public-and-private"];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub service: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub plan: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub location: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub resource_group_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub parameters: ValueMap<'a, ValueString<'a>>,
    #[serde(borrow = "'a")]
    pub service_endpoints: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub tags: ValueList<ValueString<'a>>,
    #[serde(borrow = "'a")]
    pub status: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub crn: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub guid: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub dashboard_url: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub extensions: ValueMap<'a, ValueString<'a>>,
    #[serde(borrow = "'a")]
    pub resource_group_name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub resource_controller_url: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub timeouts: ValueTimeouts<'a>,
}

impl<'a> WithSchema for ResourceState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "The CRN of the resource instance"),
                    "name" => required(AttributeType::String, "A name for the resource instance"),
                    "service" => required(AttributeType::String, "The name of the service offering like cloud-object-storage, kms etc"),
                    "plan" => required(AttributeType::String, "The plan type of the service"),
                    "location" => required(AttributeType::String, "The location where the instance is available"),
                    "resource_group_id" => optional_computed(AttributeType::String, "The resource group id"),
                    "parameters" => optional(string_map(), "Arbitrary parameters to pass. Must be a JSON object"),
                    "service_endpoints" => optional_computed(AttributeType::String, "Types of the service endpoints. Possible values are 'public', 'private', 'public-and-private'"),
                    "tags" => optional_computed(string_set(), "Tags attached to the resource instance"),
                    "status" => computed(AttributeType::String, "Status of resource instance"),
                    "crn" => computed(AttributeType::String, "CRN of resource instance"),
                    "guid" => computed(AttributeType::String, "Guid of resource instance"),
                    "dashboard_url" => computed(AttributeType::String, "Dashboard URL to access resource"),
                    "extensions" => computed(string_map(), "The extended metadata as a map associated with the resource instance"),
                    "resource_group_name" => computed(AttributeType::String, "The resource group name in which resource is provisioned"),
                    "resource_controller_url" => computed(AttributeType::String, "The URL of the IBM Cloud dashboard that can be used to explore and view details about the resource"),
                },
                blocks: map! {
                    "timeouts" => timeouts_block(),
                },
                description: Description::plain("Manage an IBM Cloud service instance through the resource controller"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for ResourceState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Some(endpoints) = self.service_endpoints.as_deref_option() {
            if !SERVICE_ENDPOINTS.contains(&endpoints) {
                diags.error(
                    "Invalid `service_endpoints`",
                    format!(
                        "`{endpoints}` is not one of: {}",
                        SERVICE_ENDPOINTS.join(", ")
                    ),
                    attr_path.clone().attribute("service_endpoints"),
                );
            }
        }
        self.timeouts
            .validate(diags, attr_path.attribute("timeouts"));
    }
}

impl<'a> WithNormalize for ResourceState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        unknown_if_null(&mut self.id);
        unknown_if_null(&mut self.resource_group_id);
        unknown_if_null(&mut self.service_endpoints);
        unknown_if_null(&mut self.tags);
        unknown_if_null(&mut self.status);
        unknown_if_null(&mut self.crn);
        unknown_if_null(&mut self.guid);
        unknown_if_null(&mut self.dashboard_url);
        unknown_if_null(&mut self.extensions);
        unknown_if_null(&mut self.resource_group_name);
        unknown_if_null(&mut self.resource_controller_url);
    }
}

impl<'a> ResourceState<'a> {
    /// Copy the attributes the controller reports about the instance
    pub(super) fn set_instance(&mut self, instance: &ResourceInstance) {
        self.id = string_value(instance.id.as_str());
        self.name = string_value(instance.name.as_str());
        self.status = option_value(instance.state.as_deref());
        self.crn = option_value(instance.crn.as_deref());
        self.guid = option_value(instance.guid.as_deref());
        self.dashboard_url = option_value(instance.dashboard_url.as_deref());
        if let Some(location) = instance.region_id.as_deref() {
            self.location = string_value(location);
        }
        if let Some(group) = instance.resource_group_id.as_deref() {
            self.resource_group_id = string_value(group);
        }
        self.extensions = string_map_value(
            instance
                .extensions
                .as_ref()
                .map(flatten_json)
                .unwrap_or_default(),
        );
        if let Some(endpoints) = instance
            .parameters
            .as_ref()
            .and_then(|parameters| parameters.get("service-endpoints"))
            .and_then(|endpoints| endpoints.as_str())
        {
            self.service_endpoints = string_value(endpoints);
        } else if self.service_endpoints.is_unknown() {
            self.service_endpoints = ValueString::Null;
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn instance_is_flattened() {
        let instance: ResourceInstance = serde_json::from_value(json!({
            "id": "crn:v1:bluemix:public:cloud-object-storage:global:a/1:guid::",
            "guid": "guid",
            "crn": "crn:v1:bluemix:public:cloud-object-storage:global:a/1:guid::",
            "name": "cos",
            "region_id": "global",
            "resource_group_id": "rg-1",
            "state": "active",
            "parameters": {"service-endpoints": "private"},
            "extensions": {"endpoints": {"public": "s3.example.com"}, "ha": true},
        }))
        .unwrap();

        let mut state = ResourceState::default();
        state.normalize(&mut Diagnostics::default());
        state.set_instance(&instance);

        assert_eq!(state.status.as_str(), "active");
        assert_eq!(state.location.as_str(), "global");
        assert_eq!(state.service_endpoints.as_str(), "private");
        let extensions = state.extensions.as_ref_option().unwrap();
        assert_eq!(extensions["endpoints.public"].as_str(), "s3.example.com");
        assert_eq!(extensions["ha"].as_str(), "true");
        assert!(state.dashboard_url.is_null());
    }

    #[test]
    fn endpoints_are_validated() {
        let state = ResourceState {
            service_endpoints: Value::Value("internal".into()),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default());
        assert_eq!(diags.errors.len(), 1);
    }
}
