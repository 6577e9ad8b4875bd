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
use tf_provider::value::{Value, ValueBool, ValueList, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::utils::{
    computed, option_value, optional_computed, required, string_set, string_value,
    timeouts_block, unknown_if_null, ValueTimeouts, WithNormalize, WithSchema, WithValidate,
};

use super::api::TransitGateway;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub location: ValueString<'a>,
    pub global: ValueBool,
    #[serde(borrow = "'a")]
    pub resource_group: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub tags: ValueList<ValueString<'a>>,
    #[serde(borrow = "'a")]
    pub crn: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub status: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub created_at: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub updated_at: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub timeouts: ValueTimeouts<'a>,
}

impl<'a> WithSchema for ResourceState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Unique identifier of the gateway"),
                    "name" => required(AttributeType::String, "Name Transit Gateway Services"),
                    "location" => required(AttributeType::String, "Location of Transit Gateway Services"),
                    "global" => optional_computed(AttributeType::Bool, "Allow global routing for a Transit Gateway. If unspecified, the default value is false"),
                    "resource_group" => optional_computed(AttributeType::String, "The resource group ID"),
                    "tags" => optional_computed(string_set(), "Tags for the transit gateway instance"),
                    "crn" => computed(AttributeType::String, "The CRN of the gateway"),
                    "status" => computed(AttributeType::String, "The status of the gateway"),
                    "created_at" => computed(AttributeType::String, "The creation time of the resource"),
                    "updated_at" => computed(AttributeType::String, "The updation time of the resource"),
                },
                blocks: map! {
                    "timeouts" => timeouts_block(),
                },
                description: Description::plain("Manage a Transit Gateway"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for ResourceState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Some(name) = self.name.as_deref_option() {
            if name.is_empty() || name.len() > 63 {
                diags.error(
                    "Invalid gateway name",
                    "The name must be between 1 and 63 characters",
                    attr_path.clone().attribute("name"),
                );
            }
        }
        self.timeouts
            .validate(diags, attr_path.attribute("timeouts"));
    }
}

impl<'a> WithNormalize for ResourceState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.global.is_null() {
            self.global = Value::Value(false);
        }
        unknown_if_null(&mut self.id);
        unknown_if_null(&mut self.resource_group);
        unknown_if_null(&mut self.tags);
        unknown_if_null(&mut self.crn);
        unknown_if_null(&mut self.status);
        unknown_if_null(&mut self.created_at);
        unknown_if_null(&mut self.updated_at);
    }
}

impl<'a> ResourceState<'a> {
    pub(super) fn set_gateway(&mut self, gateway: TransitGateway) {
        self.id = string_value(gateway.id);
        self.name = string_value(gateway.name);
        self.location = string_value(gateway.location);
        self.global = Value::Value(gateway.global);
        self.resource_group = option_value(gateway.resource_group.map(|group| group.id));
        self.crn = option_value(gateway.crn);
        self.status = string_value(gateway.status);
        self.created_at = option_value(gateway.created_at);
        self.updated_at = option_value(gateway.updated_at);
    }
}
