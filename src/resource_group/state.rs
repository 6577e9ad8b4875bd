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
    computed, option_value, optional, optional_computed, required, string_set, string_value,
    unknown_if_null, WithNormalize, WithSchema, WithValidate,
};

use super::api::ResourceGroup;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub tags: ValueList<ValueString<'a>>,
    #[serde(borrow = "'a")]
    pub crn: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub state: ValueString<'a>,
    pub default: ValueBool,
    #[serde(borrow = "'a")]
    pub quota_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub quota_url: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub payment_methods_url: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub teams_url: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub created_at: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub updated_at: ValueString<'a>,
}

impl<'a> WithSchema for ResourceState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Unique identifier of the resource group"),
                    "name" => required(AttributeType::String, "The name of the resource group"),
                    "tags" => optional_computed(string_set(), "Tags attached to the resource group"),
                    "crn" => computed(AttributeType::String, "The full CRN associated with the resource group"),
                    "state" => computed(AttributeType::String, "State of the resource group"),
                    "default" => computed(AttributeType::Bool, "Whether this is the default resource group of the account"),
                    "quota_id" => computed(AttributeType::String, "An alpha-numeric value identifying the quota ID associated with the resource group"),
                    "quota_url" => computed(AttributeType::String, "The URL to access the quota details"),
                    "payment_methods_url" => computed(AttributeType::String, "The URL to access the payment methods details"),
                    "teams_url" => computed(AttributeType::String, "The URL to access the team details"),
                    "created_at" => computed(AttributeType::String, "The date when the resource group was created"),
                    "updated_at" => computed(AttributeType::String, "The date when the resource group was last updated"),
                },
                description: Description::plain("Manage an IBM Cloud resource group"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for ResourceState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Some(name) = self.name.as_deref_option() {
            if name.trim().is_empty() {
                diags.error_short(
                    "`name` must not be empty",
                    attr_path.attribute("name"),
                );
            }
        }
    }
}

impl<'a> WithNormalize for ResourceState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        unknown_if_null(&mut self.id);
        unknown_if_null(&mut self.tags);
        unknown_if_null(&mut self.crn);
        unknown_if_null(&mut self.state);
        unknown_if_null(&mut self.default);
        unknown_if_null(&mut self.quota_id);
        unknown_if_null(&mut self.quota_url);
        unknown_if_null(&mut self.payment_methods_url);
        unknown_if_null(&mut self.teams_url);
        unknown_if_null(&mut self.created_at);
        unknown_if_null(&mut self.updated_at);
    }
}

impl<'a> ResourceState<'a> {
    pub(super) fn set_group(&mut self, group: ResourceGroup) {
        self.id = string_value(group.id);
        self.name = string_value(group.name);
        self.crn = option_value(group.crn);
        self.state = option_value(group.state);
        self.default = Value::Value(group.default);
        self.quota_id = option_value(group.quota_id);
        self.quota_url = option_value(group.quota_url);
        self.payment_methods_url = option_value(group.payment_methods_url);
        self.teams_url = option_value(group.teams_url);
        self.created_at = option_value(group.created_at);
        self.updated_at = option_value(group.updated_at);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub is_default: ValueBool,
    #[serde(borrow = "'a")]
    pub crn: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub state: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub account_id: ValueString<'a>,
}

impl<'a> WithSchema for DataSourceState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Unique identifier of the resource group"),
                    "name" => optional_computed(AttributeType::String, "Resource group name"),
                    "is_default" => optional(AttributeType::Bool, "Look up the default resource group of the account"),
                    "crn" => computed(AttributeType::String, "The full CRN associated with the resource group"),
                    "state" => computed(AttributeType::String, "State of the resource group"),
                    "account_id" => computed(AttributeType::String, "Account ID"),
                },
                description: Description::plain("Look up an IBM Cloud resource group"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for DataSourceState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if self.name.is_unknown() || self.is_default.is_unknown() {
            return;
        }
        let by_name = !self.name.is_null();
        let by_default = matches!(self.is_default, Value::Value(true));
        match (by_name, by_default) {
            (true, true) => diags.error_short(
                "Only one of `name` or `is_default` can be set",
                attr_path.attribute("is_default"),
            ),
            (false, false) => diags.root_error(
                "Missing resource group selector",
                "One of `name` or `is_default = true` must be set",
            ),
            _ => (),
        }
    }
}
