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
use tf_provider::value::ValueString;
use tf_provider::{map, AttributePath, Diagnostics};

use crate::utils::{
    computed, option_value, optional, required, sensitive, string_value, unknown_if_null,
    WithNormalize, WithSchema, WithValidate,
};

use super::api::AccessGroup;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroupState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub description: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub version: ValueString<'a>,
}

impl<'a> WithSchema for AccessGroupState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Unique identifier of the access group"),
                    "name" => required(AttributeType::String, "Name of the access group"),
                    "description" => optional(AttributeType::String, "Description of the access group"),
                    "version" => computed(AttributeType::String, "Version of the access group, as its ETag"),
                },
                description: Description::plain("Manage an IAM access group"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for AccessGroupState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Some(name) = self.name.as_deref_option() {
            if name.trim().is_empty() || name.len() > 100 {
                diags.error(
                    "Invalid access group name",
                    "The name must be between 1 and 100 characters",
                    attr_path.attribute("name"),
                );
            }
        }
    }
}

impl<'a> WithNormalize for AccessGroupState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        unknown_if_null(&mut self.id);
        unknown_if_null(&mut self.version);
    }
}

impl<'a> AccessGroupState<'a> {
    pub(super) fn set_group(&mut self, group: AccessGroup, etag: Option<String>) {
        self.id = string_value(group.id);
        self.name = string_value(group.name);
        self.description = option_value(group.description.filter(|d| !d.is_empty()));
        self.version = option_value(etag);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokenState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub iam_access_token: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub iam_refresh_token: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub account_id: ValueString<'a>,
}

impl<'a> WithSchema for AuthTokenState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Identifier of the authenticated user"),
                    "iam_access_token" => sensitive(computed(AttributeType::String, "IAM access token, as an `Authorization` header value")),
                    "iam_refresh_token" => sensitive(computed(AttributeType::String, "IAM refresh token")),
                    "account_id" => computed(AttributeType::String, "Account of the authenticated user"),
                },
                description: Description::plain("IAM tokens of the provider session"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for AuthTokenState<'a> {
    fn validate(&self, _diags: &mut Diagnostics, _attr_path: AttributePath) {}
}
