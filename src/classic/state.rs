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
    computed, option_value, optional, required, string_value, unknown_if_null, WithNormalize,
    WithSchema, WithValidate,
};

use super::api::SshKey;

const KEY_TYPES: [&str; 6] = [
    "ssh-rsa",
    "ssh-dss",
    "ssh-ed25519",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub label: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub public_key: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub notes: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub fingerprint: ValueString<'a>,
}

impl<'a> WithSchema for ResourceState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Numeric identifier of the SSH key"),
                    "label" => required(AttributeType::String, "Label of the SSH key"),
                    "public_key" => required(AttributeType::String, "Public key in OpenSSH format"),
                    "notes" => optional(AttributeType::String, "Additional notes about the key"),
                    "fingerprint" => computed(AttributeType::String, "Fingerprint of the public key"),
                },
                description: Description::plain("Manage an SSH key of the classic infrastructure"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for ResourceState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Some(key) = self.public_key.as_deref_option() {
            let key_type = key.split_whitespace().next().unwrap_or_default();
            if !KEY_TYPES.contains(&key_type) {
                diags.error(
                    "Invalid public key",
                    format!("`public_key` must start with one of: {}", KEY_TYPES.join(", ")),
                    attr_path.attribute("public_key"),
                );
            }
        }
    }
}

impl<'a> WithNormalize for ResourceState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        unknown_if_null(&mut self.id);
        unknown_if_null(&mut self.fingerprint);
    }
}

impl<'a> ResourceState<'a> {
    pub(super) fn set_key(&mut self, key: SshKey) {
        if let Some(id) = key.id {
            self.id = string_value(id.to_string());
        }
        self.label = string_value(key.label);
        // The API appends a trailing newline when the key lacks one
        if self.public_key.as_deref_option().map(str::trim) != Some(key.key.trim()) {
            self.public_key = string_value(key.key);
        }
        self.notes = option_value(key.notes.filter(|notes| !notes.is_empty()));
        self.fingerprint = option_value(key.fingerprint);
    }
}
