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

use async_trait::async_trait;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::schema::Schema;
use tf_provider::{AttributePath, DataSource, Diagnostics};

use crate::session::SessionHandle;
use crate::utils::{option_value, session, string_value, ReportError, WithSchema, WithValidate};

use super::api::ListQuery;
use super::state::DataSourceState;

#[derive(Debug, Default, Clone)]
pub struct IbmResourceGroupDataSource {
    session: SessionHandle,
}

impl IbmResourceGroupDataSource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait]
impl DataSource for IbmResourceGroupDataSource {
    type State<'a> = DataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(DataSourceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags, AttributePath::default());

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let session = session(&self.session, diags)?;
        let user = session
            .user_details()
            .or_report(diags, "Error fetching account details")?;
        let api = session
            .resource_manager_v2()
            .or_report(diags, "Error configuring the Resource Manager client")?;

        let name = config.name.as_deref_option();
        let default = matches!(config.is_default, Value::Value(true));
        let groups = api
            .list(ListQuery {
                account_id: Some(&user.account_id),
                name,
                default: default && name.is_none(),
            })
            .await
            .or_report(diags, "Error retrieving resource groups")?;

        let Some(group) = groups.into_iter().next() else {
            match name {
                Some(name) => diags.error(
                    "Resource group not found",
                    format!("No resource group named `{name}` in the account"),
                    AttributePath::new("name"),
                ),
                None => diags.root_error(
                    "Resource group not found",
                    "The account has no default resource group",
                ),
            }
            return None;
        };

        let mut state = config.clone();
        state.id = string_value(group.id);
        state.name = string_value(group.name);
        state.crn = option_value(group.crn);
        state.state = option_value(group.state);
        state.account_id = option_value(group.account_id);
        Some(state)
    }
}
