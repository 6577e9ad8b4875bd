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
use tf_provider::{schema::Schema, AttributePath, Diagnostics, Resource};

use crate::client::OrNotFound;
use crate::session::SessionHandle;
use crate::utils::{
    force_new, session, string_value, ReportError, WithNormalize, WithSchema, WithValidate,
};

use super::api::SshKey;
use super::state::ResourceState;

#[derive(Debug, Default, Clone)]
pub struct IbmComputeSshKeyResource {
    session: SessionHandle,
}

impl IbmComputeSshKeyResource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Resource for IbmComputeSshKeyResource {
    type State<'a> = ResourceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ResourceState::schema())
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
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let session = session(&self.session, diags)?;
        let api = session
            .classic_infrastructure()
            .or_report(diags, "Error configuring the classic infrastructure client")?;

        let id = state.id.as_str();
        let Some(key) = api
            .get_ssh_key(id)
            .await
            .or_not_found()
            .or_report(diags, "Error retrieving SSH key")?
        else {
            tracing::warn!(id, "SSH key not found, removing it from the state");
            return None;
        };

        let mut state = state.clone();
        state.set_key(key);
        Some((state, private_state))
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.normalize(diags);
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        let key_changed = state.public_key.as_deref_option().map(str::trim)
            != prior_state.public_key.as_deref_option().map(str::trim);
        if key_changed {
            state.id = Value::Unknown;
            state.fingerprint = Value::Unknown;
        } else {
            state.public_key = prior_state.public_key;
        }
        Some((
            state,
            prior_private_state,
            force_new([("public_key", key_changed)]),
        ))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let session = session(&self.session, diags)?;
        let api = session
            .classic_infrastructure()
            .or_report(diags, "Error configuring the classic infrastructure client")?;

        let created = api
            .create_ssh_key(&SshKey {
                label: planned_state.label.as_str().to_owned(),
                key: planned_state.public_key.as_str().to_owned(),
                notes: planned_state.notes.as_deref_option().map(str::to_owned),
                ..Default::default()
            })
            .await
            .or_report(diags, "Error creating SSH key")?;
        tracing::info!(id = ?created.id, label = %created.label, "SSH key created");

        let mut state = planned_state.clone();
        state.set_key(created);
        Some((state, private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let session = session(&self.session, diags)?;
        let api = session
            .classic_infrastructure()
            .or_report(diags, "Error configuring the classic infrastructure client")?;
        let id = prior_state.id.as_str();

        api.edit_ssh_key(
            id,
            planned_state.label.as_str(),
            planned_state.notes.as_str(),
        )
        .await
        .or_report(diags, "Error editing SSH key")?;
        let key = api
            .get_ssh_key(id)
            .await
            .or_report(diags, "Error retrieving SSH key")?;

        let mut state = planned_state.clone();
        state.set_key(key);
        Some((state, private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let session = session(&self.session, diags)?;
        let api = session
            .classic_infrastructure()
            .or_report(diags, "Error configuring the classic infrastructure client")?;

        let id = state.id.as_str();
        if !api
            .ssh_key_exists(id)
            .await
            .or_report(diags, "Error retrieving SSH key")?
        {
            tracing::warn!(id, "SSH key was already deleted");
            return Some(());
        }
        api.delete_ssh_key(id)
            .await
            .or_not_found()
            .or_report(diags, "Error deleting SSH key")?;
        Some(())
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        if id.parse::<u64>().is_err() {
            diags.root_error(
                "Invalid import identifier",
                format!("SSH key identifiers are numeric, got `{id}`"),
            );
            return None;
        }
        let state = ResourceState {
            id: string_value(id),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}
