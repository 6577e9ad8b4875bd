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
use crate::flex::id_parts;
use crate::session::SessionHandle;
use crate::utils::{
    force_new, session, string_value, ReportError, WithNormalize, WithSchema, WithValidate,
};

use super::api::{CreateZone, UpdateZone};
use super::state::ZoneState;

#[derive(Debug, Default, Clone)]
pub struct IbmDnsZoneResource {
    session: SessionHandle,
}

impl IbmDnsZoneResource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Resource for IbmDnsZoneResource {
    type State<'a> = ZoneState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ZoneState::schema())
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
            .private_dns_v1()
            .or_report(diags, "Error configuring the DNS Services client")?;

        let id = state.id.as_str();
        let parts = id_parts(id, 2).or_report_at(diags, "Invalid zone ID", AttributePath::new("id"))?;
        let (instance_id, zone_id) = (parts[0], parts[1]);
        let Some(zone) = api
            .get_zone(instance_id, zone_id)
            .await
            .or_not_found()
            .or_report(diags, "Error fetching pdns zone")?
        else {
            tracing::warn!(id, "DNS zone not found, removing it from the state");
            return None;
        };

        let mut new_state = state.clone();
        new_state.set_zone(instance_id, zone);
        Some((new_state, private_state))
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
        let replace = force_new([
            ("instance_id", state.instance_id != prior_state.instance_id),
            ("name", state.name != prior_state.name),
        ]);
        if state.description != prior_state.description || state.label != prior_state.label {
            state.modified_on = Value::Unknown;
        }
        Some((state, prior_private_state, replace))
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
            .private_dns_v1()
            .or_report(diags, "Error configuring the DNS Services client")?;

        let instance_id = planned_state.instance_id.as_str();
        let zone = api
            .create_zone(
                instance_id,
                &CreateZone {
                    name: planned_state.name.as_str(),
                    description: planned_state.description.as_deref_option(),
                    label: planned_state.label.as_deref_option(),
                },
            )
            .await
            .or_report(diags, "Error creating pdns zone")?;
        tracing::info!(instance_id, zone = %zone.id, "DNS zone created");

        let mut state = planned_state.clone();
        state.set_zone(instance_id, zone);
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
            .private_dns_v1()
            .or_report(diags, "Error configuring the DNS Services client")?;

        let instance_id = prior_state.instance_id.as_str();
        let zone = api
            .update_zone(
                instance_id,
                prior_state.zone_id.as_str(),
                &UpdateZone {
                    description: planned_state.description.as_str(),
                    label: planned_state.label.as_str(),
                },
            )
            .await
            .or_report(diags, "Error updating pdns zone")?;

        let mut state = planned_state.clone();
        state.set_zone(instance_id, zone);
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
            .private_dns_v1()
            .or_report(diags, "Error configuring the DNS Services client")?;

        let instance_id = state.instance_id.as_str();
        let zone_id = state.zone_id.as_str();
        if !api
            .zone_exists(instance_id, zone_id)
            .await
            .or_report(diags, "Error fetching pdns zone")?
        {
            tracing::warn!(instance_id, zone_id, "DNS zone was already deleted");
            return Some(());
        }
        api.delete_zone(instance_id, zone_id)
            .await
            .or_not_found()
            .or_report(diags, "Error deleting pdns zone")?;
        Some(())
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = ZoneState {
            id: string_value(id),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}
