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

use std::time::Duration;

use async_trait::async_trait;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{schema::Schema, AttributePath, Diagnostics, Resource};

use crate::client::OrNotFound;
use crate::session::SessionHandle;
use crate::tagging::{read_tags, resolve_tags, update_tags};
use crate::utils::{
    force_new, list_strings, session, string_value, timeout, Operation, ReportError,
    WithNormalize, WithSchema, WithValidate,
};
use crate::wait::{StateChangeConf, WaitError};

use super::api::{
    CreateGateway, ResourceGroupIdentity, TransitGateway, TransitGatewayApi, UpdateGateway,
    AVAILABLE, DELETED, DELETING, FAILED, PENDING,
};
use super::state::ResourceState;

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Default, Clone)]
pub struct IbmTgGatewayResource {
    session: SessionHandle,
}

impl IbmTgGatewayResource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

async fn wait_for_available(
    api: &TransitGatewayApi,
    id: &str,
    timeout: Duration,
) -> Result<TransitGateway, WaitError> {
    StateChangeConf::polling(&[PENDING], &[AVAILABLE, FAILED], timeout)
        .wait_for_state(move || async move {
            let gateway = api.get(id).await?;
            let status = gateway.status.clone();
            Ok(Some((gateway, status)))
        })
        .await
}

async fn wait_for_deleted(
    api: &TransitGatewayApi,
    id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    StateChangeConf::polling(&[DELETING], &[DELETED], timeout)
        .wait_for_state(move || async move {
            match api.get(id).await.or_not_found()? {
                None => Ok(Some(((), DELETED.to_owned()))),
                Some(gateway) => Ok(Some(((), gateway.status))),
            }
        })
        .await
}

#[async_trait]
impl Resource for IbmTgGatewayResource {
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
            .transit_gateway_v1()
            .or_report(diags, "Error configuring the Transit Gateway client")?;

        let id = state.id.as_str();
        let Some(gateway) = api
            .get(id)
            .await
            .or_not_found()
            .or_report(diags, "Error while retrieving transit gateway")?
        else {
            tracing::warn!(id, "transit gateway not found, removing it from the state");
            return None;
        };

        let mut state = state.clone();
        if let Some(crn) = gateway.crn.as_deref() {
            state.tags = read_tags(&session, diags, crn).await;
        }
        state.set_gateway(gateway);
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
        if state.global.is_null() {
            state.global = Value::Value(false);
        }
        let replace = force_new([
            ("location", state.location != prior_state.location),
            (
                "resource_group",
                !state.resource_group.is_unknown()
                    && state.resource_group != prior_state.resource_group,
            ),
        ]);
        if state.name != prior_state.name || state.global != prior_state.global {
            state.updated_at = Value::Unknown;
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
            .transit_gateway_v1()
            .or_report(diags, "Error configuring the Transit Gateway client")?;

        let resource_group = planned_state
            .resource_group
            .as_deref_option()
            .map(str::to_owned)
            .or_else(|| session.config().resource_group.clone());
        let created = api
            .create(&CreateGateway {
                name: planned_state.name.as_str(),
                location: planned_state.location.as_str(),
                global: matches!(planned_state.global, Value::Value(true)),
                resource_group: resource_group
                    .as_deref()
                    .map(|id| ResourceGroupIdentity { id }),
            })
            .await
            .or_report(diags, "Create Transit Gateway err")?;
        tracing::info!(id = %created.id, "transit gateway created");

        let gateway = wait_for_available(
            &api,
            &created.id,
            timeout(&planned_state.timeouts, Operation::Create, GATEWAY_TIMEOUT),
        )
        .await
        .or_report(
            diags,
            &format!("Error waiting for transit gateway ({}) to be available", created.id),
        )?;
        if gateway.status == FAILED {
            diags.root_error(
                "Error creating transit gateway",
                format!("Transit gateway ({}) is in failed status", gateway.id),
            );
            return None;
        }

        let mut state = planned_state.clone();
        if let Some(crn) = gateway.crn.as_deref() {
            update_tags(&session, diags, crn, &[], &list_strings(&planned_state.tags)).await;
            state.tags = resolve_tags(&session, diags, crn, &planned_state.tags).await;
        }
        state.set_gateway(gateway);
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
            .transit_gateway_v1()
            .or_report(diags, "Error configuring the Transit Gateway client")?;
        let id = prior_state.id.as_str();

        let mut request = UpdateGateway::default();
        if planned_state.name != prior_state.name {
            request.name = planned_state.name.as_deref_option();
        }
        if planned_state.global != prior_state.global {
            request.global = planned_state.global.as_ref_option().copied();
        }

        let gateway = if request.name.is_some() || request.global.is_some() {
            api.update(id, &request)
                .await
                .or_report(diags, "Error while updating transit gateway")?
        } else {
            api.get(id)
                .await
                .or_report(diags, "Error while retrieving transit gateway")?
        };

        let mut state = planned_state.clone();
        if let Some(crn) = gateway.crn.as_deref() {
            if planned_state.tags != prior_state.tags {
                update_tags(
                    &session,
                    diags,
                    crn,
                    &list_strings(&prior_state.tags),
                    &list_strings(&planned_state.tags),
                )
                .await;
            }
            state.tags = resolve_tags(&session, diags, crn, &planned_state.tags).await;
        }
        state.set_gateway(gateway);
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
            .transit_gateway_v1()
            .or_report(diags, "Error configuring the Transit Gateway client")?;

        let id = state.id.as_str();
        if !api
            .exists(id)
            .await
            .or_report(diags, "Error while retrieving transit gateway")?
        {
            tracing::warn!(id, "transit gateway was already deleted");
            return Some(());
        }
        if api
            .delete(id)
            .await
            .or_not_found()
            .or_report(diags, "Error deleting transit gateway")?
            .is_none()
        {
            return Some(());
        }

        wait_for_deleted(
            &api,
            id,
            timeout(&state.timeouts, Operation::Delete, GATEWAY_TIMEOUT),
        )
        .await
        .or_report(
            diags,
            &format!("Error waiting for transit gateway ({id}) to be deleted"),
        )?;
        Some(())
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = ResourceState {
            id: string_value(id),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}
