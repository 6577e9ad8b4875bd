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
use crate::session::{ClientSession, SessionHandle};
use crate::tagging::{read_tags, resolve_tags, update_tags};
use crate::utils::{
    force_new, list_strings, session, string_value, timeout, Operation, ReportError,
    WithNormalize, WithSchema, WithValidate,
};
use crate::wait::{StateChangeConf, WaitError, DEFAULT_OPERATION_TIMEOUT};

use super::api::{
    CreateVpc, ResourceGroupIdentity, Vpc, VpcApi, AVAILABLE, DELETED, DELETING, FAILED, PENDING,
    RETRY, UPDATING,
};
use super::state::{subnets, ResourceState};

#[derive(Debug, Default, Clone)]
pub struct IbmIsVpcResource {
    session: SessionHandle,
}

impl IbmIsVpcResource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

pub(super) async fn wait_for_available(
    api: &VpcApi,
    id: &str,
    timeout: Duration,
) -> Result<Vpc, WaitError> {
    StateChangeConf::polling(&[PENDING], &[AVAILABLE, FAILED], timeout)
        .wait_for_state(move || async move {
            let vpc = api.get_vpc(id).await?;
            let status = match vpc.status.as_str() {
                UPDATING => PENDING.to_owned(),
                status => status.to_owned(),
            };
            Ok(Some((vpc, status)))
        })
        .await
}

pub(super) async fn wait_for_deleted(
    api: &VpcApi,
    id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    StateChangeConf::polling(&[RETRY, DELETING], &[DELETED, FAILED], timeout)
        .wait_for_state(move || async move {
            match api.get_vpc(id).await.or_not_found()? {
                None => Ok(Some(((), DELETED.to_owned()))),
                Some(_) => Ok(Some(((), DELETING.to_owned()))),
            }
        })
        .await
}

/// Console URL listing the VPCs
pub(super) fn controller_url<'a>(session: &ClientSession) -> tf_provider::value::ValueString<'a> {
    match session.base_controller() {
        Ok(base) => string_value(format!("{base}/vpc-ext/network/vpcs")),
        Err(_) => Value::Null,
    }
}

impl IbmIsVpcResource {
    /// Refresh the state from the VPC and its subnets
    async fn refresh<'a>(
        session: &ClientSession,
        api: &VpcApi,
        diags: &mut Diagnostics,
        state: &mut ResourceState<'a>,
        vpc: &Vpc,
    ) -> Option<()> {
        state.set_vpc(vpc);
        state.resource_controller_url = controller_url(session);
        let list = api
            .subnets(&vpc.id)
            .await
            .or_report(diags, "Error fetching subnets")?;
        state.subnets = subnets(list);
        Some(())
    }
}

#[async_trait]
impl Resource for IbmIsVpcResource {
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
            .vpc_v1()
            .or_report(diags, "Error configuring the VPC client")?;

        let id = state.id.as_str();
        let Some(vpc) = api
            .get_vpc(id)
            .await
            .or_not_found()
            .or_report(diags, "Error getting VPC")?
        else {
            tracing::warn!(id, "VPC not found, removing it from the state");
            return None;
        };

        let mut state = state.clone();
        if let Some(crn) = vpc.crn.as_deref() {
            state.tags = read_tags(&session, diags, crn).await;
        }
        Self::refresh(&session, &api, diags, &mut state, &vpc).await?;

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
        // only applied at creation
        state.address_prefix_management = prior_state.address_prefix_management.clone();
        if state.classic_access.is_null() {
            state.classic_access = Value::Value(false);
        }

        let replace = force_new([
            (
                "classic_access",
                state.classic_access != prior_state.classic_access,
            ),
            (
                "resource_group",
                !state.resource_group.is_unknown() && state.resource_group != prior_state.resource_group,
            ),
        ]);
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
            .vpc_v1()
            .or_report(diags, "Error configuring the VPC client")?;

        let resource_group = planned_state
            .resource_group
            .as_deref_option()
            .map(str::to_owned)
            .or_else(|| session.config().resource_group.clone());
        let created = api
            .create_vpc(&CreateVpc {
                name: planned_state.name.as_str(),
                address_prefix_management: planned_state.address_prefix_management.as_deref_option(),
                classic_access: matches!(planned_state.classic_access, Value::Value(true)),
                resource_group: resource_group
                    .as_deref()
                    .map(|id| ResourceGroupIdentity { id }),
            })
            .await
            .or_report(diags, "Error while creating VPC")?;
        tracing::info!(id = %created.id, "VPC created");

        let vpc = wait_for_available(
            &api,
            &created.id,
            timeout(&planned_state.timeouts, Operation::Create, DEFAULT_OPERATION_TIMEOUT),
        )
        .await
        .or_report(
            diags,
            &format!("Error waiting for VPC ({}) to be available", created.id),
        )?;
        if vpc.status == FAILED {
            diags.root_error(
                "Error creating VPC",
                format!("VPC ({}) is in failed status", vpc.id),
            );
            return None;
        }

        let mut state = planned_state.clone();
        if let Some(crn) = vpc.crn.as_deref() {
            update_tags(&session, diags, crn, &[], &list_strings(&planned_state.tags)).await;
            state.tags = resolve_tags(&session, diags, crn, &planned_state.tags).await;
        }
        Self::refresh(&session, &api, diags, &mut state, &vpc).await?;

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
            .vpc_v1()
            .or_report(diags, "Error configuring the VPC client")?;
        let id = prior_state.id.as_str();

        let vpc = if planned_state.name != prior_state.name {
            api.rename_vpc(id, planned_state.name.as_str())
                .await
                .or_report_at(diags, "Error Updating VPC", AttributePath::new("name"))?
        } else {
            api.get_vpc(id)
                .await
                .or_report(diags, "Error getting VPC")?
        };

        let mut state = planned_state.clone();
        if let Some(crn) = vpc.crn.as_deref() {
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
        Self::refresh(&session, &api, diags, &mut state, &vpc).await?;

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
            .vpc_v1()
            .or_report(diags, "Error configuring the VPC client")?;

        let id = state.id.as_str();
        if !api
            .vpc_exists(id)
            .await
            .or_report(diags, "Error getting VPC")?
        {
            tracing::warn!(id, "VPC was already deleted");
            return Some(());
        }
        if api
            .delete_vpc(id)
            .await
            .or_not_found()
            .or_report(diags, "Error Deleting VPC")?
            .is_none()
        {
            return Some(());
        }

        wait_for_deleted(
            &api,
            id,
            timeout(&state.timeouts, Operation::Delete, DEFAULT_OPERATION_TIMEOUT),
        )
        .await
        .or_report(diags, &format!("Error waiting for VPC ({id}) to be deleted"))?;
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::{ApiClient, Auth, RetryPolicy};
    use crate::test_utils::{http, mock_handle, MockResponse, MockServer};

    fn api(server: &MockServer) -> VpcApi {
        VpcApi::new(
            ApiClient::new(http(), &server.url(), Auth::None, RetryPolicy::default()).unwrap(),
        )
    }

    fn vpc(status: &str) -> MockResponse {
        MockResponse::json(200, json!({"id": "vpc-1", "name": "vpc", "status": status}))
    }

    #[tokio::test(start_paused = true)]
    async fn intermediate_statuses_are_pending() {
        let server = MockServer::builder()
            .route("GET", "/vpcs/vpc-1", [vpc("pending"), vpc("updating"), vpc("available")])
            .start()
            .await;

        let found = wait_for_available(&api(&server), "vpc-1", Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(found.status, AVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn deletion_ends_on_not_found() {
        let server = MockServer::builder()
            .route("GET", "/vpcs/vpc-1", [vpc("deleting"), MockResponse::empty(404)])
            .start()
            .await;

        wait_for_deleted(&api(&server), "vpc-1", Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(server.requests_to("GET", "/vpcs/vpc-1").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_statuses_end_the_wait() {
        let server = MockServer::builder()
            .route("GET", "/vpcs/vpc-1", [vpc("pending"), vpc("deleting")])
            .start()
            .await;

        let err = wait_for_available(&api(&server), "vpc-1", Duration::from_secs(600))
            .await
            .unwrap_err();
        assert!(
            matches!(err, WaitError::UnexpectedState { ref state, .. } if state == DELETING),
            "{err}"
        );
    }

    fn vpc_state<'a>() -> ResourceState<'a> {
        ResourceState {
            id: string_value("vpc-1"),
            name: string_value("vpc"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn vanished_vpc_is_dropped_from_state() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmIsVpcResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let read = resource
            .read(&mut diags, vpc_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert_eq!(server.requests_to("GET", "/v1/vpcs/vpc-1").len(), 1);
    }

    #[tokio::test]
    async fn destroying_a_vanished_vpc_succeeds() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmIsVpcResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let destroyed = resource
            .destroy(&mut diags, vpc_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert_eq!(destroyed, Some(()));
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert!(server.requests_to("DELETE", "/v1/vpcs/vpc-1").is_empty());
    }

    #[tokio::test]
    async fn read_refreshes_vpc_and_tags() {
        let server = MockServer::builder()
            .with_iam_token()
            .on(
                "GET",
                "/v1/vpcs/vpc-1",
                MockResponse::json(
                    200,
                    json!({"id": "vpc-1", "name": "renamed", "status": "available", "crn": "crn:vpc-1"}),
                ),
            )
            .on("GET", "/v1/subnets", MockResponse::json(200, json!({"subnets": []})))
            .on(
                "GET",
                "/v3/tags",
                MockResponse::json(200, json!({"items": [{"name": "env:dev"}]})),
            )
            .start()
            .await;
        let resource = IbmIsVpcResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .read(&mut diags, vpc_state(), ValueEmpty::default(), ValueEmpty::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert_eq!(state.name.as_str(), "renamed");
        assert_eq!(list_strings(&state.tags), ["env:dev"]);
    }

    #[tokio::test]
    async fn import_sets_the_id() {
        let resource = IbmIsVpcResource::default();
        let mut diags = Diagnostics::default();
        let (state, _) = resource.import(&mut diags, "vpc-1".into()).await.unwrap();
        assert_eq!(state.id.as_str(), "vpc-1");
    }
}
