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
    session, string_value, ReportError, WithNormalize, WithSchema, WithValidate,
};

use super::api::AccessGroupRequest;
use super::state::AccessGroupState;

#[derive(Debug, Default, Clone)]
pub struct IbmIamAccessGroupResource {
    session: SessionHandle,
}

impl IbmIamAccessGroupResource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Resource for IbmIamAccessGroupResource {
    type State<'a> = AccessGroupState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(AccessGroupState::schema())
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
            .iam_access_groups_v2()
            .or_report(diags, "Error configuring the IAM Access Groups client")?;

        let id = state.id.as_str();
        let Some((group, etag)) = api
            .get(id)
            .await
            .or_not_found()
            .or_report(diags, "Error retrieving access group")?
        else {
            tracing::warn!(id, "access group not found, removing it from the state");
            return None;
        };

        let mut state = state.clone();
        state.set_group(group, etag);
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
        if state.name != prior_state.name || state.description != prior_state.description {
            state.version = Value::Unknown;
        }
        Some((state, prior_private_state, vec![]))
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
        let user = session
            .user_details()
            .or_report(diags, "Error fetching account details")?;
        let api = session
            .iam_access_groups_v2()
            .or_report(diags, "Error configuring the IAM Access Groups client")?;

        let created = api
            .create(
                &user.account_id,
                &AccessGroupRequest {
                    name: planned_state.name.as_str(),
                    description: planned_state.description.as_deref_option(),
                },
            )
            .await
            .or_report(diags, "Error creating access group")?;
        tracing::info!(id = %created.id, "access group created");

        let (group, etag) = api
            .get(&created.id)
            .await
            .or_report(diags, "Error retrieving access group")?;
        let mut state = planned_state.clone();
        state.set_group(group, etag);
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
            .iam_access_groups_v2()
            .or_report(diags, "Error configuring the IAM Access Groups client")?;
        let id = prior_state.id.as_str();

        let (_, etag) = api
            .get(id)
            .await
            .or_report(diags, "Error retrieving access group")?;
        let (group, etag) = api
            .update(
                id,
                etag.as_deref().unwrap_or("*"),
                &AccessGroupRequest {
                    name: planned_state.name.as_str(),
                    description: Some(planned_state.description.as_str()),
                },
            )
            .await
            .or_report(diags, "Error updating access group")?;

        let mut state = planned_state.clone();
        state.set_group(group, etag);
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
            .iam_access_groups_v2()
            .or_report(diags, "Error configuring the IAM Access Groups client")?;

        let id = state.id.as_str();
        if !api
            .exists(id)
            .await
            .or_report(diags, "Error retrieving access group")?
        {
            tracing::warn!(id, "access group was already deleted");
            return Some(());
        }
        api.delete(id)
            .await
            .or_not_found()
            .or_report(diags, "Error deleting access group")?;
        Some(())
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = AccessGroupState {
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
    use crate::test_utils::{mock_handle, MockResponse, MockServer};

    fn group_state<'a>() -> AccessGroupState<'a> {
        AccessGroupState {
            id: string_value("AccessGroupId-1"),
            name: string_value("admins"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn vanished_group_is_dropped_from_state() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmIamAccessGroupResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let read = resource
            .read(&mut diags, group_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert_eq!(server.requests_to("GET", "/v2/groups/AccessGroupId-1").len(), 1);
    }

    #[tokio::test]
    async fn destroying_a_vanished_group_succeeds() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmIamAccessGroupResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let destroyed = resource
            .destroy(&mut diags, group_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert_eq!(destroyed, Some(()));
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert!(server.requests_to("DELETE", "/v2/groups/AccessGroupId-1").is_empty());
    }

    #[tokio::test]
    async fn update_sends_the_read_etag() {
        let server = MockServer::builder()
            .with_iam_token()
            .on(
                "GET",
                "/v2/groups/AccessGroupId-1",
                MockResponse::json(200, json!({"id": "AccessGroupId-1", "name": "admins"}))
                    .with_header("etag", "\"1-abc\""),
            )
            .on(
                "PATCH",
                "/v2/groups/AccessGroupId-1",
                MockResponse::json(
                    200,
                    json!({"id": "AccessGroupId-1", "name": "operators", "description": "ops"}),
                )
                .with_header("etag", "\"2-def\""),
            )
            .start()
            .await;
        let resource = IbmIamAccessGroupResource::new(mock_handle(&server).await);

        let planned = AccessGroupState {
            name: string_value("operators"),
            description: string_value("ops"),
            ..group_state()
        };
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .update(
                &mut diags,
                group_state(),
                planned.clone(),
                planned,
                ValueEmpty::default(),
                ValueEmpty::default(),
            )
            .await
            .unwrap();
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert_eq!(state.version.as_str(), "\"2-def\"");

        let patch = &server.requests_to("PATCH", "/v2/groups/AccessGroupId-1")[0];
        assert_eq!(patch.header("if-match"), Some("\"1-abc\""));
        assert_eq!(patch.json(), json!({"name": "operators", "description": "ops"}));
    }

    #[tokio::test]
    async fn import_sets_the_id() {
        let resource = IbmIamAccessGroupResource::default();
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .import(&mut diags, "AccessGroupId-1".into())
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "AccessGroupId-1");
    }
}
