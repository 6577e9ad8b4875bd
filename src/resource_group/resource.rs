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
use crate::tagging::{read_tags, resolve_tags, update_tags};
use crate::utils::{
    list_strings, session, string_value, ReportError, WithNormalize, WithSchema, WithValidate,
};

use super::state::ResourceState;

#[derive(Debug, Default, Clone)]
pub struct IbmResourceGroupResource {
    session: SessionHandle,
}

impl IbmResourceGroupResource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Resource for IbmResourceGroupResource {
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
            .resource_manager_v2()
            .or_report(diags, "Error configuring the Resource Manager client")?;

        let id = state.id.as_str();
        let Some(group) = api
            .get(id)
            .await
            .or_not_found()
            .or_report(diags, "Error retrieving resource group")?
        else {
            tracing::warn!(id, "resource group not found, removing it from the state");
            return None;
        };

        let mut state = state.clone();
        if let Some(crn) = group.crn.as_deref() {
            state.tags = read_tags(&session, diags, crn).await;
        }
        state.set_group(group);

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
        if state.name != prior_state.name || state.tags != prior_state.tags {
            state.updated_at = Value::Unknown;
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
            .resource_manager_v2()
            .or_report(diags, "Error configuring the Resource Manager client")?;

        let id = api
            .create(planned_state.name.as_str(), &user.account_id)
            .await
            .or_report_at(
                diags,
                "Error creating resource group",
                AttributePath::new("name"),
            )?;
        tracing::info!(id, "resource group created");

        let mut state = planned_state.clone();
        state.id = string_value(id.as_str());

        let group = api
            .get(&id)
            .await
            .or_report(diags, "Error retrieving resource group")?;
        if let Some(crn) = group.crn.as_deref() {
            update_tags(&session, diags, crn, &[], &list_strings(&planned_state.tags)).await;
            state.tags = resolve_tags(&session, diags, crn, &planned_state.tags).await;
        }
        state.set_group(group);

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
            .resource_manager_v2()
            .or_report(diags, "Error configuring the Resource Manager client")?;
        let id = prior_state.id.as_str();

        if planned_state.name != prior_state.name {
            api.rename(id, planned_state.name.as_str())
                .await
                .or_report_at(
                    diags,
                    "Error updating resource group",
                    AttributePath::new("name"),
                )?;
        }

        let mut state = planned_state.clone();
        let group = api
            .get(id)
            .await
            .or_report(diags, "Error retrieving resource group")?;
        if let Some(crn) = group.crn.as_deref() {
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
        state.set_group(group);

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
            .resource_manager_v2()
            .or_report(diags, "Error configuring the Resource Manager client")?;

        let id = state.id.as_str();
        if !api
            .exists(id)
            .await
            .or_report(diags, "Error retrieving resource group")?
        {
            tracing::warn!(id, "resource group was already deleted");
            return Some(());
        }
        api.delete(id)
            .await
            .or_not_found()
            .or_report(diags, "Error deleting resource group")?;
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
    use crate::test_utils::{mock_handle, MockResponse, MockServer};
    use crate::utils::string_list;

    fn group_state<'a>() -> ResourceState<'a> {
        ResourceState {
            id: string_value("rg-1"),
            name: string_value("team"),
            ..Default::default()
        }
    }

    fn group() -> MockResponse {
        MockResponse::json(
            200,
            json!({"id": "rg-1", "name": "team", "crn": "crn:rg-1", "state": "ACTIVE"}),
        )
    }

    #[tokio::test]
    async fn vanished_group_is_dropped_from_state() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmResourceGroupResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let read = resource
            .read(&mut diags, group_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    }

    #[tokio::test]
    async fn destroying_a_vanished_group_succeeds() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmResourceGroupResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let destroyed = resource
            .destroy(&mut diags, group_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert_eq!(destroyed, Some(()));
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert!(server.requests_to("DELETE", "/v2/resource_groups/rg-1").is_empty());
    }

    #[tokio::test]
    async fn destroy_deletes_existing_group() {
        let server = MockServer::builder()
            .with_iam_token()
            .on("GET", "/v2/resource_groups/rg-1", group())
            .on("DELETE", "/v2/resource_groups/rg-1", MockResponse::empty(204))
            .start()
            .await;
        let resource = IbmResourceGroupResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let destroyed = resource
            .destroy(&mut diags, group_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert_eq!(destroyed, Some(()));
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert_eq!(server.requests_to("DELETE", "/v2/resource_groups/rg-1").len(), 1);
    }

    #[tokio::test]
    async fn create_attaches_configured_tags() {
        let server = MockServer::builder()
            .with_iam_token()
            .on(
                "POST",
                "/v2/resource_groups",
                MockResponse::json(201, json!({"id": "rg-1"})),
            )
            .on("GET", "/v2/resource_groups/rg-1", group())
            .on("POST", "/v3/tags/attach", MockResponse::json(200, json!({"results": []})))
            .start()
            .await;
        let resource = IbmResourceGroupResource::new(mock_handle(&server).await);

        let planned = ResourceState {
            name: string_value("team"),
            tags: string_list(["env:dev", "owner:ops"]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .create(
                &mut diags,
                planned.clone(),
                planned,
                ValueEmpty::default(),
                ValueEmpty::default(),
            )
            .await
            .unwrap();
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert!(diags.warnings.is_empty(), "{:?}", diags.warnings);
        assert_eq!(state.id.as_str(), "rg-1");
        assert_eq!(state.crn.as_str(), "crn:rg-1");
        assert_eq!(list_strings(&state.tags), ["env:dev", "owner:ops"]);

        let create = server.requests_to("POST", "/v2/resource_groups");
        assert_eq!(create[0].json(), json!({"name": "team", "account_id": "acct-1"}));

        let attach = server.requests_to("POST", "/v3/tags/attach");
        assert_eq!(attach.len(), 1);
        let body = attach[0].json();
        assert_eq!(body["resources"], json!([{"resource_id": "crn:rg-1"}]));
        let mut names: Vec<_> = body["tag_names"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|name| name.as_str())
            .collect();
        names.sort_unstable();
        assert_eq!(names, ["env:dev", "owner:ops"]);
        assert!(server.requests_to("POST", "/v3/tags/detach").is_empty());
    }

    #[tokio::test]
    async fn update_detaches_removed_tags() {
        let server = MockServer::builder()
            .with_iam_token()
            .on("GET", "/v2/resource_groups/rg-1", group())
            .on("POST", "/v3/tags/attach", MockResponse::json(200, json!({"results": []})))
            .on("POST", "/v3/tags/detach", MockResponse::json(200, json!({"results": []})))
            .start()
            .await;
        let resource = IbmResourceGroupResource::new(mock_handle(&server).await);

        let prior = ResourceState {
            tags: string_list(["env:dev", "owner:ops"]),
            ..group_state()
        };
        let planned = ResourceState {
            tags: string_list(["env:dev", "tier:gold"]),
            ..group_state()
        };
        let mut diags = Diagnostics::default();
        resource
            .update(
                &mut diags,
                prior,
                planned.clone(),
                planned,
                ValueEmpty::default(),
                ValueEmpty::default(),
            )
            .await
            .unwrap();
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert!(server.requests_to("PATCH", "/v2/resource_groups/rg-1").is_empty());

        let detach = server.requests_to("POST", "/v3/tags/detach");
        assert_eq!(detach[0].json()["tag_names"], json!(["owner:ops"]));
        let attach = server.requests_to("POST", "/v3/tags/attach");
        assert_eq!(attach[0].json()["tag_names"], json!(["tier:gold"]));
    }

    #[tokio::test]
    async fn import_sets_the_id() {
        let resource = IbmResourceGroupResource::default();
        let mut diags = Diagnostics::default();
        let (state, _) = resource.import(&mut diags, "rg-1".into()).await.unwrap();
        assert_eq!(state.id.as_str(), "rg-1");
        assert!(state.name.is_null());
    }
}
