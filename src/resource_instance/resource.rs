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

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{schema::Schema, AttributePath, Diagnostics, Resource};

use crate::client::OrNotFound;
use crate::flex::expand_parameters;
use crate::session::{ClientSession, SessionHandle};
use crate::tagging::{read_tags, resolve_tags, update_tags};
use crate::utils::{
    force_new, list_strings, map_strings, session, string_value, timeout, DisplayJoinable,
    Operation, ReportError, WithNormalize, WithSchema, WithValidate,
};
use crate::wait::{StateChangeConf, WaitError, DEFAULT_OPERATION_TIMEOUT};

use super::api::{
    CreateInstance, ResourceControllerApi, ResourceInstance, UpdateInstance, ACTIVE, FAILED,
    INACTIVE, IN_PROGRESS, PENDING_RECLAMATION, PROVISIONING, REMOVED,
};
use super::catalog::{select_deployment, GlobalCatalogApi};
use super::state::ResourceState;

#[derive(Debug, Default, Clone)]
pub struct IbmResourceInstanceResource {
    session: SessionHandle,
}

impl IbmResourceInstanceResource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

async fn wait_for_active(
    api: &ResourceControllerApi,
    id: &str,
    pending: &[&str],
    timeout: Duration,
) -> Result<ResourceInstance, WaitError> {
    StateChangeConf::polling(pending, &[ACTIVE], timeout)
        .wait_for_state(move || async move {
            let instance = api.get(id).await?;
            if instance.state() == FAILED {
                bail!("resource instance {id} failed: {}", instance.failure());
            }
            let state = instance.state().to_owned();
            Ok(Some((instance, state)))
        })
        .await
}

async fn wait_for_removal(
    api: &ResourceControllerApi,
    id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    StateChangeConf::polling(
        &[IN_PROGRESS, INACTIVE, ACTIVE],
        &[REMOVED, PENDING_RECLAMATION],
        timeout,
    )
    .wait_for_state(move || async move {
        match api.get(id).await.or_not_found()? {
            None => Ok(Some(((), REMOVED.to_owned()))),
            Some(instance) if instance.state() == FAILED => {
                bail!("resource instance {id} failed: {}", instance.failure())
            }
            Some(instance) => Ok(Some(((), instance.state().to_owned()))),
        }
    })
    .await
}

/// Provisioning parameters, including the requested service endpoints
fn parameters(state: &ResourceState) -> Map<String, JsonValue> {
    let mut parameters = expand_parameters(map_strings(&state.parameters));
    if let Some(endpoints) = state.service_endpoints.as_deref_option() {
        parameters.insert(
            String::from("service-endpoints"),
            JsonValue::String(endpoints.to_owned()),
        );
    }
    parameters
}

/// Id of the plan named `plan` of the service named `service`
async fn find_plan_id(
    catalog: &GlobalCatalogApi,
    diags: &mut Diagnostics,
    service: &str,
    plan: &str,
) -> Option<String> {
    let offering = catalog
        .find_service(service)
        .await
        .or_report(diags, "Error retrieving service offering")?;
    let Some(offering) = offering else {
        diags.error(
            "Error retrieving service offering",
            format!("No service offering named `{service}` in the global catalog"),
            AttributePath::new("service"),
        );
        return None;
    };
    if !offering.rc_provisionable() {
        diags.error(
            "Service offering cannot be provisioned",
            format!("{service} cannot be provisioned by resource controller"),
            AttributePath::new("service"),
        );
        return None;
    }

    let plans = catalog
        .plans(&offering.id)
        .await
        .or_report(diags, "Error retrieving service plans")?;
    match plans.into_iter().find(|candidate| candidate.name == plan) {
        Some(plan) => Some(plan.id),
        None => {
            diags.error(
                "Error retrieving plan",
                format!("No plan named `{plan}` for the service `{service}`"),
                AttributePath::new("plan"),
            );
            None
        }
    }
}

/// Fill the attributes derived from other services: catalog names, group name and console URL
async fn set_details(
    session: &ClientSession,
    diags: &mut Diagnostics,
    state: &mut ResourceState<'_>,
    instance: &ResourceInstance,
) {
    state.set_instance(instance);

    match session.global_catalog_v1() {
        Ok(catalog) => {
            let plan = async {
                match instance.resource_plan_id.as_deref() {
                    Some(id) => Some(catalog.get(id).await),
                    None => None,
                }
            };
            let service = async {
                match instance.resource_id.as_deref() {
                    Some(id) => Some(catalog.get(id).await),
                    None => None,
                }
            };
            let (plan, service) = futures::join!(plan, service);
            for (entry, target) in [(plan, &mut state.plan), (service, &mut state.service)] {
                match entry {
                    Some(Ok(entry)) => *target = string_value(entry.name),
                    Some(Err(err)) => {
                        tracing::warn!(id = %instance.id, "error retrieving catalog entry: {err}");
                        diags.root_warning("Unable to read catalog entry", err.to_string());
                    }
                    None => (),
                }
            }
        }
        Err(err) => diags.root_warning("Unable to configure the Global Catalog client", err.to_string()),
    }

    state.resource_group_name = Value::Null;
    if let Some(group) = instance.resource_group_id.as_deref() {
        let name = match session.resource_manager_v2() {
            Ok(api) => api.get(group).await.map(|group| group.name).map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        match name {
            Ok(name) => state.resource_group_name = string_value(name),
            Err(err) => {
                tracing::warn!(group, "error retrieving resource group name: {err}");
                diags.root_warning("Unable to read resource group", err);
            }
        }
    }

    state.resource_controller_url = match (session.base_controller(), instance.crn.as_deref()) {
        (Ok(base), Some(crn)) => string_value(format!(
            "{base}/services/{}",
            url::form_urlencoded::byte_serialize(crn.as_bytes()).collect::<String>()
        )),
        _ => Value::Null,
    };
}

#[async_trait]
impl Resource for IbmResourceInstanceResource {
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
            .resource_controller_v2()
            .or_report(diags, "Error configuring the Resource Controller client")?;

        let id = state.id.as_str();
        let instance = api
            .get(id)
            .await
            .or_not_found()
            .or_report(diags, "Error retrieving resource instance")?;
        let instance = match instance {
            Some(instance) if !instance.is_removed() => instance,
            _ => {
                tracing::warn!(id, "resource instance not found, removing it from the state");
                return None;
            }
        };

        let mut state = state.clone();
        if let Some(crn) = instance.crn.as_deref() {
            state.tags = read_tags(&session, diags, crn).await;
        }
        set_details(&session, diags, &mut state, &instance).await;

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
        let replace = force_new([
            ("service", state.service != prior_state.service),
            ("location", state.location != prior_state.location),
            (
                "resource_group_id",
                !state.resource_group_id.is_unknown()
                    && state.resource_group_id != prior_state.resource_group_id,
            ),
        ]);

        if state.name != prior_state.name
            || state.plan != prior_state.plan
            || state.parameters != prior_state.parameters
            || state.service_endpoints != prior_state.service_endpoints
        {
            state.status = Value::Unknown;
            state.dashboard_url = Value::Unknown;
            state.extensions = Value::Unknown;
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
        let catalog = session
            .global_catalog_v1()
            .or_report(diags, "Error configuring the Global Catalog client")?;
        let api = session
            .resource_controller_v2()
            .or_report(diags, "Error configuring the Resource Controller client")?;

        let service = planned_state.service.as_str();
        let plan = planned_state.plan.as_str();
        let location = planned_state.location.as_str();

        let plan_id = find_plan_id(&catalog, diags, service, plan).await?;
        let deployments = catalog
            .deployments(&plan_id)
            .await
            .or_report(diags, "Error retrieving deployment for plan")?;
        let deployment = match select_deployment(&deployments, location) {
            Ok(deployment) => deployment,
            Err(supported) => {
                diags.error(
                    "No deployment found",
                    format!(
                        "No deployment found for service plan : {plan} at location : {location}.\n\
                         Valid location(s) are: {}.\n\
                         Use 'ibmcloud catalog service {service}' to list the supported locations.",
                        supported.iter().join_with(", ")
                    ),
                    AttributePath::new("location"),
                );
                return None;
            }
        };

        let resource_group = match planned_state.resource_group_id.as_deref_option() {
            Some(group) => group.to_owned(),
            None => match session.config().resource_group.clone() {
                Some(group) => group,
                None => {
                    let user = session
                        .user_details()
                        .or_report(diags, "Error fetching account details")?;
                    let group = session
                        .resource_manager_v2()
                        .or_report(diags, "Error configuring the Resource Manager client")?
                        .default_group(&user.account_id)
                        .await
                        .or_report(diags, "Error retrieving the default resource group")?;
                    match group {
                        Some(group) => group.id,
                        None => {
                            diags.root_error(
                                "Error retrieving the default resource group",
                                "The account has no default resource group; set `resource_group_id`",
                            );
                            return None;
                        }
                    }
                }
            },
        };

        let created = api
            .create(&CreateInstance {
                name: planned_state.name.as_str(),
                target: deployment.target(),
                resource_group: &resource_group,
                resource_plan_id: &plan_id,
                parameters: parameters(&planned_state),
            })
            .await
            .or_report(diags, "Error creating resource instance")?;
        tracing::info!(id = %created.id, "resource instance created");

        let instance = wait_for_active(
            &api,
            &created.id,
            &[IN_PROGRESS, INACTIVE, PROVISIONING],
            timeout(&planned_state.timeouts, Operation::Create, DEFAULT_OPERATION_TIMEOUT),
        )
        .await
        .or_report(
            diags,
            &format!("Error waiting for resource instance ({}) to be active", created.id),
        )?;

        let mut state = planned_state.clone();
        if let Some(crn) = instance.crn.as_deref() {
            update_tags(&session, diags, crn, &[], &list_strings(&planned_state.tags)).await;
            state.tags = resolve_tags(&session, diags, crn, &planned_state.tags).await;
        }
        set_details(&session, diags, &mut state, &instance).await;

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
            .resource_controller_v2()
            .or_report(diags, "Error configuring the Resource Controller client")?;
        let id = prior_state.id.as_str();

        let mut request = UpdateInstance::default();
        if planned_state.name != prior_state.name {
            request.name = planned_state.name.as_deref_option();
        }
        let plan_id = if planned_state.plan != prior_state.plan {
            let catalog = session
                .global_catalog_v1()
                .or_report(diags, "Error configuring the Global Catalog client")?;
            Some(
                find_plan_id(
                    &catalog,
                    diags,
                    planned_state.service.as_str(),
                    planned_state.plan.as_str(),
                )
                .await?,
            )
        } else {
            None
        };
        request.resource_plan_id = plan_id.as_deref();
        if planned_state.parameters != prior_state.parameters
            || planned_state.service_endpoints != prior_state.service_endpoints
        {
            request.parameters = Some(parameters(&planned_state));
        }

        if request.name.is_some() || request.resource_plan_id.is_some() || request.parameters.is_some() {
            api.update(id, &request)
                .await
                .or_report(diags, "Error updating resource instance")?;
            wait_for_active(
                &api,
                id,
                &[IN_PROGRESS, INACTIVE],
                timeout(&planned_state.timeouts, Operation::Update, DEFAULT_OPERATION_TIMEOUT),
            )
            .await
            .or_report(
                diags,
                &format!("Error waiting for resource instance ({id}) to be updated"),
            )?;
        }

        let instance = api
            .get(id)
            .await
            .or_report(diags, "Error retrieving resource instance")?;
        let mut state = planned_state.clone();
        if let Some(crn) = instance.crn.as_deref() {
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
        set_details(&session, diags, &mut state, &instance).await;

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
            .resource_controller_v2()
            .or_report(diags, "Error configuring the Resource Controller client")?;

        let id = state.id.as_str();
        if !api
            .exists(id)
            .await
            .or_report(diags, "Error retrieving resource instance")?
        {
            tracing::warn!(id, "resource instance was already deleted");
            return Some(());
        }
        if api
            .delete(id)
            .await
            .or_not_found()
            .or_report(diags, "Error deleting resource instance")?
            .is_none()
        {
            return Some(());
        }

        wait_for_removal(
            &api,
            id,
            timeout(&state.timeouts, Operation::Delete, DEFAULT_OPERATION_TIMEOUT),
        )
        .await
        .or_report(
            diags,
            &format!("Error waiting for resource instance ({id}) to be deleted"),
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::{ApiClient, Auth, RetryPolicy};
    use crate::test_utils::{http, mock_handle, MockResponse, MockServer};

    fn instance(state: &str) -> MockResponse {
        MockResponse::json(200, json!({"id": "abc", "name": "cos", "state": state}))
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_active() {
        let server = MockServer::builder()
            .route(
                "GET",
                "/v2/resource_instances/abc",
                [instance("provisioning"), instance("in progress"), instance("active")],
            )
            .start()
            .await;
        let api = ResourceControllerApi::new(
            ApiClient::new(http(), &server.url(), Auth::None, RetryPolicy::default()).unwrap(),
        );

        let active = wait_for_active(
            &api,
            "abc",
            &[IN_PROGRESS, INACTIVE, PROVISIONING],
            Duration::from_secs(600),
        )
        .await
        .unwrap();
        assert_eq!(active.state(), ACTIVE);
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_provisioning_is_an_error() {
        let server = MockServer::builder()
            .on(
                "GET",
                "/v2/resource_instances/abc",
                MockResponse::json(
                    200,
                    json!({"id": "abc", "state": "failed", "last_operation": {"description": "quota exceeded"}}),
                ),
            )
            .start()
            .await;
        let api = ResourceControllerApi::new(
            ApiClient::new(http(), &server.url(), Auth::None, RetryPolicy::default()).unwrap(),
        );

        let err = wait_for_active(&api, "abc", &[PROVISIONING], Duration::from_secs(600))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_instance_is_removed() {
        let server = MockServer::builder()
            .route(
                "GET",
                "/v2/resource_instances/abc",
                [instance("active"), MockResponse::empty(404)],
            )
            .start()
            .await;
        let api = ResourceControllerApi::new(
            ApiClient::new(http(), &server.url(), Auth::None, RetryPolicy::default()).unwrap(),
        );

        wait_for_removal(&api, "abc", Duration::from_secs(600))
            .await
            .unwrap();
    }

    #[test]
    fn endpoints_are_passed_as_parameters() {
        let state = ResourceState {
            parameters: Value::Value(
                [("HMAC".into(), string_value("true"))].into_iter().collect(),
            ),
            service_endpoints: string_value("private"),
            ..Default::default()
        };
        assert_eq!(
            JsonValue::Object(parameters(&state)),
            json!({"HMAC": true, "service-endpoints": "private"})
        );
    }

    fn instance_state<'a>() -> ResourceState<'a> {
        ResourceState {
            id: string_value("abc"),
            name: string_value("cos"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn vanished_instance_is_dropped_from_state() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmResourceInstanceResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let read = resource
            .read(&mut diags, instance_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert_eq!(server.requests_to("GET", "/v2/resource_instances/abc").len(), 1);
    }

    #[tokio::test]
    async fn removed_instance_is_dropped_from_state() {
        let server = MockServer::builder()
            .with_iam_token()
            .on("GET", "/v2/resource_instances/abc", instance("removed"))
            .start()
            .await;
        let resource = IbmResourceInstanceResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let read = resource
            .read(&mut diags, instance_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    }

    #[tokio::test]
    async fn destroying_a_vanished_instance_succeeds() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmResourceInstanceResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let destroyed = resource
            .destroy(&mut diags, instance_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert_eq!(destroyed, Some(()));
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert!(server.requests_to("DELETE", "/v2/resource_instances/abc").is_empty());
    }

    #[tokio::test]
    async fn import_sets_the_id() {
        let resource = IbmResourceInstanceResource::default();
        let mut diags = Diagnostics::default();
        let (state, _) = resource.import(&mut diags, "abc".into()).await.unwrap();
        assert_eq!(state.id.as_str(), "abc");
    }
}
