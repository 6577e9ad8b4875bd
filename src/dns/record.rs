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

use super::api::{RecordRequest, RecordType};
use super::state::{RecordState, DEFAULT_TTL};

#[derive(Debug, Default, Clone)]
pub struct IbmDnsResourceRecordResource {
    session: SessionHandle,
}

impl IbmDnsResourceRecordResource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

/// Body shared by record creation and replacement
fn request<'s>(
    diags: &mut Diagnostics,
    state: &'s RecordState<'_>,
    with_type: bool,
) -> Option<RecordRequest<'s>> {
    let record_type = state
        .record_type()
        .or_report_at(diags, "Invalid record type", AttributePath::new("type"))?;
    let rdata = state
        .rdata()
        .expand(record_type)
        .or_report_at(diags, "Invalid record data", AttributePath::new("rdata"))?;
    let srv = record_type == RecordType::Srv;
    Some(RecordRequest {
        name: state.name.as_str(),
        record_type: with_type.then(|| record_type.name()),
        rdata,
        ttl: state.ttl.as_ref_option().copied().unwrap_or(DEFAULT_TTL),
        service: state.service.as_deref_option().filter(|_| srv),
        protocol: state.protocol.as_deref_option().filter(|_| srv),
    })
}

#[async_trait]
impl Resource for IbmDnsResourceRecordResource {
    type State<'a> = RecordState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(RecordState::schema())
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
        let parts = id_parts(id, 3).or_report_at(
            diags,
            "Invalid resource record ID",
            AttributePath::new("id"),
        )?;
        let (instance_id, zone_id, record_id) = (parts[0], parts[1], parts[2]);
        let Some(record) = api
            .get_record(instance_id, zone_id, record_id)
            .await
            .or_not_found()
            .or_report(diags, "Error reading pdns resource record")?
        else {
            tracing::warn!(id, "DNS resource record not found, removing it from the state");
            return None;
        };

        let mut new_state = state.clone();
        new_state.set_record(instance_id, zone_id, record);
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
        if state.ttl.is_null() {
            state.ttl = Value::Value(DEFAULT_TTL);
        }
        let replace = force_new([
            ("instance_id", state.instance_id != prior_state.instance_id),
            ("zone_id", state.zone_id != prior_state.zone_id),
            ("type", state.r#type != prior_state.r#type),
        ]);
        if state != prior_state {
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
        let zone_id = planned_state.zone_id.as_str();
        let body = request(diags, &planned_state, true)?;
        let record = api
            .create_record(instance_id, zone_id, &body)
            .await
            .or_report(diags, "Error creating pdns resource record")?;
        tracing::info!(instance_id, zone_id, record = %record.id, "DNS resource record created");

        let mut state = planned_state.clone();
        state.set_record(instance_id, zone_id, record);
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
        let zone_id = prior_state.zone_id.as_str();
        let body = request(diags, &planned_state, false)?;
        let record = api
            .update_record(
                instance_id,
                zone_id,
                prior_state.resource_record_id.as_str(),
                &body,
            )
            .await
            .or_report(diags, "Error updating pdns resource record")?;

        let mut state = planned_state.clone();
        state.set_record(instance_id, zone_id, record);
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
        let record_id = state.resource_record_id.as_str();
        if !api
            .record_exists(instance_id, zone_id, record_id)
            .await
            .or_report(diags, "Error reading pdns resource record")?
        {
            tracing::warn!(instance_id, zone_id, record_id, "DNS resource record was already deleted");
            return Some(());
        }
        api.delete_record(instance_id, zone_id, record_id)
            .await
            .or_not_found()
            .or_report(diags, "Error deleting pdns resource record")?;
        Some(())
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = RecordState {
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
    use crate::test_utils::{mock_handle, MockServer};

    #[test]
    fn srv_request() {
        let state = RecordState {
            name: string_value("sip"),
            r#type: string_value("SRV"),
            rdata: string_value("sip.example.com"),
            ttl: Value::Value(120),
            port: Value::Value(5060),
            priority: Value::Value(1),
            weight: Value::Value(10),
            service: string_value("_sip"),
            protocol: string_value("udp"),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let body = request(&mut diags, &state, true).unwrap();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "name": "sip",
                "type": "SRV",
                "rdata": {"target": "sip.example.com", "port": 5060, "priority": 1, "weight": 10},
                "ttl": 120,
                "service": "_sip",
                "protocol": "udp",
            })
        );

        let body = request(&mut diags, &state, false).unwrap();
        assert!(serde_json::to_value(&body).unwrap().get("type").is_none());
    }

    #[test]
    fn a_record_ignores_srv_fields() {
        let state = RecordState {
            name: string_value("www"),
            r#type: string_value("A"),
            rdata: string_value("10.0.0.1"),
            service: string_value("_ignored"),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let body = request(&mut diags, &state, true).unwrap();
        assert_eq!(body.ttl, DEFAULT_TTL);
        assert!(body.service.is_none());
    }

    fn record_state<'a>() -> RecordState<'a> {
        RecordState {
            id: string_value("inst/zone-1/rec-1"),
            instance_id: string_value("inst"),
            zone_id: string_value("zone-1"),
            resource_record_id: string_value("rec-1"),
            name: string_value("www"),
            r#type: string_value("A"),
            rdata: string_value("10.0.0.1"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn vanished_record_is_dropped_from_state() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmDnsResourceRecordResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let read = resource
            .read(&mut diags, record_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert_eq!(
            server
                .requests_to("GET", "/v1/instances/inst/dnszones/zone-1/resource_records/rec-1")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn malformed_record_id_is_an_error() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmDnsResourceRecordResource::new(mock_handle(&server).await);

        let state = RecordState {
            id: string_value("inst/zone-1"),
            ..record_state()
        };
        let mut diags = Diagnostics::default();
        let read = resource
            .read(&mut diags, state, ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(read.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn destroying_a_vanished_record_succeeds() {
        let server = MockServer::builder().with_iam_token().start().await;
        let resource = IbmDnsResourceRecordResource::new(mock_handle(&server).await);

        let mut diags = Diagnostics::default();
        let destroyed = resource
            .destroy(&mut diags, record_state(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert_eq!(destroyed, Some(()));
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        assert!(server
            .requests_to("DELETE", "/v1/instances/inst/dnszones/zone-1/resource_records/rec-1")
            .is_empty());
    }

    #[tokio::test]
    async fn import_sets_the_id() {
        let resource = IbmDnsResourceRecordResource::default();
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .import(&mut diags, "inst/zone-1/rec-1".into())
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "inst/zone-1/rec-1");
    }
}
