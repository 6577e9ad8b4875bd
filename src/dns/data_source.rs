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
use tf_provider::value::ValueEmpty;
use tf_provider::schema::Schema;
use tf_provider::{AttributePath, DataSource, Diagnostics};

use crate::session::SessionHandle;
use crate::utils::{session, ReportError, WithSchema, WithValidate};

use super::state::ZonesState;

#[derive(Debug, Default, Clone)]
pub struct IbmDnsZonesDataSource {
    session: SessionHandle,
}

impl IbmDnsZonesDataSource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait]
impl DataSource for IbmDnsZonesDataSource {
    type State<'a> = ZonesState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ZonesState::schema())
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
        let api = session
            .private_dns_v1()
            .or_report(diags, "Error configuring the DNS Services client")?;

        let instance_id = config.instance_id.as_str();
        let zones = api
            .list_zones(instance_id)
            .await
            .or_report(diags, "Error listing pdns zones")?;

        let mut state = config.clone();
        state.set_zones(instance_id, zones);
        Some(state)
    }
}
