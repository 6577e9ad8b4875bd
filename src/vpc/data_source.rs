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
use crate::tagging::read_tags;
use crate::utils::{session, ReportError, WithSchema, WithValidate};

use super::resource::controller_url;
use super::state::{subnets, DataSourceState};

#[derive(Debug, Default, Clone)]
pub struct IbmIsVpcDataSource {
    session: SessionHandle,
}

impl IbmIsVpcDataSource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait]
impl DataSource for IbmIsVpcDataSource {
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
        let api = session
            .vpc_v1()
            .or_report(diags, "Error configuring the VPC client")?;

        let name = config.name.as_str();
        let vpcs = api
            .list_vpcs()
            .await
            .or_report(diags, "Error fetching VPCs")?;
        let Some(vpc) = vpcs.into_iter().find(|vpc| vpc.name == name) else {
            diags.error(
                "VPC not found",
                format!("No VPC found with name {name}"),
                AttributePath::new("name"),
            );
            return None;
        };

        let mut state = config.clone();
        state.set_vpc(&vpc);
        state.resource_controller_url = controller_url(&session);
        if let Some(crn) = vpc.crn.as_deref() {
            state.tags = read_tags(&session, diags, crn).await;
        }
        state.subnets = subnets(
            api.subnets(&vpc.id)
                .await
                .or_report(diags, "Error fetching subnets")?,
        );
        Some(state)
    }
}
