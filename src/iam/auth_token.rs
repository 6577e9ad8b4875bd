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
use crate::utils::{option_value, session, string_value, ReportError, WithSchema, WithValidate};

use super::state::AuthTokenState;

#[derive(Debug, Default, Clone)]
pub struct IbmIamAuthTokenDataSource {
    session: SessionHandle,
}

impl IbmIamAuthTokenDataSource {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait]
impl DataSource for IbmIamAuthTokenDataSource {
    type State<'a> = AuthTokenState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(AuthTokenState::schema())
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
        let authenticator = session
            .authenticator()
            .or_report(diags, "Error retrieving the IAM session")?;
        let user = session
            .user_details()
            .or_report(diags, "Error fetching account details")?;

        let bearer = authenticator
            .bearer()
            .await
            .or_report(diags, "Error retrieving the IAM access token")?;

        let mut state = config.clone();
        state.id = string_value(user.user_id.as_str());
        state.iam_access_token = string_value(bearer);
        state.iam_refresh_token = option_value(authenticator.refresh_token().await);
        state.account_id = string_value(user.account_id.as_str());
        Some(state)
    }
}
