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

use serde::{Deserialize, Serialize};
use tf_provider::value::{ValueList, ValueString};
use tf_provider::Diagnostics;

use crate::client::{ApiClient, ApiError};
use crate::flex::tag_changes;
use crate::session::ClientSession;
use crate::utils::string_list;

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    items: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Debug, Serialize)]
struct Resource<'a> {
    resource_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TagRequest<'a> {
    resources: [Resource<'a>; 1],
    tag_names: &'a [String],
}

/// Global Search and Tagging API
#[derive(Debug, Clone)]
pub struct TaggingApi {
    client: ApiClient,
}

impl TaggingApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// User tags attached to a resource
    pub async fn tags(&self, crn: &str) -> Result<Vec<String>, ApiError> {
        let list: TagList = self
            .client
            .get(&["v3", "tags"])
            .query("attached_to", crn)
            .query("tag_type", "user")
            .query("limit", 1000)
            .send_json()
            .await?;
        Ok(list.items.into_iter().map(|tag| tag.name).collect())
    }

    pub async fn attach(&self, crn: &str, tags: &[String]) -> Result<(), ApiError> {
        self.tag_operation("attach", crn, tags).await
    }

    pub async fn detach(&self, crn: &str, tags: &[String]) -> Result<(), ApiError> {
        self.tag_operation("detach", crn, tags).await
    }

    async fn tag_operation(&self, operation: &str, crn: &str, tags: &[String]) -> Result<(), ApiError> {
        if tags.is_empty() {
            return Ok(());
        }
        self.client
            .post(&["v3", "tags", operation])
            .query("tag_type", "user")
            .json(&TagRequest {
                resources: [Resource { resource_id: crn }],
                tag_names: tags,
            })
            .send()
            .await?;
        Ok(())
    }

    /// Detach the tags no longer wanted, then attach the new ones
    pub async fn update(&self, crn: &str, old: &[&str], new: &[&str]) -> Result<(), ApiError> {
        let (remove, add) = tag_changes(old.iter().copied(), new.iter().copied());
        self.detach(crn, &remove).await?;
        self.attach(crn, &add).await
    }
}

/// Read the tags of a resource; failures only warn
pub(crate) async fn read_tags<'a>(
    session: &ClientSession,
    diags: &mut Diagnostics,
    crn: &str,
) -> ValueList<ValueString<'a>> {
    let env_tags = &session.config().env_tags;
    let result = match session.global_tagging_v3() {
        Ok(api) => api.tags(crn).await.map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };
    match result {
        Ok(tags) => string_list(tags.into_iter().filter(|tag| !env_tags.contains(tag))),
        Err(err) => {
            tracing::warn!(crn, "error on get of resource tags: {err}");
            diags.root_warning("Unable to read resource tags", err);
            ValueList::Null
        }
    }
}

/// Tags to store after an apply: the planned ones when known, the remote ones otherwise
pub(crate) async fn resolve_tags<'a>(
    session: &ClientSession,
    diags: &mut Diagnostics,
    crn: &str,
    planned: &ValueList<ValueString<'a>>,
) -> ValueList<ValueString<'a>> {
    if planned.is_unknown() {
        read_tags(session, diags, crn).await
    } else {
        planned.clone()
    }
}

/// Bring the tags of a resource from `old` to `new`; failures only warn
pub(crate) async fn update_tags(
    session: &ClientSession,
    diags: &mut Diagnostics,
    crn: &str,
    old: &[&str],
    new: &[&str],
) {
    let env_tags = &session.config().env_tags;
    let mut new = new.to_vec();
    new.extend(env_tags.iter().map(String::as_str));
    let result = match session.global_tagging_v3() {
        Ok(api) => api.update(crn, old, &new).await.map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };
    if let Err(err) = result {
        tracing::warn!(crn, "error on update of resource tags: {err}");
        diags.root_warning("Unable to update resource tags", err);
    }
}
