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

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock,
};
use tf_provider::value::{Value, ValueList, ValueMap, ValueString};
use tf_provider::schema::Schema;
use tf_provider::{map, AttributePath, Diagnostics};

use crate::flex::parse_duration;
use crate::session::{ClientSession, SessionHandle};

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

pub(crate) trait WithValidate {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath);
}

pub(crate) trait WithNormalize {
    fn normalize(&mut self, diags: &mut Diagnostics);
}

/// Turn errors into diagnostics at the framework boundary
pub(crate) trait ReportError<T> {
    fn or_report(self, diags: &mut Diagnostics, summary: &str) -> Option<T>;
    fn or_report_at(
        self,
        diags: &mut Diagnostics,
        summary: &str,
        attr_path: AttributePath,
    ) -> Option<T>;
}

impl<T, E: Display> ReportError<T> for Result<T, E> {
    fn or_report(self, diags: &mut Diagnostics, summary: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!("{summary}: {err}");
                diags.root_error(summary.to_string(), err.to_string());
                None
            }
        }
    }

    fn or_report_at(
        self,
        diags: &mut Diagnostics,
        summary: &str,
        attr_path: AttributePath,
    ) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!("{summary}: {err}");
                diags.error(summary.to_string(), err.to_string(), attr_path);
                None
            }
        }
    }
}

pub(crate) fn session(handle: &SessionHandle, diags: &mut Diagnostics) -> Option<Arc<ClientSession>> {
    handle.get().or_report(diags, "Provider is not configured")
}

pub(crate) fn attribute(
    attr_type: AttributeType,
    constraint: AttributeConstraint,
    description: &str,
) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        sensitive: false,
        deprecated: false,
    }
}

pub(crate) fn required(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Required, description)
}

pub(crate) fn optional(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Optional, description)
}

pub(crate) fn optional_computed(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::OptionalComputed, description)
}

pub(crate) fn computed(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Computed, description)
}

pub(crate) fn sensitive(attribute: Attribute) -> Attribute {
    Attribute {
        sensitive: true,
        ..attribute
    }
}

pub(crate) fn deprecated(attribute: Attribute) -> Attribute {
    Attribute {
        deprecated: true,
        ..attribute
    }
}

pub(crate) fn string_set() -> AttributeType {
    AttributeType::Set(Box::new(AttributeType::String))
}

pub(crate) fn string_map() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

pub(crate) fn string_value<'a>(value: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.into()))
}

pub(crate) fn option_value<'a>(value: Option<impl Into<String>>) -> ValueString<'a> {
    match value {
        Some(value) => string_value(value),
        None => Value::Null,
    }
}

pub(crate) fn string_list<'a, I, S>(values: I) -> ValueList<ValueString<'a>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Value(values.into_iter().map(string_value).collect())
}

/// Known strings of a list, skipping nulls and unknowns
pub(crate) fn list_strings<'a>(list: &'a ValueList<ValueString<'_>>) -> Vec<&'a str> {
    list.as_ref_option()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_deref_option())
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn string_map_value<'a>(values: BTreeMap<String, String>) -> ValueMap<'a, ValueString<'a>> {
    Value::Value(
        values
            .into_iter()
            .map(|(key, value)| (Cow::Owned(key), string_value(value)))
            .collect(),
    )
}

/// Known entries of a string map
pub(crate) fn map_strings<'a>(map: &'a ValueMap<'_, ValueString<'_>>) -> Vec<(&'a str, &'a str)> {
    map.as_ref_option()
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| Some((key.as_ref(), value.as_deref_option()?)))
        .collect()
}

/// Replace a null computed value by an unknown one
pub(crate) fn unknown_if_null<T>(value: &mut Value<T>) {
    if value.is_null() {
        *value = Value::Unknown;
    }
}

/// Path of every attribute that differs and cannot be updated in place
pub(crate) fn force_new<'a, I>(changes: I) -> Vec<AttributePath>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    changes
        .into_iter()
        .filter(|(_, changed)| *changed)
        .map(|(name, _)| AttributePath::new(name.to_string()))
        .collect()
}

/// Operation timeouts of a resource
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Timeouts<'a> {
    #[serde(borrow = "'a")]
    pub create: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub update: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub delete: ValueString<'a>,
}

pub(crate) type ValueTimeouts<'a> = ValueList<Value<Timeouts<'a>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    fn pick<'b, 'a>(self, timeouts: &'b Timeouts<'a>) -> &'b ValueString<'a> {
        match self {
            Operation::Create => &timeouts.create,
            Operation::Update => &timeouts.update,
            Operation::Delete => &timeouts.delete,
        }
    }
}

pub(crate) fn timeouts_block() -> NestedBlock {
    NestedBlock::List(Block {
        attributes: map! {
            "create" => optional(AttributeType::String, "Timeout of the creation (e.g. `10m`)"),
            "update" => optional(AttributeType::String, "Timeout of the update (e.g. `10m`)"),
            "delete" => optional(AttributeType::String, "Timeout of the deletion (e.g. `10m`)"),
        },
        description: Description::plain("Operation timeouts"),
        ..Default::default()
    })
}

pub(crate) fn timeout(timeouts: &ValueTimeouts, operation: Operation, default: Duration) -> Duration {
    timeouts
        .as_ref_option()
        .and_then(|blocks| blocks.first())
        .and_then(|block| block.as_ref_option())
        .and_then(|block| operation.pick(block).as_deref_option())
        .and_then(|value| parse_duration(value).ok())
        .unwrap_or(default)
}

impl<'a> WithValidate for ValueTimeouts<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        let Some(blocks) = self.as_ref_option() else {
            return;
        };
        for (i, block) in blocks.iter().enumerate() {
            let Some(block) = block.as_ref_option() else {
                continue;
            };
            for operation in [Operation::Create, Operation::Update, Operation::Delete] {
                if let Some(value) = operation.pick(block).as_deref_option() {
                    if let Err(err) = parse_duration(value) {
                        diags.error(
                            "Invalid timeout",
                            err,
                            attr_path
                                .clone()
                                .index(i as i64)
                                .attribute(operation.name()),
                        );
                    }
                }
            }
        }
    }
}

pub struct DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    iter: RefCell<T>,
    sep: &'a str,
}

pub trait DisplayJoinable {
    type Joiner<'a>;
    fn join_with(self, sep: &str) -> Self::Joiner<'_>;
}

impl<T, I> DisplayJoinable for T
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    type Joiner<'a> = DisplayJoiner<'a, T, I>;

    fn join_with(self, sep: &str) -> Self::Joiner<'_> {
        DisplayJoiner {
            iter: RefCell::new(self),
            sep,
        }
    }
}

impl<'a, T, I> std::fmt::Display for DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        let mut iter = self.iter.try_borrow_mut().or(Err(std::fmt::Error))?;
        for elt in iter.by_ref() {
            f.write_str(sep)?;
            f.write_fmt(format_args!("{elt}"))?;
            sep = self.sep;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeouts<'a>(create: Option<&'a str>) -> ValueTimeouts<'a> {
        Value::Value(vec![Value::Value(Timeouts {
            create: create.map_or(Value::Null, |c| Value::Value(Cow::Borrowed(c))),
            ..Default::default()
        })])
    }

    #[test]
    fn timeout_defaults() {
        let default = Duration::from_secs(600);
        assert_eq!(
            timeout(&timeouts(Some("30m")), Operation::Create, default),
            Duration::from_secs(1800)
        );
        assert_eq!(timeout(&timeouts(None), Operation::Create, default), default);
        assert_eq!(
            timeout(&timeouts(Some("30m")), Operation::Delete, default),
            default
        );
        assert_eq!(timeout(&Value::Null, Operation::Update, default), default);
    }

    #[test]
    fn invalid_timeouts_are_reported() {
        let mut diags = Diagnostics::default();
        timeouts(Some("ten minutes")).validate(&mut diags, AttributePath::new("timeouts"));
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        timeouts(Some("99999999999999999999h")).validate(&mut diags, AttributePath::new("timeouts"));
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        timeouts(Some("10m")).validate(&mut diags, AttributePath::new("timeouts"));
        assert!(diags.errors.is_empty());
    }

    #[test]
    fn join() {
        let locations = ["us-south", "eu-de"];
        assert_eq!(
            locations.iter().join_with(", ").to_string(),
            "us-south, eu-de"
        );
    }

    #[test]
    fn lists() {
        let list: ValueList<ValueString> =
            Value::Value(vec![string_value("a"), Value::Unknown, Value::Null, string_value("b")]);
        assert_eq!(list_strings(&list), vec!["a", "b"]);
        assert_eq!(list_strings(&Value::Unknown), Vec::<&str>::new());
    }

    #[test]
    fn maps() {
        let map = string_map_value(BTreeMap::from([
            (String::from("plan"), String::from("lite")),
            (String::from("region"), String::from("eu-de")),
        ]));
        assert_eq!(map_strings(&map), vec![("plan", "lite"), ("region", "eu-de")]);
        assert!(map_strings(&Value::Null).is_empty());
    }
}
