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

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde_json::{Map, Value};

/// Flatten a JSON object into `dotted.key -> string` pairs
pub fn flatten_json(value: &Value) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    flatten_into(&mut flat, "", value);
    flat
}

fn flatten_into(flat: &mut BTreeMap<String, String>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(flat, &key, value);
            }
        }
        Value::Null => (),
        Value::String(s) => {
            flat.insert(prefix.to_owned(), s.clone());
        }
        other => {
            flat.insert(prefix.to_owned(), other.to_string());
        }
    }
}

/// Turn string parameters into their JSON representation
///
/// `"true"` and `"false"` become booleans and `"[a,b]"` becomes a list of strings.
pub fn expand_parameters<'a, I>(parameters: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    parameters
        .into_iter()
        .map(|(key, value)| (key.to_owned(), expand_parameter(value)))
        .collect()
}

fn expand_parameter(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        list if list.starts_with('[') && list.ends_with(']') => {
            let inner = &list[1..list.len() - 1];
            Value::Array(
                inner
                    .split(',')
                    .map(|item| item.trim().trim_matches('"'))
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_owned()))
                    .collect(),
            )
        }
        other => Value::String(other.to_owned()),
    }
}

/// Split a composite identifier made of `count` parts separated by `/`
pub fn id_parts(id: &str, count: usize) -> Result<Vec<&str>, String> {
    let parts: Vec<&str> = id.split('/').collect();
    if parts.len() != count || parts.iter().any(|part| part.is_empty()) {
        return Err(format!(
            "incorrect ID `{id}`: expected {count} parts separated by `/`"
        ));
    }
    Ok(parts)
}

/// Tags to detach and tags to attach to go from `old` to `new`
pub fn tag_changes<'a>(
    old: impl IntoIterator<Item = &'a str>,
    new: impl IntoIterator<Item = &'a str>,
) -> (Vec<String>, Vec<String>) {
    let old: BTreeSet<&str> = old.into_iter().map(str::trim).collect();
    let new: BTreeSet<&str> = new.into_iter().map(str::trim).collect();
    (
        old.difference(&new).map(|tag| tag.to_string()).collect(),
        new.difference(&old).map(|tag| tag.to_string()).collect(),
    )
}

/// Parse a duration like `"10m"`, `"1h30m"` or `"45s"`
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(String::from("empty duration"));
    }

    let mut total = Duration::ZERO;
    let mut number = String::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }
        let unit = match (c, chars.peek()) {
            ('m', Some('s')) => {
                chars.next();
                0.001
            }
            ('h', _) => 3600.0,
            ('m', _) => 60.0,
            ('s', _) => 1.0,
            _ => return Err(format!("invalid duration `{input}`")),
        };
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration `{input}`"))?;
        total = Duration::try_from_secs_f64(value * unit)
            .ok()
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("duration `{input}` is out of range"))?;
        number.clear();
    }

    if !number.is_empty() {
        return Err(format!("missing unit in duration `{input}`"));
    }
    Ok(total)
}
