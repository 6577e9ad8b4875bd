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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueList, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::utils::{
    computed, option_value, optional, optional_computed, required, string_value,
    unknown_if_null, WithNormalize, WithSchema, WithValidate,
};

use super::api::{Rdata, RecordType, ResourceRecord, Zone};

pub(super) const DEFAULT_TTL: i64 = 900;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub instance_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub description: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub label: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub zone_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub state: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub created_on: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub modified_on: ValueString<'a>,
}

impl<'a> WithSchema for ZoneState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Identifier of the zone, as `instance_id/zone_id`"),
                    "instance_id" => required(AttributeType::String, "Instance ID"),
                    "name" => required(AttributeType::String, "Zone name"),
                    "description" => optional(AttributeType::String, "Zone description"),
                    "label" => optional(AttributeType::String, "Label"),
                    "zone_id" => computed(AttributeType::String, "Zone ID"),
                    "state" => computed(AttributeType::String, "Zone state"),
                    "created_on" => computed(AttributeType::String, "Creation date"),
                    "modified_on" => computed(AttributeType::String, "Modification date"),
                },
                description: Description::plain("Manage a zone of a DNS Services instance"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for ZoneState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Some(name) = self.name.as_deref_option() {
            if name.is_empty() || name.ends_with('.') {
                diags.error(
                    "Invalid zone name",
                    format!("`{name}` must be a non empty domain name without a trailing dot"),
                    attr_path.attribute("name"),
                );
            }
        }
    }
}

impl<'a> WithNormalize for ZoneState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        unknown_if_null(&mut self.id);
        unknown_if_null(&mut self.zone_id);
        unknown_if_null(&mut self.state);
        unknown_if_null(&mut self.created_on);
        unknown_if_null(&mut self.modified_on);
    }
}

impl<'a> ZoneState<'a> {
    pub(super) fn set_zone(&mut self, instance_id: &str, zone: Zone) {
        self.id = string_value(format!("{instance_id}/{}", zone.id));
        self.instance_id = string_value(instance_id);
        self.zone_id = string_value(zone.id);
        self.name = string_value(zone.name);
        self.description = option_value(zone.description.filter(|d| !d.is_empty()));
        self.label = option_value(zone.label.filter(|l| !l.is_empty()));
        self.state = option_value(zone.state);
        self.created_on = option_value(zone.created_on);
        self.modified_on = option_value(zone.modified_on);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub instance_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub zone_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub r#type: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub rdata: ValueString<'a>,
    pub ttl: ValueNumber,
    pub preference: ValueNumber,
    pub port: ValueNumber,
    pub priority: ValueNumber,
    pub weight: ValueNumber,
    #[serde(borrow = "'a")]
    pub service: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub protocol: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub resource_record_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub created_on: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub modified_on: ValueString<'a>,
}

impl<'a> WithSchema for RecordState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Identifier of the record, as `instance_id/zone_id/record_id`"),
                    "instance_id" => required(AttributeType::String, "DNS Services instance ID"),
                    "zone_id" => required(AttributeType::String, "Zone ID"),
                    "name" => required(AttributeType::String, "DNS record name"),
                    "type" => required(AttributeType::String, "DNS record type: A, AAAA, CNAME, MX, SRV, TXT or PTR"),
                    "rdata" => required(AttributeType::String, "DNS record data: address, host name or text depending on the type"),
                    "ttl" => optional_computed(AttributeType::Number, "DNS record TTL, 900 by default"),
                    "preference" => optional(AttributeType::Number, "DNS preference of MX records"),
                    "port" => optional(AttributeType::Number, "DNS server port of SRV records"),
                    "priority" => optional(AttributeType::Number, "DNS server priority of SRV records"),
                    "weight" => optional(AttributeType::Number, "DNS server weight of SRV records"),
                    "service" => optional(AttributeType::String, "Service name of SRV records, starting with an underscore"),
                    "protocol" => optional(AttributeType::String, "Protocol of SRV records, like `udp` or `tcp`"),
                    "resource_record_id" => computed(AttributeType::String, "Resource record ID"),
                    "created_on" => computed(AttributeType::String, "Creation date"),
                    "modified_on" => computed(AttributeType::String, "Modification date"),
                },
                description: Description::plain("Manage a resource record of a DNS Services zone"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for RecordState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        let Some(record_type) = self.r#type.as_deref_option() else {
            return;
        };
        let record_type = match record_type.parse::<RecordType>() {
            Ok(record_type) => record_type,
            Err(err) => {
                diags.error("Invalid record type", err, attr_path.attribute("type"));
                return;
            }
        };
        if record_type == RecordType::Srv {
            for (name, missing) in [
                ("port", self.port.is_null()),
                ("priority", self.priority.is_null()),
                ("weight", self.weight.is_null()),
                ("service", self.service.is_null()),
                ("protocol", self.protocol.is_null()),
            ] {
                if missing {
                    diags.error(
                        "Missing SRV attribute",
                        format!("`{name}` is required for SRV records"),
                        attr_path.clone().attribute(name),
                    );
                }
            }
            if let Some(service) = self.service.as_deref_option() {
                if !service.starts_with('_') {
                    diags.error_short(
                        "`service` must start with an underscore",
                        attr_path.attribute("service"),
                    );
                }
            }
        }
    }
}

impl<'a> WithNormalize for RecordState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.ttl.is_null() {
            self.ttl = Value::Value(DEFAULT_TTL);
        }
        unknown_if_null(&mut self.id);
        unknown_if_null(&mut self.resource_record_id);
        unknown_if_null(&mut self.created_on);
        unknown_if_null(&mut self.modified_on);
    }
}

fn number(value: &ValueNumber) -> Option<i64> {
    value.as_ref_option().copied()
}

impl<'a> RecordState<'a> {
    pub(super) fn record_type(&self) -> Result<RecordType, String> {
        self.r#type.as_str().parse()
    }

    pub(super) fn rdata(&self) -> Rdata {
        Rdata {
            value: self.rdata.as_str().to_owned(),
            preference: number(&self.preference),
            port: number(&self.port),
            priority: number(&self.priority),
            weight: number(&self.weight),
        }
    }

    pub(super) fn set_record(&mut self, instance_id: &str, zone_id: &str, record: ResourceRecord) {
        self.id = string_value(format!("{instance_id}/{zone_id}/{}", record.id));
        self.instance_id = string_value(instance_id);
        self.zone_id = string_value(zone_id);
        self.resource_record_id = string_value(record.id);
        // the API answers the fully qualified name
        if self.name.is_null() || self.name.is_unknown() {
            self.name = string_value(record.name);
        }
        if let Ok(record_type) = record.record_type.parse::<RecordType>() {
            let rdata = Rdata::flatten(record_type, &record.rdata);
            self.r#type = string_value(record_type.name());
            self.rdata = string_value(rdata.value);
            if record_type == RecordType::Mx {
                self.preference = rdata.preference.map_or(Value::Null, Value::Value);
            }
            if record_type == RecordType::Srv {
                self.port = rdata.port.map_or(Value::Null, Value::Value);
                self.priority = rdata.priority.map_or(Value::Null, Value::Value);
                self.weight = rdata.weight.map_or(Value::Null, Value::Value);
                self.service = option_value(record.service);
                self.protocol = option_value(record.protocol);
            }
        }
        self.ttl = Value::Value(record.ttl.unwrap_or(DEFAULT_TTL));
        self.created_on = option_value(record.created_on);
        self.modified_on = option_value(record.modified_on);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInfo<'a> {
    #[serde(borrow = "'a")]
    pub instance_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub zone_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub description: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub label: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub state: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub created_on: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub modified_on: ValueString<'a>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonesState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub instance_id: ValueString<'a>,
    #[serde(borrow = "'a")]
    pub dns_zones: ValueList<Value<ZoneInfo<'a>>>,
}

impl<'a> WithSchema for ZonesState<'a> {
    fn schema() -> Schema {
        let zone = [
            "instance_id",
            "zone_id",
            "name",
            "description",
            "label",
            "state",
            "created_on",
            "modified_on",
        ]
        .into_iter()
        .map(|name| (name.to_owned(), AttributeType::String))
        .collect::<HashMap<_, _>>();
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "Instance ID"),
                    "instance_id" => required(AttributeType::String, "DNS Services instance ID"),
                    "dns_zones" => computed(AttributeType::List(Box::new(AttributeType::Object(zone))), "Zones of the instance"),
                },
                description: Description::plain("List the zones of a DNS Services instance"),
                ..Default::default()
            },
        }
    }
}

impl<'a> WithValidate for ZonesState<'a> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if matches!(self.instance_id.as_deref_option(), Some("")) {
            diags.error_short(
                "`instance_id` must not be empty",
                attr_path.attribute("instance_id"),
            );
        }
    }
}

impl<'a> ZonesState<'a> {
    pub(super) fn set_zones(&mut self, instance_id: &str, zones: Vec<Zone>) {
        self.id = string_value(instance_id);
        self.dns_zones = Value::Value(
            zones
                .into_iter()
                .map(|zone| {
                    Value::Value(ZoneInfo {
                        instance_id: string_value(zone.instance_id.as_deref().unwrap_or(instance_id)),
                        zone_id: string_value(zone.id),
                        name: string_value(zone.name),
                        description: option_value(zone.description),
                        label: option_value(zone.label),
                        state: option_value(zone.state),
                        created_on: option_value(zone.created_on),
                        modified_on: option_value(zone.modified_on),
                    })
                })
                .collect(),
        );
    }
}
