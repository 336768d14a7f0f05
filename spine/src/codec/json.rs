// Copyright 2025. The OpenEEBUS Developers
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! JSON realisation of the codec contract.
//!
//! Mapping: sequences are objects carrying only their present fields,
//! lists are arrays, containers are single-field objects, tag leaves are
//! their declared names, durations are ISO 8601, timestamps RFC 3339 and
//! octet strings hex. Unknown object keys are skipped so newer peers can
//! talk to older ones.

use chrono::{DateTime, Duration, Utc};
use eebus_common::EebusError;
use serde_json::{json, Map, Value as Json};

use crate::{
    codec::SpineCodec,
    model::{
        shape::{LeafKind, Shape},
        value::{Leaf, Selection, Value},
        CmdClassifier,
        Command,
        CommandPayload,
        Datagram,
        DeviceAddress,
        FeatureAddress,
        Filter,
        FilterControl,
        Function,
        Header,
        MsgCounter,
        ResultData,
    },
};

#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        JsonCodec
    }
}

impl SpineCodec for JsonCodec {
    fn serialise(&self, datagram: &Datagram) -> Result<Vec<u8>, EebusError> {
        let body = json!({
            "datagram": {
                "header": header_to_json(&datagram.header),
                "payload": { "cmd": [command_to_json(&datagram.cmd)?] },
            }
        });
        Ok(body.to_string().into_bytes())
    }

    fn parse(&self, bytes: &[u8]) -> Result<Datagram, EebusError> {
        let root: Json =
            serde_json::from_slice(bytes).map_err(|e| EebusError::parse(format!("malformed datagram: {}", e)))?;
        let datagram = root
            .get("datagram")
            .ok_or_else(|| EebusError::parse("missing `datagram`"))?;
        let header = header_from_json(
            datagram
                .get("header")
                .ok_or_else(|| EebusError::parse("missing `header`"))?,
        )?;
        let cmds = datagram
            .get("payload")
            .and_then(|p| p.get("cmd"))
            .and_then(Json::as_array)
            .ok_or_else(|| EebusError::parse("missing `payload.cmd`"))?;
        if cmds.len() != 1 {
            return Err(EebusError::parse("expected exactly one cmd"));
        }
        let cmd = command_from_json(&cmds[0])?;
        Ok(Datagram::new(header, cmd))
    }

    fn print_unformatted(&self, shape: &'static Shape, value: &Value) -> Result<String, EebusError> {
        Ok(value_to_json(shape, value)?.to_string())
    }

    fn parse_unformatted(&self, shape: &'static Shape, text: &str) -> Result<Value, EebusError> {
        let json: Json = serde_json::from_str(text).map_err(|e| EebusError::parse(format!("malformed value: {}", e)))?;
        value_from_json(shape, &json)
    }
}

// Values

pub fn value_to_json(shape: &'static Shape, value: &Value) -> Result<Json, EebusError> {
    match (shape, value) {
        (Shape::Simple(kind), Value::Simple(leaf)) => leaf_to_json(kind, leaf),
        (Shape::Sequence(fields), Value::Sequence(slots)) => {
            let mut object = Map::new();
            for (index, field) in fields.iter().enumerate() {
                if let Some(Some(slot)) = slots.get(index) {
                    object.insert(field.name.to_string(), value_to_json(field.shape, slot)?);
                }
            }
            Ok(Json::Object(object))
        },
        (Shape::List(list), Value::List(items)) => {
            let rendered: Result<Vec<_>, _> = items.iter().map(|item| value_to_json(list.element, item)).collect();
            Ok(Json::Array(rendered?))
        },
        (Shape::Container(container), Value::Container(items)) => {
            let rendered: Result<Vec<_>, _> = items.iter().map(|item| value_to_json(container.element, item)).collect();
            let mut object = Map::new();
            object.insert(container.field.to_string(), Json::Array(rendered?));
            Ok(Json::Object(object))
        },
        _ => Err(EebusError::input("value does not match its declared shape")),
    }
}

pub fn value_from_json(shape: &'static Shape, json: &Json) -> Result<Value, EebusError> {
    match shape {
        Shape::Simple(kind) => Ok(Value::Simple(leaf_from_json(kind, json)?)),
        Shape::Sequence(fields) => {
            let object = json
                .as_object()
                .ok_or_else(|| EebusError::parse("expected an object"))?;
            let mut slots = vec![None; fields.len()];
            for (index, field) in fields.iter().enumerate() {
                if let Some(raw) = object.get(field.name) {
                    slots[index] = Some(value_from_json(field.shape, raw)?);
                }
            }
            Ok(Value::Sequence(slots))
        },
        Shape::List(list) => {
            let array = json.as_array().ok_or_else(|| EebusError::parse("expected an array"))?;
            let items: Result<Vec<_>, _> = array.iter().map(|item| value_from_json(list.element, item)).collect();
            Ok(Value::List(items?))
        },
        Shape::Container(container) => {
            let object = json
                .as_object()
                .ok_or_else(|| EebusError::parse("expected an object"))?;
            let array = object
                .get(container.field)
                .and_then(Json::as_array)
                .ok_or_else(|| EebusError::parse(format!("missing list `{}`", container.field)))?;
            let items: Result<Vec<_>, _> = array.iter().map(|item| value_from_json(container.element, item)).collect();
            Ok(Value::Container(items?))
        },
    }
}

fn leaf_to_json(kind: &LeafKind, leaf: &Leaf) -> Result<Json, EebusError> {
    Ok(match (kind, leaf) {
        (LeafKind::Bool, Leaf::Bool(b)) => json!(b),
        (LeafKind::Number, Leaf::Number(n)) => json!(n),
        (LeafKind::Unsigned, Leaf::Unsigned(n)) => json!(n),
        (LeafKind::Tag(names), Leaf::Tag(index)) => {
            let name = names
                .get(*index as usize)
                .ok_or_else(|| EebusError::input("tag index outside its declared name table"))?;
            json!(name)
        },
        (LeafKind::Text, Leaf::Text(s)) => json!(s),
        (LeafKind::Bytes, Leaf::Bytes(bytes)) => json!(hex::encode(bytes)),
        (LeafKind::Duration, Leaf::Duration(d)) => json!(format_duration(d)),
        (LeafKind::Timestamp, Leaf::Timestamp(t)) => json!(t.to_rfc3339()),
        _ => return Err(EebusError::input("leaf does not match its declared kind")),
    })
}

fn leaf_from_json(kind: &LeafKind, json: &Json) -> Result<Leaf, EebusError> {
    Ok(match kind {
        LeafKind::Bool => Leaf::Bool(json.as_bool().ok_or_else(|| EebusError::parse("expected a boolean"))?),
        LeafKind::Number => Leaf::Number(json.as_i64().ok_or_else(|| EebusError::parse("expected an integer"))?),
        LeafKind::Unsigned => {
            Leaf::Unsigned(json.as_u64().ok_or_else(|| EebusError::parse("expected an unsigned integer"))?)
        },
        LeafKind::Tag(names) => {
            let name = json.as_str().ok_or_else(|| EebusError::parse("expected a tag name"))?;
            let index = names
                .iter()
                .position(|n| *n == name)
                .ok_or_else(|| EebusError::parse(format!("unknown tag `{}`", name)))?;
            Leaf::Tag(index as u32)
        },
        LeafKind::Text => Leaf::Text(
            json.as_str()
                .ok_or_else(|| EebusError::parse("expected a string"))?
                .to_string(),
        ),
        LeafKind::Bytes => {
            let text = json.as_str().ok_or_else(|| EebusError::parse("expected a hex string"))?;
            Leaf::Bytes(hex::decode(text).map_err(|e| EebusError::parse(format!("invalid octet string: {}", e)))?)
        },
        LeafKind::Duration => {
            let text = json.as_str().ok_or_else(|| EebusError::parse("expected a duration"))?;
            Leaf::Duration(parse_duration(text)?)
        },
        LeafKind::Timestamp => {
            let text = json.as_str().ok_or_else(|| EebusError::parse("expected a timestamp"))?;
            let parsed = DateTime::parse_from_rfc3339(text)
                .map_err(|e| EebusError::parse(format!("invalid timestamp: {}", e)))?;
            Leaf::Timestamp(parsed.with_timezone(&Utc))
        },
    })
}

// ISO 8601 durations, day precision and below

fn format_duration(duration: &Duration) -> String {
    let mut seconds = duration.num_seconds();
    let millis = (duration.num_milliseconds() - seconds * 1000).abs();
    let sign = if seconds < 0 { "-" } else { "" };
    seconds = seconds.abs();
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    let mut out = format!("{}P", sign);
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    if hours > 0 || minutes > 0 || secs > 0 || millis > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if millis > 0 {
            out.push_str(&format!("{}.{:03}S", secs, millis));
        } else {
            out.push_str(&format!("{}S", secs));
        }
    }
    out
}

fn parse_duration(text: &str) -> Result<Duration, EebusError> {
    let bad = || EebusError::parse(format!("invalid duration `{}`", text));
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix('P').ok_or_else(bad)?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };
    let mut millis: i64 = 0;
    let mut number = String::new();
    for c in date_part.chars() {
        match c {
            '0'..='9' => number.push(c),
            'D' => {
                let days: i64 = number.parse().map_err(|_| bad())?;
                millis += days * 86_400_000;
                number.clear();
            },
            _ => return Err(bad()),
        }
    }
    if !number.is_empty() {
        return Err(bad());
    }
    for c in time_part.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'H' => {
                let hours: i64 = number.parse().map_err(|_| bad())?;
                millis += hours * 3_600_000;
                number.clear();
            },
            'M' => {
                let minutes: i64 = number.parse().map_err(|_| bad())?;
                millis += minutes * 60_000;
                number.clear();
            },
            'S' => {
                let seconds: f64 = number.parse().map_err(|_| bad())?;
                millis += (seconds * 1000.0).round() as i64;
                number.clear();
            },
            _ => return Err(bad()),
        }
    }
    if !number.is_empty() {
        return Err(bad());
    }
    if negative {
        millis = -millis;
    }
    Ok(Duration::milliseconds(millis))
}

// Element descriptors

fn selection_to_json(shape: &'static Shape, selection: &Selection) -> Json {
    match selection {
        Selection::All => json!({}),
        Selection::Fields(marked) => {
            let mut object = Map::new();
            for (index, sub) in marked {
                if let Some(field) = shape.fields().get(*index) {
                    object.insert(field.name.to_string(), selection_to_json(field.shape, sub));
                }
            }
            Json::Object(object)
        },
    }
}

fn selection_from_json(shape: &'static Shape, json: &Json) -> Result<Selection, EebusError> {
    match json {
        Json::Object(object) if !object.is_empty() => {
            let mut marked = Vec::new();
            for (name, sub) in object {
                let index = shape
                    .field_index(name)
                    .ok_or_else(|| EebusError::parse(format!("element descriptor names unknown field `{}`", name)))?;
                let field_shape = shape.fields()[index].shape;
                marked.push((index, selection_from_json(field_shape, sub)?));
            }
            Ok(Selection::Fields(marked))
        },
        // An empty object, null, empty string or `true` marks the node
        Json::Object(_) | Json::Null => Ok(Selection::All),
        Json::Bool(true) => Ok(Selection::All),
        Json::String(s) if s.is_empty() => Ok(Selection::All),
        _ => Err(EebusError::parse("malformed element descriptor")),
    }
}

// Filters

fn filter_to_json(function: Function, filter: &Filter) -> Result<Json, EebusError> {
    let mut object = Map::new();
    let control = match filter.control {
        FilterControl::Partial => "partial",
        FilterControl::Delete => "delete",
    };
    object.insert("cmdControl".into(), json!({ control: {} }));
    if let Some(selectors) = &filter.selectors {
        let (element_shape, _) = function
            .element()
            .ok_or_else(|| EebusError::input(format!("{} has no selectors", function.wire_name())))?;
        object.insert(
            format!("{}Selectors", function.wire_name()),
            value_to_json(element_shape, selectors)?,
        );
    }
    if let Some(elements) = &filter.elements {
        let shape = match function.element() {
            Some((element_shape, _)) => element_shape,
            None => function.shape(),
        };
        object.insert(format!("{}Elements", function.wire_name()), selection_to_json(shape, elements));
    }
    Ok(Json::Object(object))
}

fn filter_from_json(function: Function, json: &Json) -> Result<Filter, EebusError> {
    let object = json.as_object().ok_or_else(|| EebusError::parse("expected a filter"))?;
    let control = object
        .get("cmdControl")
        .and_then(Json::as_object)
        .ok_or_else(|| EebusError::parse("filter is missing `cmdControl`"))?;
    let partial = control.contains_key("partial");
    let delete = control.contains_key("delete");
    let control = match (partial, delete) {
        (true, false) => FilterControl::Partial,
        (false, true) => FilterControl::Delete,
        _ => return Err(EebusError::parse("filter control must be exactly one of partial or delete")),
    };
    let selectors = match object.get(&format!("{}Selectors", function.wire_name())) {
        Some(raw) => {
            let (element_shape, _) = function
                .element()
                .ok_or_else(|| EebusError::parse(format!("{} has no selectors", function.wire_name())))?;
            Some(value_from_json(element_shape, raw)?)
        },
        None => None,
    };
    let elements = match object.get(&format!("{}Elements", function.wire_name())) {
        Some(raw) => {
            let shape = match function.element() {
                Some((element_shape, _)) => element_shape,
                None => function.shape(),
            };
            Some(selection_from_json(shape, raw)?)
        },
        None => None,
    };
    Ok(Filter {
        control,
        selectors,
        elements,
    })
}

// Commands

fn command_to_json(cmd: &Command) -> Result<Json, EebusError> {
    let mut object = Map::new();
    object.insert("function".into(), json!(cmd.function.wire_name()));
    if !cmd.filters.is_empty() {
        let filters: Result<Vec<_>, _> = cmd.filters.iter().map(|f| filter_to_json(cmd.function, f)).collect();
        object.insert("filter".into(), Json::Array(filters?));
    }
    match &cmd.payload {
        CommandPayload::None => {},
        CommandPayload::Data(value) => {
            object.insert(cmd.function.wire_name().into(), value_to_json(cmd.function.shape(), value)?);
        },
        CommandPayload::Result(result) => {
            let mut body = Map::new();
            body.insert("errorNumber".into(), json!(result.error_number));
            if let Some(description) = &result.description {
                body.insert("description".into(), json!(description));
            }
            object.insert("resultData".into(), Json::Object(body));
        },
    }
    Ok(Json::Object(object))
}

fn command_from_json(json: &Json) -> Result<Command, EebusError> {
    let object = json.as_object().ok_or_else(|| EebusError::parse("expected a cmd object"))?;
    let function = match object.get("function").and_then(Json::as_str) {
        Some(name) => {
            Function::from_wire_name(name).ok_or_else(|| EebusError::parse(format!("unknown function `{}`", name)))?
        },
        // Without an explicit function field the payload key decides
        None => object
            .keys()
            .find_map(|key| Function::from_wire_name(key))
            .ok_or_else(|| EebusError::parse("cmd carries no recognisable function"))?,
    };
    let filters = match object.get("filter").and_then(Json::as_array) {
        Some(raw) => raw
            .iter()
            .map(|f| filter_from_json(function, f))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    let payload = if function == Function::ResultData {
        let body = object
            .get("resultData")
            .and_then(Json::as_object)
            .ok_or_else(|| EebusError::parse("missing resultData payload"))?;
        let error_number = body
            .get("errorNumber")
            .and_then(Json::as_u64)
            .ok_or_else(|| EebusError::parse("resultData is missing `errorNumber`"))? as u32;
        let description = body.get("description").and_then(Json::as_str).map(String::from);
        CommandPayload::Result(ResultData {
            error_number,
            description,
        })
    } else {
        match object.get(function.wire_name()) {
            Some(raw) => CommandPayload::Data(value_from_json(function.shape(), raw)?),
            None => CommandPayload::None,
        }
    };
    Ok(Command {
        function,
        filters,
        payload,
    })
}

// Header

fn address_to_json(address: &FeatureAddress) -> Json {
    let mut object = Map::new();
    if let Some(device) = &address.device {
        object.insert("device".into(), json!(device.as_str()));
    }
    object.insert("entity".into(), json!(address.entity));
    object.insert("feature".into(), json!(address.feature));
    Json::Object(object)
}

fn address_from_json(json: &Json) -> Result<FeatureAddress, EebusError> {
    let object = json.as_object().ok_or_else(|| EebusError::parse("expected an address"))?;
    let device = object
        .get("device")
        .and_then(Json::as_str)
        .map(DeviceAddress::new);
    let entity = object
        .get("entity")
        .and_then(Json::as_array)
        .ok_or_else(|| EebusError::parse("address is missing `entity`"))?
        .iter()
        .map(|id| {
            id.as_u64()
                .map(|id| id as u32)
                .ok_or_else(|| EebusError::parse("entity ids must be unsigned"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let feature = object
        .get("feature")
        .and_then(Json::as_u64)
        .ok_or_else(|| EebusError::parse("address is missing `feature`"))? as u32;
    Ok(FeatureAddress::new(device, entity, feature))
}

fn header_to_json(header: &Header) -> Json {
    let mut object = Map::new();
    object.insert("specificationVersion".into(), json!(header.specification_version));
    object.insert("addressSource".into(), address_to_json(&header.address_source));
    object.insert("addressDestination".into(), address_to_json(&header.address_destination));
    object.insert("msgCounter".into(), json!(header.msg_counter.0));
    if let Some(reference) = header.msg_counter_reference {
        object.insert("msgCounterReference".into(), json!(reference.0));
    }
    object.insert("cmdClassifier".into(), json!(header.cmd_classifier.wire_name()));
    if let Some(ack) = header.ack_request {
        object.insert("ackRequest".into(), json!(ack));
    }
    Json::Object(object)
}

fn header_from_json(json: &Json) -> Result<Header, EebusError> {
    let object = json.as_object().ok_or_else(|| EebusError::parse("expected a header"))?;
    let specification_version = object
        .get("specificationVersion")
        .and_then(Json::as_str)
        .ok_or_else(|| EebusError::parse("header is missing `specificationVersion`"))?
        .to_string();
    let address_source = address_from_json(
        object
            .get("addressSource")
            .ok_or_else(|| EebusError::parse("header is missing `addressSource`"))?,
    )?;
    let address_destination = address_from_json(
        object
            .get("addressDestination")
            .ok_or_else(|| EebusError::parse("header is missing `addressDestination`"))?,
    )?;
    let msg_counter = MsgCounter(
        object
            .get("msgCounter")
            .and_then(Json::as_u64)
            .ok_or_else(|| EebusError::parse("header is missing `msgCounter`"))?,
    );
    let msg_counter_reference = object.get("msgCounterReference").and_then(Json::as_u64).map(MsgCounter);
    let cmd_classifier = object
        .get("cmdClassifier")
        .and_then(Json::as_str)
        .and_then(CmdClassifier::from_wire_name)
        .ok_or_else(|| EebusError::parse("header carries no valid `cmdClassifier`"))?;
    let ack_request = object.get("ackRequest").and_then(Json::as_bool);
    Ok(Header {
        specification_version,
        address_source,
        address_destination,
        msg_counter,
        msg_counter_reference,
        cmd_classifier,
        ack_request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{shapes, SPECIFICATION_VERSION};

    fn sample_header(classifier: CmdClassifier) -> Header {
        Header {
            specification_version: SPECIFICATION_VERSION.to_string(),
            address_source: FeatureAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1], 2),
            address_destination: FeatureAddress::new(Some(DeviceAddress::new("d:_n:b_2")), vec![], 0),
            msg_counter: MsgCounter(42),
            msg_counter_reference: None,
            cmd_classifier: classifier,
            ack_request: None,
        }
    }

    fn measurement(id: u64, number: i64, scale: i64) -> Value {
        let shape = &shapes::MEASUREMENT_DATA;
        let mut element = Value::empty(shape);
        element.set_field(shape, "measurementId", Value::Simple(Leaf::Unsigned(id))).unwrap();
        let mut value = Value::empty(&shapes::SCALED_NUMBER);
        value.set_field(&shapes::SCALED_NUMBER, "number", Value::Simple(Leaf::Number(number))).unwrap();
        value.set_field(&shapes::SCALED_NUMBER, "scale", Value::Simple(Leaf::Number(scale))).unwrap();
        element.set_field(shape, "value", value).unwrap();
        element
    }

    #[test]
    fn datagrams_round_trip() {
        let codec = JsonCodec::new();
        let datagram = Datagram::new(
            sample_header(CmdClassifier::Notify),
            Command::with_data(Function::MeasurementListData, Value::Container(vec![measurement(1, 1000, -2)])),
        );
        let bytes = codec.serialise(&datagram).unwrap();
        let parsed = codec.parse(&bytes).unwrap();
        assert_eq!(parsed, datagram);
    }

    #[test]
    fn filters_round_trip() {
        let codec = JsonCodec::new();
        let mut selector = Value::empty(&shapes::MEASUREMENT_DATA);
        selector
            .set_field(&shapes::MEASUREMENT_DATA, "measurementId", Value::Simple(Leaf::Unsigned(7)))
            .unwrap();
        let elements = Selection::from_paths(&shapes::MEASUREMENT_DATA, &["value.number"]).unwrap();
        let datagram = Datagram::new(
            sample_header(CmdClassifier::Write),
            Command::with_filters(
                Function::MeasurementListData,
                vec![Filter::delete(Some(selector), Some(elements))],
                CommandPayload::None,
            ),
        );
        let parsed = codec.parse(&codec.serialise(&datagram).unwrap()).unwrap();
        assert_eq!(parsed, datagram);
    }

    #[test]
    fn result_commands_round_trip() {
        let codec = JsonCodec::new();
        let datagram = Datagram::new(
            sample_header(CmdClassifier::Result),
            Command::result(ResultData::error(ResultData::COMMAND_NOT_SUPPORTED, "not supported")),
        );
        let parsed = codec.parse(&codec.serialise(&datagram).unwrap()).unwrap();
        assert_eq!(parsed, datagram);
    }

    #[test]
    fn both_filter_controls_set_is_rejected() {
        let codec = JsonCodec::new();
        let raw = br#"{"datagram":{"header":{"specificationVersion":"1.3.0",
            "addressSource":{"entity":[],"feature":0},
            "addressDestination":{"entity":[],"feature":0},
            "msgCounter":1,"cmdClassifier":"write"},
            "payload":{"cmd":[{"function":"measurementListData",
                "filter":[{"cmdControl":{"partial":{},"delete":{}}}]}]}}}"#;
        let err = codec.parse(raw.as_slice()).unwrap_err();
        assert!(matches!(err, EebusError::Parse(_)));
    }

    #[test]
    fn unknown_payload_keys_are_skipped() {
        let text = r#"{"measurementId": 3, "futureField": 1}"#;
        let codec = JsonCodec::new();
        let value = codec.parse_unformatted(&shapes::MEASUREMENT_DATA, text).unwrap();
        assert_eq!(value.field(&shapes::MEASUREMENT_DATA, "measurementId"), Some(&Value::Simple(Leaf::Unsigned(3))));
    }

    #[test]
    fn durations_round_trip() {
        for (text, millis) in [
            ("PT4S", 4_000),
            ("PT1M30S", 90_000),
            ("PT2H", 7_200_000),
            ("P1DT0S", 86_400_000),
            ("PT0.500S", 500),
        ] {
            let parsed = parse_duration(text).unwrap();
            assert_eq!(parsed.num_milliseconds(), millis, "{}", text);
            assert_eq!(parse_duration(&format_duration(&parsed)).unwrap(), parsed);
        }
        assert!(parse_duration("4 seconds").is_err());
    }
}
