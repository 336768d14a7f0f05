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

//! SPINE addresses. Equality is structural everywhere.

use std::fmt::{Display, Error, Formatter};

use crate::model::{
    shapes,
    value::{Leaf, Value},
};

/// The opaque string identifier of a device (`d:_n:<vendor>_<serial>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    pub fn new<T: Into<String>>(address: T) -> Self {
        DeviceAddress(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(&self.0)
    }
}

/// Addresses an entity within a device: the device plus an ordered sequence
/// of entity ids. The root entity is the empty sequence; children extend
/// their parent's sequence by one id. The device part may be absent while
/// it is still unknown (e.g. before detailed discovery has completed).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityAddress {
    pub device: Option<DeviceAddress>,
    pub entity: Vec<u32>,
}

impl EntityAddress {
    pub fn new(device: Option<DeviceAddress>, entity: Vec<u32>) -> Self {
        Self { device, entity }
    }

    pub fn root(device: Option<DeviceAddress>) -> Self {
        Self { device, entity: Vec::new() }
    }

    pub fn is_root(&self) -> bool {
        self.entity.is_empty()
    }

    /// Address of a feature within this entity.
    pub fn feature(&self, feature: u32) -> FeatureAddress {
        FeatureAddress {
            device: self.device.clone(),
            entity: self.entity.clone(),
            feature,
        }
    }
}

impl Display for EntityAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match &self.device {
            Some(device) => write!(f, "{}:[", device)?,
            None => write!(f, "?:[")?,
        }
        for (i, id) in self.entity.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "]")
    }
}

/// Addresses a feature: an entity address plus the feature id. Feature ids
/// are allocated per entity; the root entity allocates from 0, non-root
/// entities from 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureAddress {
    pub device: Option<DeviceAddress>,
    pub entity: Vec<u32>,
    pub feature: u32,
}

impl FeatureAddress {
    pub fn new(device: Option<DeviceAddress>, entity: Vec<u32>, feature: u32) -> Self {
        Self { device, entity, feature }
    }

    pub fn entity_address(&self) -> EntityAddress {
        EntityAddress {
            device: self.device.clone(),
            entity: self.entity.clone(),
        }
    }

    /// Whether an inbound destination address routes to the given local
    /// feature. The device part is compared only when both sides carry it;
    /// a peer may omit the device while it has not completed discovery.
    pub fn routes_to(&self, local: &FeatureAddress) -> bool {
        if self.entity != local.entity || self.feature != local.feature {
            return false;
        }
        match (&self.device, &local.device) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl Display for FeatureAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}.{}", self.entity_address(), self.feature)
    }
}

fn entity_ids_to_value(entity: &[u32]) -> Value {
    Value::List(entity.iter().map(|id| Value::Simple(Leaf::Unsigned(u64::from(*id)))).collect())
}

fn entity_ids_from_value(value: &Value) -> Option<Vec<u32>> {
    value
        .elements()?
        .iter()
        .map(|id| id.as_unsigned().map(|id| id as u32))
        .collect()
}

impl EntityAddress {
    /// The payload form used inside node-management functions.
    pub fn to_value(&self) -> Value {
        Value::Sequence(vec![
            self.device.as_ref().map(|d| Value::Simple(Leaf::Text(d.as_str().to_string()))),
            Some(entity_ids_to_value(&self.entity)),
        ])
    }

    pub fn from_value(value: &Value) -> Option<EntityAddress> {
        let device = value
            .field(&shapes::ENTITY_ADDRESS, "device")
            .and_then(Value::as_text)
            .map(DeviceAddress::new);
        let entity = entity_ids_from_value(value.field(&shapes::ENTITY_ADDRESS, "entity")?)?;
        Some(EntityAddress { device, entity })
    }
}

impl FeatureAddress {
    /// The payload form used inside node-management functions.
    pub fn to_value(&self) -> Value {
        Value::Sequence(vec![
            self.device.as_ref().map(|d| Value::Simple(Leaf::Text(d.as_str().to_string()))),
            Some(entity_ids_to_value(&self.entity)),
            Some(Value::Simple(Leaf::Unsigned(u64::from(self.feature)))),
        ])
    }

    pub fn from_value(value: &Value) -> Option<FeatureAddress> {
        let device = value
            .field(&shapes::FEATURE_ADDRESS, "device")
            .and_then(Value::as_text)
            .map(DeviceAddress::new);
        let entity = entity_ids_from_value(value.field(&shapes::FEATURE_ADDRESS, "entity")?)?;
        let feature = value.field(&shapes::FEATURE_ADDRESS, "feature")?.as_unsigned()? as u32;
        Some(FeatureAddress { device, entity, feature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_equality_is_structural() {
        let a = FeatureAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1, 2], 3);
        let b = FeatureAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1, 2], 3);
        assert_eq!(a, b);
        assert_ne!(a, FeatureAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1], 3));
    }

    #[test]
    fn routing_ignores_a_missing_device_part() {
        let local = FeatureAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1], 2);
        let without_device = FeatureAddress::new(None, vec![1], 2);
        assert!(without_device.routes_to(&local));
        let wrong_device = FeatureAddress::new(Some(DeviceAddress::new("d:_n:b_2")), vec![1], 2);
        assert!(!wrong_device.routes_to(&local));
    }

    #[test]
    fn addresses_round_trip_through_their_payload_form() {
        let address = FeatureAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1, 2], 3);
        assert_eq!(FeatureAddress::from_value(&address.to_value()), Some(address));
        let entity = EntityAddress::new(None, vec![1]);
        assert_eq!(EntityAddress::from_value(&entity.to_value()), Some(entity));
    }

    #[test]
    fn root_entity_formats_with_an_empty_sequence() {
        let root = EntityAddress::root(Some(DeviceAddress::new("d:_n:a_1")));
        assert!(root.is_root());
        assert_eq!(root.feature(0).to_string(), "d:_n:a_1:[].0");
    }
}
