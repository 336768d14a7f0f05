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

//! The destination list: descriptions of the directly reachable devices.

use crate::model::{shapes, DeviceAddress, Leaf, Value};

/// One `NetworkManagementDeviceDescription` element.
pub fn device_description(address: &DeviceAddress, device_type: Option<u32>, network_feature_set: Option<u32>) -> Value {
    let description = Value::Sequence(vec![
        Some(Value::Sequence(vec![Some(Value::Simple(Leaf::Text(
            address.as_str().to_string(),
        )))])),
        device_type.map(|tag| Value::Simple(Leaf::Tag(tag))),
        network_feature_set.map(|tag| Value::Simple(Leaf::Tag(tag))),
    ]);
    Value::Sequence(vec![Some(description)])
}

/// Assemble `nodeManagementDestinationListData` from the local device and
/// the currently attached remotes.
pub fn build(descriptions: impl IntoIterator<Item = Value>) -> Value {
    Value::Container(descriptions.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_carry_the_device_address() {
        let value = device_description(&DeviceAddress::new("d:_n:a_1"), Some(1), Some(0));
        let description = value.field(&shapes::DESTINATION_DATA, "deviceDescription").unwrap();
        let address = description
            .field(&shapes::DEVICE_DESCRIPTION, "deviceAddress")
            .and_then(|a| a.field(&shapes::DEVICE_ADDRESS, "device"))
            .and_then(Value::as_text);
        assert_eq!(address, Some("d:_n:a_1"));
    }
}
