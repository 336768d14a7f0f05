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

use crate::EebusError;

/// Identifying information of the local device, as configured by the
/// embedder. The SPINE device address and the SHIP identifier are both
/// derived from these fields and never configured directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    vendor_code: String,
    brand_name: String,
    device_model: String,
    serial_number: String,
}

impl DeviceInfo {
    pub fn new(
        vendor_code: String,
        brand_name: String,
        device_model: String,
        serial_number: String,
    ) -> Result<Self, EebusError> {
        if vendor_code.is_empty() || brand_name.is_empty() || device_model.is_empty() || serial_number.is_empty() {
            return Err(EebusError::input("device info fields must not be empty"));
        }
        Ok(Self {
            vendor_code,
            brand_name,
            device_model,
            serial_number,
        })
    }

    pub fn vendor_code(&self) -> &str {
        &self.vendor_code
    }

    pub fn brand_name(&self) -> &str {
        &self.brand_name
    }

    pub fn device_model(&self) -> &str {
        &self.device_model
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// The SPINE device address: `d:_n:<vendor>_<serial>`.
    pub fn device_address(&self) -> String {
        format!("d:_n:{}_{}", self.vendor_code, self.serial_number)
    }

    /// The identifier announced during the SHIP access-methods exchange.
    pub fn ship_id(&self) -> String {
        format!("{}-{}-{}", self.brand_name, self.device_model, self.serial_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_derives_the_device_address() {
        let info = DeviceInfo::new("Demo".into(), "Brand".into(), "HeatPump".into(), "123456".into()).unwrap();
        assert_eq!(info.device_address(), "d:_n:Demo_123456");
        assert_eq!(info.ship_id(), "Brand-HeatPump-123456");
    }

    #[test]
    fn it_rejects_empty_fields() {
        assert!(DeviceInfo::new("".into(), "b".into(), "m".into(), "s".into()).is_err());
    }
}
