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

use std::time::Duration;

use eebus_common::{DeviceInfo, EebusError};
use eebus_spine::device::DeviceType;

const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_MAX_RESPONSE_DELAY: Duration = Duration::from_secs(10);

/// Everything the embedder configures about the local service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    device_info: DeviceInfo,
    device_type: DeviceType,
    port: u16,
    heartbeat_timeout: Duration,
    max_response_delay: Duration,
    /// Announce `register=true`, i.e. accept any pairing without user
    /// interaction.
    auto_accept: bool,
}

impl ServiceConfig {
    pub fn new(
        vendor_code: &str,
        brand_name: &str,
        device_model: &str,
        serial_number: &str,
        device_type: DeviceType,
        port: u16,
    ) -> Result<Self, EebusError> {
        let device_info = DeviceInfo::new(
            vendor_code.to_string(),
            brand_name.to_string(),
            device_model.to_string(),
            serial_number.to_string(),
        )?;
        if port == 0 {
            return Err(EebusError::input("a listen port must be configured"));
        }
        Ok(Self {
            device_info,
            device_type,
            port,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            max_response_delay: DEFAULT_MAX_RESPONSE_DELAY,
            auto_accept: false,
        })
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    pub fn set_heartbeat_timeout(&mut self, timeout: Duration) {
        self.heartbeat_timeout = timeout;
    }

    pub fn max_response_delay(&self) -> Duration {
        self.max_response_delay
    }

    pub fn set_max_response_delay(&mut self, delay: Duration) {
        self.max_response_delay = delay;
    }

    pub fn auto_accept(&self) -> bool {
        self.auto_accept
    }

    pub fn set_auto_accept(&mut self, auto_accept: bool) {
        self.auto_accept = auto_accept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_validates_the_port() {
        assert!(ServiceConfig::new("Demo", "Brand", "HeatPump", "1", DeviceType::HeatPumpAppliance, 0).is_err());
        let config = ServiceConfig::new("Demo", "Brand", "HeatPump", "1", DeviceType::HeatPumpAppliance, 4711).unwrap();
        assert_eq!(config.port(), 4711);
        assert_eq!(config.device_info().device_address(), "d:_n:Demo_1");
    }
}
