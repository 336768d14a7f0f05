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

//! Periodic heartbeat publication on a device-diagnosis server feature.
//! Subscribers use the declared timeout to detect a silent peer.

use std::time::Duration;

use eebus_shutdown::ShutdownSignal;
use log::*;
use tokio::task::JoinHandle;

use crate::{device::DeviceLocal, model::FeatureAddress};

const LOG_TARGET: &str = "eebus::spine::heartbeat";

pub struct HeartbeatPublisher {
    device: DeviceLocal,
    feature: FeatureAddress,
    timeout: Duration,
}

impl HeartbeatPublisher {
    pub fn new(device: DeviceLocal, feature: FeatureAddress, timeout: Duration) -> Self {
        Self {
            device,
            feature,
            timeout,
        }
    }

    /// Publish at twice the declared timeout rate until shutdown.
    pub fn spawn(self, mut shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.timeout / 2;
            let mut interval = tokio::time::interval(period.max(Duration::from_millis(100)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    _ = interval.tick() => {
                        if let Err(e) = self.device.beat_heartbeat(&self.feature, self.timeout) {
                            warn!(target: LOG_TARGET, "Heartbeat on {} failed: {}", self.feature, e);
                        }
                    },
                }
            }
            debug!(target: LOG_TARGET, "Heartbeat publisher for {} stopped", self.feature);
        })
    }
}
