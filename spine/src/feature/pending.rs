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

//! The pending-request table: outbound reads and writes waiting for their
//! correlated reply. Entries are single-shot and evicted when the
//! max-response-delay passes without an answer.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use eebus_common::{EebusError, Ski};

use crate::model::Datagram;

/// An inbound reply or result delivered to a response callback.
#[derive(Debug, Clone)]
pub struct ResponseMessage {
    pub ski: Ski,
    pub datagram: Datagram,
}

/// Fires exactly once, for the first reply carrying the registered
/// msgCounter reference.
pub type ResponseCallback = Box<dyn FnOnce(ResponseMessage) + Send>;

/// Observes every inbound `result` frame addressed to the feature. Shared
/// so it can be invoked after the device lock is released.
pub type ResultCallback = std::sync::Arc<dyn Fn(&ResponseMessage) + Send + Sync>;

struct PendingRequest {
    ski: Ski,
    callback: ResponseCallback,
    expires_at: Instant,
}

/// Counter-keyed table of requests awaiting a reply.
#[derive(Default)]
pub struct PendingRequests {
    entries: HashMap<u64, PendingRequest>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Register a callback for an outbound msgCounter. Must happen before
    /// the frame is handed to the sender so a fast reply cannot race it.
    pub fn register(
        &mut self,
        msg_counter: u64,
        ski: Ski,
        callback: ResponseCallback,
        max_delay: Duration,
    ) -> Result<(), EebusError> {
        if self.entries.contains_key(&msg_counter) {
            return Err(EebusError::input(format!("msgCounter {} already has a pending request", msg_counter)));
        }
        self.entries.insert(msg_counter, PendingRequest {
            ski,
            callback,
            expires_at: Instant::now() + max_delay,
        });
        Ok(())
    }

    /// Consume the entry for a reply's msgCounter reference; the callback
    /// can only be taken once.
    pub fn take(&mut self, msg_counter: u64) -> Option<ResponseCallback> {
        self.entries.remove(&msg_counter).map(|entry| entry.callback)
    }

    /// Remove and return every entry whose max-response-delay has passed.
    pub fn take_expired(&mut self, now: Instant) -> Vec<(u64, Ski, ResponseCallback)> {
        let expired: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(counter, _)| *counter)
            .collect();
        expired
            .into_iter()
            .filter_map(|counter| {
                self.entries
                    .remove(&counter)
                    .map(|entry| (counter, entry.ski, entry.callback))
            })
            .collect()
    }

    /// Remove and return every entry awaiting an answer from the given
    /// peer, e.g. when its device detaches.
    pub fn take_for_ski(&mut self, ski: &Ski) -> Vec<(u64, ResponseCallback)> {
        let matching: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, entry)| &entry.ski == ski)
            .map(|(counter, _)| *counter)
            .collect();
        matching
            .into_iter()
            .filter_map(|counter| self.entries.remove(&counter).map(|entry| (counter, entry.callback)))
            .collect()
    }

    /// Drain the whole table, e.g. when the local device is torn down.
    pub fn take_all(&mut self) -> Vec<(u64, ResponseCallback)> {
        self.entries.drain().map(|(counter, entry)| (counter, entry.callback)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    fn counting_callback(count: &Arc<AtomicUsize>) -> ResponseCallback {
        let count = count.clone();
        Box::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn ski(byte: u8) -> Ski {
        Ski::new([byte; 20])
    }

    #[test]
    fn a_callback_can_only_be_taken_once() {
        let mut pending = PendingRequests::new();
        let count = Arc::new(AtomicUsize::new(0));
        pending
            .register(42, ski(1), counting_callback(&count), Duration::from_secs(10))
            .unwrap();
        assert!(pending.take(42).is_some());
        assert!(pending.take(42).is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut pending = PendingRequests::new();
        let count = Arc::new(AtomicUsize::new(0));
        pending.register(1, ski(1), counting_callback(&count), Duration::from_secs(10)).unwrap();
        let err = pending
            .register(1, ski(1), counting_callback(&count), Duration::from_secs(10))
            .unwrap_err();
        assert!(matches!(err, EebusError::InputArgument(_)));
    }

    #[test]
    fn expired_entries_are_evicted() {
        let mut pending = PendingRequests::new();
        let count = Arc::new(AtomicUsize::new(0));
        pending.register(1, ski(1), counting_callback(&count), Duration::from_millis(0)).unwrap();
        pending.register(2, ski(1), counting_callback(&count), Duration::from_secs(600)).unwrap();
        let expired = pending.take_expired(Instant::now() + Duration::from_millis(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 1);
        assert_eq!(expired[0].1, ski(1));
        assert!(pending.take(2).is_some());
    }

    #[test]
    fn eviction_by_ski_only_touches_that_peer() {
        let mut pending = PendingRequests::new();
        let count = Arc::new(AtomicUsize::new(0));
        pending.register(1, ski(1), counting_callback(&count), Duration::from_secs(600)).unwrap();
        pending.register(2, ski(2), counting_callback(&count), Duration::from_secs(600)).unwrap();
        let evicted = pending.take_for_ski(&ski(1));
        assert_eq!(evicted.len(), 1);
        assert!(pending.take(2).is_some());
    }
}
