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

//! The authoritative inventory of subscriptions remote peers hold on
//! local server features.

use eebus_common::{EebusError, Ski};

use crate::model::{shapes, FeatureAddress, Leaf, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEntry {
    pub id: u64,
    pub ski: Ski,
    pub client: FeatureAddress,
    pub server: FeatureAddress,
}

#[derive(Default)]
pub struct SubscriptionManager {
    entries: Vec<SubscriptionEntry>,
    next_id: u64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a subscription; an identical client/server pair is a
    /// no-op.
    pub fn add(&mut self, ski: Ski, client: FeatureAddress, server: FeatureAddress) -> Result<u64, EebusError> {
        if self
            .entries
            .iter()
            .any(|entry| entry.client == client && entry.server == server)
        {
            return Err(EebusError::NoChange);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(SubscriptionEntry {
            id,
            ski,
            client,
            server,
        });
        Ok(id)
    }

    pub fn remove_by_id(&mut self, id: u64) -> Result<SubscriptionEntry, EebusError> {
        match self.entries.iter().position(|entry| entry.id == id) {
            Some(index) => Ok(self.entries.remove(index)),
            None => Err(EebusError::NoChange),
        }
    }

    /// Remove entries matching the given client and/or server address.
    pub fn remove_matching(
        &mut self,
        client: Option<&FeatureAddress>,
        server: Option<&FeatureAddress>,
    ) -> Vec<SubscriptionEntry> {
        let (removed, kept) = self.entries.drain(..).partition(|entry| {
            client.map(|c| &entry.client == c).unwrap_or(true) && server.map(|s| &entry.server == s).unwrap_or(true)
        });
        self.entries = kept;
        removed
    }

    /// Remove every entry held by a peer, e.g. on disconnect.
    pub fn remove_for_ski(&mut self, ski: &Ski) -> Vec<SubscriptionEntry> {
        let (removed, kept) = self.entries.drain(..).partition(|entry| &entry.ski == ski);
        self.entries = kept;
        removed
    }

    pub fn entries(&self) -> &[SubscriptionEntry] {
        &self.entries
    }

    /// The peers subscribed to a local server feature.
    pub fn subscribers_of<'a>(&'a self, server: &'a FeatureAddress) -> impl Iterator<Item = &'a SubscriptionEntry> {
        self.entries.iter().filter(move |entry| &entry.server == server)
    }

    /// The wire payload for `nodeManagementSubscriptionData`.
    pub fn to_value(&self) -> Value {
        Value::Container(
            self.entries
                .iter()
                .map(|entry| {
                    let mut element = Value::empty(&shapes::SUBSCRIPTION_ENTRY);
                    let _ = element.set_field(
                        &shapes::SUBSCRIPTION_ENTRY,
                        "subscriptionId",
                        Value::Simple(Leaf::Unsigned(entry.id)),
                    );
                    let _ = element.set_field(&shapes::SUBSCRIPTION_ENTRY, "clientAddress", entry.client.to_value());
                    let _ = element.set_field(&shapes::SUBSCRIPTION_ENTRY, "serverAddress", entry.server.to_value());
                    element
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceAddress;

    fn ski(byte: u8) -> Ski {
        Ski::new([byte; 20])
    }

    fn address(device: &str, feature: u32) -> FeatureAddress {
        FeatureAddress::new(Some(DeviceAddress::new(device)), vec![1], feature)
    }

    #[test]
    fn duplicate_pairs_are_a_no_op() {
        let mut manager = SubscriptionManager::new();
        manager.add(ski(1), address("d:_n:a_1", 2), address("d:_n:b_2", 3)).unwrap();
        let err = manager.add(ski(1), address("d:_n:a_1", 2), address("d:_n:b_2", 3)).unwrap_err();
        assert!(err.is_no_change());
        assert_eq!(manager.entries().len(), 1);
    }

    #[test]
    fn removal_by_ski_clears_a_peers_entries() {
        let mut manager = SubscriptionManager::new();
        manager.add(ski(1), address("d:_n:a_1", 2), address("d:_n:b_2", 3)).unwrap();
        manager.add(ski(2), address("d:_n:c_3", 2), address("d:_n:b_2", 4)).unwrap();
        let removed = manager.remove_for_ski(&ski(1));
        assert_eq!(removed.len(), 1);
        assert_eq!(manager.entries().len(), 1);
        assert_eq!(manager.entries()[0].ski, ski(2));
    }

    #[test]
    fn subscribers_are_found_by_server_address() {
        let mut manager = SubscriptionManager::new();
        let server = address("d:_n:b_2", 3);
        manager.add(ski(1), address("d:_n:a_1", 2), server.clone()).unwrap();
        manager.add(ski(2), address("d:_n:c_3", 2), address("d:_n:b_2", 9)).unwrap();
        assert_eq!(manager.subscribers_of(&server).count(), 1);
    }
}
