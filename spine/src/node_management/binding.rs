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

//! The authoritative inventory of bindings remote peers hold on local
//! server features. A binding authorises its holder to write.

use eebus_common::{EebusError, Ski};

use crate::model::{shapes, FeatureAddress, Leaf, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct BindingEntry {
    pub id: u64,
    pub ski: Ski,
    pub client: FeatureAddress,
    pub server: FeatureAddress,
}

#[derive(Default)]
pub struct BindingManager {
    entries: Vec<BindingEntry>,
    next_id: u64,
}

impl BindingManager {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

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
        self.entries.push(BindingEntry {
            id,
            ski,
            client,
            server,
        });
        Ok(id)
    }

    pub fn remove_by_id(&mut self, id: u64) -> Result<BindingEntry, EebusError> {
        match self.entries.iter().position(|entry| entry.id == id) {
            Some(index) => Ok(self.entries.remove(index)),
            None => Err(EebusError::NoChange),
        }
    }

    pub fn remove_matching(
        &mut self,
        client: Option<&FeatureAddress>,
        server: Option<&FeatureAddress>,
    ) -> Vec<BindingEntry> {
        let (removed, kept) = self.entries.drain(..).partition(|entry| {
            client.map(|c| &entry.client == c).unwrap_or(true) && server.map(|s| &entry.server == s).unwrap_or(true)
        });
        self.entries = kept;
        removed
    }

    pub fn remove_for_ski(&mut self, ski: &Ski) -> Vec<BindingEntry> {
        let (removed, kept) = self.entries.drain(..).partition(|entry| &entry.ski == ski);
        self.entries = kept;
        removed
    }

    pub fn entries(&self) -> &[BindingEntry] {
        &self.entries
    }

    /// Whether the peer has a binding from `client` onto `server`.
    pub fn is_bound(&self, client: &FeatureAddress, server: &FeatureAddress) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.client.routes_to(client) && &entry.server == server)
    }

    /// The wire payload for `nodeManagementBindingData`.
    pub fn to_value(&self) -> Value {
        Value::Container(
            self.entries
                .iter()
                .map(|entry| {
                    let mut element = Value::empty(&shapes::BINDING_ENTRY);
                    let _ =
                        element.set_field(&shapes::BINDING_ENTRY, "bindingId", Value::Simple(Leaf::Unsigned(entry.id)));
                    let _ = element.set_field(&shapes::BINDING_ENTRY, "clientAddress", entry.client.to_value());
                    let _ = element.set_field(&shapes::BINDING_ENTRY, "serverAddress", entry.server.to_value());
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

    fn address(device: &str, feature: u32) -> FeatureAddress {
        FeatureAddress::new(Some(DeviceAddress::new(device)), vec![1], feature)
    }

    #[test]
    fn bindings_answer_is_bound() {
        let mut manager = BindingManager::new();
        let client = address("d:_n:a_1", 2);
        let server = address("d:_n:b_2", 3);
        manager.add(Ski::new([9; 20]), client.clone(), server.clone()).unwrap();
        assert!(manager.is_bound(&client, &server));
        assert!(!manager.is_bound(&client, &address("d:_n:b_2", 4)));
        manager.remove_matching(Some(&client), None);
        assert!(!manager.is_bound(&client, &server));
    }
}
