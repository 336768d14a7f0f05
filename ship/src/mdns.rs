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

//! The mDNS discovery collaborator seam and the entry model.
//!
//! The browse loop itself belongs to the collaborator; entry validation,
//! the own-SKI filter and the randomised browse interval live here so
//! every backend behaves the same.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use eebus_common::{EebusError, Ski};
use eebus_shutdown::ShutdownSignal;
use rand::Rng;
use tokio::sync::mpsc;

/// The service type EEBUS services register under.
pub const SERVICE_TYPE: &str = "_ship._tcp";
/// The WebSocket path announced in TXT records.
pub const SERVICE_PATH: &str = "/ship/";
/// TXT record schema version.
pub const TXT_VERS: &str = "1";

const BROWSE_INTERVAL_MIN_SECS: u64 = 10;
const BROWSE_INTERVAL_MAX_SECS: u64 = 20;

/// One validated peer advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdnsEntry {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub interface: Option<String>,
    pub txt_vers: String,
    /// The peer's SHIP identifier.
    pub id: String,
    pub path: String,
    pub ski: Ski,
    /// Whether the peer auto-registers new partners.
    pub register: bool,
    pub brand: String,
    pub device_type: String,
    pub model: String,
}

impl MdnsEntry {
    /// Validate a raw advertisement. Every mandatory TXT field must be
    /// present and `register` must be `"true"` or `"false"`.
    pub fn from_txt(
        service_name: &str,
        host: &str,
        port: u16,
        interface: Option<&str>,
        txt: &HashMap<String, String>,
    ) -> Result<MdnsEntry, EebusError> {
        let field = |name: &str| {
            txt.get(name)
                .cloned()
                .ok_or_else(|| EebusError::parse(format!("mDNS entry `{}` is missing txt `{}`", service_name, name)))
        };
        let register = match field("register")?.as_str() {
            "true" => true,
            "false" => false,
            other => {
                return Err(EebusError::parse(format!(
                    "mDNS entry `{}` has invalid register value `{}`",
                    service_name, other
                )))
            },
        };
        let ski: Ski = field("ski")?
            .parse()
            .map_err(|e| EebusError::parse(format!("mDNS entry `{}` has an invalid ski: {}", service_name, e)))?;
        Ok(MdnsEntry {
            service_name: service_name.to_string(),
            host: host.to_string(),
            port,
            interface: interface.map(str::to_string),
            txt_vers: field("txtvers")?,
            id: field("id")?,
            path: field("path")?,
            ski,
            register,
            brand: field("brand")?,
            device_type: field("type")?,
            model: field("model")?,
        })
    }
}

/// Drop advertisements of the local service itself.
pub fn filter_own_entries(entries: Vec<MdnsEntry>, local_ski: &Ski) -> Vec<MdnsEntry> {
    entries.into_iter().filter(|entry| &entry.ski != local_ski).collect()
}

/// The browse interval, randomised within 10–20 s so fleets of devices do
/// not storm the network in lockstep.
pub fn random_browse_interval() -> Duration {
    let secs = rand::thread_rng().gen_range(BROWSE_INTERVAL_MIN_SECS..=BROWSE_INTERVAL_MAX_SECS);
    Duration::from_secs(secs)
}

/// What the local service announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdnsAnnouncement {
    pub service_name: String,
    pub port: u16,
    pub ski: Ski,
    pub ship_id: String,
    pub brand: String,
    pub model: String,
    pub device_type: String,
    pub register: bool,
}

/// The discovery backend. Implementations own their browse loop and hand
/// entry sets to the service by message passing; the externally visible
/// contract is that a peer appears in a refresh within one browse interval
/// of beginning to advertise.
#[async_trait]
pub trait MdnsProvider: Send + Sync {
    /// Publish the local service. A refusal surfaces as
    /// [`EebusError::Activate`].
    async fn announce(&self, announcement: MdnsAnnouncement) -> Result<(), EebusError>;

    /// Withdraw the announcement. Idempotent.
    async fn withdraw(&self);

    /// Run the browse loop until shutdown, pushing each refreshed entry
    /// set into the channel.
    async fn browse(&self, entries: mpsc::Sender<Vec<MdnsEntry>>, shutdown: ShutdownSignal);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txt(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn full_txt() -> HashMap<String, String> {
        txt(&[
            ("txtvers", "1"),
            ("id", "Brand-Model-1"),
            ("path", SERVICE_PATH),
            ("ski", &"ab".repeat(20)),
            ("register", "false"),
            ("brand", "Brand"),
            ("type", "HeatPumpAppliance"),
            ("model", "Model"),
        ])
    }

    #[test]
    fn a_complete_entry_validates() {
        let entry = MdnsEntry::from_txt("svc", "host.local", 4711, Some("eth0"), &full_txt()).unwrap();
        assert_eq!(entry.port, 4711);
        assert!(!entry.register);
        assert_eq!(entry.ski, Ski::new([0xab; 20]));
    }

    #[test]
    fn missing_mandatory_fields_invalidate_the_entry() {
        let mut incomplete = full_txt();
        incomplete.remove("ski");
        assert!(MdnsEntry::from_txt("svc", "host.local", 4711, None, &incomplete).is_err());
    }

    #[test]
    fn register_must_be_a_boolean_literal() {
        let mut invalid = full_txt();
        invalid.insert("register".into(), "yes".into());
        assert!(MdnsEntry::from_txt("svc", "host.local", 4711, None, &invalid).is_err());
    }

    #[test]
    fn own_entries_are_filtered() {
        let own = Ski::new([0xab; 20]);
        let entry = MdnsEntry::from_txt("svc", "host.local", 4711, None, &full_txt()).unwrap();
        assert!(filter_own_entries(vec![entry.clone()], &own).is_empty());
        assert_eq!(filter_own_entries(vec![entry], &Ski::new([1; 20])).len(), 1);
    }

    #[test]
    fn browse_interval_stays_in_bounds() {
        for _ in 0..50 {
            let interval = random_browse_interval();
            assert!(interval >= Duration::from_secs(BROWSE_INTERVAL_MIN_SECS));
            assert!(interval <= Duration::from_secs(BROWSE_INTERVAL_MAX_SECS));
        }
    }
}
