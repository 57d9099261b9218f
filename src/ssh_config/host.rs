use itertools::Itertools;
use std::collections::BTreeMap;

use super::EntryType;

pub(crate) type Entry = (EntryType, String);

/// One selectable `Host` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// The `Host` directive value.
    pub alias: String,
    /// The last `HostName` of the block, empty if there is none.
    pub hostname: String,
}

impl Host {
    #[must_use]
    pub fn new(alias: impl Into<String>, hostname: impl Into<String>) -> Host {
        Host {
            alias: alias.into(),
            hostname: hostname.into(),
        }
    }
}

/// Every directive of one host block, keyed by canonical directive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDetails {
    pub alias: String,
    pub hostname: String,
    pub attributes: BTreeMap<String, String>,
}

impl HostDetails {
    #[must_use]
    pub fn new(host: &Host) -> HostDetails {
        HostDetails {
            alias: host.alias.clone(),
            hostname: host.hostname.clone(),
            attributes: BTreeMap::new(),
        }
    }

    pub(crate) fn update(&mut self, entry: &Entry) {
        self.attributes
            .insert(entry.0.canonical_name(), entry.1.clone());
    }

    /// Key/value rows to display, sorted by key.
    ///
    /// `HostName` is filled in from the host list when the block itself does
    /// not set it.
    #[must_use]
    pub fn rows(&self) -> Vec<(&str, &str)> {
        let hostname_key = EntryType::HostName.to_string();
        let synthesized = (!self.attributes.contains_key(&hostname_key)
            && !self.hostname.is_empty())
        .then_some(("HostName", self.hostname.as_str()));

        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(synthesized)
            .sorted_by(|a, b| a.0.cmp(b.0))
            .collect()
    }
}
