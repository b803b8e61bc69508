//! Runtime discovery of usable backends.
//!
//! Probing is explicit: nothing happens until the host calls [`probe`] or
//! [`Registry::discover`]. A missing backend is reported as data, never as a
//! panic or an error that aborts discovery of the others.

use std::collections::BTreeMap;

use tracing::warn;

use crate::anonymizer::Anonymizer;
use crate::backend::{aes_self_test, BackendId};
use crate::common::Family;
use crate::error::{Error, Result};
use crate::key::Key;

const PROBE_KEY: &[u8; Key::BYTES] = b"32-char-str-for-AES-key-and-pad.";
const PROBE_INPUT: u128 = 0xc000_0201;

/// Output each backend must produce for `PROBE_INPUT` under `PROBE_KEY`.
const fn probe_expected(id: BackendId) -> u128 {
    match id {
        BackendId::Masked | BackendId::Streaming => 0xc000_7df4,
        BackendId::HostOrder => 0xf7fc_0286,
    }
}

/// Whether a backend can be used in this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Initializes `id` with a fixed key and checks it against a known answer.
pub fn probe(id: BackendId) -> Availability {
    match self_test(id) {
        Ok(()) => Availability::Available,
        Err(reason) => {
            warn!(backend = %id, %reason, "backend unavailable");
            Availability::Unavailable(reason)
        }
    }
}

fn self_test(id: BackendId) -> Result<(), String> {
    if !aes_self_test() {
        return Err("AES known-answer test failed".to_owned());
    }
    let backend = id
        .initialize(&Key::from_bytes(*PROBE_KEY))
        .map_err(|e| e.to_string())?;
    let output = backend
        .anonymize_numeric(PROBE_INPUT, Family::V4)
        .map_err(|e| e.to_string())?;
    let expected = probe_expected(id);
    if output != expected {
        return Err(format!(
            "known-answer test returned {output:#x}, expected {expected:#x}"
        ));
    }
    Ok(())
}

/// Availability of every probed backend, captured once.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<BackendId, Availability>,
}

impl Registry {
    /// Probes every known backend.
    pub fn discover() -> Self {
        Self::discover_only(BackendId::ALL)
    }

    /// Probes only the given backends. Backends left out are treated as
    /// unavailable.
    pub fn discover_only(ids: impl IntoIterator<Item = BackendId>) -> Self {
        let entries = ids.into_iter().map(|id| (id, probe(id))).collect();
        Self { entries }
    }

    /// Availability of `id`, or `None` if it was never probed.
    pub fn availability(&self, id: BackendId) -> Option<&Availability> {
        self.entries.get(&id)
    }

    pub fn is_available(&self, id: BackendId) -> bool {
        self.availability(id).is_some_and(Availability::is_available)
    }

    /// Backends that passed their probe.
    pub fn available(&self) -> impl Iterator<Item = BackendId> + '_ {
        self.entries
            .iter()
            .filter(|(_, availability)| availability.is_available())
            .map(|(id, _)| *id)
    }

    /// Backends that failed their probe, with the reason.
    pub fn unavailable(&self) -> impl Iterator<Item = (BackendId, &str)> + '_ {
        self.entries.iter().filter_map(|(id, availability)| match availability {
            Availability::Available => None,
            Availability::Unavailable(reason) => Some((*id, reason.as_str())),
        })
    }

    /// Builds an anonymizer for `id`, refusing backends that did not pass
    /// their probe. Another backend is never substituted.
    pub fn anonymizer(&self, key: &[u8], id: BackendId) -> Result<Anonymizer> {
        match self.availability(id) {
            Some(Availability::Available) => Anonymizer::new(key, id),
            Some(Availability::Unavailable(reason)) => Err(Error::BackendUnavailable {
                backend: id,
                reason: reason.clone(),
            }),
            None => Err(Error::BackendUnavailable {
                backend: id,
                reason: "backend was not probed".to_owned(),
            }),
        }
    }
}
