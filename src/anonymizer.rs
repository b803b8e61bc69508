use std::fmt;
use std::net::IpAddr;

use tracing::debug;

use crate::backend::{Backend, BackendId};
use crate::common::{ip_to_numeric, numeric_to_ip, Address, Family};
use crate::error::Result;
use crate::harness::{self, BenchmarkResult, DEFAULT_PROBE};
use crate::key::Key;

/// Anonymizes addresses with one backend and one key.
///
/// The backend and key are fixed at construction. Every `Anonymizer` owns its
/// own backend handle; two instances built from the same key and backend share
/// nothing. An `Anonymizer` can be moved to another thread but not shared.
pub struct Anonymizer {
    key: Key,
    backend: BackendId,
    handle: Box<dyn Backend + Send>,
}

impl Anonymizer {
    /// Creates an anonymizer from raw key bytes.
    ///
    /// Fails with `InvalidKey` unless `key` is exactly 32 bytes, and with
    /// `BackendUnavailable` if `backend` was not compiled in.
    pub fn new(key: &[u8], backend: BackendId) -> Result<Self> {
        Self::with_key(Key::new(key)?, backend)
    }

    pub fn with_key(key: Key, backend: BackendId) -> Result<Self> {
        let handle = backend.initialize(&key)?;
        debug!(%backend, "anonymizer initialized");
        Ok(Self {
            key,
            backend,
            handle,
        })
    }

    /// Creates an anonymizer for a backend given by name, such as `"masked"`.
    ///
    /// Unknown names fail with `UnsupportedBackend`.
    pub fn from_name(key: &[u8], backend: &str) -> Result<Self> {
        Self::new(key, backend.parse()?)
    }

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Anonymizes an address, keeping its representation and family.
    ///
    /// `None` and the empty textual address carry no data: they return
    /// `Ok(None)` without reaching the backend.
    pub fn anonymize(&self, address: Option<Address>) -> Result<Option<Address>> {
        match address {
            None => Ok(None),
            Some(Address::Text(text)) => Ok(self.anonymize_str(&text)?.map(Address::Text)),
            Some(Address::Numeric { value, family }) => {
                let value = self.anonymize_numeric(value, family)?;
                Ok(Some(Address::Numeric { value, family }))
            }
        }
    }

    /// Anonymizes an IPv4 or IPv6 literal. The empty string yields `None`.
    pub fn anonymize_str(&self, text: &str) -> Result<Option<String>> {
        if text.is_empty() {
            return Ok(None);
        }
        self.handle.anonymize_text(text).map(Some)
    }

    pub fn anonymize_numeric(&self, value: u128, family: Family) -> Result<u128> {
        self.handle.anonymize_numeric(value, family)
    }

    pub fn anonymize_ipaddr(&self, ip: IpAddr) -> Result<IpAddr> {
        let (value, family) = ip_to_numeric(ip);
        numeric_to_ip(self.handle.anonymize_numeric(value, family)?, family)
    }

    /// Recovers the original of an address anonymized with the same key and
    /// backend.
    pub fn deanonymize(&self, address: Option<Address>) -> Result<Option<Address>> {
        match address {
            None => Ok(None),
            Some(Address::Text(text)) if text.is_empty() => Ok(None),
            Some(Address::Text(text)) => {
                self.handle.deanonymize_text(&text).map(|t| Some(Address::Text(t)))
            }
            Some(Address::Numeric { value, family }) => {
                let value = self.handle.deanonymize_numeric(value, family)?;
                Ok(Some(Address::Numeric { value, family }))
            }
        }
    }

    pub fn deanonymize_ipaddr(&self, ip: IpAddr) -> Result<IpAddr> {
        let (value, family) = ip_to_numeric(ip);
        numeric_to_ip(self.handle.deanonymize_numeric(value, family)?, family)
    }

    /// Times `iterations` anonymizations of the default probe address.
    pub fn run_benchmark(&self, iterations: u64) -> Result<BenchmarkResult> {
        harness::benchmark(self, iterations, DEFAULT_PROBE)
    }
}

impl fmt::Debug for Anonymizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anonymizer")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const KEY: &[u8; 32] = b"32-char-str-for-AES-key-and-pad.";

    #[test]
    fn test_invalid_key() {
        for backend in BackendId::ALL {
            assert_eq!(
                Anonymizer::new(b"0123456789", backend).unwrap_err(),
                Error::InvalidKey {
                    expected: 32,
                    actual: 10
                }
            );
        }
    }

    #[test]
    fn test_unsupported_backend() {
        assert_eq!(
            Anonymizer::from_name(KEY, "yacryptopan").unwrap_err(),
            Error::UnsupportedBackend("yacryptopan".to_owned())
        );
    }

    #[test]
    #[cfg(feature = "backend-masked")]
    fn test_representation_is_preserved() {
        use std::net::Ipv4Addr;

        let anonymizer = Anonymizer::from_name(KEY, "masked").unwrap();

        assert_eq!(
            anonymizer.anonymize(Some("192.0.2.1".into())).unwrap(),
            Some(Address::Text("192.0.125.244".to_owned()))
        );
        assert_eq!(
            anonymizer.anonymize(Some(0xc000_0201u32.into())).unwrap(),
            Some(Address::Numeric {
                value: 3_221_257_716,
                family: Family::V4
            })
        );
        assert_eq!(
            anonymizer
                .anonymize_ipaddr(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)))
                .unwrap(),
            IpAddr::V4(Ipv4Addr::new(192, 0, 125, 244))
        );
    }

    /// Identity backend that counts how often it is reached.
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl Backend for Counting {
        fn id(&self) -> BackendId {
            BackendId::Masked
        }

        fn anonymize_numeric(&self, value: u128, _family: Family) -> Result<u128> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }

        fn deanonymize_numeric(&self, value: u128, _family: Family) -> Result<u128> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }

        fn anonymize_text(&self, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.to_owned())
        }
    }

    #[test]
    fn test_empty_input_never_reaches_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let anonymizer = Anonymizer {
            key: Key::from_bytes(*KEY),
            backend: BackendId::Masked,
            handle: Box::new(Counting {
                calls: Arc::clone(&calls),
            }),
        };

        assert_eq!(anonymizer.anonymize(None).unwrap(), None);
        assert_eq!(anonymizer.anonymize(Some("".into())).unwrap(), None);
        assert_eq!(anonymizer.anonymize_str("").unwrap(), None);
        assert_eq!(anonymizer.deanonymize(None).unwrap(), None);
        assert_eq!(anonymizer.deanonymize(Some("".into())).unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        anonymizer.anonymize(Some("192.0.2.1".into())).unwrap();
        anonymizer.anonymize(Some(0u32.into())).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[cfg(feature = "backend-masked")]
    fn test_numeric_zero_is_an_address() {
        let anonymizer = Anonymizer::new(KEY, BackendId::Masked).unwrap();
        assert_eq!(
            anonymizer.anonymize(Some(0u32.into())).unwrap(),
            Some(Address::Numeric {
                value: 117_702_138,
                family: Family::V4
            })
        );
        assert_eq!(
            anonymizer.anonymize_str("0.0.0.0").unwrap().as_deref(),
            Some("7.3.253.250")
        );
    }

    #[test]
    #[cfg(feature = "backend-masked")]
    fn test_call_errors_leave_anonymizer_usable() {
        let anonymizer = Anonymizer::new(KEY, BackendId::Masked).unwrap();
        assert!(matches!(
            anonymizer.anonymize(Some("not-an-ip".into())),
            Err(Error::MalformedAddress { .. })
        ));
        assert!(matches!(
            anonymizer.anonymize(Some(Address::Numeric {
                value: 1 << 40,
                family: Family::V4
            })),
            Err(Error::MalformedAddress { .. })
        ));
        assert_eq!(
            anonymizer.anonymize_str("192.0.2.1").unwrap().as_deref(),
            Some("192.0.125.244")
        );
    }

    #[test]
    #[cfg(feature = "backend-streaming")]
    fn test_deanonymize_round_trip() {
        use std::net::Ipv6Addr;

        let anonymizer = Anonymizer::new(KEY, BackendId::Streaming).unwrap();
        let ip = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let anonymized = anonymizer.anonymize_ipaddr(ip).unwrap();
        assert_ne!(anonymized, ip);
        assert_eq!(anonymizer.deanonymize_ipaddr(anonymized).unwrap(), ip);

        let text = anonymizer.anonymize(Some("10.0.0.1".into())).unwrap();
        assert_eq!(
            anonymizer.deanonymize(text).unwrap(),
            Some(Address::Text("10.0.0.1".to_owned()))
        );
    }

    #[test]
    #[cfg(feature = "backend-masked")]
    fn test_debug_omits_key() {
        let anonymizer = Anonymizer::new(KEY, BackendId::Masked).unwrap();
        let debug = format!("{anonymizer:?}");
        assert!(debug.contains("Masked"));
        assert!(!debug.contains("32-char"));
        assert_eq!(anonymizer.key().as_bytes(), KEY);
    }
}
