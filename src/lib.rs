#![doc = include_str!("../README.md")]

pub(crate) mod anonymizer;
pub(crate) mod backend;
pub(crate) mod common;
pub(crate) mod error;
pub(crate) mod harness;
pub(crate) mod key;
pub(crate) mod registry;

pub use anonymizer::Anonymizer;
pub use backend::{Backend, BackendId};
pub use common::{ip_to_numeric, numeric_to_ip, parse_ip, Address, Family};
pub use error::{Error, Result};
pub use harness::{
    benchmark, check_equivalence, BenchmarkResult, EquivalenceReport, Finding, Harness,
    HarnessConfig, KnownAnswer, Outcome, Rate, DEFAULT_ITERATIONS, DEFAULT_PROBE,
};
pub use key::Key;
pub use registry::{probe, Availability, Registry};

pub mod reexports {
    pub use aes;
    #[cfg(feature = "random")]
    pub use rand;
}
