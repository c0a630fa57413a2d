//! Certificate-driven discovery of an organization's root domains and
//! subdomains.
//!
//! Starting from seed domains, [`engine::Engine`] connects to every queued
//! host over TLS, reads the DNS names of the leaf certificate and feeds them
//! back into its queue until no new names turn up.

pub mod classify;
pub mod cli;
pub mod engine;
pub mod frontier;
pub mod metrics;
pub mod options;
pub mod output;
pub mod prober;
pub mod rootdomain;
pub mod runner;

pub use engine::Engine;
pub use options::Options;
pub use prober::{CertProber, ProbeError, TlsProber};
pub use rootdomain::RootHeuristic;
