use serde::Serialize;

use crate::prober::ProbeError;

/// Counters for one discovery run. Plain integers: the engine owns them
/// exclusively and never shares them across threads.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub probed: u64,
    pub ok: u64,
    pub conn_failed: u64,
    pub handshake_failed: u64,
    pub no_certificate: u64,
    pub bad_certificate: u64,
    pub names: u64,
    pub ignored: u64,
    pub wildcard: u64,
    pub literal: u64,
    pub enqueued: u64,
}

impl Metrics {
    pub fn new() -> Self { Self::default() }

    pub fn record_failure(&mut self, err: &ProbeError) {
        match err {
            ProbeError::Connection { .. } => self.conn_failed += 1,
            ProbeError::Handshake { .. } => self.handshake_failed += 1,
            ProbeError::NoCertificate { .. } => self.no_certificate += 1,
            ProbeError::Certificate { .. } => self.bad_certificate += 1,
        }
    }

    pub fn failed(&self) -> u64 {
        self.conn_failed + self.handshake_failed + self.no_certificate + self.bad_certificate
    }

    pub fn summary_line(&self) -> String {
        format!(
            "probed={} ok={} failed={} (conn={} tls={} nocert={} badcert={}) names={} ignored={} wildcard={} literal={} enqueued={}",
            self.probed, self.ok, self.failed(), self.conn_failed, self.handshake_failed,
            self.no_certificate, self.bad_certificate, self.names, self.ignored,
            self.wildcard, self.literal, self.enqueued
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_kinds() {
        let mut m = Metrics::new();
        m.record_failure(&ProbeError::Connection { addr: "a:443".into(), reason: "refused".into() });
        m.record_failure(&ProbeError::Handshake { domain: "a".into(), reason: "eof".into() });
        m.record_failure(&ProbeError::NoCertificate { domain: "a".into() });
        m.record_failure(&ProbeError::NoCertificate { domain: "b".into() });
        assert_eq!(m.conn_failed, 1);
        assert_eq!(m.handshake_failed, 1);
        assert_eq!(m.no_certificate, 2);
        assert_eq!(m.failed(), 4);
        assert!(m.summary_line().contains("failed=4"));
    }
}
