use native_tls::TlsConnector;
use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use x509_parser::extensions::GeneralName;
use x509_parser::parse_x509_certificate;

use crate::options::{DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};

/// Why a candidate produced no names. The engine treats every kind the same.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connect {addr}: {reason}")]
    Connection { addr: String, reason: String },
    #[error("tls handshake with {domain}: {reason}")]
    Handshake { domain: String, reason: String },
    #[error("{domain} presented no certificate")]
    NoCertificate { domain: String },
    #[error("unparsable leaf certificate from {domain}: {reason}")]
    Certificate { domain: String, reason: String },
}

impl ProbeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Connection { .. } => "connection",
            ProbeError::Handshake { .. } => "handshake",
            ProbeError::NoCertificate { .. } => "no_certificate",
            ProbeError::Certificate { .. } => "certificate",
        }
    }
}

/// Fetch the DNS names of the leaf certificate a host presents.
pub trait CertProber {
    fn probe(&self, domain: &str) -> Result<Vec<String>, ProbeError>;
}

impl<P: CertProber + ?Sized> CertProber for &P {
    fn probe(&self, domain: &str) -> Result<Vec<String>, ProbeError> { (**self).probe(domain) }
}

impl<P: CertProber + ?Sized> CertProber for Box<P> {
    fn probe(&self, domain: &str) -> Result<Vec<String>, ProbeError> { (**self).probe(domain) }
}

/// Blocking TLS prober. Trust is not checked: the point is reading names,
/// so self-signed and mismatched certificates are accepted.
#[derive(Debug, Clone)]
pub struct TlsProber {
    timeout: Duration,
    port: u16,
}

impl Default for TlsProber {
    fn default() -> Self { TlsProber::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_PORT) }
}

impl TlsProber {
    pub fn new(timeout: Duration, port: u16) -> Self { TlsProber { timeout, port } }

    pub fn timeout(&self) -> Duration { self.timeout }

    pub fn port(&self) -> u16 { self.port }

    /// Resolve and dial `domain`, never past `deadline`.
    fn connect(&self, domain: &str, deadline: Instant) -> Result<DeadlineStream, ProbeError> {
        let addr = format!("{}:{}", domain, self.port);
        let conn_err = |reason: String| ProbeError::Connection { addr: addr.clone(), reason };
        let addrs = resolve(domain, self.port, deadline).map_err(|e| conn_err(e.to_string()))?;
        let mut last = String::from("no addresses resolved");
        for sa in addrs {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                last = format!("{}: deadline exceeded", sa);
                break;
            }
            match TcpStream::connect_timeout(&sa, left) {
                Ok(stream) => return Ok(DeadlineStream { inner: stream, deadline }),
                Err(e) => last = format!("{}: {}", sa, e),
            }
        }
        Err(conn_err(last))
    }
}

impl CertProber for TlsProber {
    fn probe(&self, domain: &str) -> Result<Vec<String>, ProbeError> {
        // one budget for resolution, dial and handshake together
        let deadline = Instant::now() + self.timeout;
        let handshake_err = |reason: String| ProbeError::Handshake { domain: domain.to_string(), reason };
        let stream = self.connect(domain, deadline)?;
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| handshake_err(e.to_string()))?;
        let tls = connector.connect(domain, stream).map_err(|e| handshake_err(e.to_string()))?;
        let cert = tls
            .peer_certificate()
            .map_err(|e| handshake_err(e.to_string()))?
            .ok_or_else(|| ProbeError::NoCertificate { domain: domain.to_string() })?;
        let der = cert.to_der().map_err(|e| ProbeError::Certificate { domain: domain.to_string(), reason: e.to_string() })?;
        dns_names_from_der(&der).map_err(|reason| ProbeError::Certificate { domain: domain.to_string(), reason })
    }
}

fn timed_out(what: &str) -> io::Error { io::Error::new(io::ErrorKind::TimedOut, format!("{} deadline exceeded", what)) }

/// System resolver lookup bounded by `deadline`. A lookup that outlives it
/// is abandoned on its helper thread.
fn resolve(domain: &str, port: u16, deadline: Instant) -> io::Result<Vec<SocketAddr>> {
    if let Ok(ip) = domain.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    let host = domain.to_string();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send((host.as_str(), port).to_socket_addrs().map(|it| it.collect::<Vec<_>>()));
    });
    let left = deadline.saturating_duration_since(Instant::now());
    rx.recv_timeout(left).map_err(|_| timed_out("name resolution"))?
}

/// TCP stream whose every read and write only gets the time left before a
/// fixed deadline, so a peer trickling bytes cannot keep a probe alive.
#[derive(Debug)]
struct DeadlineStream {
    inner: TcpStream,
    deadline: Instant,
}

impl DeadlineStream {
    fn left(&self) -> io::Result<Duration> {
        let left = self.deadline.saturating_duration_since(Instant::now());
        if left.is_zero() { Err(timed_out("probe")) } else { Ok(left) }
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.left()?;
        self.inner.set_read_timeout(Some(left))?;
        self.inner.read(buf)
    }
}

impl Write for DeadlineStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let left = self.left()?;
        self.inner.set_write_timeout(Some(left))?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> { self.inner.flush() }
}

/// SAN DNS entries of a DER certificate, in certificate order, duplicates kept.
pub fn dns_names_from_der(der: &[u8]) -> Result<Vec<String>, String> {
    let (_, cert) = parse_x509_certificate(der).map_err(|e| e.to_string())?;
    let mut names = Vec::new();
    match cert.subject_alternative_name() {
        Ok(Some(ext)) => {
            for name in ext.value.general_names.iter() {
                if let GeneralName::DNSName(d) = name {
                    names.push(d.to_string());
                }
            }
        }
        Ok(None) => {}
        Err(e) => return Err(e.to_string()),
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use native_tls::{Identity, TlsAcceptor};
    use rcgen::{generate_simple_self_signed, CertifiedKey};
    use std::net::TcpListener;

    fn self_signed(names: &[&str]) -> CertifiedKey {
        generate_simple_self_signed(names.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_refused_port_is_connection_error() {
        // grab a free port then close it so nothing listens there
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let p = TlsProber::new(Duration::from_secs(1), port);
        let err = p.probe("127.0.0.1").unwrap_err();
        assert_eq!(err.kind(), "connection");
    }

    #[test]
    fn test_plain_tcp_peer_is_handshake_error() {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = l.local_addr().unwrap().port();
        let h = std::thread::spawn(move || {
            // accept and hang up without speaking TLS
            if let Ok((s, _)) = l.accept() { drop(s); }
        });
        let p = TlsProber::new(Duration::from_secs(2), port);
        let err = p.probe("127.0.0.1").unwrap_err();
        assert_eq!(err.kind(), "handshake");
        h.join().unwrap();
    }

    #[test]
    fn test_garbage_der_rejected() {
        assert!(dns_names_from_der(&[0x30, 0x03, 0x01, 0x02]).is_err());
        assert!(dns_names_from_der(&[]).is_err());
    }

    #[test]
    fn test_error_display() {
        let e = ProbeError::NoCertificate { domain: "a.com".into() };
        assert_eq!(e.to_string(), "a.com presented no certificate");
        assert_eq!(e.kind(), "no_certificate");
    }

    #[test]
    fn test_dns_names_keep_order_and_duplicates() {
        let ck = self_signed(&["*.a.com", "a.com", "a.com"]);
        let names = dns_names_from_der(ck.cert.der().as_ref()).unwrap();
        assert_eq!(names, vec!["*.a.com", "a.com", "a.com"]);
    }

    #[test]
    fn test_certificate_without_san_has_no_names() {
        let ck = self_signed(&[]);
        assert!(dns_names_from_der(ck.cert.der().as_ref()).unwrap().is_empty());
    }

    #[test]
    fn test_untrusted_leaf_is_read() {
        let ck = self_signed(&["*.a.com", "a.com", "a.com"]);
        let identity = Identity::from_pkcs8(ck.cert.pem().as_bytes(), ck.key_pair.serialize_pem().as_bytes()).unwrap();
        let acceptor = TlsAcceptor::new(identity).unwrap();
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = l.local_addr().unwrap().port();
        let h = std::thread::spawn(move || {
            if let Ok((s, _)) = l.accept() {
                let _ = acceptor.accept(s);
            }
        });
        let p = TlsProber::new(Duration::from_secs(3), port);
        let names = p.probe("127.0.0.1").unwrap();
        assert_eq!(names, vec!["*.a.com", "a.com", "a.com"]);
        h.join().unwrap();
    }

    #[test]
    fn test_trickling_peer_cannot_outlast_timeout() {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = l.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let Ok((mut s, _)) = l.accept() else { return };
            // handshake record header promising 16 KiB, then one byte per second
            if s.write_all(&[0x16, 0x03, 0x03, 0x40, 0x00]).is_err() { return; }
            for _ in 0..10 {
                std::thread::sleep(Duration::from_secs(1));
                if s.write_all(&[0x02]).is_err() { return; }
            }
        });
        let p = TlsProber::new(Duration::from_secs(2), port);
        let start = Instant::now();
        let err = p.probe("127.0.0.1").unwrap_err();
        let elapsed = start.elapsed();
        assert_eq!(err.kind(), "handshake");
        assert!(elapsed < Duration::from_secs(4), "handshake ran for {:?}", elapsed);
    }

    #[test]
    fn test_expired_deadline_fails_io() {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = l.local_addr().unwrap();
        let mut s = DeadlineStream { inner: TcpStream::connect(addr).unwrap(), deadline: Instant::now() };
        let mut buf = [0u8; 4];
        assert_eq!(s.read(&mut buf).unwrap_err().kind(), io::ErrorKind::TimedOut);
        assert_eq!(s.write(b"x").unwrap_err().kind(), io::ErrorKind::TimedOut);
    }
}
