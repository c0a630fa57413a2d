use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::options::{OptionMethod, Options};
use crate::output::{build_writers, export, Report};
use crate::prober::{CertProber, TlsProber};

/// Outcome of probing a single host without recursion.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub domain: String,
    pub result: std::result::Result<Vec<String>, String>,
}

pub struct Runner {
    pub options: Options,
}

impl Runner {
    pub fn new(mut opt: Options) -> Result<Self> {
        opt.check();
        if opt.domains.is_empty() {
            anyhow::bail!("no seed domains given");
        }
        Ok(Runner { options: opt })
    }

    fn prober(&self) -> TlsProber {
        TlsProber::new(Duration::from_secs(self.options.timeout), self.options.port)
    }

    /// Run the crawler on the blocking pool, then export through the writers.
    pub async fn run_discovery(&self) -> Result<Report> {
        let report = self.discover_with(self.prober()).await?;
        let writers = build_writers(
            self.options.output.clone(),
            &self.options.output_type,
            !self.options.not_print,
            self.options.gzip,
            self.options.append,
            &report.metrics,
        )?;
        export(&report, &writers)?;
        if let Some(p) = &self.options.output {
            info!(path = %p.display(), roots = report.root_domains.len(), subs = report.sub_domains.len(), "results written");
        }
        Ok(report)
    }

    /// Same as `run_discovery` minus the export, with a caller-chosen prober.
    pub async fn discover_with<P>(&self, prober: P) -> Result<Report>
    where
        P: CertProber + Send + 'static,
    {
        let opt = self.options.clone();
        debug!(seeds = opt.domains.len(), prefixes = ?opt.sub_prefixes, "spawning discovery");
        let report = tokio::task::spawn_blocking(move || {
            let mut engine = Engine::new(opt, prober);
            engine.run();
            engine.report()
        })
        .await?;
        Ok(report)
    }

    /// Probe every seed once and print its DNS names.
    pub async fn run_probe(&self) -> Result<Vec<ProbeOutcome>> {
        let outcomes = self.probe_with(self.prober()).await?;
        if !self.options.not_print {
            for o in outcomes.iter() {
                match &o.result {
                    Ok(names) if names.is_empty() => println!("{}\t[no-names]", o.domain),
                    Ok(names) => println!("{}\t{}", o.domain, names.join(",")),
                    Err(e) => println!("{}\t[error] {}", o.domain, e),
                }
            }
        }
        Ok(outcomes)
    }

    pub async fn probe_with<P>(&self, prober: P) -> Result<Vec<ProbeOutcome>>
    where
        P: CertProber + Send + 'static,
    {
        let domains = self.options.domains.clone();
        let outcomes = tokio::task::spawn_blocking(move || {
            domains
                .into_iter()
                .map(|d| {
                    let result = prober.probe(&d).map_err(|e| e.to_string());
                    ProbeOutcome { domain: d, result }
                })
                .collect::<Vec<_>>()
        })
        .await?;
        Ok(outcomes)
    }

    pub async fn run(&self) -> Result<()> {
        match self.options.method {
            OptionMethod::Enum => { self.run_discovery().await?; }
            OptionMethod::Probe => { self.run_probe().await?; }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prober::ProbeError;
    use std::collections::HashMap;

    struct MapProber(HashMap<String, Vec<String>>);

    impl CertProber for MapProber {
        fn probe(&self, domain: &str) -> std::result::Result<Vec<String>, ProbeError> {
            self.0.get(domain).cloned().ok_or_else(|| ProbeError::NoCertificate { domain: domain.into() })
        }
    }

    fn prober() -> MapProber {
        let mut m = HashMap::new();
        m.insert("a.com".to_string(), vec!["*.a.com".to_string(), "api.a.com".to_string()]);
        MapProber(m)
    }

    #[test]
    fn test_new_requires_domains() {
        assert!(Runner::new(Options::default()).is_err());
    }

    #[tokio::test]
    async fn test_discover_with() {
        let runner = Runner::new(Options::with_domains(["a.com"])).unwrap();
        let report = runner.discover_with(prober()).await.unwrap();
        assert_eq!(report.root_domains, vec!["a.com".to_string()]);
        assert_eq!(report.sub_domains, vec!["api.a.com".to_string()]);
        assert_eq!(report.metrics.no_certificate, 2);
    }

    #[tokio::test]
    async fn test_probe_with_does_not_recurse() {
        let opt = Options { domains: vec!["a.com".into(), "b.com".into()], method: OptionMethod::Probe, ..Options::default() };
        let runner = Runner::new(opt).unwrap();
        let out = runner.probe_with(prober()).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].result.as_ref().unwrap().len(), 2);
        assert!(out[1].result.as_ref().unwrap_err().contains("no certificate"));
    }
}
