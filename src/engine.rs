use fnv::FnvHashSet;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::classify::{classify, Classification};
use crate::frontier::Frontier;
use crate::metrics::Metrics;
use crate::options::Options;
use crate::output::Report;
use crate::prober::CertProber;
use crate::rootdomain::RootHeuristic;

/// Recursive certificate-name crawler.
///
/// Probes every frontier domain once, feeds harvested SAN names back into
/// the frontier and collects wildcard bases and literal names. One instance
/// is good for one run.
pub struct Engine<P> {
    options: Options,
    prober: P,
    frontier: Frontier,
    heuristic: RootHeuristic,
    root_candidates: FnvHashSet<String>,
    sub_domains: FnvHashSet<String>,
    metrics: Metrics,
}

impl<P: CertProber> Engine<P> {
    pub fn new(mut options: Options, prober: P) -> Self {
        options.check();
        let frontier = Frontier::seeded(&options.domains, &options.sub_prefixes);
        let heuristic = RootHeuristic::new(options.top_labels.iter().cloned());
        Engine {
            options,
            prober,
            frontier,
            heuristic,
            root_candidates: FnvHashSet::default(),
            sub_domains: FnvHashSet::default(),
            metrics: Metrics::new(),
        }
    }

    /// Walk the frontier until it is exhausted.
    pub fn run(&mut self) {
        debug!(seeds = self.frontier.len(), "discovery started");
        while self.step() {}
        info!(
            roots = self.root_candidates.len(),
            subs = self.sub_domains.len(),
            "discovery finished: {}",
            self.metrics.summary_line()
        );
    }

    /// Probe the next queued domain. Returns false once nothing is left.
    pub fn step(&mut self) -> bool {
        let Some(domain) = self.frontier.advance() else {
            return false;
        };
        if self.options.verbose {
            info!(total = self.frontier.len(), left = self.frontier.remaining(), current = %domain, "probing");
        }
        self.metrics.probed += 1;
        match self.prober.probe(&domain) {
            Ok(names) => {
                self.metrics.ok += 1;
                for name in names {
                    self.absorb(&name);
                }
            }
            Err(e) => {
                // dropped: the domain stays visited and yields nothing
                self.metrics.record_failure(&e);
                if self.options.verbose {
                    warn!(domain = %domain, kind = e.kind(), "probe failed: {}", e);
                }
            }
        }
        true
    }

    fn absorb(&mut self, name: &str) {
        self.metrics.names += 1;
        let class = classify(name, &self.options.sub_prefixes);
        match &class {
            Classification::Ignored => {
                self.metrics.ignored += 1;
                return;
            }
            Classification::Wildcard { base, .. } => {
                self.metrics.wildcard += 1;
                self.root_candidates.insert(base.clone());
            }
            Classification::Literal { name } => {
                self.metrics.literal += 1;
                self.sub_domains.insert(name.clone());
            }
        }
        for candidate in class.candidates() {
            if self.frontier.push(candidate) {
                self.metrics.enqueued += 1;
            }
        }
    }

    pub fn is_done(&self) -> bool { self.frontier.is_exhausted() }

    /// Canonicalized root domains.
    pub fn root_domains(&self) -> HashSet<String> { self.heuristic.canonicalize(&self.root_candidates) }

    /// Literal names seen in certificates.
    pub fn sub_domains(&self) -> HashSet<String> { self.sub_domains.iter().cloned().collect() }

    /// Raw wildcard bases before canonicalization.
    pub fn root_candidates(&self) -> &FnvHashSet<String> { &self.root_candidates }

    pub fn frontier(&self) -> &Frontier { &self.frontier }

    pub fn metrics(&self) -> &Metrics { &self.metrics }

    pub fn report(&self) -> Report {
        Report::new(self.root_domains(), self.sub_domains(), self.metrics.clone())
    }
}
