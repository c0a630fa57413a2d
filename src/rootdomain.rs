use fnv::FnvHashSet;
use std::collections::HashSet;

/// Root-domain guesser driven by a small label set instead of a public
/// suffix list. `shop.example.co.uk` needs `co` in the set to come out as
/// `example.co.uk`; without it the answer is `co.uk`.
#[derive(Debug, Clone)]
pub struct RootHeuristic {
    top_labels: FnvHashSet<String>,
}

impl RootHeuristic {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RootHeuristic { top_labels: labels.into_iter().map(Into::into).collect() }
    }

    /// Last two labels, or last three when the second-to-last label is in
    /// the top-label set. Domains with two labels or fewer come back as is.
    pub fn root_of(&self, domain: &str) -> String {
        let labels: Vec<&str> = domain.split('.').collect();
        let n = labels.len();
        if n <= 2 {
            return domain.to_string();
        }
        if self.top_labels.contains(labels[n - 2]) {
            labels[n - 3..].join(".")
        } else {
            labels[n - 2..].join(".")
        }
    }

    pub fn is_root(&self, domain: &str) -> bool { self.root_of(domain) == domain }

    /// Collapse wildcard bases into root domains.
    ///
    /// Candidates that are already roots are always kept. A non-root
    /// candidate is kept verbatim when its computed root was not itself a
    /// candidate; the computed root is never introduced on its own.
    pub fn canonicalize<'a, I>(&self, candidates: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a String>,
        I::IntoIter: Clone,
    {
        let iter = candidates.into_iter();
        let mut kept: HashSet<String> = iter.clone().filter(|c| self.is_root(c)).cloned().collect();
        for candidate in iter {
            let root = self.root_of(candidate);
            if !kept.contains(&root) {
                kept.insert(candidate.clone());
            }
        }
        kept
    }
}
