use fnv::FnvHashSet;

/// Append-only work queue with a visited set.
///
/// Domains are consumed by advancing a cursor instead of popping, so new
/// candidates can be pushed while the queue is being walked and the probe
/// order stays the insertion order.
#[derive(Debug, Default, Clone)]
pub struct Frontier {
    queue: Vec<String>,
    visited: FnvHashSet<String>,
    cursor: usize,
}

impl Frontier {
    pub fn new() -> Self { Self::default() }

    /// Seeds first, then `prefix.seed` for every seed/prefix pair unless the
    /// seed already carries that prefix.
    pub fn seeded(roots: &[String], prefixes: &[String]) -> Self {
        let mut f = Frontier::new();
        for root in roots {
            f.push(root.clone());
        }
        for root in roots {
            for prefix in prefixes {
                if !root.starts_with(&format!("{}.", prefix)) {
                    f.push(format!("{}.{}", prefix, root));
                }
            }
        }
        f
    }

    /// Enqueue `domain` unless it was ever seen. Returns whether it was added.
    pub fn push(&mut self, domain: String) -> bool {
        if self.visited.contains(&domain) {
            return false;
        }
        self.visited.insert(domain.clone());
        self.queue.push(domain);
        true
    }

    /// Next domain to probe, advancing the cursor.
    pub fn advance(&mut self) -> Option<String> {
        let d = self.queue.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(d)
    }

    pub fn len(&self) -> usize { self.queue.len() }

    pub fn is_empty(&self) -> bool { self.queue.is_empty() }

    pub fn visited_len(&self) -> usize { self.visited.len() }

    /// Number of domains already handed out by `advance`.
    pub fn position(&self) -> usize { self.cursor }

    pub fn remaining(&self) -> usize { self.queue.len() - self.cursor }

    pub fn is_exhausted(&self) -> bool { self.cursor >= self.queue.len() }

    pub fn queue(&self) -> &[String] { &self.queue }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> { items.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn test_seeded_order() {
        let f = Frontier::seeded(&v(&["example.com", "www.example.org"]), &v(&["www", "mail"]));
        assert_eq!(
            f.queue(),
            &v(&[
                "example.com",
                "www.example.org",
                "www.example.com",
                "mail.example.com",
                "mail.www.example.org",
            ])[..]
        );
        assert_eq!(f.len(), f.visited_len());
    }

    #[test]
    fn test_seeded_dedups_repeated_roots() {
        let f = Frontier::seeded(&v(&["a.com", "a.com", "www.a.com"]), &v(&["www"]));
        assert_eq!(f.queue(), &v(&["a.com", "www.a.com"])[..]);
    }

    #[test]
    fn test_push_during_walk() {
        let mut f = Frontier::seeded(&v(&["a.com"]), &v(&["www"]));
        assert_eq!(f.advance().as_deref(), Some("a.com"));
        assert!(f.push("b.a.com".into()));
        assert!(!f.push("a.com".into()));
        assert!(!f.push("b.a.com".into()));
        assert_eq!(f.remaining(), 2);
        assert_eq!(f.advance().as_deref(), Some("www.a.com"));
        assert_eq!(f.advance().as_deref(), Some("b.a.com"));
        assert!(f.is_exhausted());
        assert_eq!(f.advance(), None);
        assert_eq!(f.position(), 3);
    }

    #[test]
    fn test_empty_seeds() {
        let mut f = Frontier::seeded(&[], &v(&["www"]));
        assert!(f.is_empty());
        assert!(f.is_exhausted());
        assert_eq!(f.advance(), None);
    }
}
