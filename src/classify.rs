/// Shortest certificate name worth looking at. Anything below this cannot
/// carry a usable domain (`*`, `*.`, empty strings, ...).
pub const MIN_NAME_LEN: usize = 4;

/// What a single harvested DNS name turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ignored,
    /// `*.base`: `base` is a root candidate; candidates are `base` followed by
    /// every prefix sprayed over the wildcard label.
    Wildcard { base: String, candidates: Vec<String> },
    Literal { name: String },
}

impl Classification {
    /// New frontier candidates, in enqueue order.
    pub fn candidates(&self) -> Vec<String> {
        match self {
            Classification::Ignored => Vec::new(),
            Classification::Wildcard { candidates, .. } => candidates.clone(),
            Classification::Literal { name } => vec![name.clone()],
        }
    }
}

pub fn classify(name: &str, prefixes: &[String]) -> Classification {
    if name.len() < MIN_NAME_LEN {
        return Classification::Ignored;
    }
    if !name.starts_with('*') {
        return Classification::Literal { name: name.to_string() };
    }
    // "*." is stripped as two bytes whatever the second byte is.
    let (Some(base), Some(rest)) = (name.get(2..), name.get(1..)) else {
        return Classification::Ignored;
    };
    let mut candidates = vec![base.to_string()];
    for prefix in prefixes {
        if !name.starts_with(&format!("{}.", prefix)) {
            candidates.push(format!("{}{}", prefix, rest));
        }
    }
    Classification::Wildcard { base: base.to_string(), candidates }
}
