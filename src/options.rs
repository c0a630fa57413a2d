use std::path::PathBuf;

/// Default prefixes sprayed against seeds and wildcard bases.
pub const DEFAULT_SUB_PREFIXES: &[&str] = &["www"];

/// Labels that, when found second-to-last, make the root three labels long.
pub const DEFAULT_TOP_LABELS: &[&str] = &["com", "net", "org", "gov", "edu", "co"];

pub const DEFAULT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_PORT: u16 = 443;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMethod {
    Enum,
    Probe,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub domains: Vec<String>,
    pub sub_prefixes: Vec<String>,
    pub top_labels: Vec<String>,
    pub verbose: bool,
    pub timeout: u64,
    pub port: u16,
    pub method: OptionMethod,
    pub output: Option<PathBuf>,
    pub output_type: String,
    pub gzip: bool,
    pub append: bool,
    pub not_print: bool,
    pub log_level: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            domains: Vec::new(),
            sub_prefixes: Vec::new(),
            top_labels: Vec::new(),
            verbose: false,
            timeout: DEFAULT_TIMEOUT_SECS,
            port: DEFAULT_PORT,
            method: OptionMethod::Enum,
            output: None,
            output_type: "txt".into(),
            gzip: false,
            append: false,
            not_print: false,
            log_level: "info".into(),
        }
    }
}

impl Options {
    /// Convenience constructor for library callers that only care about seeds.
    pub fn with_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut opt = Options { domains: domains.into_iter().map(Into::into).collect(), ..Options::default() };
        opt.check();
        opt
    }

    /// Fill in defaults. Safe to call more than once.
    pub fn check(&mut self) {
        if self.sub_prefixes.is_empty() {
            self.sub_prefixes = DEFAULT_SUB_PREFIXES.iter().map(|s| s.to_string()).collect();
        }
        if self.top_labels.is_empty() {
            self.top_labels = DEFAULT_TOP_LABELS.iter().map(|s| s.to_string()).collect();
        }
        if self.timeout == 0 { self.timeout = DEFAULT_TIMEOUT_SECS; }
        if self.port == 0 { self.port = DEFAULT_PORT; }
        if !self.gzip {
            if let Some(os) = self.output.as_ref().and_then(|p| p.as_os_str().to_str()) {
                if os.ends_with(".gz") { self.gzip = true; }
            }
        }
    }
}

/// Clean up an operator-supplied domain (CLI arg, list file line, stdin line).
/// Harvested certificate names never go through this.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let s = raw.trim().trim_end_matches('.').trim();
    if s.is_empty() || s.starts_with('#') {
        return None;
    }
    Some(s.to_ascii_lowercase())
}

/// Map a `--log-level` value onto a tracing filter directive.
pub fn log_filter(level: &str) -> &str {
    match level {
        "silent" => "off",
        "error" | "warn" | "info" | "debug" | "trace" => level,
        _ => "info",
    }
}
