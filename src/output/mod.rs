use anyhow::{anyhow, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::metrics::Metrics;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Root,
    Sub,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Root => "root",
            RecordKind::Sub => "sub",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    pub kind: RecordKind,
    pub domain: String,
}

/// Final result of a run, sorted for stable output.
#[derive(Serialize, Debug, Clone, Default)]
pub struct Report {
    pub root_domains: Vec<String>,
    pub sub_domains: Vec<String>,
    pub metrics: Metrics,
}

impl Report {
    pub fn new(roots: HashSet<String>, subs: HashSet<String>, metrics: Metrics) -> Self {
        let mut root_domains: Vec<String> = roots.into_iter().collect();
        let mut sub_domains: Vec<String> = subs.into_iter().collect();
        root_domains.sort();
        sub_domains.sort();
        Report { root_domains, sub_domains, metrics }
    }

    /// Root domains first, then subdomains.
    pub fn records(&self) -> Vec<DomainRecord> {
        let roots = self.root_domains.iter().map(|d| DomainRecord { kind: RecordKind::Root, domain: d.clone() });
        let subs = self.sub_domains.iter().map(|d| DomainRecord { kind: RecordKind::Sub, domain: d.clone() });
        roots.chain(subs).collect()
    }
}

pub trait OutputWriter: Send + Sync {
    fn write(&self, r: &DomainRecord) -> Result<()>;
    fn close(&self) -> Result<()> { Ok(()) }
}

/// Output file, optionally gzip-compressed.
pub enum Sink<W: Write = File> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Sink<W> {
    pub fn new(inner: W, gzip: bool) -> Self {
        if gzip { Sink::Gzip(GzEncoder::new(inner, Compression::default())) } else { Sink::Plain(inner) }
    }

    /// Flush everything and, for gzip, write the trailer. Errors surface here
    /// instead of being lost in `Drop`.
    pub fn finish(self) -> io::Result<()> {
        match self {
            Sink::Plain(mut w) => w.flush(),
            Sink::Gzip(gz) => gz.finish()?.flush(),
        }
    }
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

type SharedSink = Mutex<Option<Sink>>;

fn poisoned() -> anyhow::Error { anyhow!("output writer poisoned") }

fn open_sink(path: PathBuf, gzip: bool, append: bool) -> Result<Sink> {
    let mut oo = OpenOptions::new();
    oo.create(true).write(true);
    if append { oo.append(true); } else { oo.truncate(true); }
    let f = oo.open(path)?;
    Ok(Sink::new(f, gzip))
}

fn open_shared(path: Option<PathBuf>, gzip: bool, append: bool) -> Result<Option<SharedSink>> {
    match path {
        Some(p) => Ok(Some(Mutex::new(Some(open_sink(p, gzip, append)?)))),
        None => Ok(None),
    }
}

fn write_line(sink: &Option<SharedSink>, line: &str) -> Result<()> {
    if let Some(f) = sink {
        let mut guard = f.lock().map_err(|_| poisoned())?;
        if let Some(w) = guard.as_mut() {
            writeln!(w, "{}", line)?;
            w.flush()?;
        }
    }
    Ok(())
}

fn finish_sink(sink: &Option<SharedSink>) -> Result<()> {
    if let Some(f) = sink {
        let taken = f.lock().map_err(|_| poisoned())?.take();
        if let Some(w) = taken {
            w.finish()?;
        }
    }
    Ok(())
}

/// One record as a CSV line, quoted the same way the file writer quotes it.
fn csv_line(r: &DomainRecord) -> Result<String> {
    let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    w.write_record([r.kind.as_str(), r.domain.as_str()])?;
    let bytes = w.into_inner().map_err(|e| anyhow!("csv flush: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

pub struct PlainWriter {
    file: Option<SharedSink>,
    to_stdout: bool,
    domain_only: bool,
}

impl PlainWriter {
    pub fn new(path: Option<PathBuf>, to_stdout: bool, gzip: bool, domain_only: bool, append: bool) -> Result<Self> {
        let file = open_shared(path, gzip, append)?;
        Ok(PlainWriter { file, to_stdout, domain_only })
    }

    fn format(&self, r: &DomainRecord) -> String {
        if self.domain_only { r.domain.clone() } else { format!("{}\t{}", r.kind.as_str(), r.domain) }
    }
}

impl OutputWriter for PlainWriter {
    fn write(&self, r: &DomainRecord) -> Result<()> {
        let line = self.format(r);
        if self.to_stdout { println!("{}", line); }
        write_line(&self.file, &line)
    }

    fn close(&self) -> Result<()> { finish_sink(&self.file) }
}

pub struct JsonLinesWriter {
    file: Option<SharedSink>,
    to_stdout: bool,
}

impl JsonLinesWriter {
    pub fn new(path: Option<PathBuf>, to_stdout: bool, gzip: bool, append: bool) -> Result<Self> {
        let file = open_shared(path, gzip, append)?;
        Ok(JsonLinesWriter { file, to_stdout })
    }
}

impl OutputWriter for JsonLinesWriter {
    fn write(&self, r: &DomainRecord) -> Result<()> {
        let line = serde_json::to_string(r)?;
        if self.to_stdout { println!("{}", line); }
        write_line(&self.file, &line)
    }

    fn close(&self) -> Result<()> { finish_sink(&self.file) }
}

/// Buffers records and writes one `Report`-shaped document on close.
pub struct JsonWriter {
    file: Option<SharedSink>,
    to_stdout: bool,
    metrics: Metrics,
    roots: Mutex<Vec<String>>,
    subs: Mutex<Vec<String>>,
}

impl JsonWriter {
    pub fn new(path: Option<PathBuf>, to_stdout: bool, gzip: bool, append: bool, metrics: Metrics) -> Result<Self> {
        let file = open_shared(path, gzip, append)?;
        Ok(JsonWriter { file, to_stdout, metrics, roots: Mutex::new(Vec::new()), subs: Mutex::new(Vec::new()) })
    }
}

impl OutputWriter for JsonWriter {
    fn write(&self, r: &DomainRecord) -> Result<()> {
        let col = match r.kind {
            RecordKind::Root => &self.roots,
            RecordKind::Sub => &self.subs,
        };
        col.lock().map_err(|_| poisoned())?.push(r.domain.clone());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let take = |m: &Mutex<Vec<String>>| -> Result<Vec<String>> {
            let mut g = m.lock().map_err(|_| poisoned())?;
            Ok(std::mem::take(&mut *g))
        };
        let report = Report { root_domains: take(&self.roots)?, sub_domains: take(&self.subs)?, metrics: self.metrics.clone() };
        let doc = serde_json::to_string_pretty(&report)?;
        if self.to_stdout { println!("{}", doc); }
        write_line(&self.file, &doc)?;
        finish_sink(&self.file)
    }
}

pub struct CsvWriter {
    file: Mutex<Option<csv::Writer<Sink>>>,
    to_stdout: bool,
}

impl CsvWriter {
    pub fn new(path: PathBuf, to_stdout: bool, gzip: bool, append: bool) -> Result<Self> {
        let write_header = !(append && path.exists());
        let sink = open_sink(path, gzip, append)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
        if write_header {
            w.write_record(["kind", "domain"])?;
        }
        Ok(CsvWriter { file: Mutex::new(Some(w)), to_stdout })
    }
}

impl OutputWriter for CsvWriter {
    fn write(&self, r: &DomainRecord) -> Result<()> {
        if self.to_stdout { print!("{}", csv_line(r)?); }
        let mut guard = self.file.lock().map_err(|_| poisoned())?;
        if let Some(w) = guard.as_mut() {
            w.write_record([r.kind.as_str(), r.domain.as_str()])?;
            w.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let taken = self.file.lock().map_err(|_| poisoned())?.take();
        if let Some(w) = taken {
            w.into_inner().map_err(|e| anyhow!("csv flush: {}", e.error()))?.finish()?;
        }
        Ok(())
    }
}

pub fn build_writers(
    path: Option<PathBuf>,
    output_type: &str,
    to_stdout: bool,
    gzip: bool,
    append: bool,
    metrics: &Metrics,
) -> Result<Vec<Box<dyn OutputWriter>>> {
    let mut v: Vec<Box<dyn OutputWriter>> = Vec::new();
    match output_type {
        "txt" => {
            v.push(Box::new(PlainWriter::new(path, to_stdout, gzip, false, append)?));
        }
        "txt-domain" => {
            v.push(Box::new(PlainWriter::new(path, to_stdout, gzip, true, append)?));
        }
        "jsonl" => {
            if path.is_none() && !to_stdout {
                return Err(anyhow!("jsonl output requires either --output path or enable stdout (omit --not-print)"));
            }
            v.push(Box::new(JsonLinesWriter::new(path, to_stdout, gzip, append)?));
        }
        "json" => {
            if path.is_none() && !to_stdout {
                return Err(anyhow!("json output requires either --output path or enable stdout (omit --not-print)"));
            }
            v.push(Box::new(JsonWriter::new(path, to_stdout, gzip, append, metrics.clone())?));
        }
        "csv" => {
            let p = path.ok_or_else(|| anyhow!("csv output requires --output path"))?;
            v.push(Box::new(CsvWriter::new(p, to_stdout, gzip, append)?));
        }
        other => {
            return Err(anyhow!("unsupported output type: {}", other));
        }
    }
    Ok(v)
}

/// Push every record of `report` through `writers`, then close them.
pub fn export(report: &Report, writers: &[Box<dyn OutputWriter>]) -> Result<()> {
    for rec in report.records() {
        for w in writers.iter() { w.write(&rec)?; }
    }
    for w in writers.iter() { w.close()?; }
    Ok(())
}
