//! Structured logging for the dashboard.
//!
//! Every record is one JSON line on stdout. When `LOG_DIR` is set the same
//! lines are also appended under `<LOG_DIR>/<run_id>/`, with trace and debug
//! records kept apart from the event stream.
//!
//! Controls: `LOG_LEVEL`, `LOG_DOMAINS` (comma list or "all"), `LOG_DIR`,
//! `RUN_ID`, `PROFILE_SAMPLE` (0.0..=1.0). They are read once, on the first
//! record.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Unknown or missing names fall back to `Info`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("trace") => Level::Trace,
            Some("debug") => Level::Debug,
            Some("warn") => Level::Warn,
            Some("error") => Level::Error,
            _ => Level::Info,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Db,      // gateway connections and queries
    Block,   // guarded render outcomes
    Page,    // page assembly
    Server,  // HTTP requests
    System,  // startup, shutdown
    Profile, // timing scopes
}

impl Domain {
    const ALL: [Domain; 6] = [
        Domain::Db,
        Domain::Block,
        Domain::Page,
        Domain::Server,
        Domain::System,
        Domain::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Db => "db",
            Domain::Block => "block",
            Domain::Page => "page",
            Domain::Server => "server",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    fn from_name(name: &str) -> Option<Domain> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

/// Which records get written. `domains: None` lets every domain through.
#[derive(Debug, Clone, PartialEq)]
struct Filter {
    min_level: Level,
    domains: Option<Vec<Domain>>,
    profile_sample: f64,
}

impl Filter {
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let domains = match lookup("LOG_DOMAINS") {
            None => None,
            Some(list) if list.trim() == "all" => None,
            Some(list) => Some(list.split(',').filter_map(|d| Domain::from_name(d.trim())).collect()),
        };
        let profile_sample = lookup("PROFILE_SAMPLE")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|p| p.clamp(0.0, 1.0))
            .unwrap_or(1.0);
        Self {
            min_level: Level::parse(lookup("LOG_LEVEL").as_deref()),
            domains,
            profile_sample,
        }
    }

    fn allows(&self, level: Level, domain: Domain) -> bool {
        level >= self.min_level && self.domains.as_ref().map_or(true, |ds| ds.contains(&domain))
    }
}

struct RunSinks {
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

impl RunSinks {
    fn open(run_dir: &Path) -> io::Result<Self> {
        create_dir_all(run_dir)?;
        let append = |name: &str| OpenOptions::new().create(true).append(true).open(run_dir.join(name));
        Ok(Self {
            events: Mutex::new(BufWriter::new(append("events.jsonl")?)),
            trace: Mutex::new(BufWriter::new(append("trace.jsonl")?)),
        })
    }

    fn write(&self, level: Level, line: &str) {
        let sink = match level {
            Level::Trace | Level::Debug => &self.trace,
            _ => &self.events,
        };
        if let Ok(mut w) = sink.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

struct Logger {
    run_id: String,
    filter: Filter,
    sinks: Option<RunSinks>,
    seq: AtomicU64,
    profile_seq: AtomicU64,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| {
        let env = |key: &str| std::env::var(key).ok();
        let run_id = env("RUN_ID")
            .unwrap_or_else(|| format!("r-{}-{}", Utc::now().timestamp_millis(), process::id()));
        let sinks = env("LOG_DIR").and_then(|base| {
            let dir = Path::new(&base).join(&run_id);
            RunSinks::open(&dir)
                .map_err(|err| eprintln!("[log] cannot write to {}: {}", dir.display(), err))
                .ok()
        });
        Logger {
            run_id,
            filter: Filter::from_lookup(env),
            sinks,
            seq: AtomicU64::new(0),
            profile_seq: AtomicU64::new(0),
        }
    })
}

const REDACTED_KEYS: [&str; 3] = ["password", "database_url", "authorization"];

/// Fields lifted out of `data` to the top level of a record.
const CORRELATION_KEYS: [&str; 3] = ["page", "block", "query_id"];

#[derive(Debug, Serialize)]
struct Record<'a> {
    ts: String,
    run_id: &'a str,
    seq: u64,
    lvl: &'static str,
    component: &'static str,
    event: &'a str,
    msg: Value,
    #[serde(flatten)]
    correlation: Map<String, Value>,
    data: Map<String, Value>,
}

impl<'a> Record<'a> {
    fn new(run_id: &'a str, seq: u64, level: Level, domain: Domain, event: &'a str, mut data: Map<String, Value>) -> Self {
        for (key, value) in data.iter_mut() {
            if REDACTED_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                *value = json!("[REDACTED]");
            }
        }
        let correlation = CORRELATION_KEYS
            .iter()
            .filter_map(|key| data.remove(*key).map(|v| (key.to_string(), v)))
            .collect();
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            run_id,
            seq,
            lvl: level.label(),
            component: domain.as_str(),
            event,
            msg: data.remove("msg").unwrap_or_else(|| json!("")),
            correlation,
            data,
        }
    }

    fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Emit a structured log entry.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let logger = logger();
    if !logger.filter.allows(level, domain) {
        return;
    }
    let seq = logger.seq.fetch_add(1, Ordering::Relaxed);
    let line = Record::new(&logger.run_id, seq, level, domain, event, fields).to_line();
    if let Some(sinks) = &logger.sinks {
        sinks.write(level, &line);
    }
    println!("{}", line);
}

pub fn info(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Info, domain, event, fields);
}

pub fn warn(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Warn, domain, event, fields);
}

pub fn error(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Error, domain, event, fields);
}

/// Short stable fingerprint of a SQL statement for correlating log records.
pub fn query_fingerprint(sql: &str) -> String {
    let digest = Sha256::digest(sql.trim().as_bytes());
    hex::encode(&digest[..6])
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

/// Emits the elapsed time of a scope as a trace record on drop, for the
/// share of scopes selected by `PROFILE_SAMPLE`.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        let logger = logger();
        let seq = logger.profile_seq.fetch_add(1, Ordering::Relaxed);
        let sampled = sampled(logger.filter.profile_sample, seq);
        Self {
            label,
            context: sampled.then(|| obj(fields)),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

/// Deterministic sampling: scope `seq` is kept when its slot in a cycle of
/// 10 000 falls below `rate`.
fn sampled(rate: f64, seq: u64) -> bool {
    rate >= 1.0 || (seq % 10_000) as f64 / 10_000.0 < rate
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let Some(mut fields) = self.context.take() else {
            return;
        };
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(self.elapsed_ms()));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}
