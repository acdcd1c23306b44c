//! Turn flags and `ETCDCTL_*` environment variables into connection settings
//!
//! Every setting is looked up in the same order: the command-line flag if it
//! was given, then the environment variable etcdctl would read, then a
//! hard-coded default. Nothing here touches the network or the filesystem,
//! missing certificate files are only noticed when the client connects.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::CheckError;

pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:2379";
pub const DEFAULT_WARNING: f64 = 0.1;
pub const DEFAULT_CRITICAL: f64 = 1.0;
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_READS: usize = 100;

pub const ENV_ENDPOINTS: &str = "ETCDCTL_ENDPOINTS";
pub const ENV_CACERT: &str = "ETCDCTL_CACERT";
pub const ENV_CERT: &str = "ETCDCTL_CERT";
pub const ENV_KEY: &str = "ETCDCTL_KEY";
pub const ENV_USER: &str = "ETCDCTL_USER";
pub const ENV_PASSWORD: &str = "ETCDCTL_PASSWORD";
pub const ENV_INSECURE_TRANSPORT: &str = "ETCDCTL_INSECURE_TRANSPORT";
pub const ENV_INSECURE_SKIP_TLS_VERIFY: &str = "ETCDCTL_INSECURE_SKIP_TLS_VERIFY";
pub const ENV_DIAL_TIMEOUT: &str = "ETCDCTL_DIAL_TIMEOUT";
pub const ENV_COMMAND_TIMEOUT: &str = "ETCDCTL_COMMAND_TIMEOUT";

/// Connection options exactly as they were passed on the command line
///
/// `None` means "not given", so the environment gets a chance to fill it in.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionFlags {
    pub endpoints: Option<String>,
    pub cacert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub insecure_transport: Option<bool>,
    pub insecure_skip_tls_verify: Option<bool>,
    pub dial_timeout: Option<f64>,
    pub command_timeout: Option<f64>,
}

/// Everything needed to talk to the cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub endpoints: Vec<String>,
    pub cacert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Allow plaintext connections when no TLS material is configured
    pub insecure_transport: bool,
    pub insecure_skip_tls_verify: bool,
    pub dial_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> ConnectionConfig {
        ConnectionConfig {
            endpoints: vec![DEFAULT_ENDPOINT.to_owned()],
            cacert: None,
            cert: None,
            key: None,
            user: None,
            password: None,
            insecure_transport: true,
            insecure_skip_tls_verify: false,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Resolve flags against an environment lookup, usually `env::var`
    ///
    /// Empty environment values are treated as unset.
    pub fn resolve<F>(flags: ConnectionFlags, env: F) -> Result<ConnectionConfig, CheckError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let defaults = ConnectionConfig::default();

        let endpoints = match flags.endpoints.or_else(|| lookup(ENV_ENDPOINTS)) {
            Some(list) => split_endpoints(&list),
            None => defaults.endpoints,
        };

        let insecure_transport = match flags.insecure_transport {
            Some(b) => b,
            None => env_bool(&lookup, ENV_INSECURE_TRANSPORT)?
                .unwrap_or(defaults.insecure_transport),
        };
        let insecure_skip_tls_verify = match flags.insecure_skip_tls_verify {
            Some(b) => b,
            None => env_bool(&lookup, ENV_INSECURE_SKIP_TLS_VERIFY)?
                .unwrap_or(defaults.insecure_skip_tls_verify),
        };

        let dial_timeout = match flags.dial_timeout {
            Some(secs) => seconds("--dial-timeout", secs)?,
            None => env_seconds(&lookup, ENV_DIAL_TIMEOUT)?.unwrap_or(defaults.dial_timeout),
        };
        let command_timeout = match flags.command_timeout {
            Some(secs) => seconds("--command-timeout", secs)?,
            None => {
                env_seconds(&lookup, ENV_COMMAND_TIMEOUT)?.unwrap_or(defaults.command_timeout)
            }
        };

        let mut user = flags.user.or_else(|| lookup(ENV_USER));
        let mut password = flags.password.or_else(|| lookup(ENV_PASSWORD));
        // etcdctl accepts `--user name:password`
        if password.is_none() {
            let split = user
                .as_deref()
                .and_then(|u| u.split_once(':'))
                .map(|(name, pass)| (name.to_owned(), pass.to_owned()));
            if let Some((name, pass)) = split {
                user = Some(name);
                password = Some(pass);
            }
        }

        Ok(ConnectionConfig {
            endpoints,
            cacert: flags.cacert.or_else(|| lookup(ENV_CACERT).map(PathBuf::from)),
            cert: flags.cert.or_else(|| lookup(ENV_CERT).map(PathBuf::from)),
            key: flags.key.or_else(|| lookup(ENV_KEY).map(PathBuf::from)),
            user,
            password,
            insecure_transport,
            insecure_skip_tls_verify,
            dial_timeout,
            command_timeout,
        })
    }

    /// Whether connections should be made over TLS
    ///
    /// Any TLS material turns it on. Without any, TLS is only used if
    /// plaintext has been explicitly disallowed.
    pub fn uses_tls(&self) -> bool {
        self.cacert.is_some() || self.cert.is_some() || self.key.is_some() || !self.insecure_transport
    }

    /// The endpoint in the form the client wants, with a scheme
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.contains("://") {
            endpoint.to_owned()
        } else if self.uses_tls() {
            format!("https://{}", endpoint)
        } else {
            format!("http://{}", endpoint)
        }
    }
}

/// Warning and critical latency boundaries, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for Thresholds {
    fn default() -> Thresholds {
        Thresholds {
            warning: DEFAULT_WARNING,
            critical: DEFAULT_CRITICAL,
        }
    }
}

impl Thresholds {
    /// Parse the `-w`/`-c` flag values, falling back to defaults when unset
    pub fn parse(warning: Option<&str>, critical: Option<&str>) -> Result<Thresholds, CheckError> {
        let warning = match warning {
            Some(w) => parse_threshold("warning", w)?,
            None => DEFAULT_WARNING,
        };
        let critical = match critical {
            Some(c) => parse_threshold("critical", c)?,
            None => DEFAULT_CRITICAL,
        };
        if warning > critical {
            return Err(CheckError::Threshold(format!(
                "warning ({}) is above critical ({})",
                warning, critical
            )));
        }
        Ok(Thresholds { warning, critical })
    }
}

fn parse_threshold(name: &str, value: &str) -> Result<f64, CheckError> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        CheckError::Threshold(format!("{} threshold `{}` is not a number", name, value))
    })?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(CheckError::Threshold(format!(
            "{} threshold `{}` must be a non-negative number of seconds",
            name, value
        )));
    }
    Ok(parsed)
}

/// Split a comma separated endpoint list, dropping blanks
pub fn split_endpoints(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ep| !ep.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parse a boolean the way etcdctl (Go's strconv) does
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(format!("`{}` is not a boolean", s)),
    }
}

fn env_bool<F>(lookup: &F, name: &str) -> Result<Option<bool>, CheckError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| parse_bool(v.trim()).map_err(|e| CheckError::Config(format!("{}: {}", name, e))))
        .transpose()
}

/// Timeouts in the environment are bare seconds (`2`, `0.5`) or durations
/// the way etcdctl writes them (`500ms`, `1m30s`, `1.5s`)
fn env_seconds<F>(lookup: &F, name: &str) -> Result<Option<Duration>, CheckError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match lookup(name) {
        Some(raw) => raw,
        None => return Ok(None),
    };
    let trimmed = raw.trim();
    if let Ok(secs) = trimmed.parse::<f64>() {
        return seconds(name, secs).map(Some);
    }
    match humantime::parse_duration(trimmed) {
        Ok(d) if d > Duration::ZERO => Ok(Some(d)),
        Ok(_) => Err(CheckError::Config(format!(
            "{}: timeout must be positive, got `{}`",
            name, raw
        ))),
        // humantime has no fractional units, Go does
        Err(e) => match trimmed.strip_suffix('s').map(str::parse::<f64>) {
            Some(Ok(secs)) => seconds(name, secs).map(Some),
            _ => Err(CheckError::Config(format!(
                "{}: `{}` is not a duration: {}",
                name, raw, e
            ))),
        },
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, CheckError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(CheckError::Config(format!(
            "{}: timeout must be a positive number of seconds, got {}",
            name, secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| CheckError::Config(format!("{}: {} seconds: {}", name, secs, e)))
}

/// Check the number of reads `alpr` should average over
///
/// Every read may take up to the command timeout, so the count is capped to
/// keep a run from outliving its monitoring system's patience.
pub fn read_count(total: usize) -> Result<usize, CheckError> {
    if total == 0 || total > MAX_READS {
        return Err(CheckError::Config(format!(
            "--total must be between 1 and {}, got {}",
            MAX_READS, total
        )));
    }
    Ok(total)
}
