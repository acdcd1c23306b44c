//! Talk to etcd
//!
//! Checks only ever see the `ClusterClient` trait. `EtcdClient` implements it
//! on top of the async `etcd-client` crate by driving each call to completion
//! on a private single-threaded runtime, with every dial and request bounded
//! by the configured timeouts.

use std::fmt;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use etcd_client::{AlarmAction, AlarmType, Client, ConnectOptions, OpenSslClientConfig};
use log::{debug, warn};
use openssl::ssl::SslVerifyMode;
use tokio::runtime::{Builder, Runtime};

use crate::config::ConnectionConfig;
use crate::error::CheckError;

/// The key read to prove a member can serve a quorum read
pub const HEALTH_KEY: &str = "health";
/// The key read when measuring request latency; it doesn't need to exist
pub const LATENCY_KEY: &str = "dummy";

/// What one member said when asked whether it was healthy
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointHealth {
    pub endpoint: String,
    pub healthy: bool,
    pub took: Duration,
    pub error: Option<String>,
}

impl fmt::Display for EndpointHealth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.healthy {
            write!(
                f,
                "{} is healthy: successfully committed proposal: took = {:?}",
                self.endpoint, self.took
            )
        } else {
            write!(
                f,
                "{} is unhealthy: failed to commit proposal: {}",
                self.endpoint,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

/// The operations the checks need from a cluster
pub trait ClusterClient {
    /// Ask a single endpoint whether it is healthy
    ///
    /// An `Err` means the question couldn't be asked at all (unreachable,
    /// refused, timed out). A member that answers but reports a problem is
    /// an `Ok` with `healthy: false`.
    fn endpoint_health(&mut self, endpoint: &str) -> Result<EndpointHealth, CheckError>;

    /// Connect once and time `count` sequential linearizable reads of `key`
    fn timed_reads(&mut self, key: &str, count: usize) -> Result<Vec<Duration>, CheckError>;
}

/// How connections are secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Plaintext,
    /// TLS, checking the server certificate against `--cacert` or the system roots
    Verified,
    /// TLS without checking who is on the other end
    Unverified,
}

impl TlsMode {
    pub fn of(config: &ConnectionConfig) -> TlsMode {
        if !config.uses_tls() {
            TlsMode::Plaintext
        } else if config.insecure_skip_tls_verify {
            TlsMode::Unverified
        } else {
            TlsMode::Verified
        }
    }
}

pub struct EtcdClient {
    config: ConnectionConfig,
    runtime: Runtime,
}

impl EtcdClient {
    /// Prepare a client; nothing is dialed until a check runs
    pub fn new(config: ConnectionConfig) -> Result<EtcdClient, CheckError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CheckError::Connection(format!("couldn't start client runtime: {}", e)))?;
        Ok(EtcdClient { config, runtime })
    }

    fn connect_options(&self) -> Result<ConnectOptions, CheckError> {
        let mut options = ConnectOptions::new()
            .with_connect_timeout(self.config.dial_timeout)
            .with_timeout(self.config.command_timeout);
        if let Some(ref user) = self.config.user {
            let password = self.config.password.clone().unwrap_or_default();
            options = options.with_user(user.clone(), password);
        }
        let mode = TlsMode::of(&self.config);
        if mode != TlsMode::Plaintext {
            options = options.with_openssl_tls(self.tls_config(mode)?);
        }
        Ok(options)
    }

    fn tls_config(&self, mode: TlsMode) -> Result<OpenSslClientConfig, CheckError> {
        let mut tls = OpenSslClientConfig::default();
        if let Some(ref ca) = self.config.cacert {
            tls = tls.ca_cert_pem(&read_pem(ca)?);
        }
        match (&self.config.cert, &self.config.key) {
            (Some(cert), Some(key)) => {
                tls = tls.client_cert_pem_and_key(&read_pem(cert)?, &read_pem(key)?);
            }
            (None, None) => {}
            _ => {
                return Err(CheckError::Connection(
                    "--cert and --key must be given together".to_owned(),
                ))
            }
        }
        if mode == TlsMode::Unverified {
            warn!("not verifying the server certificate");
            tls = tls.manually(|builder| {
                builder.set_verify(SslVerifyMode::NONE);
                Ok(())
            });
        }
        Ok(tls)
    }

    async fn connect(&self, endpoints: &[String]) -> Result<Client, CheckError> {
        let urls: Vec<String> = endpoints
            .iter()
            .map(|ep| self.config.endpoint_url(ep))
            .collect();
        let options = self.connect_options()?;
        debug!("connecting to {}", urls.join(","));
        let what = format!("dial {}", urls.join(","));
        let client = bounded(what, self.config.dial_timeout, Client::connect(urls, Some(options)))
            .await??;
        Ok(client)
    }

    async fn check_endpoint(&self, endpoint: &str) -> Result<EndpointHealth, CheckError> {
        let start = Instant::now();
        let mut client = self.connect(&[endpoint.to_owned()]).await?;
        let timeout = self.config.command_timeout;

        let read = bounded(
            format!("read of {:?} from {}", HEALTH_KEY, endpoint),
            timeout,
            client.get(HEALTH_KEY, None),
        )
        .await?;
        match read {
            Ok(_) => {}
            // the member served the request, we just aren't allowed to see the key
            Err(ref e) if is_permission_denied(e) => {
                debug!("{}: permission denied reading {:?}, still healthy", endpoint, HEALTH_KEY)
            }
            Err(e) => return Err(e.into()),
        }
        let took = start.elapsed();

        let mut health = EndpointHealth {
            endpoint: endpoint.to_owned(),
            healthy: true,
            took,
            error: None,
        };
        let alarms = bounded(
            format!("alarm list from {}", endpoint),
            timeout,
            client.alarm(AlarmAction::Get, AlarmType::None, None),
        )
        .await?;
        match alarms {
            Ok(resp) => {
                if !resp.alarms().is_empty() {
                    health.healthy = false;
                    health.error = Some(format!("Active Alarm(s): {}", resp.alarms().len()));
                }
            }
            Err(e) => {
                health.healthy = false;
                health.error = Some(format!("Unable to fetch the alarm list: {}", e));
            }
        }
        Ok(health)
    }

    async fn read_latencies(&self, key: &str, count: usize) -> Result<Vec<Duration>, CheckError> {
        let mut client = self.connect(&self.config.endpoints).await?;
        let mut samples = Vec::new();
        for n in 0..count {
            let start = Instant::now();
            bounded(
                format!("read {} of {:?}", n + 1, key),
                self.config.command_timeout,
                client.get(key, None),
            )
            .await??;
            samples.push(start.elapsed());
        }
        Ok(samples)
    }
}

impl ClusterClient for EtcdClient {
    fn endpoint_health(&mut self, endpoint: &str) -> Result<EndpointHealth, CheckError> {
        self.runtime.block_on(self.check_endpoint(endpoint))
    }

    fn timed_reads(&mut self, key: &str, count: usize) -> Result<Vec<Duration>, CheckError> {
        self.runtime.block_on(self.read_latencies(key, count))
    }
}

/// Run `fut`, giving up after `after`
async fn bounded<F: Future>(what: String, after: Duration, fut: F) -> Result<F::Output, CheckError> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| CheckError::Timeout { what, after })
}

fn is_permission_denied(e: &etcd_client::Error) -> bool {
    match *e {
        etcd_client::Error::GRpcStatus(ref status) => {
            status.code() == tonic::Code::PermissionDenied
        }
        _ => false,
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, CheckError> {
    fs::read(path)
        .map_err(|e| CheckError::Connection(format!("couldn't read {}: {}", path.display(), e)))
}
