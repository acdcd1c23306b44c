//! Run a diagnostic against the cluster and decide what it means
//!
//! Each check returns exactly one `Report`. Failures along the way never
//! escape as errors: they are folded into the report's status, with the raw
//! detail sent to the log (standard error) so that standard output stays a
//! single parseable line.

use std::time::Duration;

use log::{info, warn};

use crate::cluster::{ClusterClient, EndpointHealth, LATENCY_KEY};
use crate::config::{ConnectionConfig, Thresholds};
use crate::error::CheckError;
use crate::status::{Report, Status};

/// Classify a latency in seconds against the thresholds
///
/// The intervals are closed on the left: a latency equal to the warning
/// threshold warns, one equal to the critical threshold is critical.
pub fn classify_latency(latency: f64, thresholds: &Thresholds) -> Status {
    if latency >= thresholds.critical {
        Status::Critical
    } else if latency >= thresholds.warning {
        Status::Warning
    } else {
        Status::Ok
    }
}

/// The cluster is healthy only if every call went through and every member
/// that answered is healthy. No members at all is not healthy.
pub fn classify_health(calls_succeeded: bool, members: &[EndpointHealth]) -> Status {
    if calls_succeeded && !members.is_empty() && members.iter().all(|m| m.healthy) {
        Status::Ok
    } else {
        Status::Critical
    }
}

/// Check `health`: ask every configured endpoint
pub fn health<C: ClusterClient + ?Sized>(client: &mut C, config: &ConnectionConfig) -> Report {
    let mut calls_succeeded = true;
    let mut members = Vec::with_capacity(config.endpoints.len());
    for endpoint in &config.endpoints {
        match client.endpoint_health(endpoint) {
            Ok(member) => {
                if member.healthy {
                    info!("{}", member);
                } else {
                    warn!("{}", member);
                }
                members.push(member);
            }
            Err(e) => {
                warn!("{} is unhealthy: {}", endpoint, e);
                calls_succeeded = false;
            }
        }
    }
    let status = classify_health(calls_succeeded, &members);
    health_report(status)
}

pub fn health_report(status: Status) -> Report {
    let state = if status == Status::Ok {
        "healthy"
    } else {
        "unhealthy"
    };
    Report::new(status, format!("ETCD state: {}", state))
}

/// Check `alpr`: time `total` linearizable reads on one client and classify
/// their mean
pub fn average_latency<C: ClusterClient + ?Sized>(
    client: &mut C,
    thresholds: &Thresholds,
    total: usize,
) -> Report {
    let measured = client
        .timed_reads(LATENCY_KEY, total)
        .and_then(|samples| mean_seconds(&samples));
    match measured {
        Ok(latency) => {
            info!(
                "{} read(s) of {:?}, average {} secs",
                total, LATENCY_KEY, latency
            );
            latency_report(classify_latency(latency, thresholds), latency)
        }
        Err(e) => {
            warn!("latency measurement failed: {}", e);
            Report::new(e.status(), format!("Average Latency Per Request: {}", e))
        }
    }
}

pub fn latency_report(status: Status, latency: f64) -> Report {
    Report::new(
        status,
        format!("Average Latency Per Request: {} secs", latency),
    )
}

/// Mean of the samples in seconds, at the 4 decimal places etcd's benchmark
/// tool reports
pub fn mean_seconds(samples: &[Duration]) -> Result<f64, CheckError> {
    if samples.is_empty() {
        return Err(CheckError::Parse("no latency samples were recorded".to_owned()));
    }
    let total: f64 = samples.iter().map(Duration::as_secs_f64).sum();
    let mean = total / samples.len() as f64;
    if !mean.is_finite() {
        return Err(CheckError::Parse(format!("latency {} is not a number", mean)));
    }
    Ok((mean * 10_000.0).round() / 10_000.0)
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::cluster::{ClusterClient, EndpointHealth};
    use crate::config::{ConnectionConfig, Thresholds};
    use crate::error::CheckError;
    use crate::status::Status;

    /// How the fake cluster should answer for one endpoint
    enum Answer {
        Healthy,
        Alarmed,
        Unreachable,
    }

    /// A cluster that answers from a script instead of the network
    struct FakeCluster {
        members: HashMap<String, Answer>,
        latencies: Result<Vec<Duration>, fn() -> CheckError>,
        reads_asked: Option<(String, usize)>,
    }

    impl FakeCluster {
        fn with_members(members: Vec<(&str, Answer)>) -> FakeCluster {
            FakeCluster {
                members: members
                    .into_iter()
                    .map(|(ep, a)| (ep.to_owned(), a))
                    .collect(),
                latencies: Ok(vec![]),
                reads_asked: None,
            }
        }

        fn with_latencies(millis: &[u64]) -> FakeCluster {
            FakeCluster {
                members: HashMap::new(),
                latencies: Ok(millis.iter().map(|ms| Duration::from_millis(*ms)).collect()),
                reads_asked: None,
            }
        }

        fn failing_reads(err: fn() -> CheckError) -> FakeCluster {
            FakeCluster {
                members: HashMap::new(),
                latencies: Err(err),
                reads_asked: None,
            }
        }
    }

    impl ClusterClient for FakeCluster {
        fn endpoint_health(&mut self, endpoint: &str) -> Result<EndpointHealth, CheckError> {
            let member = |healthy: bool, error: Option<&str>| EndpointHealth {
                endpoint: endpoint.to_owned(),
                healthy,
                took: Duration::from_millis(2),
                error: error.map(str::to_owned),
            };
            match self.members.get(endpoint) {
                Some(Answer::Healthy) => Ok(member(true, None)),
                Some(Answer::Alarmed) => Ok(member(false, Some("Active Alarm(s): 1"))),
                Some(Answer::Unreachable) | None => Err(CheckError::Connection(format!(
                    "{}: connection refused",
                    endpoint
                ))),
            }
        }

        fn timed_reads(&mut self, key: &str, count: usize) -> Result<Vec<Duration>, CheckError> {
            self.reads_asked = Some((key.to_owned(), count));
            match self.latencies {
                Ok(ref samples) => Ok(samples.clone()),
                Err(make_err) => Err(make_err()),
            }
        }
    }

    fn config_for(endpoints: &[&str]) -> ConnectionConfig {
        ConnectionConfig {
            endpoints: endpoints.iter().map(|ep| ep.to_string()).collect(),
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn latency_partition() {
        let t = Thresholds::default();
        assert_eq!(classify_latency(0.0, &t), Status::Ok);
        assert_eq!(classify_latency(0.05, &t), Status::Ok);
        assert_eq!(classify_latency(0.0999, &t), Status::Ok);
        assert_eq!(classify_latency(0.1, &t), Status::Warning);
        assert_eq!(classify_latency(0.5, &t), Status::Warning);
        assert_eq!(classify_latency(0.9999, &t), Status::Warning);
        assert_eq!(classify_latency(1.0, &t), Status::Critical);
        assert_eq!(classify_latency(12.0, &t), Status::Critical);
    }

    #[test]
    fn latency_uses_custom_thresholds() {
        let t = Thresholds {
            warning: 0.002,
            critical: 0.004,
        };
        assert_eq!(classify_latency(0.0015, &t), Status::Ok);
        assert_eq!(classify_latency(0.003, &t), Status::Warning);
        assert_eq!(classify_latency(0.004, &t), Status::Critical);

        // no room between them: anything at the boundary is critical
        let t = Thresholds {
            warning: 0.5,
            critical: 0.5,
        };
        assert_eq!(classify_latency(0.5, &t), Status::Critical);
        assert_eq!(classify_latency(0.4, &t), Status::Ok);
    }

    #[test]
    fn health_partition() {
        let up = EndpointHealth {
            endpoint: "a:2379".into(),
            healthy: true,
            took: Duration::from_millis(1),
            error: None,
        };
        let down = EndpointHealth {
            endpoint: "b:2379".into(),
            healthy: false,
            took: Duration::from_millis(1),
            error: Some("Active Alarm(s): 1".into()),
        };
        assert_eq!(classify_health(true, &[up.clone()]), Status::Ok);
        assert_eq!(classify_health(false, &[up.clone()]), Status::Critical);
        assert_eq!(classify_health(true, &[up, down]), Status::Critical);
        assert_eq!(classify_health(true, &[]), Status::Critical);
    }

    #[test]
    fn healthy_cluster_is_ok() {
        let mut cluster = FakeCluster::with_members(vec![
            ("etcd-0:2379", Answer::Healthy),
            ("etcd-1:2379", Answer::Healthy),
        ]);
        let report = health(&mut cluster, &config_for(&["etcd-0:2379", "etcd-1:2379"]));
        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.message, "OK - ETCD state: healthy");
    }

    #[test]
    fn failing_client_is_critical() {
        let mut cluster = FakeCluster::with_members(vec![("127.0.0.1:2379", Answer::Unreachable)]);
        let report = health(&mut cluster, &ConnectionConfig::default());
        assert_eq!(report.status, Status::Critical);
        assert_eq!(report.message, "CRITICAL - ETCD state: unhealthy");
        assert_eq!(report.status.code(), 2);
    }

    #[test]
    fn partial_health_is_critical() {
        let mut cluster = FakeCluster::with_members(vec![
            ("etcd-0:2379", Answer::Healthy),
            ("etcd-1:2379", Answer::Alarmed),
        ]);
        let report = health(&mut cluster, &config_for(&["etcd-0:2379", "etcd-1:2379"]));
        assert_eq!(report.message, "CRITICAL - ETCD state: unhealthy");

        let mut cluster = FakeCluster::with_members(vec![("etcd-0:2379", Answer::Healthy)]);
        let report = health(&mut cluster, &config_for(&["etcd-0:2379", "etcd-9:2379"]));
        assert_eq!(report.status, Status::Critical);
    }

    #[test]
    fn no_endpoints_is_critical() {
        let mut cluster = FakeCluster::with_members(vec![]);
        let report = health(&mut cluster, &config_for(&[]));
        assert_eq!(report.status, Status::Critical);
    }

    #[test]
    fn fast_reads_are_ok() {
        let mut cluster = FakeCluster::with_latencies(&[50]);
        let report = average_latency(&mut cluster, &Thresholds::default(), 1);
        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.message, "OK - Average Latency Per Request: 0.05 secs");
        assert_eq!(cluster.reads_asked, Some(("dummy".to_owned(), 1)));
    }

    #[test]
    fn slow_reads_warn() {
        let mut cluster = FakeCluster::with_latencies(&[500]);
        let report = average_latency(&mut cluster, &Thresholds::default(), 1);
        assert_eq!(report.status, Status::Warning);
        assert_eq!(report.status.code(), 1);
        assert_eq!(report.message, "WARNING - Average Latency Per Request: 0.5 secs");
    }

    #[test]
    fn very_slow_reads_are_critical() {
        let mut cluster = FakeCluster::with_latencies(&[1000, 3000]);
        let report = average_latency(&mut cluster, &Thresholds::default(), 2);
        assert_eq!(report.status, Status::Critical);
        assert_eq!(report.message, "CRITICAL - Average Latency Per Request: 2 secs");
        assert_eq!(cluster.reads_asked, Some(("dummy".to_owned(), 2)));
    }

    #[test]
    fn unreachable_cluster_is_critical() {
        let mut cluster =
            FakeCluster::failing_reads(|| CheckError::Connection("connection refused".into()));
        let report = average_latency(&mut cluster, &Thresholds::default(), 1);
        assert_eq!(report.status, Status::Critical);
        assert!(report.message.starts_with("CRITICAL - Average Latency Per Request: "));
    }

    #[test]
    fn timed_out_reads_are_critical() {
        let mut cluster = FakeCluster::failing_reads(|| CheckError::Timeout {
            what: "read 1 of \"dummy\"".into(),
            after: Duration::from_secs(5),
        });
        let report = average_latency(&mut cluster, &Thresholds::default(), 1);
        assert_eq!(report.status, Status::Critical);
    }

    #[test]
    fn missing_samples_are_unknown() {
        let mut cluster = FakeCluster::with_latencies(&[]);
        let report = average_latency(&mut cluster, &Thresholds::default(), 0);
        assert_eq!(report.status, Status::Unknown);
        assert_eq!(report.status.code(), 3);
    }

    #[test]
    fn mean_is_rounded_like_the_benchmark() {
        let samples = [Duration::from_micros(1234), Duration::from_micros(1250)];
        assert_eq!(mean_seconds(&samples).unwrap(), 0.0012);
        assert!(mean_seconds(&[]).is_err());
    }
}
