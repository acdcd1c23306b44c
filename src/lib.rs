//! etcd-plugins: Sensu/Nagios checks for etcd clusters
//!
//! The `check-etcd` binary is the thing you actually run; this library holds
//! the pieces it is built from so that they can be tested without a cluster:
//!
//! * [`config`] resolves flags and `ETCDCTL_*` environment variables into a
//!   `ConnectionConfig` and latency `Thresholds`
//! * [`cluster`] defines the `ClusterClient` seam and the real `EtcdClient`
//! * [`checks`] runs the `health` and `alpr` diagnostics and classifies them
//! * [`status`] is the `Status`/`Report` pair every check ends with
//!
//! See [`scripts`] for the command line interface.

pub mod checks;
pub mod cluster;
pub mod config;
pub mod error;
pub mod scripts;
pub mod status;

pub use crate::status::{Report, Status};
