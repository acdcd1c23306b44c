//! Everything that can go wrong while probing a cluster

use std::time::Duration;

use thiserror::Error;

use crate::status::Status;

#[derive(Debug, Error)]
pub enum CheckError {
    /// Couldn't reach the endpoint, or it refused us (TLS, auth, gRPC)
    #[error("connection error: {0}")]
    Connection(String),

    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    /// The client answered, but not with something we can measure
    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("invalid threshold: {0}")]
    Threshold(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CheckError {
    /// The status a run ends with when it fails this way
    pub fn status(&self) -> Status {
        match *self {
            CheckError::Connection(_) | CheckError::Timeout { .. } => Status::Critical,
            CheckError::Parse(_) | CheckError::Threshold(_) | CheckError::Config(_) => {
                Status::Unknown
            }
        }
    }
}

impl From<etcd_client::Error> for CheckError {
    fn from(e: etcd_client::Error) -> Self {
        CheckError::Connection(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::CheckError;
    use crate::status::Status;

    #[test]
    fn network_failures_are_critical() {
        assert_eq!(
            CheckError::Connection("refused".into()).status(),
            Status::Critical
        );
        let timeout = CheckError::Timeout {
            what: "dial 127.0.0.1:2379".into(),
            after: Duration::from_secs(2),
        };
        assert_eq!(timeout.status(), Status::Critical);
        assert_eq!(timeout.to_string(), "dial 127.0.0.1:2379 timed out after 2s");
    }

    #[test]
    fn local_failures_are_unknown() {
        assert_eq!(CheckError::Parse("no samples".into()).status(), Status::Unknown);
        assert_eq!(CheckError::Threshold("-w abc".into()).status(), Status::Unknown);
        assert_eq!(CheckError::Config("bad bool".into()).status(), Status::Unknown);
    }
}
