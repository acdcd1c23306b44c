//! Exit statuses and the single report a check produces

use std::fmt;
use std::process;

/// The status of a check, in the order of how bad it is
///
/// `Unknown` sorts last so that `max` over a set of statuses surfaces a
/// check that couldn't tell what's going on.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn exit(self) -> ! {
        process::exit(self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// The terminal result of one run: a status and the line to print for it
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub status: Status,
    pub message: String,
}

impl Report {
    /// Build a report whose message is prefixed with the status level
    pub fn new<S: AsRef<str>>(status: Status, detail: S) -> Report {
        Report {
            status,
            message: format!("{} - {}", status, detail.as_ref()),
        }
    }

    pub fn print_and_exit(self) -> ! {
        println!("{}", self.message);
        self.status.exit()
    }
}

#[cfg(test)]
mod test {
    use std::cmp::max;

    use super::{Report, Status};

    #[test]
    fn worst_status_wins() {
        assert_eq!(max(Status::Ok, Status::Warning), Status::Warning);
        assert_eq!(max(Status::Critical, Status::Warning), Status::Critical);
        assert_eq!(max(Status::Critical, Status::Unknown), Status::Unknown);
    }

    #[test]
    fn codes_follow_the_plugin_convention() {
        let codes: Vec<i32> = [Status::Ok, Status::Warning, Status::Critical, Status::Unknown]
            .iter()
            .map(|s| s.code())
            .collect();
        assert_eq!(codes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn report_prefixes_level() {
        let report = Report::new(Status::Critical, "ETCD state: unhealthy");
        assert_eq!(report.message, "CRITICAL - ETCD state: unhealthy");
    }
}
