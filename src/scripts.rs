//! Documentation about the various scripts contained herein
//!
//! - [check-etcd](#check-etcd)
//!
//! # check-etcd
//!
//! Cross platform, only requires network access to an etcd cluster.
//!
//! ```plain
//! $ check-etcd --help
//! check-etcd (part of etcd-plugins) 0.1.0
//! Brandon W Maister <quodlibetor@gmail.com>
//! Check the health and request latency of an etcd cluster.
//!
//! Prints a single status line and exits with the matching Nagios/Sensu status code.
//!
//! USAGE:
//!     check-etcd <SUBCOMMAND>
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Prints version information
//!
//! SUBCOMMANDS:
//!     alpr      Check the Average Latency Per Request of a linearizable read.
//!     health    Check that every endpoint is healthy.
//!     help      Prints this message or the help of the given subcommand(s)
//!
//! Environment:
//!
//!     Connection flags that aren't given fall back to the variables etcdctl
//!     reads, and then to the defaults shown:
//!
//!         --endpoint                   ETCDCTL_ENDPOINTS                 127.0.0.1:2379
//!         --cacert                     ETCDCTL_CACERT
//!         --cert                       ETCDCTL_CERT
//!         --key                        ETCDCTL_KEY
//!         --user                       ETCDCTL_USER
//!         --password                   ETCDCTL_PASSWORD
//!         --insecure-transport         ETCDCTL_INSECURE_TRANSPORT        true
//!         --insecure-skip-tls-verify   ETCDCTL_INSECURE_SKIP_TLS_VERIFY  false
//!         --dial-timeout               ETCDCTL_DIAL_TIMEOUT              2
//!         --command-timeout            ETCDCTL_COMMAND_TIMEOUT           5
//!
//!     Timeouts in the environment may also be durations such as 500ms or 1m30s.
//!
//! Exit status:
//!
//!     0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN. A missing command exits 3, an
//!     unrecognised flag exits 1 without contacting the cluster.
//! ```
//!
//! ```plain
//! $ check-etcd alpr --help
//! check-etcd-alpr 0.1.0
//! Check the Average Latency Per Request of a linearizable read.
//!
//! Uses one connection and one client to read a reserved key and compares the mean latency against --warning and
//! --critical.
//!
//! USAGE:
//!     check-etcd alpr [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Prints version information
//!     -v, --verbose    Log details to stderr
//!
//! OPTIONS:
//!         --cacert <cacert>                                        Verify the server certificate with this CA bundle
//!         --cert <cert>                                            Client certificate
//!         --command-timeout <command-timeout>                      Seconds to wait for each request
//!     -c, --critical <critical>                                    Seconds of latency to go critical at [default: 1]
//!         --dial-timeout <dial-timeout>                            Seconds to wait for a connection
//!         --endpoint <endpoint>                                    Comma separated list of endpoints
//!         --insecure-skip-tls-verify <insecure-skip-tls-verify>    Skip server certificate verification [default: false]
//!         --insecure-transport <insecure-transport>                Allow plaintext when no TLS material is given [default: true]
//!         --key <key>                                              Client key
//!         --password <password>                                    Password for --user
//!         --total <total>                                          Number of reads to average over, at most 100 [default: 1]
//!         --user <user>                                            Username, or username:password
//!     -w, --warning <warning>                                      Seconds of latency to warn at [default: 0.1]
//! ```
//!
//! Examples:
//!
//! ```plain
//! $ check-etcd health --endpoint etcd-0:2379,etcd-1:2379,etcd-2:2379
//! OK - ETCD state: healthy
//!
//! $ check-etcd alpr --cacert ca.pem --cert client.pem --key client-key.pem -w 0.05 -c 0.5
//! WARNING - Average Latency Per Request: 0.0712 secs
//! ```
