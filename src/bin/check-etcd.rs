//! Check the health and request latency of an etcd cluster

use std::ffi::OsString;
use std::path::PathBuf;
use std::process;

use log::{debug, error};
use structopt::clap::{AppSettings, ErrorKind};
use structopt::StructOpt;

use etcd_plugins::checks;
use etcd_plugins::cluster::EtcdClient;
use etcd_plugins::config::{parse_bool, read_count, ConnectionConfig, ConnectionFlags, Thresholds};
use etcd_plugins::error::CheckError;
use etcd_plugins::{Report, Status};

static ENVIRONMENT_HELP: &str = "Environment:

    Connection flags that aren't given fall back to the variables etcdctl
    reads, and then to the defaults shown:

        --endpoint                   ETCDCTL_ENDPOINTS                 127.0.0.1:2379
        --cacert                     ETCDCTL_CACERT
        --cert                       ETCDCTL_CERT
        --key                        ETCDCTL_KEY
        --user                       ETCDCTL_USER
        --password                   ETCDCTL_PASSWORD
        --insecure-transport         ETCDCTL_INSECURE_TRANSPORT        true
        --insecure-skip-tls-verify   ETCDCTL_INSECURE_SKIP_TLS_VERIFY  false
        --dial-timeout               ETCDCTL_DIAL_TIMEOUT              2
        --command-timeout            ETCDCTL_COMMAND_TIMEOUT           5

    Timeouts in the environment may also be durations such as 500ms or 1m30s.

Exit status:

    0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN. A missing command exits 3, an
    unrecognised flag exits 1 without contacting the cluster.";

/// Check the health and request latency of an etcd cluster.
///
/// Prints a single status line and exits with the matching Nagios/Sensu
/// status code.
#[derive(StructOpt, Debug)]
#[structopt(
    name = "check-etcd (part of etcd-plugins)",
    global_settings = &[AppSettings::ColoredHelp],
    setting = AppSettings::SubcommandRequiredElseHelp,
    after_help = ENVIRONMENT_HELP
)]
struct Args {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Check that every endpoint is healthy.
    ///
    /// Each endpoint is asked for a linearizable read and for its alarm list.
    /// There is no warning state: the cluster is either healthy or critical.
    Health(CheckArgs),
    /// Check the Average Latency Per Request of a linearizable read.
    ///
    /// Uses one connection and one client to read a reserved key and compares
    /// the mean latency against --warning and --critical.
    Alpr {
        #[structopt(flatten)]
        args: CheckArgs,
        #[structopt(
            long = "total",
            default_value = "1",
            help = "Number of reads to average over, at most 100"
        )]
        total: usize,
    },
}

#[derive(StructOpt, Debug)]
struct CheckArgs {
    #[structopt(long = "endpoint", help = "Comma separated list of endpoints")]
    endpoint: Option<String>,
    #[structopt(
        long = "cacert",
        parse(from_os_str),
        help = "Verify the server certificate with this CA bundle"
    )]
    cacert: Option<PathBuf>,
    #[structopt(long = "cert", parse(from_os_str), help = "Client certificate")]
    cert: Option<PathBuf>,
    #[structopt(long = "key", parse(from_os_str), help = "Client key")]
    key: Option<PathBuf>,
    #[structopt(long = "user", help = "Username, or username:password")]
    user: Option<String>,
    #[structopt(long = "password", help = "Password for --user")]
    password: Option<String>,
    #[structopt(
        long = "insecure-transport",
        parse(try_from_str = parse_bool),
        help = "Allow plaintext when no TLS material is given [default: true]"
    )]
    insecure_transport: Option<Option<bool>>,
    #[structopt(
        long = "insecure-skip-tls-verify",
        parse(try_from_str = parse_bool),
        help = "Skip server certificate verification [default: false]"
    )]
    insecure_skip_tls_verify: Option<Option<bool>>,
    #[structopt(
        short = "w",
        long = "warning",
        allow_hyphen_values = true,
        help = "Seconds of latency to warn at [default: 0.1]"
    )]
    warning: Option<String>,
    #[structopt(
        short = "c",
        long = "critical",
        allow_hyphen_values = true,
        help = "Seconds of latency to go critical at [default: 1]"
    )]
    critical: Option<String>,
    #[structopt(long = "dial-timeout", help = "Seconds to wait for a connection")]
    dial_timeout: Option<f64>,
    #[structopt(long = "command-timeout", help = "Seconds to wait for each request")]
    command_timeout: Option<f64>,
    #[structopt(short = "v", long = "verbose", help = "Log details to stderr")]
    verbose: bool,
}

impl CheckArgs {
    fn connection_flags(&self) -> ConnectionFlags {
        ConnectionFlags {
            endpoints: self.endpoint.clone(),
            cacert: self.cacert.clone(),
            cert: self.cert.clone(),
            key: self.key.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            // a bare `--insecure-transport` means true
            insecure_transport: self.insecure_transport.map(|v| v.unwrap_or(true)),
            insecure_skip_tls_verify: self.insecure_skip_tls_verify.map(|v| v.unwrap_or(true)),
            dial_timeout: self.dial_timeout,
            command_timeout: self.command_timeout,
        }
    }

    fn thresholds(&self) -> Result<Thresholds, CheckError> {
        Thresholds::parse(self.warning.as_deref(), self.critical.as_deref())
    }
}

impl Command {
    fn args(&self) -> &CheckArgs {
        match *self {
            Command::Health(ref args) => args,
            Command::Alpr { ref args, .. } => args,
        }
    }
}

/// Why argument parsing stopped short of a command to run
#[derive(Debug)]
enum EarlyExit {
    /// --help or --version
    Info(String),
    /// No command given
    Usage(String),
    /// Unknown flag or a flag value that couldn't be parsed
    BadArgs(String),
}

fn parse_args<I>(argv: I) -> Result<Args, EarlyExit>
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    Args::from_iter_safe(argv).map_err(|e| match e.kind {
        ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => EarlyExit::Info(e.message),
        ErrorKind::MissingSubcommand | ErrorKind::MissingArgumentOrSubcommand => {
            EarlyExit::Usage(e.message)
        }
        _ => EarlyExit::BadArgs(e.message),
    })
}

impl EarlyExit {
    fn code(&self) -> i32 {
        match *self {
            EarlyExit::Info(_) => 0,
            EarlyExit::Usage(_) => Status::Unknown.code(),
            EarlyExit::BadArgs(_) => 1,
        }
    }
}

#[cfg_attr(test, allow(dead_code))]
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Stderr)
        .init();
}

fn failed(e: CheckError) -> Report {
    error!("{}", e);
    Report::new(e.status(), e.to_string())
}

/// Everything that has to be right before we touch the network
fn prepare<F>(command: &Command, env: F) -> Result<(ConnectionConfig, Thresholds), CheckError>
where
    F: Fn(&str) -> Option<String>,
{
    let args = command.args();
    let thresholds = args.thresholds()?;
    if let Command::Alpr { total, .. } = *command {
        read_count(total)?;
    }
    let config = ConnectionConfig::resolve(args.connection_flags(), env)?;
    debug!("endpoints {:?}, {:?}", config.endpoints, thresholds);
    Ok((config, thresholds))
}

fn run<F>(command: Command, env: F) -> Report
where
    F: Fn(&str) -> Option<String>,
{
    let (config, thresholds) = match prepare(&command, env) {
        Ok(prepared) => prepared,
        Err(e) => return failed(e),
    };
    let mut client = match EtcdClient::new(config.clone()) {
        Ok(client) => client,
        Err(e) => return failed(e),
    };
    match command {
        Command::Health(_) => checks::health(&mut client, &config),
        Command::Alpr { total, .. } => checks::average_latency(&mut client, &thresholds, total),
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(early) => {
            match early {
                EarlyExit::Info(ref text) | EarlyExit::Usage(ref text) => println!("{}", text),
                EarlyExit::BadArgs(ref text) => eprintln!("{}", text),
            }
            process::exit(early.code());
        }
    };
    init_logging(args.command.args().verbose);
    run(args.command, |name| std::env::var(name).ok()).print_and_exit();
}
