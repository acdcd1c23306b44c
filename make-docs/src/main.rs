//! Regenerate `src/scripts.rs` from the `--help` output of the built checks
//!
//! Run from the repository root after `cargo build`:
//!
//! ```plain
//! $ cargo run -p make-docs > src/scripts.rs
//! ```

use std::process::Command;

struct Check {
    name: &'static str,
    about: &'static str,
    /// Subcommands whose own `--help` is worth documenting
    subcommands: &'static [&'static str],
}

fn main() {
    let preamble = "Documentation about the various scripts contained herein\n";

    let checks = [Check {
        name: "check-etcd",
        about: "Cross platform, only requires network access to an etcd cluster.",
        subcommands: &["alpr"],
    }];

    let mut out: String = cp(preamble.split('\n'));
    out.push('\n');
    out.push_str(&cp(checks.iter().map(|c| format!("- [{0}](#{0})", c.name))));
    out.push('\n');
    for check in &checks {
        out.push_str(&format!(
            "\
//!
//! # {0}
//!
//! {1}
//!
",
            check.name, check.about
        ));
        out.push_str(&help_block(check.name, &[]));
        for sub in check.subcommands {
            out.push_str("//!\n");
            out.push_str(&help_block(check.name, &[*sub]));
        }
    }
    out.push('\n');
    print!("{}", out);
}

/// A commented, fenced block showing `<name> [args] --help`
fn help_block(name: &str, args: &[&str]) -> String {
    let mut invocation: Vec<&str> = args.to_vec();
    invocation.push("--help");
    let output = match Command::new(format!("target/debug/{}", name))
        .args(&invocation)
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Couldn't execute command {}: {}", name, e);
            std::process::exit(1);
        }
    };
    let help = String::from_utf8_lossy(&output.stdout);
    format!(
        "//! ```plain\n//! $ {} {}\n{}\n//! ```\n",
        name,
        invocation.join(" "),
        cp(help.trim_end().split('\n'))
    )
}

/// Comment each line in the iterator
fn cp<S: AsRef<str>, I: Iterator<Item = S>>(s: I) -> String {
    s.map(|s| format!("//! {}", s.as_ref()))
        .map(|s| s.trim().into())
        .collect::<Vec<String>>()
        .join("\n")
}
