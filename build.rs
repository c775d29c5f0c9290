//! Build script for lamco-capture-encoder
//!
//! Exposes build date, time and commit to the startup banner.

use std::process::Command;

fn command_output(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    for (key, program, args) in [
        ("BUILD_DATE", "date", &["+%Y-%m-%d"][..]),
        ("BUILD_TIME", "date", &["+%H:%M:%S"][..]),
        ("GIT_HASH", "git", &["rev-parse", "--short", "HEAD"][..]),
    ] {
        println!("cargo:rustc-env={}={}", key, command_output(program, args));
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
}
