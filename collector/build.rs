//! Build ident for the startup log line: short git hash, build time and
//! cargo profile, exported as `COLLECTOR_*` compile-time variables.
//!
//! No `rerun-if-changed` directive is emitted, so the script runs on every
//! build and the timestamp stays current.

use std::process::Command;

fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    let vars = [
        ("COLLECTOR_GIT_HASH", git_hash().unwrap_or_else(|| "unknown".to_string())),
        (
            "COLLECTOR_BUILD_TIMESTAMP",
            chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
        ),
        (
            "COLLECTOR_BUILD_PROFILE",
            std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string()),
        ),
    ];

    for (key, value) in vars {
        println!("cargo:rustc-env={}={}", key, value);
    }
}
