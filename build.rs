//! Stamps the crate with a version string and git revision for `--version`.
//!
//! `CAST_BRIDGE_VERSION` overrides the package version and
//! `CAST_BRIDGE_GIT_SHA` overrides the revision (CI sets both from the tag).

use std::process::Command;

fn main() {
    let version = std::env::var("CAST_BRIDGE_VERSION")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var("CARGO_PKG_VERSION").ok())
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=CAST_BRIDGE_VERSION={}", version);

    let revision = std::env::var("CAST_BRIDGE_GIT_SHA")
        .ok()
        .filter(|sha| !sha.is_empty())
        .unwrap_or_else(git_revision);
    println!("cargo:rustc-env=CAST_BRIDGE_GIT_SHA={}", revision);

    println!("cargo:rerun-if-env-changed=CAST_BRIDGE_VERSION");
    println!("cargo:rerun-if-env-changed=CAST_BRIDGE_GIT_SHA");
}

fn git_revision() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|sha| sha.trim().to_string())
        .unwrap_or_else(|| "unknown".into())
}
