//! Stamps `GIT_SHA` and `BUILD_TIME` into the binaries for `/build-info`.
//!
//! Values set in the build environment win; otherwise the SHA comes from
//! `git` and the time from the build clock.

use chrono::{SecondsFormat, Utc};
use std::process::Command;

fn git_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8(output.stdout).ok()?;
    let sha = sha.trim();
    (!sha.is_empty()).then(|| sha.to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/heads/");
    println!("cargo:rerun-if-env-changed=GIT_SHA");
    println!("cargo:rerun-if-env-changed=BUILD_TIME");

    let sha = std::env::var("GIT_SHA")
        .ok()
        .or_else(git_sha)
        .unwrap_or_else(|| "unknown".to_string());
    let built_at = std::env::var("BUILD_TIME")
        .unwrap_or_else(|_| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

    println!("cargo:rustc-env=GIT_SHA={sha}");
    println!("cargo:rustc-env=BUILD_TIME={built_at}");
}
