//! Build script for tvdash-server
//!
//! Exposes `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE` to the crate for the
//! startup log line and `/build_info`.
//!
//! Source tarballs have no `.git`; packagers set `TVDASH_GIT_HASH` instead.

use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Run git in the crate directory, `None` when git is missing or fails
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

/// Short commit hash, suffixed with `-dirty` when the work tree has local changes
fn git_hash() -> String {
    if let Ok(hash) = std::env::var("TVDASH_GIT_HASH") {
        if !hash.trim().is_empty() {
            return hash.trim().to_string();
        }
    }

    let Some(hash) = git(&["rev-parse", "--short=8", "HEAD"]) else {
        return UNKNOWN.to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(status) if !status.is_empty() => format!("{}-dirty", hash),
        _ => hash,
    }
}

fn main() {
    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash());
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);

    // Any rerun-if directive would stop the per-build refresh of the timestamp
}
