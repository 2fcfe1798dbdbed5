//! Stamps the matlib-server binary with the identification line logged at
//! startup (`GIT_HASH`, `BUILD_TIMESTAMP`, `BUILD_PROFILE`).
//!
//! Packaged builds made outside a git checkout set `MATLIB_BUILD_ID` to
//! stand in for the commit hash.

use std::process::Command;

const BUILD_ID_ENV: &str = "MATLIB_BUILD_ID";

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    println!("cargo:rerun-if-env-changed={}", BUILD_ID_ENV);
    println!("cargo:rerun-if-changed=../.git/HEAD");

    let build_id = std::env::var(BUILD_ID_ENV)
        .ok()
        .filter(|id| !id.trim().is_empty())
        .or_else(git_short_hash)
        .unwrap_or_else(|| "unknown".to_string());

    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", build_id);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
