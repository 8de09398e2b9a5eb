//! Embeds build identification into the binary so the startup banner
//! reports exactly what is running: git revision (with a dirty marker),
//! UTC build time, and cargo profile.

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    let mut revision =
        git(&["rev-parse", "--short=10", "HEAD"]).unwrap_or_else(|| "unreleased".to_string());

    // Mark builds from a modified working tree
    if git(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty()) {
        revision.push_str("-dirty");
    }

    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", revision);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
