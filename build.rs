// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=CAMERA_SETTINGS_VERSION");

    // Packagers may pin the version explicitly
    let version = std::env::var("CAMERA_SETTINGS_VERSION").unwrap_or_else(|_| git_version());
    println!("cargo::rustc-env=GIT_VERSION={version}");
}

/// "1.2.0" at a tag, "1.2.0-3-gabc1234" after it, the package version without git
fn git_version() -> String {
    git(&["describe", "--tags", "--always", "--match", "v*"])
        .map(|v| v.strip_prefix('v').map(str::to_string).unwrap_or(v))
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
