//! Embeds the package version plus the git commit, when available, as
//! `PASSAGE_VERSION`.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let pkg = env!("CARGO_PKG_VERSION");
    let version = match git_commit() {
        Some(commit) => format!("{pkg} ({commit})"),
        None => pkg.to_string(),
    };

    println!("cargo:rustc-env=PASSAGE_VERSION={version}");
}

fn git_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let commit = String::from_utf8(output.stdout).ok()?;
    let commit = commit.trim();
    if commit.is_empty() {
        return None;
    }

    let dirty = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=no"])
        .output()
        .ok()
        .is_some_and(|o| o.status.success() && !o.stdout.is_empty());

    Some(if dirty {
        format!("{commit}-dirty")
    } else {
        commit.to_string()
    })
}
