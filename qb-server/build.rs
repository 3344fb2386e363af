use std::{env, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=data/sample-query-cache.json");

    let metadata: [(&str, fn() -> String); 3] = [
        ("QB_BUILD_GIT_TAG", git_tag),
        ("QB_BUILD_GIT_COMMIT", git_commit),
        ("QB_BUILD_GIT_DIRTY", git_dirty),
    ];
    for (key, detect) in metadata {
        println!("cargo:rerun-if-env-changed={key}");
        let value = env::var(key).unwrap_or_else(|_| detect());
        println!("cargo:rustc-env={key}={value}");
    }
}

fn git_tag() -> String {
    run_git(&["describe", "--tags", "--exact-match"]).unwrap_or_else(|| "untagged".to_string())
}

fn git_commit() -> String {
    run_git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".to_string())
}

fn git_dirty() -> String {
    let dirty = run_git(&["status", "--porcelain", "--untracked-files=no"])
        .is_some_and(|output| !output.is_empty());
    dirty.to_string()
}

fn run_git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|value| value.trim().to_string())
}
