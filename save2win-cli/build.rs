use std::path::Path;
use std::process::Command;

const SHA_VAR: &str = "SAVE2WIN_BUILD_SHA";

/// Image builds have no `.git`, so CI may pass the revision in directly.
fn sha_from_env() -> Option<String> {
    std::env::var(SHA_VAR).ok().filter(|s| !s.trim().is_empty())
}

fn sha_from_git(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8(out.stdout).ok()?;
    let sha = sha.trim();
    (!sha.is_empty()).then(|| sha.to_owned())
}

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
    let workspace = Path::new(&manifest_dir).join("..");

    println!("cargo:rerun-if-env-changed={SHA_VAR}");
    let head = workspace.join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let sha = sha_from_env()
        .or_else(|| sha_from_git(&workspace))
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env={SHA_VAR}={sha}");
}
