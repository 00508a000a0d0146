use std::env;
use std::process::Command;

// The plugin loader refuses declarations stamped by a different toolchain, so
// the exact `rustc --version` string is baked into the crate at build time.
fn main() {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=SQLINT_RUSTC_VERSION={version}");
    println!("cargo:rerun-if-changed=build.rs");
}
