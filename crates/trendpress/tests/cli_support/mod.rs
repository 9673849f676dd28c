#![allow(dead_code)]

use serde::de::DeserializeOwned;
use std::path::Path;
use std::process::{Command, Output};

pub fn run_cli(args: &[&str], home: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trendpress"))
        .args(args)
        .env("TRENDPRESS_HOME", home)
        .env_remove("TRENDPRESS_CONFIG")
        .env("RUST_LOG", "error")
        .output()
        .expect("failed to run trendpress binary")
}

pub fn assert_cli_success(output: &Output, args: &[&str]) {
    assert!(
        output.status.success(),
        "trendpress {:?} failed\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn run_cli_json<T: DeserializeOwned>(args: &[&str], home: &Path) -> T {
    let output = run_cli(args, home);
    assert_cli_success(&output, args);
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "invalid JSON from trendpress {:?}: {}\n{}",
            args,
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}
