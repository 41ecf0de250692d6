use anyhow::{Context, Result};
use chrono::TimeZone;
use std::env;
use std::fs;
use std::process::Command;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<()> {
    // Generate git information
    let gitcl = GitclBuilder::default()
        .describe(true, true, Some("[0-9]*"))
        .build()?;

    let gitcl_res = Emitter::default()
        .idempotent()
        .fail_on_error()
        .add_instructions(&gitcl)
        .and_then(|emitter| emitter.emit());

    if let Err(e) = gitcl_res {
        eprintln!("error occurred while generating instructions: {e:?}");
        // Without fail_on_error vergen emits placeholder values instead.
        Emitter::default()
            .idempotent()
            .add_instructions(&gitcl)?
            .emit()?;
    }

    // Add build timestamp
    let now = match env::var("SOURCE_DATE_EPOCH") {
        Ok(val) => {
            let secs = val
                .parse::<i64>()
                .context("SOURCE_DATE_EPOCH is not an integer")?;
            chrono::Utc
                .timestamp_opt(secs, 0)
                .single()
                .context("SOURCE_DATE_EPOCH is out of range")?
        }
        Err(_) => chrono::Utc::now(),
    };

    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let lib_version = get_lib_version_from_metadata().unwrap_or_else(|_| {
        read_lib_version_fallback().unwrap_or_else(|_| "unknown".to_string())
    });
    println!("cargo:rustc-env=OGGTIMELINE_VERSION={lib_version}");

    println!("cargo:rerun-if-changed=oggtimeline/Cargo.toml");

    Ok(())
}

/// Get the oggtimeline version using cargo metadata (works with published
/// and local dependencies)
fn get_lib_version_from_metadata() -> Result<String> {
    let output = Command::new("cargo")
        .args(["metadata", "--format-version", "1"])
        .output()?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed");
    }

    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    // Workspace members first (local development)
    if let Some(packages) = metadata["packages"].as_array() {
        for package in packages {
            if package["name"].as_str() == Some("oggtimeline") {
                if let Some(version) = package["version"].as_str() {
                    return Ok(version.to_string());
                }
            }
        }
    }

    // Then the dependency graph, for a published oggtimeline
    if let Some(nodes) = metadata["resolve"]["nodes"].as_array() {
        for node in nodes {
            // "oggtimeline 0.3.0 (registry+...)"
            let Some(rest) = node["id"].as_str().and_then(|id| id.strip_prefix("oggtimeline "))
            else {
                continue;
            };
            if let Some(version) = rest.split(' ').next() {
                return Ok(version.to_string());
            }
        }
    }

    anyhow::bail!("oggtimeline package not found in metadata");
}

/// Fallback: manually parse oggtimeline/Cargo.toml
fn read_lib_version_fallback() -> Result<String> {
    let toml_content = fs::read_to_string("oggtimeline/Cargo.toml")?;

    for line in toml_content.lines() {
        let line = line.trim();
        if line.starts_with("version") {
            if let Some((_, value)) = line.split_once('=') {
                let version = value.trim().trim_matches('"').trim_matches('\'');
                return Ok(version.to_string());
            }
        }
    }

    anyhow::bail!("Could not find version in oggtimeline/Cargo.toml");
}
