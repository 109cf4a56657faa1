use anyhow::Context;
use serde::Deserialize;

/// Dependencies each library crate must never declare. The schema crate stays
/// free of gameplay types and binary-only plumbing.
const FORBIDDEN: &[(&str, &[&str])] = &[
    (
        "multiverse-schema",
        &[
            "multiverse-components",
            "multiverse-devtools",
            "anyhow",
            "clap",
            "tracing-subscriber",
            "dotenvy",
        ],
    ),
    (
        "multiverse-components",
        &["multiverse-devtools", "anyhow", "clap", "tracing-subscriber", "dotenvy"],
    ),
];

#[derive(Debug, Deserialize)]
struct Metadata {
    packages: Vec<Package>,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
struct Dependency {
    name: String,
    /// `null` for normal dependencies, "dev" or "build" otherwise
    kind: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("arch-check") => arch_check(),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  arch-check"),
    }
}

fn arch_check() -> anyhow::Result<()> {
    let output = std::process::Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed")
    }

    let metadata: Metadata =
        serde_json::from_slice(&output.stdout).context("parsing cargo metadata")?;
    let violations = violations(&metadata);
    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("arch-check: {violation}");
        }
        anyhow::bail!("{} layering violation(s)", violations.len());
    }

    println!("arch-check: ok ({} packages)", metadata.packages.len());
    Ok(())
}

fn violations(metadata: &Metadata) -> Vec<String> {
    let mut found = Vec::new();
    for (crate_name, forbidden) in FORBIDDEN {
        let Some(package) = metadata.packages.iter().find(|p| p.name == *crate_name) else {
            found.push(format!("{crate_name} is missing from the workspace"));
            continue;
        };
        for dep in &package.dependencies {
            if dep.kind.is_none() && forbidden.contains(&dep.name.as_str()) {
                found.push(format!("{crate_name} must not depend on {}", dep.name));
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(json: &str) -> Metadata {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn dev_dependencies_are_allowed() {
        let m = metadata(
            r#"{"packages": [
                {"name": "multiverse-schema", "dependencies": [
                    {"name": "serde", "kind": null},
                    {"name": "anyhow", "kind": "dev"}
                ]},
                {"name": "multiverse-components", "dependencies": [
                    {"name": "multiverse-schema", "kind": null}
                ]}
            ]}"#,
        );
        assert!(violations(&m).is_empty());
    }

    #[test]
    fn upward_dependency_is_reported() {
        let m = metadata(
            r#"{"packages": [
                {"name": "multiverse-schema", "dependencies": [
                    {"name": "multiverse-components", "kind": null}
                ]},
                {"name": "multiverse-components", "dependencies": []}
            ]}"#,
        );
        assert_eq!(
            violations(&m),
            ["multiverse-schema must not depend on multiverse-components"]
        );
    }
}
