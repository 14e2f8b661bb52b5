//! Workspace/monorepo detection and project-name resolution, feeding the
//! `projectName` component of `identifier::create` (§3, §4.1).

use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceType {
    Cargo,
    Npm,
    GoModules,
    Maven,
    Gradle,
}

pub fn detect_workspace(root: &Path) -> Option<WorkspaceType> {
    if root.join("Cargo.toml").exists() {
        Some(WorkspaceType::Cargo)
    } else if root.join("package.json").exists() {
        Some(WorkspaceType::Npm)
    } else if root.join("go.mod").exists() {
        Some(WorkspaceType::GoModules)
    } else if root.join("pom.xml").exists() {
        Some(WorkspaceType::Maven)
    } else if root.join("build.gradle").exists() || root.join("build.gradle.kts").exists() {
        Some(WorkspaceType::Gradle)
    } else {
        None
    }
}

/// The project name to use as `identifier::create`'s `context` argument:
/// `Cargo.toml`'s `[package] name`, `package.json`'s `"name"`, or — when
/// neither manifest declares one — the root directory's basename.
pub fn project_name(root: &Path) -> String {
    if let Some(name) = read_cargo_toml_name(root) {
        return name;
    }
    if let Some(name) = read_package_json_name(root) {
        return name;
    }
    root.file_name().and_then(|n| n.to_str()).unwrap_or("project").to_string()
}

fn read_cargo_toml_name(root: &Path) -> Option<String> {
    let contents = fs::read_to_string(root.join("Cargo.toml")).ok()?;
    let mut in_package_section = false;
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_package_section = trimmed == "[package]";
            continue;
        }
        if in_package_section {
            if let Some(rest) = trimmed.strip_prefix("name") {
                let rest = rest.trim_start();
                if let Some(rest) = rest.strip_prefix('=') {
                    return Some(rest.trim().trim_matches('"').to_string());
                }
            }
        }
    }
    None
}

fn read_package_json_name(root: &Path) -> Option<String> {
    let contents = fs::read_to_string(root.join("package.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
    value.get("name")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn detects_cargo_workspace() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        assert_eq!(detect_workspace(dir.path()), Some(WorkspaceType::Cargo));
        assert_eq!(project_name(dir.path()), "demo");
    }

    #[test]
    fn detects_npm_workspace_and_reads_name() {
        let dir = tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("package.json")).unwrap();
        write!(file, r#"{{"name": "my-app", "version": "1.0.0"}}"#).unwrap();
        assert_eq!(detect_workspace(dir.path()), Some(WorkspaceType::Npm));
        assert_eq!(project_name(dir.path()), "my-app");
    }

    #[test]
    fn falls_back_to_directory_name_with_no_manifest() {
        let dir = tempdir().unwrap();
        let name = project_name(dir.path());
        assert_eq!(name, dir.path().file_name().unwrap().to_str().unwrap());
    }
}
