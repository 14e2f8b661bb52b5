//! Path Resolver (§4.4): enumerates candidate target paths for an import
//! specifier without touching disk. Existence checks happen in the
//! File-Dependency Analyzer so PR stays deterministic and side-effect-free.

use std::path::{Component, Path, PathBuf};

use depgraph_core::Language;

const RECOGNIZED_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "d.ts", "py", "java", "go", "md", "rs"];

/// All candidate paths for `specifier`, imported from `importing_file`
/// (whose language seeds the preferred-extension order), in the exact
/// order PR would try them.
pub fn candidates(importing_file: &str, specifier: &str, importing_language: Language) -> Vec<String> {
    let base_dir = Path::new(importing_file).parent().unwrap_or_else(|| Path::new(""));
    let joined = normalize(&base_dir.join(specifier));
    let joined_str = to_slash_string(&joined);

    let specifier_ext = Path::new(specifier).extension().and_then(|e| e.to_str());
    if let Some(ext) = specifier_ext {
        if RECOGNIZED_EXTENSIONS.contains(&ext) {
            return vec![joined_str];
        }
    }

    let exts = importing_language.preferred_extensions();
    let mut out = Vec::with_capacity(exts.len() * 2);
    for ext in exts {
        out.push(format!("{}.{}", joined_str, ext));
    }
    for ext in exts {
        out.push(format!("{}/index.{}", joined_str, ext));
    }
    out
}

/// Resolve `.`/`..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn to_slash_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specifier_with_recognized_extension_tries_single_path() {
        let result = candidates("src/App.tsx", "./Button.tsx", Language::TypeScript);
        assert_eq!(result, vec!["src/Button.tsx".to_string()]);
    }

    #[test]
    fn extensionless_specifier_tries_every_preferred_extension_then_index() {
        let result = candidates("src/Test.tsx", "./NonExistentFile", Language::TypeScript);
        assert!(result.contains(&"src/NonExistentFile.tsx".to_string()));
        assert!(result.contains(&"src/NonExistentFile.ts".to_string()));
        assert!(result.contains(&"src/NonExistentFile/index.tsx".to_string()));
    }

    #[test]
    fn parent_dir_components_are_normalized() {
        let result = candidates("src/ui/App.tsx", "../util.ts", Language::TypeScript);
        assert_eq!(result, vec!["src/util.ts".to_string()]);
    }
}
