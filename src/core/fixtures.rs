//! Test fixtures: recipe trees on disk.

use super::types::{RecipeType, Runtime};
use std::path::{Path, PathBuf};

/// A minimal valid descriptor; `extra` is appended inside the front matter.
pub(crate) fn descriptor(name: &str, recipe_type: RecipeType, runtime: Runtime, extra: &str) -> String {
    format!(
        "---\nname: {name}\ntype: {recipe_type}\nruntime: {runtime}\nversion: \"1.0\"\n\
         description: \"{name} test recipe\"\nuse_cases: [\"testing\"]\n\
         output_targets: [stdout, file]\n{extra}---\n# {name}\n"
    )
}

/// Write `<root>/<subdir>/<name>.<ext>` plus its descriptor. Shell scripts
/// are made executable.
pub(crate) fn write_recipe(
    root: &Path,
    subdir: &str,
    name: &str,
    recipe_type: RecipeType,
    runtime: Runtime,
    extra: &str,
    script: &str,
) -> PathBuf {
    let dir = root.join(subdir);
    std::fs::create_dir_all(&dir).unwrap();
    let script_path = dir.join(format!("{}.{}", name, runtime.script_extension()));
    std::fs::write(&script_path, script).unwrap();
    if runtime == Runtime::Shell {
        set_mode(&script_path, 0o755);
    }
    std::fs::write(
        dir.join(format!("{}.md", name)),
        descriptor(name, recipe_type, runtime, extra),
    )
    .unwrap();
    script_path
}

/// Shorthand for an atomic shell recipe under `atomic/system`.
pub(crate) fn shell_recipe(root: &Path, name: &str, extra: &str, body: &str) -> PathBuf {
    write_recipe(
        root,
        "atomic/system",
        name,
        RecipeType::Atomic,
        Runtime::Shell,
        extra,
        &format!("#!/bin/sh\n{}\n", body),
    )
}

#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &Path, _mode: u32) {}
