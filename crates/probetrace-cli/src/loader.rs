//! Class file discovery, loading and writing.
//!
//! A class file is one JSON-serialized [`Class`]. Modules are laid out as
//! `<module>/target/classes/*.json` (product) and
//! `<module>/target/test-classes/*.json` (tests).

use crate::commands::OutputMode;
use crate::error::{CliError, CliResult};
use probetrace::ir::display::render_class;
use probetrace::{Class, InstrumentConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Product class directory of a module
pub const PRODUCT_CLASSES: &str = "target/classes";

/// Test class directory of a module
pub const TEST_CLASSES: &str = "target/test-classes";

/// Subdirectories of `project` holding both `src/` and `target/`, sorted;
/// the project itself when there are none
pub fn discover_modules(project: &Path) -> CliResult<Vec<PathBuf>> {
    if !project.is_dir() {
        return Err(CliError::invalid_argument(format!(
            "project directory {} does not exist",
            project.display()
        )));
    }
    let mut modules = Vec::new();
    for entry in fs::read_dir(project)? {
        let path = entry?.path();
        if path.join("src").is_dir() && path.join("target").is_dir() {
            modules.push(path);
        }
    }
    modules.sort();
    if modules.is_empty() {
        modules.push(project.to_path_buf());
    }
    Ok(modules)
}

/// Load every `*.json` class in `dir`, in file-name order. A missing
/// directory holds no classes.
pub fn load_classes(dir: &Path) -> CliResult<Vec<Class>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no class directory");
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut classes = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path)?;
        let class: Class = serde_json::from_str(&text)
            .map_err(|e| CliError::class_load(path.display().to_string(), e.to_string()))?;
        debug!(class = %class.name, methods = class.methods.len(), "class loaded");
        classes.push(class);
    }
    Ok(classes)
}

/// Write `classes` into `dir` as `<class name>.<ext>`; returns the count
pub fn write_classes(dir: &Path, classes: &[Class], mode: OutputMode) -> CliResult<usize> {
    if classes.is_empty() {
        return Ok(0);
    }
    fs::create_dir_all(dir)?;
    for class in classes {
        let contents = match mode {
            OutputMode::Text => render_class(class),
            OutputMode::Binary => serde_json::to_string_pretty(class)?,
        };
        let path = dir.join(format!("{}.{}", class.name, mode.extension()));
        fs::write(&path, contents)?;
    }
    Ok(classes.len())
}

/// Instrumentation settings from a JSON file, or the defaults
pub fn load_instrument_config(path: Option<&Path>) -> CliResult<InstrumentConfig> {
    let Some(path) = path else {
        return Ok(InstrumentConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| {
        CliError::config(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::config(format!("invalid settings in {}: {e}", path.display())))
}
