//! TOML loading for the task catalog.
//!
//! Provides two loading methods:
//! - `default_catalog()` - Loads the checklist compiled into the binary
//! - `load_catalog(path)` - Loads a custom checklist from a file path

use anyhow::{Context, Result};
use std::path::Path;

use super::types::{CatalogFile, TaskCatalog};

/// Default checklist embedded in the binary at compile time.
/// Loaded from `config/tasks.toml`.
const DEFAULT_TASKS: &str = include_str!("../../config/tasks.toml");

/// Load and validate a catalog from a TOML file.
///
/// # Returns
/// * `Ok(TaskCatalog)` - Parsed, validated, order-sorted catalog
/// * `Err` - If the file cannot be read, is not valid TOML, or fails validation
pub fn load_catalog(path: &Path) -> Result<TaskCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {:?}", path))?;
    parse_catalog(&content).with_context(|| format!("Invalid catalog {:?}", path))
}

/// Get the default catalog embedded in the binary.
///
/// Six tasks: trash, bed, bath, sink, floor, amen (final check).
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_catalog() -> TaskCatalog {
    parse_catalog(DEFAULT_TASKS).expect("embedded tasks.toml must be a valid catalog")
}

fn parse_catalog(content: &str) -> Result<TaskCatalog> {
    let file: CatalogFile = toml::from_str(content)?;
    Ok(TaskCatalog::new(file.tasks)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_catalog_loads() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 6);

        let ids: Vec<&str> = catalog.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["trash", "bed", "bath", "sink", "floor", "amen"]);
        assert_eq!(catalog.max_score(), 100);
    }

    #[test]
    fn test_default_catalog_has_advice() {
        for task in default_catalog().tasks() {
            assert!(!task.label.is_empty(), "label missing for {}", task.id);
            assert!(!task.advice.is_empty(), "advice missing for {}", task.id);
        }
    }

    #[test]
    fn test_load_catalog_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.toml");
        std::fs::write(
            &path,
            r#"
[[tasks]]
id = "bed"
label = "Bed"
order = 2
weight = 30
advice = "No wrinkles."

[[tasks]]
id = "trash"
label = "Trash"
order = 1
weight = 10
advice = "Empty bins."
"#,
        )
        .unwrap();

        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.tasks()[0].id, "trash");
        assert_eq!(catalog.max_score(), 40);
    }

    #[test]
    fn test_load_catalog_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.toml");
        std::fs::write(
            &path,
            r#"
[[tasks]]
id = "bed"
label = "Bed"
order = 1
weight = 30
advice = ""

[[tasks]]
id = "bed"
label = "Bed again"
order = 2
weight = 10
advice = ""
"#,
        )
        .unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("duplicate task id"));
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let result = load_catalog(Path::new("/nonexistent/tasks.toml"));
        assert!(result.is_err());
    }
}
