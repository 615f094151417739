//! Prompt loader - load template overrides from a directory.
//!
//! Template files are `<name>.md` under the templates directory. Loaded
//! content is cached in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Result, SceneforgeError};

/// Loads and caches prompt templates from a directory
pub struct PromptLoader {
    templates_dir: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl PromptLoader {
    /// Create a new PromptLoader with the given templates directory
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        Self {
            templates_dir: templates_dir.as_ref().to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Load a template from disk and cache it
    pub fn load(&self, name: &str) -> Result<String> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|e| SceneforgeError::Template(format!("lock poisoned: {}", e)))?;
            if let Some(content) = cache.get(name) {
                return Ok(content.clone());
            }
        }

        let path = self.template_path(name);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            SceneforgeError::Template(format!(
                "failed to load template '{}' from {:?}: {}",
                name, path, e
            ))
        })?;

        let mut cache = self
            .cache
            .write()
            .map_err(|e| SceneforgeError::Template(format!("lock poisoned: {}", e)))?;
        cache.insert(name.to_string(), content.clone());

        Ok(content)
    }

    /// Check if a template override exists on disk
    pub fn exists(&self, name: &str) -> bool {
        self.template_path(name).exists()
    }

    fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.md", name))
    }

    /// List all available template overrides in the directory
    pub fn list_available(&self) -> Result<Vec<String>> {
        if !self.templates_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.templates_dir)?;
        let mut templates = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    templates.push(name.to_string());
                }
            }
        }

        templates.sort();
        Ok(templates)
    }
}
