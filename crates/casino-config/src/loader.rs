//! Multi-file configuration loading.
//!
//! Follows `include` directives from the entry file and merges the included
//! tables into one document, rejecting sections defined twice and files
//! included more than once.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub struct ConfigLoader {
	/// Directory relative includes are resolved against.
	base_path: PathBuf,
	loaded_files: HashSet<PathBuf>,
	/// Section name to the file that defined it.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads `config_path` and everything it includes into a validated
	/// [`Config`].
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let config_path = self.resolve_path(config_path)?;
		let content = self.load_file(&config_path).await?;
		let mut document: toml::Value = toml::from_str(&content)?;

		let includes = extract_includes(&document)?;
		if includes.is_empty() {
			return content.parse();
		}

		if let Some(table) = document.as_table_mut() {
			table.remove("include");
			for key in table.keys() {
				self.section_sources.insert(key.clone(), config_path.clone());
			}
		}

		for include in includes {
			let include_path = self.resolve_path(&include)?;
			let include_content = self.load_file(&include_path).await?;
			let include_doc: toml::Value = toml::from_str(&include_content)?;
			self.merge(&mut document, include_doc, &include_path)?;
		}

		let combined = toml::to_string(&document).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		combined.parse()
	}

	fn merge(
		&mut self,
		document: &mut toml::Value,
		include: toml::Value,
		source: &Path,
	) -> Result<(), ConfigError> {
		let toml::Value::Table(include_table) = include else {
			return Ok(());
		};
		let Some(table) = document.as_table_mut() else {
			return Err(ConfigError::Parse("Configuration root must be a table".into()));
		};

		for (key, value) in include_table {
			if let Some(existing) = self.section_sources.get(&key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}",
					key,
					existing.display(),
					source.display()
				)));
			}
			self.section_sources.insert(key.clone(), source.to_path_buf());
			table.insert(key, value);
		}
		Ok(())
	}

	async fn load_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}
		Ok(resolved)
	}
}

/// Reads `include` as a string or an array of strings.
fn extract_includes(document: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match document.get("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.iter()
			.map(|item| {
				item.as_str().map(PathBuf::from).ok_or_else(|| {
					ConfigError::Validation("Include array must contain only strings".into())
				})
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}
