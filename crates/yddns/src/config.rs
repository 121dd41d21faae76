//! Configuration file discovery and loading
//!
//! Looks for `config.toml`, `config.json`, `config.yaml` then `config.yml`
//! in each search directory.
//! Named templates come from `templates/*.json` below every search directory
//! (first directory wins per name) and from the config file itself, which
//! overrides both.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use yddns_core::config::APP_NAME;
use yddns_core::{Template, YddnsConfig};

/// Base name of the configuration file
pub const CONFIG_FILE_STEM: &str = "config";

/// Supported configuration file extensions, in lookup order
pub const CONFIG_FILE_EXTENSIONS: &[&str] = &["toml", "json", "yaml", "yml"];

/// Directory below a search directory holding template files
pub const TEMPLATES_DIR_NAME: &str = "templates";

/// A parsed configuration plus where it came from
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: YddnsConfig,
    pub path: Option<PathBuf>,
}

/// Default search directories: `/etc/yddns`, `$HOME/.yddns`, the working directory
pub fn search_dirs() -> Vec<PathBuf> {
    let mut search = vec![PathBuf::from(format!("/etc/{}", APP_NAME))];

    if let Some(home) = dirs::home_dir() {
        search.push(home.join(format!(".{}", APP_NAME)));
    }

    if let Ok(cwd) = std::env::current_dir() {
        search.push(cwd);
    }

    search
}

/// First existing configuration file across `dirs`
pub fn find_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            CONFIG_FILE_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", CONFIG_FILE_STEM, ext)))
        })
        .find(|path| path.is_file())
}

/// Parse a configuration file, picking the format by extension
pub fn parse_config_file(path: &Path) -> Result<YddnsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display())),
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display())),
        Some("yaml" | "yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display())),
        _ => bail!(
            "Unsupported config file format: {} (supported: {})",
            path.display(),
            CONFIG_FILE_EXTENSIONS.join(", ")
        ),
    }
}

/// Load `templates/*.json` below each directory; the first file per name wins
pub fn load_template_files(dirs: &[PathBuf]) -> Result<HashMap<String, Template>> {
    let mut templates = HashMap::new();

    for dir in dirs {
        let templates_dir = dir.join(TEMPLATES_DIR_NAME);
        if !templates_dir.is_dir() {
            continue;
        }

        let entries = fs::read_dir(&templates_dir)
            .with_context(|| format!("Failed to list {}", templates_dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if templates.contains_key(name) {
                continue;
            }

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            let template: Template = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse template {}", path.display()))?;

            debug!("Loaded template \"{}\" from {}", name, path.display());
            templates.insert(name.to_string(), template);
        }
    }

    Ok(templates)
}

/// Load the configuration.
///
/// An explicit path must exist. Without one the search directories are
/// tried in order; `required` decides whether finding nothing is an error
/// or yields an empty configuration.
pub fn load(explicit: Option<&Path>, dirs: &[PathBuf], required: bool) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => find_config_file(dirs),
    };

    let mut config = match &path {
        Some(path) => parse_config_file(path)?,
        None if required => bail!(
            "No {}.{{{}}} found in: {}",
            CONFIG_FILE_STEM,
            CONFIG_FILE_EXTENSIONS.join(","),
            dirs.iter()
                .map(|dir| dir.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        None => YddnsConfig::new(),
    };

    let mut template_dirs = Vec::with_capacity(dirs.len() + 1);
    if let Some(parent) = path.as_deref().and_then(Path::parent) {
        template_dirs.push(parent.to_path_buf());
    }
    template_dirs.extend(dirs.iter().cloned());

    let mut templates = load_template_files(&template_dirs)?;
    templates.extend(config.templates.drain());
    config.templates = templates;

    Ok(LoadedConfig { config, path })
}

/// Cache directory used when the configuration names none
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use yddns_core::Expiry;

    const TOML_CONFIG: &str = r#"
refresh_interval = 300

[cache]
modified_expiry = -1
cache_failures = false

[[domains]]
domain = "home.example.org"
username = "foo"
password = "bar"
refresh_url = ":dyndns"

[[domains]]
domain = "v6.example.org"
refresh_url = "https://dyn.example/?h=<domain>&ip=<ip6>"
ip6_host_id = "::1"

[templates.dyndns]
host = "members.dyndns.example"
refresh_url = "<protocol>://<host>/nic/update?hostname=<domain>&myip=<ip4>"
"#;

    #[test]
    fn test_parse_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, TOML_CONFIG).unwrap();

        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.refresh_interval, 300);
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.domains[0].domain_name, "home.example.org");
        assert_eq!(config.domains[0].template.refresh_url, ":dyndns");
        assert_eq!(config.domains[1].ip6_host_id, "::1");
        assert_eq!(config.cache.modified_expiry, Expiry::Never);
        assert_eq!(config.cache.created_expiry, Expiry::Seconds(86_400));
        assert!(!config.cache.cache_failures);
        assert!(config.templates.contains_key("dyndns"));
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_json_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"domains": [{"domain": "a.example.org", "refresh_url": "https://x/<domain>"}]}"#,
        )
        .unwrap();

        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.refresh_interval, 600);
        assert_eq!(config.domains[0].template.refresh_url, "https://x/<domain>");
    }

    #[test]
    fn test_parse_yaml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            r#"
refresh_interval: 120
cache:
  modified_expiry: -1
domains:
  - domain: a.example.org
    refresh_url: ":dyndns"
    username: foo
    password: bar
templates:
  dyndns:
    host: members.dyndns.example
    refresh_url: "<protocol>://<host>/nic/update?hostname=<domain>"
"#,
        )
        .unwrap();

        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.refresh_interval, 120);
        assert_eq!(config.domains[0].domain_name, "a.example.org");
        assert_eq!(config.domains[0].password, "bar");
        assert_eq!(config.cache.modified_expiry, Expiry::Never);
        assert_eq!(config.templates["dyndns"].host, "members.dyndns.example");
        config.validate().unwrap();
    }

    #[test]
    fn test_json_preferred_over_yaml() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "domains: []").unwrap();
        fs::write(dir.path().join("config.json"), "{}").unwrap();

        assert_eq!(
            find_config_file(&[dir.path().to_path_buf()]).unwrap(),
            dir.path().join("config.json")
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "domains = []").unwrap();

        let err = parse_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported config file format"));
    }

    #[test]
    fn test_toml_preferred_over_json() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(first.path().join("config.json"), "{}").unwrap();
        fs::write(first.path().join("config.toml"), "").unwrap();
        fs::write(second.path().join("config.toml"), "").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            find_config_file(&dirs).unwrap(),
            first.path().join("config.toml")
        );
    }

    #[test]
    fn test_config_templates_override_template_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), TOML_CONFIG).unwrap();

        let templates_dir = dir.path().join(TEMPLATES_DIR_NAME);
        fs::create_dir(&templates_dir).unwrap();
        fs::write(
            templates_dir.join("dyndns.json"),
            r#"{"host": "from-file.example", "refresh_url": "https://from-file/<domain>"}"#,
        )
        .unwrap();
        fs::write(
            templates_dir.join("other.json"),
            r#"{"refresh_url": "https://other/<domain>", "auth_method": "bearer"}"#,
        )
        .unwrap();
        fs::write(templates_dir.join("notes.txt"), "ignored").unwrap();

        let loaded = load(None, &[dir.path().to_path_buf()], true).unwrap();
        let templates = &loaded.config.templates;

        assert_eq!(templates.len(), 2);
        assert_eq!(templates["dyndns"].host, "members.dyndns.example");
        assert_eq!(templates["other"].auth_method, "bearer");
        assert_eq!(loaded.path.unwrap(), dir.path().join("config.toml"));
    }

    #[test]
    fn test_first_template_directory_wins() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        for (dir, host) in [(&first, "first.example"), (&second, "second.example")] {
            let templates_dir = dir.path().join(TEMPLATES_DIR_NAME);
            fs::create_dir(&templates_dir).unwrap();
            fs::write(
                templates_dir.join("shared.json"),
                format!(r#"{{"host": "{}"}}"#, host),
            )
            .unwrap();
        }

        let templates =
            load_template_files(&[first.path().to_path_buf(), second.path().to_path_buf()])
                .unwrap();
        assert_eq!(templates["shared"].host, "first.example");
    }

    #[test]
    fn test_missing_config() {
        let dir = tempdir().unwrap();
        let dirs = vec![dir.path().to_path_buf()];

        assert!(load(None, &dirs, true).is_err());
        assert!(load(Some(dir.path().join("nope.toml").as_path()), &dirs, false).is_err());

        let loaded = load(None, &dirs, false).unwrap();
        assert!(loaded.path.is_none());
        assert!(loaded.config.domains.is_empty());
    }

    #[test]
    fn test_default_cache_dir_ends_with_app_name() {
        assert!(default_cache_dir().ends_with(APP_NAME));
    }
}
