use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Top-level runtime configuration, loaded from a YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    pub service: ServiceOptions,
    #[serde(default)]
    pub downloads: DownloadOptions,
}

/// Where and how to reach the effect service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServiceOptions {
    /// Base URL of the effect service, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Client-imposed timeout for each effect request. An elapsed timeout
    /// surfaces as a retryable transport failure.
    #[serde(
        default = "ServiceOptions::default_request_timeout",
        with = "humantime_serde"
    )]
    pub request_timeout: Duration,
}

impl ServiceOptions {
    fn default_request_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DownloadOptions {
    /// Directory where committed artifacts are saved. Created on first use.
    pub directory: PathBuf,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("downloads"),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: Configuration = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validated(self) -> Result<Self> {
        let base_url = self.service.base_url.trim();
        ensure!(!base_url.is_empty(), "service.base-url must not be empty");
        ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "service.base-url must start with http:// or https://"
        );
        ensure!(
            self.service.request_timeout > Duration::ZERO,
            "service.request-timeout must be positive"
        );
        ensure!(
            !self.downloads.directory.as_os_str().is_empty(),
            "downloads.directory must not be empty"
        );
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let yaml = "service:\n  base-url: http://localhost:8000\n";
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        let cfg = cfg.validated().unwrap();
        assert_eq!(cfg.service.base_url, "http://localhost:8000");
        assert_eq!(cfg.service.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.downloads.directory, PathBuf::from("downloads"));
    }

    #[test]
    fn parses_humantime_timeout() {
        let yaml = concat!(
            "service:\n",
            "  base-url: http://localhost:8000\n",
            "  request-timeout: 2s\n",
            "downloads:\n",
            "  directory: /tmp/lensify\n",
        );
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.service.request_timeout, Duration::from_secs(2));
        assert_eq!(cfg.downloads.directory, PathBuf::from("/tmp/lensify"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = "service:\n  base-url: http://localhost:8000\n  retries: 3\n";
        assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let yaml = concat!(
            "service:\n",
            "  base-url: http://localhost:8000\n",
            "  request-timeout: 0s\n",
        );
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validated().is_err());
    }

    #[test]
    fn rejects_non_http_base_url() {
        let yaml = "service:\n  base-url: localhost:8000\n";
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validated().is_err());
    }
}
