mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./recverify.toml",
        "~/.config/recverify/config.toml",
        "/etc/recverify/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.batch.workers == Some(0) {
        anyhow::bail!("batch.workers cannot be 0 (leave it unset to use one worker per CPU)");
    }

    for warning in config.reconcile.validate() {
        tracing::warn!("reconcile: {}", warning);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_core::{AlignKey, GapPolicy, StreamKind};
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_gives_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.reconcile, rv_core::ReconcileConfig::default());
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.output.pretty);
        assert_eq!(config.batch.workers, None);
    }

    #[test]
    fn full_file_round_trip() {
        let file = write_config(
            r#"
[reconcile]
align_key = "segment_hash"
gap_policy = "append"
required_streams = ["video"]
tail_exemption = false

[batch]
workers = 3

[output]
format = "json"
pretty = false
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.reconcile.align_key, AlignKey::SegmentHash);
        assert_eq!(config.reconcile.gap_policy, GapPolicy::Append);
        assert_eq!(config.reconcile.required_streams, vec![StreamKind::Video]);
        assert!(!config.reconcile.tail_exemption);
        assert_eq!(config.batch.effective_workers(), 3);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.pretty);
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let file = write_config("[reconcile]\ngap_policy = \"sometimes\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/recverify.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let file = write_config("[batch]\nworkers = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("batch.workers cannot be 0"));
    }

    #[test]
    fn unset_workers_means_all_cpus() {
        assert_eq!(BatchConfig::default().effective_workers(), num_cpus::get());
    }
}
