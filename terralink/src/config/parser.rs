//! INI parsing: `Ini` → `ConfigFile`.
//!
//! The single place where INI key names map to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::defaults::{MAX_CACHE_SIZE, MAX_SPACING_M};
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::grid::TileLayout;
use crate::sync::SamplePolicy;

/// Parse an `Ini` into a `ConfigFile`, overlaying values on the defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [terrain] section
    if let Some(section) = ini.section(Some("terrain")) {
        if let Some(v) = section.get("enabled") {
            config.terrain.enabled = parse_bool(v);
        }
        if let Some(v) = section.get("spacing") {
            let spacing: u16 = parse_number("terrain", "spacing", v, "must be a positive integer (meters)")?;
            if spacing == 0 || spacing > MAX_SPACING_M {
                return Err(invalid(
                    "terrain",
                    "spacing",
                    v,
                    format!("must be between 1 and {}", MAX_SPACING_M),
                ));
            }
            config.terrain.spacing = spacing;
        }
        if let Some(v) = section.get("cache_size") {
            let size: usize = parse_number("terrain", "cache_size", v, "must be a positive integer")?;
            if size == 0 || size > MAX_CACHE_SIZE {
                return Err(invalid(
                    "terrain",
                    "cache_size",
                    v,
                    format!("must be between 1 and {}", MAX_CACHE_SIZE),
                ));
            }
            config.terrain.cache_size = size;
        }
        if let Some(v) = section.get("fragments_x") {
            config.terrain.fragments_x =
                parse_number("terrain", "fragments_x", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("fragments_y") {
            config.terrain.fragments_y =
                parse_number("terrain", "fragments_y", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("request_interval_ms") {
            config.terrain.request_interval_ms = parse_number(
                "terrain",
                "request_interval_ms",
                v,
                "must be a positive integer (milliseconds)",
            )?;
        }

        let (x, y) = (config.terrain.fragments_x, config.terrain.fragments_y);
        if let Err(e) = TileLayout::new(x, y) {
            return Err(invalid("terrain", "fragments_x", &format!("{}x{}", x, y), e.to_string()));
        }
    }

    // [ingest] section
    if let Some(section) = ini.section(Some("ingest")) {
        if let Some(v) = section.get("sample_policy") {
            config.ingest.sample_policy = v
                .parse::<SamplePolicy>()
                .map_err(|_| invalid("ingest", "sample_policy", v, "must be 'reject', 'clamp', or 'accept'"))?;
        }
        if let Some(v) = section.get("min_elevation") {
            config.ingest.min_elevation =
                parse_number("ingest", "min_elevation", v, "must be an integer 0-65535 (meters)")?;
        }
        if let Some(v) = section.get("max_elevation") {
            config.ingest.max_elevation =
                parse_number("ingest", "max_elevation", v, "must be an integer 0-65535 (meters)")?;
        }
        if config.ingest.min_elevation > config.ingest.max_elevation {
            return Err(invalid(
                "ingest",
                "min_elevation",
                &config.ingest.min_elevation.to_string(),
                format!("must not exceed max_elevation ({})", config.ingest.max_elevation),
            ));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    // [simulation] section
    if let Some(section) = ini.section(Some("simulation")) {
        parse_simulation(section, &mut config)?;
    }

    Ok(config)
}

fn parse_simulation(section: &Properties, config: &mut ConfigFile) -> Result<(), ConfigFileError> {
    if let Some(v) = section.get("tick_ms") {
        let tick: u64 = parse_number("simulation", "tick_ms", v, "must be a positive integer (milliseconds)")?;
        if tick == 0 {
            return Err(invalid("simulation", "tick_ms", v, "must be at least 1"));
        }
        config.simulation.tick_ms = tick;
    }
    if let Some(v) = section.get("link_capacity") {
        config.simulation.link_capacity =
            parse_number("simulation", "link_capacity", v, "must be a positive integer (bytes)")?;
    }
    if let Some(v) = section.get("drop_every") {
        config.simulation.drop_every = parse_number(
            "simulation",
            "drop_every",
            v,
            "must be a non-negative integer (0 disables dropping)",
        )?;
    }
    Ok(())
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Parse a boolean: true/yes/on/1 are true, anything else false.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to the home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    fn invalid_key(result: Result<ConfigFile, ConfigFileError>) -> String {
        match result {
            Err(ConfigFileError::InvalidValue { section, key, .. }) => format!("{}.{}", section, key),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[terrain]
spacing = 30
request_interval_ms = 500

[ingest]
sample_policy = Clamp
"#,
        )
        .unwrap();

        assert_eq!(config.terrain.spacing, 30);
        assert_eq!(config.terrain.request_interval_ms, 500);
        assert_eq!(config.ingest.sample_policy, SamplePolicy::Clamp);

        let defaults = ConfigFile::default();
        assert_eq!(config.terrain.cache_size, defaults.terrain.cache_size);
        assert_eq!(config.ingest.max_elevation, defaults.ingest.max_elevation);
        assert_eq!(config.simulation, defaults.simulation);
    }

    #[test]
    fn test_custom_layout() {
        let config = load("[terrain]\nfragments_x = 4\nfragments_y = 6\n").unwrap();
        let layout = config.layout().unwrap();
        assert_eq!(layout.fragment_count(), 24);
    }

    #[test]
    fn test_oversized_layout_rejected() {
        let result = load("[terrain]\nfragments_x = 8\nfragments_y = 8\n");
        assert_eq!(invalid_key(result), "terrain.fragments_x");
    }

    #[test]
    fn test_zero_spacing_rejected() {
        assert_eq!(invalid_key(load("[terrain]\nspacing = 0\n")), "terrain.spacing");
    }

    #[test]
    fn test_non_numeric_cache_size_rejected() {
        assert_eq!(
            invalid_key(load("[terrain]\ncache_size = lots\n")),
            "terrain.cache_size"
        );
    }

    #[test]
    fn test_unknown_sample_policy_rejected() {
        assert_eq!(
            invalid_key(load("[ingest]\nsample_policy = ignore\n")),
            "ingest.sample_policy"
        );
    }

    #[test]
    fn test_inverted_elevation_band_rejected() {
        let result = load("[ingest]\nmin_elevation = 500\nmax_elevation = 100\n");
        assert_eq!(invalid_key(result), "ingest.min_elevation");
    }

    #[test]
    fn test_elevation_out_of_u16_rejected() {
        assert_eq!(
            invalid_key(load("[ingest]\nmax_elevation = 70000\n")),
            "ingest.max_elevation"
        );
    }

    #[test]
    fn test_zero_tick_rejected() {
        assert_eq!(invalid_key(load("[simulation]\ntick_ms = 0\n")), "simulation.tick_ms");
    }

    #[test]
    fn test_simulation_settings() {
        let config = load("[simulation]\ntick_ms = 50\nlink_capacity = 100\ndrop_every = 7\n").unwrap();
        assert_eq!(config.simulation.tick_ms, 50);
        assert_eq!(config.simulation.link_capacity, 100);
        assert_eq!(config.simulation.drop_every, 7);
    }

    #[test]
    fn test_disabled_terrain() {
        let config = load("[terrain]\nenabled = no\n").unwrap();
        assert!(!config.terrain.enabled);
    }

    #[test]
    fn test_parse_bool_values() {
        for v in ["true", "TRUE", "yes", "On", "1", "  true  "] {
            assert!(parse_bool(v), "{} should be true", v);
        }
        for v in ["false", "no", "off", "0", "", "maybe"] {
            assert!(!parse_bool(v), "{} should be false", v);
        }
    }

    #[test]
    fn test_expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/var/log/t.log"), PathBuf::from("/var/log/t.log"));
    }
}
