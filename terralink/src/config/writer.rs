//! INI serialization: `ConfigFile` → commented INI string.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to the commented INI text written to config.ini.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let enabled = if config.terrain.enabled { "true" } else { "false" };

    format!(
        r#"[terrain]
; Master switch for terrain requests and reports
enabled = {}
; Distance between elevation samples in meters (default: 100)
spacing = {}
; Number of tiles kept in memory (default: 12)
cache_size = {}
; Fragments per tile, north x east (default: 7 x 8, at most 56 in total)
; Each fragment is 4 x 4 samples. Must match the ground station.
fragments_x = {}
fragments_y = {}
; Minimum milliseconds between two tile requests (default: 2000)
request_interval_ms = {}

[ingest]
; What to do with fragments holding implausible elevations:
;   reject - discard the whole fragment (recommended)
;   clamp  - clamp samples into [min_elevation, max_elevation]
;   accept - store samples unchanged
sample_policy = {}
; Plausible elevation band in meters (default: 1 - 20000)
min_elevation = {}
max_elevation = {}

[logging]
; Log file, truncated on every start
file = {}

[simulation]
; Milliseconds between scheduler ticks in `terralink simulate` (default: 200)
tick_ms = {}
; Outbound bytes the simulated link accepts per tick (default: 256)
link_capacity = {}
; Drop every Nth fragment sent by the simulated ground station (0 = never)
drop_every = {}
"#,
        enabled,
        config.terrain.spacing,
        config.terrain.cache_size,
        config.terrain.fragments_x,
        config.terrain.fragments_y,
        config.terrain.request_interval_ms,
        config.ingest.sample_policy,
        config.ingest.min_elevation,
        config.ingest.max_elevation,
        config.logging.file.to_string_lossy(),
        config.simulation.tick_ms,
        config.simulation.link_capacity,
        config.simulation.drop_every,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SamplePolicy;

    #[test]
    fn test_writes_every_section() {
        let text = to_config_string(&ConfigFile::default());
        for section in ["[terrain]", "[ingest]", "[logging]", "[simulation]"] {
            assert!(text.contains(section), "missing {}", section);
        }
        assert!(text.contains("sample_policy = reject"));
        assert!(text.contains("fragments_x = 7"));
    }

    #[test]
    fn test_writes_changed_values() {
        let mut config = ConfigFile::default();
        config.ingest.sample_policy = SamplePolicy::Accept;
        config.terrain.enabled = false;

        let text = to_config_string(&config);
        assert!(text.contains("sample_policy = accept"));
        assert!(text.contains("enabled = false"));
    }
}
