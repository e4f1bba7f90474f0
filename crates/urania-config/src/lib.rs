use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use urania::{OrbLimits, ScanSettings};

/// Names a config file to load instead of the default locations.
pub const CONFIG_ENV: &str = "URANIA_CONFIG";
/// JSON object merged over the configured orb limits.
pub const ORB_LIMITS_ENV: &str = "ORB_LIMITS_JSON";
/// Swiss Ephemeris data directory.
pub const EPHEMERIS_ENV: &str = "SWISS_EPHEMERIS_PATH";

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/urania.toml", "../../configs/urania.toml"];

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct UraniaSettings {
    /// `None` leaves the choice to the oracle's own fallback.
    pub ephemeris_path: Option<PathBuf>,
    pub orb_limits: OrbLimits,
    pub scan: ScanSettings,
    pub store_path: PathBuf,
    pub max_concurrent_jobs: usize,
    /// File the settings were read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for UraniaSettings {
    fn default() -> Self {
        Self {
            ephemeris_path: None,
            orb_limits: OrbLimits::default(),
            scan: ScanSettings::default(),
            store_path: default_store_path(),
            max_concurrent_jobs: default_max_jobs(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RootConfigToml {
    ephemeris: EphemerisToml,
    orb_limits: OrbLimits,
    scan: ScanSettings,
    store: StoreToml,
    worker: WorkerToml,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EphemerisToml {
    #[serde(default)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreToml {
    #[serde(default)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkerToml {
    #[serde(default = "default_max_jobs")]
    max_concurrent_jobs: usize,
}

impl Default for WorkerToml {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_jobs(),
        }
    }
}

/// Partial orb limits as accepted from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrbLimitsPatch {
    conjunction: Option<f64>,
    square: Option<f64>,
    opposition: Option<f64>,
    eclipse_latitude: Option<f64>,
}

impl OrbLimitsPatch {
    fn apply(self, limits: &mut OrbLimits) {
        if let Some(v) = self.conjunction {
            limits.conjunction = v;
        }
        if let Some(v) = self.square {
            limits.square = v;
        }
        if let Some(v) = self.opposition {
            limits.opposition = v;
        }
        if let Some(v) = self.eclipse_latitude {
            limits.eclipse_latitude = v;
        }
    }
}

fn default_max_jobs() -> usize {
    2
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("urania").join("events.json"))
        .unwrap_or_else(|| PathBuf::from("data/urania-events.json"))
}

/// Environment inputs, captured once so loading stays a pure function of them.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub config_path: Option<PathBuf>,
    pub orb_limits_json: Option<String>,
    pub ephemeris_path: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            config_path: env::var_os(CONFIG_ENV).map(PathBuf::from),
            orb_limits_json: env::var(ORB_LIMITS_ENV).ok(),
            ephemeris_path: env::var_os(EPHEMERIS_ENV).map(PathBuf::from),
        }
    }
}

/// Load settings from `explicit`, else the usual locations, applying
/// environment overrides from the process environment.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<UraniaSettings> {
    load_settings_with(explicit, &EnvOverrides::from_env())
}

pub fn load_settings_with(
    explicit: Option<&Path>,
    overrides: &EnvOverrides,
) -> anyhow::Result<UraniaSettings> {
    let path = resolve_config_path(explicit, overrides)?;

    let mut settings = match &path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .with_context(|| format!("Failed to read config {}", p.display()))?;
            let settings = parse_settings(&text)
                .with_context(|| format!("Failed to parse config {}", p.display()))?;
            log::info!("Loaded settings from {}", p.display());
            settings
        }
        None => {
            log::info!("No config file found, using defaults");
            UraniaSettings::default()
        }
    };
    settings.source = path;

    if let Some(json) = &overrides.orb_limits_json {
        let patch: OrbLimitsPatch = serde_json::from_str(json)
            .with_context(|| format!("Invalid {} value", ORB_LIMITS_ENV))?;
        patch.apply(&mut settings.orb_limits);
    }
    if let Some(p) = &overrides.ephemeris_path {
        settings.ephemeris_path = Some(p.clone());
    }

    validate(&settings)?;
    Ok(settings)
}

/// Parse a config document; unset sections take their defaults.
pub fn parse_settings(text: &str) -> anyhow::Result<UraniaSettings> {
    let root: RootConfigToml = toml::from_str(text)?;
    Ok(UraniaSettings {
        ephemeris_path: root.ephemeris.path,
        orb_limits: root.orb_limits,
        scan: root.scan,
        store_path: root.store.path.unwrap_or_else(default_store_path),
        max_concurrent_jobs: root.worker.max_concurrent_jobs,
        source: None,
    })
}

/// Explicit path, then the env-named path, then the first default location
/// that exists. Named files must exist; absent defaults are not an error.
fn resolve_config_path(
    explicit: Option<&Path>,
    overrides: &EnvOverrides,
) -> anyhow::Result<Option<PathBuf>> {
    let named = explicit
        .map(Path::to_path_buf)
        .or_else(|| overrides.config_path.clone());

    if let Some(p) = named {
        if !p.is_file() {
            anyhow::bail!("Config file {} does not exist", p.display());
        }
        return Ok(Some(p));
    }

    Ok(DEFAULT_CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file()))
}

fn validate(settings: &UraniaSettings) -> anyhow::Result<()> {
    settings.orb_limits.validate().context("Invalid [orb_limits]")?;
    settings.scan.validate().context("Invalid [scan]")?;
    if settings.max_concurrent_jobs == 0 {
        anyhow::bail!("[worker] max_concurrent_jobs must be at least 1");
    }
    Ok(())
}
