use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use lzstream::{Check, ConcurrencyThrottle, MAX_ASYNC_STREAM_COUNT, Options, Preset, StreamFactory};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Prefix of the environment variables that override settings, e.g.
/// `LZSTREAM_PRESET=9`.
pub const ENV_PREFIX: &str = "LZSTREAM_";

/// Process-level defaults for building streams.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Asynchronous streams allowed at once before new ones run inline.
    pub max_async_streams: usize,
    /// Run every stream inline.
    pub synchronous: bool,
    pub preset: Preset,
    pub check: Check,
    /// Decoder memory ceiling in bytes.
    pub memlimit: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_async_streams: MAX_ASYNC_STREAM_COUNT,
            synchronous: false,
            preset: Preset::DEFAULT,
            check: Check::default(),
            memlimit: None,
        }
    }
}

/// Where settings are read from when no path is given, if the platform has a
/// configuration directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "lzstream").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Settings {
    /// Defaults, then the file at `path` (TOML, YAML or JSON by extension),
    /// then the environment.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load from the default location, if it exists, and the environment.
    pub fn load() -> Result<Self> {
        let path = default_path().filter(|path| path.is_file());
        Self::from_figment(&Self::figment(path.as_deref()))
    }

    /// Load from `path`, which must exist, and the environment.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        Self::from_figment(&Self::figment(Some(path)))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let settings: Settings = figment.extract().or_raise(|| ErrorKind::Load)?;
        settings.validate()?;
        debug!(?settings, "settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.memlimit == Some(0) {
            exn::bail!(ErrorKind::Invalid("memlimit must be greater than zero".to_string()));
        }
        self.options().validate().map_err(ErrorKind::stream)
    }

    /// Default options for streams built under these settings.
    pub fn options(&self) -> Options {
        Options {
            preset: self.preset,
            check: self.check,
            memlimit: self.memlimit,
            synchronous: self.synchronous,
            ..Options::default()
        }
    }

    /// A factory with its own throttle, sized and defaulted from these
    /// settings.
    pub fn factory(&self) -> StreamFactory {
        StreamFactory::new(ConcurrencyThrottle::new(self.max_async_streams)).with_defaults(self.options())
    }
}
