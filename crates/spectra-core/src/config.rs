//! Generator configuration and data-directory lookup.
//!
//! Configuration is a small JSON document; every field is optional. Bundled
//! data (line lists, templates, LSF kernels, ionization tables) lives under a
//! data directory with one subdirectory per kind of file.

use crate::domain::{SpectraError, SpectraResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "SIGHTLINE_SPECTRA_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_LINE_LIST: &str = "lines.txt";

pub const LINE_LISTS_SUBDIR: &str = "line_lists";
pub const LSF_KERNELS_SUBDIR: &str = "lsf_kernels";
pub const ION_BALANCE_SUBDIR: &str = "ion_balance";
pub const SPECTRAL_TEMPLATES_SUBDIR: &str = "spectral_templates";

pub const QSO_TEMPLATE_FILE: &str = "qso_background_COS_HST.txt";
pub const MILKY_WAY_TEMPLATE_FILE: &str = "mw_foreground_COS.txt";

const PREFERRED_ION_TABLES: [&str; 2] = ["hm2012_hr.h5", "hm2012_lr.h5"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub line_database: Option<PathBuf>,
    #[serde(default)]
    pub ionization_table: Option<PathBuf>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> SpectraResult<Self> {
        let source = fs::read_to_string(path).map_err(|source| {
            SpectraError::io_system(
                "IO.CONFIG_READ",
                format!("failed to read config '{}': {}", path.display(), source),
            )
        })?;
        Self::from_json_str(&source).map_err(|error| {
            SpectraError::configuration(
                error.placeholder(),
                format!("{} ({})", error.message(), path.display()),
            )
        })
    }

    pub fn from_json_str(source: &str) -> SpectraResult<Self> {
        serde_json::from_str(source).map_err(|source| {
            SpectraError::configuration(
                "CONFIG.PARSE",
                format!("failed to parse generator config: {}", source),
            )
        })
    }

    /// Data directory from the config, then the environment, then `./data`.
    pub fn data_paths(&self) -> DataPaths {
        match &self.data_dir {
            Some(root) => DataPaths::new(root.clone()),
            None => DataPaths::from_env(),
        }
    }

    pub fn line_database_name(&self) -> &Path {
        self.line_database
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_LINE_LIST))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> Self {
        let root = std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Looks for `name` under `<root>/<subdir>` first, then as given.
    pub fn resolve(&self, subdir: &str, name: &Path) -> Option<PathBuf> {
        let bundled = self.root.join(subdir).join(name);
        if bundled.is_file() {
            return Some(bundled);
        }
        name.is_file().then(|| name.to_path_buf())
    }

    pub fn resolve_required(
        &self,
        subdir: &str,
        name: &Path,
        placeholder: &'static str,
        what: &str,
    ) -> SpectraResult<PathBuf> {
        self.resolve(subdir, name).ok_or_else(|| {
            SpectraError::configuration(
                placeholder,
                format!(
                    "{} '{}' is not found in the working directory or in '{}'",
                    what,
                    name.display(),
                    self.root.join(subdir).display()
                ),
            )
        })
    }

    /// Resolves the ionization table used to derive missing ion fields.
    ///
    /// An explicit name must exist. Otherwise the high-resolution HM2012 table
    /// is preferred, then the low-resolution one, then the first `.h5` file in
    /// the ion-balance directory by name.
    pub fn resolve_ionization_table(&self, explicit: Option<&Path>) -> SpectraResult<PathBuf> {
        if let Some(name) = explicit {
            return self.resolve_required(
                ION_BALANCE_SUBDIR,
                name,
                "CONFIG.IONIZATION_TABLE",
                "ionization table",
            );
        }

        let directory = self.root.join(ION_BALANCE_SUBDIR);
        let entries = fs::read_dir(&directory).map_err(|source| {
            SpectraError::configuration(
                "CONFIG.IONIZATION_TABLE",
                format!(
                    "failed to list ionization tables in '{}': {}",
                    directory.display(),
                    source
                ),
            )
        })?;

        let mut tables: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".h5"))
            .collect();
        tables.sort();

        let chosen = PREFERRED_ION_TABLES
            .iter()
            .find(|preferred| tables.iter().any(|name| name.as_str() == **preferred))
            .map(|preferred| preferred.to_string())
            .or_else(|| {
                let fallback = tables.first().cloned();
                if let Some(name) = &fallback {
                    tracing::info!("No ionization table specified, using {}", name);
                }
                fallback
            })
            .ok_or_else(|| {
                SpectraError::configuration(
                    "CONFIG.IONIZATION_TABLE",
                    format!("no ionization tables found in '{}'", directory.display()),
                )
            })?;

        Ok(directory.join(chosen))
    }
}
