use crate::generator::SpacingScale;
use crate::options::{GridOptions, Profile, RawOption};
use crate::stylesheet::{default_screens, default_spacing};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub grid: GridSection,
    #[serde(default)]
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct GridSection {
    #[serde(default, alias = "gridRows", alias = "grid_rows")]
    pub rows: RawOption,
    #[serde(
        default,
        alias = "gridColumns",
        alias = "gridCols",
        alias = "grid_columns"
    )]
    pub columns: RawOption,
    #[serde(
        default,
        alias = "multplierRows",
        alias = "multiplierRows",
        alias = "rowMultiples"
    )]
    pub row_multiplier: RawOption,
    #[serde(
        default,
        alias = "multplierColumns",
        alias = "multiplierColumns",
        alias = "colMultiples"
    )]
    pub column_multiplier: RawOption,
    #[serde(default, alias = "gaps")]
    pub gap: RawOption,
    #[serde(default, alias = "gapRows")]
    pub row_gap: RawOption,
    #[serde(default, alias = "gapColumns")]
    pub column_gap: RawOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct Theme {
    #[serde(default)]
    pub spacing: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub screens: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub message: String,
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError {
        message: format!("failed to read config {}: {}", path.display(), err),
    })?;
    toml::from_str(&text).map_err(|err| ConfigError {
        message: format!("failed to parse config {}: {}", path.display(), err),
    })
}

pub fn resolve_options(config: &Config) -> Result<GridOptions, ConfigError> {
    let profile = match config.profile.as_deref() {
        Some(name) => Profile::from_name(name).ok_or_else(|| ConfigError {
            message: format!("unknown profile '{}', expected classic or modern", name),
        })?,
        None => Profile::default(),
    };
    let grid = &config.grid;

    Ok(GridOptions {
        rows: grid.rows.clone(),
        columns: grid.columns.clone(),
        row_multiplier: grid.row_multiplier.clone(),
        column_multiplier: grid.column_multiplier.clone(),
        gap: grid.gap.clone(),
        row_gap: grid.row_gap.clone(),
        column_gap: grid.column_gap.clone(),
        profile,
    })
}

pub fn resolve_spacing(config: &Config) -> SpacingScale {
    config.theme.spacing.clone().unwrap_or_else(default_spacing)
}

pub fn resolve_screens(config: &Config) -> Vec<(String, String)> {
    match config.theme.screens.as_ref() {
        Some(screens) => screens
            .iter()
            .map(|(name, width)| (name.clone(), width.clone()))
            .collect(),
        None => default_screens(),
    }
}
