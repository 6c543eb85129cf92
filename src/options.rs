use serde::Deserialize;
use std::ops::RangeInclusive;

/// A configuration value as the user wrote it, before any defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "toml::Value")]
pub enum RawOption {
    #[default]
    Disabled,
    Enabled,
    Count(i64),
    List(Vec<RawEntry>),
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEntry {
    Integer(i64),
    Invalid(String),
}

impl From<toml::Value> for RawOption {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::Boolean(false) => RawOption::Disabled,
            toml::Value::Boolean(true) => RawOption::Enabled,
            toml::Value::Integer(count) => RawOption::Count(count),
            toml::Value::Float(number) => match integral_float(number) {
                Some(count) => RawOption::Count(count),
                None => RawOption::Invalid(format!("float {}", number)),
            },
            toml::Value::Array(items) => {
                RawOption::List(items.into_iter().map(RawEntry::from).collect())
            }
            other => RawOption::Invalid(other.type_str().to_string()),
        }
    }
}

impl From<toml::Value> for RawEntry {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::Integer(number) => RawEntry::Integer(number),
            toml::Value::Float(number) => match integral_float(number) {
                Some(number) => RawEntry::Integer(number),
                None => RawEntry::Invalid(format!("float {}", number)),
            },
            toml::Value::String(text) => RawEntry::Invalid(format!("string {:?}", text)),
            other => RawEntry::Invalid(other.type_str().to_string()),
        }
    }
}

impl From<bool> for RawOption {
    fn from(value: bool) -> Self {
        if value {
            RawOption::Enabled
        } else {
            RawOption::Disabled
        }
    }
}

impl From<i64> for RawOption {
    fn from(value: i64) -> Self {
        RawOption::Count(value)
    }
}

impl From<Vec<i64>> for RawOption {
    fn from(values: Vec<i64>) -> Self {
        RawOption::List(values.into_iter().map(RawEntry::Integer).collect())
    }
}

fn integral_float(number: f64) -> Option<i64> {
    if number.is_finite() && number.fract() == 0.0 {
        Some(number as i64)
    } else {
        None
    }
}

/// Versioned generation behaviour. The presets capture releases whose output
/// drifted apart; they are kept side by side rather than reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub grid_default: u32,
    pub gap_default: (u32, u32),
    pub row_multiplier: u32,
    pub column_multiplier: u32,
    /// Emit `*-full: 100%` instead of a one-track repeat for V = 1.
    pub full_keyword: bool,
    pub track_size: &'static str,
    /// Wrap template tracks in `[start] ... [end]` line names.
    pub labeled_tracks: bool,
    pub keyword_tracks: bool,
    pub spans: bool,
    pub paired_gap: bool,
    pub skip_px_spacing: bool,
    pub alignment: bool,
}

impl Profile {
    pub const CLASSIC: Profile = Profile {
        grid_default: 12,
        gap_default: (1, 8),
        row_multiplier: 1,
        column_multiplier: 1,
        full_keyword: true,
        track_size: "1fr",
        labeled_tracks: true,
        keyword_tracks: false,
        spans: false,
        paired_gap: false,
        skip_px_spacing: true,
        alignment: false,
    };

    pub const MODERN: Profile = Profile {
        grid_default: 12,
        gap_default: (2, 8),
        row_multiplier: 1,
        column_multiplier: 5,
        full_keyword: false,
        track_size: "minmax(0, 1fr)",
        labeled_tracks: false,
        keyword_tracks: true,
        spans: true,
        paired_gap: true,
        skip_px_spacing: false,
        alignment: true,
    };

    pub fn from_name(name: &str) -> Option<Profile> {
        match name.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(Profile::CLASSIC),
            "modern" => Some(Profile::MODERN),
            _ => None,
        }
    }

    fn grid_range(&self) -> RangeInclusive<u32> {
        1..=self.grid_default
    }

    fn gap_range(&self) -> RangeInclusive<u32> {
        self.gap_default.0..=self.gap_default.1
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile::CLASSIC
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridOptions {
    pub rows: RawOption,
    pub columns: RawOption,
    pub row_multiplier: RawOption,
    pub column_multiplier: RawOption,
    pub gap: RawOption,
    pub row_gap: RawOption,
    pub column_gap: RawOption,
    pub profile: Profile,
}

/// A normalized option: disabled, or ascending integers >= 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Steps {
    #[default]
    Disabled,
    Values(Vec<u32>),
}

impl Steps {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Steps::Values(_))
    }

    pub fn values(&self) -> &[u32] {
        match self {
            Steps::Disabled => &[],
            Steps::Values(values) => values,
        }
    }

    pub fn max(&self) -> Option<u32> {
        self.values().last().copied()
    }
}

/// Fully-populated configuration consumed by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSettings {
    pub rows: Steps,
    pub columns: Steps,
    pub row_multiplier: Option<u32>,
    pub column_multiplier: Option<u32>,
    pub gap: Steps,
    pub row_gap: Steps,
    pub column_gap: Steps,
    pub profile: Profile,
}

impl GridSettings {
    pub fn row_lines(&self) -> RangeInclusive<u32> {
        line_range(&self.rows, self.row_multiplier)
    }

    pub fn column_lines(&self) -> RangeInclusive<u32> {
        line_range(&self.columns, self.column_multiplier)
    }
}

pub fn normalize_options(options: &GridOptions) -> GridSettings {
    let profile = options.profile;
    let rows = normalize("rows", &options.rows, profile.grid_range());
    let columns = normalize("columns", &options.columns, profile.grid_range());
    let row_multiplier = normalize_multiplier(
        "row_multiplier",
        &options.row_multiplier,
        &rows,
        profile.row_multiplier,
    );
    let column_multiplier = normalize_multiplier(
        "column_multiplier",
        &options.column_multiplier,
        &columns,
        profile.column_multiplier,
    );

    GridSettings {
        rows,
        columns,
        row_multiplier,
        column_multiplier,
        gap: normalize("gap", &options.gap, profile.gap_range()),
        row_gap: normalize("row_gap", &options.row_gap, profile.gap_range()),
        column_gap: normalize("column_gap", &options.column_gap, profile.gap_range()),
        profile,
    }
}

/// Turns a raw option into [`Steps`]. Invalid entries are dropped without
/// error; wrong-typed or empty values fall back to `default`.
pub fn normalize(name: &str, raw: &RawOption, default: RangeInclusive<u32>) -> Steps {
    match raw {
        RawOption::Disabled => Steps::Disabled,
        RawOption::Count(count) => {
            let upper = u32::try_from(*count).unwrap_or(0);
            Steps::Values((1..=upper).collect())
        }
        RawOption::List(entries) if !entries.is_empty() => {
            let mut values = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    RawEntry::Integer(value) => match u32::try_from(*value) {
                        Ok(value) if value >= 1 => values.push(value),
                        _ => log::debug!("{}: dropping out-of-range entry {}", name, value),
                    },
                    RawEntry::Invalid(kind) => {
                        log::debug!("{}: dropping non-integer entry ({})", name, kind)
                    }
                }
            }
            values.sort_unstable();
            Steps::Values(values)
        }
        RawOption::Enabled | RawOption::List(_) => Steps::Values(default.collect()),
        RawOption::Invalid(kind) => {
            log::debug!("{}: unsupported value ({}), using defaults", name, kind);
            Steps::Values(default.collect())
        }
    }
}

/// Multipliers only apply to an enabled axis; anything but an integer >= 1
/// resolves to `default`.
pub fn normalize_multiplier(
    name: &str,
    raw: &RawOption,
    axis: &Steps,
    default: u32,
) -> Option<u32> {
    if !axis.is_enabled() {
        return None;
    }
    match raw {
        RawOption::Count(value) => match u32::try_from(*value) {
            Ok(value) if value >= 1 => Some(value),
            _ => {
                log::debug!("{}: {} is not a positive multiplier", name, value);
                Some(default)
            }
        },
        _ => Some(default),
    }
}

/// `1..=max * multiplier`, empty for a disabled or empty axis.
pub fn line_range(steps: &Steps, multiplier: Option<u32>) -> RangeInclusive<u32> {
    match (steps.max(), multiplier) {
        (Some(max), Some(multiplier)) => 1..=max.saturating_mul(multiplier),
        _ => RangeInclusive::new(1, 0),
    }
}
