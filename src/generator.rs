use crate::options::{GridOptions, GridSettings, Profile, Steps, normalize_options};
use indexmap::IndexMap;

/// CSS property -> value, in declaration order.
pub type Declarations = IndexMap<String, String>;

/// Selector -> declarations. Later inserts for the same selector win.
pub type UtilityMap = IndexMap<String, Declarations>;

/// Spacing name -> length, in theme order.
pub type SpacingScale = IndexMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Responsive,
}

/// The framework side of a plugin: it escapes class names, exposes the
/// spacing theme and receives the generated utilities.
pub trait Host {
    fn escape(&self, class_name: &str) -> String;
    fn spacing(&self) -> &SpacingScale;
    fn add_utilities(&mut self, utilities: UtilityMap, variants: &[Variant]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlugin {
    settings: GridSettings,
}

impl GridPlugin {
    pub fn new(options: &GridOptions) -> Self {
        Self::from_settings(normalize_options(options))
    }

    pub fn from_settings(settings: GridSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    pub fn utilities<F>(&self, escape: F, spacing: &SpacingScale) -> UtilityMap
    where
        F: Fn(&str) -> String,
    {
        generate(&self.settings, &escape, spacing)
    }

    /// Generated class names without the leading dot, unescaped.
    pub fn class_names(&self, spacing: &SpacingScale) -> Vec<String> {
        self.utilities(|class| class.to_string(), spacing)
            .into_keys()
            .map(|selector| selector.trim_start_matches('.').to_string())
            .collect()
    }

    pub fn register<H: Host>(&self, host: &mut H) {
        let utilities = self.utilities(|class| host.escape(class), host.spacing());
        log::debug!("registering {} grid utilities", utilities.len());
        host.add_utilities(utilities, &[Variant::Responsive]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Row,
    Column,
}

impl Axis {
    fn plural(self) -> &'static str {
        match self {
            Axis::Row => "rows",
            Axis::Column => "columns",
        }
    }

    fn line(self) -> &'static str {
        match self {
            Axis::Row => "row",
            Axis::Column => "column",
        }
    }
}

type Escape<'a> = &'a dyn Fn(&str) -> String;

/// Merges every category in a fixed order: display, auto-flow, template,
/// auto, lines, gaps, alignment.
pub fn generate(
    settings: &GridSettings,
    escape: Escape<'_>,
    spacing: &SpacingScale,
) -> UtilityMap {
    let mut utilities = UtilityMap::new();
    utilities.extend(display_utilities(escape));
    utilities.extend(auto_flow_utilities(escape));
    utilities.extend(template_utilities(settings, escape));
    utilities.extend(auto_utilities(settings, escape));
    utilities.extend(line_utilities(settings, escape));
    utilities.extend(gap_utilities(settings, escape, spacing));
    if settings.profile.alignment {
        utilities.extend(alignment_utilities(escape));
    }
    log::trace!("generated {} grid utilities", utilities.len());
    utilities
}

fn insert_rule(
    utilities: &mut UtilityMap,
    escape: Escape<'_>,
    class: &str,
    property: &str,
    value: impl Into<String>,
) {
    let mut declarations = Declarations::new();
    declarations.insert(property.to_string(), value.into());
    utilities.insert(format!(".{}", escape(class)), declarations);
}

fn display_utilities(escape: Escape<'_>) -> UtilityMap {
    let mut utilities = UtilityMap::new();
    insert_rule(&mut utilities, escape, "grid", "display", "grid");
    insert_rule(&mut utilities, escape, "inline-grid", "display", "inline-grid");
    utilities
}

fn auto_flow_utilities(escape: Escape<'_>) -> UtilityMap {
    const FLOWS: [(&str, &str); 5] = [
        ("auto-flow-row", "row"),
        ("auto-flow-row-dense", "row dense"),
        ("auto-flow-column", "column"),
        ("auto-flow-column-dense", "column dense"),
        ("auto-flow-dense", "dense"),
    ];
    let mut utilities = UtilityMap::new();
    for (class, value) in FLOWS {
        insert_rule(&mut utilities, escape, class, "grid-auto-flow", value);
    }
    utilities
}

fn axes(settings: &GridSettings) -> [(Axis, &Steps); 2] {
    [
        (Axis::Row, &settings.rows),
        (Axis::Column, &settings.columns),
    ]
}

fn track_list(profile: &Profile, count: u32) -> String {
    let tracks = format!("repeat({}, {})", count, profile.track_size);
    if profile.labeled_tracks {
        format!("[start] {} [end]", tracks)
    } else {
        tracks
    }
}

fn template_utilities(settings: &GridSettings, escape: Escape<'_>) -> UtilityMap {
    let profile = &settings.profile;
    let mut utilities = UtilityMap::new();

    for (axis, steps) in axes(settings) {
        if !steps.is_enabled() {
            continue;
        }
        let property = format!("grid-template-{}", axis.plural());
        if profile.keyword_tracks {
            let class = format!("template-{}-none", axis.plural());
            insert_rule(&mut utilities, escape, &class, &property, "none");
        }
        for &value in steps.values() {
            if value == 1 && profile.full_keyword {
                let class = format!("template-{}-full", axis.plural());
                insert_rule(&mut utilities, escape, &class, &property, "100%");
            } else {
                let class = format!("template-{}-1/{}", axis.plural(), value);
                insert_rule(
                    &mut utilities,
                    escape,
                    &class,
                    &property,
                    track_list(profile, value),
                );
            }
        }
    }

    utilities
}

fn auto_utilities(settings: &GridSettings, escape: Escape<'_>) -> UtilityMap {
    const KEYWORDS: [(&str, &str); 4] = [
        ("auto", "auto"),
        ("min", "min-content"),
        ("max", "max-content"),
        ("fr", "minmax(0, 1fr)"),
    ];
    let profile = &settings.profile;
    let mut utilities = UtilityMap::new();

    for (axis, steps) in axes(settings) {
        if !steps.is_enabled() {
            continue;
        }
        let property = format!("grid-auto-{}", axis.plural());
        if profile.keyword_tracks {
            for (suffix, value) in KEYWORDS {
                let class = format!("auto-{}-{}", axis.plural(), suffix);
                insert_rule(&mut utilities, escape, &class, &property, value);
            }
        }
        for &value in steps.values() {
            if value == 1 && profile.full_keyword {
                let class = format!("auto-{}-full", axis.plural());
                insert_rule(&mut utilities, escape, &class, &property, "100%");
            } else {
                let class = format!("auto-{}-1/{}", axis.plural(), value);
                insert_rule(
                    &mut utilities,
                    escape,
                    &class,
                    &property,
                    format!("calc(100% / {})", value),
                );
            }
        }
    }

    utilities
}

fn line_utilities(settings: &GridSettings, escape: Escape<'_>) -> UtilityMap {
    let spans = settings.profile.spans;
    let mut utilities = UtilityMap::new();

    for (axis, steps) in axes(settings) {
        if !steps.is_enabled() {
            continue;
        }
        let line = axis.line();
        let lines = match axis {
            Axis::Row => settings.row_lines(),
            Axis::Column => settings.column_lines(),
        };
        let start = format!("grid-{}-start", line);
        let end = format!("grid-{}-end", line);
        let shorthand = format!("grid-{}", line);

        insert_rule(&mut utilities, escape, &format!("{}-start-auto", line), &start, "auto");
        insert_rule(&mut utilities, escape, &format!("{}-end-auto", line), &end, "auto");
        if spans {
            insert_rule(&mut utilities, escape, &format!("{}-auto", line), &shorthand, "auto");
            insert_rule(
                &mut utilities,
                escape,
                &format!("{}-span-full", line),
                &shorthand,
                "1 / -1",
            );
        }

        for value in lines {
            insert_rule(
                &mut utilities,
                escape,
                &format!("{}-start-{}", line, value),
                &start,
                value.to_string(),
            );
            let next = value + 1;
            insert_rule(
                &mut utilities,
                escape,
                &format!("{}-end-{}", line, next),
                &end,
                next.to_string(),
            );
            if spans {
                insert_rule(
                    &mut utilities,
                    escape,
                    &format!("{}-span-{}", line, value),
                    &shorthand,
                    format!("span {} / span {}", value, value),
                );
            }
        }
    }

    utilities
}

fn gap_utilities(
    settings: &GridSettings,
    escape: Escape<'_>,
    spacing: &SpacingScale,
) -> UtilityMap {
    let profile = &settings.profile;
    let gaps = [
        ("gap", &settings.gap, profile.paired_gap),
        ("row-gap", &settings.row_gap, false),
        ("column-gap", &settings.column_gap, false),
    ];
    let mut utilities = UtilityMap::new();

    for (property, steps, paired) in gaps {
        if !steps.is_enabled() {
            continue;
        }
        let format_value = |value: &str| {
            if paired {
                format!("{} {}", value, value)
            } else {
                value.to_string()
            }
        };

        for &value in steps.values() {
            let pixels = format!("{}px", value);
            let class = format!("{}-{}", property, pixels);
            let value = format_value(pixels.as_str());
            insert_rule(&mut utilities, escape, &class, property, value);
        }
        for (key, value) in spacing {
            if profile.skip_px_spacing && key == "px" {
                continue;
            }
            let class = format!("{}-{}", property, key);
            let value = format_value(value.as_str());
            insert_rule(&mut utilities, escape, &class, property, value);
        }
    }

    utilities
}

fn alignment_utilities(escape: Escape<'_>) -> UtilityMap {
    const PROPERTIES: [&str; 6] = [
        "justify-items",
        "align-items",
        "justify-content",
        "align-content",
        "justify-self",
        "align-self",
    ];
    const PLACEMENT: [&str; 4] = ["start", "end", "center", "stretch"];
    const DISTRIBUTION: [&str; 7] = [
        "start",
        "end",
        "center",
        "stretch",
        "space-around",
        "space-between",
        "space-evenly",
    ];
    let mut utilities = UtilityMap::new();

    for property in PROPERTIES {
        let values: &[&str] = if property.ends_with("-content") {
            &DISTRIBUTION
        } else {
            &PLACEMENT
        };
        for value in values {
            let suffix = value.rsplit('-').next().unwrap_or(*value);
            let class = format!("{}-{}", property, suffix);
            insert_rule(&mut utilities, escape, &class, property, *value);
        }
    }

    utilities
}

#[cfg(test)]
mod tests {
    use super::{
        GridPlugin, Host, SpacingScale, UtilityMap, Variant, alignment_utilities,
        auto_utilities, gap_utilities, generate, line_utilities, template_utilities,
    };
    use crate::options::{GridOptions, Profile, RawEntry, RawOption, normalize_options};

    fn escape(class: &str) -> String {
        class.replace('/', "\\/").replace('.', "\\.")
    }

    fn spacing(entries: &[(&str, &str)]) -> SpacingScale {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn value_of<'a>(utilities: &'a UtilityMap, selector: &str, property: &str) -> &'a str {
        utilities
            .get(selector)
            .and_then(|declarations| declarations.get(property))
            .map(String::as_str)
            .unwrap_or_else(|| panic!("missing {} {{ {} }}", selector, property))
    }

    fn rows(count: i64, profile: Profile) -> GridOptions {
        GridOptions {
            rows: RawOption::Count(count),
            profile,
            ..GridOptions::default()
        }
    }

    #[test]
    fn always_emits_display_and_auto_flow() {
        let settings = normalize_options(&GridOptions::default());
        let utilities = generate(&settings, &escape, &SpacingScale::new());
        assert_eq!(value_of(&utilities, ".grid", "display"), "grid");
        assert_eq!(value_of(&utilities, ".inline-grid", "display"), "inline-grid");
        assert_eq!(
            value_of(&utilities, ".auto-flow-column-dense", "grid-auto-flow"),
            "column dense"
        );
        assert_eq!(utilities.len(), 7);
    }

    #[test]
    fn three_rows_generate_three_template_and_auto_classes() {
        let settings = normalize_options(&rows(3, Profile::CLASSIC));
        let template = template_utilities(&settings, &escape);
        let auto = auto_utilities(&settings, &escape);

        assert_eq!(template.len(), 3);
        assert_eq!(
            value_of(&template, ".template-rows-full", "grid-template-rows"),
            "100%"
        );
        assert_eq!(
            value_of(&template, ".template-rows-1\\/3", "grid-template-rows"),
            "[start] repeat(3, 1fr) [end]"
        );
        assert_eq!(auto.len(), 3);
        assert_eq!(
            value_of(&auto, ".auto-rows-1\\/2", "grid-auto-rows"),
            "calc(100% / 2)"
        );
        assert_eq!(value_of(&auto, ".auto-rows-full", "grid-auto-rows"), "100%");
    }

    #[test]
    fn row_lines_follow_multiplier() {
        let mut options = rows(3, Profile::CLASSIC);
        options.row_multiplier = RawOption::Count(2);
        let settings = normalize_options(&options);
        let lines = line_utilities(&settings, &escape);

        for line in 1..=6 {
            assert!(lines.contains_key(&format!(".row-start-{}", line)));
            assert!(lines.contains_key(&format!(".row-end-{}", line + 1)));
        }
        assert!(!lines.contains_key(".row-start-7"));
        assert!(!lines.contains_key(".row-end-8"));
        assert!(!lines.contains_key(".row-end-1"));
        assert_eq!(value_of(&lines, ".row-start-auto", "grid-row-start"), "auto");
        assert_eq!(value_of(&lines, ".row-end-auto", "grid-row-end"), "auto");
        assert_eq!(lines.len(), 2 + 6 * 2);
    }

    #[test]
    fn zero_multiplier_falls_back_to_profile_default() {
        let mut options = rows(3, Profile::MODERN);
        options.row_multiplier = RawOption::Count(0);
        let plugin = GridPlugin::new(&options);
        let names = plugin.class_names(&SpacingScale::new());

        assert_eq!(plugin.settings().row_multiplier, Some(1));
        for line in 1..=3 {
            assert!(names.contains(&format!("row-start-{}", line)));
            assert!(names.contains(&format!("row-end-{}", line + 1)));
        }
        assert!(!names.contains(&"row-start-4".to_string()));
    }

    #[test]
    fn disabled_rows_emit_no_row_classes() {
        let options = GridOptions {
            columns: RawOption::Enabled,
            row_gap: RawOption::Disabled,
            profile: Profile::MODERN,
            ..GridOptions::default()
        };
        let settings = normalize_options(&options);
        let utilities = generate(&settings, &escape, &spacing(&[("1", "0.25rem")]));

        assert!(utilities.keys().all(|selector| {
            !selector.starts_with(".template-rows")
                && !selector.starts_with(".auto-rows")
                && !selector.starts_with(".row-")
        }));
        assert!(utilities.contains_key(".column-start-60"));
        assert!(!utilities.contains_key(".column-start-61"));
    }

    #[test]
    fn modern_profile_emits_spans_and_keywords() {
        let settings = normalize_options(&rows(2, Profile::MODERN));
        let template = template_utilities(&settings, &escape);
        let auto = auto_utilities(&settings, &escape);
        let lines = line_utilities(&settings, &escape);

        assert_eq!(
            value_of(&template, ".template-rows-none", "grid-template-rows"),
            "none"
        );
        assert_eq!(
            value_of(&template, ".template-rows-1\\/1", "grid-template-rows"),
            "repeat(1, minmax(0, 1fr))"
        );
        assert_eq!(value_of(&auto, ".auto-rows-min", "grid-auto-rows"), "min-content");
        assert_eq!(value_of(&auto, ".auto-rows-fr", "grid-auto-rows"), "minmax(0, 1fr)");
        assert_eq!(value_of(&auto, ".auto-rows-1\\/1", "grid-auto-rows"), "calc(100% / 1)");
        assert_eq!(value_of(&lines, ".row-span-2", "grid-row"), "span 2 / span 2");
        assert_eq!(value_of(&lines, ".row-span-full", "grid-row"), "1 / -1");
        assert_eq!(value_of(&lines, ".row-auto", "grid-row"), "auto");
        assert!(!lines.contains_key(".row-span-3"));
    }

    #[test]
    fn gap_array_drops_non_integer_entries() {
        let options = GridOptions {
            column_gap: RawOption::List(vec![
                RawEntry::Integer(2),
                RawEntry::Invalid("string \"x\"".to_string()),
                RawEntry::Integer(4),
            ]),
            ..GridOptions::default()
        };
        let settings = normalize_options(&options);
        assert_eq!(settings.column_gap.values(), &[2, 4]);

        let gaps = gap_utilities(&settings, &escape, &SpacingScale::new());
        assert_eq!(gaps.len(), 2);
        assert_eq!(value_of(&gaps, ".column-gap-2px", "column-gap"), "2px");
        assert_eq!(value_of(&gaps, ".column-gap-4px", "column-gap"), "4px");
    }

    #[test]
    fn gaps_follow_spacing_scale() {
        let options = GridOptions {
            gap: RawOption::Count(1),
            row_gap: RawOption::Count(1),
            column_gap: RawOption::Count(1),
            ..GridOptions::default()
        };
        let settings = normalize_options(&options);
        let scale = spacing(&[("1", "0.25rem"), ("2", "0.5rem")]);
        let gaps = gap_utilities(&settings, &escape, &scale);

        for property in ["gap", "row-gap", "column-gap"] {
            assert_eq!(value_of(&gaps, &format!(".{}-1", property), property), "0.25rem");
            assert_eq!(value_of(&gaps, &format!(".{}-2", property), property), "0.5rem");
            assert_eq!(value_of(&gaps, &format!(".{}-1px", property), property), "1px");
        }
        assert_eq!(gaps.len(), 9);
    }

    #[test]
    fn classic_profile_skips_px_spacing_key() {
        let options = GridOptions {
            row_gap: RawOption::Count(1),
            ..GridOptions::default()
        };
        let scale = spacing(&[("px", "1px"), ("0.5", "0.125rem")]);
        let classic = gap_utilities(&normalize_options(&options), &escape, &scale);
        assert!(!classic.contains_key(".row-gap-px"));
        assert_eq!(value_of(&classic, ".row-gap-0\\.5", "row-gap"), "0.125rem");

        let modern = gap_utilities(
            &normalize_options(&GridOptions {
                profile: Profile::MODERN,
                ..options
            }),
            &escape,
            &scale,
        );
        assert_eq!(value_of(&modern, ".row-gap-px", "row-gap"), "1px");
    }

    #[test]
    fn modern_profile_pairs_combined_gap() {
        let options = GridOptions {
            gap: RawOption::Count(3),
            row_gap: RawOption::Count(3),
            profile: Profile::MODERN,
            ..GridOptions::default()
        };
        let settings = normalize_options(&options);
        let gaps = gap_utilities(&settings, &escape, &spacing(&[("4", "1rem")]));
        assert_eq!(value_of(&gaps, ".gap-3px", "gap"), "3px 3px");
        assert_eq!(value_of(&gaps, ".gap-4", "gap"), "1rem 1rem");
        assert_eq!(value_of(&gaps, ".row-gap-3px", "row-gap"), "3px");
    }

    #[test]
    fn alignment_uses_last_token_of_hyphenated_values() {
        let utilities = alignment_utilities(&escape);
        assert_eq!(
            value_of(&utilities, ".justify-content-between", "justify-content"),
            "space-between"
        );
        assert_eq!(
            value_of(&utilities, ".align-content-evenly", "align-content"),
            "space-evenly"
        );
        assert_eq!(value_of(&utilities, ".align-self-stretch", "align-self"), "stretch");
        assert_eq!(utilities.len(), 4 * 4 + 7 * 2);
    }

    #[test]
    fn categories_do_not_collide() {
        let options = GridOptions {
            rows: RawOption::Enabled,
            columns: RawOption::Enabled,
            gap: RawOption::Enabled,
            row_gap: RawOption::Enabled,
            column_gap: RawOption::Enabled,
            profile: Profile::MODERN,
            ..GridOptions::default()
        };
        let settings = normalize_options(&options);
        let scale = spacing(&[("0", "0"), ("1", "0.25rem"), ("px", "1px")]);
        let merged = generate(&settings, &escape, &scale);
        let total = 7
            + template_utilities(&settings, &escape).len()
            + auto_utilities(&settings, &escape).len()
            + line_utilities(&settings, &escape).len()
            + gap_utilities(&settings, &escape, &scale).len()
            + alignment_utilities(&escape).len();
        assert_eq!(merged.len(), total);
    }

    #[derive(Default)]
    struct RecordingHost {
        spacing: SpacingScale,
        received: Vec<(UtilityMap, Vec<Variant>)>,
    }

    impl Host for RecordingHost {
        fn escape(&self, class_name: &str) -> String {
            escape(class_name)
        }

        fn spacing(&self) -> &SpacingScale {
            &self.spacing
        }

        fn add_utilities(&mut self, utilities: UtilityMap, variants: &[Variant]) {
            self.received.push((utilities, variants.to_vec()));
        }
    }

    #[test]
    fn register_hands_utilities_to_host_as_responsive() {
        let mut host = RecordingHost {
            spacing: spacing(&[("2", "0.5rem")]),
            ..RecordingHost::default()
        };
        let plugin = GridPlugin::new(&GridOptions {
            columns: RawOption::Count(2),
            column_gap: RawOption::Count(1),
            ..GridOptions::default()
        });
        plugin.register(&mut host);

        assert_eq!(host.received.len(), 1);
        let (utilities, variants) = &host.received[0];
        assert_eq!(variants, &vec![Variant::Responsive]);
        assert!(utilities.contains_key(".template-columns-1\\/2"));
        assert_eq!(value_of(utilities, ".column-gap-2", "column-gap"), "0.5rem");
    }

    #[test]
    fn class_names_are_unescaped() {
        let plugin = GridPlugin::new(&rows(2, Profile::CLASSIC));
        let names = plugin.class_names(&SpacingScale::new());
        assert!(names.contains(&"template-rows-1/2".to_string()));
        assert!(names.contains(&"grid".to_string()));
        assert!(names.iter().all(|name| !name.starts_with('.')));
    }
}
