use crate::generator::{Declarations, Host, SpacingScale, UtilityMap, Variant};
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssOutput(String);

impl CssOutput {
    pub fn new(css: String) -> Self {
        Self(css)
    }
}

impl Deref for CssOutput {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for CssOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UtilityBlock {
    utilities: UtilityMap,
    variants: Vec<Variant>,
}

/// Collects registered utilities and renders them as CSS, expanding
/// responsive blocks into one `@media` group per screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    spacing: SpacingScale,
    screens: Vec<(String, String)>,
    blocks: Vec<UtilityBlock>,
}

/// Which classes the content actually uses, split by screen prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedClasses {
    base: HashSet<String>,
    screens: HashSet<(String, String)>,
}

impl UsedClasses {
    pub fn from_candidates<I>(candidates: I, screens: &[(String, String)]) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut used = UsedClasses::default();
        for candidate in candidates {
            let screen = candidate.split_once(':').and_then(|(prefix, class)| {
                screens
                    .iter()
                    .any(|(name, _)| name == prefix)
                    .then(|| (prefix.to_string(), class.to_string()))
            });
            match screen {
                Some(pair) => {
                    used.screens.insert(pair);
                }
                None => {
                    used.base.insert(candidate);
                }
            }
        }
        used
    }

    fn contains_base(&self, class: &str) -> bool {
        self.base.contains(class)
    }

    fn contains_screen(&self, screen: &str, class: &str) -> bool {
        self.screens
            .contains(&(screen.to_string(), class.to_string()))
    }
}

impl Stylesheet {
    pub fn new(spacing: SpacingScale, screens: Vec<(String, String)>) -> Self {
        Self {
            spacing,
            screens,
            blocks: Vec::new(),
        }
    }

    pub fn screens(&self) -> &[(String, String)] {
        &self.screens
    }

    pub fn class_count(&self) -> usize {
        self.blocks.iter().map(|block| block.utilities.len()).sum()
    }

    pub fn emit(&self, minify: bool) -> CssOutput {
        self.emit_filtered(minify, None)
    }

    /// Emits only the utilities named in `used`; responsive copies are kept
    /// per screen.
    pub fn emit_used(&self, minify: bool, used: &UsedClasses) -> CssOutput {
        self.emit_filtered(minify, Some(used))
    }

    fn emit_filtered(&self, minify: bool, used: Option<&UsedClasses>) -> CssOutput {
        let mut rules = Vec::new();

        for block in &self.blocks {
            for (selector, declarations) in &block.utilities {
                let keep = used
                    .map(|used| used.contains_base(&unescape_selector(selector)))
                    .unwrap_or(true);
                if keep {
                    rules.push(format_rule(selector, declarations, minify));
                }
            }
        }

        for (screen, width) in &self.screens {
            let mut screen_rules = Vec::new();
            for block in &self.blocks {
                if !block.variants.contains(&Variant::Responsive) {
                    continue;
                }
                for (selector, declarations) in &block.utilities {
                    let keep = used
                        .map(|used| used.contains_screen(screen, &unescape_selector(selector)))
                        .unwrap_or(true);
                    if keep {
                        let prefixed = screen_selector(screen, selector);
                        screen_rules.push(format_rule(&prefixed, declarations, minify));
                    }
                }
            }
            if screen_rules.is_empty() {
                continue;
            }
            let query = format!("(min-width: {})", width);
            rules.push(wrap_media(&query, &join_rules(screen_rules, minify), minify));
        }

        CssOutput::new(join_rules(rules, minify))
    }
}

impl Host for Stylesheet {
    fn escape(&self, class_name: &str) -> String {
        escape_selector(class_name)
    }

    fn spacing(&self) -> &SpacingScale {
        &self.spacing
    }

    fn add_utilities(&mut self, utilities: UtilityMap, variants: &[Variant]) {
        self.blocks.push(UtilityBlock {
            utilities,
            variants: variants.to_vec(),
        });
    }
}

pub fn default_spacing() -> SpacingScale {
    [
        ("px", "1px"),
        ("0", "0"),
        ("1", "0.25rem"),
        ("2", "0.5rem"),
        ("3", "0.75rem"),
        ("4", "1rem"),
        ("5", "1.25rem"),
        ("6", "1.5rem"),
        ("8", "2rem"),
        ("10", "2.5rem"),
        ("12", "3rem"),
        ("16", "4rem"),
        ("20", "5rem"),
        ("24", "6rem"),
        ("32", "8rem"),
        ("40", "10rem"),
        ("48", "12rem"),
        ("56", "14rem"),
        ("64", "16rem"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

pub fn default_screens() -> Vec<(String, String)> {
    vec![
        ("sm".to_string(), "640px".to_string()),
        ("md".to_string(), "768px".to_string()),
        ("lg".to_string(), "1024px".to_string()),
        ("xl".to_string(), "1280px".to_string()),
    ]
}

pub fn escape_selector(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);

    for (idx, ch) in class.chars().enumerate() {
        match ch {
            '\\' | ':' | '/' | '.' | '[' | ']' | '(' | ')' | '%' | '#' | '!' | '@' | ','
            | '&' | '>' | '+' | '*' | '=' | '\'' | '"' | ' ' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '0'..='9' if idx == 0 => escaped.push_str(&format!("\\3{} ", ch)),
            _ => escaped.push(ch),
        }
    }

    escaped
}

fn unescape_selector(selector: &str) -> String {
    let raw = selector.strip_prefix('.').unwrap_or(selector);
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('3') => {
                chars.next();
                if let Some(digit) = chars.next() {
                    out.push(digit);
                }
                if chars.peek() == Some(&' ') {
                    chars.next();
                }
            }
            Some(next) => {
                chars.next();
                out.push(next);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn screen_selector(screen: &str, selector: &str) -> String {
    let raw = selector.strip_prefix('.').unwrap_or(selector);
    format!(".{}\\:{}", escape_selector(screen), raw)
}

fn format_rule(selector: &str, declarations: &Declarations, minify: bool) -> String {
    if minify {
        let body = declarations
            .iter()
            .map(|(property, value)| format!("{}:{}", property, value))
            .collect::<Vec<_>>()
            .join(";");
        format!("{}{{{}}}", selector, body)
    } else {
        let body = declarations
            .iter()
            .map(|(property, value)| format!("  {}: {};", property, value))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{} {{\n{}\n}}", selector, body)
    }
}

fn wrap_media(query: &str, rules: &str, minify: bool) -> String {
    if minify {
        format!("@media {}{{{}}}", query, rules)
    } else {
        format!("@media {} {{\n{}\n}}", query, indent_css_block(rules, 2))
    }
}

fn join_rules(rules: Vec<String>, minify: bool) -> String {
    if minify {
        rules.join("")
    } else {
        rules.join("\n")
    }
}

fn indent_css_block(css: &str, spaces: usize) -> String {
    let padding = " ".repeat(spaces);
    css.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", padding, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
