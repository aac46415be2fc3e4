//! Utility class combining.
//!
//! [`cn!`](crate::cn) flattens strings, conditionals, options and lists into
//! one class string, then resolves conflicting utility classes so the last
//! one wins (`"p-1 p-2"` becomes `"p-2"`, `"px-2 p-4"` becomes `"p-4"`).

use std::collections::HashSet;

/// Anything that can contribute class names
#[derive(Clone, Debug, PartialEq)]
pub enum ClassValue<'a> {
    Str(&'a str),
    /// Included only when the flag is set
    Cond(&'a str, bool),
    List(Vec<ClassValue<'a>>),
    Empty,
}

impl<'a> From<&'a str> for ClassValue<'a> {
    fn from(s: &'a str) -> Self {
        ClassValue::Str(s)
    }
}

impl<'a> From<&'a String> for ClassValue<'a> {
    fn from(s: &'a String) -> Self {
        ClassValue::Str(s)
    }
}

impl<'a, T: Into<ClassValue<'a>>> From<Option<T>> for ClassValue<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(ClassValue::Empty, Into::into)
    }
}

impl<'a> From<(&'a str, bool)> for ClassValue<'a> {
    fn from((s, on): (&'a str, bool)) -> Self {
        ClassValue::Cond(s, on)
    }
}

impl<'a, T: Into<ClassValue<'a>>> From<Vec<T>> for ClassValue<'a> {
    fn from(values: Vec<T>) -> Self {
        ClassValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<'a> ClassValue<'a> {
    fn collect_tokens(&self, out: &mut Vec<&'a str>) {
        match self {
            ClassValue::Str(s) | ClassValue::Cond(s, true) => out.extend(s.split_whitespace()),
            ClassValue::List(values) => values.iter().for_each(|v| v.collect_tokens(out)),
            ClassValue::Cond(_, false) | ClassValue::Empty => {}
        }
    }
}

/// Combine class values into a single merged class string
#[macro_export]
macro_rules! cn {
    ($($value:expr),* $(,)?) => {
        $crate::utils::class_names(&[$($crate::utils::ClassValue::from($value)),*])
    };
}

pub fn class_names(values: &[ClassValue<'_>]) -> String {
    let mut tokens = Vec::new();
    for value in values {
        value.collect_tokens(&mut tokens);
    }
    merge(&tokens)
}

/// Keep the last class of every conflict group, and the first occurrence of
/// identical classes counted from the end
fn merge(tokens: &[&str]) -> String {
    let mut taken: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(tokens.len());

    for token in tokens.iter().rev() {
        let parsed = ParsedClass::parse(token);
        let prefix = format!("{}{}", parsed.modifiers, if parsed.important { "!" } else { "" });
        let key = match parsed.group {
            Some(group) => format!("{prefix}{group}"),
            None => format!("{prefix}={}", parsed.base),
        };
        if taken.contains(&key) {
            continue;
        }
        taken.insert(key);
        if let Some(group) = parsed.group {
            for conflict in conflicting_groups(group) {
                taken.insert(format!("{prefix}{conflict}"));
            }
        }
        kept.push(*token);
    }

    kept.reverse();
    kept.join(" ")
}

struct ParsedClass<'a> {
    /// Sorted variant prefix such as `hover:md:`
    modifiers: String,
    important: bool,
    base: &'a str,
    group: Option<&'static str>,
}

impl<'a> ParsedClass<'a> {
    fn parse(token: &'a str) -> Self {
        let mut variants = Vec::new();
        let mut depth = 0i32;
        let mut start = 0;
        for (i, c) in token.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth -= 1,
                ':' if depth == 0 => {
                    variants.push(&token[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        variants.sort_unstable();
        let modifiers: String = variants.iter().map(|v| format!("{v}:")).collect();

        let mut base = &token[start..];
        let mut important = false;
        if let Some(rest) = base.strip_prefix('!') {
            base = rest;
            important = true;
        } else if let Some(rest) = base.strip_suffix('!') {
            base = rest;
            important = true;
        }

        let group = class_group(base.strip_prefix('-').unwrap_or(base));
        Self {
            modifiers,
            important,
            base,
            group,
        }
    }
}

const FONT_SIZES: &[&str] = &[
    "xs", "sm", "base", "lg", "xl", "2xl", "3xl", "4xl", "5xl", "6xl", "7xl", "8xl", "9xl",
];
const FONT_WEIGHTS: &[&str] = &[
    "thin", "extralight", "light", "normal", "medium", "semibold", "bold", "extrabold", "black",
];
const TEXT_ALIGN: &[&str] = &["left", "center", "right", "justify", "start", "end"];
const BORDER_STYLES: &[&str] = &["solid", "dashed", "dotted", "double", "hidden", "none"];
const DISPLAY: &[&str] = &[
    "block", "inline-block", "inline", "flex", "inline-flex", "grid", "inline-grid", "table", "contents", "hidden",
];
const POSITION: &[&str] = &["static", "fixed", "absolute", "relative", "sticky"];

/// Spacing, sizing and other prefixed utilities: (prefix, group)
const PREFIXED: &[(&str, &str)] = &[
    ("px-", "px"),
    ("py-", "py"),
    ("pt-", "pt"),
    ("pr-", "pr"),
    ("pb-", "pb"),
    ("pl-", "pl"),
    ("ps-", "ps"),
    ("pe-", "pe"),
    ("p-", "p"),
    ("mx-", "mx"),
    ("my-", "my"),
    ("mt-", "mt"),
    ("mr-", "mr"),
    ("mb-", "mb"),
    ("ml-", "ml"),
    ("ms-", "ms"),
    ("me-", "me"),
    ("m-", "m"),
    ("min-w-", "min-w"),
    ("max-w-", "max-w"),
    ("min-h-", "min-h"),
    ("max-h-", "max-h"),
    ("size-", "size"),
    ("w-", "w"),
    ("h-", "h"),
    ("gap-x-", "gap-x"),
    ("gap-y-", "gap-y"),
    ("gap-", "gap"),
    ("opacity-", "opacity"),
    ("z-", "z"),
    ("items-", "align-items"),
    ("justify-", "justify-content"),
    ("cursor-", "cursor"),
    ("overflow-", "overflow"),
    ("leading-", "leading"),
    ("tracking-", "tracking"),
    ("bg-", "bg-color"),
];

fn class_group(base: &str) -> Option<&'static str> {
    if DISPLAY.contains(&base) {
        return Some("display");
    }
    if POSITION.contains(&base) {
        return Some("position");
    }
    match base {
        "italic" | "not-italic" => return Some("font-style"),
        "underline" | "overline" | "line-through" | "no-underline" => return Some("text-decoration"),
        "uppercase" | "lowercase" | "capitalize" | "normal-case" => return Some("text-transform"),
        "flex-row" | "flex-row-reverse" | "flex-col" | "flex-col-reverse" => return Some("flex-direction"),
        "border" => return Some("border-w"),
        "rounded" => return Some("rounded"),
        "shadow" => return Some("shadow"),
        _ => {}
    }

    if let Some(value) = base.strip_prefix("text-") {
        return Some(if FONT_SIZES.contains(&value) || is_arbitrary_length(value) {
            "font-size"
        } else if TEXT_ALIGN.contains(&value) {
            "text-align"
        } else {
            "text-color"
        });
    }
    if let Some(value) = base.strip_prefix("font-") {
        return Some(if FONT_WEIGHTS.contains(&value) {
            "font-weight"
        } else {
            "font-family"
        });
    }
    if let Some(value) = base.strip_prefix("border-") {
        return Some(if value.starts_with(|c: char| c.is_ascii_digit()) {
            "border-w"
        } else if BORDER_STYLES.contains(&value) {
            "border-style"
        } else {
            "border-color"
        });
    }
    if base.starts_with("rounded-") {
        return Some("rounded");
    }
    if base.starts_with("shadow-") {
        return Some("shadow");
    }

    PREFIXED
        .iter()
        .find(|(prefix, _)| base.starts_with(prefix))
        .map(|(_, group)| *group)
}

fn is_arbitrary_length(value: &str) -> bool {
    value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .is_some_and(|v| v.ends_with("px") || v.ends_with("rem") || v.ends_with("em"))
}

/// Groups a class of `group` overrides when it comes later
fn conflicting_groups(group: &str) -> &'static [&'static str] {
    match group {
        "p" => &["px", "py", "pt", "pr", "pb", "pl", "ps", "pe"],
        "px" => &["pr", "pl", "ps", "pe"],
        "py" => &["pt", "pb"],
        "m" => &["mx", "my", "mt", "mr", "mb", "ml", "ms", "me"],
        "mx" => &["mr", "ml", "ms", "me"],
        "my" => &["mt", "mb"],
        "size" => &["w", "h"],
        "gap" => &["gap-x", "gap-y"],
        _ => &[],
    }
}
