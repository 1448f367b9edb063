//! Screen naming: class, layout, and resource identifiers derived from screen names.

/// Java keywords and literals that cannot be used as identifiers.
pub(crate) const JAVA_RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Names derived for one screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenNames {
    /// Activity class, e.g. `SettingsActivity`
    pub class_name: String,
    /// Layout resource name without extension, e.g. `activity_settings`
    pub layout: String,
}

impl ScreenNames {
    pub fn from_screen_name(name: &str) -> Self {
        let pascal = to_pascal_case(name);
        let base = pascal.strip_suffix("Activity").unwrap_or(&pascal);
        let base = if base.is_empty() { "Screen" } else { base };
        Self {
            class_name: format!("{}Activity", base),
            layout: format!("activity_{}", to_snake_case(base)),
        }
    }
}

/// `"user settings"` -> `"UserSettings"`. Words keep their inner casing.
pub(crate) fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for word in input.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "Screen");
    }
    out
}

/// `"UserSettings"` -> `"user_settings"`
pub(crate) fn to_snake_case(input: &str) -> String {
    let mut out = String::new();
    for (i, c) in input.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn is_java_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !JAVA_RESERVED.contains(&s)
}
