//! Naming conventions for accessors and support methods.

pub const GET_PREFIX: &str = "get";
pub const IS_PREFIX: &str = "is";
pub const HIDE_PREFIX: &str = "hide";
pub const DISABLE_PREFIX: &str = "disable";
pub const VALIDATE_PREFIX: &str = "validate";
pub const DEFAULT_PREFIX: &str = "default";
pub const CHOICES_PREFIX: &str = "choices";

/// Prefixes of member support methods (`hideName`, `default0PlaceOrder`, ...).
pub const MEMBER_SUPPORT_PREFIXES: &[&str] = &[
    HIDE_PREFIX,
    DISABLE_PREFIX,
    VALIDATE_PREFIX,
    DEFAULT_PREFIX,
    CHOICES_PREFIX,
];

pub const TITLE_METHOD: &str = "title";
pub const ICON_NAME_METHOD: &str = "iconName";
pub const CSS_CLASS_METHOD: &str = "cssClass";

pub const OBJECT_SUPPORT_METHODS: &[&str] = &[TITLE_METHOD, ICON_NAME_METHOD, CSS_CLASS_METHOD];

pub const LIFECYCLE_METHODS: &[&str] = &[
    "created",
    "loaded",
    "persisting",
    "persisted",
    "updating",
    "updated",
    "removing",
];

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `firstName` → `First Name`, `placeOrder` → `Place Order`.
pub fn natural_name(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 4);
    let mut prev_lower = false;
    for (i, c) in id.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else if c.is_uppercase() && prev_lower {
            out.push(' ');
            out.push(c);
        } else {
            out.push(c);
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }
    out
}

/// Strips `prefix` when followed by an uppercase letter: `("getName", "get")` → `Name`.
pub fn strip_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    rest.chars()
        .next()
        .filter(|c| c.is_uppercase())
        .map(|_| rest)
}

/// Property id of a getter: `getName` → `name`, `isActive` → `active`.
pub fn accessor_id(name: &str) -> Option<String> {
    strip_prefix(name, GET_PREFIX)
        .or_else(|| strip_prefix(name, IS_PREFIX))
        .map(decapitalize)
}

/// Whether the name follows a support-method convention for some member.
pub fn is_support_method_name(name: &str) -> bool {
    if OBJECT_SUPPORT_METHODS.contains(&name) || LIFECYCLE_METHODS.contains(&name) {
        return true;
    }
    MEMBER_SUPPORT_PREFIXES.iter().any(|prefix| {
        name.strip_prefix(prefix).is_some_and(|rest| {
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            rest.chars().next().is_some_and(|c| c.is_uppercase())
        })
    })
}
