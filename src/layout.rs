//! Relative paths of export records.
//!
//! Paths are derived deterministically from names, so two runs over the same
//! project write the same files. Collisions between distinct intents that
//! sanitize to the same stem are the caller's responsibility.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Directory holding intent and utterance files.
pub const INTENTS_DIR: &str = "intents";
/// Directory holding entity and entity-entry files.
pub const ENTITIES_DIR: &str = "entities";
/// Agent settings file.
pub const AGENT_FILE: &str = "agent.json";
/// Archive version file.
pub const PACKAGE_FILE: &str = "package.json";
/// Stem used for intents without a name.
pub const UNNAMED_INTENT_STEM: &str = "welcome";

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("sanitize pattern is valid"))
}

/// Replace every run of characters outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize(segment: &str) -> String {
    unsafe_chars().replace_all(segment.trim(), "_").into_owned()
}

/// File stem shared by an intent record and its utterance file.
pub fn intent_stem(intent_name: &str, node_name: &str) -> String {
    let intent = match sanitize(intent_name) {
        s if s.is_empty() => UNNAMED_INTENT_STEM.to_string(),
        s => s,
    };
    format!("{}_{}", intent, sanitize(node_name))
}

/// Path of an intent record.
pub fn intent_path(stem: &str) -> String {
    format!("{INTENTS_DIR}/{stem}.json")
}

/// Path of the utterance file belonging to the intent with `stem`.
pub fn utterances_path(stem: &str, language: &str) -> String {
    format!("{INTENTS_DIR}/{stem}_usersays_{}.json", sanitize(language))
}

/// Path of an entity definition.
pub fn entity_path(entity_name: &str) -> String {
    format!("{ENTITIES_DIR}/{}.json", sanitize(entity_name))
}

/// Path of an entity's data rows.
pub fn entity_entries_path(entity_name: &str, language: &str) -> String {
    format!("{ENTITIES_DIR}/{}_entries_{}.json", sanitize(entity_name), sanitize(language))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("order pizza"), "order_pizza");
        assert_eq!(sanitize("  a/b\\c  "), "a_b_c");
        assert_eq!(sanitize("ok-name_1"), "ok-name_1");
        assert_eq!(sanitize("../../etc"), "_etc");
    }

    #[test]
    fn test_intent_paths() {
        let stem = intent_stem("order pizza", "Ask size");
        assert_eq!(stem, "order_pizza_Ask_size");
        assert_eq!(intent_path(&stem), "intents/order_pizza_Ask_size.json");
        assert_eq!(utterances_path(&stem, "en"), "intents/order_pizza_Ask_size_usersays_en.json");
    }

    #[test]
    fn test_unnamed_intent_stem() {
        assert_eq!(intent_stem("", "m1"), "welcome_m1");
    }

    #[test]
    fn test_entity_paths() {
        assert_eq!(entity_path("travel mode"), "entities/travel_mode.json");
        assert_eq!(entity_entries_path("travel mode", "en"), "entities/travel_mode_entries_en.json");
    }
}
