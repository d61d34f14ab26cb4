//! The persona sent as system prompt with every request.

const TEMPLATE: &str = include_str!("./system_prompt.md");

/// Used in the persona when no display name is set.
pub const DEFAULT_USER_NAME: &str = "friend";

/// Renders the persona for the given display name.
pub fn system_prompt(display_name: Option<&str>) -> String {
    TEMPLATE.replace("{{USER_NAME}}", display_name.unwrap_or(DEFAULT_USER_NAME))
}
