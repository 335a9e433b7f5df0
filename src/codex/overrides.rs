//! `-c key=value` configuration override strings for the agent binary.
//!
//! Overrides are opaque to the delegator and forwarded verbatim; the two it
//! composes itself are `model=` and `model_reasoning_effort=`, with values
//! quoted as TOML strings.

/// Quote a value as a TOML string literal (JSON string quoting is a valid
/// TOML string encoding).
pub fn toml_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

/// Compose the override list for one agent invocation.
///
/// Order is fixed: model override, then caller-supplied overrides verbatim,
/// then the reasoning-effort override. Blank inputs contribute nothing, so
/// an all-empty call yields an empty list.
pub fn build_config_overrides(
    model: Option<&str>,
    caller_overrides: &[String],
    reasoning_effort: Option<&str>,
) -> Vec<String> {
    let mut overrides = Vec::new();

    if let Some(model) = model.map(str::trim).filter(|m| !m.is_empty()) {
        overrides.push(format!("model={}", toml_string(model)));
    }

    overrides.extend(caller_overrides.iter().cloned());

    if let Some(effort) = reasoning_effort.map(str::trim).filter(|e| !e.is_empty()) {
        overrides.push(format!("model_reasoning_effort={}", toml_string(effort)));
    }

    overrides
}

/// Whether a caller override list already sets `setting`.
pub fn has_override(caller_overrides: &[String], setting: &str) -> bool {
    caller_overrides
        .iter()
        .any(|o| o.split('=').next().map(str::trim) == Some(setting))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_yield_no_overrides() {
        assert!(build_config_overrides(None, &[], None).is_empty());
        assert!(build_config_overrides(Some("  "), &[], Some("")).is_empty());
    }

    #[test]
    fn order_is_model_then_caller_then_effort() {
        let caller = vec!["sandbox_permissions=disk-full-read".to_string()];
        let overrides = build_config_overrides(Some("gpt-5"), &caller, Some("high"));
        assert_eq!(
            overrides,
            vec![
                "model=\"gpt-5\"".to_string(),
                "sandbox_permissions=disk-full-read".to_string(),
                "model_reasoning_effort=\"high\"".to_string(),
            ]
        );
    }

    #[test]
    fn values_are_toml_quoted() {
        let overrides = build_config_overrides(Some("weird \"model\""), &[], None);
        assert_eq!(overrides, vec!["model=\"weird \\\"model\\\"\"".to_string()]);
    }

    #[test]
    fn has_override_matches_setting_names() {
        let caller = vec!["model_reasoning_effort=\"low\"".to_string()];
        assert!(has_override(&caller, "model_reasoning_effort"));
        assert!(!has_override(&caller, "model"));
    }
}
