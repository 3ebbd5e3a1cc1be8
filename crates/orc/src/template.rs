use std::collections::HashMap;

/// Substitutes `{text}` and each `{key}` in `kwargs` into `template`.
/// Unmatched placeholders are left as-is.
pub fn format_prompt(template: &str, text: &str, kwargs: &HashMap<String, String>) -> String {
    let mut out = template.replace("{text}", text);
    for (key, value) in kwargs {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
