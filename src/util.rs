//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Join a list for prompt/template text, or return `placeholder` when it is empty.
pub fn join_or(items: &[String], placeholder: &str) -> String {
  let items: Vec<&str> = items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
  if items.is_empty() { placeholder.to_string() } else { items.join(", ") }
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```).
/// Text without a fence is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
  let t = text.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  // Drop the info string ("json", "JSON", ...) up to the first newline.
  let body = match rest.find('\n') {
    Some(nl) => &rest[nl + 1..],
    None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
  };
  body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Upper-case the first character ("dinosaurs" -> "Dinosaurs").
pub fn capitalize(s: &str) -> String {
  let mut chars = s.trim().chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_json_fence() {
    let raw = "```json\n{\"title\": \"x\"}\n```";
    assert_eq!(strip_code_fence(raw), "{\"title\": \"x\"}");
  }

  #[test]
  fn strips_bare_fence_and_surrounding_whitespace() {
    let raw = "\n  ```\n{\"a\": 1}\n```  \n";
    assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
  }

  #[test]
  fn leaves_unfenced_text_alone() {
    assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
  }

  #[test]
  fn join_or_uses_placeholder_for_blank_lists() {
    assert_eq!(join_or(&[], "none"), "none");
    assert_eq!(join_or(&["  ".into()], "none"), "none");
    assert_eq!(join_or(&["a".into(), "b".into()], "none"), "a, b");
  }

  #[test]
  fn fill_template_replaces_all_keys() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "1"), ("b", "2")]);
    assert_eq!(out, "1 and 2 and 1");
  }

  #[test]
  fn trunc_respects_char_boundaries() {
    let out = trunc_for_log("ééééé", 3);
    assert!(out.starts_with('é'));
    assert!(out.ends_with("(10 bytes total)"));
  }
}
