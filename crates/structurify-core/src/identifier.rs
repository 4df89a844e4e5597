use std::collections::HashMap;

/// Whether `s` is safe to emit unquoted as a Mermaid identifier: `[A-Za-z0-9_]+`.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Drop every character outside `[A-Za-z0-9_]`. May return an empty string.
pub fn strip_identifier(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Per-plan table that turns model-supplied identifiers into safe ones.
///
/// Declarations go through [`IdentifierMap::declare`], which records the
/// original trimmed text so later references (`from`/`to`) spelled the same
/// way resolve to the same sanitized id, even when stripping alone would not
/// reproduce it (fallback ids, reserved words).
#[derive(Debug)]
pub struct IdentifierMap {
    prefix: &'static str,
    reserved: &'static [&'static str],
    leading_letter: bool,
    counter: usize,
    by_original: HashMap<String, String>,
    declared: Vec<String>,
}

impl IdentifierMap {
    /// `prefix` names fallback ids (`node` gives `node_0`, `node_1`, ...).
    /// `reserved` lists lowercase keywords of the target grammar.
    pub fn new(prefix: &'static str, reserved: &'static [&'static str]) -> Self {
        Self {
            prefix,
            reserved,
            leading_letter: false,
            counter: 0,
            by_original: HashMap::new(),
            declared: Vec::new(),
        }
    }

    /// Ids must start with a letter or `_`; others get `{prefix}_` in front
    /// (`1` becomes `entity_1`).
    pub fn with_leading_letter(mut self) -> Self {
        self.leading_letter = true;
        self
    }

    /// Sanitize a declared element id and remember it.
    pub fn declare(&mut self, raw: &str) -> String {
        let original = raw.trim();
        let id = match self.clean(original) {
            Some(id) => id,
            None => self.fallback(),
        };
        self.by_original.insert(original.to_string(), id.clone());
        self.declared.push(id.clone());
        id
    }

    /// Resolve a reference to a declared element, or `None` if it dangles.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let original = raw.trim();
        if let Some(id) = self.by_original.get(original) {
            return Some(id.clone());
        }
        let id = self.clean(original)?;
        self.is_declared(&id).then_some(id)
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.declared.iter().any(|d| d == id)
    }

    fn clean(&self, original: &str) -> Option<String> {
        let mut id = strip_identifier(original);
        if id.is_empty() {
            return None;
        }
        if self.leading_letter && !id.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
            id = format!("{}_{id}", self.prefix);
        }
        if self.reserved.contains(&id.to_ascii_lowercase().as_str()) {
            id.push('_');
        }
        Some(id)
    }

    fn fallback(&mut self) -> String {
        loop {
            let candidate = format!("{}_{}", self.prefix, self.counter);
            self.counter += 1;
            if !self.is_declared(&candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_spaces() {
        assert_eq!(strip_identifier("check user!"), "checkuser");
        assert_eq!(strip_identifier("a-b.c_d"), "abc_d");
        assert_eq!(strip_identifier("\"quoted\""), "quoted");
        assert_eq!(strip_identifier("!!!"), "");
    }

    #[test]
    fn is_identifier_rejects_empty_and_symbols() {
        assert!(is_identifier("Node_1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier("ünïcode"));
    }

    #[test]
    fn references_follow_the_original_spelling() {
        let mut map = IdentifierMap::new("node", &[]);
        assert_eq!(map.declare(" check user! "), "checkuser");
        assert_eq!(map.resolve("check user!").as_deref(), Some("checkuser"));
        assert_eq!(map.resolve("checkuser").as_deref(), Some("checkuser"));
        assert_eq!(map.resolve("check-user").as_deref(), Some("checkuser"));
        assert_eq!(map.resolve("other"), None);
    }

    #[test]
    fn empty_ids_get_sequential_fallbacks() {
        let mut map = IdentifierMap::new("node", &[]);
        assert_eq!(map.declare("???"), "node_0");
        assert_eq!(map.declare(""), "node_1");
        assert_eq!(map.resolve("???").as_deref(), Some("node_0"));
    }

    #[test]
    fn fallback_skips_ids_already_declared() {
        let mut map = IdentifierMap::new("node", &[]);
        map.declare("node_0");
        assert_eq!(map.declare("%%"), "node_1");
    }

    #[test]
    fn reserved_words_get_a_suffix() {
        let mut map = IdentifierMap::new("node", &["end"]);
        assert_eq!(map.declare("end"), "end_");
        assert_eq!(map.declare("End"), "End_");
        assert_eq!(map.resolve("end").as_deref(), Some("end_"));
        // Already suffixed ids are stable.
        assert_eq!(map.declare("end_"), "end_");
    }

    #[test]
    fn leading_digits_get_the_prefix() {
        let mut map = IdentifierMap::new("entity", &[]).with_leading_letter();
        assert_eq!(map.declare("1"), "entity_1");
        assert_eq!(map.declare("2 fa"), "entity_2fa");
        assert_eq!(map.declare("_x"), "_x");
        assert_eq!(map.resolve("1").as_deref(), Some("entity_1"));
        assert_eq!(map.declare("entity_1"), "entity_1");
    }
}
