/// Extract JSON from text that may be wrapped in markdown code fences or prose.
///
/// Returns `None` when nothing JSON-like is present.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    // A bare object may itself contain fences inside string values.
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }
    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return non_empty(after_fence[..end].trim());
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            // Drop an info string such as `JSON` on the opening fence line.
            let body = after_fence[..end].trim_start_matches(|c: char| c.is_ascii_alphanumeric());
            return non_empty(body.trim());
        }
    }
    // Best effort: the outermost object embedded in prose.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}
