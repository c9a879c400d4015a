//! Trim comma-separated prompts to the token budget.

/// Separator between prompt segments.
pub const SEPARATOR: &str = ", ";

/// Keep the longest prefix of `", "`-separated parts that `fits`.
///
/// Parts are added in order while `accumulated + ", " + part` still fits; the
/// first part that would overflow is dropped with everything after it. The
/// first part is always kept, even when it alone exceeds the budget.
pub fn truncate_to_fit(text: &str, fits: impl Fn(&str) -> bool) -> String {
    let mut parts = text.split(SEPARATOR);
    let mut kept = parts.next().unwrap_or_default().to_string();

    for part in parts {
        let candidate = format!("{kept}{SEPARATOR}{part}");
        if !fits(&candidate) {
            break;
        }
        kept = candidate;
    }
    kept
}
