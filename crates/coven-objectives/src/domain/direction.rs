//! Movement direction normalization.

/// Normalizes a movement token to a bare lower-case direction.
///
/// `"ArrowUp"` becomes `"up"`, WASD keys map to `up`/`left`/`down`/`right`,
/// and any other token is trimmed and lower-cased unchanged.
#[must_use]
pub fn normalize_direction(token: &str) -> String {
    let lowered = token.trim().to_lowercase();
    let bare = lowered.strip_prefix("arrow").unwrap_or(&lowered);
    match bare {
        "w" => "up".to_owned(),
        "a" => "left".to_owned(),
        "s" => "down".to_owned(),
        "d" => "right".to_owned(),
        other => other.to_owned(),
    }
}
