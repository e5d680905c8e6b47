/// Normalize a display name into the slug used across DefiLlama URLs and
/// dataset joins: lowercase, spaces become `-`, apostrophes are dropped.
pub fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace('\'', "")
}
