use regex::Regex;

/// Number of id characters appended to a slug.
const ID_PREFIX_LEN: usize = 8;

/// Builds the public slug for a project.
///
/// The title is lowercased and every character outside `[a-z0-9]` becomes
/// `-`. The first eight characters of `id` are appended after another `-`,
/// which keeps slugs unique across projects with the same title.
#[must_use]
pub fn slugify(title: &str, id: &str) -> String {
    let lower = title.to_lowercase();
    let base = match Regex::new("[^a-z0-9]") {
        Ok(re) => re.replace_all(&lower, "-").into_owned(),
        Err(_) => lower
            .chars()
            .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
            .collect(),
    };
    let suffix: String = id.chars().take(ID_PREFIX_LEN).collect();
    format!("{base}-{suffix}")
}
