use std::future::Future;

use uuid::Uuid;

use crate::errors::AppError;

const MAX_SUFFIX: u32 = 100;

/// Slug for `text`, or `fallback` when nothing slug-worthy is left.
pub fn slug_or(text: &str, fallback: &str) -> String {
    let slug = slug::slugify(text);
    if slug.is_empty() { fallback.to_string() } else { slug }
}

/// First free slug among `base`, `base-2`, `base-3`, ...
pub async fn unique_slug<F, Fut>(base: &str, exists: F) -> Result<String, AppError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    if !exists(base.to_string()).await? {
        return Ok(base.to_string());
    }
    for n in 2..=MAX_SUFFIX {
        let candidate = format!("{base}-{n}");
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }
    let short_id = Uuid::new_v4().simple().to_string();
    Ok(format!("{base}-{}", &short_id[..8]))
}

/// Explicit slugs are never rewritten: a taken one is a conflict.
pub async fn claim_explicit_slug<F, Fut>(slug: &str, exists: F, what: &str) -> Result<String, AppError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    if exists(slug.to_string()).await? {
        Err(AppError::Conflict(format!("A {what} with the slug '{slug}' already exists")))
    } else {
        Ok(slug.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn taken_slugs_get_numeric_suffixes() {
        let taken = ["intro", "intro-2"];
        let slug = unique_slug("intro", |s| async move { Ok(taken.contains(&s.as_str())) }).await.unwrap();
        assert_eq!(slug, "intro-3");

        let free = unique_slug("fresh", |_| async { Ok(false) }).await.unwrap();
        assert_eq!(free, "fresh");
    }

    #[tokio::test]
    async fn explicit_slug_conflicts_instead_of_suffixing() {
        let err = claim_explicit_slug("intro", |_| async { Ok(true) }, "post").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn symbol_only_titles_fall_back() {
        assert_eq!(slug_or("Hello, World!", "post"), "hello-world");
        assert_eq!(slug_or("!!!", "post"), "post");
    }
}
