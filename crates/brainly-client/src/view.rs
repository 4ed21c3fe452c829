use brainly_types::api::ContentItem;
use brainly_types::models::ContentType;

/// Client-side type filter over an already fetched list. `None` keeps
/// everything.
pub fn filter_by_type(items: &[ContentItem], kind: Option<ContentType>) -> Vec<&ContentItem> {
    items
        .iter()
        .filter(|item| kind.is_none_or(|k| item.kind == k))
        .collect()
}

/// Item count per content type, in sidebar order.
pub fn type_counts(items: &[ContentItem]) -> Vec<(ContentType, usize)> {
    ContentType::ALL
        .into_iter()
        .map(|kind| (kind, items.iter().filter(|i| i.kind == kind).count()))
        .collect()
}

/// Public URL of the shared view for `hash`.
pub fn share_url(origin: &str, hash: &str) -> String {
    format!("{}/share/{}", origin.trim_end_matches('/'), hash)
}

/// Hash named by a share reference: either the bare hash or a link ending in
/// it, as printed by [`share_url`].
pub fn share_hash(reference: &str) -> &str {
    let path = reference
        .trim()
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}
