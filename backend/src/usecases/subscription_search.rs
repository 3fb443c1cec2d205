use crates::domain::value_objects::subscriptions::SubscriptionDetailDto;

/// Normalizes the `search` query value; blank input means no search.
pub fn normalize_search(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

/// Case-insensitive substring match over the store name, applied after the
/// controller's own filtering.
pub fn filter_by_store_name(
    subscriptions: Vec<SubscriptionDetailDto>,
    search: Option<&str>,
) -> Vec<SubscriptionDetailDto> {
    let Some(needle) = normalize_search(search) else {
        return subscriptions;
    };

    subscriptions
        .into_iter()
        .filter(|subscription| subscription.store_name.to_lowercase().contains(&needle))
        .collect()
}
