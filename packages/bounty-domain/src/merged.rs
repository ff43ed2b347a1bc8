use std::collections::HashSet;

/// Distinct ids in first-seen order, ready to probe against the merged-record table.
pub fn candidate_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
	let ids = ids.into_iter();
	let mut seen = HashSet::with_capacity(ids.size_hint().0);

	ids.filter(|id| seen.insert(*id)).collect()
}

/// Drops every item whose extracted id was merged away, keeping the order of the rest.
pub fn reject_merged<T, F>(items: &mut Vec<T>, bad_ids: &HashSet<i64>, id_of: F)
where
	F: Fn(&T) -> i64,
{
	if bad_ids.is_empty() {
		return;
	}

	items.retain(|item| !bad_ids.contains(&id_of(item)));
}
