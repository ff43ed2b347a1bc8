use bounty_domain::ranking::{BoostBy, FieldWeight, IndexQuery, MatchMode, Sort};
use bounty_storage::{
	index::{ATTR_BOUNTY_TOTAL, ATTR_FORKS, ATTR_WATCHERS, FIELD_NAME, IndexKind},
	queries,
};

use crate::{BountyService, Result, views::TrackerItem};

impl BountyService {
	/// Trackers whose name words start with the query, best match first.
	pub async fn tracker_typeahead(&self, query: &str) -> Result<Vec<TrackerItem>> {
		let index_query = typeahead_query(query.trim(), self.cfg.search.typeahead_limit);
		let hits = self
			.index
			.search(IndexKind::Trackers, &index_query, self.cfg.search.candidate_k)
			.await?;
		let ids: Vec<i64> = hits.iter().map(|hit| hit.id).collect();
		let mut trackers = queries::trackers_by_ids(&self.db, &ids).await?;

		self.filter_merged_trackers(&mut trackers).await?;

		Ok(trackers.into_iter().map(TrackerItem::from).collect())
	}
}

pub fn typeahead_query(text: &str, limit: u32) -> IndexQuery {
	IndexQuery {
		text: text.to_string(),
		fields: vec![FieldWeight::new(FIELD_NAME, 1.0)],
		boost_by: vec![BoostBy::new(ATTR_FORKS, 1.0), BoostBy::new(ATTR_WATCHERS, 1.0)],
		order: vec![Sort::score_desc(), Sort::field_desc(ATTR_BOUNTY_TOTAL)],
		match_mode: MatchMode::WordStart,
		limit,
	}
}
