//! Bounty listing: category scope, in-memory narrowing, manual pagination and preloading.

use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;

use bounty_domain::{
	dates, merged, pagination,
	params::{BountyParams, Category, RawBountyParams},
};
use bounty_storage::{
	models::{Author, Issue, Team, Tracker},
	queries::{self, BountyScope},
};

use crate::{
	BountyService, Result,
	views::{AuthorItem, BountyIssue, BountyTracker, IssueItem, LanguageItem, PersonItem, TeamItem},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BountyListing {
	pub issues: Vec<BountyIssue>,
	/// Matching issues before the page was sliced out.
	pub issues_total: usize,
	#[serde(skip)]
	pub page: u32,
	#[serde(skip)]
	pub per_page: u32,
}

impl BountyService {
	pub async fn list_bounties(&self, raw: &RawBountyParams) -> Result<BountyListing> {
		let params = BountyParams::normalize(raw, self.cfg.pagination.bounty_per_page);
		let mut issues = match params.category {
			Category::Crypto => {
				let bounties = queries::list_crypto_bounties(&self.db).await?;
				let issue_ids =
					merged::candidate_ids(bounties.iter().map(|bounty| bounty.issue_id));

				queries::list_bounty_issues(
					&self.db,
					BountyScope::Crypto { issue_ids: &issue_ids },
					params.order,
					params.direction,
				)
				.await?
			},
			Category::Fiat =>
				queries::list_bounty_issues(&self.db, BountyScope::Fiat, params.order, params.direction)
					.await?,
		};

		narrow(&mut issues, &params, OffsetDateTime::now_utc());
		self.filter_merged_issues(&mut issues).await?;

		let issues_total = issues.len();
		let page = pagination::paginate(issues, params.page, params.per_page);
		let issues = self.preload(page).await?;

		tracing::debug!(
			category = ?params.category,
			page = params.page,
			per_page = params.per_page,
			issues_total,
			"Listed bounties."
		);

		Ok(BountyListing { issues, issues_total, page: params.page, per_page: params.per_page })
	}

	/// Loads each association with one query for the whole page.
	async fn preload(&self, issues: Vec<Issue>) -> Result<Vec<BountyIssue>> {
		let issue_ids: Vec<i64> = issues.iter().map(|issue| issue.id).collect();
		let author_ids = merged::candidate_ids(issues.iter().filter_map(|issue| issue.author_id));
		let tracker_ids = merged::candidate_ids(issues.iter().map(|issue| issue.tracker_id));
		let addresses: HashMap<i64, String> = queries::issue_addresses_for(&self.db, &issue_ids)
			.await?
			.into_iter()
			.map(|address| (address.issue_id, address.public_address))
			.collect();
		let authors = queries::authors_by_ids(&self.db, &author_ids).await?;
		let person_ids =
			merged::candidate_ids(authors.iter().filter_map(|author| author.person_id));
		let people: HashMap<i64, PersonItem> = queries::people_by_ids(&self.db, &person_ids)
			.await?
			.into_iter()
			.map(|person| (person.id, PersonItem::from(person)))
			.collect();
		let authors: HashMap<i64, AuthorItem> = authors
			.into_iter()
			.map(|Author { id, login, person_id }| {
				let person = person_id.and_then(|person_id| people.get(&person_id).cloned());

				(id, AuthorItem { id, login, person })
			})
			.collect();
		let trackers = queries::trackers_by_ids(&self.db, &tracker_ids).await?;
		let trackers = self.tracker_associations(trackers).await?;

		Ok(issues
			.into_iter()
			.map(|issue| BountyIssue {
				issue_address: addresses.get(&issue.id).cloned(),
				author: issue.author_id.and_then(|id| authors.get(&id).cloned()),
				tracker: trackers.get(&issue.tracker_id).cloned(),
				issue: IssueItem::from(issue),
			})
			.collect())
	}

	async fn tracker_associations(
		&self,
		trackers: Vec<Tracker>,
	) -> Result<HashMap<i64, BountyTracker>> {
		let tracker_ids: Vec<i64> = trackers.iter().map(|tracker| tracker.id).collect();
		let team_ids = merged::candidate_ids(trackers.iter().filter_map(|tracker| tracker.team_id));
		let mut languages: HashMap<i64, Vec<LanguageItem>> = HashMap::new();

		for language in queries::languages_for_trackers(&self.db, &tracker_ids).await? {
			languages.entry(language.tracker_id).or_default().push(LanguageItem::from(language));
		}

		let teams: HashMap<i64, Team> = queries::teams_by_ids(&self.db, &team_ids)
			.await?
			.into_iter()
			.map(|team| (team.id, team))
			.collect();

		Ok(trackers
			.into_iter()
			.map(|tracker| {
				let team = tracker.team_id.and_then(|id| teams.get(&id).cloned()).map(TeamItem::from);
				let languages = languages.remove(&tracker.id).unwrap_or_default();

				(tracker.id, BountyTracker { tracker: tracker.into(), languages, team })
			})
			.collect())
	}
}

/// Applies the literal title filter and the optional `since` range, in memory.
fn narrow(issues: &mut Vec<Issue>, params: &BountyParams, now: OffsetDateTime) {
	if !params.is_wildcard() {
		issues.retain(|issue| issue.title.contains(params.query.as_str()));
	}

	if let Some(range) = params.since.as_deref().and_then(|raw| dates::parse_date_range(raw, now)) {
		issues.retain(|issue| range.contains(&issue.created_at));
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn issue(id: i64, title: &str, created_at: OffsetDateTime) -> Issue {
		Issue {
			id,
			tracker_id: 1,
			author_id: None,
			number: Some(id),
			title: title.to_string(),
			body: None,
			url: format!("https://github.com/foo/bar/issues/{id}"),
			state: "open".to_string(),
			bounty_total: 100.0,
			can_add_bounty: true,
			participants_count: 0,
			thumbs_up_count: 0,
			backers_count: 0,
			comments_count: 0,
			earliest_bounty: None,
			remote_created_at: None,
			created_at,
			updated_at: created_at,
		}
	}

	fn params(search: Option<&str>, since: Option<&str>) -> BountyParams {
		BountyParams::normalize(
			&RawBountyParams {
				search: search.map(str::to_string),
				since: since.map(str::to_string),
				..RawBountyParams::default()
			},
			20,
		)
	}

	#[test]
	fn title_filter_is_case_sensitive_containment() {
		let at = datetime!(2024-01-01 00:00 UTC);
		let mut issues =
			vec![issue(1, "Fix Crash", at), issue(2, "fix crash", at), issue(3, "Crash", at)];

		narrow(&mut issues, &params(Some("Crash"), None), at);

		assert_eq!(issues.iter().map(|issue| issue.id).collect::<Vec<_>>(), vec![1, 3]);
	}

	#[test]
	fn wildcard_keeps_everything() {
		let at = datetime!(2024-01-01 00:00 UTC);
		let mut issues = vec![issue(1, "a", at), issue(2, "b", at)];

		narrow(&mut issues, &params(None, None), at);

		assert_eq!(issues.len(), 2);
	}

	#[test]
	fn since_keeps_issues_created_inside_range() {
		let now = datetime!(2024-06-01 00:00 UTC);
		let mut issues = vec![
			issue(1, "old", datetime!(2023-12-31 23:59 UTC)),
			issue(2, "new", datetime!(2024-03-01 00:00 UTC)),
		];

		narrow(&mut issues, &params(None, Some("01/01/2024")), now);

		assert_eq!(issues.iter().map(|issue| issue.id).collect::<Vec<_>>(), vec![2]);
	}

	#[test]
	fn malformed_since_is_ignored() {
		let now = datetime!(2024-06-01 00:00 UTC);
		let mut issues = vec![issue(1, "old", datetime!(2020-01-01 00:00 UTC))];

		narrow(&mut issues, &params(None, Some("2024-01-01")), now);

		assert_eq!(issues.len(), 1);
	}

	#[test]
	fn title_filter_keeps_surrounding_whitespace() {
		let at = datetime!(2024-01-01 00:00 UTC);
		let mut issues =
			vec![issue(1, "Crash on boot", at), issue(2, "Boot Crash", at), issue(3, "  ", at)];

		narrow(&mut issues, &params(Some(" Crash"), None), at);

		assert_eq!(issues.iter().map(|issue| issue.id).collect::<Vec<_>>(), vec![2]);

		let mut issues = vec![issue(1, "Crash", at), issue(2, "two  spaces", at)];

		narrow(&mut issues, &params(Some("  "), None), at);

		assert_eq!(issues.iter().map(|issue| issue.id).collect::<Vec<_>>(), vec![2]);
	}
}
