pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_teams.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_teams.sql")),
				"tables/002_people.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_people.sql")),
				"tables/003_authors.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_authors.sql")),
				"tables/004_languages.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_languages.sql")),
				"tables/005_trackers.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_trackers.sql")),
				"tables/006_tracker_languages.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_tracker_languages.sql")),
				"tables/007_issues.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_issues.sql")),
				"tables/008_issue_addresses.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_issue_addresses.sql")),
				"tables/009_crypto_bounties.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_crypto_bounties.sql")),
				"tables/010_merged_models.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_merged_models.sql")),
				"tables/011_searches.sql" =>
					out.push_str(include_str!("../../../sql/tables/011_searches.sql")),
				"tables/012_background_jobs.sql" =>
					out.push_str(include_str!("../../../sql/tables/012_background_jobs.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
