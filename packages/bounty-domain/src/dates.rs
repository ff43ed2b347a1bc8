use std::ops::RangeInclusive;

use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const PADDED: &[BorrowedFormatItem<'_>] = format_description!("[month]/[day]/[year]");
const UNPADDED: &[BorrowedFormatItem<'_>] =
	format_description!("[month padding:none]/[day padding:none]/[year]");

/// Parses a `MM/DD/YYYY` date into the range running from that date to `now`.
///
/// Blank input, input that does not parse, and dates that are not in the past all yield `None`.
pub fn parse_date_range(raw: &str, now: OffsetDateTime) -> Option<RangeInclusive<OffsetDateTime>> {
	let raw = raw.trim();

	if raw.is_empty() {
		return None;
	}

	let date = Date::parse(raw, PADDED).or_else(|_| Date::parse(raw, UNPADDED)).ok()?;
	let start = date.midnight().assume_utc();

	(start < now).then(|| start..=now)
}
