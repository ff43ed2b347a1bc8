use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::params::{DEFAULT_PAGE, DEFAULT_PER_PAGE, positive_or};

pub const TOTAL_ITEMS_HEADER: &str = "total-items";
pub const TOTAL_PAGES_HEADER: &str = "total-pages";

/// Number of leading items a page skips. Pages at or below 1 skip nothing.
pub fn offset(page: u32, per_page: u32) -> usize {
	(page.max(1) as usize - 1).saturating_mul(per_page as usize)
}

/// Keeps the `page`-th window of `per_page` items.
pub fn paginate<T>(items: Vec<T>, page: u32, per_page: u32) -> Vec<T> {
	items.into_iter().skip(offset(page, per_page)).take(per_page as usize).collect()
}

pub fn total_pages(total_items: u64, per_page: u32) -> u64 {
	if per_page == 0 {
		return 0;
	}

	total_items.div_ceil(u64::from(per_page))
}

/// Paging details of one paginated response, as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
	pub page: u32,
	pub per_page: u32,
	pub total_items: Option<String>,
	pub total_pages: Option<String>,
}
impl PaginationMeta {
	/// Reads the echoed request parameters and the count headers of a response.
	///
	/// Header names are matched case-insensitively. Count headers are passed through verbatim.
	pub fn extract<'a, I>(params: &HashMap<String, String>, headers: I) -> Self
	where
		I: IntoIterator<Item = (&'a str, &'a str)>,
	{
		let mut total_items = None;
		let mut total_pages = None;

		for (name, value) in headers {
			if name.eq_ignore_ascii_case(TOTAL_ITEMS_HEADER) {
				total_items = Some(value.to_string());
			} else if name.eq_ignore_ascii_case(TOTAL_PAGES_HEADER) {
				total_pages = Some(value.to_string());
			}
		}

		Self {
			page: positive_or(params.get("page").map(String::as_str), DEFAULT_PAGE),
			per_page: positive_or(params.get("per_page").map(String::as_str), DEFAULT_PER_PAGE),
			total_items,
			total_pages,
		}
	}
}
