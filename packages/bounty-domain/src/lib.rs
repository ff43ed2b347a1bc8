pub mod dates;
pub mod merged;
pub mod pagination;
pub mod params;
pub mod query;
pub mod ranking;
