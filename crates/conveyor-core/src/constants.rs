/// Maximum accepted task title length, matching the `VARCHAR(255)` column.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Upper bound on `limit` for task listings.
pub const MAX_LIST_LIMIT: i64 = 1000;
