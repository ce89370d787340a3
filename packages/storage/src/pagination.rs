// ABOUTME: Pagination and sorting utilities for list endpoints
// ABOUTME: Validated page/page_size/sort filters and the @metadata response block

use parley_core::validation::{permitted_value, Validator};
use serde::Serialize;

/// Maximum page number a client may request
pub const MAX_PAGE: i64 = 500;

/// Maximum page size to prevent performance issues
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query filters for a paginated, sorted listing.
#[derive(Debug, Clone)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_safe_list: Vec<String>,
}

impl Filters {
    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= MAX_PAGE, "page", "must be a maximum of 500");
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(
            self.page_size <= MAX_PAGE_SIZE,
            "page_size",
            "must be a maximum of 100",
        );
        v.check(
            permitted_value(&self.sort, &self.sort_safe_list),
            "sort",
            "invalid sort value",
        );
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    /// Column name to sort by. Only values from the safe list are ever
    /// interpolated into SQL; anything else falls back to `id`.
    pub fn sort_column(&self) -> &str {
        if permitted_value(&self.sort, &self.sort_safe_list) {
            self.sort.trim_start_matches('-')
        } else {
            "id"
        }
    }

    pub fn sort_direction(&self) -> &'static str {
        if self.sort.starts_with('-') {
            "DESC"
        } else {
            "ASC"
        }
    }
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Metadata about pagination state. Serializes as `{}` for an empty result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

impl Metadata {
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 {
            return Self::default();
        }

        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
        Filters {
            page,
            page_size,
            sort: sort.to_string(),
            sort_safe_list: vec!["id".into(), "author".into(), "-id".into(), "-author".into()],
        }
    }

    #[rstest]
    #[case(1, 10, 0)]
    #[case(2, 10, 10)]
    #[case(3, 25, 50)]
    fn test_offset(#[case] page: i64, #[case] page_size: i64, #[case] expected: i64) {
        assert_eq!(filters(page, page_size, "id").offset(), expected);
    }

    #[rstest]
    #[case("id", "id", "ASC")]
    #[case("-author", "author", "DESC")]
    #[case("content; DROP TABLE comments", "id", "ASC")]
    fn test_sort_column_and_direction(
        #[case] sort: &str,
        #[case] column: &str,
        #[case] direction: &str,
    ) {
        let f = filters(1, 10, sort);
        assert_eq!(f.sort_column(), column);
        assert_eq!(f.sort_direction(), direction);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut v = Validator::new();
        filters(0, 101, "content").validate(&mut v);

        let errors = v.into_errors();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_key("page"));
        assert!(errors.contains_key("page_size"));
        assert!(errors.contains_key("sort"));
    }

    #[test]
    fn test_metadata_calculation() {
        assert_eq!(
            Metadata::calculate(45, 2, 10),
            Metadata {
                current_page: 2,
                page_size: 10,
                first_page: 1,
                last_page: 5,
                total_records: 45,
            }
        );
    }

    #[test]
    fn test_empty_metadata_serializes_to_empty_object() {
        let json = serde_json::to_string(&Metadata::calculate(0, 1, 10)).unwrap();
        assert_eq!(json, "{}");
    }
}
