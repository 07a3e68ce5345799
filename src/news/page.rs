use super::types::{NewsItem, NewsPage};

pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const MAX_PAGE_SIZE: usize = 50;

/// Slices one page out of the aggregated list.
///
/// `page` is 1-based and clamped up to 1; `page_size` is clamped to
/// `1..=MAX_PAGE_SIZE`. Requests past the end yield an empty page with the
/// real `total`.
pub fn paginate(items: &[NewsItem], page: i64, page_size: i64) -> NewsPage {
    let page = clamp_to_usize(page).max(1);
    let page_size = clamp_to_usize(page_size).clamp(1, MAX_PAGE_SIZE);

    let total = items.len();
    let start = (page - 1).saturating_mul(page_size);
    let end = start.saturating_add(page_size);

    let slice: &[NewsItem] = if start >= total {
        &[]
    } else {
        &items[start..end.min(total)]
    };

    NewsPage {
        items: slice.to_vec(),
        page,
        page_size,
        has_more: end < total,
        total,
    }
}

fn clamp_to_usize(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn items(n: usize) -> Vec<NewsItem> {
        (0..n)
            .map(|i| NewsItem {
                title: format!("Item {i}"),
                link: format!("https://example.com/{i}"),
                published: String::new(),
                timestamp: 0,
                source: "example.com".into(),
            })
            .collect()
    }

    #[test]
    fn test_first_page() {
        let all = items(30);
        let page = paginate(&all, 1, 12);
        assert_eq!(page.items.len(), 12);
        assert_eq!(page.items[0].link, "https://example.com/0");
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 12);
        assert_eq!(page.total, 30);
        assert!(page.has_more);
    }

    #[test]
    fn test_last_partial_page() {
        let all = items(30);
        let page = paginate(&all, 3, 12);
        assert_eq!(page.items.len(), 6);
        assert_eq!(page.items[0].link, "https://example.com/24");
        assert!(!page.has_more);
    }

    #[test]
    fn test_exact_boundary_has_no_more() {
        let all = items(24);
        let page = paginate(&all, 2, 12);
        assert_eq!(page.items.len(), 12);
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let all = items(5);
        let page = paginate(&all, 100, 12);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.total, 5);
        assert_eq!(page.page, 100);
    }

    #[test]
    fn test_clamping() {
        let all = items(100);

        let page = paginate(&all, 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.items.len(), 1);

        let page = paginate(&all, -5, 500);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
        assert_eq!(page.items.len(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let all = items(3);
        let page = paginate(&all, i64::MAX, 50);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_empty_list() {
        let page = paginate(&[], 1, 12);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert!(!page.has_more);
    }

    proptest! {
        #[test]
        fn prop_pagination_bounds(total in 0usize..200, page in -3i64..40, page_size in -3i64..80) {
            let all = items(total);
            let result = paginate(&all, page, page_size);

            let start = (result.page - 1) * result.page_size;
            let expected_len = result.page_size.min(total.saturating_sub(start));

            prop_assert!(result.page >= 1);
            prop_assert!((1..=MAX_PAGE_SIZE).contains(&result.page_size));
            prop_assert_eq!(result.items.len(), expected_len);
            prop_assert_eq!(result.has_more, start + result.page_size < total);
            prop_assert_eq!(result.total, total);
            if let Some(first) = result.items.first() {
                prop_assert_eq!(&first.link, &all[start].link);
            }
        }
    }
}
