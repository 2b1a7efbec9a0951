use serde::Serialize;

/// One page of a listing plus the numbers a client needs to render pagination.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total_items: i64) -> Self {
        let total_pages = total_pages(total_items, per_page);
        Page {
            items,
            page,
            per_page,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

/// At least one page, even for an empty listing.
pub fn total_pages(total_items: i64, per_page: u32) -> u32 {
    if total_items <= 0 || per_page == 0 {
        return 1;
    }
    let per_page = per_page as i64;
    ((total_items + per_page - 1) / per_page) as u32
}

/// Resolves a raw `?page=` value: missing or unparsable means the first page,
/// anything past the end means the last page.
pub fn resolve_page(raw: Option<&str>, total_items: i64, per_page: u32) -> u32 {
    let last = total_pages(total_items, per_page);
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(n) if n < 1 => 1,
        Some(n) if n > last as i64 => last,
        Some(n) => n as u32,
        None => 1,
    }
}

/// OFFSET for a 1-based `page`.
pub fn page_offset(page: u32, per_page: u32) -> i64 {
    let page = page.saturating_sub(1);
    (page as i64) * (per_page as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_pages_clamp_to_last() {
        assert_eq!(resolve_page(Some("99"), 13, 6), 3);
        assert_eq!(resolve_page(Some("2"), 13, 6), 2);
    }

    #[test]
    fn garbage_or_missing_page_is_first() {
        assert_eq!(resolve_page(Some("abc"), 13, 6), 1);
        assert_eq!(resolve_page(None, 13, 6), 1);
        assert_eq!(resolve_page(Some("0"), 13, 6), 1);
    }

    #[test]
    fn empty_listing_still_has_one_page() {
        let page: Page<u8> = Page::new(vec![], 1, 6, 0);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn offsets_are_zero_based() {
        assert_eq!(page_offset(1, 9), 0);
        assert_eq!(page_offset(3, 9), 18);
        assert_eq!(page_offset(0, 9), 0);
    }
}
