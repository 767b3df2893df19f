/// One page of an ordered result set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Slice `all` (already in display order) into page `page` of size
    /// `per_page`. Pages past the end come back empty.
    pub fn paginate(all: Vec<T>, page: usize, per_page: usize) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let total = all.len();
        let start = (page - 1).saturating_mul(per_page);

        let items = all.into_iter().skip(start).take(per_page).collect();

        Page {
            items,
            page,
            per_page,
            total,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(self.per_page) < self.total
    }

    pub fn prev_num(&self) -> Option<usize> {
        self.has_prev().then(|| self.page - 1)
    }

    pub fn next_num(&self) -> Option<usize> {
        self.has_next().then(|| self.page + 1)
    }

    /// Navigation links for `base` (a path without query string).
    pub fn nav_urls(&self, base: &str) -> (Option<String>, Option<String>) {
        let prev = self.prev_num().map(|n| format!("{}?page={}", base, n));
        let next = self.next_num().map(|n| format!("{}?page={}", base, n));
        (prev, next)
    }
}
