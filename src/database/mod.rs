pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{Database, DatabaseError};

/// Offset/limit pair resolved from `page` and `limit` query params.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Clamp client input: pages start at 1, limit falls back to `default` and never exceeds `max`.
    pub fn resolve(page: Option<u32>, limit: Option<u32>, default: u32, max: u32) -> Self {
        let limit = limit.filter(|l| *l > 0).unwrap_or(default).min(max).max(1);
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            limit,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    pub fn limit(&self) -> i64 {
        self.limit as i64
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn page_clamps_input() {
        let page = Page::resolve(None, None, 20, 100);
        assert_eq!(page, Page { page: 1, limit: 20 });
        assert_eq!(page.offset(), 0);

        let page = Page::resolve(Some(3), Some(500), 20, 100);
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset(), 200);

        assert_eq!(Page::resolve(Some(0), Some(0), 20, 100), Page { page: 1, limit: 20 });
    }
}
