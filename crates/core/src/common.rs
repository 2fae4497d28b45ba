use serde::{Deserialize, Serialize};

/// Pagination metadata accompanying a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: u64, limit: u32, offset: u32) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: (offset as u64 + limit as u64) < total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_more_reflects_remaining_rows() {
        assert!(Pagination::new(100, 10, 0).has_more);
        assert!(!Pagination::new(10, 10, 0).has_more);
    }
}
