use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Pagination { page, limit, total, pages }
    }
}

/// 1-based page request parsed from query strings. Blank values mean "use
/// the default"; the limit is clamped to [`MAX_PAGE_SIZE`]. A page whose
/// offset does not fit a database skip (`i64`) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: u64) -> Result<Self, String> {
        let page = positive(page, "page")?.unwrap_or(1);
        let limit = positive(limit, "limit")?.unwrap_or(default_limit).min(MAX_PAGE_SIZE);
        (page - 1)
            .checked_mul(limit)
            .filter(|skip| *skip <= i64::MAX as u64)
            .ok_or_else(|| "page is out of range".to_string())?;
        Ok(PageRequest { page, limit })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn positive(raw: Option<&str>, name: &str) -> Result<Option<u64>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(format!("{} must be a positive integer", name)),
        },
    }
}
