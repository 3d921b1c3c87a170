//! Request and response bodies

pub mod billet;
pub mod configuration;
pub mod remittance;

use domain_remittance::PageQuery;
use serde::Deserialize;

/// `?limit=&offset=` on list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageParams {
    /// Caps the page size at 500
    pub fn to_page(self) -> PageQuery {
        let defaults = PageQuery::default();
        PageQuery {
            limit: self.limit.unwrap_or(defaults.limit).min(500),
            offset: self.offset.unwrap_or(defaults.offset),
        }
    }
}
