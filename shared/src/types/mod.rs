//! Type definitions shared by every layer

pub mod pagination;

pub use pagination::{PaginatedResponse, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
