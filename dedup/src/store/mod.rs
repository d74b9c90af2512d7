pub mod base;
pub mod http;
pub mod memory;
pub mod page;
pub mod paginated;
