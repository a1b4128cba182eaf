pub mod bridge;
pub mod list;
