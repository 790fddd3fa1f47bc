pub mod config_db;
pub mod keyword_db;
pub mod listing_db;
pub mod session_db;
