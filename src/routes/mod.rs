pub mod app;
pub mod default_route;
pub mod scrape_route;
