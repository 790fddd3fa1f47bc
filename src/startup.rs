use std::net::TcpListener;

use actix_files::Files;
use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};
use sqlx::PgPool;

use crate::{
    routes::{app::dashboard_route, default_route, scrape_route},
    services::{KeywordQuerySender, SheetsClient},
};

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    sheets: Data<SheetsClient>,
    keyword_query_sender: KeywordQuerySender,
) -> Result<Server, std::io::Error> {
    let db_pool = web::Data::new(db_pool);
    let keyword_query_sender = web::Data::new(keyword_query_sender);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(Files::new("/static", "./templates/static").prefer_utf8(true))
            .service(default_route::default)
            .service(
                web::scope("/scrape")
                    .service(scrape_route::scrape_keyword)
                    .service(scrape_route::scrape_sheet),
            )
            .service(
                web::scope("/app")
                    .service(dashboard_route::dashboard)
                    .service(dashboard_route::set_config)
                    .service(scrape_route::get_listings),
            )
            .app_data(db_pool.clone())
            .app_data(sheets.clone())
            .app_data(keyword_query_sender.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
