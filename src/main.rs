use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use taskhub::auth::AuthMiddleware;
use taskhub::config::Config;
use taskhub::{db, routes};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let pool = db::connect_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::migrate(&pool)
        .await
        .expect("Failed to run database migrations");

    log::info!("Starting TaskHub server at {}", config.server_url());

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            // Innermost: CORS and the logger (registered later, running
            // earlier) see auth rejections on their way out.
            .wrap(AuthMiddleware)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
