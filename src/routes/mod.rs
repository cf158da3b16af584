pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Registers every route of the application.
///
/// Which of these require authentication is decided by `AuthMiddleware`'s
/// public-path list, not by the registration order here.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(users::signup)
        .service(users::login)
        .service(users::logout)
        .service(users::logout_all)
        .service(users::profile)
        .service(users::update_profile)
        .service(users::delete_profile)
        .service(users::upload_avatar)
        .service(users::delete_avatar)
        .service(users::get_avatar)
        .service(tasks::create_task)
        .service(tasks::list_tasks)
        .service(tasks::get_task)
        .service(tasks::update_task)
        .service(tasks::delete_task);
}
