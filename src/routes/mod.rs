// Route exports
pub mod bookings;

use actix_web::web;

pub use bookings::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(bookings::configure),
    );
}
