use crate::handlers;
use actix_web::web;

/// Configures the operator API. Mounted under the "/api" scope in main.rs;
/// access control is the backend's concern, not this console's.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/intake")
            .route("", web::get().to(handlers::intake_handlers::get_intake))
            .route(
                "/{payment_id}/card",
                web::post().to(handlers::intake_handlers::send_card),
            )
            .route(
                "/{payment_id}/confirm",
                web::post().to(handlers::intake_handlers::confirm),
            )
            .route(
                "/{payment_id}/reject",
                web::post().to(handlers::intake_handlers::reject),
            ),
    );
}
