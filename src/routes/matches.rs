use actix_web::web;

use crate::handlers::matches;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/match-slots")
            .route("", web::post().to(matches::open_slot))
            .route("", web::get().to(matches::list_open_slots))
            .route("/{id}", web::get().to(matches::get_slot))
            .route("/{id}/cancel", web::post().to(matches::cancel_slot))
            .route("/{id}/requests", web::post().to(matches::request_match))
            .route("/{id}/requests", web::get().to(matches::list_for_slot)),
    )
    .service(
        web::scope("/match-requests")
            .route("/{id}/decision", web::post().to(matches::decide))
            .route("/{id}/cancel", web::post().to(matches::cancel)),
    )
    .service(
        web::scope("/matches")
            .route("", web::post().to(matches::record_result))
            .route("/{id}/outcome", web::get().to(matches::outcome_of)),
    );
}
