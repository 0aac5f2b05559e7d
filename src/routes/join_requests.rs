use actix_web::web;

use crate::handlers::join_requests;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/join-requests")
            // Registered before "/{id}" so it is not parsed as an id
            .route("/mine", web::get().to(join_requests::list_mine))
            .route("/{id}", web::get().to(join_requests::get_request))
            .route("/{id}/decision", web::post().to(join_requests::decide))
            .route("/{id}/cancel", web::post().to(join_requests::cancel)),
    );
}
