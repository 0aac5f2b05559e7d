use actix_web::web;

pub mod join_requests;
pub mod matches;
pub mod teams;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(teams::configure)
            .configure(join_requests::configure)
            .configure(matches::configure),
    );
}
