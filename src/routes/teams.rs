use actix_web::web;

use crate::handlers::{join_requests, matches, teams};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/teams")
            .route("", web::get().to(teams::list_teams))
            .route("", web::post().to(teams::create_team))
            .route("/{id}", web::get().to(teams::get_team))
            .route("/{id}", web::delete().to(teams::delete_team))
            .route("/{id}/deletable", web::get().to(teams::can_delete_team))
            .route("/{id}/members", web::get().to(teams::list_members))
            .route(
                "/{id}/members/{user_id}",
                web::delete().to(teams::remove_member),
            )
            .route(
                "/{id}/members/{user_id}/role",
                web::put().to(teams::change_role),
            )
            .route("/{id}/leader", web::post().to(teams::transfer_leadership))
            .route("/{id}/exit", web::post().to(teams::exit_team))
            .route("/{id}/join-requests", web::post().to(join_requests::apply))
            .route(
                "/{id}/join-requests",
                web::get().to(join_requests::list_for_team),
            )
            .route(
                "/{id}/match-requests",
                web::get().to(matches::list_for_team),
            )
            .route("/{id}/record", web::get().to(teams::team_record))
            .route("/{id}/activity", web::get().to(teams::team_activity)),
    );
}
