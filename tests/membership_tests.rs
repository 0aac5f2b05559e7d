use kickoff::{
    database::models::{JoinDecision, MatchDecision, SlotStatus, TeamRole},
    error::AppError,
};
use pretty_assertions::assert_eq;
use uuid::Uuid;

mod common;

async fn leader_count(ctx: &common::TestContext, team_id: Uuid) -> usize {
    ctx.state
        .membership
        .list_members(team_id)
        .await
        .unwrap()
        .iter()
        .filter(|m| m.role == TeamRole::Leader)
        .count()
}

#[tokio::test]
async fn test_creator_becomes_leader() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();

    let team = ctx.team(leader, "Lions").await;

    assert_eq!(team.member_count, 1);
    let members = ctx.state.membership.list_members(team.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, leader);
    assert_eq!(members[0].role, TeamRole::Leader);
}

#[tokio::test]
async fn test_blank_team_name_is_rejected() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();

    let result = ctx
        .state
        .membership
        .create_team(
            Uuid::new_v4(),
            kickoff::database::models::TeamInput {
                name: "   ".to_string(),
                university: "Hanbit University".to_string(),
                skill_level: kickoff::database::models::SkillLevel::Beginner,
                team_type: kickoff::database::models::TeamType::Casual,
                description: None,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(ctx.count("teams").await, 0);
}

#[tokio::test]
async fn test_leader_cannot_exit() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;
    ctx.member(team.id, Uuid::new_v4(), TeamRole::Member).await;

    let result = ctx.state.membership.exit(team.id, leader).await;

    assert!(matches!(result, Err(AppError::LeaderCannotExit { .. })));
    assert_eq!(leader_count(&ctx, team.id).await, 1);
}

#[tokio::test]
async fn test_member_exit_updates_count() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let member = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;
    ctx.member(team.id, member, TeamRole::Member).await;

    ctx.state.membership.exit(team.id, member).await.unwrap();

    let team = ctx.state.membership.get_team(team.id).await.unwrap();
    assert_eq!(team.member_count, 1);

    let again = ctx.state.membership.exit(team.id, member).await;
    assert!(matches!(again, Err(AppError::NotFound { .. })));
}

#[tokio::test]
async fn test_last_member_cannot_exit() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;

    // Leave the team with a single non-leader row
    sqlx::query("DELETE FROM team_members WHERE team_id = ?")
        .bind(team.id)
        .execute(&ctx.pool)
        .await
        .unwrap();
    let last = Uuid::new_v4();
    ctx.member(team.id, last, TeamRole::Member).await;

    let result = ctx.state.membership.exit(team.id, last).await;
    assert!(matches!(result, Err(AppError::LastMemberCannotExit { .. })));
}

#[tokio::test]
async fn test_transfer_leadership_keeps_one_leader() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let successor = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;
    ctx.member(team.id, successor, TeamRole::Member).await;

    let promoted = ctx
        .state
        .membership
        .transfer_leadership(team.id, leader, successor)
        .await
        .unwrap();
    assert_eq!(promoted.role, TeamRole::Leader);
    assert_eq!(leader_count(&ctx, team.id).await, 1);

    // The former leader can now leave
    ctx.state.membership.exit(team.id, leader).await.unwrap();
    assert_eq!(leader_count(&ctx, team.id).await, 1);
}

#[tokio::test]
async fn test_transfer_requires_leader_and_member_target() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let vice = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;
    ctx.member(team.id, vice, TeamRole::ViceLeader).await;

    let by_vice = ctx
        .state
        .membership
        .transfer_leadership(team.id, vice, vice)
        .await;
    assert!(by_vice.is_err());

    let by_vice = ctx
        .state
        .membership
        .transfer_leadership(team.id, vice, leader)
        .await;
    assert!(matches!(by_vice, Err(AppError::Forbidden { .. })));

    let to_stranger = ctx
        .state
        .membership
        .transfer_leadership(team.id, leader, Uuid::new_v4())
        .await;
    assert!(matches!(to_stranger, Err(AppError::NotFound { .. })));
    assert_eq!(leader_count(&ctx, team.id).await, 1);
}

#[tokio::test]
async fn test_demotion_revokes_management() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let vice = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;
    ctx.member(team.id, vice, TeamRole::ViceLeader).await;

    let request = ctx
        .state
        .join_requests
        .apply(team.id, Uuid::new_v4(), None)
        .await
        .unwrap();

    let demoted = ctx
        .state
        .membership
        .change_role(team.id, leader, vice, TeamRole::Member)
        .await
        .unwrap();
    assert_eq!(demoted.role, TeamRole::Member);

    let result = ctx
        .state
        .join_requests
        .decide(request.id, vice, JoinDecision::Approved, None)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden { .. })));
}

#[tokio::test]
async fn test_role_changes_cannot_touch_leadership() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let member = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;
    ctx.member(team.id, member, TeamRole::Member).await;

    let promote_to_leader = ctx
        .state
        .membership
        .change_role(team.id, leader, member, TeamRole::Leader)
        .await;
    assert!(matches!(promote_to_leader, Err(AppError::BadRequest(_))));

    let demote_self = ctx
        .state
        .membership
        .change_role(team.id, leader, leader, TeamRole::Member)
        .await;
    assert!(matches!(demote_self, Err(AppError::BadRequest(_))));

    let by_member = ctx
        .state
        .membership
        .change_role(team.id, member, member, TeamRole::ViceLeader)
        .await;
    assert!(matches!(by_member, Err(AppError::Forbidden { .. })));
}

#[tokio::test]
async fn test_vice_leader_removes_members_only() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let vice = Uuid::new_v4();
    let other_vice = Uuid::new_v4();
    let member = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;
    ctx.member(team.id, vice, TeamRole::ViceLeader).await;
    ctx.member(team.id, other_vice, TeamRole::ViceLeader).await;
    ctx.member(team.id, member, TeamRole::Member).await;

    let leader_removal = ctx.state.membership.remove_member(team.id, vice, leader).await;
    assert!(matches!(leader_removal, Err(AppError::Forbidden { .. })));

    let peer_removal = ctx
        .state
        .membership
        .remove_member(team.id, vice, other_vice)
        .await;
    assert!(matches!(peer_removal, Err(AppError::Forbidden { .. })));

    ctx.state
        .membership
        .remove_member(team.id, vice, member)
        .await
        .unwrap();
    ctx.state
        .membership
        .remove_member(team.id, leader, other_vice)
        .await
        .unwrap();

    let team = ctx.state.membership.get_team(team.id).await.unwrap();
    assert_eq!(team.member_count, 2);
}

#[tokio::test]
async fn test_delete_blocked_by_pending_negotiations() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let applicant = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;

    assert!(ctx.state.membership.can_delete_team(team.id).await.unwrap());

    let request = ctx
        .state
        .join_requests
        .apply(team.id, applicant, None)
        .await
        .unwrap();
    assert!(!ctx.state.membership.can_delete_team(team.id).await.unwrap());

    let result = ctx.state.membership.delete_team(team.id, leader).await;
    assert!(matches!(result, Err(AppError::DependentDataExists { .. })));

    ctx.state
        .join_requests
        .cancel(request.id, applicant)
        .await
        .unwrap();
    assert!(ctx.state.membership.can_delete_team(team.id).await.unwrap());

    let by_stranger = ctx
        .state
        .membership
        .delete_team(team.id, Uuid::new_v4())
        .await;
    assert!(matches!(by_stranger, Err(AppError::Forbidden { .. })));

    ctx.state
        .membership
        .delete_team(team.id, leader)
        .await
        .unwrap();
    assert!(matches!(
        ctx.state.membership.get_team(team.id).await,
        Err(AppError::NotFound { .. })
    ));
    assert_eq!(ctx.count("team_members").await, 0);
}

#[tokio::test]
async fn test_waiting_slot_blocks_deletion() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let leader = Uuid::new_v4();
    let team = ctx.team(leader, "Lions").await;

    let slot = ctx
        .state
        .match_requests
        .open_slot(leader, common::slot_input(team.id))
        .await
        .unwrap();
    assert!(!ctx.state.membership.can_delete_team(team.id).await.unwrap());

    ctx.state
        .match_requests
        .cancel_slot(slot.id, leader)
        .await
        .unwrap();
    assert!(ctx.state.membership.can_delete_team(team.id).await.unwrap());
}

#[tokio::test]
async fn test_requester_of_matched_slot_cannot_be_deleted() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
    let owner = ctx.team(u1, "Owners").await;
    let requester = ctx.team(u2, "Guests").await;

    let slot = ctx
        .state
        .match_requests
        .open_slot(u1, common::slot_input(owner.id))
        .await
        .unwrap();
    let request = ctx
        .state
        .match_requests
        .request(slot.id, requester.id, u2, None)
        .await
        .unwrap();
    ctx.state
        .match_requests
        .decide(request.id, u1, MatchDecision::Accepted)
        .await
        .unwrap();

    assert!(!ctx.state.membership.can_delete_team(requester.id).await.unwrap());
    let result = ctx.state.membership.delete_team(requester.id, u2).await;
    assert!(matches!(result, Err(AppError::DependentDataExists { .. })));

    // The matched slot still has its accepted request
    let slot = ctx.state.match_requests.get_slot(slot.id).await.unwrap();
    assert_eq!(slot.status, SlotStatus::Matched);
    let accepted: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM match_requests WHERE waiting_slot_id = ? AND status = 'accepted'",
    )
    .bind(slot.id)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(accepted, 1);

    // The owner's matched slot goes away together with the owner
    ctx.state.membership.delete_team(owner.id, u1).await.unwrap();
    assert_eq!(ctx.count("match_requests").await, 0);
    assert!(ctx.state.membership.can_delete_team(requester.id).await.unwrap());
}
