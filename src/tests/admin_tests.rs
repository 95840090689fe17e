use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::models::{ProfileFields, ServiceError, TeamRole, UpdateProfileRequest};
use crate::services::{admin_service, identity_service, user_service};
use crate::state::AppState;
use crate::tests::*;

fn state_with_bootstrap(name: &str) -> AppState {
    AppState::in_memory(Config {
        initial_superuser_email: Some(email(name)),
        ..test_config()
    })
}

#[test]
fn configured_email_is_promoted_only_while_no_superuser_exists() {
    let state = state_with_bootstrap("root");
    let bob = sign_in(&state, "bob");
    assert!(!bob.is_superuser);

    let root = sign_in(&state, "root");
    assert!(root.is_superuser);

    // once a superuser exists, provisioning is a no-op for anyone
    let promoted =
        identity_service::provision_initial_superuser(&state.db, Some(&email("bob"))).unwrap();
    assert!(promoted.is_none());
    assert!(!state.db.find_user_by_id(&bob.id).unwrap().unwrap().is_superuser);
}

#[test]
fn startup_provisioning_promotes_an_existing_user() {
    let state = test_state();
    let root = sign_in(&state, "root");
    assert!(!root.is_superuser);

    let promoted =
        identity_service::provision_initial_superuser(&state.db, Some("ROOT@example.com")).unwrap();
    assert_eq!(promoted.map(|u| u.id), Some(root.id));
}

#[test]
fn sign_in_refreshes_profile_but_keeps_identity() {
    let state = test_state();
    let first = sign_in(&state, "alice");

    let again = identity_service::resolve_or_create_user(
        &state,
        &subject("alice"),
        "alice.new@example.com",
        ProfileFields {
            first_name: None,
            last_name: Some("Liddell".to_string()),
        },
    )
    .unwrap();

    assert_eq!(again.id, first.id);
    assert_eq!(again.email, "alice.new@example.com");
    assert_eq!(again.first_name.as_deref(), Some("alice"));
    assert_eq!(again.last_name.as_deref(), Some("Liddell"));
    assert_eq!(state.db.list_users().unwrap().len(), 1);

    assert!(matches!(
        identity_service::resolve_or_create_user(&state, &subject("x"), "not-an-email", ProfileFields::default()),
        Err(ServiceError::BadRequest(_))
    ));
}

#[test]
fn missing_identity_and_unknown_subject_are_distinguished() {
    let state = test_state();
    assert_eq!(
        identity_service::require_authenticated_user(&state.db, None),
        Err(ServiceError::Unauthenticated)
    );
}

#[test]
fn last_superuser_cannot_be_demoted() {
    let state = state_with_bootstrap("root");
    let root = sign_in(&state, "root");
    let bob = sign_in(&state, "bob");

    assert!(matches!(
        admin_service::set_superuser(&state, &root, &root.id, false),
        Err(ServiceError::InvariantViolation(_))
    ));

    let bob = admin_service::set_superuser(&state, &root, &bob.id, true).unwrap();
    assert!(bob.is_superuser);
    let root = admin_service::set_superuser(&state, &bob, &root.id, false).unwrap();
    assert!(!root.is_superuser);

    assert!(matches!(
        admin_service::dashboard_stats(&state, &root),
        Err(ServiceError::NotAuthorized(_))
    ));
}

fn rename(first_name: &str) -> UpdateProfileRequest {
    UpdateProfileRequest {
        first_name: Some(first_name.to_string()),
        ..Default::default()
    }
}

#[test]
fn profile_writes_from_a_stale_copy_keep_a_revocation() {
    let state = state_with_bootstrap("root");
    let root = sign_in(&state, "root");
    let bob = sign_in(&state, "bob");

    let promoted = admin_service::set_superuser(&state, &root, &bob.id, true).unwrap();
    admin_service::set_superuser(&state, &root, &bob.id, false).unwrap();

    let updated = user_service::update_profile(&state, promoted.clone(), rename("Robert")).unwrap();
    assert_eq!(updated.first_name.as_deref(), Some("Robert"));
    assert!(!updated.is_superuser);

    user_service::update_avatar(&state, promoted.clone(), "https://cdn.example.com/b.png").unwrap();
    user_service::delete_avatar(&state, promoted).unwrap();

    // sign-in refresh goes through the stored record as well
    let refreshed = identity_service::resolve_or_create_user(
        &state,
        &subject("bob"),
        "bob.new@example.com",
        ProfileFields::default(),
    )
    .unwrap();
    assert_eq!(refreshed.first_name.as_deref(), Some("Robert"));
    assert!(!refreshed.is_superuser);
    assert!(!state.db.find_user_by_id(&bob.id).unwrap().unwrap().is_superuser);
}

#[test]
fn concurrent_profile_update_never_undoes_a_revocation() {
    let state = Arc::new(state_with_bootstrap("root"));
    let root = sign_in(&state, "root");
    let bob = sign_in(&state, "bob");

    for round in 0..200 {
        let snapshot = admin_service::set_superuser(&state, &root, &bob.id, true).unwrap();
        let revoker = {
            let state = state.clone();
            let root = root.clone();
            let bob_id = bob.id.clone();
            thread::spawn(move || admin_service::set_superuser(&state, &root, &bob_id, false))
        };

        user_service::update_profile(&state, snapshot, rename(&format!("Bob {}", round))).unwrap();
        revoker.join().unwrap().unwrap();

        let stored = state.db.find_user_by_id(&bob.id).unwrap().unwrap();
        assert!(!stored.is_superuser, "revocation lost in round {}", round);
        assert_eq!(stored.first_name, Some(format!("Bob {}", round)));
    }
}

#[test]
fn concurrent_demotions_keep_one_superuser() {
    let state = Arc::new(state_with_bootstrap("root"));
    let root = sign_in(&state, "root");
    let bob = sign_in(&state, "bob");
    admin_service::set_superuser(&state, &root, &bob.id, true).unwrap();

    let handles: Vec<_> = [root.clone(), bob.clone()]
        .into_iter()
        .zip([bob.id.clone(), root.id.clone()])
        .map(|(actor, target)| {
            let state = state.clone();
            thread::spawn(move || admin_service::set_superuser(&state, &actor, &target, false))
        })
        .collect();
    for handle in handles {
        let _ = handle.join().unwrap();
    }

    let superusers = state
        .db
        .list_users()
        .unwrap()
        .into_iter()
        .filter(|u| u.is_superuser)
        .count();
    assert_eq!(superusers, 1);
}

#[test]
fn admin_views_cover_every_team_and_user() {
    let state = state_with_bootstrap("root");
    let root = sign_in(&state, "root");
    let alice = sign_in(&state, "alice");
    let bob = sign_in(&state, "bob");
    let team = create_team(&state, &alice, "Design");
    join(&state, &alice, &team, &bob, TeamRole::Viewer);
    create_team(&state, &bob, "Ops");

    let teams = admin_service::list_all_teams(&state, &root).unwrap();
    assert_eq!(teams.len(), 2);
    let design = teams.iter().find(|t| t.team.id == team.id).unwrap();
    assert_eq!(design.member_count, 2);
    assert_eq!(design.storage_used, 0);

    let users = admin_service::list_all_users(&state, &root).unwrap();
    assert_eq!(users.len(), 3);

    let stats = admin_service::dashboard_stats(&state, &root).unwrap();
    assert_eq!(stats.total_teams, 2);
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_memberships, 3);
    assert_eq!(stats.teams_created_last_30_days, 2);
}

#[test]
fn superuser_deletes_any_team_and_missing_teams_report_not_found() {
    let state = state_with_bootstrap("root");
    let root = sign_in(&state, "root");
    let alice = sign_in(&state, "alice");
    let team = create_team(&state, &alice, "Design");

    let report = admin_service::admin_delete_team(&state, &root, &team.id).unwrap();
    assert_eq!(report.memberships, 1);
    assert!(report.team_removed);

    assert!(matches!(
        admin_service::admin_delete_team(&state, &root, &team.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn other_users_teams_need_superuser() {
    let state = state_with_bootstrap("root");
    let root = sign_in(&state, "root");
    let alice = sign_in(&state, "alice");
    let bob = sign_in(&state, "bob");
    create_team(&state, &alice, "Design");

    assert!(matches!(
        user_service::get_user_teams(&state, &bob, &alice.id),
        Err(ServiceError::NotAuthorized(_))
    ));
    assert_eq!(user_service::get_user_teams(&state, &alice, &alice.id).unwrap().len(), 1);
    assert_eq!(user_service::get_user_teams(&state, &root, &alice.id).unwrap().len(), 1);
}
