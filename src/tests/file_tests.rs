use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::config::Config;
use crate::models::{FileListQuery, FileRecord, ServiceError, TeamRole, UpdateFileRequest};
use crate::state::AppState;
use crate::services::{file_service, quota_service};
use crate::tests::*;

#[test]
fn quota_is_enforced_up_to_the_exact_limit() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let team = create_limited_team(&state, &alice, "Docs", 1000, &["application/pdf"]);

    file_service::create_file(&state, &alice, &team.id, file_request("a.pdf", "application/pdf", 900)).unwrap();

    match file_service::create_file(&state, &alice, &team.id, file_request("b.pdf", "application/pdf", 200)) {
        Err(ServiceError::QuotaExceeded { used, requested, limit, .. }) => {
            assert_eq!((used, requested, limit), (900, 200, 1000));
        }
        other => panic!("expected QuotaExceeded, got {:?}", other),
    }

    file_service::create_file(&state, &alice, &team.id, file_request("c.pdf", "application/pdf", 100)).unwrap();
    assert_eq!(quota_service::current_usage(&state.db, &team.id).unwrap(), 1000);
}

#[test]
fn disallowed_types_are_rejected() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let team = create_limited_team(&state, &alice, "Docs", 1000, &["application/pdf", "image/*"]);

    assert!(matches!(
        file_service::create_file(&state, &alice, &team.id, file_request("a.zip", "application/zip", 1)),
        Err(ServiceError::UnsupportedFileType(_))
    ));
    file_service::create_file(&state, &alice, &team.id, file_request("a.png", "image/png", 1)).unwrap();

    // no declared type: guessed from the extension
    let mut guessed = file_request("scan.pdf", "", 1);
    guessed.file_type = None;
    let file = file_service::create_file(&state, &alice, &team.id, guessed).unwrap();
    assert_eq!(file.file_type, "application/pdf");
    assert!(file.storage_key.starts_with(&format!("{}/{}/", team.id, alice.id)));
}

#[test]
fn concurrent_uploads_never_exceed_the_limit() {
    let state = Arc::new(test_state());
    let alice = sign_in(&state, "alice");
    let team = create_limited_team(&state, &alice, "Docs", 1000, &[]);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let state = state.clone();
            let alice = alice.clone();
            let team_id = team.id.clone();
            thread::spawn(move || {
                file_service::create_file(
                    &state,
                    &alice,
                    &team_id,
                    file_request(&format!("part-{}.bin", i), "application/octet-stream", 200),
                )
            })
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(accepted, 5);
    assert_eq!(quota_service::current_usage(&state.db, &team.id).unwrap(), 1000);
}

#[test]
fn edits_racing_a_move_never_pull_the_file_back() {
    let state = Arc::new(test_state());
    let alice = sign_in(&state, "alice");
    let first = create_limited_team(&state, &alice, "First", 100, &[]);
    let second = create_limited_team(&state, &alice, "Second", 100, &[]);
    let file = file_service::create_file(&state, &alice, &first.id, file_request("a.pdf", "application/pdf", 100))
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let editor = {
        let state = state.clone();
        let alice = alice.clone();
        let file_id = file.id.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut edits = 0;
            while !done.load(Ordering::SeqCst) {
                let result = file_service::update_file(
                    &state,
                    &alice,
                    &file_id,
                    UpdateFileRequest {
                        name: Some(format!("a-{}.pdf", edits)),
                        ..Default::default()
                    },
                );
                assert!(matches!(result, Ok(_) | Err(ServiceError::InvariantViolation(_))));
                edits += 1;
            }
        })
    };

    for round in 0..300 {
        let (from, to) = if round % 2 == 0 { (&first, &second) } else { (&second, &first) };
        let moved = file_service::move_file(&state, &alice, &file.id, &to.id).unwrap();
        assert_eq!(moved.team_id, to.id);

        let stored = state.db.find_file_by_id(&file.id).unwrap().unwrap();
        assert_eq!(stored.team_id, to.id, "move reverted in round {}", round);
        assert_eq!(quota_service::current_usage(&state.db, &from.id).unwrap(), 0);
    }

    done.store(true, Ordering::SeqCst);
    editor.join().unwrap();
    for team in [&first, &second] {
        assert!(quota_service::current_usage(&state.db, &team.id).unwrap() <= 100);
    }
}

#[test]
fn delete_is_authorized_against_the_current_team() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let bob = sign_in(&state, "bob");
    let source = create_team(&state, &alice, "Source");
    let target = create_team(&state, &alice, "Target");
    join(&state, &alice, &source, &bob, TeamRole::Admin);

    let file = file_service::create_file(&state, &bob, &source.id, file_request("a.pdf", "application/pdf", 10))
        .unwrap();
    file_service::move_file(&state, &alice, &file.id, &target.id).unwrap();

    assert!(matches!(
        file_service::delete_file(&state, &bob, &file.id),
        Err(ServiceError::NotAuthorized(_))
    ));
    assert!(matches!(
        file_service::update_file(
            &state,
            &bob,
            &file.id,
            UpdateFileRequest {
                name: Some("b.pdf".to_string()),
                ..Default::default()
            },
        ),
        Err(ServiceError::NotAuthorized(_))
    ));
    let stored = state.db.find_file_by_id(&file.id).unwrap().unwrap();
    assert_eq!((stored.team_id.as_str(), stored.name.as_str()), (target.id.as_str(), "a.pdf"));
}

#[test]
fn files_over_the_size_cap_are_rejected() {
    let state = AppState::in_memory(Config {
        max_file_size: 500,
        ..test_config()
    });
    let alice = sign_in(&state, "alice");
    let team = create_team(&state, &alice, "Docs");

    file_service::create_file(&state, &alice, &team.id, file_request("a.pdf", "application/pdf", 500)).unwrap();
    assert!(matches!(
        file_service::create_file(&state, &alice, &team.id, file_request("b.pdf", "application/pdf", 501)),
        Err(ServiceError::BadRequest(_))
    ));
}

#[test]
fn file_permissions_follow_roles() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let bob = sign_in(&state, "bob");
    let carol = sign_in(&state, "carol");
    let team = create_team(&state, &alice, "Docs");
    join(&state, &alice, &team, &bob, TeamRole::Member);
    join(&state, &alice, &team, &carol, TeamRole::Viewer);

    assert!(matches!(
        file_service::create_file(&state, &carol, &team.id, file_request("v.pdf", "application/pdf", 1)),
        Err(ServiceError::NotAuthorized(_))
    ));

    let file = file_service::create_file(&state, &bob, &team.id, file_request("m.pdf", "application/pdf", 1)).unwrap();
    assert_eq!(file_service::get_file(&state, &carol, &file.id).unwrap().id, file.id);

    let renamed = file_service::update_file(
        &state,
        &bob,
        &file.id,
        UpdateFileRequest {
            name: Some("renamed.pdf".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(renamed.name, "renamed.pdf");

    assert!(matches!(
        file_service::delete_file(&state, &bob, &file.id),
        Err(ServiceError::NotAuthorized(_))
    ));
    file_service::delete_file(&state, &alice, &file.id).unwrap();
    assert!(matches!(
        file_service::get_file(&state, &alice, &file.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn move_without_target_membership_leaves_file_in_place() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let bob = sign_in(&state, "bob");
    let source = create_team(&state, &bob, "Source");
    let target = create_team(&state, &bob, "Target");
    join(&state, &bob, &source, &alice, TeamRole::Admin);

    let file = file_service::create_file(&state, &alice, &source.id, file_request("a.pdf", "application/pdf", 10))
        .unwrap();

    assert!(matches!(
        file_service::move_file(&state, &alice, &file.id, &target.id),
        Err(ServiceError::NotAuthorized(_))
    ));
    let stored = state.db.find_file_by_id(&file.id).unwrap().unwrap();
    assert_eq!(stored.team_id, source.id);
}

#[test]
fn move_checks_target_quota_and_shifts_usage() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let source = create_team(&state, &alice, "Source");
    let small = create_limited_team(&state, &alice, "Small", 50, &[]);
    let large = create_limited_team(&state, &alice, "Large", 500, &[]);

    let file = file_service::create_file(&state, &alice, &source.id, file_request("a.pdf", "application/pdf", 100))
        .unwrap();

    assert!(matches!(
        file_service::move_file(&state, &alice, &file.id, &small.id),
        Err(ServiceError::QuotaExceeded { .. })
    ));
    assert!(matches!(
        file_service::move_file(&state, &alice, &file.id, &source.id),
        Err(ServiceError::BadRequest(_))
    ));

    let moved = file_service::move_file(&state, &alice, &file.id, &large.id).unwrap();
    assert_eq!(moved.team_id, large.id);
    assert_eq!(quota_service::current_usage(&state.db, &source.id).unwrap(), 0);
    assert_eq!(quota_service::current_usage(&state.db, &large.id).unwrap(), 100);
}

#[test]
fn listing_pages_newest_first_with_a_cursor() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let team = create_team(&state, &alice, "Docs");

    for i in 0..5 {
        let file_type = if i % 2 == 0 { "application/pdf" } else { "image/png" };
        file_service::create_file(&state, &alice, &team.id, file_request(&format!("f{}", i), file_type, 1)).unwrap();
        thread::sleep(Duration::from_millis(3));
    }

    let first = file_service::list_team_files(
        &state,
        &alice,
        &team.id,
        FileListQuery {
            limit: Some(2),
            ..Default::default()
        },
    )
    .unwrap();
    let names: Vec<_> = first.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["f4", "f3"]);
    let cursor = first.cursor.expect("more pages expected");

    let second = file_service::list_team_files(
        &state,
        &alice,
        &team.id,
        FileListQuery {
            cursor: Some(cursor),
            cursor_id: first.cursor_id.clone(),
            limit: Some(10),
            file_type: None,
        },
    )
    .unwrap();
    let names: Vec<_> = second.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["f2", "f1", "f0"]);
    assert!(second.cursor.is_none());

    let pdfs = file_service::list_team_files(
        &state,
        &alice,
        &team.id,
        FileListQuery {
            file_type: Some("application/pdf".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(pdfs.files.len(), 3);
}

#[test]
fn files_sharing_a_millisecond_are_not_skipped_between_pages() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let team = create_team(&state, &alice, "Docs");

    let created_at = Utc::now();
    for id in ["file-a", "file-b", "file-c"] {
        state
            .db
            .insert_file(FileRecord {
                id: id.to_string(),
                team_id: team.id.clone(),
                name: format!("{}.pdf", id),
                file_type: "application/pdf".to_string(),
                size: 1,
                description: None,
                storage_key: format!("{}/{}/{}", team.id, alice.id, id),
                metadata: None,
                created_by: alice.id.clone(),
                created_at,
                updated_at: created_at,
            })
            .unwrap();
    }

    let first = file_service::list_team_files(
        &state,
        &alice,
        &team.id,
        FileListQuery {
            limit: Some(2),
            ..Default::default()
        },
    )
    .unwrap();
    let ids: Vec<_> = first.files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["file-c", "file-b"]);
    assert_eq!(first.cursor, Some(created_at.timestamp_millis()));
    assert_eq!(first.cursor_id.as_deref(), Some("file-b"));

    let second = file_service::list_team_files(
        &state,
        &alice,
        &team.id,
        FileListQuery {
            cursor: first.cursor,
            cursor_id: first.cursor_id.clone(),
            limit: Some(2),
            file_type: None,
        },
    )
    .unwrap();
    let ids: Vec<_> = second.files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["file-a"]);
    assert!(second.cursor.is_none());
}

#[test]
fn search_matches_descriptions_too() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let team = create_team(&state, &alice, "Docs");

    let mut scan = file_request("scan-001.pdf", "application/pdf", 1);
    scan.description = Some("Invoice for March".to_string());
    file_service::create_file(&state, &alice, &team.id, scan).unwrap();
    file_service::create_file(&state, &alice, &team.id, file_request("notes.txt", "text/plain", 1)).unwrap();

    let found = file_service::search_team_files(&state, &alice, &team.id, "invoice", None).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "scan-001.pdf");
}

#[test]
fn search_matches_name_prefixes_within_one_team() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let team = create_team(&state, &alice, "Docs");
    let other = create_team(&state, &alice, "Other");

    file_service::create_file(&state, &alice, &team.id, file_request("Report Q1.pdf", "application/pdf", 1)).unwrap();
    file_service::create_file(&state, &alice, &team.id, file_request("notes.txt", "text/plain", 1)).unwrap();
    file_service::create_file(&state, &alice, &other.id, file_request("report-other.pdf", "application/pdf", 1))
        .unwrap();

    let found = file_service::search_team_files(&state, &alice, &team.id, "report", None).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Report Q1.pdf");
}

#[test]
fn storage_summary_reports_remaining_space() {
    let state = test_state();
    let alice = sign_in(&state, "alice");
    let team = create_limited_team(&state, &alice, "Docs", 1000, &[]);
    file_service::create_file(&state, &alice, &team.id, file_request("a.pdf", "application/pdf", 250)).unwrap();

    let summary = file_service::team_storage(&state, &alice, &team.id).unwrap();
    assert_eq!(summary.total_size, 250);
    assert_eq!(summary.remaining, 750);
    assert_eq!(summary.file_count, 1);
}
