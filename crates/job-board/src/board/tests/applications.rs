use super::common::*;
use crate::board::domain::{
    Application, ApplicationId, ApplicationStatus, JobId, JobStatus, UserId,
};
use crate::board::{NewApplication, ServiceError, SessionContext, StatusUpdate};
use crate::store::StoreError;

fn apply(
    board: &crate::board::JobBoard,
    ctx: &SessionContext,
    job_id: &JobId,
) -> crate::board::Application {
    board
        .applications
        .create(
            ctx,
            NewApplication {
                job_id: job_id.clone(),
                cover_letter: Some("I would love to join".to_string()),
                ..NewApplication::default()
            },
        )
        .expect("application created")
}

#[test]
fn applicant_comes_from_the_session_not_the_payload() {
    let board = board();
    let employer = employer(&board, "boss@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "grace@example.test");

    let application = board
        .applications
        .create(
            &candidate,
            NewApplication {
                job_id: job.id.clone(),
                applicant_id: Some(UserId::from("someone-else")),
                ..NewApplication::default()
            },
        )
        .expect("applied");

    assert_eq!(Some(&application.applicant_id), candidate.user_id());
    assert_eq!(application.status, ApplicationStatus::Pending);
}

#[test]
fn applying_without_a_session_is_unauthenticated() {
    let board = board();
    let employer = employer(&board, "anon@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");

    let result = board.applications.create(
        &SessionContext::anonymous(),
        NewApplication {
            job_id: job.id,
            ..NewApplication::default()
        },
    );
    assert!(matches!(result, Err(ServiceError::Unauthenticated)));
}

#[test]
fn only_active_jobs_accept_applications() {
    let board = board();
    let employer = employer(&board, "drafts@acme.test");
    let acme = company(&board, &employer, "Acme");
    let draft = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Not yet", JobStatus::Draft))
        .expect("job");
    let candidate = candidate(&board, "early@example.test");

    let result = board.applications.create(
        &candidate,
        NewApplication {
            job_id: draft.id.clone(),
            ..NewApplication::default()
        },
    );
    match result {
        Err(ServiceError::JobNotOpen(id)) => assert_eq!(id, draft.id),
        other => panic!("expected job not open, got {other:?}"),
    }
}

#[test]
fn has_applied_distinguishes_no_rows_from_failures() {
    let board = board();
    let employer = employer(&board, "lookup@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "lookup@example.test");
    let user_id = candidate.user_id().expect("signed in").clone();

    assert!(!board
        .applications
        .has_applied(&job.id, &user_id)
        .expect("no rows is false"));
    apply(&board, &candidate, &job.id);
    assert!(board
        .applications
        .has_applied(&job.id, &user_id)
        .expect("one row is true"));

    let offline = board_with_failing_applications(StoreError::Unavailable("offline".to_string()));
    match offline.applications.has_applied(&job.id, &user_id) {
        Err(ServiceError::Store(StoreError::Unavailable(_))) => {}
        other => panic!("expected store failure, got {other:?}"),
    }

    let broken = board_with_failing_applications(StoreError::UnknownColumn {
        table: "applications",
        column: "job_id".to_string(),
    });
    assert!(broken.applications.has_applied(&job.id, &user_id).is_err());
}

#[test]
fn second_application_to_the_same_job_is_refused() {
    let board = board();
    let employer = employer(&board, "dupes@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "eager@example.test");

    let first = apply(&board, &candidate, &job.id);
    let again = board.applications.create(
        &candidate,
        NewApplication {
            job_id: job.id.clone(),
            ..NewApplication::default()
        },
    );
    assert!(matches!(again, Err(ServiceError::AlreadyApplied(_))));

    board
        .applications
        .withdraw(&candidate, &first.id)
        .expect("withdrawn");
    let after_withdrawal = board.applications.create(
        &candidate,
        NewApplication {
            job_id: job.id.clone(),
            ..NewApplication::default()
        },
    );
    assert!(matches!(after_withdrawal, Err(ServiceError::AlreadyApplied(_))));
}

#[test]
fn update_status_refreshes_timestamp_even_without_a_change() {
    let board = board();
    let employer = employer(&board, "status@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "status@example.test");
    let application = apply(&board, &candidate, &job.id);

    let same = board
        .applications
        .update_status(
            &employer,
            &application.id,
            StatusUpdate {
                status: ApplicationStatus::Pending,
                notes: None,
            },
        )
        .expect("same status");
    assert_eq!(same.status, ApplicationStatus::Pending);
    assert!(same.updated_at > application.updated_at);

    let reviewing = board
        .applications
        .update_status(
            &employer,
            &application.id,
            StatusUpdate {
                status: ApplicationStatus::Reviewing,
                notes: Some("Strong portfolio".to_string()),
            },
        )
        .expect("pending -> reviewing");
    assert!(reviewing.updated_at > same.updated_at);
    assert_eq!(reviewing.notes.as_deref(), Some("Strong portfolio"));
}

#[test]
fn terminal_statuses_reject_further_moves() {
    let board = board();
    let employer = employer(&board, "terminal@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "hired@example.test");
    let application = apply(&board, &candidate, &job.id);

    board
        .applications
        .update_status(
            &employer,
            &application.id,
            StatusUpdate {
                status: ApplicationStatus::Hired,
                notes: None,
            },
        )
        .expect("hired");
    let result = board.applications.update_status(
        &employer,
        &application.id,
        StatusUpdate {
            status: ApplicationStatus::Reviewing,
            notes: None,
        },
    );
    assert!(matches!(result, Err(ServiceError::InvalidTransition(_))));
}

#[test]
fn only_the_applicant_can_withdraw() {
    let board = board();
    let employer = employer(&board, "withdraw@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "owner@example.test");
    let application = apply(&board, &candidate, &job.id);

    assert!(matches!(
        board.applications.withdraw(&employer, &application.id),
        Err(ServiceError::Forbidden(_))
    ));
    let withdrawn = board
        .applications
        .withdraw(&candidate, &application.id)
        .expect("withdrawn");
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);
}

#[test]
fn candidate_listing_joins_job_and_company_newest_first() {
    let board = board();
    let employer = employer(&board, "mine@acme.test");
    let acme = company(&board, &employer, "Acme");
    let first = board
        .jobs
        .create(&employer, job_draft(&acme.id, "First", JobStatus::Active))
        .expect("job");
    let second = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Second", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "mine@example.test");
    apply(&board, &candidate, &first.id);
    apply(&board, &candidate, &second.id);

    let mine = board.applications.list_mine(&candidate).expect("mine");
    let titles: Vec<&str> = mine
        .iter()
        .map(|row| row.job.as_ref().expect("job joined").job.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Second", "First"]);
    assert!(mine.iter().all(|row| row
        .job
        .as_ref()
        .and_then(|job| job.company.as_ref())
        .is_some()));
}

#[test]
fn received_applications_only_cover_the_callers_jobs() {
    let board = board();
    let acme_owner = employer(&board, "owner@acme.test");
    let globex_owner = employer(&board, "owner@globex.test");
    let acme = company(&board, &acme_owner, "Acme");
    let globex = company(&board, &globex_owner, "Globex");
    let acme_job = board
        .jobs
        .create(&acme_owner, job_draft(&acme.id, "Acme Role", JobStatus::Active))
        .expect("job");
    board
        .jobs
        .create(&acme_owner, job_draft(&acme.id, "Unloved Role", JobStatus::Active))
        .expect("job");
    let globex_job = board
        .jobs
        .create(&globex_owner, job_draft(&globex.id, "Globex Role", JobStatus::Active))
        .expect("job");

    let candidate = candidate(&board, "both@example.test");
    apply(&board, &candidate, &acme_job.id);
    apply(&board, &candidate, &globex_job.id);

    let received = board
        .applications
        .list_for_my_jobs(&acme_owner)
        .expect("received");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].job.job.id, acme_job.id);
    let applicant = received[0].applicant.as_ref().expect("applicant profile");
    assert_eq!(Some(&applicant.user_id), candidate.user_id());

    let nobody = employer(&board, "new@initech.test");
    assert!(board
        .applications
        .list_for_my_jobs(&nobody)
        .expect("empty")
        .is_empty());
}

#[test]
fn duplicate_rows_still_count_as_applied() {
    let board = board();
    let employer = employer(&board, "race@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "race@example.test");
    let user_id = candidate.user_id().expect("signed in").clone();

    let first = apply(&board, &candidate, &job.id);
    let duplicate = Application {
        id: ApplicationId::generate(),
        ..first.clone()
    };
    board
        .store
        .applications
        .insert(duplicate)
        .expect("second row written behind the service");

    assert!(board
        .applications
        .has_applied(&job.id, &user_id)
        .expect("duplicates are not a failure"));
    assert!(matches!(
        board.applications.create(
            &candidate,
            NewApplication {
                job_id: job.id.clone(),
                ..NewApplication::default()
            },
        ),
        Err(ServiceError::AlreadyApplied(_))
    ));
}

#[test]
fn only_the_job_poster_moves_an_application() {
    let board = board();
    let rival = employer(&board, "rival@globex.test");
    let employer = employer(&board, "reviewer@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "hopeful@example.test");
    let application = apply(&board, &candidate, &job.id);

    for outsider in [&candidate, &rival] {
        let result = board.applications.update_status(
            outsider,
            &application.id,
            StatusUpdate {
                status: ApplicationStatus::Hired,
                notes: None,
            },
        );
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }
    assert!(matches!(
        board.applications.update_status(
            &SessionContext::anonymous(),
            &application.id,
            StatusUpdate {
                status: ApplicationStatus::Hired,
                notes: None,
            },
        ),
        Err(ServiceError::Unauthenticated)
    ));

    let stored = board.applications.get(&application.id).expect("stored");
    assert_eq!(stored.status, ApplicationStatus::Pending);
}
