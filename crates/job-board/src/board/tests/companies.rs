use super::common::*;
use crate::board::{CompanyPatch, ServiceError};

#[test]
fn creator_updates_and_deletes_their_company() {
    let board = board();
    let employer = employer(&board, "founder@acme.test");
    let acme = company(&board, &employer, "Acme");

    let renamed = board
        .companies
        .update(
            &employer,
            &acme.id,
            CompanyPatch {
                name: Some("  Acme Robotics ".to_string()),
                ..CompanyPatch::default()
            },
        )
        .expect("renamed");
    assert_eq!(renamed.name, "Acme Robotics");
    assert!(renamed.updated_at > acme.updated_at);

    board
        .companies
        .delete(&employer, &acme.id)
        .expect("deleted");
    assert!(matches!(
        board.companies.get(&acme.id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn other_users_cannot_touch_a_company() {
    let board = board();
    let rival = employer(&board, "rival@globex.test");
    let employer = employer(&board, "founder@initech.test");
    let initech = company(&board, &employer, "Initech");
    let applicant = candidate(&board, "curious@example.test");

    for outsider in [&rival, &applicant] {
        let renamed = board.companies.update(
            outsider,
            &initech.id,
            CompanyPatch {
                name: Some("Not Initech".to_string()),
                ..CompanyPatch::default()
            },
        );
        assert!(matches!(renamed, Err(ServiceError::Forbidden(_))));
        assert!(matches!(
            board.companies.delete(outsider, &initech.id),
            Err(ServiceError::Forbidden(_))
        ));
    }

    assert_eq!(
        board.companies.get(&initech.id).expect("kept").name,
        "Initech"
    );
}
