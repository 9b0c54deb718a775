//! Integration tests for repository implementations.

use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use omp_rust::db::repositories::LocalRepository;
use omp_rust::db::{
    services, AccountingRepository, FaultRepository, FullRepository, ProjectRepository,
    RepositoryError, ShiftLogRepository,
};
use omp_rust::models::{
    Fault, FaultCategory, FaultStatus, Project, ProjectId, ShiftComment, Telescope, TimeAccount,
};
use omp_rust::time::UtRange;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2002, 12, day).unwrap()
}

#[tokio::test]
async fn test_repository_health_check() {
    let repo: Arc<dyn FullRepository> = Arc::new(LocalRepository::new());
    let result = repo.health_check().await;
    assert!(result.is_ok());
    assert!(result.unwrap());
}

#[tokio::test]
async fn test_accounts_are_scoped_by_telescope_and_range() {
    let repo = LocalRepository::new();
    repo.store_time_accounts(
        Telescope::Jcmt,
        &[
            TimeAccount::new("M01BU53", date(9), 100, false),
            TimeAccount::new("M01BU53", date(10), 200, false),
            TimeAccount::new("M01BU54", date(11), 300, false),
            TimeAccount::new("M01BU53", date(12), 400, false),
        ],
    )
    .await
    .unwrap();
    repo.store_time_accounts(Telescope::Ukirt, &[TimeAccount::new("U/02B/5", date(10), 500, true)])
        .await
        .unwrap();

    let accounts = repo
        .fetch_time_accounts(Telescope::Jcmt, &UtRange::new(date(10), 2))
        .await
        .unwrap();
    let seconds: Vec<u64> = accounts.iter().map(|a| a.seconds).collect();
    assert_eq!(seconds, vec![200, 300]);

    let ukirt = repo
        .fetch_time_accounts(Telescope::Ukirt, &UtRange::single(date(10)))
        .await
        .unwrap();
    assert_eq!(ukirt.len(), 1);

    let project = repo.fetch_project_accounts(&ProjectId::new("m01bu53")).await.unwrap();
    assert_eq!(project.len(), 3);
}

#[tokio::test]
async fn test_store_replaces_existing_key() {
    let repo = LocalRepository::new();
    let night = date(10);
    repo.store_time_accounts(Telescope::Jcmt, &[TimeAccount::new("M01BU53", night, 100, false)])
        .await
        .unwrap();
    repo.store_time_accounts(Telescope::Jcmt, &[TimeAccount::new("m01bu53", night, 900, true)])
        .await
        .unwrap();

    assert_eq!(repo.account_count(), 1);
    let accounts = repo
        .fetch_time_accounts(Telescope::Jcmt, &UtRange::single(night))
        .await
        .unwrap();
    assert_eq!(accounts[0].seconds, 900);
    assert!(accounts[0].confirmed);
}

#[tokio::test]
async fn test_undated_account_is_rejected() {
    let repo = LocalRepository::new();
    let undated = TimeAccount {
        project_id: ProjectId::new("M01BU53"),
        date: None,
        seconds: 10,
        confirmed: false,
    };
    let err = repo
        .store_time_accounts(Telescope::Jcmt, &[undated])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
    assert_eq!(repo.account_count(), 0);
}

#[tokio::test]
async fn test_absent_records_are_none() {
    let repo = LocalRepository::new();
    assert!(repo.find_project(&ProjectId::new("NOSUCH")).await.unwrap().is_none());
    assert!(repo.get_fault("20021210.001").await.unwrap().is_none());
}

#[tokio::test]
async fn test_project_listing() {
    let repo = LocalRepository::new();
    for (id, tel, semester) in [
        ("M02BU01", Telescope::Jcmt, "02B"),
        ("M02AU01", Telescope::Jcmt, "02A"),
        ("U/02B/5", Telescope::Ukirt, "02B"),
    ] {
        let project = Project {
            project_id: ProjectId::new(id),
            telescope: tel,
            country: "UK".to_string(),
            semester: semester.to_string(),
            title: String::new(),
            pi: String::new(),
            contacts: vec![],
            allocated_seconds: 0,
            remaining_seconds: 0,
            password_digest: None,
        };
        services::store_project(&repo, &project).await.unwrap();
    }

    let all_jcmt = services::list_projects(&repo, Telescope::Jcmt, None).await.unwrap();
    assert_eq!(all_jcmt.len(), 2);
    let b = services::list_projects(&repo, Telescope::Jcmt, Some("02b")).await.unwrap();
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].project_id.as_str(), "M02BU01");
}

#[tokio::test]
async fn test_fault_queries() {
    let repo = LocalRepository::new();
    let fault = Fault {
        fault_id: "20021211.001".to_string(),
        category: FaultCategory::Jcmt,
        subject: "Receiver warm".to_string(),
        system: "Receiver".to_string(),
        fault_type: "Hardware".to_string(),
        status: FaultStatus::Open,
        urgent: true,
        time_lost: qtty::Hours::new(1.5),
        filed: Utc.with_ymd_and_hms(2002, 12, 11, 9, 0, 0).unwrap(),
        fault_date: Some(Utc.with_ymd_and_hms(2002, 12, 10, 4, 0, 0).unwrap()),
        projects: vec![],
        responses: vec![],
    };
    repo.store_fault(&fault).await.unwrap();

    let night = UtRange::single(date(10));
    assert!(repo.fetch_faults_filed(FaultCategory::Jcmt, &night).await.unwrap().is_empty());
    assert_eq!(repo.fetch_faults_occurred(FaultCategory::Jcmt, &night).await.unwrap().len(), 1);
    assert!(repo
        .fetch_faults_occurred(FaultCategory::Ukirt, &night)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(repo.get_fault("20021211.001").await.unwrap().unwrap(), fault);
}

#[tokio::test]
async fn test_shift_comments_and_unhealthy_store() {
    let repo = LocalRepository::new();
    let comment = ShiftComment {
        telescope: Telescope::Ukirt,
        author: "observer".to_string(),
        date: Utc.with_ymd_and_hms(2002, 12, 10, 7, 0, 0).unwrap(),
        text: "Clear all night".to_string(),
    };
    repo.add_shift_comment(&comment).await.unwrap();
    let night = UtRange::single(date(10));
    assert_eq!(repo.fetch_shift_comments(Telescope::Ukirt, &night).await.unwrap(), vec![comment]);
    assert!(repo.fetch_shift_comments(Telescope::Jcmt, &night).await.unwrap().is_empty());

    repo.set_healthy(false);
    let err = repo.fetch_shift_comments(Telescope::Ukirt, &night).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ConnectionError { .. }));
    assert!(err.is_retryable());
}
