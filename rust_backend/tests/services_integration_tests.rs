//! Queue sweeps, night confirmation and MSB activity against the local store.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use omp_rust::auth::digest_password;
use omp_rust::config::{StaffSettings, TelescopeSettings};
use omp_rust::db::calculate_checksum;
use omp_rust::db::repositories::LocalRepository;
use omp_rust::db::repository::{AccountingRepository, MsbRepository, ProjectRepository};
use omp_rust::models::{
    MsbStatus, ObservabilityWindow, Project, ProjectId, SchedulableMsb, Telescope, TimeAccount,
};
use omp_rust::services::{
    confirm_night, project_accounts, query_queue_status, record_activity, register_msb, MsbEvent,
    QueueFilters,
};
use omp_rust::time::UtRange;
use omp_rust::OmpError;

fn night() -> NaiveDate {
    NaiveDate::from_ymd_opt(2002, 12, 10).unwrap()
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2002, 12, 10, hour, 0, 0).unwrap()
}

fn project(id: &str, queue: &str, semester: &str) -> Project {
    Project {
        project_id: ProjectId::new(id),
        telescope: Telescope::Jcmt,
        country: queue.to_string(),
        semester: semester.to_string(),
        title: String::new(),
        pi: String::new(),
        contacts: vec![],
        allocated_seconds: 0,
        remaining_seconds: 0,
        password_digest: Some(digest_password(&id.to_uppercase(), "proj-pw")),
    }
}

fn msb(msbid: i64, checksum: &str, project: &str, instrument: &str, window: Option<(u32, u32)>) -> SchedulableMsb {
    SchedulableMsb {
        msbid,
        checksum: checksum.to_string(),
        telescope: Telescope::Jcmt,
        project_id: ProjectId::new(project),
        title: format!("MSB {}", msbid),
        instrument: instrument.to_string(),
        remaining: 2,
        time_estimate: 1800,
        windows: window
            .map(|(start, end)| vec![ObservabilityWindow { start: at(start), end: at(end) }])
            .unwrap_or_default(),
    }
}

async fn queue_repository() -> LocalRepository {
    let repo = LocalRepository::new();
    repo.store_project(&project("M01BU53", "UK", "02B")).await.unwrap();
    repo.store_project(&project("M02AC01", "CA", "02A")).await.unwrap();

    repo.store_msb(&msb(1, "a1", "M01BU53", "SCUBA-2", Some((4, 7)))).await.unwrap();
    repo.store_msb(&msb(2, "a2", "M01BU53", "HARP", Some((6, 8)))).await.unwrap();
    repo.store_msb(&msb(3, "b1", "M02AC01", "HARP", None)).await.unwrap();
    repo
}

#[tokio::test]
async fn test_queue_sweep_over_observing_window() {
    let repo = queue_repository().await;
    let settings = TelescopeSettings {
        ut_start_hour: 4,
        ut_end_hour: 8,
        ..Default::default()
    };

    let status = query_queue_status(&repo, Telescope::Jcmt, night(), &QueueFilters::default(), &settings)
        .await
        .unwrap();

    assert_eq!((status.ut_min, status.ut_max), (4, 8));

    let m01 = ProjectId::new("M01BU53");
    let hours = &status.project_hours[&m01];
    assert_eq!(hours.get(&4), Some(&1));
    assert_eq!(hours.get(&6), Some(&2));
    assert_eq!(hours.get(&7), Some(&1));
    assert_eq!(hours.get(&8), None);

    // Each MSB counted once however many hours it was available.
    assert_eq!(status.project_msbs[&m01], 2);
    assert_eq!(status.project_instruments[&m01]["SCUBA-2"], 1);
    assert_eq!(status.project_instruments[&m01]["HARP"], 1);

    let m02 = ProjectId::new("M02AC01");
    assert_eq!(status.project_hours[&m02].len(), 5);
    assert_eq!(status.project_msbs[&m02], 1);
}

#[tokio::test]
async fn test_queue_sweep_filters_and_full_day() {
    let repo = queue_repository().await;
    let settings = TelescopeSettings::default();

    let filters = QueueFilters {
        country: Some("ca".to_string()),
        full_day: true,
        ..Default::default()
    };
    let status = query_queue_status(&repo, Telescope::Jcmt, night(), &filters, &settings)
        .await
        .unwrap();
    assert_eq!((status.ut_min, status.ut_max), (0, 23));
    assert_eq!(status.projects().len(), 1);
    assert_eq!(status.project_hours[&ProjectId::new("M02AC01")].len(), 24);

    let filters = QueueFilters {
        instrument: Some("scuba-2".to_string()),
        ..Default::default()
    };
    let status = query_queue_status(&repo, Telescope::Jcmt, night(), &filters, &settings)
        .await
        .unwrap();
    assert_eq!(status.project_msbs.len(), 1);
    assert_eq!(status.project_msbs[&ProjectId::new("M01BU53")], 1);

    let filters = QueueFilters {
        semester: Some("02B".to_string()),
        ..Default::default()
    };
    let status = query_queue_status(&repo, Telescope::Jcmt, night(), &filters, &settings)
        .await
        .unwrap();
    assert!(!status.project_msbs.contains_key(&ProjectId::new("M02AC01")));
}

fn staff() -> StaffSettings {
    StaffSettings {
        salt: "omp".to_string(),
        password_digest: Some(digest_password("omp", "staff-pw")),
    }
}

#[tokio::test]
async fn test_confirm_night_stores_confirmed_accounts() {
    let repo = queue_repository().await;
    repo.store_time_accounts(Telescope::Jcmt, &[TimeAccount::new("M01BU53", night(), 1200, false)])
        .await
        .unwrap();

    let accounts = vec![
        TimeAccount::new("M01BU53", night(), 3600, false),
        TimeAccount::new("JCMTWEATHER", night(), 1800, false),
    ];
    let stored = confirm_night(&repo, &staff(), Some("staff-pw"), Telescope::Jcmt, night(), &accounts)
        .await
        .unwrap();
    assert_eq!(stored, 2);

    let fetched = repo
        .fetch_time_accounts(Telescope::Jcmt, &UtRange::single(night()))
        .await
        .unwrap();
    assert_eq!(fetched.len(), 2);
    assert!(fetched.iter().all(|a| a.confirmed));
    let m01 = fetched.iter().find(|a| a.project_id.as_str() == "M01BU53").unwrap();
    assert_eq!(m01.seconds, 3600);
}

#[tokio::test]
async fn test_confirm_night_rejections() {
    let repo = queue_repository().await;
    let good = vec![TimeAccount::new("M01BU53", night(), 3600, false)];

    let err = confirm_night(&repo, &staff(), Some("wrong"), Telescope::Jcmt, night(), &good)
        .await
        .unwrap_err();
    assert!(matches!(err, OmpError::Authentication(_)));

    let err = confirm_night(&repo, &staff(), None, Telescope::Jcmt, night(), &good)
        .await
        .unwrap_err();
    assert!(matches!(err, OmpError::Authentication(_)));

    let wrong_night = vec![TimeAccount::new("M01BU53", night().succ_opt().unwrap(), 3600, false)];
    let err = confirm_night(&repo, &staff(), Some("staff-pw"), Telescope::Jcmt, night(), &wrong_night)
        .await
        .unwrap_err();
    assert!(matches!(err, OmpError::BadArgs(_)));

    let unknown = vec![TimeAccount::new("NOSUCH", night(), 3600, false)];
    let err = confirm_night(&repo, &staff(), Some("staff-pw"), Telescope::Jcmt, night(), &unknown)
        .await
        .unwrap_err();
    assert!(matches!(err, OmpError::UnknownProject(ref id) if id == "NOSUCH"));

    // Nothing was stored by the failed attempts.
    assert_eq!(repo.account_count(), 0);
}

#[tokio::test]
async fn test_project_accounts_require_project_password() {
    let repo = queue_repository().await;
    repo.store_time_accounts(Telescope::Jcmt, &[TimeAccount::new("M01BU53", night(), 1200, true)])
        .await
        .unwrap();
    let id = ProjectId::new("m01bu53");

    let accounts = project_accounts(&repo, &id, Some("proj-pw")).await.unwrap();
    assert_eq!(accounts.len(), 1);

    let err = project_accounts(&repo, &id, Some("nope")).await.unwrap_err();
    assert!(matches!(err, OmpError::Authentication(_)));

    let err = project_accounts(&repo, &ProjectId::new("NOSUCH"), Some("proj-pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, OmpError::UnknownProject(_)));
}

#[tokio::test]
async fn test_msb_registration_and_activity() {
    let repo = queue_repository().await;
    let definition = "<SpMSB><title>Deep field</title></SpMSB>";

    let checksum = register_msb(&repo, definition, msb(10, "", "M01BU53", "SCUBA-2", None))
        .await
        .unwrap();
    assert_eq!(checksum, calculate_checksum(definition));

    let event = MsbEvent {
        status: MsbStatus::Done,
        date: at(5),
        author: Some("observer".to_string()),
        comment: None,
    };
    let entry = record_activity(&repo, &checksum, event.clone()).await.unwrap();
    assert_eq!(entry.project_id.as_str(), "M01BU53");
    assert_eq!(repo.find_msb(&checksum).await.unwrap().unwrap().remaining, 1);

    let rejected = MsbEvent {
        status: MsbStatus::Rejected,
        ..event.clone()
    };
    record_activity(&repo, &checksum, rejected).await.unwrap();
    assert_eq!(repo.find_msb(&checksum).await.unwrap().unwrap().remaining, 1);

    let activity = repo
        .fetch_msb_activity(Telescope::Jcmt, &UtRange::single(night()))
        .await
        .unwrap();
    assert_eq!(activity.len(), 2);

    let err = record_activity(&repo, "unknown", event).await.unwrap_err();
    assert!(matches!(err, OmpError::MsbMissing(ref c) if c == "unknown"));
}
