//! End-to-end night report over a seeded local repository.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use omp_rust::config::TelescopeSettings;
use omp_rust::db::repositories::LocalRepository;
use omp_rust::db::repositories::local::{LocalSeed, SeedAccount};
use omp_rust::models::{
    Fault, FaultCategory, FaultStatus, MsbDone, MsbStatus, ObsStatus, Observation, Project,
    ProjectId, ShiftComment, Telescope, TimeAccount,
};
use omp_rust::services::NightReport;
use omp_rust::OmpError;

fn night() -> NaiveDate {
    NaiveDate::from_ymd_opt(2002, 12, 10).unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2002, 12, day, hour, minute, 0).unwrap()
}

fn project(id: &str, queue: &str) -> Project {
    Project {
        project_id: ProjectId::new(id),
        telescope: Telescope::Jcmt,
        country: queue.to_string(),
        semester: "02B".to_string(),
        title: format!("Project {}", id),
        pi: "PI".to_string(),
        contacts: vec![],
        allocated_seconds: 36_000,
        remaining_seconds: 30_000,
        password_digest: None,
    }
}

fn fault(id: &str, filed: DateTime<Utc>, occurred: Option<DateTime<Utc>>, hours: f64) -> Fault {
    Fault {
        fault_id: id.to_string(),
        category: FaultCategory::Jcmt,
        subject: format!("Fault {}", id),
        system: "Antenna".to_string(),
        fault_type: "Hardware".to_string(),
        status: FaultStatus::Open,
        urgent: false,
        time_lost: qtty::Hours::new(hours),
        filed,
        fault_date: occurred,
        projects: vec![],
        responses: vec![],
    }
}

fn observation(obsid: &str, project: &str, start: DateTime<Utc>, minutes: i64) -> Observation {
    Observation {
        obsid: obsid.to_string(),
        telescope: Telescope::Jcmt,
        project_id: ProjectId::new(project),
        instrument: "SCUBA-2".to_string(),
        start,
        end: Some(start + chrono::Duration::minutes(minutes)),
        msb_checksum: None,
        calibration: false,
        status: ObsStatus::Good,
    }
}

fn done(checksum: &str, project: &str, date: DateTime<Utc>, status: MsbStatus) -> MsbDone {
    MsbDone {
        checksum: checksum.to_string(),
        telescope: Telescope::Jcmt,
        project_id: ProjectId::new(project),
        title: format!("MSB {}", checksum),
        instrument: "SCUBA-2".to_string(),
        date,
        status,
        author: Some("observer".to_string()),
        comment: None,
    }
}

fn seeded_repository() -> LocalRepository {
    let seed = LocalSeed {
        projects: vec![project("M01BU53", "UK"), project("E02", "EC")],
        time_accounts: vec![
            SeedAccount {
                telescope: Telescope::Jcmt,
                account: TimeAccount::new("M01BU53", night(), 3600, true),
            },
            SeedAccount {
                telescope: Telescope::Jcmt,
                account: TimeAccount::new("JCMTWEATHER", night(), 1800, false),
            },
            SeedAccount {
                telescope: Telescope::Jcmt,
                account: TimeAccount::new("E02", night(), 900, false),
            },
            // Other telescope, other night: never reported
            SeedAccount {
                telescope: Telescope::Ukirt,
                account: TimeAccount::new("U/02B/5", night(), 7200, true),
            },
            SeedAccount {
                telescope: Telescope::Jcmt,
                account: TimeAccount::new("M01BU53", night().succ_opt().unwrap(), 600, false),
            },
        ],
        faults: vec![
            fault("20021210.001", at(10, 8, 0), None, 0.5),
            fault("20021211.001", at(11, 9, 0), Some(at(10, 5, 0)), 0.25),
            // Filed in the night but occurred the day before: not listed
            fault("20021210.002", at(10, 9, 0), Some(at(9, 23, 0)), 2.0),
        ],
        shift_comments: vec![ShiftComment {
            telescope: Telescope::Jcmt,
            author: "observer".to_string(),
            date: at(10, 6, 30),
            text: "Dome <closed> for wind & rain".to_string(),
        }],
        msb_activity: vec![
            done("aaa", "M01BU53", at(10, 3, 0), MsbStatus::Done),
            done("bbb", "M01BU53", at(10, 4, 0), MsbStatus::Done),
            done("ccc", "M01BU53", at(10, 5, 0), MsbStatus::Rejected),
        ],
        msbs: vec![],
        observations: vec![
            observation("obs1", "M01BU53", at(10, 3, 0), 50),
            Observation {
                calibration: true,
                ..observation("obs2", "M01BU53", at(10, 4, 0), 10)
            },
            Observation {
                status: ObsStatus::Junk,
                ..observation("obs3", "E02", at(10, 5, 0), 15)
            },
        ],
    };
    LocalRepository::from_seed(seed).unwrap()
}

#[tokio::test]
async fn test_assemble_night_report() {
    let repo = seeded_repository();
    let settings = TelescopeSettings::default();
    let report = NightReport::new(&repo, Telescope::Jcmt, night(), 1, &settings);

    let data = report.assemble().await.unwrap();

    assert_eq!(data.start, night());
    assert_eq!(data.end, night());

    // 3600 science + 900 E&C + 1800 weather + 2700 fault time synthesized
    // from the two faults occurring on the night.
    assert_eq!(data.summary.total, 9000);
    assert_eq!(data.summary.science, 3600);
    assert_eq!(data.summary.ec, 900);
    assert_eq!(data.summary.weather, 1800);
    assert_eq!(data.summary.fault, 2700);
    assert_eq!(data.daily.len(), 1);

    let fault_ids: Vec<&str> = data.faults.iter().map(|f| f.fault_id.as_str()).collect();
    assert_eq!(fault_ids, vec!["20021210.001", "20021211.001"]);
    assert_eq!(data.fault_loss_seconds(), 2700);

    let m01 = &data.msbs[&ProjectId::new("M01BU53")];
    assert_eq!(m01.observed, 2);
    assert_eq!(m01.activity.len(), 3);

    assert_eq!(data.comments.len(), 1);

    assert_eq!(repo.account_fetch_count(), 1);
}

#[tokio::test]
async fn test_accounting_combines_stored_and_header_totals() {
    let repo = seeded_repository();
    let settings = TelescopeSettings::default();
    let report = NightReport::new(&repo, Telescope::Jcmt, night(), 1, &settings);

    let accounting = report.accounting().await.unwrap();

    let m01 = accounting.stored[&ProjectId::new("M01BU53")];
    assert_eq!(m01.confirmed, 3600);
    assert_eq!(m01.pending, 0);
    assert_eq!(m01.total, 3600);
    assert_eq!(accounting.stored[&ProjectId::new("JCMTWEATHER")].pending, 1800);

    assert_eq!(accounting.headers[&ProjectId::new("M01BU53")], 3000);
    assert_eq!(accounting.headers[&ProjectId::new("JCMTCAL")], 600);
    assert!(!accounting.headers.contains_key(&ProjectId::new("E02")));
    assert_eq!(accounting.warnings.len(), 1);
}

#[tokio::test]
async fn test_header_archive_failure_is_a_warning() {
    let repo = seeded_repository();
    repo.set_archive_available(false);
    let settings = TelescopeSettings::default();
    let report = NightReport::new(&repo, Telescope::Jcmt, night(), 1, &settings);

    let accounting = report.accounting().await.unwrap();
    assert!(accounting.headers.is_empty());
    assert_eq!(accounting.stored.len(), 3);
    assert!(accounting.warnings[0].contains("Unable to scan data headers"));
}

#[tokio::test]
async fn test_accounting_store_failure_is_fatal() {
    let repo = seeded_repository();
    repo.set_healthy(false);
    let settings = TelescopeSettings::default();
    let report = NightReport::new(&repo, Telescope::Jcmt, night(), 1, &settings);

    let err = report.accounting().await.unwrap_err();
    assert!(matches!(err, OmpError::Database(_)));
}

#[tokio::test]
async fn test_multi_night_range() {
    let repo = seeded_repository();
    let settings = TelescopeSettings::default();
    let report = NightReport::new(&repo, Telescope::Jcmt, night(), 2, &settings);

    let data = report.assemble().await.unwrap();
    assert_eq!(data.end, NaiveDate::from_ymd_opt(2002, 12, 11).unwrap());
    assert_eq!(data.daily.len(), 2);
    assert_eq!(data.project_totals[&ProjectId::new("M01BU53")], 4200);
}

#[tokio::test]
async fn test_rendering_escapes_html() {
    let repo = seeded_repository();
    let settings = TelescopeSettings::default();
    let data = NightReport::new(&repo, Telescope::Jcmt, night(), 1, &settings)
        .assemble()
        .await
        .unwrap();

    let html = data.as_html();
    assert!(html.contains("Dome &lt;closed&gt; for wind &amp; rain"));
    assert!(!html.contains("<closed>"));

    let text = data.as_text();
    assert!(text.contains("Observing report for JCMT (2002-12-10)"));
    assert!(text.contains("Dome <closed> for wind & rain"));
    assert!(text.contains("2.50"));
}
