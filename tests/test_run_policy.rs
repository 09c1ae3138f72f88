// Startup and error-policy tests: which failures are fatal, and what the
// run report promises about exit status.

use std::path::PathBuf;

use blobharvest::{HarvestError, ObjectFailure, Pipeline, RunReport, Settings};

fn settings() -> Settings {
    Settings {
        account: "acct".to_string(),
        container: "data".to_string(),
        prefix: "raw/".to_string(),
        account_key: Some("MDEyMzQ1Njc4OWFiY2RlZg==".to_string()),
        sas_token: None,
        endpoint: None,
        local_root: PathBuf::from("downloads"),
        image_column: "image".to_string(),
        title_column: "title".to_string(),
    }
}

#[test]
fn pipeline_builds_with_signing_key() {
    assert!(Pipeline::new(&settings()).is_ok());
}

#[test]
fn pipeline_builds_with_external_token_and_no_key() {
    let mut s = settings();
    s.account_key = None;
    s.sas_token = Some("sv=2021-08-06&sp=rl&sr=c&sig=abc".to_string());
    assert!(Pipeline::new(&s).is_ok());
}

#[test]
fn missing_credentials_are_fatal_at_startup() {
    let mut s = settings();
    s.account_key = None;
    s.sas_token = None;
    let err = Pipeline::new(&s).unwrap_err();
    assert!(matches!(err, HarvestError::MissingCredentials { .. }));
    assert!(err.is_fatal());
}

#[test]
fn malformed_signing_key_is_fatal_at_startup() {
    let mut s = settings();
    s.account_key = Some("!!not-base64!!".to_string());
    let err = Pipeline::new(&s).unwrap_err();
    assert!(matches!(err, HarvestError::MalformedSigningKey(_)));
    assert!(err.is_fatal());
}

#[test]
fn per_object_errors_never_fail_a_report() {
    let report = RunReport {
        listed: 3,
        downloaded: 1,
        failures: vec![
            ObjectFailure {
                object: "raw/broken.parquet".to_string(),
                error: HarvestError::DecodeFailed {
                    file: PathBuf::from("downloads/raw/broken.parquet"),
                    reason: "truncated".to_string(),
                },
            },
            ObjectFailure {
                object: "raw/gone.zip".to_string(),
                error: HarvestError::DownloadFailed {
                    object: "raw/gone.zip".to_string(),
                    reason: "status 404".to_string(),
                },
            },
        ],
        ..RunReport::default()
    };
    // Partial failure leaves the run successful; only the listing gates it.
    assert!(report.ok());
    assert!(report.failures.iter().all(|f| !f.error.is_fatal()));
}

#[test]
fn fatality_split_matches_the_taxonomy() {
    let fatal = HarvestError::ListingFailed {
        prefix: "raw/".to_string(),
        reason: "status 500".to_string(),
    };
    assert!(fatal.is_fatal());

    let isolated = [
        HarvestError::AuthorizationExpired { object: "raw/a.parquet".to_string(), status: 403 },
        HarvestError::DownloadFailed {
            object: "raw/a.parquet".to_string(),
            reason: "connection reset".to_string(),
        },
        HarvestError::DecodeFailed { file: PathBuf::from("a.parquet"), reason: "bad magic".to_string() },
        HarvestError::UnpackFailed { archive: PathBuf::from("a.zip"), reason: "bad header".to_string() },
    ];
    assert!(isolated.iter().all(|e| !e.is_fatal()));
}
