//! LMDB database integrity checks.
//!
//! Counts every database and cross-checks the active-entry indexes against
//! the verifications they point at.

use std::path::Path;

use heed::types::Bytes;
use serde::Serialize;

use plancheck_store::VerificationEntry;

use crate::environment::{decode, trailing_id, LmdbEnvironment, DATABASES};
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub active_indexed: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

impl LmdbEnvironment {
    /// Read-only consistency check.
    ///
    /// Read failures and mismatches are recorded in the report rather than
    /// causing a hard error.
    pub fn check_integrity(&self) -> Result<IntegrityReport, LmdbError> {
        let mut report = IntegrityReport::default();
        let rtxn = self.env.read_txn()?;

        for &name in DATABASES {
            match self.env.open_database::<Bytes, Bytes>(&rtxn, Some(name)) {
                Ok(Some(db)) => {
                    report.databases_checked += 1;
                    match db.len(&rtxn) {
                        Ok(count) => report.total_entries += count,
                        Err(e) => report
                            .errors
                            .push(format!("failed to read database '{name}': {e}")),
                    }
                }
                Ok(None) => report.errors.push(format!("database '{name}' is missing")),
                Err(e) => report
                    .errors
                    .push(format!("failed to open database '{name}': {e}")),
            }
        }

        for row in self.active_by_key_db.iter(&rtxn)? {
            let (key, _) = row?;
            report.active_indexed += 1;
            let id = match trailing_id(key) {
                Ok(id) => id,
                Err(e) => {
                    report.errors.push(e.to_string());
                    continue;
                }
            };
            match self.verifications_db.get(&rtxn, id.as_bytes())? {
                Some(bytes) => match decode::<VerificationEntry>(bytes) {
                    Ok(entry) if entry.status.is_active() => {}
                    Ok(entry) => report.errors.push(format!(
                        "verification {id} is indexed as active but is {:?}",
                        entry.status
                    )),
                    Err(e) => report
                        .errors
                        .push(format!("verification {id} does not decode: {e}")),
                },
                None => report
                    .errors
                    .push(format!("active index points at missing verification {id}")),
            }
        }

        let expiring = self.expiry_db.len(&rtxn)?;
        if expiring != report.active_indexed {
            report.errors.push(format!(
                "expiry index holds {expiring} entries, active index {}",
                report.active_indexed
            ));
        }

        if report.is_healthy() {
            tracing::info!(
                databases = report.databases_checked,
                entries = report.total_entries,
                "integrity check passed"
            );
        } else {
            tracing::warn!(errors = report.errors.len(), "integrity check found problems");
        }
        Ok(report)
    }
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
