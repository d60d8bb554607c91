//! Company records and scraper execution logs.

use super::connection::JobStore;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A tracked company and the job board URL discovered for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub job_board_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One scraper run outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub company_id: i64,
    pub executed_at: String,
    pub jobs_found: i64,
    pub success: bool,
    pub error: Option<String>,
}

impl JobStore {
    /// Insert a company or update its job board URL, returning its id.
    ///
    /// A `None` URL leaves an existing URL untouched.
    pub async fn upsert_company(&self, name: &str, job_board_url: Option<&str>) -> Result<i64, Error> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("company name must not be empty".into()));
        }
        let url = job_board_url.map(str::to_string);
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO companies (name, job_board_url, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)
                     ON CONFLICT(name) DO UPDATE SET
                        job_board_url = COALESCE(excluded.job_board_url, companies.job_board_url),
                        updated_at = excluded.updated_at",
                    params![name, url, now],
                )?;
                let id: i64 = conn.query_row("SELECT id FROM companies WHERE name = ?1", params![name], |row| row.get(0))?;
                Ok(id)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a company by exact name.
    pub async fn company_by_name(&self, name: &str) -> Result<Option<Company>, Error> {
        let name = name.trim().to_string();
        self.conn
            .call(move |conn| -> Result<Option<Company>, Error> {
                let result = conn.query_row(
                    "SELECT id, name, job_board_url, created_at, updated_at FROM companies WHERE name = ?1",
                    params![name],
                    |row| {
                        Ok(Company {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            job_board_url: row.get(2)?,
                            created_at: row.get(3)?,
                            updated_at: row.get(4)?,
                        })
                    },
                );

                match result {
                    Ok(company) => Ok(Some(company)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record the outcome of a scraper run.
    pub async fn log_execution(
        &self, company_id: i64, jobs_found: usize, success: bool, error: Option<&str>,
    ) -> Result<(), Error> {
        let error = error.map(str::to_string);
        let now = chrono::Utc::now().to_rfc3339();
        let jobs_found = jobs_found as i64;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO scraper_logs (company_id, executed_at, jobs_found, success, error)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![company_id, now, jobs_found, success as i32, error],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Most recent execution logs for a company, newest first.
    pub async fn recent_executions(&self, company_id: i64, limit: usize) -> Result<Vec<ExecutionLog>, Error> {
        let limit = limit as i64;
        self.conn
            .call(move |conn| -> Result<Vec<ExecutionLog>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT company_id, executed_at, jobs_found, success, error
                     FROM scraper_logs WHERE company_id = ?1
                     ORDER BY id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![company_id, limit], |row| {
                    Ok(ExecutionLog {
                        company_id: row.get(0)?,
                        executed_at: row.get(1)?,
                        jobs_found: row.get(2)?,
                        success: row.get::<_, i32>(3)? == 1,
                        error: row.get(4)?,
                    })
                })?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }
}
