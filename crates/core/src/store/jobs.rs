//! Job persistence keyed by URL.

use std::collections::HashSet;

use super::connection::JobStore;
use crate::Error;
use crate::model::JobRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Outcome of a batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub added: usize,
    pub duplicates: usize,
}

/// Outcome of a stale-job sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleSummary {
    pub removed: usize,
    pub remaining: usize,
}

impl JobStore {
    /// URLs of every job currently stored for a company.
    pub async fn known_job_urls(&self, company_id: i64) -> Result<HashSet<String>, Error> {
        self.conn
            .call(move |conn| -> Result<HashSet<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM jobs WHERE company_id = ?1")?;
                let rows = stmt.query_map(params![company_id], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<HashSet<_>, _>>().map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert jobs in one transaction, skipping URLs that already exist anywhere in the store.
    pub async fn add_jobs_batch(&self, company_id: i64, jobs: &[JobRecord]) -> Result<BatchSummary, Error> {
        let jobs = jobs.to_vec();
        self.conn
            .call(move |conn| -> Result<BatchSummary, Error> {
                let tx = conn.transaction()?;
                let mut summary = BatchSummary::default();
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO jobs
                            (company_id, title, url, description, location, requirements, scraped_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    )?;
                    for job in jobs.iter().filter(|job| job.is_complete()) {
                        let inserted = stmt.execute(params![
                            company_id,
                            job.title,
                            job.url,
                            job.description,
                            job.location,
                            job.requirements,
                            job.scraped_at.to_rfc3339(),
                        ])?;
                        if inserted == 0 {
                            summary.duplicates += 1;
                        } else {
                            summary.added += 1;
                        }
                    }
                }
                tx.commit()?;
                Ok(summary)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a company's jobs whose URL is not among `active_urls`.
    pub async fn remove_stale_jobs(&self, company_id: i64, active_urls: &HashSet<String>) -> Result<StaleSummary, Error> {
        let active = active_urls.clone();
        self.conn
            .call(move |conn| -> Result<StaleSummary, Error> {
                let tx = conn.transaction()?;
                let stored: Vec<String> = {
                    let mut stmt = tx.prepare("SELECT url FROM jobs WHERE company_id = ?1")?;
                    let rows = stmt.query_map(params![company_id], |row| row.get::<_, String>(0))?;
                    rows.collect::<Result<Vec<_>, _>>()?
                };

                let mut removed = 0;
                for url in stored.iter().filter(|url| !active.contains(*url)) {
                    removed += tx.execute("DELETE FROM jobs WHERE company_id = ?1 AND url = ?2", params![company_id, url])?;
                }
                tx.commit()?;

                Ok(StaleSummary { removed, remaining: stored.len() - removed })
            })
            .await
            .map_err(Error::from)
    }

    /// All jobs stored for a company, in insertion order.
    pub async fn jobs_for_company(&self, company_id: i64) -> Result<Vec<JobRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<JobRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT title, url, description, location, requirements, scraped_at
                     FROM jobs WHERE company_id = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![company_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?;

                let mut jobs = Vec::new();
                for row in rows {
                    let (title, url, description, location, requirements, scraped_at) = row?;
                    let scraped_at = DateTime::parse_from_rfc3339(&scraped_at)
                        .map_err(|e| Error::Serialization(format!("scraped_at for {url}: {e}")))?
                        .with_timezone(&Utc);
                    jobs.push(JobRecord { title, url, description, location, requirements, scraped_at });
                }
                Ok(jobs)
            })
            .await
            .map_err(Error::from)
    }
}
