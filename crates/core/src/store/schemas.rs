//! Persisted extraction schemas.
//!
//! A validated [`ExtractionSchema`] is stored as JSON; the newest row per
//! company is the one production scraping uses.

use super::connection::JobStore;
use crate::Error;
use crate::model::ExtractionSchema;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl JobStore {
    /// Append a validated schema for a company.
    pub async fn save_schema(&self, company_id: i64, schema: &ExtractionSchema) -> Result<(), Error> {
        let json = serde_json::to_string(schema)?;
        let final_url = schema.final_url.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO schemas (company_id, schema_json, final_url, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![company_id, json, final_url, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The most recently saved schema for a company.
    pub async fn latest_schema(&self, company_id: i64) -> Result<Option<ExtractionSchema>, Error> {
        let json = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT schema_json FROM schemas WHERE company_id = ?1 ORDER BY id DESC LIMIT 1",
                    params![company_id],
                    |row| row.get(0),
                );

                match result {
                    Ok(json) => Ok(Some(json)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        json.map(|json| serde_json::from_str(&json).map_err(Error::from)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SearchInteraction, SelectorSet};

    fn schema(container: &str) -> ExtractionSchema {
        let selectors = SelectorSet {
            job_container_selector: container.into(),
            title_selector: "h3".into(),
            ..Default::default()
        };
        ExtractionSchema::new(selectors, "https://acme.test/jobs")
    }

    #[tokio::test]
    async fn test_latest_schema_wins() {
        let store = JobStore::open_in_memory().await.unwrap();
        let id = store.upsert_company("Acme", None).await.unwrap();

        store.save_schema(id, &schema(".old")).await.unwrap();
        let newer = schema(".new").with_search(Some(SearchInteraction::Button { submit_selector: "#interns".into() }));
        store.save_schema(id, &newer).await.unwrap();

        let latest = store.latest_schema(id).await.unwrap().unwrap();
        assert_eq!(latest, newer);
        assert!(latest.search_required());
    }

    #[tokio::test]
    async fn test_latest_schema_missing() {
        let store = JobStore::open_in_memory().await.unwrap();
        let id = store.upsert_company("Acme", None).await.unwrap();
        assert!(store.latest_schema(id).await.unwrap().is_none());
    }
}
