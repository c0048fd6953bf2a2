use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, to_u64},
    models::QueuedSpike,
};
use crate::models::Spike;

const SELECT_QUEUED: &str = "SELECT s.payload, s.queued_at, d.delivered_at, d.remote_id
     FROM spikes s
     LEFT JOIN spike_deliveries d ON d.spike_id = s.id";

fn row_to_queued_spike(row: &Row) -> Result<QueuedSpike> {
    let payload: String = row.get("payload")?;
    let queued_at: String = row.get("queued_at")?;
    let delivered_at: Option<String> = row.get("delivered_at")?;

    let spike: Spike =
        serde_json::from_str(&payload).context("failed to decode queued spike payload")?;

    Ok(QueuedSpike {
        spike,
        queued_at: parse_datetime(&queued_at, "queued_at")?,
        delivered_at: parse_optional_datetime(delivered_at, "delivered_at")?,
        remote_id: row.get("remote_id")?,
    })
}

impl Database {
    /// Append a spike to the local queue. Ids are unique; queueing the same
    /// spike twice is an error, never an overwrite.
    pub async fn insert_spike(&self, spike: &Spike) -> Result<QueuedSpike> {
        let spike = spike.clone();
        self.execute(move |conn| {
            let queued_at = Utc::now();
            let payload =
                serde_json::to_string(&spike).context("failed to encode spike payload")?;

            conn.execute(
                "INSERT INTO spikes (id, project_key, kind, page, url, selector, reviewer_id, reviewer_name, rating, payload, captured_at, queued_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    spike.id,
                    spike.project_key,
                    spike.kind.as_str(),
                    spike.page_title,
                    spike.page_url,
                    spike.selector(),
                    spike.reviewer.id,
                    spike.reviewer.name,
                    spike.rating.map(|rating| rating.as_str()),
                    payload,
                    spike.captured_at.to_rfc3339(),
                    queued_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to queue spike {}", spike.id))?;

            Ok(QueuedSpike {
                spike,
                queued_at,
                delivered_at: None,
                remote_id: None,
            })
        })
        .await
    }

    /// Queued spikes in insertion order, optionally for one project.
    pub async fn list_spikes(&self, project: Option<&str>) -> Result<Vec<QueuedSpike>> {
        let project = project.map(str::to_string);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_QUEUED}
                 WHERE (?1 IS NULL OR s.project_key = ?1)
                 ORDER BY s.queued_at ASC, s.rowid ASC"
            ))?;

            let mut rows = stmt.query(params![project])?;
            let mut spikes = Vec::new();
            while let Some(row) = rows.next()? {
                spikes.push(row_to_queued_spike(row)?);
            }
            Ok(spikes)
        })
        .await
    }

    /// Queued spikes with no recorded delivery, oldest first.
    pub async fn list_pending_spikes(&self, project: Option<&str>) -> Result<Vec<QueuedSpike>> {
        let project = project.map(str::to_string);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_QUEUED}
                 WHERE d.delivered_at IS NULL AND (?1 IS NULL OR s.project_key = ?1)
                 ORDER BY s.queued_at ASC, s.rowid ASC"
            ))?;

            let mut rows = stmt.query(params![project])?;
            let mut spikes = Vec::new();
            while let Some(row) = rows.next()? {
                spikes.push(row_to_queued_spike(row)?);
            }
            Ok(spikes)
        })
        .await
    }

    /// Look a spike up by full id, else by unique id prefix.
    pub async fn find_spike(&self, id_or_prefix: &str) -> Result<Option<QueuedSpike>> {
        let needle = id_or_prefix.trim().to_string();
        self.execute(move |conn| {
            if needle.is_empty() {
                return Ok(None);
            }

            let mut stmt = conn.prepare(&format!("{SELECT_QUEUED} WHERE s.id = ?1"))?;
            let mut rows = stmt.query(params![needle])?;
            if let Some(row) = rows.next()? {
                return row_to_queued_spike(row).map(Some);
            }

            // LIKE would treat `_` from the id alphabet as a wildcard.
            let mut stmt = conn.prepare(&format!(
                "{SELECT_QUEUED}
                 WHERE substr(s.id, 1, length(?1)) = ?1
                 ORDER BY s.queued_at ASC
                 LIMIT 2"
            ))?;
            let mut rows = stmt.query(params![needle])?;
            let mut matches = Vec::new();
            while let Some(row) = rows.next()? {
                matches.push(row_to_queued_spike(row)?);
            }

            match matches.len() {
                0 => Ok(None),
                1 => Ok(matches.pop()),
                _ => bail!("spike id prefix '{needle}' is ambiguous"),
            }
        })
        .await
    }

    pub async fn count_spikes(&self, project: Option<&str>) -> Result<u64> {
        let project = project.map(str::to_string);
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM spikes WHERE (?1 IS NULL OR project_key = ?1)",
                params![project],
                |row| row.get(0),
            )?;
            to_u64(count, "spike count")
        })
        .await
    }

    pub async fn record_delivery(
        &self,
        spike_id: &str,
        remote_id: Option<String>,
        delivered_at: DateTime<Utc>,
    ) -> Result<()> {
        let spike_id = spike_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO spike_deliveries (spike_id, remote_id, delivered_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(spike_id) DO UPDATE SET
                     remote_id = excluded.remote_id,
                     delivered_at = excluded.delivered_at",
                params![spike_id, remote_id, delivered_at.to_rfc3339()],
            )
            .with_context(|| format!("failed to record delivery of spike {spike_id}"))?;
            Ok(())
        })
        .await
    }
}
