//! Campaign CSV ingestion.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::core::session::{CampaignContext, LeadContext};
use crate::errors::{AppError, AppResult};
use crate::scheduler::QueuedCallRequest;
use crate::state::AppState;
use crate::utils::validate_dial_number;

#[derive(Debug, Deserialize)]
struct LeadRow {
    name: Option<String>,
    phno: Option<String>,
    email: Option<String>,
    organisation: Option<String>,
    designation: Option<String>,
}

impl LeadRow {
    fn into_lead(self) -> Result<LeadContext, String> {
        let phone = validate_dial_number(self.phno.as_deref().unwrap_or(""))
            .map_err(|reason| format!("bad phone number: {reason}"))?;
        Ok(LeadContext {
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "there".to_string()),
            phone,
            email: self.email.filter(|v| !v.trim().is_empty()),
            organisation: self.organisation.filter(|v| !v.trim().is_empty()),
            designation: self.designation.filter(|v| !v.trim().is_empty()),
        })
    }
}

/// `POST /upload_csv` - multipart form with a `file` CSV field
/// (`name,phno,email,organisation,designation`) plus campaign metadata
/// fields. Every valid row is queued for dialing; invalid rows are
/// skipped with a warning and reported in the response counts.
pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut csv_bytes: Option<Bytes> = None;
    let mut campaign_name: Option<String> = None;
    let mut campaign_description: Option<String> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                csv_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("unreadable file field: {e}")))?,
                );
            }
            Some("campaign_name") => campaign_name = field.text().await.ok(),
            Some("campaign_description") => campaign_description = field.text().await.ok(),
            Some("language") => language = field.text().await.ok(),
            other => debug!(field = ?other, "ignoring multipart field"),
        }
    }

    let csv_bytes =
        csv_bytes.ok_or_else(|| AppError::BadRequest("missing 'file' field".to_string()))?;
    let campaign = CampaignContext {
        name: campaign_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Reacho campaign".to_string()),
        description: campaign_description.unwrap_or_default(),
        language: language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| state.config.default_language.clone()),
    };

    let mut reader = csv::Reader::from_reader(csv_bytes.as_ref());
    let mut queued = 0usize;
    let mut skipped = 0usize;
    for row in reader.deserialize::<LeadRow>() {
        match row {
            Ok(row) => match row.into_lead() {
                Ok(lead) => {
                    state.scheduler.enqueue(QueuedCallRequest {
                        lead,
                        campaign: campaign.clone(),
                    });
                    queued += 1;
                }
                Err(reason) => {
                    warn!(%reason, "skipping lead row");
                    skipped += 1;
                }
            },
            Err(e) => {
                warn!(error = %e, "skipping malformed CSV row");
                skipped += 1;
            }
        }
    }

    info!(queued, skipped, campaign = %campaign.name, "campaign CSV ingested");
    Ok(Json(json!({
        "queued": queued,
        "skipped": skipped,
        "campaign": campaign.name,
        "dialer": state.scheduler.state(),
    })))
}
