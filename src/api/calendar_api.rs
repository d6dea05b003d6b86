use crate::config::GoogleConfig;
use crate::error::AgendaError;
use crate::types::calendar::{EventSummaryPatch, EventsListResponse, ExternalEvent};
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Outcome of an event delete. A missing event counts as deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

/// The three Google Calendar calls the core needs, bound to one calendar.
/// Every call takes an already-valid access token.
#[derive(Clone)]
pub struct CalendarGateway {
    client: reqwest::Client,
    api_base: Url,
    calendar_id: String,
    max_results: u32,
    list_retry_times: usize,
}

impl CalendarGateway {
    pub fn new(client: reqwest::Client, cfg: &GoogleConfig) -> Self {
        Self {
            client,
            api_base: cfg.calendar_api_base.clone(),
            calendar_id: cfg.calendar_id.clone(),
            max_results: cfg.max_results,
            list_retry_times: cfg.list_retry_times,
        }
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.list_retry_times)
            .with_jitter()
    }

    /// `{base}/calendars/{calendar_id}/events[/{event_id}]`, segments percent-encoded.
    fn events_url(&self, event_id: Option<&str>) -> Result<Url, AgendaError> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments
                .pop_if_empty()
                .extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// One page of upcoming single events ordered by start time.
    pub async fn list_upcoming_events(
        &self,
        token: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, AgendaError> {
        let url = self.events_url(None)?;
        let time_min = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let max_results = self.max_results.to_string();

        let page: EventsListResponse = (|| async {
            let resp = self
                .client
                .get(url.clone())
                .bearer_auth(token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("maxResults", max_results.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                ])
                .send()
                .await?;
            let resp = ensure_success(resp).await?;
            Ok::<_, AgendaError>(resp.json::<EventsListResponse>().await?)
        })
        .retry(self.retry_policy())
        .when(|e: &AgendaError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!("events.list retrying after error {}, sleeping {:?}", err, dur);
        })
        .await?;

        let events: Vec<ExternalEvent> = page.items.into_iter().map(Into::into).collect();
        debug!(count = events.len(), "Fetched upcoming calendar events");
        Ok(events)
    }

    /// Delete one event. 404 and 410 are treated as already deleted.
    pub async fn delete_event(
        &self,
        token: &str,
        event_id: &str,
    ) -> Result<DeleteOutcome, AgendaError> {
        let resp = self
            .client
            .delete(self.events_url(Some(event_id))?)
            .bearer_auth(token)
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(DeleteOutcome::AlreadyGone),
            _ => {
                ensure_success(resp).await?;
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    /// Retitle and recolor one event.
    pub async fn patch_event_summary(
        &self,
        token: &str,
        event_id: &str,
        new_title: &str,
        color_id: &str,
    ) -> Result<(), AgendaError> {
        let resp = self
            .client
            .patch(self.events_url(Some(event_id))?)
            .bearer_auth(token)
            .json(&EventSummaryPatch {
                summary: new_title,
                color_id,
            })
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, AgendaError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(AgendaError::Gateway { status, message })
}
