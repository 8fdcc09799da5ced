//! Room signage service: source, cache, schedule and status.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use roomsign_core::{
    DateRange, DaySchedule, RoomStatus, SCHEDULE_DAYS, ScheduleBuilder, ScheduleEvent,
    ScheduleRanges, end_of_day, format_schedule, room_status_with, start_of_day,
};
use roomsign_feeds::{CalendarSet, FeedResult, InstanceRecord, api};
use tracing::debug;

use crate::cache::CalendarCache;
use crate::config::ServiceConfig;
use crate::error::{ServerError, ServerResult};
use crate::source::{FeedPayload, FeedSource};

/// A parsed feed, as held by the cache.
#[derive(Debug)]
pub enum LoadedFeed {
    /// iCalendar document; instances are expanded per query window.
    Calendars(CalendarSet),
    /// JSON event list; events are already absolute.
    Events(Vec<ScheduleEvent>),
}

impl LoadedFeed {
    /// Parses a payload with the service settings. Floating iCalendar values
    /// are read in the display timezone.
    pub fn parse(
        payload: &FeedPayload,
        config: &ServiceConfig,
        now: DateTime<Utc>,
    ) -> FeedResult<Self> {
        Ok(match payload {
            FeedPayload::Ical(text) => Self::Calendars(CalendarSet::parse_in(
                text,
                &config.sanitize,
                config.timezone,
            )?),
            FeedPayload::Json(text) => Self::Events(api::parse_events(text, &config.timezone, now)?),
        })
    }

    /// Absolute events overlapping `[start, end]`.
    pub fn schedule_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FeedResult<Vec<ScheduleEvent>> {
        match self {
            Self::Calendars(set) => set.schedule_events(start, end),
            Self::Events(events) => {
                let Some(window) = DateRange::try_new(start, end) else {
                    return Ok(Vec::new());
                };
                Ok(events
                    .iter()
                    .filter(|e| e.overlaps(&window))
                    .cloned()
                    .collect())
            }
        }
    }

    /// Instance records overlapping `[start, end]`.
    pub fn records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FeedResult<Vec<InstanceRecord>> {
        match self {
            Self::Calendars(set) => set.between(start, end),
            Self::Events(_) => Ok(self
                .schedule_events(start, end)?
                .into_iter()
                .map(|event| InstanceRecord {
                    title: event.summary,
                    description: None,
                    start: event.start.to_rfc3339_opts(SecondsFormat::Millis, true),
                    end: event.end.to_rfc3339_opts(SecondsFormat::Millis, true),
                    all_day: false,
                })
                .collect()),
        }
    }
}

/// Ties a feed source to the cache, the schedule builder and the status
/// evaluator.
///
/// Every query has an `_at` form taking the current instant explicitly; the
/// plain form uses the system clock.
pub struct RoomSignService {
    source: Box<dyn FeedSource>,
    cache: CalendarCache<LoadedFeed>,
    builder: ScheduleBuilder,
    config: ServiceConfig,
}

impl RoomSignService {
    /// Creates a service reading from `source`.
    pub fn new(source: impl FeedSource + 'static, config: ServiceConfig) -> Self {
        Self::from_boxed(Box::new(source), config)
    }

    /// Creates a service from an already boxed source.
    pub fn from_boxed(source: Box<dyn FeedSource>, config: ServiceConfig) -> Self {
        Self {
            source,
            cache: CalendarCache::new(config.refresh_interval, config.serve_stale),
            builder: ScheduleBuilder::new(config.keyword.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the parsed feed, refreshing it when stale.
    pub async fn feed(&self) -> ServerResult<Arc<LoadedFeed>> {
        self.cache
            .get_or_refresh(|| async {
                let payload = self.source.fetch().await?;
                debug!(source = self.source.name(), "Parsing feed");
                Ok::<_, ServerError>(LoadedFeed::parse(&payload, &self.config, Utc::now())?)
            })
            .await
    }

    /// Drops the cached feed and fetches it again.
    pub async fn refresh(&self) -> ServerResult<Arc<LoadedFeed>> {
        self.cache.invalidate().await;
        self.feed().await
    }

    /// The seven-day schedule starting today.
    pub async fn schedule(&self) -> ServerResult<Vec<DaySchedule<chrono_tz::Tz>>> {
        self.schedule_at(Utc::now()).await
    }

    /// The seven-day schedule starting on `now`'s day in the display zone.
    pub async fn schedule_at(
        &self,
        now: DateTime<Utc>,
    ) -> ServerResult<Vec<DaySchedule<chrono_tz::Tz>>> {
        let local = now.with_timezone(&self.config.timezone);
        let (start, end) = self.window(&local, SCHEDULE_DAYS as u32);
        let events = self.feed().await?.schedule_events(start, end)?;
        Ok(self.builder.build(&events, &local))
    }

    /// The schedule rendered as display strings.
    pub async fn schedule_ranges_at(&self, now: DateTime<Utc>) -> ServerResult<Vec<ScheduleRanges>> {
        let schedule = self.schedule_at(now).await?;
        Ok(format_schedule(&schedule, &self.config.format))
    }

    /// The room status right now.
    pub async fn status(&self) -> ServerResult<RoomStatus> {
        self.status_at(Utc::now()).await
    }

    /// The room status at `now`.
    pub async fn status_at(&self, now: DateTime<Utc>) -> ServerResult<RoomStatus> {
        let local = now.with_timezone(&self.config.timezone);
        let schedule = self.schedule_at(now).await?;
        Ok(room_status_with(&schedule, &local, &self.config.format))
    }

    /// Every event instance of the `days` days starting on `now`'s day.
    pub async fn events_at(&self, now: DateTime<Utc>, days: u32) -> ServerResult<Vec<InstanceRecord>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let local = now.with_timezone(&self.config.timezone);
        let (start, end) = self.window(&local, days);
        Ok(self.feed().await?.records(start, end)?)
    }

    /// `[first day 00:00, last day 23:59:59.999]` in the display zone, as UTC.
    fn window(&self, local: &DateTime<chrono_tz::Tz>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        let tz = self.config.timezone;
        let today = local.date_naive();
        let last = today + Duration::days(i64::from(days.max(1)) - 1);
        (
            start_of_day(today, &tz).with_timezone(&Utc),
            end_of_day(last, &tz).with_timezone(&Utc),
        )
    }
}
