use std::{sync::Arc, time::Duration};

use jiff::{Span, Timestamp, civil::Time, tz::TimeZone};
use tracing::{error, info};

use crate::pipeline::Pipeline;

/// Next occurrence of `hour`:00 UTC strictly after `now`.
pub fn next_run_after(now: Timestamp, hour: i8) -> Result<Timestamp, jiff::Error> {
    let at = Time::new(hour, 0, 0, 0)?;
    let today = now.to_zoned(TimeZone::UTC).date();
    let candidate = today.to_datetime(at).to_zoned(TimeZone::UTC)?.timestamp();
    if candidate > now {
        return Ok(candidate);
    }
    let tomorrow = today.checked_add(Span::new().days(1))?;
    Ok(tomorrow.to_datetime(at).to_zoned(TimeZone::UTC)?.timestamp())
}

/// Runs the pipeline once a day at `hour` UTC, forever. A failed run is
/// logged and the next one is scheduled as usual.
pub async fn run_nightly(pipeline: Arc<Pipeline>, hour: i8) {
    loop {
        let now = Timestamp::now();
        let next = match next_run_after(now, hour) {
            Ok(next) => next,
            Err(err) => {
                error!(error = %err, hour, "cannot compute next fetch time, scheduler stopped");
                return;
            },
        };

        let wait = Duration::from_millis(
            next.as_millisecond().saturating_sub(now.as_millisecond()).max(0) as u64,
        );
        info!(next_run = %next, "scheduled next movie fetch");
        tokio::time::sleep(wait).await;

        match pipeline.run_scheduled().await {
            Ok(summary) => info!(
                cinemas = summary.cinemas,
                movies = summary.movies,
                events = summary.events,
                "scheduled movie fetch finished"
            ),
            Err(err) => error!(error = %err, "scheduled movie fetch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn before_the_hour_runs_today() {
        let next = next_run_after(ts("2025-03-01T01:30:00Z"), 2).unwrap();
        assert_eq!(next, ts("2025-03-01T02:00:00Z"));
    }

    #[test]
    fn at_or_after_the_hour_runs_tomorrow() {
        assert_eq!(next_run_after(ts("2025-03-01T02:00:00Z"), 2).unwrap(), ts("2025-03-02T02:00:00Z"));
        assert_eq!(next_run_after(ts("2025-03-01T23:59:00Z"), 2).unwrap(), ts("2025-03-02T02:00:00Z"));
    }

    #[test]
    fn rolls_over_month_end() {
        let next = next_run_after(ts("2025-02-28T05:00:00Z"), 2).unwrap();
        assert_eq!(next, ts("2025-03-01T02:00:00Z"));
    }

    #[test]
    fn invalid_hour_is_an_error() {
        assert!(next_run_after(ts("2025-03-01T01:30:00Z"), 24).is_err());
    }
}
