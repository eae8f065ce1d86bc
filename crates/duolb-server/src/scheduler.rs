//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! housekeeping jobs.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::middleware::KeyedRateLimiter;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    track_limiter: KeyedRateLimiter,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_rate_limit_sweep_job(&scheduler, track_limiter).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Drop expired tracking rate-limit windows once a minute (`0 * * * * *`).
async fn register_rate_limit_sweep_job(
    scheduler: &JobScheduler,
    limiter: KeyedRateLimiter,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let limiter = limiter.clone();

        Box::pin(async move {
            let removed = limiter.sweep().await;
            if removed > 0 {
                tracing::debug!(removed, "scheduler: swept expired rate-limit windows");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
