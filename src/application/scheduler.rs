// Recurring job scheduler with live interval changes
use crate::domain::error::SchedulerError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Work executed on every tick. Must not fail; it logs and swallows its own errors.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run(Duration),
    Stop,
}

struct RunningTask {
    commands: watch::Sender<Command>,
    handle: JoinHandle<()>,
}

/// Fires one job immediately and then every interval, never overlapping ticks.
#[derive(Default)]
pub struct Scheduler {
    running: Mutex<Option<RunningTask>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(&self, interval_minutes: u32, job: Arc<dyn Job>) -> Result<(), SchedulerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let interval = minutes(interval_minutes)?;
        let (commands, receiver) = watch::channel(Command::Run(interval));
        let handle = tokio::spawn(run_loop(job, interval, receiver));
        *running = Some(RunningTask { commands, handle });

        tracing::info!("Scheduler started with a {} minute interval", interval_minutes);
        Ok(())
    }

    /// Replace the interval. The next fire is measured from now; a tick in flight is not affected.
    pub async fn reschedule(&self, interval_minutes: u32) -> Result<(), SchedulerError> {
        let running = self.running.lock().await;
        let task = running.as_ref().ok_or(SchedulerError::NotRunning)?;

        let interval = minutes(interval_minutes)?;
        task.commands
            .send(Command::Run(interval))
            .map_err(|_| SchedulerError::NotRunning)?;

        tracing::info!("Scheduler interval changed to {} minutes", interval_minutes);
        Ok(())
    }

    /// Stop firing. Waits for a tick in flight to finish.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let task = self.running.lock().await.take().ok_or(SchedulerError::NotRunning)?;

        let _ = task.commands.send(Command::Stop);
        if let Err(e) = task.handle.await {
            tracing::error!("Scheduler task ended abnormally: {}", e);
        }

        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

fn minutes(interval_minutes: u32) -> Result<Duration, SchedulerError> {
    if interval_minutes == 0 {
        return Err(SchedulerError::InvalidInterval);
    }
    Ok(Duration::from_secs(u64::from(interval_minutes) * 60))
}

async fn run_loop(job: Arc<dyn Job>, mut interval: Duration, mut commands: watch::Receiver<Command>) {
    loop {
        let fired_at = Instant::now();
        run_tick(&job).await;
        let mut next_fire = fired_at + interval;

        loop {
            tokio::select! {
                biased;

                changed = commands.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    match *commands.borrow_and_update() {
                        Command::Stop => return,
                        Command::Run(new_interval) => {
                            interval = new_interval;
                            next_fire = Instant::now() + interval;
                            tracing::debug!("Next tick in {:?}", interval);
                        }
                    }
                }
                _ = time::sleep_until(next_fire) => break,
            }
        }
    }
}

/// Runs one tick on its own task so a panicking job cannot end the loop.
async fn run_tick(job: &Arc<dyn Job>) {
    let job = job.clone();
    if let Err(e) = tokio::spawn(async move { job.run().await }).await {
        tracing::error!("Scheduled job aborted: {}", e);
    }
}
