use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use chrono::{Days, Local, NaiveDateTime, NaiveTime};
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::cli::ScheduleArgs;
use crate::crawl::{CrawlOptions, DEFAULT_BASE_URL, crawl, parse_http_url};
use crate::fetch::HttpPageSource;

pub const DEFAULT_RUN_AT: &str = "19:00";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
const STOP_CHECK_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Cooperative cancellation token shared with signal handlers.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Raises the flag on SIGINT or SIGTERM instead of terminating the process.
    pub fn register_signals(&self) -> anyhow::Result<()> {
        signal_hook::flag::register(SIGTERM, Arc::clone(&self.0)).context("register SIGTERM")?;
        signal_hook::flag::register(SIGINT, Arc::clone(&self.0)).context("register SIGINT")?;
        Ok(())
    }
}

/// Fires once per day at a fixed local time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTrigger {
    at: NaiveTime,
    next_run: NaiveDateTime,
}

impl DailyTrigger {
    pub fn new(at: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            at,
            next_run: next_occurrence(at, now),
        }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_run
    }

    /// Missed days are not replayed; the next run is the first slot after `now`.
    fn advance(&mut self, now: NaiveDateTime) {
        self.next_run = next_occurrence(self.at, now);
    }
}

fn next_occurrence(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now { today } else { today + Days::new(1) }
}

pub fn parse_time_of_day(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("time of day must be HH:MM: {raw}"))
}

pub struct Scheduler {
    trigger: DailyTrigger,
    poll_interval: Duration,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(at: NaiveTime, poll_interval: Duration) -> Self {
        Self::starting_at(at, poll_interval, Local::now().naive_local())
    }

    pub fn starting_at(at: NaiveTime, poll_interval: Duration, now: NaiveDateTime) -> Self {
        Self {
            trigger: DailyTrigger::new(at, now),
            poll_interval,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.trigger.next_run()
    }

    /// Runs `job` if the trigger is due at `now`. A failing job is logged and
    /// the scheduler stays usable. Returns whether the job ran.
    pub fn run_pending<F>(&mut self, now: NaiveDateTime, job: F) -> bool
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        if self.state == SchedulerState::Stopped || !self.trigger.is_due(now) {
            return false;
        }

        self.state = SchedulerState::Running;
        tracing::info!(at = %now.format("%H:%M"), "scheduled crawl started");
        match job() {
            Ok(()) => tracing::info!("scheduled crawl completed"),
            Err(err) => tracing::error!(?err, "scheduled crawl failed"),
        }

        self.trigger.advance(now);
        self.state = SchedulerState::Idle;
        tracing::info!(next_run = %self.trigger.next_run(), "waiting for next run");
        true
    }

    /// Polls the trigger until `stop` is raised. A crawl already in progress is
    /// never interrupted; the flag is observed between polls.
    pub fn run<F>(&mut self, stop: &StopFlag, mut job: F)
    where
        F: FnMut() -> anyhow::Result<()>,
    {
        tracing::info!(
            at = %self.trigger.at().format("%H:%M"),
            next_run = %self.trigger.next_run(),
            poll_secs = self.poll_interval.as_secs(),
            "scheduler started"
        );

        while !stop.is_stopped() {
            self.run_pending(Local::now().naive_local(), &mut job);
            self.idle(stop);
        }

        self.state = SchedulerState::Stopped;
        tracing::info!("scheduler stopped");
    }

    fn idle(&self, stop: &StopFlag) {
        let deadline = Instant::now() + self.poll_interval;
        while !stop.is_stopped() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(remaining.min(STOP_CHECK_SLICE));
        }
    }
}

/// Scheduler entry point: crawls the default catalog daily at 19:00 local time
/// and persists the report, until SIGINT or SIGTERM.
pub fn start() -> anyhow::Result<()> {
    let at = parse_time_of_day(DEFAULT_RUN_AT)?;
    let options = CrawlOptions::new(parse_http_url(DEFAULT_BASE_URL)?).persist(true);
    serve(at, DEFAULT_POLL_INTERVAL, options)
}

pub fn run(args: ScheduleArgs) -> anyhow::Result<()> {
    let at = parse_time_of_day(&args.at).context("parse --at")?;
    let base_url = parse_http_url(&args.base_url).context("parse --base-url")?;
    if args.poll_secs == 0 {
        anyhow::bail!("--poll-secs must be greater than zero");
    }
    let options = CrawlOptions::new(base_url)
        .persist(true)
        .output(&args.out)
        .page_delay(Duration::from_millis(args.delay_ms));
    serve(at, Duration::from_secs(args.poll_secs), options)
}

fn serve(at: NaiveTime, poll_interval: Duration, options: CrawlOptions) -> anyhow::Result<()> {
    let stop = StopFlag::new();
    stop.register_signals()?;
    let source = HttpPageSource::new()?;

    let mut scheduler = Scheduler::new(at, poll_interval);
    scheduler.run(&stop, || {
        let result = crawl(&source, &options)?;
        tracing::info!(books = result.len(), "scheduled crawl collected books");
        Ok(())
    });
    Ok(())
}
