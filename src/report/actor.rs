//! Visits report: owns the loaded visits and the chart built on top of them
//!
//! Loads run on a single actor task fed through an mpsc channel, so a burst
//! of reload requests (for example, several push notifications arriving at
//! once) results in one fetch.

use chrono_tz::Tz;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::source::VisitsSource;
use crate::config::ChartConfig;
use crate::live::Reloadable;
use crate::models::{Visit, VisitsParams};
use crate::visits::{ChartData, Step, VisitsChart};

/// Decides whether a visit belongs to the highlighted subset
pub type HighlightFilter = Arc<dyn Fn(&Visit) -> bool + Send + Sync>;

/// Message types for the ReportActor
enum ReportMessage {
    /// Load visits with the latest params
    Load,
    /// Stop the actor
    Shutdown,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ChartState {
    chart: VisitsChart,
    /// Whether the step still has to be inferred from the first snapshot
    infer_step: bool,
    highlight: Option<HighlightFilter>,
}

impl ChartState {
    fn apply_highlight(&mut self) {
        let highlighted: Vec<Visit> = match &self.highlight {
            Some(filter) => self.chart.visits().iter().filter(|v| filter(v)).cloned().collect(),
            None => Vec::new(),
        };
        self.chart.set_highlighted_visits(highlighted);
    }
}

/// State shared between the report handle and its actor
struct ReportState {
    tz: Tz,
    params: Mutex<Option<VisitsParams>>,
    chart: Mutex<ChartState>,
    last_error: Mutex<Option<String>>,
    completed: AtomicUsize,
    completed_tx: watch::Sender<usize>,
}

impl ReportState {
    fn store_snapshot(&self, visits: Vec<Visit>) {
        let snapshot: Arc<[Visit]> = visits.into();
        let mut state = lock(&self.chart);

        if state.infer_step {
            let skip_empty = state.chart.skip_empty();
            state.chart = VisitsChart::new(snapshot, self.tz).with_skip_empty(skip_empty);
            state.infer_step = false;
        } else {
            state.chart.set_visits(snapshot);
        }
        state.apply_highlight();
    }
}

/// Actor that performs visit loads one at a time
struct ReportActor {
    receiver: mpsc::Receiver<ReportMessage>,
    source: Arc<dyn VisitsSource>,
    state: Arc<ReportState>,
}

impl ReportActor {
    async fn run(mut self) {
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ReportMessage::Load => {
                    // Requests queued meanwhile are served by this same load
                    let mut shutdown = false;
                    while let Ok(next) = self.receiver.try_recv() {
                        if let ReportMessage::Shutdown = next {
                            shutdown = true;
                            break;
                        }
                    }

                    self.load().await;

                    if shutdown {
                        break;
                    }
                }
                ReportMessage::Shutdown => break,
            }
        }
        debug!("Visits report actor stopped");
    }

    async fn load(&self) {
        let Some(params) = lock(&self.state.params).clone() else {
            return;
        };

        match self.source.load_visits(&params).await {
            Ok(visits) => {
                info!("Loaded {} visits", visits.len());
                self.state.store_snapshot(visits);
                *lock(&self.state.last_error) = None;
            }
            Err(e) => {
                error!("Failed to load visits: {}", e);
                *lock(&self.state.last_error) = Some(e.to_string());
            }
        }

        let completed = self.state.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.completed_tx.send_replace(completed);
    }
}

/// Handle to a running visits report
#[derive(Clone)]
pub struct VisitsReport {
    sender: mpsc::Sender<ReportMessage>,
    state: Arc<ReportState>,
    completed_rx: watch::Receiver<usize>,
}

impl VisitsReport {
    /// Start a report reading from `source`. Must be called within a tokio runtime.
    pub fn spawn(source: Arc<dyn VisitsSource>, chart_config: &ChartConfig) -> anyhow::Result<Self> {
        let tz = chart_config.timezone()?;
        let (sender, receiver) = mpsc::channel(64);
        let (completed_tx, completed_rx) = watch::channel(0);

        let chart = VisitsChart::new(Vec::<Visit>::new(), tz)
            .with_skip_empty(chart_config.skip_empty);
        let state = Arc::new(ReportState {
            tz,
            params: Mutex::new(None),
            chart: Mutex::new(ChartState {
                chart,
                infer_step: true,
                highlight: None,
            }),
            last_error: Mutex::new(None),
            completed: AtomicUsize::new(0),
            completed_tx,
        });

        let actor = ReportActor {
            receiver,
            source,
            state: Arc::clone(&state),
        };
        tokio::spawn(async move {
            actor.run().await;
        });

        Ok(Self {
            sender,
            state,
            completed_rx,
        })
    }

    /// Load visits matching `params`, remembering them for later reloads
    pub fn load(&self, params: VisitsParams) {
        *lock(&self.state.params) = Some(params);
        self.request_load();
    }

    fn request_load(&self) {
        match self.sender.try_send(ReportMessage::Load) {
            Ok(()) => {}
            // A full queue already holds loads that will pick up the latest params
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Visits load already queued");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Visits report is shut down, ignoring load request");
            }
        }
    }

    pub fn params(&self) -> Option<VisitsParams> {
        lock(&self.state.params).clone()
    }

    /// Latest loaded visits
    pub fn visits(&self) -> Vec<Visit> {
        lock(&self.state.chart).chart.visits().to_vec()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.state.last_error).clone()
    }

    /// Number of loads finished so far, successful or not
    pub fn completed_loads(&self) -> usize {
        self.state.completed.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` loads have finished
    pub async fn wait_for_loads(&self, count: usize) {
        let mut rx = self.completed_rx.clone();
        // The sender lives as long as the report state, which we hold
        let _ = rx.wait_for(|completed| *completed >= count).await;
    }

    pub fn chart_data(&self) -> ChartData {
        lock(&self.state.chart).chart.chart_data()
    }

    pub fn step(&self) -> Step {
        lock(&self.state.chart).chart.step()
    }

    pub fn set_step(&self, step: Step) {
        let mut state = lock(&self.state.chart);
        state.chart.set_step(step);
        state.infer_step = false;
    }

    pub fn set_skip_empty(&self, skip_empty: bool) {
        lock(&self.state.chart).chart.set_skip_empty(skip_empty);
    }

    pub fn toggle_skip_empty(&self) {
        lock(&self.state.chart).chart.toggle_skip_empty();
    }

    /// Click on a chart point; returns the visits of the selected bucket
    pub fn select_point(&self, index: usize) -> Vec<Visit> {
        lock(&self.state.chart).chart.select_point(index)
    }

    pub fn selected_label(&self) -> Option<String> {
        lock(&self.state.chart)
            .chart
            .selected_label()
            .map(str::to_string)
    }

    /// Overlay the visits matching `filter`; kept up to date across reloads
    pub fn highlight(&self, filter: HighlightFilter) {
        let mut state = lock(&self.state.chart);
        state.highlight = Some(filter);
        state.apply_highlight();
    }

    pub fn clear_highlight(&self) {
        let mut state = lock(&self.state.chart);
        state.highlight = None;
        state.apply_highlight();
    }

    /// Stop the actor; later load requests are ignored
    pub async fn shutdown(&self) {
        let _ = self.sender.send(ReportMessage::Shutdown).await;
    }
}

impl Reloadable for VisitsReport {
    fn reload(&self) {
        if lock(&self.state.params).is_none() {
            debug!("Ignoring reload before the first load");
            return;
        }
        self.request_load();
    }
}
