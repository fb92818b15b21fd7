//! # Dashboard Controller
//!
//! Wires data sources, the view renderer, the rotation scheduler and a display
//! sink into the two supervised units:
//!
//! - **data collection**: refresh every data source
//! - **display refresh**: collect the views of every source, pick the next one,
//!   render it, hand it to the sink and only then record it as shown
//!
//! The display tick never awaits, so it always sees the data of one complete
//! refresh.

use crate::compositor::IndexedImage;
use crate::display::{DisplaySink, SinkError};
use crate::layout::Typeface;
use crate::render::{RenderError, ViewRenderer};
use crate::rotation::RotationScheduler;
use crate::supervisor::{supervise, Unit, RESTART_DELAY};
use crate::ViewData;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from refreshing a data source.
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// Request failed, timed out or returned a non-success status
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Entity state is missing, null or not a string
    #[error("invalid state for {entity_id}: {state}")]
    InvalidState { entity_id: String, state: String },
}

/// Failure of one supervised tick.
#[derive(Error, Debug)]
pub enum TickError {
    #[error("data refresh failed")]
    DataSource(#[from] DataSourceError),

    #[error("rendering failed")]
    Render(#[from] RenderError),

    #[error("display update failed")]
    Sink(#[from] SinkError),
}

/// A module that polls some backend and turns its state into views.
#[allow(async_fn_in_trait)]
pub trait DataSource {
    /// Name used in log lines
    fn name(&self) -> &str;

    /// Poll the backend and replace the module's cached state.
    async fn refresh(&self) -> Result<(), DataSourceError>;

    /// Views for the current cached state, possibly empty.
    fn current_views(&self) -> Vec<ViewData>;
}

/// Refreshes every data source, stopping at the first failure.
pub struct DataCollection<'a, M> {
    modules: &'a [M],
    interval: Duration,
}

impl<'a, M: DataSource> DataCollection<'a, M> {
    pub fn new(modules: &'a [M], interval: Duration) -> Self {
        Self { modules, interval }
    }

    pub async fn refresh_all(&self) -> Result<(), TickError> {
        for module in self.modules {
            debug!(module = module.name(), "Refreshing module");
            module.refresh().await?;
        }
        Ok(())
    }
}

impl<M: DataSource> Unit for DataCollection<'_, M> {
    type Error = TickError;

    fn name(&self) -> &str {
        "data collection"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<(), TickError> {
        self.refresh_all().await
    }
}

/// Picks, renders and presents the next view.
pub struct DisplayRefresh<'a, M, T: Typeface, K> {
    modules: &'a [M],
    renderer: &'a ViewRenderer<T>,
    sink: &'a mut K,
    rotation: &'a mut RotationScheduler,
    interval: Duration,
}

impl<'a, M, T, K> DisplayRefresh<'a, M, T, K>
where
    M: DataSource,
    T: Typeface,
    K: DisplaySink,
{
    pub fn new(
        modules: &'a [M],
        renderer: &'a ViewRenderer<T>,
        sink: &'a mut K,
        rotation: &'a mut RotationScheduler,
        interval: Duration,
    ) -> Self {
        Self {
            modules,
            renderer,
            sink,
            rotation,
            interval,
        }
    }

    /// Show the next view. `Ok(None)` when no module has anything to show.
    ///
    /// The view is recorded as shown only after the sink accepted it, so a
    /// failed render or present is retried with the same view.
    pub fn show_next(&mut self) -> Result<Option<ViewData>, TickError> {
        let candidates: Vec<ViewData> = self
            .modules
            .iter()
            .flat_map(|module| module.current_views())
            .collect();

        let Some(view) = self.rotation.peek_next(&candidates) else {
            warn!("No views to display, skipping update");
            return Ok(None);
        };

        let frame: IndexedImage = self.renderer.render(view)?;
        self.sink.present(&frame)?;

        info!(kind = view.kind(), candidates = candidates.len(), "Displayed view");
        self.rotation.commit(view.clone());
        Ok(Some(view.clone()))
    }
}

impl<M, T, K> Unit for DisplayRefresh<'_, M, T, K>
where
    M: DataSource,
    T: Typeface,
    K: DisplaySink,
{
    type Error = TickError;

    fn name(&self) -> &str {
        "display refresh"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<(), TickError> {
        self.show_next().map(|_| ())
    }
}

/// The whole service: data sources, renderer, sink and rotation state.
pub struct Dashboard<M, T: Typeface, K> {
    modules: Vec<M>,
    renderer: ViewRenderer<T>,
    sink: K,
    rotation: RotationScheduler,
    data_interval: Duration,
    view_interval: Duration,
    restart_delay: Duration,
}

impl<M, T, K> Dashboard<M, T, K>
where
    M: DataSource,
    T: Typeface,
    K: DisplaySink,
{
    pub fn new(
        modules: Vec<M>,
        renderer: ViewRenderer<T>,
        sink: K,
        data_interval: Duration,
        view_interval: Duration,
    ) -> Self {
        Self {
            modules,
            renderer,
            sink,
            rotation: RotationScheduler::new(),
            data_interval,
            view_interval,
            restart_delay: RESTART_DELAY,
        }
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn modules(&self) -> &[M] {
        &self.modules
    }

    /// Refresh every data source once.
    pub async fn refresh_data(&self) -> Result<(), TickError> {
        DataCollection::new(&self.modules, self.data_interval)
            .refresh_all()
            .await
    }

    /// Run one display tick outside the supervisor.
    pub fn show_next(&mut self) -> Result<Option<ViewData>, TickError> {
        DisplayRefresh::new(
            &self.modules,
            &self.renderer,
            &mut self.sink,
            &mut self.rotation,
            self.view_interval,
        )
        .show_next()
    }

    /// Run both units until `running` is cleared.
    pub async fn run(&mut self, running: &AtomicBool) {
        let mut data = DataCollection::new(&self.modules, self.data_interval);
        let mut display = DisplayRefresh::new(
            &self.modules,
            &self.renderer,
            &mut self.sink,
            &mut self.rotation,
            self.view_interval,
        );

        tokio::join!(
            supervise(&mut data, running, self.restart_delay),
            supervise(&mut display, running, self.restart_delay),
        );
    }
}
