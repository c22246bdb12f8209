use std::time::Duration;

use tokio::{
    sync::broadcast::Receiver,
    time::{Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    channels::recv_logging_lag,
    externals::sensor_feed::control::FeedControl,
    history::HistoryBuffer,
    models::{
        connection_state::ConnectionState,
        reading::{SensorBatch, SensorId},
        selection::SelectionSet,
        user_command::{help_text, UserCommand},
    },
    ports::RenderSurface,
    projector::{project, ColorPalette},
};

/// All state behind the dashboard: the history snapshot, the user's
/// selection, the color palette and the chart currently on screen.
/// The connection state is only passed through to the surface.
///
/// Every change goes through one of the methods below, each of which
/// re-renders when the visible data changed.
pub struct Dashboard<S: RenderSurface> {
    surface: S,
    history: HistoryBuffer,
    selection: SelectionSet,
    palette: ColorPalette,
    chart: Option<S::Chart>,
}

impl<S: RenderSurface> Dashboard<S> {
    pub fn new(surface: S, history: HistoryBuffer, selection: SelectionSet) -> Self {
        Self {
            surface,
            history,
            selection,
            palette: ColorPalette::new(),
            chart: None,
        }
    }

    /// Fold a batch into the history and re-render.
    pub fn apply_batch(&mut self, batch: &SensorBatch) {
        self.history = self.history.ingest(batch);
        self.render();
    }

    pub fn select(&mut self, sensor: SensorId) {
        if self.selection.select(sensor) {
            self.render();
        }
    }

    pub fn deselect(&mut self, sensor: &SensorId) {
        if self.selection.deselect(sensor) {
            self.render();
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.render();
        }
    }

    pub fn set_connection_state(&mut self, state: &ConnectionState) {
        if let Err(e) = self.surface.draw_connection_state(state) {
            error!("Failed to draw connection state. Error: {}", e);
        }
    }

    /// Redraw the current chart as is. Data is left untouched.
    pub fn redraw(&mut self) {
        if let Some(chart) = &self.chart {
            if let Err(e) = self.surface.refresh_chart(chart) {
                error!("Failed to refresh chart. Error: {}", e);
            }
        }
    }

    pub fn show_message(&mut self, message: &str) {
        if let Err(e) = self.surface.draw_message(message) {
            error!("Failed to draw message. Error: {}", e);
        }
    }

    /// Release the chart and hand the surface back.
    pub fn teardown(mut self) -> S {
        if let Some(chart) = self.chart.take() {
            self.surface.destroy_chart(chart);
        }
        self.surface
    }

    /// Project the current snapshot and replace the chart. The old chart is
    /// always destroyed before the new one is created.
    fn render(&mut self) {
        if self.history.is_empty() {
            trace!("Nothing to render yet.");
            return;
        }
        let projection = project(&self.history, &self.selection, &mut self.palette);
        debug!(
            "Rendering {} series and {} rows.",
            projection.series.len(),
            projection.rows.len()
        );

        if let Err(e) = self.surface.draw_rows(&projection.rows) {
            error!("Failed to draw rows. Error: {}", e);
        }
        if let Some(chart) = self.chart.take() {
            self.surface.destroy_chart(chart);
        }
        match self.surface.create_chart(&projection) {
            Ok(chart) => self.chart = Some(chart),
            Err(e) => error!("Failed to create chart. Error: {}", e),
        }
    }
}

/// Task: Owns the dashboard. Applies feed batches, user commands and
/// connection state changes one at a time, and nudges the chart to redraw
/// every `redraw_interval`. Returns the render surface once cancelled.
/// Can be cancelled; a `quit` command cancels `token` itself.
#[tracing::instrument(skip_all)]
pub async fn task_dashboard<S: RenderSurface>(
    token: CancellationToken,
    mut dashboard: Dashboard<S>,
    redraw_interval: Option<Duration>,
    feed: FeedControl,
    mut rx_batches: Receiver<SensorBatch>,
    mut rx_commands: Receiver<UserCommand>,
    mut rx_connection_state: Receiver<ConnectionState>,
) -> S {
    info!("Started.");

    let mut redraw = redraw_interval.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            Some(batch) = recv_logging_lag(&mut rx_batches, "sensor batches") => {
                trace!("Received {}.", batch);
                dashboard.apply_batch(&batch);
            },
            Some(command) = recv_logging_lag(&mut rx_commands, "user commands") => {
                handle_user_command(&token, &mut dashboard, &feed, command);
            },
            Some(state) = recv_logging_lag(&mut rx_connection_state, "connection states") => {
                debug!("Connection state changed to {}.", state);
                dashboard.set_connection_state(&state);
            },
            _ = next_redraw(&mut redraw) => {
                dashboard.redraw();
            },
        }
    }

    dashboard.teardown()
}

/// Wait for the next redraw tick. Never completes when redraws are off.
async fn next_redraw(redraw: &mut Option<Interval>) {
    match redraw {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn handle_user_command<S: RenderSurface>(
    token: &CancellationToken,
    dashboard: &mut Dashboard<S>,
    feed: &FeedControl,
    command: UserCommand,
) {
    debug!("Handling user command: {}", command);
    match command {
        UserCommand::Connect(host) => match feed.connect(&host) {
            Ok(address) => info!("Switching sensor feed to {}.", address),
            Err(e) => {
                warn!("Failed to request connection. Error: {}", e);
                dashboard.show_message(&format!("Can't connect to '{}': {}", host, e));
            }
        },
        UserCommand::Select(sensor) => dashboard.select(sensor),
        UserCommand::Deselect(sensor) => dashboard.deselect(&sensor),
        UserCommand::ClearSelection => dashboard.clear_selection(),
        UserCommand::Help => dashboard.show_message(&help_text()),
        UserCommand::Quit => {
            info!("Quit requested.");
            token.cancel();
        }
    }
}
