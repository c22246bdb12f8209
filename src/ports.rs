use thiserror::Error;

use crate::models::{
    connection_state::ConnectionState,
    projection::{Projection, Row},
};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to write to the render surface. Error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whatever the dashboard draws on.
///
/// A chart is a resource owned by the caller: every chart returned by
/// `create_chart` must be handed back to `destroy_chart` before the next one
/// is created.
pub trait RenderSurface {
    type Chart;

    /// Build and show a chart for `projection`.
    fn create_chart(&mut self, projection: &Projection) -> Result<Self::Chart, RenderError>;

    /// Release a chart created by this surface.
    fn destroy_chart(&mut self, chart: Self::Chart);

    /// Redraw an existing chart without changing its data.
    fn refresh_chart(&mut self, chart: &Self::Chart) -> Result<(), RenderError>;

    /// Replace the list view.
    fn draw_rows(&mut self, rows: &[Row]) -> Result<(), RenderError>;

    /// Show the current state of the feed connection.
    fn draw_connection_state(&mut self, state: &ConnectionState) -> Result<(), RenderError>;

    /// Show a free form message to the user, e.g. help text or a bad command.
    fn draw_message(&mut self, message: &str) -> Result<(), RenderError>;
}
