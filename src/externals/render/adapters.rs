use std::io::{self, Write};

use tracing::trace;

use crate::{
    models::{
        connection_state::ConnectionState,
        projection::{Projection, Rgb, Row, Series},
    },
    ports::{RenderError, RenderSurface},
};

const TITLE: &str = "Temperature Monitoring";

/// Width of one x axis cell, e.g. ` -12.5`.
const CELL_WIDTH: usize = 7;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const RESET_COLOR: &str = "\x1b[0m";

/// Draws the dashboard as plain text. One line per series, one column per
/// x axis slot, followed by the list view.
///
/// With `ansi` enabled every frame clears the terminal first and series
/// labels are printed in their assigned color. The last message is part of
/// every frame so a redraw doesn't wipe it.
pub struct TerminalSurface<W: Write> {
    out: W,
    ansi: bool,
    next_chart_id: u64,
    status: ConnectionState,
    rows: Vec<Row>,
    message: Option<String>,
}

/// A chart drawn by a `TerminalSurface`. Keeps its rendered lines so it can
/// be redrawn as is.
#[derive(Debug)]
pub struct TerminalChart {
    id: u64,
    lines: Vec<String>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, ansi: bool) -> Self {
        Self {
            out,
            ansi,
            next_chart_id: 0,
            status: ConnectionState::default(),
            rows: vec![],
            message: None,
        }
    }

    /// Write a whole frame: title, status, chart, list and the last message.
    fn write_frame(&mut self, chart: &TerminalChart) -> io::Result<()> {
        if self.ansi {
            write!(self.out, "{}", CLEAR_SCREEN)?;
        }
        writeln!(self.out, "{}", TITLE)?;
        writeln!(self.out, "Status: {}", self.status)?;
        writeln!(self.out)?;
        for line in chart.lines.iter() {
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out)?;
        for row in self.rows.iter() {
            writeln!(self.out, "  - {}", row)?;
        }
        if let Some(message) = &self.message {
            writeln!(self.out)?;
            writeln!(self.out, "{}", message)?;
        }
        self.out.flush()
    }
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    type Chart = TerminalChart;

    fn create_chart(&mut self, projection: &Projection) -> Result<Self::Chart, RenderError> {
        let chart = TerminalChart {
            id: self.next_chart_id,
            lines: chart_lines(projection, self.ansi),
        };
        self.next_chart_id += 1;
        trace!("Created chart {}.", chart.id);
        self.write_frame(&chart)?;
        Ok(chart)
    }

    fn destroy_chart(&mut self, chart: Self::Chart) {
        trace!("Destroyed chart {}.", chart.id);
    }

    fn refresh_chart(&mut self, chart: &Self::Chart) -> Result<(), RenderError> {
        self.write_frame(chart)?;
        Ok(())
    }

    fn draw_rows(&mut self, rows: &[Row]) -> Result<(), RenderError> {
        self.rows = rows.to_vec();
        Ok(())
    }

    fn draw_connection_state(&mut self, state: &ConnectionState) -> Result<(), RenderError> {
        self.status = state.clone();
        writeln!(self.out, "Status: {}", state)?;
        self.out.flush()?;
        Ok(())
    }

    fn draw_message(&mut self, message: &str) -> Result<(), RenderError> {
        self.message = Some(message.to_owned());
        writeln!(self.out, "{}", message)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Render the chart body: one line per series, then the x axis and the
/// value range.
fn chart_lines(projection: &Projection, ansi: bool) -> Vec<String> {
    let label_width = projection
        .series
        .iter()
        .map(|s| s.label.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max(1);

    let mut lines: Vec<String> = projection
        .series
        .iter()
        .map(|series| series_line(series, label_width, ansi))
        .collect();

    let mut axis = format!("{:<width$} |", "", width = label_width);
    for x in projection.x_axis.iter() {
        axis.push_str(&format!("{:>width$}", x, width = CELL_WIDTH));
    }
    lines.push(axis);

    lines.push(match projection.y_range {
        Some((low, high)) => format!("range: {} .. {}", low, high),
        None => "range: no data".to_owned(),
    });
    lines
}

fn series_line(series: &Series, label_width: usize, ansi: bool) -> String {
    let label = format!("{:<width$}", series.label.as_str(), width = label_width);
    let mut line = if ansi {
        colored(&label, series.color)
    } else {
        label
    };
    line.push_str(" |");
    for value in series.values.iter() {
        let cell = match value {
            Some(t) => format!("{:.1}", t.celsius()),
            None => "--".to_owned(),
        };
        line.push_str(&format!("{:>width$}", cell, width = CELL_WIDTH));
    }
    line
}

fn colored(text: &str, color: Rgb) -> String {
    format!(
        "\x1b[38;2;{};{};{}m{}{}",
        color.r, color.g, color.b, text, RESET_COLOR
    )
}
