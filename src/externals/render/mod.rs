use std::io::{stdout, Stdout};

use self::adapters::TerminalSurface;

pub mod adapters;

pub struct RenderModule {
    pub terminal_surface: TerminalSurface<Stdout>,
}

impl RenderModule {
    pub fn initialize(ansi: bool) -> Self {
        Self {
            terminal_surface: TerminalSurface::new(stdout(), ansi),
        }
    }
}
