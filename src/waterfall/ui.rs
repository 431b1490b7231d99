//! Terminal user interface for the waterfall visualization.
//!
//! Owns the alternate-screen terminal, paints the projected segments onto a
//! braille canvas and translates keyboard input into style toggles.

use crate::waterfall::terminal::Segment;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    symbols::Marker,
    widgets::canvas::{Canvas, Line as CanvasLine},
};
use std::io::{stdout, Stdout};
use std::time::Duration;

/// User input command during visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    /// Keep running (no relevant key pressed)
    Continue,
    /// Exit (Escape, 'q' or Ctrl+C)
    Quit,
    /// Toggle the line layer ('l')
    ToggleLine,
    /// Toggle the ribbon layer ('r')
    ToggleRibbon,
    /// Switch between hue and uniform coloring ('c')
    CycleColor,
}

/// Terminal UI wrapping a ratatui alternate-screen session.
pub struct WaterfallTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl WaterfallTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(WaterfallTui { terminal })
    }

    /// Current terminal size in cells.
    pub fn size(&self) -> Result<(u16, u16)> {
        let size = self.terminal.size()?;
        Ok((size.width, size.height))
    }

    /// Paints one frame: the segment list on a braille canvas plus a one-line
    /// status footer.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn draw(&mut self, segments: &[Segment], status: &str) -> Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();

            let footer_height = 1;
            let canvas_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(footer_height),
            };

            let canvas = Canvas::default()
                .marker(Marker::Braille)
                .x_bounds([-1.0, 1.0])
                .y_bounds([-1.0, 1.0])
                .paint(|ctx| {
                    for segment in segments {
                        ctx.draw(&CanvasLine {
                            x1: segment.x1,
                            y1: segment.y1,
                            x2: segment.x2,
                            y2: segment.y2,
                            color: segment.color,
                        });
                    }
                });
            frame.render_widget(canvas, canvas_area);

            let footer_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(footer_height),
                width: area.width,
                height: footer_height,
            };
            let footer = ratatui::widgets::Paragraph::new(status.to_string()).style(
                Style::default()
                    .fg(Color::Rgb(185, 207, 212))
                    .bg(Color::Rgb(0, 0, 0)),
            );
            frame.render_widget(footer, footer_area);
        })?;

        Ok(())
    }

    /// Drains pending keyboard input and returns the resulting command.
    ///
    /// Quit wins over any other queued key; toggles are returned one per
    /// frame, which is plenty at interactive key rates.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> Result<InputCommand> {
        let mut command = InputCommand::Continue;
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                let next = match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        tracing::debug!("Quit requested from keyboard");
                        InputCommand::Quit
                    }
                    KeyCode::Char('c')
                        if key
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::CONTROL) =>
                    {
                        tracing::debug!("Ctrl+C pressed: quitting");
                        InputCommand::Quit
                    }
                    KeyCode::Char('l') => InputCommand::ToggleLine,
                    KeyCode::Char('r') => InputCommand::ToggleRibbon,
                    KeyCode::Char('c') => InputCommand::CycleColor,
                    _ => InputCommand::Continue,
                };
                if next == InputCommand::Quit {
                    return Ok(InputCommand::Quit);
                }
                if next != InputCommand::Continue {
                    command = next;
                }
            }
        }
        Ok(command)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
