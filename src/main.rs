mod app;
mod cli;
mod config;
mod constants;
mod event;
mod state;
mod supervisor;
mod theme;
mod ui;
mod utils;

use clap::Parser;
use color_eyre::Result;
use crossterm::event::KeyEventKind;

use crate::event::{Event, EventHandler};

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = cli::args::Args::parse();
    if let Some(command) = args.command {
        return cli::commands::run(command);
    }

    run_tui()
}

fn run_tui() -> Result<()> {
    let settings = config::Settings::load();
    let mut app = app::App::new(settings.clone())?;

    let mut terminal = ratatui::init();
    let events = EventHandler::new(settings.tick_rate_ms);
    let result = run_loop(&mut terminal, &mut app, &events);
    ratatui::restore();
    result
}

fn run_loop(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut app::App,
    events: &EventHandler,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, app))?;
        match events.next()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
            Event::Key(_) | Event::Resize(..) => {}
            Event::Tick => app.on_tick(),
        }
    }
    Ok(())
}
