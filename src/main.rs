//! A falling-block puzzle game for the terminal
//!
//! Pieces fall fast and lock almost instantly, so keep up.

mod audio;
mod board;
mod game;
mod input;
mod piece;
mod randomizer;
mod score;
mod settings;
mod tetromino;
mod ui;

use anyhow::{Context, Result};
use audio::{AudioManager, Melody};
use crossterm::{
    event::{
        self, Event, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use game::{Game, GameOverCause, GameState, Rules};
use input::{InputHandler, KeyInput};
use ratatui::{backend::CrosstermBackend, Terminal};
use settings::Settings;
use std::{
    io::{self, stdout},
    path::PathBuf,
    process::ExitCode,
    time::{Duration, Instant},
};

/// Target frame rate
const TARGET_FPS: u64 = 60;
const FRAME_DURATION: Duration = Duration::from_micros(1_000_000 / TARGET_FPS);

/// Get the temp directory for logs, creating it if needed
fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("tetris");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

fn main() -> Result<ExitCode> {
    // Generate session ID for this instance
    let session_id: u32 = rand::random();

    let log_dir = temp_dir();
    let log_file = format!("{:08x}.log", session_id);

    // Log to a file so the terminal UI is left alone
    let file_appender = tracing_appender::rolling::never(&log_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tetris=debug".parse::<tracing_subscriber::filter::Directive>()?),
        )
        .with_ansi(false)
        .init();

    tracing::info!(
        "Starting up, session={:08x}, log={}",
        session_id,
        log_dir.join(&log_file).display()
    );

    // Bad settings are reported before the terminal is touched
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Rejected settings: {}", e);
            eprintln!("error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    // Audio is optional, the game plays silently without it
    let mut audio = AudioManager::new(&settings.audio);
    if let Some(audio) = audio.as_mut() {
        audio.play_music(&Melody::random(&mut rand::thread_rng()));
    }

    let mut game = Game::new(Rules::from_settings(&settings));
    let mut input = InputHandler::from_settings(&settings);

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    execute!(stdout(), EnterAlternateScreen).context("failed to enter alternate screen")?;
    if enhanced {
        // Ask for key release events; without them releases are timed out
        execute!(
            stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    tracing::debug!("Keyboard enhancement: {}", enhanced);

    let result = Terminal::new(CrosstermBackend::new(stdout()))
        .context("failed to create terminal")
        .and_then(|mut terminal| {
            terminal.clear()?;
            run_app(&mut terminal, &mut game, &mut input, &settings, &mut audio)
                .context("game loop failed")
        });

    // Restore terminal
    if enhanced {
        let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
    }
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;

    if let Some(audio) = audio.as_mut() {
        audio.stop();
    }

    result?;

    println!("Final Score: {}", game.score.points);
    println!("Lines: {}", game.score.lines);
    tracing::info!("Exiting with score {}", game.score.points);

    Ok(ExitCode::SUCCESS)
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    game: &mut Game,
    input: &mut InputHandler,
    settings: &Settings,
    audio: &mut Option<AudioManager>,
) -> io::Result<()> {
    let game_over_duration = Duration::from_millis(settings.display.game_over_ms);
    let mut game_over_time: Option<Instant> = None;

    loop {
        // Render
        terminal.draw(|frame| ui::render_game(frame, game, settings))?;

        // Handle input
        if event::poll(FRAME_DURATION)? {
            if let Event::Key(key) = event::read()? {
                match input.handle_key(key, Instant::now()) {
                    Some(KeyInput::Press(control)) => game.press(control, Instant::now()),
                    Some(KeyInput::Release(control)) => game.release(control),
                    None => {}
                }
            }
        }

        let now = Instant::now();
        for control in input.expire(now) {
            game.release(control);
        }
        game.update(now);

        for event in game.take_events() {
            if let Some(audio) = audio.as_ref() {
                audio.handle_event(event);
            }
        }

        match game.state {
            GameState::Playing => {}
            GameState::GameOver(GameOverCause::Quit) => {
                tracing::info!("Player quit");
                return Ok(());
            }
            GameState::GameOver(_) => {
                if let Some(audio) = audio.as_mut() {
                    audio.stop_music();
                }
                let since = *game_over_time.get_or_insert(now);
                if now.duration_since(since) >= game_over_duration {
                    return Ok(());
                }
            }
        }
    }
}

