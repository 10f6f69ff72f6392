#![allow(clippy::collapsible_if)]

mod button;
mod cli;
mod clip;
mod config;
mod enumerate;
mod grid;
mod keys;
mod midi;
mod render;
mod resolution;
mod scale;
mod sched;
mod sequencer;
mod session;
mod tui;

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use clap::Parser;
use cli::{Cli, Command, EnumerateTarget, LayoutArgs, PlayArgs};
use crossterm::event::{
    self, Event, KeyCode, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};

use crate::session::{Session, SessionConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            env_logger::init();
            let config = match &cli.session {
                Some(path) => session::load(Path::new(path))?,
                None => SessionConfig::default(),
            };
            let port = midi::GridPort::open(&config.midi)?;
            let session = Session::open(config, Instant::now())?;
            let kitty = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
            tui::run(session, port, kitty)
        }
        Some(Command::Enumerate(target)) => {
            env_logger::init();
            match target {
                EnumerateTarget::Midi => enumerate::midi(),
            }
        }
        Some(Command::Layout(args)) => {
            env_logger::init();
            layout(args)
        }
        Some(Command::Play(args)) => play(args),
    }
}

fn layout(args: LayoutArgs) -> anyhow::Result<()> {
    let mut config = session::load(Path::new(&args.session))?;
    if let Some(name) = &args.view {
        config.view = name.parse()?;
        config.validate()?;
    }
    let session = Session::open(config, Instant::now())?;
    enumerate::pads(session.view());
    Ok(())
}

/// Custom logger that writes to stderr with \r\n line endings for raw mode.
struct RawModeLogger;

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            let secs = now.as_secs() % 86400; // time of day
            let h = secs / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            let ms = now.subsec_millis();
            let _ = write!(
                std::io::stderr(),
                "[{h:02}:{m:02}:{s:02}.{ms:03} {}] {}\r\n",
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static RAW_MODE_LOGGER: RawModeLogger = RawModeLogger;

fn play(args: PlayArgs) -> anyhow::Result<()> {
    log::set_logger(&RAW_MODE_LOGGER).ok();
    log::set_max_level(
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
    );

    let mut config = session::load(Path::new(&args.session))?;
    if args.midi_device.is_some() {
        config.midi.device = args.midi_device;
    }
    if args.midi_output.is_some() {
        config.midi.output = args.midi_output;
    }

    let mut port = midi::GridPort::open(&config.midi)?;
    let mut session = Session::open(config, Instant::now())?;
    let mut frame = render::render(session.view(), &session.config().theme, Instant::now());
    port.show(&frame, None);

    // Probe keyboard enhancement support (must be done before entering raw mode)
    let kitty_supported = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);

    crossterm::terminal::enable_raw_mode()?;

    if kitty_supported {
        crossterm::execute!(
            std::io::stderr(),
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
            )
        )?;
        log::info!("Kitty keyboard protocol enabled (modifier keys can be held)");
    } else {
        log::warn!("Terminal does not support Kitty keyboard protocol, modifier keys latch instead");
    }

    let mut keys = keys::KeyControls::new(kitty_supported);

    log::info!(
        "{} view ready. Space plays, Tab switches views, Ctrl+Q or Ctrl+C quits.",
        session.view().kind().name()
    );

    let result = (|| -> anyhow::Result<()> {
        loop {
            if event::poll(Duration::from_millis(10))? {
                if let Event::Key(key_event) = event::read()? {
                    // Ctrl+C or Ctrl+Q → quit
                    if key_event
                        .modifiers
                        .contains(crossterm::event::KeyModifiers::CONTROL)
                    {
                        match key_event.code {
                            KeyCode::Char('c') | KeyCode::Char('q') => break,
                            _ => {}
                        }
                    }
                    if let Some(action) = keys.handle_key_event(key_event) {
                        let now = Instant::now();
                        if action == keys::KeyAction::NextView {
                            for release in keys.release_all() {
                                session.apply(release, now)?;
                            }
                        }
                        if let Err(e) = session.apply(action, now) {
                            log::warn!("{e}");
                        }
                    }
                }
            }

            let now = Instant::now();
            port.pump(&mut session, now);
            if session.tick(now) {
                let next = render::render(session.view(), &session.config().theme, now);
                port.show(&next, Some(&frame));
                frame = next;
            }
        }
        Ok(())
    })();

    if kitty_supported {
        crossterm::execute!(std::io::stderr(), PopKeyboardEnhancementFlags).ok();
    }
    crossterm::terminal::disable_raw_mode()?;

    log::info!("Stopping...");
    // Leave the hardware dark.
    port.show(&render::Frame::blank(frame.columns(), frame.rows()), Some(&frame));

    result
}
