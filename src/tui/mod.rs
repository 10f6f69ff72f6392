//! Terminal stand-in for the hardware grid. Pads are clicked with the mouse
//! (right-click holds a pad down until the next right-click), the control
//! row lives on the computer keyboard.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, KeyboardEnhancementFlags, MouseButton, MouseEventKind,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use view::{ButtonRow, ModeBar, PadGrid, centered_rect};

use crate::clip::{DrumPadBank, NoteClip};
use crate::config::Rgb;
use crate::keys::{KeyAction, KeyControls};
use crate::midi::{GridInput, GridPort};
use crate::render;
use crate::resolution::{RESOLUTION_BUTTONS, RESOLUTIONS};
use crate::scale::note_name;
use crate::sequencer::{Control, ViewKind};
use crate::session::Session;

const POLL: Duration = Duration::from_millis(10);

/// Velocity of a mouse click on a pad.
const CLICK_VELOCITY: u8 = 100;

/// Narrowest layout that still fits the mode bar and its status.
const MIN_WIDTH: u16 = 48;

#[derive(Default, Clone)]
struct Areas {
    modes: Rect,
    grid: Rect,
    buttons: Rect,
}

struct State {
    session: Session,
    port: GridPort,
    keys: KeyControls,
    frame: render::Frame,
    mode_names: Vec<&'static str>,
    button_labels: Vec<&'static str>,
    areas: Areas,
    /// Pad under a held left mouse button.
    clicked: Option<usize>,
    /// Pads held down with the right mouse button.
    latched: Vec<usize>,
    message: Option<String>,
    dirty: bool,
    quit: bool,
}

impl State {
    fn refresh(&mut self, now: Instant) {
        let next = render::render(self.session.view(), &self.session.config().theme, now);
        self.port.show(&next, Some(&self.frame));
        self.frame = next;
        self.dirty = true;
    }

    fn apply(&mut self, action: KeyAction, now: Instant) {
        if action == KeyAction::NextView {
            self.release_everything(now);
        }
        if let Err(e) = self.session.apply(action, now) {
            log::warn!("{e}");
            self.message = Some(e.to_string());
        }
        self.dirty = true;
    }

    fn select_view(&mut self, kind: ViewKind, now: Instant) {
        if kind == self.session.view().kind() {
            return;
        }
        self.release_everything(now);
        if let Err(e) = self.session.switch_view(kind, now) {
            log::warn!("{e}");
            self.message = Some(e.to_string());
        }
    }

    /// Let go of every held pad and modifier before the view goes away.
    fn release_everything(&mut self, now: Instant) {
        for index in self.clicked.take().into_iter().chain(self.latched.drain(..)) {
            self.session.handle_input(GridInput::Pad { index, velocity: 0 }, now);
        }
        for release in self.keys.release_all() {
            if let KeyAction::Control(control) = release {
                self.session.handle_input(GridInput::Control(control), now);
            }
        }
    }

    fn press_pad(&mut self, index: usize, now: Instant) {
        self.session.handle_input(GridInput::Pad { index, velocity: CLICK_VELOCITY }, now);
    }

    fn release_pad(&mut self, index: usize, now: Instant) {
        self.session.handle_input(GridInput::Pad { index, velocity: 0 }, now);
    }

    fn grid_size(&self) -> (usize, usize) {
        let layout = self.session.view().layout();
        (layout.columns(), layout.total_rows())
    }
}

pub fn run(session: Session, port: GridPort, kitty: bool) -> anyhow::Result<()> {
    let now = Instant::now();
    let frame = render::render(session.view(), &session.config().theme, now);
    let mode_names = session.available_views().iter().map(|k| k.name()).collect();
    let button_labels = (0..RESOLUTION_BUTTONS)
        .map(|i| RESOLUTIONS[RESOLUTION_BUTTONS - 1 - i].name)
        .collect();

    let mut s = State {
        session,
        port,
        keys: KeyControls::new(kitty),
        frame,
        mode_names,
        button_labels,
        areas: Areas::default(),
        clicked: None,
        latched: Vec::new(),
        message: None,
        dirty: true,
        quit: false,
    };
    s.port.show(&s.frame, None);

    // Set up terminal.
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    if kitty {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
            )
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // When stderr is redirected (e.g. `padseq 2> debug.log`), keep logging
    // enabled. When stderr is a terminal, suppress logging to avoid
    // corrupting the alternate screen.
    let prev_log_level = log::max_level();
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        log::set_max_level(log::LevelFilter::Off);
    }

    let result = event_loop(&mut terminal, &mut s);

    log::set_max_level(prev_log_level);

    if kitty {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags).ok();
    }
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    crossterm::terminal::disable_raw_mode()?;

    result.map_err(Into::into)
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    s: &mut State,
) -> io::Result<()> {
    loop {
        let now = Instant::now();
        s.port.pump(&mut s.session, now);
        if s.session.tick(now) {
            s.refresh(now);
        }

        if s.dirty {
            draw(terminal, s)?;
            s.dirty = false;
        }
        if s.quit {
            break;
        }

        if !event::poll(POLL)? {
            continue;
        }
        let ev = event::read()?;
        process_event(s, ev);
        while event::poll(Duration::ZERO)? {
            process_event(s, event::read()?);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Event processing
// ---------------------------------------------------------------------------

fn process_event(s: &mut State, ev: Event) {
    match ev {
        Event::Key(key) => handle_key(s, key),
        Event::Mouse(mouse) => handle_mouse(s, mouse.kind, mouse.column, mouse.row),
        Event::Resize(..) => s.dirty = true,
        _ => {}
    }
}

fn handle_key(s: &mut State, key: KeyEvent) {
    if key.kind == KeyEventKind::Press {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                s.quit = true;
                return;
            }
            KeyCode::Esc => {
                s.quit = true;
                return;
            }
            _ => {}
        }
    }
    if let Some(action) = s.keys.handle_key_event(key) {
        s.message = None;
        s.apply(action, Instant::now());
    }
}

fn handle_mouse(s: &mut State, kind: MouseEventKind, x: u16, y: u16) {
    let now = Instant::now();
    let (columns, rows) = s.grid_size();
    let pad = PadGrid::pad_at(x, y, s.areas.grid, columns, rows);

    match kind {
        MouseEventKind::Down(MouseButton::Left) => {
            s.message = None;
            if let Some(mode) = ModeBar::mode_at(x, y, s.areas.modes, &s.mode_names) {
                if let Some(&kind) = s.session.available_views().get(mode) {
                    s.select_view(kind, now);
                }
            } else if let Some(button) =
                ButtonRow::button_at(x, y, s.areas.buttons, RESOLUTION_BUTTONS)
            {
                s.session
                    .handle_input(GridInput::Control(Control::Resolution(button)), now);
            } else if let Some(index) = pad {
                if let Some(previous) = s.clicked.take() {
                    s.release_pad(previous, now);
                }
                s.press_pad(index, now);
                s.clicked = Some(index);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if let Some(index) = s.clicked.take() {
                s.release_pad(index, now);
            }
        }
        MouseEventKind::Down(MouseButton::Right) => {
            let Some(index) = pad else {
                return;
            };
            if let Some(i) = s.latched.iter().position(|&p| p == index) {
                s.latched.remove(i);
                s.release_pad(index, now);
            } else {
                s.press_pad(index, now);
                s.latched.push(index);
            }
        }
        _ => return,
    }
    s.dirty = true;
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn to_color(c: Rgb) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    s: &mut State,
) -> io::Result<()> {
    terminal.draw(|f| {
        let (columns, rows) = s.grid_size();
        let (grid_w, grid_h) = PadGrid::size(columns, rows);
        let area = centered_rect(grid_w.max(MIN_WIDTH), grid_h + 6, f.area());
        let [modes, _, grid_row, _, buttons, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(grid_h),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);
        let grid = centered_rect(grid_w, grid_h, grid_row);
        let buttons = centered_rect(grid_w, 1, buttons);
        s.areas = Areas { modes, grid, buttons };

        let view = s.session.view();
        let active = s
            .session
            .available_views()
            .iter()
            .position(|&k| k == view.kind())
            .unwrap_or(0);
        let clip = view.clip();
        let (transport, transport_style) = if clip.is_armed() {
            ("● REC", Style::default().fg(Color::Red))
        } else if clip.is_playing() {
            ("▶ PLAY", Style::default().fg(Color::Green))
        } else {
            ("■ STOP", Style::default().fg(Color::DarkGray))
        };
        f.render_widget(
            ModeBar::new(&s.mode_names, active).status(transport, transport_style),
            modes,
        );

        let pads: Vec<Color> = s.frame.pads().iter().map(|&c| to_color(c)).collect();
        let mut pad_grid = PadGrid::new(columns, rows, &pads);
        if let Some(index) = s.clicked.or_else(|| s.latched.first().copied()) {
            pad_grid = pad_grid.outline(index, Color::White);
        }
        f.render_widget(pad_grid, grid);

        let button_colors: Vec<Color> = s.frame.buttons().iter().map(|&c| to_color(c)).collect();
        f.render_widget(ButtonRow::new(&s.button_labels, &button_colors), buttons);

        let (text, style) = match &s.message {
            Some(message) => (message.clone(), Style::default().fg(Color::Red)),
            None => (status_line(&s.session, &s.keys), Style::default().fg(Color::DarkGray)),
        };
        f.render_widget(Paragraph::new(text).style(style), status);
    })?;
    Ok(())
}

fn status_line(session: &Session, keys: &KeyControls) -> String {
    let view = session.view();
    let clip = view.clip();
    let config = session.config();

    let mut parts = vec![format!("{:.0} BPM", config.clip.bpm)];
    if view.note_area().is_drum() {
        let first = view.bank().position();
        parts.push(format!("pads {}", note_name(first.min(127) as u8)));
        if let Some(lane) = view.bank().selected_lane() {
            parts.push(format!("lane {}", note_name(lane.min(127) as u8)));
        }
    } else {
        let notes = view.notes();
        parts.push(format!(
            "{} {}",
            note_name(notes.base_note()),
            notes.scale().name()
        ));
    }
    parts.push(format!("step {}", view.pages().resolution().name));
    parts.push(format!("page {}", clip.edit_page() + 1));
    parts.push(format!(
        "loop {}+{}",
        clip.loop_start(),
        clip.loop_length()
    ));

    let mut modifiers: Vec<_> = keys.active_modifiers().collect();
    modifiers.extend(view.modifiers().iter().copied());
    modifiers.sort_by_key(|m| *m as u8);
    modifiers.dedup();
    if !modifiers.is_empty() {
        let names: Vec<String> = modifiers.iter().map(|m| format!("{m:?}")).collect();
        parts.push(names.join("+"));
    }
    parts.join("  ")
}
