use std::io;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};

use view::{ButtonRow, ModeBar, PadGrid, centered_rect};

const MODES: &[&str] = &["Lit", "Dark"];
const BUTTONS: &[&str] = &["1", "2", "3", "4", "5", "6", "7", "8"];
const COLUMNS: usize = 8;
const ROWS: usize = 8;

#[derive(Default)]
struct Areas {
    modes: Rect,
    grid: Rect,
    buttons: Rect,
}

struct State {
    mode: usize,
    pads: Vec<Color>,
    button: usize,
    areas: Areas,
}

fn main() -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut s = State {
        mode: 0,
        pads: vec![Color::Rgb(0, 0, 0); COLUMNS * ROWS],
        button: 0,
        areas: Areas::default(),
    };
    let result = run(&mut terminal, &mut s);

    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, s: &mut State) -> io::Result<()> {
    loop {
        terminal.draw(|frame| {
            let (w, h) = PadGrid::size(COLUMNS, ROWS);
            let area = centered_rect(w, h + 4, frame.area());
            let [modes, grid, _, buttons] = Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(h),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(area);
            s.areas = Areas { modes, grid, buttons };

            frame.render_widget(
                ModeBar::new(MODES, s.mode).status("q quits", Style::default().fg(Color::DarkGray)),
                modes,
            );
            frame.render_widget(PadGrid::new(COLUMNS, ROWS, &s.pads), grid);
            let colors: Vec<Color> = (0..BUTTONS.len())
                .map(|i| if i == s.button { Color::Yellow } else { Color::DarkGray })
                .collect();
            frame.render_widget(ButtonRow::new(BUTTONS, &colors), buttons);
        })?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q') => {
                return Ok(());
            }
            Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                let (x, y) = (mouse.column, mouse.row);
                if let Some(mode) = ModeBar::mode_at(x, y, s.areas.modes, MODES) {
                    s.mode = mode;
                } else if let Some(pad) = PadGrid::pad_at(x, y, s.areas.grid, COLUMNS, ROWS) {
                    let lit = Color::Rgb(0, 120, 255);
                    s.pads[pad] = if s.mode == 0 { lit } else { Color::Rgb(0, 0, 0) };
                } else if let Some(button) = ButtonRow::button_at(x, y, s.areas.buttons, BUTTONS.len()) {
                    s.button = button;
                }
            }
            _ => {}
        }
    }
}
