//! TUI spotlight example - the overlay engine drawn into a terminal.
//!
//! The terminal stands in for a single display: every cell is two pixels
//! (upper and lower half block). The cursor comes from terminal mouse events
//! and reaches the engine both as pointer events and through the cursor poll.
//!
//! Run with: cargo run --example tui_spotlight
//!
//! Keys: Space toggles the spotlight, Esc dismisses it, 1-6 pick a shape,
//! 'b' toggles the soft edge, 'f' switches zoom/fade, 'k' toggles keystroke
//! labels. Click to spawn ripples. Press 'q' or Ctrl+C to exit.

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use limelight::coords::PrimaryReference;
use limelight::display::{ManualCursor, StaticTopology};
use limelight::{
    ActivationStyle, Canvas, Clock, DisplayInfo, EventLoop, HeadlessBackend, LabelFont,
    MonotonicClock, NormalizedPointerEvent, OverlayEngine, Point, PointerButton, PointerKind,
    SessionState, SharedSettings, SpotlightShape, UiMessage, UiSender, ui_channel,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::{io, sync::Arc, time::Duration};

/// How long to wait for terminal input between frames.
const FRAME: Duration = Duration::from_millis(16);

const SHAPES: [SpotlightShape; 6] = [
    SpotlightShape::Circle,
    SpotlightShape::Square,
    SpotlightShape::Triangle,
    SpotlightShape::Star,
    SpotlightShape::Trapezoid,
    SpotlightShape::Cloud,
];

/// Application state
struct App {
    clock: Arc<MonotonicClock>,
    settings: SharedSettings,
    topology: StaticTopology,
    cursor: ManualCursor,
    backend: HeadlessBackend,
    sender: UiSender,
    primary: PrimaryReference,
    should_exit: bool,
}

/// The pseudo-display covering the terminal, minus the status line.
fn terminal_display(cols: u16, rows: u16) -> DisplayInfo {
    let height = rows.saturating_sub(1).max(1) as f64 * 2.0;
    DisplayInfo::new(
        1,
        limelight::Rect::new(0.0, 0.0, cols.max(1) as f64, height),
        true,
    )
}

impl App {
    /// Terminal cell to hook-space point (center of the cell).
    fn cell_to_hook(column: u16, row: u16) -> Point {
        Point::new(column as f64 + 0.5, row as f64 * 2.0 + 1.0)
    }

    fn send(&self, message: UiMessage) {
        let _ = self.sender.send(message);
    }

    fn pointer(&self, column: u16, row: u16, kind: PointerKind) {
        let hook = Self::cell_to_hook(column, row);
        self.cursor.move_to(hook);
        self.send(UiMessage::Pointer(NormalizedPointerEvent {
            kind,
            position: self.primary.normalize(hook),
            timestamp: self.clock.now(),
        }));
    }

    fn resize(&self, cols: u16, rows: u16) {
        self.topology.set_displays(vec![terminal_display(cols, rows)]);
        self.send(UiMessage::TopologyChanged);
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_exit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_exit = true
            }
            KeyCode::Char(' ') => self.send(UiMessage::HotkeyTriggered(self.clock.now())),
            KeyCode::Esc => self.send(UiMessage::EscapePressed),
            KeyCode::Char(c @ '1'..='6') => {
                let shape = SHAPES[(c as usize) - ('1' as usize)];
                self.settings.update(|s| s.shape = shape);
            }
            KeyCode::Char('b') => self.settings.update(|s| {
                s.edge_blur = if s.edge_blur > 0.0 { 0.0 } else { 0.5 };
            }),
            KeyCode::Char('f') => self.settings.update(|s| {
                s.activation_style = match s.activation_style {
                    ActivationStyle::Zoom => ActivationStyle::Fade,
                    ActivationStyle::Fade => ActivationStyle::Zoom,
                };
            }),
            KeyCode::Char('k') => self.settings.update(|s| s.keystrokes = !s.keystrokes),
            KeyCode::Char(c) => self.send(UiMessage::Keystroke {
                label: c.to_uppercase().to_string(),
                timestamp: self.clock.now(),
            }),
            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (cols, rows) = crossterm::terminal::size()?;

    let clock = Arc::new(MonotonicClock::new());
    let settings = SharedSettings::default();
    settings.update(|s| {
        s.radius = 12.0;
        s.edge_blur = 0.5;
    });
    let topology = StaticTopology::new(vec![terminal_display(cols, rows)]);
    let cursor = ManualCursor::new(App::cell_to_hook(cols / 2, rows / 2));
    let backend = HeadlessBackend::new();
    let (sender, receiver) = ui_channel();

    let engine = OverlayEngine::new(
        clock.clone(),
        Box::new(settings.clone()),
        Box::new(topology.clone()),
        Box::new(cursor.clone()),
        Box::new(backend.clone()),
    );
    let primary = engine.primary_reference();
    let mut event_loop = EventLoop::new(engine, receiver);

    let mut app = App {
        clock,
        settings,
        topology,
        cursor,
        backend,
        sender,
        primary,
        should_exit: false,
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    // Main loop
    loop {
        if !event_loop.pump()? {
            break;
        }
        let state = event_loop.engine().state();
        terminal.draw(|f| draw(f, &app, state))?;

        if event::poll(FRAME)? {
            match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key.code, key.modifiers)
                }
                CEvent::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                        app.pointer(mouse.column, mouse.row, PointerKind::Move)
                    }
                    MouseEventKind::Down(button) => {
                        let button = match button {
                            MouseButton::Left => PointerButton::Primary,
                            MouseButton::Right => PointerButton::Secondary,
                            MouseButton::Middle => PointerButton::Other,
                        };
                        app.pointer(mouse.column, mouse.row, PointerKind::ButtonDown(button))
                    }
                    _ => {}
                },
                CEvent::Resize(cols, rows) => app.resize(cols, rows),
                _ => {}
            }
        }

        if app.should_exit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

fn draw(f: &mut Frame, app: &App, state: SessionState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());

    draw_overlay(f, app, chunks[0]);
    draw_status(f, app, state, chunks[1]);
}

/// Something for the spotlight to shine on.
fn scenery(x: u16, y: u16) -> (f64, f64, f64) {
    if (x / 6 + y / 3) % 2 == 0 {
        (0.85, 0.85, 0.8)
    } else {
        (0.55, 0.7, 0.9)
    }
}

fn composite(pixel: Option<limelight::Color>, x: u16, y: u16) -> Color {
    let (r, g, b) = scenery(x, y);
    let (r, g, b) = match pixel {
        Some(p) => (
            p.r * p.a + r * (1.0 - p.a),
            p.g * p.a + g * (1.0 - p.a),
            p.b * p.a + b * (1.0 - p.a),
        ),
        None => (r, g, b),
    };
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::Rgb(channel(r), channel(g), channel(b))
}

fn draw_overlay(f: &mut Frame, app: &App, area: Rect) {
    let Some(canvas) = Canvas::new(area.width as usize, area.height as usize * 2) else {
        return;
    };
    let mut canvas = canvas.with_font(LabelFont::system());
    let live = app.backend.live();
    if let Some(record) = live.first()
        && record.visible
        && let Some(frame) = &record.last_frame
    {
        canvas.render(frame);
        // Fade is applied by the compositor on real surfaces.
        let opacity = record.opacity;
        let buf = f.buffer_mut();
        for row in 0..area.height {
            for col in 0..area.width {
                let fade = |p: Option<limelight::Color>| p.map(|p| p.scale_alpha(opacity));
                let top = fade(canvas.pixel(col as usize, row as usize * 2));
                let bottom = fade(canvas.pixel(col as usize, row as usize * 2 + 1));
                buf[(area.x + col, area.y + row)]
                    .set_char('▀')
                    .set_fg(composite(top, col, row * 2))
                    .set_bg(composite(bottom, col, row * 2 + 1));
            }
        }
        return;
    }

    let buf = f.buffer_mut();
    for row in 0..area.height {
        for col in 0..area.width {
            buf[(area.x + col, area.y + row)]
                .set_char('▀')
                .set_fg(composite(None, col, row * 2))
                .set_bg(composite(None, col, row * 2 + 1));
        }
    }
}

fn draw_status(f: &mut Frame, app: &App, state: SessionState, area: Rect) {
    let settings = limelight::SettingsSource::snapshot(&app.settings);
    let (status, color) = match state {
        SessionState::Active => ("ACTIVE", Color::Green),
        SessionState::Inactive => ("INACTIVE", Color::Red),
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {status} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " {:?} | blur {:.1} | {:?} | keys {} | ",
            settings.shape,
            settings.edge_blur,
            settings.activation_style,
            if settings.keystrokes { "on" } else { "off" },
        )),
        Span::styled(
            "Space toggle, Esc hide, 1-6 shape, b blur, f style, k keys, q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
