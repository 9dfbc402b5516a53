//! Terminal demo: the overlay scrollbar over a text pane.
//!
//! The terminal plays host platform: rows are the pixel unit, the in-memory
//! element tree holds the measurements and styles, and crossterm input is
//! translated into host events.  Keys grow/shrink the content to exercise
//! the mutation watcher (the widget reacts one quiescence window later);
//! resizing the terminal feeds the viewport-resize path; the mouse drags
//! the thumb and the wheel scrolls.
//!
//! Run with `cargo run --example terminal`.  Keys: `a` append lines,
//! `d` drop lines, `q` quit.

use std::io::{self, stdout};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CtEvent, KeyCode, KeyEvent,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use tokio::sync::mpsc;

use slimrail::{
    ElementId, EventKind, Host, MemoryHost, RawEvent, ScrollBar, StyleOptions, Target, WheelDelta,
};

// ───────────────────────────────────────── CLI ───────────────

#[derive(Parser, Debug)]
#[command(name = "terminal", about = "Overlay scrollbar demo in the terminal")]
struct Cli {
    /// Container height in rows (0 = fit the terminal).
    #[arg(long, default_value_t = 0)]
    height: u16,

    /// Initial number of content lines.
    #[arg(long, default_value_t = 60)]
    lines: usize,

    /// Track/thumb opacity when visible.
    #[arg(long, default_value_t = 0.8)]
    opacity: f64,

    /// Thumb color (hex, e.g. `#cccccc`).
    #[arg(long, default_value = "#ccc")]
    color: String,
}

// ───────────────────────────────────────── events ────────────

/// High-level events consumed by the demo loop.
#[derive(Debug)]
enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    Tick,
}

/// Spawns a reader thread that polls the terminal and forwards events over
/// a channel so the async loop stays non-blocking.
fn spawn_event_reader(tick_rate: Duration) -> mpsc::UnboundedReceiver<AppEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        loop {
            let has_event = event::poll(tick_rate).unwrap_or(false);
            let app_event = if has_event {
                match event::read() {
                    Ok(CtEvent::Key(k)) => AppEvent::Key(k),
                    Ok(CtEvent::Mouse(m)) => AppEvent::Mouse(m),
                    Ok(CtEvent::Resize(w, h)) => AppEvent::Resize(w, h),
                    _ => continue,
                }
            } else {
                AppEvent::Tick
            };
            if tx.send(app_event).is_err() {
                break; // receiver dropped
            }
        }
    });

    rx
}

// ───────────────────────────────────────── demo state ────────

struct Demo {
    host: MemoryHost,
    widget: ScrollBar,
    pane: ElementId,
    body: ElementId,
    lines: usize,
    fixed_height: u16,
    terminal_area: Rect,
    /// Pointer-inside-container state, for enter/leave synthesis.
    hovering: bool,
    should_quit: bool,
}

/// The container rect on screen.
fn pane_area(terminal_area: Rect, fixed_height: u16) -> Rect {
    let height = if fixed_height > 0 {
        fixed_height
    } else {
        terminal_area.height.saturating_sub(4)
    };
    Rect {
        x: 2,
        y: 1,
        width: terminal_area.width.saturating_sub(4),
        height: height.min(terminal_area.height.saturating_sub(2)),
    }
}

/// Content rows visible inside the pane border.
fn inner_area(terminal_area: Rect, fixed_height: u16) -> Rect {
    let area = pane_area(terminal_area, fixed_height);
    Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

impl Demo {
    fn pane_area(&self) -> Rect {
        pane_area(self.terminal_area, self.fixed_height)
    }

    fn inner(&self) -> Rect {
        inner_area(self.terminal_area, self.fixed_height)
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('a') => self.resize_content(self.lines + 10),
            KeyCode::Char('d') => self.resize_content(self.lines.saturating_sub(10)),
            _ => {}
        }
    }

    /// Change the content and let the mutation watcher pick it up — the
    /// widget itself reacts only after the quiescence window.
    fn resize_content(&mut self, lines: usize) {
        self.lines = lines;
        self.host.set_height(self.body, lines as f64);
        self.host.mutate(self.body);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let inner = self.inner();
        let track_x = inner.x + inner.width.saturating_sub(1);
        let y = mouse.row as f64;

        match mouse.kind {
            MouseEventKind::Moved => {
                let inside = point_in_rect(self.pane_area(), mouse.column, mouse.row);
                if inside != self.hovering {
                    self.hovering = inside;
                    let kind = if inside {
                        EventKind::PointerEnter
                    } else {
                        EventKind::PointerLeave
                    };
                    self.host
                        .fire(Target::Element(self.pane), kind, RawEvent::pointer(Some(self.pane), y));
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if mouse.column == track_x && self.row_on_thumb(mouse.row) {
                    let thumb = self.widget.thumb();
                    self.host.fire(
                        Target::Element(thumb),
                        EventKind::PointerDown,
                        RawEvent::pointer(Some(thumb), y),
                    );
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.host.fire(
                    Target::Document,
                    EventKind::PointerMove,
                    RawEvent::pointer(None, y),
                );
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.host
                    .fire(Target::Document, EventKind::PointerUp, RawEvent::bare());
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                if point_in_rect(self.pane_area(), mouse.column, mouse.row) {
                    let lines = match mouse.kind {
                        MouseEventKind::ScrollUp => -1.0,
                        _ => 1.0,
                    };
                    self.host.fire(
                        Target::Element(self.pane),
                        EventKind::Wheel,
                        RawEvent::wheel(Some(self.pane), y, WheelDelta::Lines(lines)),
                    );
                }
            }
            _ => {}
        }
    }

    fn handle_resize(&mut self, width: u16, height: u16) {
        self.terminal_area = Rect::new(0, 0, width, height);
        let inner_height = self.inner().height;
        self.host.set_height(self.pane, inner_height as f64);
        self.host
            .fire(Target::Viewport, EventKind::Resize, RawEvent::bare());
    }

    /// Whether a screen row lands on the thumb glyphs.
    ///
    /// The drag anchor math only needs consistent coordinates, so thumb rows
    /// are compared in the same screen space the pointer reports.
    fn row_on_thumb(&self, row: u16) -> bool {
        let inner = self.inner();
        let top = inner.y as f64 + self.host.top(self.widget.thumb());
        let bottom = top + self.widget.thumb_height().max(1.0);
        (row as f64) >= top && (row as f64) < bottom
    }
}

fn point_in_rect(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x
        && col < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn parse_color(raw: &str) -> Color {
    let hex = raw.trim_start_matches('#');
    let expand = |c: u8| -> u8 { c << 4 | c };
    match hex.len() {
        3 => {
            let digits: Vec<u8> = hex
                .chars()
                .filter_map(|c| c.to_digit(16).map(|d| d as u8))
                .collect();
            match digits.as_slice() {
                [r, g, b] => Color::Rgb(expand(*r), expand(*g), expand(*b)),
                _ => Color::Gray,
            }
        }
        6 => match u32::from_str_radix(hex, 16) {
            Ok(v) => Color::Rgb((v >> 16) as u8, (v >> 8) as u8, v as u8),
            Err(_) => Color::Gray,
        },
        _ => Color::Gray,
    }
}

// ───────────────────────────────────────── draw ──────────────

fn draw(frame: &mut ratatui::Frame, demo: &Demo, color: Color) {
    let pane_area = demo.pane_area();
    let inner = demo.inner();

    let block = Block::default()
        .title(format!(" {} lines — a/d grow/shrink, q quit ", demo.lines))
        .borders(Borders::ALL);
    frame.render_widget(block, pane_area);

    // Content, displaced by the widget-driven offset.
    let scroll = (-demo.host.top(demo.body)).max(0.0) as u16;
    let lines: Vec<Line> = (0..demo.lines)
        .map(|n| Line::from(format!("row {n:>4}  {}", "·".repeat(n % 24))))
        .collect();
    let content = Paragraph::new(lines).scroll((scroll, 0));
    frame.render_widget(content, inner);

    // Track and thumb along the right edge, from host element state.
    let track = demo.widget.track();
    let thumb = demo.widget.thumb();
    if demo.host.opacity(track) > 0.0 && inner.width > 0 {
        let track_x = inner.x + inner.width - 1;
        for row in inner.y..inner.y + inner.height {
            frame
                .buffer_mut()
                .set_string(track_x, row, "│", Style::default().dark_gray());
        }
        let top = inner.y as f64 + demo.host.top(thumb);
        let height = demo.widget.thumb_height().max(1.0);
        let style = if demo.host.opacity(thumb) > 0.0 {
            Style::default().fg(color)
        } else {
            Style::default().dark_gray().dim()
        };
        for row in (top as u16)..((top + height) as u16).min(inner.y + inner.height) {
            frame.buffer_mut().set_string(track_x, row, "█", style);
        }
    }

    let status = Paragraph::new(format!(
        "offset {:>5.0}  thumb {:>3.0}+{:<3.0}  {}",
        demo.widget.content_top(),
        demo.widget.thumb_top(),
        demo.widget.thumb_height(),
        if demo.widget.is_active() { "active" } else { "hidden" },
    ))
    .style(Style::default().dark_gray());
    let status_area = Rect {
        x: pane_area.x,
        y: pane_area.y + pane_area.height,
        width: pane_area.width,
        height: 1,
    };
    frame.render_widget(status, status_area);
}

// ───────────────────────────────────────── main ──────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialise tracing (only when RUST_LOG is set).
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let color = parse_color(&cli.color);

    // ── host + widget ─────────────────────────────────────────
    let size = crossterm::terminal::size()?;
    let terminal_area = Rect::new(0, 0, size.0, size.1);

    let host = MemoryHost::new();
    let pane = host.insert("pane", 0.0);
    let body = host.insert("body", cli.lines as f64);

    // ── terminal setup ────────────────────────────────────────
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    // Measure the pane before the widget first derives its visibility.
    host.set_height(pane, inner_area(terminal_area, cli.height).height as f64);

    let local = tokio::task::LocalSet::new();
    let run = local.run_until(async {
        let style = StyleOptions {
            opacity: cli.opacity,
            track_color: cli.color.clone(),
        };
        let widget = ScrollBar::create(Rc::new(host.clone()), "pane", "body", style)?;
        let mut demo = Demo {
            host: host.clone(),
            widget,
            pane,
            body,
            lines: cli.lines,
            fixed_height: cli.height,
            terminal_area,
            hovering: false,
            should_quit: false,
        };

        let mut events = spawn_event_reader(Duration::from_millis(100));

        // ── event loop ────────────────────────────────────────
        loop {
            terminal.draw(|frame| draw(frame, &demo, color))?;

            tokio::select! {
                Some(event) = events.recv() => match event {
                    AppEvent::Key(k) => demo.handle_key(k),
                    AppEvent::Mouse(m) => demo.handle_mouse(m),
                    AppEvent::Resize(w, h) => demo.handle_resize(w, h),
                    AppEvent::Tick => {}
                },
                else => break,
            }

            if demo.should_quit {
                break;
            }
        }
        anyhow::Ok(())
    });
    let result = run.await;

    // ── teardown ──────────────────────────────────────────────
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}
