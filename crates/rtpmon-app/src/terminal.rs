//! Terminal frontend.
//!
//! `TerminalBackend` implements the chart backend on top of ratatui: plots
//! are staged until the controller commits a tree, then the whole screen is
//! redrawn. Key input runs on a blocking thread that reads the last
//! committed tree to turn keys into [`UiEvent`]s.

use crate::controller::UiEvent;
use crate::error::AppResult;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parking_lot::Mutex;
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Tabs, Wrap},
};
use rtpmon_view::{
    traces::{TimeAxis, Trace},
    ChartBackend, ChartContainer, ContainerId, PlotError, PlotRequest, PlotStatus, RowContent,
    ViewTree,
};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const INPUT_POLL: Duration = Duration::from_millis(250);

// ============================================================================
// Shared view state
// ============================================================================

/// Last committed tree plus the charts drawn into it.
#[derive(Debug, Default)]
pub struct TerminalView {
    tree: Option<ViewTree>,
    charts: HashMap<ContainerId, PlotRequest>,
    /// Index of the highlighted container in tree order.
    cursor: usize,
}

pub type SharedView = Arc<Mutex<TerminalView>>;

impl TerminalView {
    pub fn tree(&self) -> Option<&ViewTree> {
        self.tree.as_ref()
    }

    fn update(&mut self, tree: &ViewTree, charts: &HashMap<ContainerId, PlotRequest>) {
        self.tree = Some(tree.clone());
        self.charts = charts.clone();
        let count = tree.container_count();
        if count == 0 {
            self.cursor = 0;
        } else if self.cursor >= count {
            self.cursor = count - 1;
        }
    }

    /// Container the focus key acts on: the focused one, else the cursor.
    pub fn cursor_target(&self) -> Option<ContainerId> {
        let tree = self.tree.as_ref()?;
        if let Some(focused) = tree.exclusive_container() {
            return Some(focused.id.clone());
        }
        tree.containers().nth(self.cursor).map(|c| c.id.clone())
    }

    fn move_cursor(&mut self, step: isize) -> bool {
        let count = self.tree.as_ref().map_or(0, |t| t.container_count());
        if count == 0 {
            return false;
        }
        let next = (self.cursor as isize + step).clamp(0, count as isize - 1) as usize;
        let moved = next != self.cursor;
        self.cursor = next;
        moved
    }
}

// ============================================================================
// Backend
// ============================================================================

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(|err| {
            teardown_terminal();
            err
        })?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|err| {
            teardown_terminal();
            err
        })?;
        terminal.clear().map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);
}

/// Chart backend drawing into the terminal.
pub struct TerminalBackend {
    session: TerminalSession,
    view: SharedView,
    staged: HashMap<ContainerId, PlotRequest>,
    /// Charts still to be re-fitted before the settle redraw.
    pending_resizes: usize,
}

impl TerminalBackend {
    /// Enter raw mode and the alternate screen. Restored on drop.
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            session: TerminalSession::new()?,
            view: Arc::new(Mutex::new(TerminalView::default())),
            staged: HashMap::new(),
            pending_resizes: 0,
        })
    }

    /// View state shared with the input thread.
    pub fn view(&self) -> SharedView {
        self.view.clone()
    }

    fn draw(&mut self) {
        let view = self.view.lock();
        if let Err(e) = self.session.terminal.draw(|frame| draw_view(frame, &view)) {
            warn!(error = %e, "Terminal draw failed");
        }
    }
}

impl ChartBackend for TerminalBackend {
    fn plot(&mut self, container: &ContainerId, request: &PlotRequest) -> Result<(), PlotError> {
        self.staged.insert(container.clone(), request.clone());
        Ok(())
    }

    fn resize(&mut self, _container: &ContainerId) {
        // One redraw once the last chart of the pass has been re-fitted.
        self.pending_resizes = self.pending_resizes.saturating_sub(1);
        if self.pending_resizes == 0 {
            self.draw();
        }
    }

    fn clear(&mut self) {
        self.staged.clear();
    }

    fn commit(&mut self, tree: &ViewTree) {
        self.view.lock().update(tree, &self.staged);
        self.pending_resizes = tree.containers().filter(|c| c.is_plotted()).count();
        self.draw();
    }
}

// ============================================================================
// Input
// ============================================================================

/// Translate a key press into a UI event.
pub fn map_key(key: KeyEvent, view: &mut TerminalView) -> Option<UiEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(UiEvent::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(UiEvent::Quit),
        KeyCode::Char('r') => Some(UiEvent::Refresh),
        KeyCode::Left | KeyCode::Char('h') => select_neighbor(view, -1),
        KeyCode::Right | KeyCode::Char('l') => select_neighbor(view, 1),
        KeyCode::Up | KeyCode::Char('k') => view.move_cursor(-1).then_some(UiEvent::Redraw),
        KeyCode::Down | KeyCode::Char('j') => view.move_cursor(1).then_some(UiEvent::Redraw),
        KeyCode::Enter | KeyCode::Char('f') => view.cursor_target().map(UiEvent::ToggleFocus),
        _ => None,
    }
}

fn select_neighbor(view: &TerminalView, step: isize) -> Option<UiEvent> {
    view.tree
        .as_ref()
        .and_then(|tree| tree.selector.neighbor(step))
        .map(UiEvent::SelectPair)
}

/// Blocking key reader feeding the controller.
pub struct InputThread {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl InputThread {
    pub fn spawn(view: SharedView, ui_tx: mpsc::Sender<UiEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::spawn(move || input_loop(view, ui_tx, flag));
        Self { stop, handle }
    }

    /// Stop reading and wait for the thread (at most one poll period).
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        if self.handle.join().is_err() {
            warn!("Input thread panicked");
        }
    }
}

fn input_loop(view: SharedView, ui_tx: mpsc::Sender<UiEvent>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        let ready = match event::poll(INPUT_POLL) {
            Ok(ready) => ready,
            Err(e) => {
                warn!(error = %e, "Terminal input poll failed");
                break;
            }
        };
        if !ready {
            continue;
        }

        let ui_event = match event::read() {
            Ok(Event::Key(key)) => map_key(key, &mut view.lock()),
            Ok(Event::Resize(_, _)) => Some(UiEvent::Redraw),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Terminal input read failed");
                break;
            }
        };

        if let Some(ui_event) = ui_event {
            let quit = ui_event == UiEvent::Quit;
            if ui_tx.blocking_send(ui_event).is_err() || quit {
                break;
            }
        }
    }
    debug!("Input thread exiting");
}

// ============================================================================
// Drawing
// ============================================================================

const HELP: &str = " ←/→ pair   ↑/↓ chart   Enter focus   r refresh   q quit";

pub(crate) fn draw_view(frame: &mut Frame<'_>, view: &TerminalView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let Some(tree) = view.tree.as_ref() else {
        frame.render_widget(Paragraph::new("Connecting..."), chunks[1]);
        return;
    };

    draw_selector(frame, chunks[0], tree);
    draw_body(frame, chunks[1], tree, view);
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn draw_selector(frame: &mut Frame<'_>, area: Rect, tree: &ViewTree) {
    let labels: Vec<String> = tree
        .selector
        .options
        .iter()
        .map(|o| o.label.clone())
        .collect();
    let mut tabs = Tabs::new(labels).block(Block::default().borders(Borders::ALL).title("Pair"));
    if let Some(selected) = tree.selector.selected {
        tabs = tabs.select(selected).highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    }
    frame.render_widget(tabs, area);
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, tree: &ViewTree, view: &TerminalView) {
    let cursor = view.cursor_target();

    if let Some(focused) = tree.exclusive_container() {
        draw_chart(frame, area, focused, view.charts.get(&focused.id), true);
        return;
    }

    if tree.rows.is_empty() {
        frame.render_widget(Paragraph::new("Waiting for data"), area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Ratio(1, tree.rows.len() as u32);
            tree.rows.len()
        ])
        .split(area);

    for (row, row_area) in tree.rows.iter().zip(rows.iter()) {
        match &row.content {
            RowContent::Invalid(reason) => {
                let block = Block::default()
                    .borders(Borders::ALL)
                    .title(row.pair.to_string());
                frame.render_widget(
                    Paragraph::new(format!("Invalid data: {reason}"))
                        .style(Style::default().fg(Color::Red))
                        .wrap(Wrap { trim: true })
                        .block(block),
                    *row_area,
                );
            }
            RowContent::Charts(charts) => {
                let cols = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Ratio(1, 3),
                        Constraint::Ratio(1, 3),
                        Constraint::Ratio(1, 3),
                    ])
                    .split(*row_area);
                for (container, col) in charts.iter().zip(cols.iter()) {
                    let selected = cursor.as_ref() == Some(&container.id);
                    draw_chart(frame, *col, container, view.charts.get(&container.id), selected);
                }
            }
        }
    }
}

fn draw_chart(
    frame: &mut Frame<'_>,
    area: Rect,
    container: &ChartContainer,
    request: Option<&PlotRequest>,
    selected: bool,
) {
    let border = if selected {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(format!("{} | {}", container.header_label, container.title));

    let request = match (&container.status, request) {
        (PlotStatus::Failed(reason), _) => {
            frame.render_widget(
                Paragraph::new(format!("Plot failed: {reason}"))
                    .style(Style::default().fg(Color::Red))
                    .block(block),
                area,
            );
            return;
        }
        (_, Some(request)) => request,
        (_, None) => {
            frame.render_widget(Paragraph::new("No chart").block(block), area);
            return;
        }
    };

    let axis = request.time_axis();
    let series: Vec<(&Trace, Vec<(f64, f64)>)> = request
        .traces
        .iter()
        .map(|t| (t, t.numeric_points(&axis)))
        .filter(|(_, points)| !points.is_empty())
        .collect();
    if series.is_empty() {
        frame.render_widget(Paragraph::new("No data").block(block), area);
        return;
    }

    let x_bounds = bounds(series.iter().flat_map(|(_, p)| p.iter().map(|(x, _)| *x)), 0.0);
    let y_bounds = bounds(series.iter().flat_map(|(_, p)| p.iter().map(|(_, y)| *y)), 0.05);

    let datasets: Vec<Dataset> = series
        .iter()
        .map(|(trace, points)| {
            let graph_type = if trace.mode.has_lines() && trace.fill.is_none() {
                GraphType::Line
            } else {
                GraphType::Scatter
            };
            Dataset::default()
                .name(trace.name)
                .marker(Marker::Braille)
                .graph_type(graph_type)
                .style(Style::default().fg(trace_color(trace)))
                .data(points)
        })
        .collect();

    let (x_first, x_last) = axis_extent(&request.traces, &axis);
    let x_labels = vec![Span::raw(x_first), Span::raw(x_last)];
    let y_labels = vec![
        Span::raw(format!("{:.3}", y_bounds[0])),
        Span::raw(format!("{:.3}", (y_bounds[0] + y_bounds[1]) / 2.0)),
        Span::raw(format!("{:.3}", y_bounds[1])),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title(request.layout.xaxis.title)
                .bounds(x_bounds)
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(request.layout.yaxis.title)
                .bounds(y_bounds)
                .labels(y_labels),
        );
    frame.render_widget(chart, area);
}

/// Labels of the earliest and latest time point across all traces.
fn axis_extent(traces: &[Trace], axis: &TimeAxis) -> (String, String) {
    let mut positioned = traces
        .iter()
        .flat_map(|t| t.x.iter())
        .filter_map(|p| axis.position(p).map(|x| (x, p)));
    let Some(start) = positioned.next() else {
        return (String::new(), String::new());
    };
    let (min, max) = positioned.fold((start, start), |(lo, hi), cur| {
        (
            if cur.0 < lo.0 { cur } else { lo },
            if cur.0 > hi.0 { cur } else { hi },
        )
    });
    (min.1.to_string(), max.1.to_string())
}

/// Min/max of `values`, widened by `pad` of the span; never zero-width.
fn bounds(values: impl Iterator<Item = f64>, pad: f64) -> [f64; 2] {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    let span = max - min;
    if span <= f64::EPSILON {
        let margin = if min.abs() > 1.0 { min.abs() * 0.01 } else { 0.01 };
        return [min - margin, max + margin];
    }
    [min - span * pad, max + span * pad]
}

fn trace_color(trace: &Trace) -> Color {
    if trace.fill.is_some() {
        return Color::DarkGray;
    }
    let name = trace
        .line
        .as_ref()
        .map(|l| l.color)
        .or_else(|| trace.marker.as_ref().map(|m| m.color));
    match name {
        Some("blue") => Color::Blue,
        Some("green") => Color::Green,
        Some("pink") => Color::LightMagenta,
        Some("purple") => Color::Magenta,
        Some("red") => Color::Red,
        Some("orange") => Color::Rgb(255, 165, 0),
        Some("gray") => Color::Gray,
        _ => Color::Cyan,
    }
}
