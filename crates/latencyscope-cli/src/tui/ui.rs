//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────┐
//! │  latencyscope  #42  idle  300 pts  12% late  │
//! ├──────────────────────────────────────────────┤
//! │  ╭ arrival time (s)                          │
//! │  │   ·  ·    ·                               │
//! │  │ ─────────────────────────── deadline 2s   │
//! │  │ ·  ·   ·  · ·                             │
//! │  ╰──────────────────── message id            │
//! ├──────────────────────────────────────────────┤
//! │  brush [200, 300) of 300   follow            │
//! ├──────────────────────────────────────────────┤
//! │  ←→ pan   +/- zoom   0 reset   f follow ...  │
//! └──────────────────────────────────────────────┘

use super::app::{App, Snapshot};
use latencyscope_core::{ChartPoint, PollState, Retention};
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, app: &App, snap: &Snapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // chart
            Constraint::Length(3), // brush
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app, snap);
    draw_chart(f, rows[1], app, snap);
    draw_brush(f, rows[2], app, snap);
    draw_keys(f, rows[3]);
}

fn state_style(state: PollState) -> Style {
    match state {
        PollState::Idle => Style::default().fg(Color::Green),
        PollState::Fetching | PollState::Merging => Style::default().fg(Color::Yellow),
        PollState::Stopped => Style::default().fg(Color::DarkGray),
    }
}

fn draw_title(f: &mut Frame, area: Rect, app: &App, snap: &Snapshot) {
    let stats = &snap.stats;
    let late = snap
        .summary
        .as_ref()
        .map(|s| format!("{:.1}% late", s.over_deadline_pct()))
        .unwrap_or_else(|| "no data".to_string());

    let mut spans = vec![
        Span::styled(" latencyscope ", Style::default().bold().fg(Color::Cyan)),
        Span::raw(format!(" {} ", app.source())),
        Span::styled(format!(" {} ", snap.state), state_style(snap.state)),
        Span::styled(
            format!(
                " #{}  {} pts  {} ids  {late} ",
                stats.cycles,
                snap.points.len(),
                snap.seen_ids
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(err) = &snap.last_error {
        spans.push(Span::styled(
            format!(" {err} "),
            Style::default().fg(Color::Red),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(spans));

    f.render_widget(block, area);
}

/// Chart coordinates for a brushed window: x is the series position, y the
/// arrival time. `line` joins every point; the split colours the markers.
struct LatencyTrace {
    line: Vec<(f64, f64)>,
    on_time: Vec<(f64, f64)>,
    late: Vec<(f64, f64)>,
}

impl LatencyTrace {
    fn new(window: &[ChartPoint], start: usize, deadline: f64) -> Self {
        let line: Vec<(f64, f64)> = window
            .iter()
            .enumerate()
            .map(|(i, p)| ((start + i) as f64, p.arrival_time))
            .collect();
        let (late, on_time): (Vec<(f64, f64)>, Vec<(f64, f64)>) =
            line.iter().partition(|&&(_, y)| y > deadline);
        Self {
            line,
            on_time,
            late,
        }
    }
}

fn draw_chart(f: &mut Frame, area: Rect, app: &App, snap: &Snapshot) {
    let (start, end) = snap.brush;
    let window = &snap.points[start..end];

    if window.is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" arrival time ");
        let p = Paragraph::new(format!("Waiting for data from {}", app.source()))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let deadline = app.deadline();
    let LatencyTrace {
        line,
        on_time,
        late,
    } = LatencyTrace::new(window, start, deadline);

    let x_min = start as f64;
    let x_max = ((end - 1) as f64).max(x_min + 1.0);
    let deadline_line = [(x_min, deadline), (x_max, deadline)];

    let max_val = window
        .iter()
        .map(|p| p.arrival_time)
        .fold(deadline, f64::max);
    let min_val = window
        .iter()
        .map(|p| p.arrival_time)
        .fold(0.0, f64::min);
    let y_max = max_val * 1.1;

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&line),
        Dataset::default()
            .name("on time")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Cyan))
            .data(&on_time),
        Dataset::default()
            .name("late")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .data(&late),
        Dataset::default()
            .name(format!("deadline {deadline}s"))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&deadline_line),
    ];

    let first_id = window[0].id;
    let mid_id = window[window.len() / 2].id;
    let last_id = window[window.len() - 1].id;

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" arrival time (s)  {} points ", window.len())),
        )
        .x_axis(
            Axis::default()
                .title("message id")
                .bounds([x_min, x_max])
                .labels(vec![
                    Line::from(first_id.to_string()),
                    Line::from(mid_id.to_string()),
                    Line::from(last_id.to_string()),
                ]),
        )
        .y_axis(Axis::default().bounds([min_val, y_max]).labels(vec![
            Line::from(format!("{min_val:.1}")),
            Line::from(format!("{deadline:.1}")),
            Line::from(format!("{y_max:.1}")),
        ]))
        .legend_position(Some(LegendPosition::TopRight));

    f.render_widget(chart, area);
}

fn draw_brush(f: &mut Frame, area: Rect, app: &App, snap: &Snapshot) {
    let (start, end) = snap.brush;
    let len = snap.points.len();
    let mode = if app.is_following() { "follow" } else { "fixed" };
    let retention = match snap.retention {
        Retention::Unbounded => "unbounded".to_string(),
        Retention::Window(n) => format!("window {n}, {} evicted", snap.evicted_points),
    };

    let text = Line::from(vec![
        Span::styled(
            format!(" [{start}, {end}) of {len} "),
            Style::default().bold().fg(Color::Yellow),
        ),
        Span::raw(format!(" {mode} ")),
        Span::styled(
            format!(
                "  every {:?}  {} sampler  {retention}  {} failed ",
                app.period(),
                app.sampler(),
                snap.stats.failed
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let block = Block::default().borders(Borders::ALL).title(" Brush ");
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(
        " ←→ pan   +/- zoom   0 reset   f follow   r refresh   q quit",
    )
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
