pub mod route;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{canvas::Canvas, Block, Borders, Clear, Paragraph, Sparkline, Wrap},
    Frame,
};

use crate::{
    app::{App, ToastKind},
    render::render_route,
    stats::summary_lines,
    ui::route::{canvas_bounds, ShapeBuffer},
};

const SIDE_PANEL_WIDTH: u16 = 30;
const STATS_HEIGHT: u16 = 9;

struct Areas {
    alert: Rect,
    canvas: Rect,
    stats: Rect,
    summary: Rect,
    controls: Rect,
}

fn areas(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title / network alert
            Constraint::Min(5),    // route + side panel
            Constraint::Length(1), // controls
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(rows[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(STATS_HEIGHT), Constraint::Min(0)])
        .split(columns[1]);

    Areas {
        alert: rows[0],
        canvas: columns[0],
        stats: side[0],
        summary: side[1],
        controls: rows[2],
    }
}

fn route_block() -> Block<'static> {
    Block::default().borders(Borders::ALL).title(" Route ")
}

/// Cells available to the route canvas for a terminal of size `area`.
pub fn canvas_area(area: Rect) -> Rect {
    route_block().inner(areas(area).canvas)
}

pub fn draw(app: &App, f: &mut Frame) {
    let full = f.area();
    let areas = areas(full);
    let bold = Style::default().add_modifier(Modifier::BOLD);

    draw_alert_line(app, f, areas.alert, bold);
    draw_route(app, f, areas.canvas);
    draw_stats(app, f, areas.stats, bold);
    if let Some(summary) = app.last_summary.as_ref().filter(|_| !app.is_tracking()) {
        let lines: Vec<Line> = summary_lines(summary)
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::raw(format!("{label:<10}")),
                    Span::styled(value, bold),
                ])
            })
            .collect();
        let panel = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Workout Summary "),
        );
        f.render_widget(panel, areas.summary);
    }
    draw_controls(app, f, areas.controls);

    if let Some(toast) = &app.toast {
        draw_toast(f, areas.canvas, &toast.message, toast.kind);
    }
    if let Some(notice) = &app.notice {
        draw_notice(f, full, notice);
    }
}

fn draw_alert_line(app: &App, f: &mut Frame, area: Rect, bold: Style) {
    let status = if app.is_tracking() {
        Span::styled(
            format!("● tracking {}", app.tracker.session().id),
            Style::default().fg(Color::Green),
        )
    } else {
        Span::styled("idle", Style::default().add_modifier(Modifier::DIM))
    };
    let mut spans = vec![Span::styled("tread ", bold), status];

    if let Some(message) = app.network.condition().message() {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            message,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(status) = &app.source_status {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            status.clone(),
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::ITALIC),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_route(app: &App, f: &mut Frame, area: Rect) {
    let route = &app.tracker.session().route;
    let mut shapes = ShapeBuffer::new();
    render_route(route, &mut shapes);

    let (x_bounds, y_bounds) = canvas_bounds(app.tracker.surface(), route, app.fit_to_route);
    let title = if app.fit_to_route {
        " Route (fit) "
    } else {
        " Route "
    };
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| shapes.paint(ctx));
    f.render_widget(canvas, area);

    if app.is_tracking() {
        return;
    }
    let overlay = if app.last_summary.is_some() {
        "Workout completed"
    } else {
        "Press s to start"
    };
    let inner = route_block().inner(area);
    let line = Rect {
        y: inner.y + inner.height / 2,
        height: inner.height.min(1),
        ..inner
    };
    f.render_widget(
        Paragraph::new(Span::styled(
            overlay,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center),
        line,
    );
}

fn draw_stats(app: &App, f: &mut Frame, area: Rect, bold: Style) {
    let block = Block::default().borders(Borders::ALL).title(" Stats ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let stats = &app.stats;
    let lines = vec![
        Line::from(vec![
            Span::raw("Distance  "),
            Span::styled(stats.distance_text.clone(), bold),
            Span::raw(" km"),
        ]),
        Line::from(vec![
            Span::raw("Speed     "),
            Span::styled(stats.speed_text.clone(), bold),
            Span::raw(" km/h"),
        ]),
        Line::from(vec![
            Span::raw("Duration  "),
            Span::styled(stats.duration_text.clone(), bold),
        ]),
    ];
    f.render_widget(Paragraph::new(lines), chunks[0]);

    f.render_widget(
        Paragraph::new(Span::styled(
            "speed, last 10 samples",
            Style::default().add_modifier(Modifier::DIM),
        )),
        chunks[1],
    );
    // tenths of km/h so slow walks still show
    let bars: Vec<u64> = app
        .tracker
        .session()
        .speed_history
        .iter()
        .map(|kmh| (kmh * 10.0).round().max(0.0) as u64)
        .collect();
    f.render_widget(
        Sparkline::default()
            .data(&bars)
            .style(Style::default().fg(Color::Cyan)),
        chunks[2],
    );
}

fn draw_controls(app: &App, f: &mut Frame, area: Rect) {
    let tracking = app.is_tracking();
    let enabled = Style::default().add_modifier(Modifier::BOLD);
    let disabled = Style::default().add_modifier(Modifier::DIM);
    let control = |label: &'static str, on: bool| {
        Span::styled(label, if on { enabled } else { disabled })
    };

    let legend = Line::from(vec![
        control("(s)tart", !tracking),
        Span::raw("  "),
        control("(x) stop", tracking),
        Span::raw("  "),
        control(
            if app.fit_to_route {
                "(f)ixed view"
            } else {
                "(f)it route"
            },
            true,
        ),
        Span::raw("  "),
        control("(n)etwork", true),
        Span::raw("  "),
        control("(q)uit", true),
    ]);
    f.render_widget(
        Paragraph::new(legend).style(Style::default().add_modifier(Modifier::ITALIC)),
        area,
    );
}

fn draw_toast(f: &mut Frame, canvas: Rect, message: &str, kind: ToastKind) {
    let width = (message.chars().count() as u16 + 4).min(canvas.width);
    let height = 3.min(canvas.height);
    let area = Rect {
        x: canvas.x + canvas.width.saturating_sub(width + 1),
        y: canvas.y + canvas.height.saturating_sub(height + 1),
        width,
        height,
    };
    let color = match kind {
        ToastKind::Info => Color::Green,
        ToastKind::Error => Color::Red,
    };
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn draw_notice(f: &mut Frame, area: Rect, notice: &str) {
    let width = area.width.min(60);
    let height = area.height.min(9);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(format!("{notice}\n\n(enter) dismiss"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(" Location ")),
        popup,
    );
}
