// UI layout and rendering for the pack dashboard.
//
// Layout, top to bottom: header, metric tiles, voltage charts, cell
// spread (only when the column is present), recent-rows table, status
// bar. Charts whose column is absent from the fetched data are omitted
// rather than drawn empty.
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
};

use crate::domain::cell_log::PackStatus;
use crate::domain::view::ViewState;

use super::app::{App, InputMode};

const CELL_NAMES: [&str; 4] = ["c1", "c2", "c3", "c4"];
const CELL_COLORS: [Color; 4] = [Color::Cyan, Color::Yellow, Color::Green, Color::Magenta];
const TABLE_ROWS: usize = 200;

/// Top-level rendering function.
pub fn draw(f: &mut Frame, app: &App) {
    let view = &app.view;
    let empty = view.is_empty();
    let has_spread = !empty && view.has_spread();

    let mut constraints = vec![Constraint::Length(3), Constraint::Length(3)];
    if empty {
        constraints.push(Constraint::Min(3));
    } else {
        constraints.push(Constraint::Min(10));
        if has_spread {
            constraints.push(Constraint::Length(8));
        }
        constraints.push(Constraint::Length(12));
    }
    constraints.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_tiles(f, app, chunks[1]);

    let mut idx = 2;
    if empty {
        draw_empty_state(f, app, chunks[idx]);
        idx += 1;
    } else {
        draw_charts(f, view, chunks[idx]);
        idx += 1;
        if has_spread {
            draw_spread_chart(f, view, chunks[idx]);
            idx += 1;
        }
        draw_recent_table(f, view, chunks[idx]);
        idx += 1;
    }

    draw_status_bar(f, app, chunks[idx]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let c = &app.controls;
    let filter_label = if c.status_filter.is_empty() {
        "all".to_string()
    } else {
        c.status_filter
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(",")
    };

    let mut spans = vec![
        Span::styled("device ", Style::default().fg(Color::Gray)),
        Span::styled(&c.device_id, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  last {} days  limit {}  tz ", c.lookback_days, c.limit),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(c.timezone.clone()),
        Span::styled("  filter ", Style::default().fg(Color::Gray)),
        Span::raw(filter_label),
    ];
    for warning in &app.config_warnings {
        spans.push(Span::styled(
            format!("  ! {warning}"),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" 4S LiFePO4 Pack Dashboard "),
    );
    f.render_widget(header, area);
}

fn draw_tiles(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20); 5])
        .split(area);

    let latest = app.view.latest.as_ref();
    let tiles: [(&str, String); 5] = [
        (
            "Pack V (latest)",
            latest.map(|m| m.pack_v_label()).unwrap_or_else(|| "--".into()),
        ),
        (
            "Spread (mV)",
            latest.map(|m| m.spread_label()).unwrap_or_else(|| "--".into()),
        ),
        (
            "Cell min (V)",
            latest
                .map(|m| m.cell_min_label())
                .unwrap_or_else(|| "--".into()),
        ),
        (
            "Cell max (V)",
            latest
                .map(|m| m.cell_max_label())
                .unwrap_or_else(|| "--".into()),
        ),
        ("Rows", app.view.row_count().to_string()),
    ];

    for (i, (title, value)) in tiles.iter().enumerate() {
        let tile = Paragraph::new(Line::from(Span::styled(
            value.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().borders(Borders::ALL).title(*title));
        f.render_widget(tile, columns[i]);
    }
}

fn draw_empty_state(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    if let Some(err) = &app.pipeline_error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }
    if let Some(err) = &app.view.fetch_error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "No data yet. Verify the RLS policy allows SELECT and the device is uploading.",
        Style::default().fg(Color::Gray),
    )));

    let info = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Data "));
    f.render_widget(info, area);
}

fn draw_charts(f: &mut Frame, view: &ViewState, area: Rect) {
    let pack = view.pack_points();
    let cells: Vec<Vec<(f64, f64)>> = (0..4).map(|i| view.cell_points(i)).collect();
    let has_cells = cells.iter().any(|c| !c.is_empty());

    match (!pack.is_empty(), has_cells) {
        (true, true) => {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);
            draw_pack_chart(f, view, &pack, halves[0]);
            draw_cells_chart(f, view, &cells, halves[1]);
        }
        (true, false) => draw_pack_chart(f, view, &pack, area),
        (false, true) => draw_cells_chart(f, view, &cells, area),
        (false, false) => {
            let msg = Paragraph::new("No chartable columns in the fetched data.")
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL).title(" Charts "));
            f.render_widget(msg, area);
        }
    }
}

fn draw_pack_chart(f: &mut Frame, view: &ViewState, points: &[(f64, f64)], area: Rect) {
    let (x_bounds, y_bounds) = chart_bounds(&[points]);
    let datasets = vec![
        Dataset::default()
            .name("pack_v")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(points),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Pack voltage (V) "),
        )
        .x_axis(time_axis(view, x_bounds))
        .y_axis(value_axis(y_bounds, 3));
    f.render_widget(chart, area);
}

fn draw_cells_chart(f: &mut Frame, view: &ViewState, cells: &[Vec<(f64, f64)>], area: Rect) {
    let series_refs: Vec<&[(f64, f64)]> = cells.iter().map(Vec::as_slice).collect();
    let (x_bounds, y_bounds) = chart_bounds(&series_refs);

    let datasets: Vec<Dataset> = cells
        .iter()
        .enumerate()
        .filter(|(_, points)| !points.is_empty())
        .map(|(i, points)| {
            Dataset::default()
                .name(CELL_NAMES[i])
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(CELL_COLORS[i]))
                .data(points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Cell voltages (V) "),
        )
        .x_axis(time_axis(view, x_bounds))
        .y_axis(value_axis(y_bounds, 3));
    f.render_widget(chart, area);
}

fn draw_spread_chart(f: &mut Frame, view: &ViewState, area: Rect) {
    let points = view.spread_points();
    let (x_bounds, _) = chart_bounds(&[points.as_slice()]);
    let max = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let y_bounds = [0.0, (max * 1.15).max(1.0)];

    let datasets = vec![
        Dataset::default()
            .name("spread_mv")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&points),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Cell spread (mV) "),
        )
        .x_axis(time_axis(view, x_bounds))
        .y_axis(value_axis(y_bounds, 0));
    f.render_widget(chart, area);
}

fn draw_recent_table(f: &mut Frame, view: &ViewState, area: Rect) {
    let recent = view.recent_rows(TABLE_ROWS);

    let header = Row::new(["time", "pack V", "c1", "c2", "c3", "c4", "spread", "status"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = recent.iter().map(|r| {
        let status_cell = match r.status {
            Some(status) => {
                Cell::from(status.label()).style(Style::default().fg(status_color(status)))
            }
            None => Cell::from("-").style(Style::default().fg(Color::DarkGray)),
        };
        Row::new(vec![
            Cell::from(r.ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::from(fmt_volts(r.pack_v)),
            Cell::from(fmt_volts(r.cells[0])),
            Cell::from(fmt_volts(r.cells[1])),
            Cell::from(fmt_volts(r.cells[2])),
            Cell::from(fmt_volts(r.cells[3])),
            Cell::from(fmt_spread(r.spread_mv)),
            status_cell,
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(19),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(format!(
        " Recent rows ({} of {}) ",
        recent.len(),
        view.row_count()
    )));
    f.render_widget(table, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let mode_indicator = match app.input_mode {
        InputMode::Normal => Span::styled(
            " NORMAL ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        InputMode::EditDevice => Span::styled(
            " DEVICE ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        InputMode::EditTimezone => Span::styled(
            " TIMEZONE ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    };

    let live_indicator = if app.controls.auto_refresh {
        Span::styled(
            " AUTO ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            " MANUAL ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    };

    let mut spans = vec![mode_indicator, Span::raw(" "), live_indicator];

    if app.input_mode != InputMode::Normal {
        spans.push(Span::raw(format!(" > {}", app.input_buffer)));
    } else if let Some(err) = &app.pipeline_error {
        spans.push(Span::styled(
            format!(" {err} "),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(err) = &app.view.fetch_error {
        spans.push(Span::styled(
            format!(" {err} "),
            Style::default().fg(Color::Red),
        ));
    } else if let Some(secs) = app.seconds_until_refresh() {
        spans.push(Span::styled(
            format!(" refresh in {secs}s "),
            Style::default().fg(Color::Gray),
        ));
    }

    spans.push(Span::styled(
        " q:quit r:refresh a:auto [ ]:days { }:limit + -:interval d:device t:tz 1/2/3:status ",
        Style::default().fg(Color::DarkGray),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Combined x bounds and padded y bounds across one or more series.
fn chart_bounds(series: &[&[(f64, f64)]]) -> ([f64; 2], [f64; 2]) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for points in series {
        for (x, y) in points.iter() {
            x_min = x_min.min(*x);
            x_max = x_max.max(*x);
            y_min = y_min.min(*y);
            y_max = y_max.max(*y);
        }
    }

    if !x_min.is_finite() {
        return ([0.0, 1.0], [0.0, 1.0]);
    }

    let y_margin = (y_max - y_min).max(0.01) * 0.15;
    (
        [x_min, x_max.max(x_min + 1.0)],
        [y_min - y_margin, y_max + y_margin],
    )
}

fn time_axis(view: &ViewState, bounds: [f64; 2]) -> Axis<'static> {
    let first = view
        .rows
        .first()
        .map(|r| r.ts.format("%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let last = view
        .rows
        .last()
        .map(|r| r.ts.format("%m-%d %H:%M").to_string())
        .unwrap_or_default();

    Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds(bounds)
        .labels(vec![Span::raw(first), Span::raw(last)])
}

fn value_axis(bounds: [f64; 2], decimals: usize) -> Axis<'static> {
    Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds(bounds)
        .labels(vec![
            Span::raw(format!("{:.*}", decimals, bounds[0])),
            Span::raw(format!("{:.*}", decimals, bounds[1])),
        ])
}

fn fmt_volts(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.3}"),
        None => "-".to_string(),
    }
}

fn fmt_spread(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{}", v as i64),
        None => "-".to_string(),
    }
}

fn status_color(status: PackStatus) -> Color {
    match status {
        PackStatus::Green => Color::Green,
        PackStatus::Yellow => Color::Yellow,
        PackStatus::Red => Color::Red,
        PackStatus::Unknown => Color::Gray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_volts() {
        assert_eq!(fmt_volts(Some(3.2904)), "3.290");
        assert_eq!(fmt_volts(None), "-");
    }

    #[test]
    fn test_fmt_spread_truncates_to_integer() {
        assert_eq!(fmt_spread(Some(20.0)), "20");
        assert_eq!(fmt_spread(None), "-");
    }

    #[test]
    fn test_chart_bounds_empty_series_are_safe() {
        let (x, y) = chart_bounds(&[&[]]);
        assert_eq!(x, [0.0, 1.0]);
        assert_eq!(y, [0.0, 1.0]);
    }

    #[test]
    fn test_chart_bounds_pad_y() {
        let points = [(0.0, 3.0), (10.0, 4.0)];
        let (x, y) = chart_bounds(&[&points]);
        assert_eq!(x, [0.0, 10.0]);
        assert!(y[0] < 3.0);
        assert!(y[1] > 4.0);
    }
}
