use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
    Row, Table,
};
use ratatui::Terminal;
use tracing::warn;

use crate::config::Config;
use crate::export::{self, ExportOptions};
use crate::pipeline::Analysis;
use crate::types::{format_roas, Totals};

const SPEND_COLOR: Color = Color::Rgb(255, 165, 0);
const REVENUE_COLOR: Color = Color::Green;
const BAR_WIDTH: u16 = 6;
const BAR_GAP: u16 = 1;

struct App<'a> {
    analysis: &'a Analysis,
    totals: Totals,
    spend_points: Vec<(f64, f64)>,
    revenue_points: Vec<(f64, f64)>,
    export_path: PathBuf,
    export_options: ExportOptions,
    status: Option<String>,
    scroll_offset: usize,
    should_quit: bool,
}

impl<'a> App<'a> {
    fn new(analysis: &'a Analysis, config: &Config, export_path: PathBuf) -> Self {
        let spend_points = analysis
            .daily
            .iter()
            .enumerate()
            .map(|(i, d)| (i as f64, d.total_spend))
            .collect();
        let revenue_points = analysis
            .daily
            .iter()
            .enumerate()
            .map(|(i, d)| (i as f64, d.total_revenue))
            .collect();
        Self {
            analysis,
            totals: analysis.totals(),
            spend_points,
            revenue_points,
            export_path,
            export_options: config.export_options(),
            status: None,
            scroll_offset: 0,
            should_quit: false,
        }
    }

    fn export(&mut self) {
        let status = match export::write_export(&self.export_path, &self.analysis.merged, &self.export_options) {
            Ok(bytes) => format!("Saved {} bytes to {}", bytes, self.export_path.display()),
            Err(e) => {
                warn!(error = %e, "export failed");
                format!("Export failed: {e}")
            }
        };
        self.status = Some(status);
    }

    fn scroll_down(&mut self) {
        if self.scroll_offset + 1 < self.analysis.merged.len() {
            self.scroll_offset += 1;
        }
    }
}

pub fn run(analysis: &Analysis, config: &Config, export_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(analysis, config, export_path);
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    while !app.should_quit {
        terminal.draw(|f| draw(f, app))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                        KeyCode::Char('e') => app.export(),
                        KeyCode::Up => app.scroll_offset = app.scroll_offset.saturating_sub(1),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }
    }
    Ok(())
}

fn draw(f: &mut ratatui::Frame, app: &App) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),       // header
            Constraint::Percentage(50),  // charts
            Constraint::Min(6),          // merged preview
        ])
        .split(size);

    draw_header(f, app, chunks[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    draw_spend_revenue(f, app, charts[0]);
    draw_roas(f, app, charts[1]);

    draw_merged(f, app, chunks[2]);
}

fn draw_header(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let mut header = vec![
        Span::styled(" Etsy Ads & Sales ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled(format!("Spend: {:.2}", app.totals.spend), Style::default().fg(SPEND_COLOR)),
        Span::raw(" | "),
        Span::styled(format!("Revenue: {:.2}", app.totals.revenue), Style::default().fg(REVENUE_COLOR)),
        Span::raw(" | "),
        Span::styled(format!("ROAS: {}", format_roas(app.totals.roas)), Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
        Span::raw(format!("Days: {}", app.analysis.daily.len())),
        Span::raw(" | "),
    ];
    match &app.status {
        Some(status) => header.push(Span::styled(status.clone(), Style::default().fg(Color::White))),
        None => header.push(Span::styled(
            "q=quit  e=export  Up/Down=scroll",
            Style::default().fg(Color::DarkGray),
        )),
    }
    let p = Paragraph::new(Line::from(header))
        .block(Block::default().borders(Borders::ALL).title(" Analytics Dashboard "));
    f.render_widget(p, area);
}

fn draw_spend_revenue(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let daily = &app.analysis.daily;
    let max_x = daily.len().saturating_sub(1).max(1) as f64;
    let max_y = daily
        .iter()
        .map(|d| d.total_spend.max(d.total_revenue))
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.1;

    let first = daily.first().map(|d| d.date.to_string()).unwrap_or_default();
    let last = daily.last().map(|d| d.date.to_string()).unwrap_or_default();

    let datasets = vec![
        Dataset::default()
            .name("spend")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(SPEND_COLOR))
            .data(&app.spend_points),
        Dataset::default()
            .name("revenue")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(REVENUE_COLOR))
            .data(&app.revenue_points),
    ];

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(" Daily Spend vs Revenue "))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, max_x])
                .labels(vec![first, last]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, max_y])
                .labels(vec!["0".to_string(), format!("{:.0}", max_y / 2.0), format!("{:.0}", max_y)]),
        );
    f.render_widget(chart, area);
}

fn draw_roas(f: &mut ratatui::Frame, app: &App, area: Rect) {
    // Show the most recent days that fit.
    let fits = (area.width.saturating_sub(2) / (BAR_WIDTH + BAR_GAP)).max(1) as usize;
    let daily = &app.analysis.daily;
    let skip = daily.len().saturating_sub(fits);

    let bars: Vec<Bar> = daily
        .iter()
        .skip(skip)
        .map(|d| {
            let (value, color) = match d.roas {
                Some(r) => ((r * 100.0).round().max(0.0) as u64, Color::Cyan),
                None => (0, Color::DarkGray),
            };
            Bar::default()
                .value(value)
                .label(Line::from(d.date.date().format("%m-%d").to_string()))
                .text_value(format_roas(d.roas))
                .style(Style::default().fg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" ROAS Over Time "))
        .data(BarGroup::default().bars(&bars))
        .bar_width(BAR_WIDTH)
        .bar_gap(BAR_GAP);
    f.render_widget(chart, area);
}

fn draw_merged(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let max_visible = (area.height as usize).saturating_sub(3);
    let total = app.analysis.merged.len();

    let rows: Vec<Row> = app
        .analysis
        .merged
        .iter()
        .skip(app.scroll_offset)
        .take(max_visible)
        .map(|row| {
            let revenue_cell = match row.revenue {
                Some(r) => Cell::from(format!("{r:.2}")),
                None => Cell::from(Span::styled("-", Style::default().fg(Color::DarkGray))),
            };
            Row::new(vec![
                Cell::from(row.date.to_string()),
                Cell::from(row.ad_group.clone().unwrap_or_default()),
                Cell::from(format!("{:.2}", row.spend)),
                Cell::from(row.clicks.map(|c| c.to_string()).unwrap_or_default()),
                Cell::from(row.order_id.clone().unwrap_or_default()),
                Cell::from(row.product.clone().unwrap_or_default()),
                revenue_cell,
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(16),
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(12),
            Constraint::Min(18),
            Constraint::Length(9),
        ],
    )
    .header(
        Row::new(vec!["DATE", "AD GROUP", "SPEND", "CLICKS", "ORDER", "PRODUCT", "REVENUE"])
            .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::White)),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Raw Merged Data ({}/{}) ", (app.scroll_offset + 1).min(total), total)),
    );

    f.render_widget(table, area);
}
