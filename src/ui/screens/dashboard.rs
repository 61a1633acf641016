use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::*};
use tokio::sync::watch;

use crate::app::{MonitorState, TimerState};
use crate::catalog::ALL_INDUSTRIES;
use crate::error::{AppError, Result};
use crate::fetch::{QuoteStatus, RefreshSnapshot};
use crate::ui::components::{
    column, column_table, Column,
    utils::{centered_rect, grid_cells, split_horizontal, split_vertical},
    TerminalGuard,
};
use crate::ui::report::{format_change, format_metric, format_price, format_volume};
use crate::ui::styles::{
    secondary_line, secondary_span, selection_style, tile_style, tone_style, ACCENT,
};
use crate::utils::{age_label, clock_label, fit_width};
use crate::view::heat_tone;

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const TILE_WIDTH: u16 = 18;
const TILE_HEIGHT: u16 = 4;
const WATCHLIST_COLUMNS: [Column; 7] = [
    column("Symbol", 8),
    column("Name", 12),
    column("Price", 10),
    column("Change", 9),
    column("Volume", 10),
    column("Status", 9),
    column("Priced", 8),
];
const KEY_HINTS: &str =
    "r refresh • a auto • Tab industry • + add • d remove • ↑/↓ move • q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Notice {
    Info(String),
    Warn(String),
}

/// Live view over the watchlist, the ranked heatmap, and industry moves.
///
/// Runs on the calling thread; refreshes happen on runtime tasks, so this loop only reads the
/// published snapshot and the cache.
pub fn run_dashboard(state: &MonitorState) -> Result<()> {
    let mut dashboard = Dashboard::new(state);
    let mut guard = TerminalGuard::enter()?;

    loop {
        dashboard.poll_updates();
        guard.draw(|f| dashboard.render(f))?;

        if let Some(key) = guard.next_key(POLL_INTERVAL)? {
            if dashboard.handle_key(key) == Flow::Quit {
                break;
            }
        }
    }

    guard.leave()?;
    Ok(())
}

struct Dashboard<'a> {
    state: &'a MonitorState,
    updates: watch::Receiver<Arc<RefreshSnapshot>>,
    snapshot: Arc<RefreshSnapshot>,
    industries: Vec<String>,
    industry_idx: usize,
    selected: usize,
    input: Option<String>,
    notice: Option<Notice>,
}

impl<'a> Dashboard<'a> {
    fn new(state: &'a MonitorState) -> Self {
        let mut updates = state.subscribe();
        let snapshot = Arc::clone(&updates.borrow_and_update());
        let mut industries = vec![ALL_INDUSTRIES.to_string()];
        industries.extend(state.catalog().industries().into_iter().map(str::to_string));

        Self {
            state,
            updates,
            snapshot,
            industries,
            industry_idx: 0,
            selected: 0,
            input: None,
            notice: None,
        }
    }

    fn industry(&self) -> Option<&str> {
        match self.industry_idx {
            0 => None,
            idx => self.industries.get(idx).map(String::as_str),
        }
    }

    fn poll_updates(&mut self) {
        if !self.updates.has_changed().unwrap_or(false) {
            return;
        }
        self.snapshot = Arc::clone(&self.updates.borrow_and_update());
        let snapshot = &self.snapshot;
        self.notice = Some(Notice::Info(format!(
            "Cycle {} done at {}: {} ok, {} not found, {} failed",
            snapshot.cycle,
            clock_label(&snapshot.completed_at),
            snapshot.count(QuoteStatus::Success),
            snapshot.count(QuoteStatus::NotFound),
            snapshot.count(QuoteStatus::Failed),
        )));
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Flow::Quit;
        }
        if self.input.is_some() {
            self.handle_input_key(key);
            return Flow::Continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('r') => self.request_refresh(),
            KeyCode::Char('a') => self.toggle_auto(),
            KeyCode::Tab => {
                self.industry_idx = (self.industry_idx + 1) % self.industries.len();
            }
            KeyCode::BackTab => {
                self.industry_idx = self
                    .industry_idx
                    .checked_sub(1)
                    .unwrap_or(self.industries.len() - 1);
            }
            KeyCode::Char('+') | KeyCode::Char('i') => {
                self.input = Some(String::new());
            }
            KeyCode::Char('d') | KeyCode::Delete => self.remove_selected(),
            KeyCode::Down | KeyCode::Char('j') => {
                let total = self.state.watchlist().len();
                if total > 0 {
                    self.selected = (self.selected + 1) % total;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let total = self.state.watchlist().len();
                if total > 0 {
                    self.selected = self.selected.checked_sub(1).unwrap_or(total - 1);
                }
            }
            _ => {}
        }
        Flow::Continue
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let Some(buffer) = self.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.input = None,
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Enter => {
                let text = std::mem::take(buffer);
                self.input = None;
                self.add_symbol(&text);
            }
            KeyCode::Char(ch) => buffer.push(ch),
            _ => {}
        }
    }

    fn request_refresh(&mut self) {
        self.notice = Some(match self.state.timer().trigger_manual() {
            // The cycle publishes its own snapshot; nothing to wait for here.
            Ok(_) => Notice::Info("Refreshing…".to_string()),
            Err(AppError::Busy) => Notice::Warn("A refresh is already running".to_string()),
            Err(err) => Notice::Warn(format!("Refresh failed: {err}")),
        });
    }

    fn toggle_auto(&mut self) {
        let timer = self.state.timer();
        if timer.is_auto() {
            timer.disable();
            self.notice = Some(Notice::Info("Auto refresh off".to_string()));
        } else {
            let interval = self.state.settings().refresh_interval;
            timer.enable(interval);
            self.notice = Some(Notice::Info(format!(
                "Auto refresh every {}s",
                interval.as_secs()
            )));
        }
    }

    fn add_symbol(&mut self, raw: &str) {
        let update = match self.state.add_symbol(raw) {
            Ok(update) => update,
            Err(err) => {
                self.notice = Some(Notice::Warn(err.to_string()));
                return;
            }
        };

        self.notice = Some(if !update.changed {
            Notice::Info(format!("{} is already watched", update.symbol))
        } else if let Some(err) = &update.save_error {
            Notice::Warn(format!("Added {} but could not save: {err}", update.symbol))
        } else {
            Notice::Info(format!("Added {}", update.symbol))
        });

        if update.changed {
            // Best effort: a running cycle will pick the symbol up next time.
            let _ = self.state.timer().trigger_manual();
        }
    }

    fn remove_selected(&mut self) {
        let symbols = self.state.watchlist().all();
        let Some(symbol) = symbols.get(self.selected) else {
            return;
        };
        self.notice = Some(match self.state.remove_symbol(symbol) {
            Ok(update) => match &update.save_error {
                Some(err) => Notice::Warn(format!(
                    "Removed {} but could not save: {err}",
                    update.symbol
                )),
                None => Notice::Info(format!("Removed {}", update.symbol)),
            },
            Err(err) => Notice::Warn(err.to_string()),
        });
        self.selected = self.selected.min(symbols.len().saturating_sub(2));
    }

    fn render(&self, f: &mut Frame) {
        let rows = split_vertical(
            f.size(),
            &[
                Constraint::Length(1),
                Constraint::Percentage(45),
                Constraint::Min(TILE_HEIGHT + 2),
                Constraint::Length(1),
            ],
        );
        let upper = split_horizontal(
            rows[1],
            &[Constraint::Percentage(65), Constraint::Percentage(35)],
        );

        self.render_header(f, rows[0]);
        self.render_watchlist(f, upper[0]);
        self.render_industries(f, upper[1]);
        self.render_heatmap(f, rows[2]);
        self.render_footer(f, rows[3]);

        if let Some(text) = &self.input {
            let area = centered_rect(40, 20, f.size());
            let prompt = Paragraph::new(vec![
                Line::from(format!("{text}_")),
                secondary_line("Enter confirm • Esc cancel"),
            ])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(ACCENT))
                    .title("Add symbol"),
            );
            f.render_widget(Clear, area);
            f.render_widget(prompt, area);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let timer = self.state.timer();
        let mode = match timer.interval() {
            Some(interval) => format!("auto {}s", interval.as_secs()),
            None => "manual".to_string(),
        };
        let phase = match timer.state() {
            TimerState::Running => {
                let (done, total) = self.state.scheduler().progress();
                format!("refreshing {done}/{total}")
            }
            TimerState::Scheduled => "waiting".to_string(),
            TimerState::Idle => "idle".to_string(),
        };
        let last = if self.snapshot.cycle == 0 {
            "no refresh yet".to_string()
        } else {
            format!(
                "cycle #{} at {} ({})",
                self.snapshot.cycle,
                clock_label(&self.snapshot.completed_at),
                age_label(&self.snapshot.completed_at, &Local::now())
            )
        };

        let line = Line::from(vec![
            Span::styled("stock-watch", selection_style()),
            secondary_span(format!("  source {}", self.state.scheduler().source_name())),
            Span::raw(format!("  │ {mode} │ {phase} │ ")),
            secondary_span(last),
        ]);
        f.render_widget(Paragraph::new(line), area);
    }

    fn render_watchlist(&self, f: &mut Frame, area: Rect) {
        let symbols = self.state.watchlist().all();
        let capacity = (area.height.saturating_sub(3) as usize).max(1);
        let offset = self.selected.saturating_sub(capacity - 1);
        let now = Local::now();
        let cache = self.state.cache();
        // Two missed cycles before a price counts as stale.
        let max_age = chrono::Duration::from_std(self.state.settings().refresh_interval * 2)
            .unwrap_or_else(|_| chrono::Duration::hours(1));

        let rows: Vec<Row> = symbols
            .iter()
            .skip(offset)
            .take(capacity)
            .map(|symbol| {
                let quote = cache.get(symbol);
                let name = quote
                    .as_ref()
                    .map(|q| q.name.clone())
                    .or_else(|| self.state.catalog().name_of(symbol).map(str::to_string))
                    .unwrap_or_else(|| "-".to_string());
                let change = quote.as_ref().and_then(|q| q.change_pct());
                let status = match quote.as_ref() {
                    Some(q) if q.is_success() && q.is_stale(now, max_age) => "stale",
                    Some(q) => q.status.label(),
                    None => "pending",
                };
                let priced = quote
                    .as_ref()
                    .and_then(|q| q.priced_at)
                    .map(|at| age_label(&at, &now))
                    .unwrap_or_else(|| "-".to_string());

                Row::new(vec![
                    Cell::from(symbol.clone()),
                    Cell::from(fit_width(&name, 12)),
                    Cell::from(format_price(quote.as_ref().and_then(|q| q.price))),
                    Cell::from(format_change(change)).style(tone_style(heat_tone(change))),
                    Cell::from(format_volume(quote.as_ref().and_then(|q| q.volume))),
                    Cell::from(status),
                    Cell::from(priced),
                ])
            })
            .collect();

        let title = format!("Watchlist ({})", symbols.len());
        let selected = self.selected.checked_sub(offset);
        f.render_widget(column_table(&WATCHLIST_COLUMNS, rows, selected, title), area);
    }

    fn render_industries(&self, f: &mut Frame, area: Rect) {
        let current = self.industry();
        let items: Vec<ListItem> = self
            .state
            .industry_heat()
            .into_iter()
            .map(|heat| {
                let tone = heat_tone(heat.change_pct);
                let text = format!("{} ", fit_width(&heat.industry, 12));
                let label = if Some(heat.industry.as_str()) == current {
                    Span::styled(text, selection_style())
                } else {
                    Span::raw(text)
                };
                ListItem::new(Line::from(vec![
                    label,
                    Span::styled(format_change(heat.change_pct), tone_style(tone)),
                    secondary_span(format!(" {}/{}", heat.quoted, heat.members)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Industries"));
        f.render_widget(list, area);
    }

    fn render_heatmap(&self, f: &mut Frame, area: Rect) {
        let settings = self.state.settings();
        let (label, n) = match self.industry() {
            Some(industry) => (industry.to_string(), settings.industry_top),
            None => ("all industries".to_string(), settings.heatmap_size),
        };
        let entries = self.state.top_n(self.industry(), n);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Top {} by market cap • {label}", entries.len()));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let cells = grid_cells(inner, TILE_WIDTH, TILE_HEIGHT, entries.len());
        let text_width = usize::from(TILE_WIDTH.saturating_sub(2));
        for (entry, cell) in entries.iter().zip(cells) {
            let tone = heat_tone(entry.change_pct);
            let tile = Paragraph::new(vec![
                Line::from(fit_width(&entry.name, text_width)),
                Line::from(format!("{} {}", entry.symbol, format_price(entry.price))),
                Line::from(format!(
                    "{} {}",
                    format_change(entry.change_pct),
                    format_metric(entry.derived_metric)
                )),
            ])
            .style(tile_style(tone));
            f.render_widget(tile, cell);
        }
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        match &self.notice {
            Some(Notice::Info(text)) => spans.push(Span::raw(format!("{text}  "))),
            Some(Notice::Warn(text)) => spans.push(Span::styled(
                format!("{text}  "),
                Style::default().fg(Color::Yellow),
            )),
            None => {}
        }
        spans.push(secondary_span(KEY_HINTS));
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
