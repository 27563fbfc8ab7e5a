use chrono::Local;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, Paragraph};
use sync_engine::countdown::{display_remaining, format_compact};
use sync_engine::filters::is_unconstrained;
use sync_engine::NotificationLevel;

use super::text::fit_cell;
use super::theme::Theme;
use crate::app::{AppState, InputMode};
use crate::views::{RowView, TabKind, TabSnapshot};

const COUNTDOWN_WIDTH: usize = 12;
const COLUMN_GAP: &str = "  ";

pub(crate) fn draw_ui(frame: &mut ratatui::Frame, app: &mut AppState) {
    let theme = Theme::dark();
    let snapshot = app.snapshot();
    app.sync_selection(snapshot.rows.len());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, &theme, &snapshot, chunks[0]);
    draw_filters(frame, &theme, &snapshot, chunks[1]);
    draw_rows(frame, &theme, app, &snapshot, chunks[2]);
    draw_footer(frame, &theme, app, chunks[3]);
}

fn draw_header(
    frame: &mut ratatui::Frame,
    theme: &Theme,
    snapshot: &TabSnapshot,
    area: ratatui::layout::Rect,
) {
    let mut spans = Vec::new();
    for kind in TabKind::ALL {
        spans.push(Span::styled(
            format!(" {} ", kind.title()),
            theme.tab_style(kind == snapshot.kind),
        ));
    }
    spans.push(Span::styled("  auto-refresh: ", theme.help_style()));
    spans.push(if snapshot.polling {
        Span::styled("on", theme.ok_style())
    } else {
        Span::styled("paused", theme.warn_style())
    });
    let fetched = snapshot
        .fetched_at
        .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "loading".to_string());
    spans.push(Span::styled("  updated: ", theme.help_style()));
    spans.push(Span::styled(fetched, theme.text_style()));
    let header = Paragraph::new(Line::from(spans)).block(theme.block("dealdesk"));
    frame.render_widget(header, area);
}

fn draw_filters(
    frame: &mut ratatui::Frame,
    theme: &Theme,
    snapshot: &TabSnapshot,
    area: ratatui::layout::Rect,
) {
    let active: Vec<_> = snapshot
        .filters
        .iter()
        .filter(|(_, value)| !is_unconstrained(value))
        .collect();
    let line = if active.is_empty() {
        Line::styled("no filters", theme.help_style())
    } else {
        let mut spans = Vec::new();
        for (field, value) in active {
            spans.push(Span::styled(format!("{field}="), theme.help_style()));
            spans.push(Span::styled(value.clone(), theme.accent_style()));
            spans.push(Span::raw("  "));
        }
        Line::from(spans)
    };
    frame.render_widget(Paragraph::new(line).block(theme.block("Filters")), area);
}

fn draw_rows(
    frame: &mut ratatui::Frame,
    theme: &Theme,
    app: &mut AppState,
    snapshot: &TabSnapshot,
    area: ratatui::layout::Rect,
) {
    let pagination = snapshot.pagination;
    let range = pagination
        .item_range()
        .map(|(first, last)| format!("{first}-{last} of {}", pagination.total_items()))
        .unwrap_or_else(|| "0 items".to_string());
    let mut title = format!(
        "{}  page {}/{}  {range}",
        snapshot.kind.title(),
        pagination.page(),
        pagination.last_page()
    );
    if snapshot.countdown_header.is_some() {
        if let Some(soonest) = soonest_deadline(&snapshot.rows) {
            title.push_str(&format!("  soonest {}", format_compact(soonest)));
        }
    }

    let mut header = String::from("   ");
    for column in snapshot.columns {
        header.push_str(&fit_cell(column.title, column.width));
        header.push_str(COLUMN_GAP);
    }
    if let Some(countdown) = snapshot.countdown_header {
        header.push_str(&fit_cell(countdown, COUNTDOWN_WIDTH));
    }

    let items: Vec<ListItem> = if snapshot.rows.is_empty() {
        vec![ListItem::new(Line::styled("no rows", theme.help_style()))]
    } else {
        snapshot
            .rows
            .iter()
            .map(|row| {
                let mut spans = Vec::with_capacity(snapshot.columns.len() * 2 + 1);
                for (index, (column, cell)) in snapshot.columns.iter().zip(&row.cells).enumerate() {
                    // The status column is the only one coloured by value.
                    let style = if column.title == "status" {
                        theme.status_style(cell)
                    } else if index == 0 {
                        theme.help_style()
                    } else {
                        theme.text_style()
                    };
                    spans.push(Span::styled(fit_cell(cell, column.width), style));
                    spans.push(Span::raw(COLUMN_GAP));
                }
                if snapshot.countdown_header.is_some() {
                    spans.push(Span::styled(
                        fit_cell(&display_remaining(row.remaining), COUNTDOWN_WIDTH),
                        theme.countdown_style(row.remaining),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect()
    };

    let block = theme.block(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);
    frame.render_widget(
        Paragraph::new(Line::styled(header, theme.help_style())),
        sections[0],
    );
    let list = List::new(items)
        .highlight_style(theme.highlight_style())
        .highlight_symbol(">> ");
    frame.render_stateful_widget(list, sections[1], &mut app.list_state);
}

/// Smallest countdown still running on the page.
fn soonest_deadline(rows: &[RowView]) -> Option<u64> {
    rows.iter()
        .filter_map(|row| row.remaining)
        .filter(|remaining| *remaining > 0)
        .min()
}

fn draw_footer(
    frame: &mut ratatui::Frame,
    theme: &Theme,
    app: &AppState,
    area: ratatui::layout::Rect,
) {
    if app.input_mode == InputMode::FilterEdit {
        let line = Line::from(vec![
            Span::styled("filter> ", theme.accent_style()),
            Span::styled(app.input.clone(), theme.text_style()),
            Span::styled(
                format!("   fields: {}", app.filter_fields().join(" ")),
                theme.help_style(),
            ),
        ]);
        let footer =
            Paragraph::new(line).block(theme.block("Enter=apply  Esc=cancel  field=value"));
        frame.render_widget(footer, area);
        return;
    }

    let mut spans = Vec::new();
    if app.confirm_quit {
        spans.push(Span::styled("press q again to quit / Esc to cancel  ", theme.warn_style()));
    } else if let Some(notification) = app.latest_notification() {
        let style = match notification.level {
            NotificationLevel::Error => theme.error_style(),
            NotificationLevel::Info => theme.ok_style(),
        };
        spans.push(Span::styled(notification.text(), style));
        spans.push(Span::styled("  (Esc to dismiss)", theme.help_style()));
    } else {
        spans.push(Span::styled(help_text(app.tab_kind()), theme.help_style()));
    }
    let footer = Paragraph::new(Line::from(spans)).block(theme.block("Controls"));
    frame.render_widget(footer, area);
}

fn help_text(kind: TabKind) -> &'static str {
    match kind {
        TabKind::Deals => "Tab=view  j/k=select  n/p=page  /=filter  c=clear  r=refresh  P=auto-refresh  q=quit",
        TabKind::Disputes => "a=accept  x=reject  f=freeze  j/k=select  n/p=page  /=filter  c=clear  r=refresh  P=auto-refresh  q=quit",
        TabKind::Users => "t=toggle traffic  j/k=select  n/p=page  /=filter  c=clear  r=refresh  P=auto-refresh  q=quit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(remaining: Option<u64>) -> RowView {
        RowView {
            id: "o-1".to_string(),
            cells: Vec::new(),
            remaining,
            is_active: None,
        }
    }

    #[test]
    fn soonest_deadline_skips_expired_and_missing() {
        let rows = [row(None), row(Some(0)), row(Some(125_000)), row(Some(9_000))];
        assert_eq!(soonest_deadline(&rows), Some(9_000));
        assert_eq!(soonest_deadline(&[row(Some(0)), row(None)]), None);
    }
}
