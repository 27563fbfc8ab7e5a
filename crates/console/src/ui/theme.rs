use ratatui::style::{Color, Modifier, Style};
use std::borrow::Cow;
use sync_engine::Urgency;

pub(crate) struct Theme {
    border: Color,
    title: Color,
    text: Color,
    dim: Color,
    accent: Color,
    highlight_fg: Color,
    highlight_bg: Color,
    warn: Color,
    ok: Color,
    error: Color,
}

impl Theme {
    pub(crate) fn dark() -> Self {
        Self {
            border: Color::DarkGray,
            title: Color::Blue,
            text: Color::White,
            dim: Color::Gray,
            accent: Color::Cyan,
            highlight_fg: Color::White,
            highlight_bg: Color::DarkGray,
            warn: Color::Yellow,
            ok: Color::Green,
            error: Color::Red,
        }
    }

    pub(crate) fn block<'a>(&self, title: impl Into<Cow<'a, str>>) -> ratatui::widgets::Block<'a> {
        ratatui::widgets::Block::default()
            .title(ratatui::text::Span::styled(
                title,
                Style::default()
                    .fg(self.title)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(ratatui::widgets::Borders::ALL)
            .border_style(Style::default().fg(self.border))
    }

    pub(crate) fn highlight_style(&self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub(crate) fn help_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub(crate) fn accent_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub(crate) fn warn_style(&self) -> Style {
        Style::default().fg(self.warn).add_modifier(Modifier::BOLD)
    }

    pub(crate) fn error_style(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }

    pub(crate) fn ok_style(&self) -> Style {
        Style::default().fg(self.ok)
    }

    pub(crate) fn tab_style(&self, active: bool) -> Style {
        if active {
            self.accent_style().add_modifier(Modifier::UNDERLINED)
        } else {
            self.help_style()
        }
    }

    /// Countdown cell colour; `None` means the row has no deadline.
    pub(crate) fn countdown_style(&self, remaining: Option<u64>) -> Style {
        match remaining {
            None => Style::default().fg(self.dim),
            Some(0) => Style::default()
                .fg(self.dim)
                .add_modifier(Modifier::CROSSED_OUT),
            Some(ms) => match Urgency::from_remaining(ms) {
                Urgency::Critical => self.error_style(),
                Urgency::Warning => self.warn_style(),
                Urgency::Normal => self.ok_style(),
            },
        }
    }

    pub(crate) fn status_style(&self, status: &str) -> Style {
        match status {
            "COMPLETED" | "ACCEPTED" => Style::default()
                .fg(self.ok)
                .add_modifier(Modifier::BOLD),
            "DISPUTE" | "FROZEN" => Style::default()
                .fg(self.warn)
                .add_modifier(Modifier::BOLD),
            "CANCELED" | "EXPIRED" | "REJECTED" => Style::default().fg(self.dim),
            "PENDING" | "IN_PROGRESS" | "PAID" => Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD),
            _ => Style::default().fg(self.text),
        }
    }
}
