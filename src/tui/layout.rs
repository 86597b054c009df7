// Reader layout: header, document pane, analysis panel, status bar

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
};

/// Dark reader palette
pub struct XrayColors;

impl XrayColors {
    pub const BACKGROUND: Color = Color::Rgb(16, 16, 16);
    pub const SURFACE: Color = Color::Rgb(32, 32, 32);
    pub const BORDER: Color = Color::Rgb(64, 64, 64);
    pub const BORDER_FOCUSED: Color = Color::Rgb(58, 128, 200);
    pub const TEXT_PRIMARY: Color = Color::Rgb(240, 240, 240);
    pub const TEXT_SECONDARY: Color = Color::Rgb(180, 180, 180);
    pub const TEXT_MUTED: Color = Color::Rgb(120, 120, 120);
    pub const ACCENT_BLUE: Color = Color::Rgb(58, 128, 200);
    pub const ACCENT_GREEN: Color = Color::Rgb(120, 180, 120);
    pub const ACCENT_YELLOW: Color = Color::Rgb(200, 160, 58);
    pub const ACCENT_RED: Color = Color::Rgb(200, 80, 80);
    pub const ACCENT_PURPLE: Color = Color::Rgb(147, 51, 234);
    pub const HIGHLIGHT: Color = Color::Rgb(58, 80, 120);
}

#[derive(Debug, Clone, Copy)]
pub struct ScreenLayout {
    pub header: Rect,
    pub document: Rect,
    pub panel: Option<Rect>,
    pub status_bar: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect, panel_open: bool) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Document + panel
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        let (document, panel) = if panel_open {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(rows[1]);
            (columns[0], Some(columns[1]))
        } else {
            (rows[1], None)
        };

        Self {
            header: rows[0],
            document,
            panel,
            status_bar: rows[2],
        }
    }

    /// Inside of the document pane's border
    pub fn document_inner(&self) -> Rect {
        inner(self.document)
    }
}

pub fn inner(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(XrayColors::BORDER_FOCUSED)
    } else {
        Style::default().fg(XrayColors::BORDER)
    }
}

/// Rectangle of `width` x `height` centred in `area`, clipped to it
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
