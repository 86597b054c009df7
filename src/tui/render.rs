// Drawing for the reader: page raster as half-block cells, sample passage,
// analysis panel and overlays

use image::Rgba;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

use super::layout::{border_style, centered, inner, ScreenLayout, XrayColors};
use super::Reader;
use crate::analysis::{AnalysisResult, VisualizationType};
use crate::controller::{AreaState, DocumentState, SelectionMode, ToolState};
use crate::credentials::CredentialSource;
use crate::document::RasterSurface;
use crate::geometry::{Rect as CanvasRect, ScrollOffset};
use crate::sample::{SAMPLE_AUTHORS, SAMPLE_TITLE};
use crate::viz::gradient::{GradientHill, StepDirection};
use crate::viz::shape::{ShapeBreakdown, MATMUL_TIP};
use crate::viz::{VectorPlayground, VizState};

pub fn draw(frame: &mut Frame, reader: &Reader) {
    let area = frame.size();
    let layout = ScreenLayout::new(area, reader.session.state.sidebar_open);
    let buf = frame.buffer_mut();

    Block::default()
        .style(Style::default().bg(XrayColors::BACKGROUND))
        .render(area, buf);

    render_header(reader, layout.header, buf);
    render_document(reader, layout.document, buf);
    if let Some(panel) = layout.panel {
        render_panel(reader, panel, buf);
    }
    render_status_bar(reader, layout.status_bar, buf);

    if reader.session.state.show_api_menu {
        let masked = "*".repeat(reader.input.chars().count());
        render_prompt(area, buf, " API Key ", "Paste your Gemini API key:", &masked);
    } else if reader.open_prompt {
        render_prompt(area, buf, " Open PDF ", "Path to a PDF file:", &reader.input);
    }
    if reader.show_help {
        render_help(area, buf);
    }
}

fn render_header(reader: &Reader, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Paper X-Ray ")
        .border_style(border_style(true));
    let content = block.inner(area);
    block.render(area, buf);

    let viewer = &reader.session.viewer;
    let file = viewer
        .loaded()
        .map(|doc| doc.name.clone())
        .unwrap_or_else(|| "Example: Attention Is All You Need".to_string());

    let (api_label, api_color) = match reader.session.state.credentials.source() {
        CredentialSource::Saved => ("API: saved key", XrayColors::ACCENT_GREEN),
        CredentialSource::Environment => ("API: environment key", XrayColors::ACCENT_YELLOW),
        CredentialSource::Missing => ("API: not set (K)", XrayColors::ACCENT_RED),
    };

    let mode = match viewer.mode() {
        SelectionMode::Text => "Text select",
        SelectionMode::Area => "Area select",
    };

    let line = Line::from(vec![
        Span::styled(file, Style::default().fg(XrayColors::TEXT_PRIMARY)),
        Span::raw("  |  "),
        Span::styled(mode, Style::default().fg(XrayColors::ACCENT_BLUE)),
        Span::raw("  |  "),
        Span::styled(api_label, Style::default().fg(api_color)),
    ]);
    Paragraph::new(line).render(content, buf);
}

fn render_document(reader: &Reader, area: Rect, buf: &mut Buffer) {
    let viewer = &reader.session.viewer;
    let title = match viewer.loaded() {
        Some(doc) => format!(
            " Page {}/{}  {:.0}% ",
            doc.page,
            viewer.page_count().unwrap_or(doc.page),
            viewer.zoom() * 100.0
        ),
        None => format!(" {} - {} ", SAMPLE_TITLE, SAMPLE_AUTHORS),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style(true));
    let content = inner(area);
    block.render(area, buf);
    if content.width == 0 || content.height == 0 {
        return;
    }

    let scroll = viewer.scroll();
    match viewer.document() {
        DocumentState::Loaded(doc) => {
            draw_page(buf, content, &doc.surface, scroll, reader.cell);
            if let Some(rect) = viewer.page_highlight() {
                draw_outline(buf, content, rect, scroll, reader.cell, XrayColors::ACCENT_YELLOW);
            }
        }
        DocumentState::NoDocument => draw_sample(reader, buf, content),
    }

    if let ToolState::Area(AreaState::Dragging(drag)) = viewer.tool() {
        draw_outline(buf, content, drag.rect(), scroll, reader.cell, XrayColors::ACCENT_BLUE);
    }
}

fn to_color(pixel: Option<&Rgba<u8>>) -> Color {
    match pixel {
        Some(p) => Color::Rgb(p[0], p[1], p[2]),
        None => XrayColors::SURFACE,
    }
}

/// Two vertical samples per cell: `▀` with fg = upper half, bg = lower half
fn draw_page(
    buf: &mut Buffer,
    area: Rect,
    surface: &RasterSurface,
    scroll: ScrollOffset,
    (cw, ch): (f64, f64),
) {
    for row in 0..area.height {
        for col in 0..area.width {
            let x = scroll.x + col as f64 * cw + cw / 2.0;
            let y_top = scroll.y + row as f64 * ch + ch / 4.0;
            let y_bottom = scroll.y + row as f64 * ch + ch * 3.0 / 4.0;

            let top = surface.get_pixel_checked(x as u32, y_top as u32);
            let bottom = surface.get_pixel_checked(x as u32, y_bottom as u32);

            buf.get_mut(area.x + col, area.y + row)
                .set_char('▀')
                .set_fg(to_color(top))
                .set_bg(to_color(bottom));
        }
    }
}

/// Canvas rectangle outlined in cells, clipped to the pane
fn draw_outline(
    buf: &mut Buffer,
    area: Rect,
    rect: CanvasRect,
    scroll: ScrollOffset,
    (cw, ch): (f64, f64),
    color: Color,
) {
    let to_cell = |v: f64, offset: f64, size: f64| ((v - offset) / size).floor() as i64;
    let left = to_cell(rect.x, scroll.x, cw);
    let right = to_cell(rect.right(), scroll.x, cw);
    let top = to_cell(rect.y, scroll.y, ch);
    let bottom = to_cell(rect.bottom(), scroll.y, ch);

    let visible =
        |c: i64, r: i64| c >= 0 && r >= 0 && c < area.width as i64 && r < area.height as i64;

    for r in top..=bottom {
        for c in left..=right {
            if !visible(c, r) {
                continue;
            }
            let symbol = match (c == left || c == right, r == top || r == bottom) {
                (true, true) if c == left && r == top => '┌',
                (true, true) if c == right && r == top => '┐',
                (true, true) if c == left => '└',
                (true, true) => '┘',
                (true, false) => '│',
                (false, true) => '─',
                (false, false) => continue,
            };
            buf.get_mut(area.x + c as u16, area.y + r as u16)
                .set_char(symbol)
                .set_fg(color);
        }
    }
}

fn draw_sample(reader: &Reader, buf: &mut Buffer, area: Rect) {
    let viewer = &reader.session.viewer;
    let (cw, ch) = reader.cell;
    let first_line = (viewer.scroll().y / ch) as usize;
    let first_col = (viewer.scroll().x / cw) as usize;
    let highlight = viewer.sample_highlight();
    let lines = viewer.sample().lines();

    for row in 0..area.height {
        let index = first_line + row as usize;
        let Some(line) = lines.get(index) else {
            break;
        };
        let style = if index == 0 {
            Style::default()
                .fg(XrayColors::TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(XrayColors::TEXT_SECONDARY)
        };

        let span = highlight.and_then(|(a, b)| viewer.sample().highlight_span(index, a, b));
        for (col, symbol) in line
            .text
            .chars()
            .enumerate()
            .skip(first_col)
            .take(area.width as usize)
        {
            let x = (col - first_col) as u16;
            if x >= area.width {
                break;
            }
            let selected = span.map_or(false, |(from, to)| col >= from && col < to);
            let cell_style = if selected {
                style.bg(XrayColors::HIGHLIGHT)
            } else {
                style
            };
            buf.get_mut(area.x + x, area.y + row)
                .set_char(symbol)
                .set_style(cell_style);
        }
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(XrayColors::ACCENT_BLUE)
            .add_modifier(Modifier::BOLD),
    ))
}

fn muted(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(
        text.into(),
        Style::default().fg(XrayColors::TEXT_MUTED),
    ))
}

fn render_panel(reader: &Reader, area: Rect, buf: &mut Buffer) {
    let state = &reader.session.state;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" X-Ray Analysis ")
        .border_style(border_style(false));

    let mut lines: Vec<Line<'static>> = Vec::new();
    if state.is_loading() {
        lines.push(Line::from(Span::styled(
            "Analyzing selection...",
            Style::default().fg(XrayColors::ACCENT_YELLOW),
        )));
        lines.push(Line::raw(""));
    }

    match state.result() {
        Some(result) => {
            result_lines(&result, state.viz(), &mut lines);
        }
        None if !state.is_loading() => {
            lines.push(muted("Highlight text, or press 'a' and drag a box"));
            lines.push(muted("over an equation, to see it explained here."));
        }
        None => {}
    }

    Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn result_lines(result: &AnalysisResult, viz: Option<&VizState>, lines: &mut Vec<Line<'static>>) {
    lines.push(heading("Selected context"));
    lines.push(Line::styled(
        format!("\"{}\"", result.original_text),
        Style::default().fg(XrayColors::TEXT_SECONDARY),
    ));
    lines.push(Line::raw(""));

    lines.push(heading("Plain English"));
    lines.push(Line::styled(
        result.simplified_explanation.clone(),
        Style::default().fg(XrayColors::TEXT_PRIMARY),
    ));
    lines.push(Line::raw(""));

    if !result.symbols.is_empty() {
        lines.push(heading("Symbol decoder"));
        for symbol in &result.symbols {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{:<6}", symbol.symbol),
                    Style::default()
                        .fg(XrayColors::ACCENT_PURPLE)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("[{}] ", symbol.role.as_str()),
                    Style::default().fg(XrayColors::TEXT_MUTED),
                ),
                Span::styled(
                    symbol.definition.clone(),
                    Style::default().fg(XrayColors::TEXT_PRIMARY),
                ),
            ]));
            lines.push(muted(format!("      {}", symbol.plain_english)));
        }
        lines.push(Line::raw(""));
    }

    lines.push(heading("Geometric intuition"));
    match viz {
        Some(VizState::Vector(play)) => vector_lines(play, lines),
        Some(VizState::Gradient(hill)) => gradient_lines(hill, lines),
        Some(VizState::Shape) | None => shape_lines(result, lines),
    }
}

fn vector_lines(play: &VectorPlayground, lines: &mut Vec<Line<'static>>) {
    let (qx, qy) = play.query();
    lines.push(Line::raw(format!(
        "Query at {:.0}deg  ({:.1}, {:.1})",
        play.query_angle, qx, qy
    )));

    for score in play.scores() {
        let mut spans = vec![Span::styled(
            format!("{} {:>3.0}deg ", score.key.label, score.key.angle_deg),
            Style::default().fg(XrayColors::ACCENT_GREEN),
        )];
        if play.layers.dot {
            spans.push(Span::raw(format!(" dot {:>6.1}", score.dot)));
        }
        if play.layers.softmax {
            let bar = "█".repeat((score.weight * 20.0).round() as usize);
            spans.push(Span::raw(format!("  {:>5.1}% ", score.weight * 100.0)));
            spans.push(Span::styled(bar, Style::default().fg(XrayColors::ACCENT_BLUE)));
        }
        lines.push(Line::from(spans));
    }

    if play.layers.output {
        let (ox, oy) = play.output();
        lines.push(Line::styled(
            format!("Output (weighted values): ({:.2}, {:.2})", ox, oy),
            Style::default().fg(XrayColors::ACCENT_PURPLE),
        ));
    }
    lines.push(muted("[ ] rotate query   1 dot  2 softmax  3 output"));
}

const PLOT_WIDTH: usize = 41;
const PLOT_HEIGHT: usize = 9;

fn gradient_lines(hill: &GradientHill, lines: &mut Vec<Line<'static>>) {
    let mut grid = vec![vec![' '; PLOT_WIDTH]; PLOT_HEIGHT];
    let max_loss = GradientHill::loss_at(5.0);
    let last_col = (PLOT_WIDTH - 1) as f64;
    let to_col = |x: f64| (((x + 5.0) / 10.0) * last_col).round().clamp(0.0, last_col) as usize;
    let to_row = |loss: f64| {
        let frac = ((loss - 1.0) / (max_loss - 1.0)).clamp(0.0, 1.0);
        ((1.0 - frac) * (PLOT_HEIGHT - 1) as f64).round() as usize
    };

    for (x, loss) in GradientHill::curve() {
        grid[to_row(loss)][to_col(x)] = '·';
    }
    grid[to_row(hill.loss())][to_col(hill.position)] = '●';

    for row in grid {
        lines.push(Line::styled(
            row.into_iter().collect::<String>(),
            Style::default().fg(XrayColors::ACCENT_GREEN),
        ));
    }

    let direction = match hill.recommended_direction() {
        StepDirection::Left => "left",
        StepDirection::Right => "right",
    };
    lines.push(Line::raw(format!(
        "x = {:.3}   loss = {:.3}   gradient = {:.3}",
        hill.position,
        hill.loss(),
        hill.gradient()
    )));
    lines.push(Line::raw(format!(
        "Downhill is {} (opposite the gradient), lr = {}",
        direction, hill.learning_rate
    )));
    lines.push(muted("s take a step"));
}

fn shape_lines(result: &AnalysisResult, lines: &mut Vec<Line<'static>>) {
    let view = ShapeBreakdown::new(&result.dimensions, result.viz_type);
    if view.rows.is_empty() {
        lines.push(muted("No dimensional breakdown for this selection."));
    }

    for row in &view.rows {
        let (marker, color) = if row.step.is_input {
            ("input", XrayColors::ACCENT_BLUE)
        } else {
            ("derived", XrayColors::ACCENT_YELLOW)
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", row.badge),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} ", row.step.name),
                Style::default().fg(XrayColors::TEXT_PRIMARY),
            ),
            Span::styled(
                row.step.shape.clone(),
                Style::default().fg(XrayColors::ACCENT_PURPLE),
            ),
            Span::styled(format!("  {}", marker), Style::default().fg(XrayColors::TEXT_MUTED)),
        ]));
        if !row.step.description.is_empty() {
            lines.push(muted(format!("     {}", row.step.description)));
        }
    }

    if result.viz_type == VisualizationType::DimensionMismatch {
        lines.push(Line::raw(""));
        lines.push(muted(format!("Tip: {}", MATMUL_TIP)));
    }
    if let Some(note) = view.note {
        lines.push(Line::raw(""));
        lines.push(muted(note));
    }
}

fn render_status_bar(reader: &Reader, area: Rect, buf: &mut Buffer) {
    let viewer = &reader.session.viewer;
    let busy = match viewer.tool() {
        ToolState::Area(AreaState::Processing) => " [processing]",
        ToolState::Area(AreaState::Dragging(_)) => " [selecting]",
        _ => "",
    };
    let page = match (viewer.current_page(), viewer.page_count()) {
        (Some(page), Some(count)) => format!(" p.{}/{} ", page, count),
        _ => String::new(),
    };

    let line = Line::from(vec![
        Span::raw(format!(" {}{}", reader.session.state.status_message, busy)),
        Span::styled(page, Style::default().fg(XrayColors::TEXT_MUTED)),
        Span::styled(" ?: help ", Style::default().fg(XrayColors::TEXT_MUTED)),
    ]);
    Paragraph::new(line)
        .style(
            Style::default()
                .bg(XrayColors::SURFACE)
                .fg(XrayColors::TEXT_PRIMARY),
        )
        .render(area, buf);
}

fn render_prompt(area: Rect, buf: &mut Buffer, title: &str, label: &str, value: &str) {
    let popup = centered(area, 64, 6);
    Clear.render(popup, buf);

    let lines = vec![
        Line::raw(label.to_string()),
        Line::styled(
            format!("> {}_", value),
            Style::default().fg(XrayColors::ACCENT_GREEN),
        ),
        muted("Enter save   Esc cancel"),
    ];
    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(border_style(true)),
        )
        .style(Style::default().bg(XrayColors::SURFACE))
        .render(popup, buf);
}

const HELP_TEXT: &str = "\
 q            Quit
 o            Open a PDF
 t / a        Text / area selection
 Left Right   Previous / next page (also PgUp PgDn)
 + -          Zoom in / out
 Up Down j k  Scroll (h l sideways, mouse wheel)
 K            Set API key
 Tab          Show / hide analysis panel
 [ ]          Rotate the query vector
 1 2 3        Toggle dot / softmax / output
 s            Gradient descent step
 ?            Toggle this help

 Text mode: drag over text to explain it.
 Area mode: drag a box around an equation.";

fn render_help(area: Rect, buf: &mut Buffer) {
    let popup = centered(area, 56, 19);
    Clear.render(popup, buf);
    Paragraph::new(HELP_TEXT)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(border_style(true)),
        )
        .style(
            Style::default()
                .bg(XrayColors::SURFACE)
                .fg(XrayColors::TEXT_PRIMARY),
        )
        .render(popup, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_page_cells_sample_both_halves() {
        // top half red, bottom half blue, one 8x16 cell
        let surface = RgbaImage::from_fn(8, 16, |_, y| {
            if y < 8 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        draw_page(&mut buf, area, &surface, ScrollOffset::default(), (8.0, 16.0));

        let cell = buf.get(0, 0);
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
        // past the raster edge
        assert_eq!(buf.get(1, 0).fg, XrayColors::SURFACE);
    }

    #[test]
    fn test_outline_corners() {
        let area = Rect::new(0, 0, 10, 5);
        let mut buf = Buffer::empty(area);
        let rect = CanvasRect::new(8.0, 16.0, 24.0, 32.0);
        draw_outline(&mut buf, area, rect, ScrollOffset::default(), (8.0, 16.0), Color::Blue);

        assert_eq!(buf.get(1, 1).symbol(), "┌");
        assert_eq!(buf.get(4, 1).symbol(), "┐");
        assert_eq!(buf.get(1, 3).symbol(), "└");
        assert_eq!(buf.get(4, 3).symbol(), "┘");
        assert_eq!(buf.get(2, 1).symbol(), "─");
        assert_eq!(buf.get(1, 2).symbol(), "│");
        assert_eq!(buf.get(2, 2).symbol(), " ");
    }

    #[test]
    fn test_gradient_plot_marks_ball() {
        let mut lines = Vec::new();
        gradient_lines(&GradientHill::default(), &mut lines);
        let plot: String = lines[..PLOT_HEIGHT]
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect();
        assert_eq!(plot.matches('●').count(), 1);
    }
}
