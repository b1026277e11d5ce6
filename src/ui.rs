use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Clear, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::highlight::Segment;
use crate::model::{Model, Status, UIData};
use crate::presenter::CellTreatment;
use crate::sort::SortDirection;

pub const TITLE_HEIGHT: u16 = 1;
pub const SEARCH_HEIGHT: u16 = 1;
pub const TABLE_HEADER_HEIGHT: u16 = 1;
pub const PAGER_HEIGHT: u16 = 1;
pub const LOG_PANEL_HEIGHT: u16 = 8;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const COLUMN_SPACING: u16 = 1;
pub const COLUMN_RESIZE_STEP: i32 = 2;

const ELLIPSIS: &str = "…";
const SEARCH_PROMPT: &str = "Search: ";
const STATUS_HINT: &str = " ? help  q quit ";

fn char_width(c: char) -> usize {
    if c.is_control() { 1 } else { c.width().unwrap_or(0) }
}

// Control characters would break the cell grid
fn flatten(c: char) -> char {
    if c.is_control() { ' ' } else { c }
}

fn segment_style(segment: &Segment, match_style: Style) -> Style {
    if segment.is_match { match_style } else { Style::default() }
}

/// Fits the segments into a single line of `width` cells, ending in an ellipsis when cut.
pub fn truncate_segments(segments: &[Segment], width: u16, match_style: Style) -> Line<'static> {
    let width = usize::from(width);
    let total: usize = segments
        .iter()
        .flat_map(|s| s.text.chars())
        .map(char_width)
        .sum();
    let cut = total > width;
    let budget = if cut { width.saturating_sub(1) } else { width };

    let mut spans = Vec::new();
    let mut used = 0;
    for segment in segments {
        let mut text = String::new();
        let mut full = false;
        for c in segment.text.chars() {
            let w = char_width(c);
            if used + w > budget {
                full = true;
                break;
            }
            text.push(flatten(c));
            used += w;
        }
        if !text.is_empty() {
            spans.push(Span::styled(text, segment_style(segment, match_style)));
        }
        if full {
            break;
        }
    }
    if cut && width > 0 {
        spans.push(Span::raw(ELLIPSIS));
    }
    Line::from(spans)
}

/// Hard wraps the segments at `width` cells. Newlines in the text start a new line.
pub fn wrap_segments(segments: &[Segment], width: u16, match_style: Style) -> Vec<Line<'static>> {
    let width = usize::from(width.max(1));
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for segment in segments {
        let style = segment_style(segment, match_style);
        let mut text = String::new();
        for c in segment.text.chars() {
            if c == '\n' {
                if !text.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut text), style));
                }
                lines.push(Line::from(std::mem::take(&mut spans)));
                used = 0;
                continue;
            }
            let c = flatten(c);
            let w = char_width(c);
            if used + w > width && used > 0 {
                if !text.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut text), style));
                }
                lines.push(Line::from(std::mem::take(&mut spans)));
                used = 0;
            }
            text.push(c);
            used += w;
        }
        if !text.is_empty() {
            spans.push(Span::styled(text, style));
        }
    }
    lines.push(Line::from(spans));
    lines
}

/// Width an expanded cell takes: its longest line, at least `column_width`, at most `available`.
pub fn expanded_width(segments: &[Segment], column_width: u16, available: u16) -> u16 {
    let mut longest = 0;
    let mut current = 0;
    for c in segments.iter().flat_map(|s| s.text.chars()) {
        if c == '\n' {
            current = 0;
            continue;
        }
        current += char_width(c);
        longest = longest.max(current);
    }
    let longest = u16::try_from(longest).unwrap_or(u16::MAX);
    longest.max(column_width).min(available).max(1)
}

/// Number of lines an expanded cell needs at `width`.
pub fn wrapped_height(segments: &[Segment], width: u16) -> usize {
    wrap_segments(segments, width, Style::default()).len()
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    area
}

pub struct TableUI {
    header_style: Style,
    match_style: Style,
    selected_row_style: Style,
    selected_cell_style: Style,
    dim_style: Style,
}

impl Default for TableUI {
    fn default() -> Self {
        Self::new()
    }
}

impl TableUI {
    pub fn new() -> Self {
        Self {
            header_style: Style::new()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::UNDERLINED),
            match_style: Style::new().fg(Color::Black).bg(Color::Yellow),
            selected_row_style: Style::new().bg(Color::DarkGray),
            selected_cell_style: Style::new().add_modifier(Modifier::REVERSED),
            dim_style: Style::new().fg(Color::DarkGray),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        if uidata.status == Status::CONNECTING {
            self.draw_connecting(uidata, frame);
            return;
        }

        let layout = uidata.layout;
        if !uidata.fullscreen {
            self.draw_title(uidata, frame, layout.title);
            self.draw_logs(uidata, frame, layout.logs);
        }
        self.draw_search(uidata, frame, layout.search);
        self.draw_table(uidata, frame, layout.table);
        self.draw_pager(uidata, frame, layout.pager);
        self.draw_statusline(uidata, frame, layout.statusline);

        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_connecting(&self, uidata: &UIData, frame: &mut Frame) {
        let mut lines = vec![
            Line::from("Loading...".bold()),
            Line::from(format!("Waiting for backend at {}", uidata.name)),
            Line::default(),
        ];
        let shown = uidata.logs.len().saturating_sub(5);
        lines.extend(
            uidata.logs[shown..]
                .iter()
                .map(|l| Line::styled(l.clone(), self.dim_style)),
        );
        let area = popup_area(frame.area(), frame.area().width, lines.len() as u16);
        frame.render_widget(Paragraph::new(lines).centered(), area);
    }

    fn draw_title(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let title = Line::from(vec![
            " rsv ".bold(),
            " keyword search on ".into(),
            uidata.name.clone().yellow(),
        ]);
        frame.render_widget(Paragraph::new(title), area);
    }

    fn draw_search(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if let Some(input) = &uidata.search_input {
            let line = Line::from(vec![SEARCH_PROMPT.bold(), input.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);

            let before: String = input.input.chars().take(input.cursor_pos).collect();
            let x = area.x as usize + SEARCH_PROMPT.len() + before.width();
            frame.set_cursor_position((
                (x as u16).min(area.right().saturating_sub(1)),
                area.y,
            ));
            return;
        }

        let keyword = &uidata.render.keyword;
        let mut spans = vec!["Keyword: ".bold()];
        if keyword.is_empty() {
            spans.push(Span::styled("(none)", self.dim_style));
        } else {
            spans.push(Span::styled(keyword.clone(), self.match_style));
        }
        if uidata.searching {
            spans.push("  searching...".italic());
        }
        spans.push(Span::styled("  press / to search", self.dim_style));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let render = &uidata.render;
        if render.headers.is_empty() {
            let message = if render.keyword.is_empty() {
                "No results yet.".to_string()
            } else {
                format!("No rows match \"{}\".", render.keyword)
            };
            let area = popup_area(area, area.width, 1);
            frame.render_widget(Paragraph::new(message.italic()).centered(), area);
            return;
        }

        let geometry = &uidata.geometry;
        for span in geometry.columns.iter() {
            let header = &render.headers[span.column];
            let arrow = match header.sort {
                Some(SortDirection::Ascending) => " ▲",
                Some(SortDirection::Descending) => " ▼",
                None => "",
            };
            let label = [Segment {
                text: format!("{}{arrow}", header.key),
                is_match: false,
            }];
            let line = truncate_segments(&label, span.width, self.match_style);
            let rect = Rect::new(span.x, geometry.header_y, span.width, TABLE_HEADER_HEIGHT);
            frame.render_widget(Paragraph::new(line).style(self.header_style), rect);
        }

        for row_span in geometry.rows.iter() {
            let row = &render.rows[row_span.row];
            let selected_row = row_span.row == uidata.selected_row;
            let cell_style = |column: usize| {
                if selected_row && column == uidata.selected_column {
                    self.selected_cell_style
                } else if selected_row {
                    self.selected_row_style
                } else {
                    Style::default()
                }
            };

            for span in geometry.columns.iter() {
                let Some(cell) = row.cells.get(span.column) else {
                    continue;
                };
                if cell.treatment == CellTreatment::Expanded {
                    continue;
                }
                let line = truncate_segments(&cell.segments, span.width, self.match_style);
                let rect = Rect::new(span.x, row_span.y, span.width, row_span.height);
                frame.render_widget(Paragraph::new(line).style(cell_style(span.column)), rect);
            }

            // Drawn last so it covers the columns it reaches over
            if let Some(span) = row_span.expanded
                && let Some(cell) = row.cells.get(span.column)
            {
                let lines = wrap_segments(&cell.segments, span.width, self.match_style);
                let rect = Rect::new(span.x, row_span.y, span.width, row_span.height);
                frame.render_widget(Clear, rect);
                frame.render_widget(
                    Paragraph::new(Text::from(lines)).style(cell_style(span.column)),
                    rect,
                );
            }
        }
    }

    fn draw_pager(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let render = &uidata.render;
        if render.page_count == 0 {
            return;
        }
        let enabled = |on: bool| if on { Style::default().bold() } else { self.dim_style };
        let line = Line::from(vec![
            Span::styled("◀ p", enabled(render.has_prev)),
            format!(
                "  Page {}/{}  ",
                render.page_index + 1,
                render.page_count
            )
            .into(),
            Span::styled("n ▶", enabled(render.has_next)),
            Span::styled(format!("   {} rows", render.total_rows), self.dim_style),
        ]);
        frame.render_widget(Paragraph::new(line).centered(), area);
    }

    fn draw_logs(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if area.height == 0 {
            return;
        }
        let block = Block::bordered().title(" Activity ");
        let visible = block.inner(area).height as usize;
        let shown = uidata.logs.len().saturating_sub(visible);
        let lines: Vec<Line> = uidata.logs[shown..]
            .iter()
            .map(|l| Line::from(l.clone()))
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [message, hint] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(STATUS_HINT.width() as u16),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(uidata.status_message.clone()), message);
        frame.render_widget(Paragraph::new(STATUS_HINT.reversed()), hint);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let text = Text::from(uidata.popup_message.clone());
        let width = (text.width() as u16).saturating_add(4);
        let height = (text.height() as u16).saturating_add(2);
        let area = popup_area(frame.area(), width, height);
        let block = Block::bordered().title(" Help ".bold());
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(text).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, is_match: bool) -> Segment {
        Segment {
            text: text.to_string(),
            is_match,
        }
    }

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn short_text_is_not_truncated() {
        let line = truncate_segments(&[seg("Hello", false)], 5, Style::default());
        assert_eq!(plain(&line), "Hello");
    }

    #[test]
    fn long_text_gets_ellipsis() {
        let line = truncate_segments(&[seg("Hello world", false)], 5, Style::default());
        assert_eq!(plain(&line), "Hell…");
        assert_eq!(line.width(), 5);
    }

    #[test]
    fn truncation_counts_terminal_cells() {
        let line = truncate_segments(&[seg("日本語", false)], 5, Style::default());
        assert_eq!(plain(&line), "日本…");
    }

    #[test]
    fn truncation_keeps_match_style() {
        let style = Style::new().bg(Color::Yellow);
        let line = truncate_segments(&[seg("An", true), seg("na", false)], 3, style);
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.spans[0].content, "An");
        assert_eq!(line.spans[0].style, style);
        assert_eq!(line.spans[1].content, ELLIPSIS);
    }

    #[test]
    fn newlines_are_flattened_in_truncated_cells() {
        let line = truncate_segments(&[seg("a\nb", false)], 10, Style::default());
        assert_eq!(plain(&line), "a b");
    }

    #[test]
    fn wrap_breaks_at_width() {
        let lines = wrap_segments(&[seg("abc", false), seg("defg", true)], 3, Style::default());
        let texts: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(texts, vec!["abc", "def", "g"]);
        assert_eq!(wrapped_height(&[seg("abcdefg", false)], 3), 3);
    }

    #[test]
    fn wrap_honours_newlines() {
        let lines = wrap_segments(&[seg("ab\ncd", false)], 10, Style::default());
        let texts: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(texts, vec!["ab", "cd"]);
    }

    #[test]
    fn expanded_width_grows_to_the_text() {
        let text = [seg("a value that is longer than its column", false)];
        assert_eq!(expanded_width(&text, 14, 60), 38);
        assert_eq!(expanded_width(&text, 14, 20), 20);
        assert_eq!(expanded_width(&[seg("ab", false)], 14, 60), 14);
        assert_eq!(expanded_width(&[seg("abc\nabcdefgh", false)], 4, 60), 8);
    }

    #[test]
    fn empty_cell_is_one_line() {
        assert_eq!(wrapped_height(&[], 10), 1);
        assert_eq!(wrapped_height(&[seg("", false)], 10), 1);
    }
}
