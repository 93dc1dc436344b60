use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::widgets::theme::Theme;

/// One key binding in the footer.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub keys: &'static str,
    pub short: &'static str,
}

const fn entry(keys: &'static str, short: &'static str) -> Entry {
    Entry { keys, short }
}

pub const BROWSE: &[Entry] = &[
    entry("/", "tìm"),
    entry("f/F", "lọc/loại trừ"),
    entry("d/D", "bỏ điều kiện"),
    entry("o", "AND/OR"),
    entry("⏎", "tìm kiếm"),
    entry("c", "xoá"),
    entry("n/p", "trang"),
    entry("+/-", "số dòng"),
    entry("h/l s", "sắp xếp"),
    entry("t", "cột"),
    entry("v", "chọn dòng"),
    entry("b [ ]", "xuất lô"),
    entry("g", "thống kê"),
    entry("i", "gợi ý AI"),
    entry("q", "thoát"),
];

pub const SELECT: &[Entry] = &[
    entry("␣", "chọn"),
    entry("a/A", "chọn/bỏ cả trang"),
    entry("C", "bỏ chọn hết"),
    entry("x", "xuất đã chọn"),
    entry("v", "thoát chế độ chọn"),
    entry("n/p", "trang"),
    entry("q", "thoát"),
];

pub const PROMPT: &[Entry] = &[entry("⏎", "xác nhận"), entry("Esc", "huỷ")];

fn spans<'a>(entries: &'a [Entry], theme: &Theme) -> Vec<Span<'a>> {
    let mut spans: Vec<Span> = entries
        .iter()
        .flat_map(|entry| {
            [
                Span::styled(format!("[{}]", entry.keys), Style::default().bold()),
                Span::raw(" "),
                Span::raw(entry.short),
                Span::styled(" • ", Style::default().fg(theme.text_muted())),
            ]
        })
        .collect();
    spans.pop();
    spans
}

/// Rows the footer needs at this width.
pub fn height(entries: &[Entry], area: Rect, theme: &Theme) -> u16 {
    let total: usize = spans(entries, theme).iter().map(|s| s.content.width()).sum();
    let available = usize::from(area.width.max(1));
    u16::try_from(total.div_ceil(available)).unwrap_or(u16::MAX)
}

pub fn render(entries: &[Entry], frame: &mut Frame, area: Rect, theme: &Theme) {
    let footer = Paragraph::new(Line::from(spans(entries, theme)))
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.text()))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_wraps_on_narrow_terminals() {
        let theme = Theme::dark();
        let wide = Rect::new(0, 0, 400, 1);
        let narrow = Rect::new(0, 0, 40, 1);
        assert_eq!(height(PROMPT, wide, &theme), 1);
        assert!(height(BROWSE, narrow, &theme) > 1);
    }
}
