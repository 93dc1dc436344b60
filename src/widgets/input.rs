use crossterm::event::{Event, KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Position, Rect},
    style::Style,
    widgets::{Block, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::widgets::theme::Theme;

/// Single-line text field. The cursor counts characters, not bytes, so
/// Vietnamese input edits correctly.
#[derive(Default)]
pub struct Input {
    input: String,
    character_index: usize,
    is_active: bool,
}

impl Input {
    pub fn value(&self) -> &str {
        &self.input
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = value.to_string();
        self.character_index = self.input.chars().count();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.character_index = 0;
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.character_index)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str, theme: &Theme) {
        let border = if self.is_active() {
            theme.accent()
        } else {
            theme.border()
        };
        let block = Block::bordered()
            .title(title)
            .style(Style::default().bg(theme.header_bg()).fg(theme.text()))
            .border_style(Style::default().fg(border));
        Paragraph::new(self.input.as_str())
            .style(Style::default().fg(theme.text()))
            .block(block)
            .render(area, frame.buffer_mut());

        if self.is_active() {
            let before = &self.input[..self.byte_index()];
            frame.set_cursor_position(Position::new(
                area.x + before.width() as u16 + 1,
                area.y + 1,
            ));
        }
    }

    /// Returns true when the key edited the text or moved the cursor.
    pub fn handle_event(&mut self, evt: &Event) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(key) = evt.as_key_press_event() else {
            return false;
        };
        match key.code {
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.character_index = 0;
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.character_index = self.len();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
            }
            KeyCode::Char(c) => {
                let idx = self.byte_index();
                self.input.insert(idx, c);
                self.character_index += 1;
            }
            KeyCode::Backspace => {
                if self.character_index > 0 {
                    self.character_index -= 1;
                    let idx = self.byte_index();
                    self.input.remove(idx);
                }
            }
            KeyCode::Delete => {
                if self.character_index < self.len() {
                    let idx = self.byte_index();
                    self.input.remove(idx);
                }
            }
            KeyCode::Left => {
                self.character_index = self.character_index.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.character_index < self.len() {
                    self.character_index += 1;
                }
            }
            KeyCode::Home => self.character_index = 0,
            KeyCode::End => self.character_index = self.len(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEvent, KeyEventKind, KeyEventState};

    use super::*;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn edits_multibyte_text() {
        let mut input = Input::default();
        input.set_active(true);
        for c in "thuốc".chars() {
            assert!(input.handle_event(&press(KeyCode::Char(c))));
        }
        input.handle_event(&press(KeyCode::Left));
        input.handle_event(&press(KeyCode::Backspace));
        assert_eq!(input.value(), "thuc");
        input.handle_event(&press(KeyCode::Home));
        input.handle_event(&press(KeyCode::Delete));
        assert_eq!(input.value(), "huc");
    }

    #[test]
    fn inactive_input_ignores_keys() {
        let mut input = Input::default();
        assert!(!input.handle_event(&press(KeyCode::Char('x'))));
        assert_eq!(input.value(), "");
    }

    #[test]
    fn renders_on_header_background_with_cursor_after_text() {
        let mut input = Input::default();
        input.set_value("para");
        input.set_active(true);
        let theme = Theme::dark();
        let backend = ratatui::backend::TestBackend::new(20, 3);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| input.render(frame, frame.area(), "Tìm kiếm", &theme))
            .unwrap();

        let buffer = terminal.backend().buffer().clone();
        let line: String = (0..20).map(|x| buffer[(x, 1)].symbol()).collect();
        assert!(line.contains("para"), "{line:?}");
        assert_eq!(buffer[(0, 0)].bg, theme.header_bg());
        assert_eq!(terminal.get_cursor_position().unwrap(), Position::new(5, 1));
    }
}
