use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use crate::model::UIData;

pub const PANEL_TITLE_HEIGHT: u16 = 1;
pub const TABLE_HEADER_HEIGHT: u16 = 1;
pub const FOOTER_HEIGHT: u16 = 1;
pub const CMDLINE_HEIGHT: u16 = 1;
pub const SCROLLBAR_WIDTH: u16 = 1;
pub const PANEL_HANDLE_WIDTH: u16 = 1;
pub const MIN_COLUMN_CELLS: u16 = 3;

// Width and gesture arithmetic runs in the original pixel units, one
// terminal cell counts as this many pixels.
pub const CELL_PX: i32 = 10;

pub struct EditorUI;

impl EditorUI {
    pub fn new() -> Self {
        EditorUI
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let area = frame.area();
        if area.width == 0 || area.height == 0 {
            return;
        }
        self.draw_workspace(uidata, frame, area);
        if uidata.panel_open {
            self.draw_panel(uidata, frame);
        }
        if uidata.show_popup {
            self.draw_popup(uidata, frame, area);
        }
    }

    // The area left of the panel, or the whole screen while the panel is
    // closed.
    fn draw_workspace(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let width = if uidata.panel_open {
            uidata.layout.panel_x
        } else {
            area.width
        };
        if width == 0 {
            return;
        }
        let main = Rect {
            x: 0,
            y: 0,
            width,
            height: area.height,
        };

        let title = Line::from(" ced ".bold());
        let instructions = Line::from(vec![
            " Preview ".into(),
            "<p>".blue().bold(),
            " Open ".into(),
            "<o>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);

        let summary = if uidata.file_name.is_empty() {
            Text::from("No file loaded")
        } else {
            Text::from(vec![
                Line::from(vec!["file: ".into(), uidata.file_name.clone().yellow()]),
                Line::from(format!(
                    "{} rows x {} columns",
                    uidata.total_rows, uidata.total_columns
                )),
            ])
        };
        frame.render_widget(Paragraph::new(summary).centered().block(block), main);
    }

    fn draw_panel(&self, uidata: &UIData, frame: &mut Frame) {
        let layout = &uidata.layout;
        if layout.panel_width == 0 || layout.height == 0 {
            return;
        }
        let panel = Rect {
            x: layout.panel_x,
            y: 0,
            width: layout.width.saturating_sub(layout.panel_x),
            height: layout.height,
        };
        frame.render_widget(Clear, panel);

        // Drag handle on the left edge of the panel.
        let handle_lines = vec![Line::from("┃"); layout.height as usize];
        frame.render_widget(
            Paragraph::new(Text::from(handle_lines)).style(Style::new().fg(Color::DarkGray)),
            Rect {
                x: layout.handle_x,
                y: 0,
                width: PANEL_HANDLE_WIDTH,
                height: layout.height,
            },
        );

        self.draw_title(uidata, frame);
        self.draw_grid(uidata, frame);
        self.draw_footer(uidata, frame);
        self.draw_statusline(uidata, frame);
        self.draw_scrollbar(uidata, frame);
    }

    fn draw_title(&self, uidata: &UIData, frame: &mut Frame) {
        let layout = &uidata.layout;
        let dirty = if uidata.dirty { " *" } else { "" };
        let position = if uidata.total_rows > 0 {
            format!("  row {}/{}", uidata.abs_selected_row + 1, uidata.total_rows)
        } else {
            String::new()
        };
        let title = format!(
            " {}{}  {} rows x {} cols{}  [{}%]",
            uidata.file_name,
            dirty,
            uidata.total_rows,
            uidata.total_columns,
            position,
            uidata.panel_percent
        );
        frame.render_widget(
            Paragraph::new(title).style(Style::new().add_modifier(Modifier::BOLD)),
            Rect {
                x: layout.index_x,
                y: layout.title_y,
                width: layout.width.saturating_sub(layout.index_x),
                height: PANEL_TITLE_HEIGHT,
            },
        );
    }

    fn draw_grid(&self, uidata: &UIData, frame: &mut Frame) {
        let layout = &uidata.layout;

        if uidata.show_index {
            let index_lines: Vec<Line> = uidata
                .index
                .data
                .iter()
                .map(|n| Line::from(n.clone()))
                .collect();
            frame.render_widget(
                Paragraph::new(Text::from(index_lines)).style(Style::new().fg(Color::DarkGray)),
                Rect {
                    x: layout.index_x,
                    y: layout.table_y,
                    width: layout.index_width,
                    height: layout.table_height,
                },
            );
        }

        for (vidx, (view, span)) in uidata
            .columns
            .iter()
            .zip(uidata.column_spans.iter())
            .enumerate()
        {
            let width = span.x1.saturating_sub(span.x0);
            if width == 0 {
                continue;
            }

            let mut header_style = Style::new().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            if uidata.resizing_column.as_deref() == Some(span.name.as_str()) {
                header_style = header_style.fg(Color::Yellow);
            } else if vidx == uidata.selected_column {
                header_style = header_style.fg(Color::Cyan);
            }
            frame.render_widget(
                Paragraph::new(view.name.clone()).style(header_style),
                Rect {
                    x: span.x0,
                    y: layout.header_y,
                    width,
                    height: TABLE_HEADER_HEIGHT,
                },
            );

            let lines: Vec<Line> = view
                .data
                .iter()
                .enumerate()
                .map(|(ridx, value)| {
                    let selected_row = ridx == uidata.selected_row;
                    let style = if selected_row && vidx == uidata.selected_column {
                        Style::new().add_modifier(Modifier::REVERSED)
                    } else if selected_row {
                        Style::new().bg(Color::DarkGray)
                    } else {
                        Style::new()
                    };
                    Line::styled(value.clone(), style)
                })
                .collect();
            frame.render_widget(
                Paragraph::new(Text::from(lines)),
                Rect {
                    x: span.x0,
                    y: layout.table_y,
                    width,
                    height: layout.table_height,
                },
            );
        }
    }

    fn draw_footer(&self, uidata: &UIData, frame: &mut Frame) {
        let layout = &uidata.layout;
        let note = if uidata.truncated {
            format!(
                "Showing first {} rows of {} total rows",
                uidata.rendered_rows, uidata.total_rows
            )
        } else if uidata.total_rows == 0 {
            "empty table".to_string()
        } else {
            String::new()
        };
        frame.render_widget(
            Paragraph::new(note).style(Style::new().fg(Color::DarkGray)),
            Rect {
                x: layout.index_x,
                y: layout.footer_y,
                width: layout.width.saturating_sub(layout.index_x),
                height: FOOTER_HEIGHT,
            },
        );
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame) {
        let layout = &uidata.layout;
        let line = match &uidata.edit {
            Some(edit) => {
                let mut spans: Vec<Span> = vec![Span::styled(
                    format!("{}: ", edit.label),
                    Style::new().add_modifier(Modifier::BOLD),
                )];
                spans.extend(Self::input_with_cursor(&edit.input, edit.cursor));
                Line::from(spans)
            }
            None => Line::styled(
                uidata.status_message.clone(),
                Style::new().fg(Color::DarkGray),
            ),
        };
        frame.render_widget(
            Paragraph::new(line),
            Rect {
                x: layout.index_x,
                y: layout.statusline_y,
                width: layout.width.saturating_sub(layout.index_x),
                height: CMDLINE_HEIGHT,
            },
        );
    }

    // The input text with the char under the cursor rendered reversed.
    fn input_with_cursor(input: &str, cursor: usize) -> Vec<Span<'static>> {
        let reversed = Style::new().add_modifier(Modifier::REVERSED);
        match input.char_indices().nth(cursor) {
            Some((byte, chr)) => {
                let after = byte + chr.len_utf8();
                vec![
                    Span::raw(input[..byte].to_string()),
                    Span::styled(chr.to_string(), reversed),
                    Span::raw(input[after..].to_string()),
                ]
            }
            None => vec![
                Span::raw(input.to_string()),
                Span::styled(" ".to_string(), reversed),
            ],
        }
    }

    fn draw_scrollbar(&self, uidata: &UIData, frame: &mut Frame) {
        let layout = &uidata.layout;
        if uidata.rendered_rows <= layout.table_height as usize {
            return;
        }
        let mut state = ScrollbarState::new(uidata.rendered_rows).position(uidata.offset_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            Rect {
                x: layout.scrollbar_x,
                y: layout.table_y,
                width: SCROLLBAR_WIDTH,
                height: layout.table_height,
            },
            &mut state,
        );
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let popup = Self::centered(area, 46, 24);
        frame.render_widget(Clear, popup);
        let block = Block::bordered()
            .title(Line::from(" help ".bold()).centered())
            .border_set(border::THICK);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.clone()).block(block),
            popup,
        );
    }

    fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width);
        let height = height.min(area.height);
        Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        }
    }
}
