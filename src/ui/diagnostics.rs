/// Diagnostics panel: the tail of the diagnostic log plus export/clear

use iced::widget::{button, column, row, scrollable, text, Column};
use iced::{Element, Length};

use crate::state::logs::LogStore;
use crate::Message;

/// Entries shown in the panel, newest last
const VISIBLE_ENTRIES: usize = 50;

pub fn view(logs: &LogStore) -> Element<'static, Message> {
    if logs.is_empty() {
        return column![
            row![
                text("Diagnostics").size(20),
                button("Export Logs").on_press(Message::ExportLogs),
            ]
            .spacing(12),
            text("No diagnostic entries"),
        ]
        .spacing(8)
        .into();
    }

    let entries = logs.logs();
    let start = entries.len().saturating_sub(VISIBLE_ENTRIES);
    let lines = entries[start..]
        .iter()
        .map(|entry| -> Element<'static, Message> { text(entry.console_line()).size(12).into() });

    column![
        row![
            text(format!("Diagnostics ({} entries)", logs.len())).size(20),
            button("Export Logs").on_press(Message::ExportLogs),
            button("Clear Logs").on_press(Message::ClearLogs),
        ]
        .spacing(12),
        scrollable(Column::with_children(lines).spacing(2)).height(Length::Fixed(160.0)),
    ]
    .spacing(8)
    .into()
}
