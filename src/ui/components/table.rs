use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Row, Table},
};

/// Header label and fixed width of one dashboard table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub label: &'static str,
    pub width: u16,
}

pub const fn column(label: &'static str, width: u16) -> Column {
    Column { label, width }
}

/// Bordered table with a yellow header taken from `columns`.
///
/// `selected` indexes into `rows` as passed, after any scrolling the caller applied; that row is
/// drawn reversed.
pub fn column_table<'a>(
    columns: &[Column],
    rows: Vec<Row<'a>>,
    selected: Option<usize>,
    title: impl Into<String>,
) -> Table<'a> {
    let header = Row::new(columns.iter().map(|c| c.label))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    let widths: Vec<Constraint> = columns.iter().map(|c| Constraint::Length(c.width)).collect();
    let rows: Vec<Row<'a>> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| {
            if Some(idx) == selected {
                row.reversed()
            } else {
                row
            }
        })
        .collect();

    Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title.into()))
        .column_spacing(1)
}
