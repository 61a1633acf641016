use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = split_vertical(
        r,
        &[
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ],
    );
    let horizontal = split_horizontal(
        vertical[1],
        &[
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ],
    );
    horizontal[1]
}

pub fn split_vertical(area: Rect, constraints: &[Constraint]) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints.to_vec())
        .split(area)
        .to_vec()
}

pub fn split_horizontal(area: Rect, constraints: &[Constraint]) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints.to_vec())
        .split(area)
        .to_vec()
}

/// Row-major grid of `cell_width` x `cell_height` slots that fit inside `area`, leaving a
/// one-cell gutter on the right and bottom of each slot.
pub fn grid_cells(area: Rect, cell_width: u16, cell_height: u16, limit: usize) -> Vec<Rect> {
    if cell_width < 2 || cell_height < 2 {
        return Vec::new();
    }
    let cols = area.width / cell_width;
    let rows = area.height / cell_height;

    let mut cells = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if cells.len() == limit {
                return cells;
            }
            cells.push(Rect::new(
                area.x + col * cell_width,
                area.y + row * cell_height,
                cell_width - 1,
                cell_height - 1,
            ));
        }
    }
    cells
}
