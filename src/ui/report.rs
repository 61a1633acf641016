use chrono::Local;
use unicode_width::UnicodeWidthStr;

use crate::catalog::CatalogEntry;
use crate::fetch::Quote;
use crate::utils::{age_label, pad_width};
use crate::view::RankedEntry;

/// Lay out `rows` under `headers` as a boxed plain-text table.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| pad_width(cells.get(i).copied().unwrap_or(""), *w))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(border.clone());
    out.push(line(headers.to_vec()));
    out.push(border.clone());
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.push(border);
    out.join("\n")
}

pub fn format_price(price: Option<f64>) -> String {
    price.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".to_string())
}

pub fn format_change(change_pct: Option<f64>) -> String {
    change_pct
        .map(|c| format!("{c:+.2}%"))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_volume(volume: Option<u64>) -> String {
    volume.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Market cap in units of 億 (1e8), the way local quote boards print it.
pub fn format_metric(metric: f64) -> String {
    format!("{:.1}億", metric / 1e8)
}

pub fn quotes_table(quotes: &[Quote]) -> String {
    let now = Local::now();
    let rows: Vec<Vec<String>> = quotes
        .iter()
        .map(|q| {
            vec![
                q.symbol.clone(),
                q.name.clone(),
                format_price(q.price),
                format_change(q.change_pct()),
                format_volume(q.volume),
                q.status.label().to_string(),
                q.priced_at
                    .map(|at| age_label(&at, &now))
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    render_table(
        &["Symbol", "Name", "Price", "Change", "Volume", "Status", "Priced"],
        &rows,
    )
}

pub fn ranked_table(entries: &[RankedEntry]) -> String {
    let rows: Vec<Vec<String>> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            vec![
                (i + 1).to_string(),
                e.symbol.clone(),
                e.name.clone(),
                format_price(e.price),
                format_change(e.change_pct),
                format_metric(e.derived_metric),
            ]
        })
        .collect();
    render_table(
        &["#", "Symbol", "Name", "Price", "Change", "Market Cap"],
        &rows,
    )
}

pub fn entries_table(entries: &[(&str, &CatalogEntry)]) -> String {
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|(industry, e)| vec![e.symbol.clone(), e.name.clone(), industry.to_string()])
        .collect();
    render_table(&["Symbol", "Name", "Industry"], &rows)
}
