use color_eyre::Result;
use drugprice::{
    catalog::{ColumnPreset, ColumnSet, DrugRecord, Field},
    export::format::{display_value, range_label},
    gateway::Gateway,
    query::{PageRequest, PageSize, build},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::{FilterArgs, SortArgs};

const MAX_CELL_WIDTH: usize = 40;

pub struct Options {
    pub filters: FilterArgs,
    pub sort: SortArgs,
    pub page: u32,
    pub page_size: PageSize,
    pub columns: ColumnPreset,
    pub json: bool,
}

pub async fn command(gateway: &dyn Gateway, options: Options) -> Result<()> {
    let config = options.filters.configuration()?;
    let page = PageRequest::new(options.page, options.page_size);
    let descriptor = build(&config, options.sort.spec(), page);
    tracing::debug!(descriptor = %descriptor.summary(), "Searching");
    let result = gateway.fetch_page(&descriptor).await?;

    if options.json {
        let body = serde_json::json!({
            "page": page.page(),
            "pageSize": page.size().get(),
            "totalCount": result.total_count,
            "rows": result.rows,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let columns = ColumnSet::from_preset(options.columns);
    print!("{}", render_rows(&result.rows, columns.fields()));
    let range = (!result.rows.is_empty())
        .then(|| (descriptor.offset + 1, descriptor.offset + result.rows.len() as u64));
    let pages = result.total_count.div_ceil(page.limit());
    println!(
        "{} · trang {}/{}",
        range_label(range, result.total_count),
        page.page(),
        pages.max(1)
    );
    Ok(())
}

/// Left-aligned plain-text table with a header row of field labels.
pub fn render_rows(rows: &[DrugRecord], fields: &[Field]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            fields
                .iter()
                .map(|field| truncate(&display_value(row, *field), MAX_CELL_WIDTH))
                .collect()
        })
        .collect();
    let widths: Vec<usize> = fields
        .iter()
        .enumerate()
        .map(|(col, field)| {
            cells
                .iter()
                .map(|row| row[col].width())
                .chain(std::iter::once(field.label().width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = fields.iter().map(|f| f.label().to_string()).collect();
    for line in std::iter::once(&header).chain(cells.iter()) {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let fill = width.saturating_sub(cell.width());
                format!("{cell}{}", " ".repeat(fill))
            })
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    }
    out
}

fn truncate(value: &str, max: usize) -> String {
    if value.width() <= max {
        return value.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in value.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_align_under_labels() {
        let rows = vec![DrugRecord {
            id: 7,
            drug_name: "Paracetamol".to_string(),
            unit_price: 1500.0,
            ..Default::default()
        }];
        let text = render_rows(&rows, &[Field::Id, Field::DrugName, Field::UnitPrice]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(Field::Id.label()));
        assert!(lines[1].contains("Paracetamol"));
        assert!(lines[1].ends_with("1.500"));
        let name_col = lines[0].find(Field::DrugName.label()).unwrap();
        assert_eq!(&lines[1][name_col..name_col + "Paracetamol".len()], "Paracetamol");
    }

    #[test]
    fn long_cells_are_cut() {
        let cut = truncate(&"a".repeat(60), 10);
        assert_eq!(cut.width(), 10);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("ngắn", 10), "ngắn");
    }
}
