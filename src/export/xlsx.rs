use rust_xlsxwriter::{Format, FormatBorder, Workbook, XlsxError};

use super::format::display_value;
use crate::catalog::{DrugRecord, Field};

/// Renders rows into an in-memory `.xlsx` with one header row of localized
/// labels and every catalog column.
pub fn render_workbook(sheet_name: &str, rows: &[DrugRecord]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new()
        .set_bold()
        .set_border_bottom(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, field) in Field::ALL.iter().enumerate() {
        let col = column_index(col);
        worksheet.set_column_width(col, field.export_width())?;
        worksheet.write_string_with_format(0, col, field.label(), &header)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (index, record) in rows.iter().enumerate() {
        let row = u32::try_from(index + 1).unwrap_or(u32::MAX);
        for (col, field) in Field::ALL.iter().enumerate() {
            let text = display_value(record, *field);
            if !text.is_empty() {
                worksheet.write_string(row, column_index(col), text)?;
            }
        }
    }

    workbook.save_to_buffer()
}

fn column_index(col: usize) -> u16 {
    u16::try_from(col).unwrap_or(u16::MAX)
}
