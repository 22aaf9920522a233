use camino::Utf8Path;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use crate::error::GeoHcaError;
use crate::hca::{FILL_MARKER, HEADER_ROWS, MAX_CELL_CHARS, Workbook};

const COLUMN_WIDTH: f64 = 28.0;

/// Writes the workbook with the ingest template's header rows. The file is
/// first written next to `path` and then moved into place.
pub fn write_workbook(path: &Utf8Path, workbook: &Workbook) -> Result<(), GeoHcaError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    std::fs::create_dir_all(parent.as_std_path())
        .map_err(|err| GeoHcaError::Filesystem(err.to_string()))?;

    let mut writer = XlsxWorkbook::new();
    let bold = Format::new().set_bold();
    let italic = Format::new().set_italic();

    for tab in &workbook.tabs {
        let worksheet = writer.add_worksheet();
        worksheet.set_name(tab.kind.sheet_name()).map_err(xlsx_err)?;

        for (col_idx, column) in tab.columns().iter().enumerate() {
            let col = col_idx as u16;
            worksheet
                .write_string_with_format(0, col, column.display, &bold)
                .map_err(xlsx_err)?;
            worksheet
                .write_string_with_format(1, col, column.description, &italic)
                .map_err(xlsx_err)?;
            worksheet
                .write_string(3, col, column.programmatic)
                .map_err(xlsx_err)?;
            worksheet
                .set_column_width(col, COLUMN_WIDTH)
                .map_err(xlsx_err)?;
        }
        worksheet
            .write_string(HEADER_ROWS - 1, 0, FILL_MARKER)
            .map_err(xlsx_err)?;

        for (row_idx, row) in tab.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(
                        HEADER_ROWS + row_idx as u32,
                        col_idx as u16,
                        fit_cell(tab.kind.sheet_name(), cell),
                    )
                    .map_err(xlsx_err)?;
            }
        }
    }

    let temp = tempfile::Builder::new()
        .prefix(".geo-to-hca")
        .suffix(".xlsx")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| GeoHcaError::Filesystem(err.to_string()))?;
    writer.save(temp.path()).map_err(xlsx_err)?;
    temp.persist(path.as_std_path())
        .map_err(|err| GeoHcaError::Filesystem(err.to_string()))?;
    Ok(())
}

fn fit_cell<'a>(sheet: &str, cell: &'a str) -> &'a str {
    match cell.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            tracing::warn!(sheet, "cell truncated to {MAX_CELL_CHARS} characters");
            &cell[..cut]
        }
        None => cell,
    }
}

fn xlsx_err(err: rust_xlsxwriter::XlsxError) -> GeoHcaError {
    GeoHcaError::Workbook(err.to_string())
}
