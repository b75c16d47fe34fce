//! 表格文件读写（xlsx 与 csv）
//!
//! 扩展名为 `.xlsx` / `.xls` 时按 Excel 处理，否则按 CSV 处理。

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use serde_json::{Map, Number, Value as JsonValue};
use tracing::{debug, info};

use crate::error::{AppResult, FileError};
use crate::models::table::Table;
use crate::models::work_item::value_to_text;

fn is_excel(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref(),
        Some("xlsx") | Some("xls")
    )
}

/// 读取表格，第一行为表头
pub fn read_table(path: impl AsRef<Path>) -> AppResult<Table> {
    let path = path.as_ref();
    info!("📁 正在读取表格: {}", path.display());
    let table = if is_excel(path) {
        read_excel(path)?
    } else {
        read_csv(path)?
    };
    info!("✓ 读取到 {} 行, {} 列", table.len(), table.columns.len());
    Ok(table)
}

/// 写出表格（整表一次写入）
pub fn write_table(path: impl AsRef<Path>, table: &Table) -> AppResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FileError::write(parent.display().to_string(), e))?;
    }
    if is_excel(path) {
        write_excel(path, table)?;
    } else {
        write_csv(path, table)?;
    }
    info!("💾 已写出 {} 行到 {}", table.len(), path.display());
    Ok(())
}

fn read_csv(path: &Path) -> AppResult<Table> {
    let display = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| FileError::read(&display, e))?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| FileError::read(&display, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record.map_err(|e| FileError::read(&display, e))?;
        let row: Map<String, JsonValue> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let cell = record.get(i).unwrap_or_default();
                (c.clone(), JsonValue::String(cell.to_string()))
            })
            .collect();
        table.rows.push(row);
    }
    Ok(table)
}

fn read_excel(path: &Path) -> AppResult<Table> {
    let display = path.display().to_string();
    let mut workbook = open_workbook_auto(path).map_err(|e| FileError::read(&display, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FileError::BadTable {
            path: display.clone(),
            reason: "工作簿中没有工作表".to_string(),
        })?
        .map_err(|e| FileError::read(&display, e))?;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Ok(Table::default()),
    };
    debug!("表头: {:?}", columns);

    let mut table = Table::new(columns);
    for cells in rows {
        let row: Map<String, JsonValue> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), cells.get(i).map(cell_to_json).unwrap_or(JsonValue::Null)))
            .collect();
        table.rows.push(row);
    }
    Ok(table)
}

fn cell_to_json(cell: &Data) -> JsonValue {
    match cell {
        Data::Empty => JsonValue::Null,
        Data::String(s) => JsonValue::String(s.clone()),
        Data::Bool(b) => JsonValue::Bool(*b),
        Data::Int(i) => JsonValue::Number((*i).into()),
        Data::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(f.to_string())),
        other => JsonValue::String(other.to_string()),
    }
}

fn write_csv(path: &Path, table: &Table) -> AppResult<()> {
    let display = path.display().to_string();
    let mut writer = csv::Writer::from_path(path).map_err(|e| FileError::write(&display, e))?;
    writer
        .write_record(&table.columns)
        .map_err(|e| FileError::write(&display, e))?;
    for row in &table.rows {
        let cells: Vec<String> = table
            .columns
            .iter()
            .map(|c| row.get(c).map(value_to_text).unwrap_or_default())
            .collect();
        writer
            .write_record(&cells)
            .map_err(|e| FileError::write(&display, e))?;
    }
    writer.flush().map_err(|e| FileError::write(&display, e))?;
    Ok(())
}

fn write_excel(path: &Path, table: &Table) -> AppResult<()> {
    let display = path.display().to_string();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, name.as_str())
            .map_err(|e| FileError::write(&display, e))?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (col, name) in table.columns.iter().enumerate() {
            let col = col as u16;
            let written = match row.get(name) {
                None | Some(JsonValue::Null) => continue,
                Some(JsonValue::Bool(b)) => worksheet.write_boolean(excel_row, col, *b).map(|_| ()),
                Some(JsonValue::Number(n)) => match n.as_f64() {
                    Some(f) => worksheet.write_number(excel_row, col, f).map(|_| ()),
                    None => worksheet.write_string(excel_row, col, n.to_string()).map(|_| ()),
                },
                Some(other) => worksheet
                    .write_string(excel_row, col, value_to_text(other))
                    .map(|_| ()),
            };
            written.map_err(|e| FileError::write(&display, e))?;
        }
    }

    workbook.save(path).map_err(|e| FileError::write(&display, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let mut table = Table::new(vec!["name".into(), "has_offices".into(), "count".into()]);
        let mut row = Map::new();
        row.insert("name".into(), json!("Acme, Inc."));
        row.insert("has_offices".into(), json!(true));
        row.insert("count".into(), json!(3));
        table.rows.push(row);

        write_table(&path, &table).unwrap();
        let loaded = read_table(&path).unwrap();

        assert_eq!(loaded.columns, table.columns);
        assert_eq!(loaded.rows[0]["name"], json!("Acme, Inc."));
        assert_eq!(loaded.rows[0]["has_offices"], json!("true"));
        assert_eq!(loaded.rows[0]["count"], json!("3"));
    }

    #[test]
    fn test_xlsx_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut table = Table::new(vec!["name".into(), "brazil_office".into(), "score".into(), "note".into()]);
        let mut row = Map::new();
        row.insert("name".into(), json!("Acme"));
        row.insert("brazil_office".into(), json!(false));
        row.insert("score".into(), json!(1.5));
        row.insert("note".into(), JsonValue::Null);
        table.rows.push(row);

        write_table(&path, &table).unwrap();
        let loaded = read_table(&path).unwrap();

        assert_eq!(loaded.columns, table.columns);
        assert_eq!(loaded.rows[0]["name"], json!("Acme"));
        assert_eq!(loaded.rows[0]["brazil_office"], json!(false));
        assert_eq!(loaded.rows[0]["score"], json!(1.5));
    }

    #[test]
    fn test_header_only_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "website,name\n").unwrap();
        let table = read_table(&path).unwrap();
        assert_eq!(table.columns, vec!["website", "name"]);
        assert!(table.is_empty());
    }
}
