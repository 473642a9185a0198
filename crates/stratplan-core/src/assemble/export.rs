//! Render a [`PlanTable`] as a workbook, a paginated document, CSV or JSON.
//!
//! Every renderer goes through [`PlanRow::cells`] (or the same formatters
//! for structured JSON), so the column semantics never drift between
//! formats.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::{Value, json};
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{BudgetCell, HEADERS, NOT_AVAILABLE, PlanRow, PlanTable, Target, format_amount};
use crate::model::EnumParseError;

pub const SHEET_NAME: &str = "Plan";
pub const DOCUMENT_TITLE: &str = "Ministry of Health - Plan Summary";

/// Spreadsheet column widths, in characters.
pub const XLSX_WIDTHS: [u32; 11] = [5, 30, 25, 30, 15, 10, 15, 25, 20, 20, 25];

/// Document column widths, in characters. Scaled down from the workbook
/// widths to fit a landscape page.
const DOCUMENT_WIDTHS: [usize; 11] = [4, 20, 18, 24, 12, 7, 10, 16, 14, 16, 22];
const LINES_PER_PAGE: usize = 48;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build workbook: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    PdfText,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::PdfText => "txt",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Xlsx => "xlsx",
            Self::PdfText => "pdf-text",
            Self::Csv => "csv",
            Self::Json => "json",
        };
        f.write_str(s)
    }
}

impl FromStr for ExportFormat {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "pdf-text" | "pdf" | "txt" | "text" => Ok(Self::PdfText),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(EnumParseError::new("export format", s)),
        }
    }
}

/// Write `table` to `path` in `format`. Returns the number of data rows.
pub fn export_to_path(
    table: &PlanTable,
    format: ExportFormat,
    path: &Path,
    generated_on: NaiveDate,
) -> Result<usize, ExportError> {
    let file = File::create(path)?;
    match format {
        ExportFormat::Xlsx => {
            write_xlsx(table, file)?;
        }
        ExportFormat::PdfText => write_document(table, generated_on, file)?,
        ExportFormat::Csv => write_csv(table, file)?,
        ExportFormat::Json => write_json(table, file)?,
    }
    tracing::info!(
        path = %path.display(),
        %format,
        rows = table.rows.len(),
        "plan exported"
    );
    Ok(table.rows.len())
}

/// Render into memory, for writers that cannot seek (stdout).
pub fn export_to_vec(
    table: &PlanTable,
    format: ExportFormat,
    generated_on: NaiveDate,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Xlsx => Ok(write_xlsx(table, Cursor::new(Vec::new()))?.into_inner()),
        ExportFormat::PdfText => {
            let mut out = Vec::new();
            write_document(table, generated_on, &mut out)?;
            Ok(out)
        }
        ExportFormat::Csv => {
            let mut out = Vec::new();
            write_csv(table, &mut out)?;
            Ok(out)
        }
        ExportFormat::Json => {
            let mut out = Vec::new();
            write_json(table, &mut out)?;
            Ok(out)
        }
    }
}

// ---------------------------------------------------------------------------
// Workbook

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// Style 1 wraps and top-aligns body cells, style 2 is the bold header.
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0" applyAlignment="1"><alignment vertical="top" wrapText="1"/></xf><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs></styleSheet>"#;

/// Write a single-sheet workbook and return the underlying writer.
pub fn write_xlsx<W: Write + Seek>(table: &PlanTable, writer: W) -> Result<W, ExportError> {
    let mut zip = ZipWriter::new(writer);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opts)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;

    zip.start_file("_rels/.rels", opts)?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("xl/workbook.xml", opts)?;
    zip.write_all(workbook_xml().as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", opts)?;
    zip.write_all(WORKBOOK_RELS.as_bytes())?;

    zip.start_file("xl/styles.xml", opts)?;
    zip.write_all(STYLES.as_bytes())?;

    zip.start_file("xl/worksheets/sheet1.xml", opts)?;
    zip.write_all(sheet_xml(table).as_bytes())?;

    Ok(zip.finish()?)
}

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        xml_escape(SHEET_NAME)
    )
}

fn sheet_xml(table: &PlanTable) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cols>"#,
    );
    for (i, width) in XLSX_WIDTHS.iter().enumerate() {
        let col = i + 1;
        xml.push_str(&format!(
            r#"<col min="{col}" max="{col}" width="{width}" customWidth="1"/>"#
        ));
    }
    xml.push_str("</cols><sheetData>");

    push_row(&mut xml, 1, HEADERS.iter().map(|h| (*h).to_owned()), 2);
    for (i, row) in table.rows.iter().enumerate() {
        push_row(&mut xml, i + 2, row.cells().into_iter(), 1);
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_row(xml: &mut String, number: usize, cells: impl Iterator<Item = String>, style: u8) {
    xml.push_str(&format!(r#"<row r="{number}">"#));
    for (col, text) in cells.enumerate() {
        if text.is_empty() {
            continue;
        }
        let reference = format!("{}{number}", column_letter(col));
        xml.push_str(&format!(
            r#"<c r="{reference}" s="{style}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            xml_escape(&text)
        ));
    }
    xml.push_str("</row>");
}

fn column_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Paginated document

/// Write a landscape, fixed-width text document. Pages are separated by a
/// form feed and each starts with the title, the generation date and the
/// column header.
pub fn write_document<W: Write>(
    table: &PlanTable,
    generated_on: NaiveDate,
    mut writer: W,
) -> Result<(), ExportError> {
    let header = page_header(table, generated_on);
    let mut page = 1;
    let mut used = write_page_header(&mut writer, &header, page)?;
    let mut rows_on_page = 0;

    for row in &table.rows {
        let lines = layout_row(&row.cells());
        if rows_on_page > 0 && used + lines.len() > LINES_PER_PAGE {
            page += 1;
            writer.write_all(b"\x0c")?;
            used = write_page_header(&mut writer, &header, page)?;
            rows_on_page = 0;
        }
        for line in &lines {
            writeln!(writer, "{}", line.trim_end())?;
        }
        used += lines.len();
        rows_on_page += 1;
    }

    if table.rows.is_empty() {
        writeln!(writer, "(no rows)")?;
    }
    Ok(())
}

fn page_header(table: &PlanTable, generated_on: NaiveDate) -> Vec<String> {
    let mut lines = vec![
        DOCUMENT_TITLE.to_owned(),
        format!("Generated on: {}", generated_on.format("%Y-%m-%d")),
    ];
    if !table.organization.is_empty() {
        lines.push(format!("Organization: {}", table.organization));
    }
    if !table.planner.is_empty() {
        lines.push(format!("Planner: {}", table.planner));
    }
    if let Some(period) = &table.period {
        lines.push(format!("Period: {period}"));
    }
    lines.push(String::new());

    let columns: Vec<String> = HEADERS.iter().map(|h| (*h).to_owned()).collect();
    lines.extend(layout_row(&columns));
    let width = DOCUMENT_WIDTHS.iter().sum::<usize>() + 3 * (DOCUMENT_WIDTHS.len() - 1);
    lines.push("-".repeat(width));
    lines
}

fn write_page_header<W: Write>(
    writer: &mut W,
    header: &[String],
    page: usize,
) -> Result<usize, ExportError> {
    for (i, line) in header.iter().enumerate() {
        if i == 0 {
            writeln!(writer, "{line}    Page {page}")?;
        } else {
            writeln!(writer, "{}", line.trim_end())?;
        }
    }
    Ok(header.len())
}

/// Lay out one row as text lines, wrapping every cell to its column width.
fn layout_row(cells: &[String]) -> Vec<String> {
    let wrapped: Vec<Vec<String>> = cells
        .iter()
        .zip(DOCUMENT_WIDTHS)
        .map(|(cell, width)| wrap(cell, width))
        .collect();
    let height = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);

    (0..height)
        .map(|line| {
            wrapped
                .iter()
                .zip(DOCUMENT_WIDTHS)
                .map(|(cell, width)| {
                    let text = cell.get(line).map(String::as_str).unwrap_or("");
                    format!("{text:<width$}")
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect()
}

/// Greedy word wrap. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let current_len = current.chars().count();
            if current_len > 0 && current_len + 1 + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }
    lines
}

// ---------------------------------------------------------------------------
// CSV and JSON

pub fn write_csv<W: Write>(table: &PlanTable, mut writer: W) -> Result<(), ExportError> {
    let header: Vec<String> = HEADERS.iter().map(|h| csv_field(h)).collect();
    writeln!(writer, "{}", header.join(","))?;

    for row in &table.rows {
        let fields: Vec<String> = row.cells().iter().map(|c| csv_field(c)).collect();
        writeln!(writer, "{}", fields.join(","))?;
    }
    Ok(())
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_owned()
    }
}

/// Structured JSON. Target, Period and Budget stay as objects/arrays and
/// absent values are the string `"N/A"`.
pub fn write_json<W: Write>(table: &PlanTable, writer: W) -> Result<(), ExportError> {
    let rows: Vec<Value> = table.rows.iter().map(json_row).collect();
    let doc = json!({
        "organization": table.organization,
        "planner": table.planner,
        "period": table.period,
        "rows": rows,
        "totals": {
            "total": table.totals.total,
            "treasury": table.totals.funding.government_treasury,
            "sdg": table.totals.funding.sdg_funding,
            "partners": table.totals.funding.partners_funding,
            "other": table.totals.funding.other_funding,
            "totalFunding": table.totals.total_funding(),
            "fundingGap": table.totals.funding_gap(),
        },
    });
    serde_json::to_writer_pretty(writer, &doc)?;
    Ok(())
}

fn json_row(row: &PlanRow) -> Value {
    let na = || Value::String(NOT_AVAILABLE.to_owned());
    let cells = row.cells();
    json!({
        "No": row.number.map_or(Value::String(String::new()), |n| json!(n)),
        "Strategic Objective": cells[1],
        "Initiative": cells[2],
        "Performance Measure/Main Activity": cells[3],
        "Type": cells[4],
        "Weight": cells[5],
        "Baseline": cells[6],
        "Target": row.target.as_ref().map_or_else(na, target_json),
        "Period": row.period.as_ref().map_or_else(na, |p| json!(p)),
        "Implementor Team/Desk": cells[9],
        "Budget": row.budget.as_ref().map_or_else(na, budget_json),
    })
}

fn target_json(t: &Target) -> Value {
    json!({"annual": t.annual, "q1": t.q1, "q2": t.q2, "q3": t.q3, "q4": t.q4})
}

fn budget_json(b: &BudgetCell) -> Value {
    json!({
        "total": b.total,
        "treasury": b.treasury,
        "sdg": b.sdg,
        "partners": b.partners,
        "other": b.other,
        "display": format_amount(b.total),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::assemble::{BudgetTotals, RowKind};

    fn table() -> PlanTable {
        PlanTable {
            organization: "ICT Executive Office".into(),
            planner: "Abebe".into(),
            period: Some("2025-07-01 to 2026-06-30".into()),
            rows: vec![
                PlanRow {
                    number: Some(1),
                    objective: Some("Access & quality".into()),
                    initiative: Some("Immunization".into()),
                    name: "Coverage, national".into(),
                    kind: Some(RowKind::PerformanceMeasure),
                    weight: Some(14.0),
                    baseline: Some("60%".into()),
                    target: Some(Target { annual: 90.0, q1: 20.0, q2: 20.0, q3: 25.0, q4: 25.0 }),
                    period: Some(vec!["Q1".into()]),
                    implementor: Some("ICT Executive Office".into()),
                    budget: Some(BudgetCell { total: 81_000.0, treasury: 50_000.0, sdg: 0.0, partners: 0.0, other: 0.0 }),
                },
                PlanRow {
                    number: None,
                    objective: None,
                    initiative: None,
                    name: "Campaign".into(),
                    kind: Some(RowKind::MainActivity),
                    weight: Some(26.0),
                    baseline: None,
                    target: None,
                    period: None,
                    implementor: None,
                    budget: None,
                },
            ],
            totals: BudgetTotals::default(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    #[test]
    fn format_parses_aliases() {
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::PdfText);
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("docx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::PdfText.extension(), "txt");
    }

    #[test]
    fn workbook_has_plan_sheet_with_headers() {
        let bytes = export_to_vec(&table(), ExportFormat::Xlsx, date()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let mut workbook = String::new();
        archive
            .by_name("xl/workbook.xml")
            .unwrap()
            .read_to_string(&mut workbook)
            .unwrap();
        assert!(workbook.contains(r#"<sheet name="Plan""#));

        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();
        assert!(sheet.contains(">Performance Measure/Main Activity<"));
        assert!(sheet.contains("Access &amp; quality"));
        assert!(sheet.contains(r#"<col min="2" max="2" width="30" customWidth="1"/>"#));
        assert!(sheet.contains(r#"<c r="K2" s="1" t="inlineStr">"#));
    }

    #[test]
    fn csv_quotes_multiline_and_comma_cells() {
        let bytes = export_to_vec(&table(), ExportFormat::Csv, date()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("No,Strategic Objective,Initiative,"));
        assert!(text.contains("\"Coverage, national\""));
        assert!(text.contains("\"Annual: 90\nQ1: 20\nQ2: 20\nQ3: 25\nQ4: 25\""));
        assert!(text.contains(",,,Campaign,Main Activity,26%,N/A,N/A,N/A,N/A,N/A"));
    }

    #[test]
    fn json_keeps_structure_and_na() {
        let bytes = export_to_vec(&table(), ExportFormat::Json, date()).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        let rows = doc["rows"].as_array().unwrap();
        assert_eq!(rows[0]["Target"]["annual"], json!(90.0));
        assert_eq!(rows[0]["Period"], json!(["Q1"]));
        assert_eq!(rows[0]["Budget"]["total"], json!(81000.0));
        assert_eq!(rows[1]["Target"], json!("N/A"));
        assert_eq!(rows[1]["Period"], json!("N/A"));
        assert_eq!(rows[1]["Budget"], json!("N/A"));
    }

    #[test]
    fn document_has_title_and_date() {
        let bytes = export_to_vec(&table(), ExportFormat::PdfText, date()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Ministry of Health - Plan Summary    Page 1")
        );
        assert_eq!(lines.next(), Some("Generated on: 2025-08-01"));
        assert!(text.contains("Campaign"));
        assert!(!text.contains('\x0c'));
    }

    #[test]
    fn document_paginates_with_form_feed() {
        let mut t = table();
        let row = t.rows[0].clone();
        t.rows = vec![row; 20];
        let bytes = export_to_vec(&t, ExportFormat::PdfText, date()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let pages: Vec<&str> = text.split('\x0c').collect();
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.starts_with(DOCUMENT_TITLE));
            assert!(page.lines().count() <= LINES_PER_PAGE);
        }
    }

    #[test]
    fn wrap_splits_long_words() {
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("a\nb", 5), vec!["a", "b"]);
        assert_eq!(wrap("", 5), vec![""]);
    }

    #[test]
    fn export_to_path_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.csv");
        let rows = export_to_path(&table(), ExportFormat::Csv, &path, date()).unwrap();
        assert_eq!(rows, 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap().split(',').count(), 11);
    }
}
