use std::path::{Path, PathBuf};

use crate::config::Layout;
use crate::docx::{
    Align, Document, Paragraph, Picture, Table, TableCell, TableRow, VMerge, TEXT_WIDTH,
};
use crate::grid::{Grid, DATA_COLUMNS};
use crate::models::{normalize, StudentRecord, Tier, Trimester};

pub const FILE_PREFIX: &str = "Plan_Intervención";
pub const EXTENSION: &str = "docx";
const NAME_PLACEHOLDER: &str = "sin_nombre";
const LOGO_WIDTH_INCHES: f64 = 1.9;
const LABEL_COLUMN: u32 = 3_000;

/// `Plan_Intervención_<name>_<year>.docx`, spaces and path separators in the
/// name turned into `_`.
pub fn output_file_name(student_name: &str, academic_year: &str) -> String {
    let safe_name = if student_name.trim().is_empty() {
        NAME_PLACEHOLDER.to_string()
    } else {
        student_name.replace([' ', '/', '\\'], "_")
    };
    format!("{FILE_PREFIX}_{safe_name}_{academic_year}.{EXTENSION}")
}

pub fn title(academic_year: &str) -> String {
    format!(
        "PLAN PERSONALIZADO DE INTERVENCIÓN – Aula de Audición y Lenguaje (Versión {academic_year})"
    )
}

fn heading(number: usize, text: &str) -> Paragraph {
    Paragraph::new().bold(&format!("{number}. {text}"))
}

pub fn build_document(
    record: &StudentRecord,
    grid: &Grid,
    layout: &Layout,
    logo: Option<Picture>,
) -> Document {
    let mut doc = Document::new();

    let half = TEXT_WIDTH / 2;
    let mut header = Table::new(vec![half, TEXT_WIDTH - half]).borderless();
    let logo_cell = match logo {
        Some(picture) => {
            let handle = doc.add_picture(picture);
            TableCell::new(Paragraph::new().picture(handle, LOGO_WIDTH_INCHES))
        }
        None => TableCell::empty(),
    };
    header.push_row(TableRow::new(vec![
        logo_cell,
        TableCell::new(
            Paragraph::new()
                .align(Align::Right)
                .text(&format!("Curso académico: {}", record.academic_year)),
        ),
    ]));
    doc.add_table(header);

    doc.add_paragraph(
        Paragraph::new()
            .align(Align::Center)
            .bold(&title(&record.academic_year)),
    );

    let mut section = 1;
    doc.add_paragraph(heading(section, "DATOS DEL ALUMNO"));
    let mut info = Table::new(vec![LABEL_COLUMN, TEXT_WIDTH - LABEL_COLUMN]);
    for field in &layout.metadata_fields {
        info.push_row(TableRow::new(vec![
            TableCell::text(&format!("{}:", field.label())),
            TableCell::text(&field.value(record)),
        ]));
    }
    doc.add_table(info);

    for text_section in &layout.text_sections {
        section += 1;
        doc.add_paragraph(heading(section, text_section.heading()));
        doc.add_paragraph(Paragraph::plain(text_section.text(record)));
    }

    section += 1;
    doc.add_paragraph(heading(section, "SEGUIMIENTO DE OBJETIVOS"));
    doc.add_table(tracking_table(grid, layout));

    section += 1;
    doc.add_paragraph(heading(section, "OBSERVACIONES TRIMESTRALES"));
    for trimester in Trimester::ALL {
        doc.add_paragraph(Paragraph::new().bold(trimester.observation_label()));
        doc.add_paragraph(Paragraph::plain(record.trimester_observation(trimester)));
    }

    if !record.observations.trim().is_empty() {
        section += 1;
        doc.add_paragraph(heading(section, "OBSERVACIONES"));
        doc.add_paragraph(Paragraph::plain(&record.observations));
    }

    let (first, second) = record.signature_lines();
    doc.add_paragraph(Paragraph::new());
    doc.add_paragraph(Paragraph::new().align(Align::Right).text(&first));
    doc.add_paragraph(Paragraph::new().align(Align::Right).text(&second));

    doc
}

/// Grid copy with two synthesized header rows: objective label merged down,
/// one three-column cell per tier, then the trimester labels.
pub fn tracking_table(grid: &Grid, layout: &Layout) -> Table {
    let objective_width = TEXT_WIDTH * 2 / 5;
    let data_width = (TEXT_WIDTH - objective_width) / DATA_COLUMNS as u32;
    let mut columns = vec![objective_width];
    columns.extend(std::iter::repeat(data_width).take(DATA_COLUMNS));
    let mut table = Table::new(columns);

    let centered = |text: &str| Paragraph::new().align(Align::Center).text(text);
    let colors = &layout.tier_colors;

    let mut tiers = vec![TableCell::new(
        Paragraph::new().align(Align::Center).bold("OBJETIVO"),
    )
    .vmerge(VMerge::Restart)];
    for tier in Tier::ALL {
        tiers.push(
            TableCell::new(Paragraph::new().align(Align::Center).bold(tier.label()))
                .span(Trimester::ALL.len())
                .shade(colors.hex(tier)),
        );
    }
    table.push_row(TableRow::new(tiers).header());

    let mut trimesters = vec![TableCell::empty().vmerge(VMerge::Continue)];
    for tier in Tier::ALL {
        for trimester in Trimester::ALL {
            trimesters.push(TableCell::new(centered(trimester.label())).shade(colors.hex(tier)));
        }
    }
    table.push_row(TableRow::new(trimesters).header());

    for row in grid.rows() {
        let mut cells = vec![TableCell::text(&row.objective)];
        for tier in Tier::ALL {
            for trimester in Trimester::ALL {
                let cell = TableCell::new(centered(&normalize(row.raw(tier, trimester))));
                cells.push(if layout.shade_cells {
                    cell.shade(colors.hex(tier))
                } else {
                    cell
                });
            }
        }
        table.push_row(TableRow::new(cells));
    }

    table
}

/// Builds the document and writes it under `out_dir`; returns the saved path.
pub fn export(
    record: &StudentRecord,
    grid: &Grid,
    layout: &Layout,
    logo: Option<Picture>,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let has_logo = logo.is_some();
    let doc = build_document(record, grid, layout, logo);
    let path = out_dir.join(output_file_name(&record.name, &record.academic_year));
    if path.exists() {
        tracing::info!(path = %path.display(), "overwriting existing document");
    }
    doc.save(&path)?;
    tracing::info!(
        path = %path.display(),
        objectives = grid.len(),
        logo = has_logo,
        "document generated"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::{Block, ImageFormat};
    use crate::models::{MetadataField, TextSection};
    use chrono::NaiveDate;
    use std::io::Read;

    fn record() -> StudentRecord {
        let mut record = StudentRecord::new(NaiveDate::from_ymd_opt(2024, 9, 16).unwrap());
        record.name = "Ana López".to_string();
        record.academic_year = "2024-2025".to_string();
        record
    }

    fn grid(items: &[&str]) -> Grid {
        Grid::build(&items.iter().map(|i| i.to_string()).collect::<Vec<_>>())
    }

    fn tables(doc: &Document) -> Vec<&Table> {
        doc.blocks()
            .iter()
            .filter_map(|block| match block {
                Block::Table(table) => Some(table),
                Block::Paragraph(_) => None,
            })
            .collect()
    }

    fn paragraphs(doc: &Document) -> Vec<String> {
        doc.blocks()
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph(paragraph) => Some(paragraph.plain_text()),
                Block::Table(_) => None,
            })
            .collect()
    }

    #[test]
    fn file_name_joins_name_and_year() {
        assert_eq!(
            output_file_name("Ana López", "2024-2025"),
            "Plan_Intervención_Ana_López_2024-2025.docx"
        );
        assert_eq!(
            output_file_name("María  José", "2025-2026"),
            "Plan_Intervención_María__José_2025-2026.docx"
        );
    }

    #[test]
    fn path_separators_stay_inside_the_file_name() {
        assert_eq!(
            output_file_name("Ana/López\\Gil", "2024-2025"),
            "Plan_Intervención_Ana_López_Gil_2024-2025.docx"
        );

        let dir = tempfile::tempdir().unwrap();
        let mut r = record();
        r.name = "Ana/López".to_string();
        let path = export(&r, &grid(&[]), &Layout::default(), None, dir.path()).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.is_file());
        assert!(!dir.path().join("Plan_Intervención_Ana").exists());
    }

    #[test]
    fn blank_name_uses_placeholder() {
        for name in ["", "   ", "\t"] {
            assert_eq!(
                output_file_name(name, "2024-2025"),
                "Plan_Intervención_sin_nombre_2024-2025.docx"
            );
        }
    }

    #[test]
    fn lowercase_mark_exports_canonical_mark() {
        let mut g = grid(&["Leer sílabas"]);
        g.set_cell(0, Tier::Progressing, Trimester::Second, "x").unwrap();
        let table = tracking_table(&g, &Layout::default());

        let data_row = &table.rows()[2];
        let cells = data_row.cells();
        assert_eq!(cells.len(), 13);
        assert_eq!(cells[0].plain_text(), "Leer sílabas");
        assert_eq!(cells[1 + 2 * 3 + 1].plain_text(), "X");
        let others = cells[1..]
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 7)
            .all(|(_, cell)| cell.plain_text().is_empty());
        assert!(others);
    }

    #[test]
    fn header_rows_merge_and_shade() {
        let table = tracking_table(&grid(&["A", "B"]), &Layout::default());
        assert_eq!(table.rows().len(), 4);

        let first = table.rows()[0].cells();
        assert_eq!(first.len(), 5);
        assert_eq!(first[0].merge(), Some(VMerge::Restart));
        assert_eq!(first[0].plain_text(), "OBJETIVO");
        assert_eq!(first.iter().map(TableCell::span_len).sum::<usize>(), 13);
        assert_eq!(first[1].plain_text(), "SIN INICIAR");
        assert_eq!(first[4].shading(), Some("DFF4D2"));

        let second = table.rows()[1].cells();
        assert_eq!(second.len(), 13);
        assert_eq!(second[0].merge(), Some(VMerge::Continue));
        assert_eq!(second[1].plain_text(), "1ºT");
        assert_eq!(second[4].plain_text(), "1ºT");
        assert_eq!(second[4].shading(), Some("FFE7C2"));
    }

    #[test]
    fn cell_shading_follows_layout() {
        let g = grid(&["A"]);
        let shaded = tracking_table(&g, &Layout::default());
        assert_eq!(shaded.rows()[2].cells()[12].shading(), Some("DFF4D2"));
        assert_eq!(shaded.rows()[2].cells()[0].shading(), None);

        let layout = Layout {
            shade_cells: false,
            ..Layout::default()
        };
        let plain = tracking_table(&g, &layout);
        assert!(plain.rows()[2].cells().iter().all(|c| c.shading().is_none()));
        // Headers stay shaded either way.
        assert_eq!(plain.rows()[1].cells()[1].shading(), Some("EDEDED"));
    }

    #[test]
    fn metadata_table_follows_configured_fields() {
        let mut r = record();
        r.birth_date = NaiveDate::from_ymd_opt(2017, 5, 2);
        r.session_count = "2 semanales".to_string();
        let layout = Layout {
            metadata_fields: vec![
                MetadataField::Name,
                MetadataField::BirthDate,
                MetadataField::SessionCount,
            ],
            ..Layout::default()
        };
        let doc = build_document(&r, &grid(&[]), &layout, None);
        let info = tables(&doc)[1];
        let rows: Vec<(String, String)> = info
            .rows()
            .iter()
            .map(|row| (row.cells()[0].plain_text(), row.cells()[1].plain_text()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("ALUMNO/A:".to_string(), "Ana López".to_string()),
                ("FECHA DE NACIMIENTO:".to_string(), "02/05/2017".to_string()),
                ("NÚMERO DE SESIONES:".to_string(), "2 semanales".to_string()),
            ]
        );
    }

    #[test]
    fn sections_appear_in_order() {
        let mut r = record();
        r.current_situation = "Dificultades articulatorias".to_string();
        r.trimester_observations[0] = "Buena adaptación".to_string();
        r.signature = "Laura Gil".to_string();
        let doc = build_document(&r, &grid(&["A"]), &Layout::default(), None);
        let text = paragraphs(&doc);

        let position = |needle: &str| {
            text.iter()
                .position(|p| p == needle)
                .unwrap_or_else(|| panic!("missing {needle:?} in {text:?}"))
        };
        assert!(position(title("2024-2025").as_str()) < position("1. DATOS DEL ALUMNO"));
        assert!(position("2. SITUACIÓN ACTUAL") < position("Dificultades articulatorias"));
        assert!(position("3. ATENCIÓN EDUCATIVA ESPECÍFICA") < position("4. NÚMERO DE SESIONES"));
        assert!(position("5. SEGUIMIENTO DE OBJETIVOS") < position("6. OBSERVACIONES TRIMESTRALES"));
        assert!(position("Observaciones 1º Trimestre") < position("Buena adaptación"));
        assert!(!text.iter().any(|p| p.ends_with(". OBSERVACIONES")));
        assert_eq!(text[text.len() - 2], "Laura Gil");
        assert_eq!(text[text.len() - 1], "Maestra de Audición y Lenguaje");
        assert_eq!(tables(&doc).len(), 3);
    }

    #[test]
    fn pasted_control_characters_leave_well_formed_xml() {
        let mut r = record();
        r.current_situation = "linea uno\u{b}linea dos".to_string();
        let xml = build_document(&r, &grid(&["Leer\u{c}"]), &Layout::default(), None)
            .document_xml();

        assert!(!xml.contains('\u{b}'));
        assert!(!xml.contains('\u{c}'));
        assert!(xml.contains(r#"linea uno</w:t><w:br/><w:t xml:space="preserve">linea dos"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">Leer</w:t>"#));
    }

    #[test]
    fn final_observations_only_when_filled() {
        let mut r = record();
        r.observations = "Revisar en junio".to_string();
        let layout = Layout {
            text_sections: vec![TextSection::Situation],
            ..Layout::default()
        };
        let text = paragraphs(&build_document(&r, &grid(&[]), &layout, None));
        let at = text.iter().position(|p| p == "5. OBSERVACIONES").unwrap();
        assert_eq!(text[at + 1], "Revisar en junio");
    }

    #[test]
    fn export_writes_named_package() {
        let dir = tempfile::tempdir().unwrap();
        let logo = Picture {
            format: ImageFormat::Png,
            width_px: 300,
            height_px: 100,
            data: vec![0x89, b'P'],
        };
        let mut g = grid(&["Leer sílabas"]);
        g.set_cell(0, Tier::Achieved, Trimester::Third, "✖").unwrap();

        let path = export(&record(), &g, &Layout::default(), Some(logo), dir.path()).unwrap();
        assert_eq!(
            path,
            dir.path().join("Plan_Intervención_Ana_López_2024-2025.docx")
        );

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains("Ana López"));
        assert!(xml.contains("Curso académico: 2024-2025"));
        assert!(archive.by_name("word/media/image1.png").is_ok());

        // Same name and year overwrite silently.
        let again = export(&record(), &g, &Layout::default(), None, dir.path()).unwrap();
        assert_eq!(again, path);
        let archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert!(archive.file_names().all(|name| !name.starts_with("word/media/")));
    }
}
