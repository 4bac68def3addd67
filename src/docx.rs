//! Minimal WordprocessingML writer: paragraphs, tables with merged and shaded
//! cells, and inline pictures, packaged as a `.docx` ZIP.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use anyhow::Context;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const EMU_PER_INCH: u64 = 914_400;
/// A4 portrait, 2 cm margins, in twentieths of a point.
const PAGE_WIDTH: u32 = 11_906;
const PAGE_HEIGHT: u32 = 16_838;
const PAGE_MARGIN: u32 = 1_134;
pub const TEXT_WIDTH: u32 = PAGE_WIDTH - 2 * PAGE_MARGIN;

const NS_DECLS: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#,
);

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Characters allowed by the XML 1.0 `Char` production.
fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Escapes markup characters and drops anything XML cannot carry.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars().filter(|&ch| is_xml_char(ch)) {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
    pub data: Vec<u8>,
}

/// Extent in EMU for a given display width, keeping the aspect ratio.
fn scaled_extent(width_px: u32, height_px: u32, width_inches: f64) -> (u64, u64) {
    let cx = (width_inches * EMU_PER_INCH as f64).round() as u64;
    let cy = if width_px == 0 {
        cx
    } else {
        (cx as f64 * height_px as f64 / width_px as f64).round() as u64
    };
    (cx, cy)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Center,
    Right,
}

impl Align {
    fn as_str(self) -> &'static str {
        match self {
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Inline {
    Text { text: String, bold: bool },
    Picture { media: usize, cx: u64, cy: u64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    align: Option<Align>,
    inlines: Vec<Inline>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: &str) -> Self {
        Self::new().text(text)
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.inlines.push(Inline::Text {
            text: text.to_string(),
            bold: false,
        });
        self
    }

    pub fn bold(mut self, text: &str) -> Self {
        self.inlines.push(Inline::Text {
            text: text.to_string(),
            bold: true,
        });
        self
    }

    pub fn picture(mut self, handle: PictureHandle, width_inches: f64) -> Self {
        let (cx, cy) = scaled_extent(handle.width_px, handle.height_px, width_inches);
        self.inlines.push(Inline::Picture {
            media: handle.index,
            cx,
            cy,
        });
        self
    }

    /// Concatenated text of all runs, pictures skipped.
    pub fn plain_text(&self) -> String {
        self.inlines
            .iter()
            .filter_map(|inline| match inline {
                Inline::Text { text, .. } => Some(text.as_str()),
                Inline::Picture { .. } => None,
            })
            .collect()
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:p>");
        if let Some(align) = self.align {
            let _ = write!(out, r#"<w:pPr><w:jc w:val="{}"/></w:pPr>"#, align.as_str());
        }
        for inline in &self.inlines {
            match inline {
                Inline::Text { text, bold } => write_run(out, text, *bold),
                Inline::Picture { media, cx, cy } => write_drawing(out, *media, *cx, *cy),
            }
        }
        out.push_str("</w:p>");
    }
}

fn write_run(out: &mut String, text: &str, bold: bool) {
    out.push_str("<w:r>");
    if bold {
        out.push_str("<w:rPr><w:b/></w:rPr>");
    }
    // Word pastes soft line breaks as U+000B.
    for (i, line) in text.split(['\n', '\u{b}']).enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        let _ = write!(
            out,
            r#"<w:t xml:space="preserve">{}</w:t>"#,
            escape_xml(line)
        );
    }
    out.push_str("</w:r>");
}

fn write_drawing(out: &mut String, media: usize, cx: u64, cy: u64) {
    let id = media + 1;
    let _ = write!(
        out,
        concat!(
            r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="0" name="image{id}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
        ),
        cx = cx,
        cy = cy,
        id = id,
        rel = media_rel_id(media),
    );
}

fn media_rel_id(media: usize) -> String {
    format!("rIdMedia{}", media + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMerge {
    Restart,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    paragraphs: Vec<Paragraph>,
    span: usize,
    vmerge: Option<VMerge>,
    shading: Option<String>,
}

impl TableCell {
    pub fn new(paragraph: Paragraph) -> Self {
        Self {
            paragraphs: vec![paragraph],
            span: 1,
            vmerge: None,
            shading: None,
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(Paragraph::plain(text))
    }

    pub fn empty() -> Self {
        Self::new(Paragraph::new())
    }

    pub fn span(mut self, columns: usize) -> Self {
        self.span = columns.max(1);
        self
    }

    pub fn vmerge(mut self, merge: VMerge) -> Self {
        self.vmerge = Some(merge);
        self
    }

    /// Background fill as bare hex, e.g. `EDEDED`.
    pub fn shade(mut self, fill: impl Into<String>) -> Self {
        self.shading = Some(fill.into());
        self
    }

    pub fn span_len(&self) -> usize {
        self.span
    }

    pub fn shading(&self) -> Option<&str> {
        self.shading.as_deref()
    }

    pub fn merge(&self) -> Option<VMerge> {
        self.vmerge
    }

    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn write_xml(&self, out: &mut String, width: u32) {
        out.push_str("<w:tc><w:tcPr>");
        let _ = write!(out, r#"<w:tcW w:w="{width}" w:type="dxa"/>"#);
        if self.span > 1 {
            let _ = write!(out, r#"<w:gridSpan w:val="{}"/>"#, self.span);
        }
        match self.vmerge {
            Some(VMerge::Restart) => out.push_str(r#"<w:vMerge w:val="restart"/>"#),
            Some(VMerge::Continue) => out.push_str("<w:vMerge/>"),
            None => {}
        }
        if let Some(fill) = &self.shading {
            let _ = write!(
                out,
                r#"<w:shd w:val="clear" w:color="auto" w:fill="{}"/>"#,
                escape_xml(fill)
            );
        }
        out.push_str(r#"<w:vAlign w:val="center"/></w:tcPr>"#);
        if self.paragraphs.is_empty() {
            out.push_str("<w:p/>");
        }
        for paragraph in &self.paragraphs {
            paragraph.write_xml(out);
        }
        out.push_str("</w:tc>");
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    cells: Vec<TableCell>,
    header: bool,
}

impl TableRow {
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self {
            cells,
            header: false,
        }
    }

    /// Repeats the row at the top of each page.
    pub fn header(mut self) -> Self {
        self.header = true;
        self
    }

    pub fn cells(&self) -> &[TableCell] {
        &self.cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<u32>,
    rows: Vec<TableRow>,
    borders: bool,
}

impl Table {
    /// Column widths in twips.
    pub fn new(columns: Vec<u32>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            borders: true,
        }
    }

    pub fn borderless(mut self) -> Self {
        self.borders = false;
        self
    }

    pub fn push_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:tbl><w:tblPr>");
        let total: u32 = self.columns.iter().sum();
        let _ = write!(out, r#"<w:tblW w:w="{total}" w:type="dxa"/>"#);
        let border = if self.borders { "single" } else { "nil" };
        out.push_str("<w:tblBorders>");
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            let _ = write!(
                out,
                r#"<w:{edge} w:val="{border}" w:sz="4" w:space="0" w:color="000000"/>"#
            );
        }
        out.push_str(r#"</w:tblBorders><w:tblLayout w:type="fixed"/></w:tblPr><w:tblGrid>"#);
        for width in &self.columns {
            let _ = write!(out, r#"<w:gridCol w:w="{width}"/>"#);
        }
        out.push_str("</w:tblGrid>");

        for row in &self.rows {
            out.push_str("<w:tr>");
            if row.header {
                out.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            let mut column = 0usize;
            for cell in &row.cells {
                let end = (column + cell.span).min(self.columns.len());
                let width = self.columns.get(column..end).map(|w| w.iter().sum::<u32>()).unwrap_or(0);
                cell.write_xml(out, width);
                column += cell.span;
            }
            out.push_str("</w:tr>");
        }
        out.push_str("</w:tbl>");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// Reference to a picture registered with [`Document::add_picture`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PictureHandle {
    index: usize,
    width_px: u32,
    height_px: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
    media: Vec<Picture>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn add_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    pub fn add_picture(&mut self, picture: Picture) -> PictureHandle {
        let handle = PictureHandle {
            index: self.media.len(),
            width_px: picture.width_px,
            height_px: picture.height_px,
        };
        self.media.push(picture);
        handle
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn media_name(&self, index: usize) -> String {
        format!("image{}.{}", index + 1, self.media[index].format.extension())
    }

    pub fn document_xml(&self) -> String {
        let mut out = String::new();
        out.push_str(XML_HEADER);
        let _ = write!(out, "<w:document {NS_DECLS}><w:body>");
        for block in &self.blocks {
            match block {
                Block::Paragraph(paragraph) => paragraph.write_xml(&mut out),
                Block::Table(table) => {
                    table.write_xml(&mut out);
                    // Word merges adjacent tables unless a paragraph sits between them.
                    out.push_str("<w:p/>");
                }
            }
        }
        let _ = write!(
            out,
            concat!(
                r#"<w:sectPr><w:pgSz w:w="{w}" w:h="{h}"/>"#,
                r#"<w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" "#,
                r#"w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#
            ),
            w = PAGE_WIDTH,
            h = PAGE_HEIGHT,
            m = PAGE_MARGIN,
        );
        out.push_str("</w:body></w:document>");
        out
    }

    fn content_types_xml(&self) -> String {
        let mut out = String::new();
        out.push_str(XML_HEADER);
        out.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
        out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            if self.media.iter().any(|m| m.format == format) {
                let _ = write!(
                    out,
                    r#"<Default Extension="{}" ContentType="{}"/>"#,
                    format.extension(),
                    format.content_type()
                );
            }
        }
        out.push_str(r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
        out.push_str(r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
        out.push_str("</Types>");
        out
    }

    fn document_rels_xml(&self) -> String {
        let mut out = String::new();
        out.push_str(XML_HEADER);
        out.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        out.push_str(r#"<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
        for index in 0..self.media.len() {
            let _ = write!(
                out,
                r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
                media_rel_id(index),
                self.media_name(index)
            );
        }
        out.push_str("</Relationships>");
        out
    }

    /// Writes the whole package to `writer`.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> anyhow::Result<W> {
        let mut zip = ZipWriter::new(writer);
        let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts = [
            ("[Content_Types].xml", self.content_types_xml()),
            ("_rels/.rels", package_rels_xml()),
            ("word/document.xml", self.document_xml()),
            ("word/styles.xml", styles_xml()),
            ("word/_rels/document.xml.rels", self.document_rels_xml()),
        ];
        for (name, body) in parts {
            zip.start_file(name, opts)
                .with_context(|| format!("failed to start {name}"))?;
            zip.write_all(body.as_bytes())
                .with_context(|| format!("failed to write {name}"))?;
        }

        for (index, picture) in self.media.iter().enumerate() {
            let name = format!("word/media/{}", self.media_name(index));
            zip.start_file(name.as_str(), opts)
                .with_context(|| format!("failed to start {name}"))?;
            zip.write_all(&picture.data)
                .with_context(|| format!("failed to write {name}"))?;
        }

        zip.finish().context("failed to finish document package")
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create document {}", path.display()))?;
        let mut file = self.write_to(file)?;
        file.flush()
            .with_context(|| format!("failed to flush document {}", path.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to sync document {}", path.display()))?;
        Ok(())
    }
}

fn package_rels_xml() -> String {
    format!(
        concat!(
            "{}",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
            "</Relationships>"
        ),
        XML_HEADER
    )
}

/// Calibri 11 pt as the document default.
fn styles_xml() -> String {
    format!(
        concat!(
            "{}",
            r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            r#"<w:docDefaults><w:rPrDefault><w:rPr>"#,
            r#"<w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/>"#,
            r#"<w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="es-ES"/>"#,
            r#"</w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults>"#,
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#,
            r#"<w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/>"#,
            r#"<w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/>"#,
            r#"<w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/>"#,
            r#"</w:tblCellMar></w:tblPr></w:style>"#,
            "</w:styles>"
        ),
        XML_HEADER
    )
}
