use chrono::{Datelike, Local, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Progress stages, ordered from no progress to complete.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    NotStarted,
    NeedsImprovement,
    Progressing,
    Achieved,
}

impl Tier {
    pub const ALL: [Tier; 4] = [
        Tier::NotStarted,
        Tier::NeedsImprovement,
        Tier::Progressing,
        Tier::Achieved,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tier::NotStarted => "SIN INICIAR",
            Tier::NeedsImprovement => "NECESITA MEJORAR",
            Tier::Progressing => "ESTÁ PROGRESANDO",
            Tier::Achieved => "CONSEGUIDO",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Trimester {
    #[value(alias = "1")]
    First,
    #[value(alias = "2")]
    Second,
    #[value(alias = "3")]
    Third,
}

impl Trimester {
    pub const ALL: [Trimester; 3] = [Trimester::First, Trimester::Second, Trimester::Third];

    pub fn label(self) -> &'static str {
        match self {
            Trimester::First => "1ºT",
            Trimester::Second => "2ºT",
            Trimester::Third => "3ºT",
        }
    }

    /// Heading used for the per-trimester observation paragraphs.
    pub fn observation_label(self) -> &'static str {
        match self {
            Trimester::First => "Observaciones 1º Trimestre",
            Trimester::Second => "Observaciones 2º Trimestre",
            Trimester::Third => "Observaciones 3º Trimestre",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Lower-cased glyphs that count as a presence mark.
pub const MARK_GLYPHS: [&str; 6] = ["x", "❌", "✖", "✕", "✗", "✘"];

pub const CANONICAL_MARK: &str = "X";

/// Classified content of one tracking cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Empty,
    Marked,
    Annotated(String),
}

impl CellValue {
    pub fn classify(raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        let folded = trimmed.to_lowercase();
        if MARK_GLYPHS.contains(&folded.as_str()) {
            CellValue::Marked
        } else {
            CellValue::Annotated(trimmed.to_string())
        }
    }

    pub fn display(&self) -> &str {
        match self {
            CellValue::Empty => "",
            CellValue::Marked => CANONICAL_MARK,
            CellValue::Annotated(text) => text.as_str(),
        }
    }
}

/// Display text for a raw cell, as shown in both the preview and the document.
pub fn normalize(raw: &str) -> String {
    CellValue::classify(raw).display().to_string()
}

pub const DEFAULT_SIGNATURE_ROLE: &str = "Maestra de Audición y Lenguaje";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub tutor: String,
    #[serde(default)]
    pub specialist: String,
    #[serde(default)]
    pub diagnosis: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub session_count: String,
    #[serde(default)]
    pub current_situation: String,
    #[serde(default)]
    pub specific_attention: String,
    #[serde(default)]
    pub observations: String,
    #[serde(default)]
    pub trimester_observations: [String; 3],
    #[serde(default)]
    pub signature: String,
    pub academic_year: String,
}

impl StudentRecord {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            name: String::new(),
            birth_date: None,
            course: String::new(),
            tutor: String::new(),
            specialist: String::new(),
            diagnosis: String::new(),
            start_date: today,
            session_count: String::new(),
            current_situation: String::new(),
            specific_attention: String::new(),
            observations: String::new(),
            trimester_observations: Default::default(),
            signature: String::new(),
            academic_year: default_academic_year(today),
        }
    }

    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn trimester_observation(&self, trimester: Trimester) -> &str {
        &self.trimester_observations[trimester.index()]
    }

    /// The two signature lines; each missing line falls back on its own.
    pub fn signature_lines(&self) -> (String, String) {
        let mut lines = self.signature.lines().map(str::trim);
        let first = lines
            .next()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if self.specialist.trim().is_empty() {
                    DEFAULT_SIGNATURE_ROLE.to_string()
                } else {
                    self.specialist.trim().to_string()
                }
            });
        let second = lines
            .next()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_SIGNATURE_ROLE.to_string());
        (first, second)
    }
}

pub fn default_academic_year(today: NaiveDate) -> String {
    format!("{}-{}", today.year(), today.year() + 1)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Labeled rows of the student data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataField {
    Name,
    BirthDate,
    Course,
    Tutor,
    Specialist,
    Diagnosis,
    StartDate,
    SessionCount,
}

impl MetadataField {
    pub fn label(self) -> &'static str {
        match self {
            MetadataField::Name => "ALUMNO/A",
            MetadataField::BirthDate => "FECHA DE NACIMIENTO",
            MetadataField::Course => "CURSO",
            MetadataField::Tutor => "TUTOR/A",
            MetadataField::Specialist => "MAESTRA AL",
            MetadataField::Diagnosis => "DIAGNÓSTICO",
            MetadataField::StartDate => "FECHA DE INICIO",
            MetadataField::SessionCount => "NÚMERO DE SESIONES",
        }
    }

    pub fn value(self, record: &StudentRecord) -> String {
        match self {
            MetadataField::Name => record.name.clone(),
            MetadataField::BirthDate => record.birth_date.map(format_date).unwrap_or_default(),
            MetadataField::Course => record.course.clone(),
            MetadataField::Tutor => record.tutor.clone(),
            MetadataField::Specialist => record.specialist.clone(),
            MetadataField::Diagnosis => record.diagnosis.clone(),
            MetadataField::StartDate => format_date(record.start_date),
            MetadataField::SessionCount => record.session_count.clone(),
        }
    }
}

/// Free-text fields rendered as their own numbered section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextSection {
    Situation,
    SpecificAttention,
    SessionCount,
    Observations,
}

impl TextSection {
    pub fn heading(self) -> &'static str {
        match self {
            TextSection::Situation => "SITUACIÓN ACTUAL",
            TextSection::SpecificAttention => "ATENCIÓN EDUCATIVA ESPECÍFICA",
            TextSection::SessionCount => "NÚMERO DE SESIONES",
            TextSection::Observations => "OBSERVACIONES",
        }
    }

    pub fn text(self, record: &StudentRecord) -> &str {
        match self {
            TextSection::Situation => &record.current_situation,
            TextSection::SpecificAttention => &record.specific_attention,
            TextSection::SessionCount => &record.session_count,
            TextSection::Observations => &record.observations,
        }
    }
}
