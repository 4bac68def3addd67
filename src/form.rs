use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::ValueEnum;

use crate::models::{StudentRecord, Trimester};

/// Student record fields editable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordField {
    Name,
    BirthDate,
    Course,
    Tutor,
    Specialist,
    Diagnosis,
    StartDate,
    Sessions,
    Situation,
    Attention,
    Observations,
    #[value(name = "trimester-1")]
    Trimester1,
    #[value(name = "trimester-2")]
    Trimester2,
    #[value(name = "trimester-3")]
    Trimester3,
    Signature,
    AcademicYear,
}

/// Accepts `YYYY-MM-DD` or `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .with_context(|| format!("invalid date '{raw}': use YYYY-MM-DD or DD/MM/YYYY"))
}

impl RecordField {
    pub fn apply(self, record: &mut StudentRecord, value: &str) -> anyhow::Result<()> {
        // Text areas accept `\n` typed literally on the command line.
        let text = value.replace("\\n", "\n");
        match self {
            RecordField::Name => record.name = text,
            RecordField::BirthDate => {
                record.birth_date = if value.trim().is_empty() {
                    None
                } else {
                    Some(parse_date(value)?)
                };
            }
            RecordField::Course => record.course = text,
            RecordField::Tutor => record.tutor = text,
            RecordField::Specialist => record.specialist = text,
            RecordField::Diagnosis => record.diagnosis = text,
            RecordField::StartDate => {
                if value.trim().is_empty() {
                    bail!("the start date cannot be cleared");
                }
                record.start_date = parse_date(value)?;
            }
            RecordField::Sessions => record.session_count = text,
            RecordField::Situation => record.current_situation = text,
            RecordField::Attention => record.specific_attention = text,
            RecordField::Observations => record.observations = text,
            RecordField::Trimester1 => {
                record.trimester_observations[Trimester::First.index()] = text
            }
            RecordField::Trimester2 => {
                record.trimester_observations[Trimester::Second.index()] = text
            }
            RecordField::Trimester3 => {
                record.trimester_observations[Trimester::Third.index()] = text
            }
            RecordField::Signature => record.signature = text,
            RecordField::AcademicYear => record.academic_year = text,
        }
        Ok(())
    }
}
