use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CellValue, Tier, Trimester};

pub const OBJECTIVE_COLUMN: &str = "Objetivo";

pub const DATA_COLUMNS: usize = Tier::ALL.len() * Trimester::ALL.len();

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("row {row} out of range: the grid has {rows} objectives")]
    RowOutOfRange { row: usize, rows: usize },
}

/// One objective and its raw tracking cells, tier-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub objective: String,
    pub cells: Vec<String>,
}

impl GridRow {
    fn new(objective: String) -> Self {
        Self {
            objective,
            cells: vec![String::new(); DATA_COLUMNS],
        }
    }

    pub fn raw(&self, tier: Tier, trimester: Trimester) -> &str {
        self.cells
            .get(cell_index(tier, trimester))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn value(&self, tier: Tier, trimester: Trimester) -> CellValue {
        CellValue::classify(self.raw(tier, trimester))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<GridRow>,
}

/// Position of a (tier, trimester) pair among the data columns.
pub fn cell_index(tier: Tier, trimester: Trimester) -> usize {
    tier.index() * Trimester::ALL.len() + trimester.index()
}

/// Every (tier, trimester) pair in column order.
pub fn column_keys() -> impl Iterator<Item = (Tier, Trimester)> {
    Tier::ALL
        .into_iter()
        .flat_map(|tier| Trimester::ALL.into_iter().map(move |trimester| (tier, trimester)))
}

pub fn column_names() -> Vec<String> {
    std::iter::once(OBJECTIVE_COLUMN.to_string())
        .chain(
            column_keys().map(|(tier, trimester)| format!("{} {}", tier.label(), trimester.label())),
        )
        .collect()
}

impl Grid {
    pub fn build(objectives: &[String]) -> Self {
        Self {
            rows: objectives.iter().cloned().map(GridRow::new).collect(),
        }
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        tier: Tier,
        trimester: Trimester,
        value: &str,
    ) -> Result<(), GridError> {
        let target = self.row_mut(row)?;
        // Rows loaded from an older session may be short.
        target.cells.resize(DATA_COLUMNS, String::new());
        target.cells[cell_index(tier, trimester)] = value.to_string();
        Ok(())
    }

    pub fn push_row(&mut self, objective: &str) {
        self.rows.push(GridRow::new(objective.to_string()));
    }

    pub fn remove_row(&mut self, row: usize) -> Result<GridRow, GridError> {
        self.check_row(row)?;
        Ok(self.rows.remove(row))
    }

    pub fn rename_objective(&mut self, row: usize, objective: &str) -> Result<(), GridError> {
        self.row_mut(row)?.objective = objective.to_string();
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<(), GridError> {
        if row < self.rows.len() {
            Ok(())
        } else {
            Err(GridError::RowOutOfRange {
                row,
                rows: self.rows.len(),
            })
        }
    }

    fn row_mut(&mut self, row: usize) -> Result<&mut GridRow, GridError> {
        self.check_row(row)?;
        Ok(&mut self.rows[row])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objectives(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn grid_has_one_row_per_objective_and_thirteen_columns() {
        for k in [0usize, 1, 7] {
            let items: Vec<String> = (0..k).map(|i| format!("Objetivo {i}")).collect();
            let grid = Grid::build(&items);
            assert_eq!(grid.len(), k);
            for row in grid.rows() {
                assert_eq!(1 + row.cells.len(), 13);
                assert!(row.cells.iter().all(String::is_empty));
            }
        }
        assert_eq!(column_names().len(), 13);
    }

    #[test]
    fn column_names_are_tier_major() {
        let names = column_names();
        assert_eq!(names[0], "Objetivo");
        assert_eq!(names[1], "SIN INICIAR 1ºT");
        assert_eq!(names[3], "SIN INICIAR 3ºT");
        assert_eq!(names[4], "NECESITA MEJORAR 1ºT");
        assert_eq!(names[12], "CONSEGUIDO 3ºT");

        let mut expected = vec!["Objetivo".to_string()];
        for tier in Tier::ALL {
            for trimester in Trimester::ALL {
                expected.push(format!("{} {}", tier.label(), trimester.label()));
            }
        }
        assert_eq!(names, expected);
    }

    #[test]
    fn set_cell_targets_single_column() {
        let mut grid = Grid::build(&objectives(&["A", "B"]));
        grid.set_cell(1, Tier::Progressing, Trimester::Second, "x")
            .unwrap();

        let row = &grid.rows()[1];
        assert_eq!(row.raw(Tier::Progressing, Trimester::Second), "x");
        assert_eq!(row.value(Tier::Progressing, Trimester::Second), CellValue::Marked);
        assert_eq!(row.cells.iter().filter(|c| !c.is_empty()).count(), 1);
        assert!(grid.rows()[0].cells.iter().all(String::is_empty));
    }

    #[test]
    fn out_of_range_rows_are_rejected() {
        let mut grid = Grid::build(&objectives(&["A"]));
        assert_eq!(
            grid.set_cell(3, Tier::Achieved, Trimester::Third, "x"),
            Err(GridError::RowOutOfRange { row: 3, rows: 1 })
        );
        assert!(grid.remove_row(1).is_err());
        assert!(grid.rename_objective(2, "C").is_err());
    }

    #[test]
    fn rows_can_be_added_renamed_and_removed() {
        let mut grid = Grid::build(&objectives(&["A"]));
        grid.push_row("B");
        grid.rename_objective(0, "A'").unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.rows()[1].cells.len(), DATA_COLUMNS);

        let removed = grid.remove_row(0).unwrap();
        assert_eq!(removed.objective, "A'");
        assert_eq!(grid.rows()[0].objective, "B");
    }
}
