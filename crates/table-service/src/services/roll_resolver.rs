//! Roll resolution.
//!
//! Turns a loaded table into one value per column:
//!
//! - `row` mode draws a single row and reads every column from it.
//! - `column` mode draws each column independently from all values stored
//!   for that column, so the combination need not match any existing row.
//!
//! Overrides are applied afterwards by case-insensitive column name.
//! Missing data resolves to the empty string rather than failing.
//!
//! The random source is injected at construction and guarded by a mutex so
//! a single resolver can be shared by every request handler. The lock is
//! held only for the synchronous draw, never across an `.await`.

use crate::errors::TableError;
use crate::models::{ColumnOverride, RollMode, TableAggregate};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Mutex;
use uuid::Uuid;

/// One resolved column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub column_id: Uuid,
    pub value: String,
}

/// Column id to value mapping, in the table's column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub mode: RollMode,
    pub values: Vec<ResolvedValue>,
}

impl Resolution {
    /// Value resolved for `column_id`, if the column was part of the roll.
    pub fn get(&self, column_id: Uuid) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.column_id == column_id)
            .map(|v| v.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn set(&mut self, column_id: Uuid, value: &str) {
        if let Some(slot) = self.values.iter_mut().find(|v| v.column_id == column_id) {
            slot.value = value.to_string();
        }
    }
}

/// Resolves rolls against loaded tables using an injected RNG.
pub struct RollResolver<R = StdRng> {
    rng: Mutex<R>,
}

impl RollResolver<StdRng> {
    /// Resolver with a deterministic sequence for `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Resolver seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Seeded when `seed` is set, otherwise from entropy.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: RngCore> RollResolver<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Resolve one value per column of `table`, then apply `overrides`.
    ///
    /// # Errors
    ///
    /// - `TableError::InvalidState` - table has no columns or no rows
    /// - `TableError::BadRequest` - mode is neither `row` nor `column`
    /// - `TableError::Internal` - the RNG lock was poisoned
    pub fn resolve(
        &self,
        table: &TableAggregate,
        mode: &str,
        overrides: &[ColumnOverride],
    ) -> Result<Resolution, TableError> {
        if table.columns.is_empty() {
            return Err(TableError::InvalidState(
                "The table has no columns defined.".to_string(),
            ));
        }

        if table.rows.is_empty() {
            return Err(TableError::InvalidState(
                "The table has no rows defined.".to_string(),
            ));
        }

        let mode: RollMode = mode.parse()?;

        let mut resolution = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| TableError::Internal("roll RNG lock poisoned".to_string()))?;

            match mode {
                RollMode::Row => resolve_row(table, &mut *rng),
                RollMode::Column => resolve_column(table, &mut *rng),
            }
        };

        for ovrd in overrides {
            if let Some(column) = table.column_by_name(&ovrd.column) {
                resolution.set(column.column_id, &ovrd.value);
            }
        }

        Ok(resolution)
    }
}

fn resolve_row<R: RngCore>(table: &TableAggregate, rng: &mut R) -> Resolution {
    let index = rng.gen_range(0..table.rows.len());
    let row = table.rows.get(index);

    let values = table
        .columns
        .iter()
        .map(|column| ResolvedValue {
            column_id: column.column_id,
            value: row
                .and_then(|r| r.value_for(column.column_id))
                .unwrap_or_default()
                .to_string(),
        })
        .collect();

    Resolution {
        mode: RollMode::Row,
        values,
    }
}

fn resolve_column<R: RngCore>(table: &TableAggregate, rng: &mut R) -> Resolution {
    let values = table
        .columns
        .iter()
        .map(|column| {
            let pool: Vec<&str> = table
                .rows
                .iter()
                .flat_map(|row| row.values.iter())
                .filter(|v| v.column_id == column.column_id)
                .map(|v| v.value.as_str())
                .collect();

            let value = if pool.is_empty() {
                String::new()
            } else {
                let index = rng.gen_range(0..pool.len());
                pool.get(index).copied().unwrap_or_default().to_string()
            };

            ResolvedValue {
                column_id: column.column_id,
                value,
            }
        })
        .collect();

    Resolution {
        mode: RollMode::Column,
        values,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::{ColumnRecord, RowRecord, RowValueRecord, TableRecord};
    use chrono::Utc;
    use rand::rngs::mock::StepRng;
    use std::collections::HashSet;

    /// Build a table whose cell (row i, column c) holds "{c} Value {i+1}".
    fn table(column_names: &[&str], row_count: usize) -> TableAggregate {
        let table_id = Uuid::new_v4();
        let columns: Vec<ColumnRecord> = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnRecord {
                column_id: Uuid::new_v4(),
                table_id,
                name: (*name).to_string(),
                column_type: "text".to_string(),
                position: i as i32,
            })
            .collect();

        let rows = (0..row_count)
            .map(|i| {
                let row_id = Uuid::new_v4();
                RowRecord {
                    row_id,
                    table_id,
                    position: i as i32,
                    values: columns
                        .iter()
                        .map(|c| RowValueRecord {
                            value_id: Uuid::new_v4(),
                            row_id,
                            column_id: c.column_id,
                            value: format!("{} Value {}", c.name, i + 1),
                        })
                        .collect(),
                }
            })
            .collect();

        TableAggregate {
            table: TableRecord {
                table_id,
                title: "Test Table".to_string(),
                source: String::new(),
                license: String::new(),
                description: String::new(),
                dice_range: "1d6".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            columns,
            rows,
            tags: Vec::new(),
        }
    }

    /// RNG whose every draw is the first index.
    fn first_index() -> RollResolver<StepRng> {
        RollResolver::new(StepRng::new(0, 0))
    }

    #[test]
    fn test_row_mode_returns_every_column_from_one_row() {
        let t = table(&["Encounter", "Environment"], 3);
        let resolver = RollResolver::seeded(7);

        for _ in 0..20 {
            let resolution = resolver.resolve(&t, "row", &[]).unwrap();
            assert_eq!(resolution.len(), 2);
            assert!(resolution.values.iter().all(|v| !v.value.is_empty()));

            // Both values must carry the same row number.
            let suffixes: HashSet<&str> = resolution
                .values
                .iter()
                .map(|v| v.value.rsplit(' ').next().unwrap())
                .collect();
            assert_eq!(suffixes.len(), 1, "row mode mixed rows: {:?}", resolution);
        }
    }

    #[test]
    fn test_row_mode_with_first_index_rng_picks_first_row() {
        let t = table(&["Encounter", "Environment"], 3);
        let resolution = first_index().resolve(&t, "ROW", &[]).unwrap();

        assert_eq!(resolution.mode, RollMode::Row);
        assert_eq!(resolution.values[0].value, "Encounter Value 1");
        assert_eq!(resolution.values[1].value, "Environment Value 1");
    }

    #[test]
    fn test_column_mode_draws_from_each_columns_own_pool() {
        let t = table(&["Encounter", "Environment", "Loot"], 4);
        let resolver = RollResolver::seeded(11);

        for _ in 0..20 {
            let resolution = resolver.resolve(&t, "column", &[]).unwrap();
            assert_eq!(resolution.len(), 3);
            for (value, column) in resolution.values.iter().zip(&t.columns) {
                assert_eq!(value.column_id, column.column_id);
                assert!(
                    value.value.starts_with(&format!("{} Value ", column.name)),
                    "value {:?} not drawn from column {}",
                    value.value,
                    column.name
                );
            }
        }
    }

    #[test]
    fn test_column_mode_empty_pool_yields_empty_string() {
        let mut t = table(&["Encounter", "Environment"], 2);
        let environment = t.columns[1].column_id;
        for row in &mut t.rows {
            row.values.retain(|v| v.column_id != environment);
        }

        let resolution = RollResolver::seeded(3).resolve(&t, "column", &[]).unwrap();
        assert_eq!(resolution.get(environment), Some(""));
        assert!(!resolution.get(t.columns[0].column_id).unwrap().is_empty());
    }

    #[test]
    fn test_row_mode_missing_value_yields_empty_string() {
        let mut t = table(&["Encounter", "Environment"], 1);
        let environment = t.columns[1].column_id;
        t.rows[0].values.retain(|v| v.column_id != environment);

        let resolution = first_index().resolve(&t, "row", &[]).unwrap();
        assert_eq!(resolution.len(), 2);
        assert_eq!(resolution.get(environment), Some(""));
    }

    #[test]
    fn test_row_mode_duplicate_values_take_first() {
        let mut t = table(&["Encounter"], 1);
        let column_id = t.columns[0].column_id;
        let row_id = t.rows[0].row_id;
        t.rows[0].values.push(RowValueRecord {
            value_id: Uuid::new_v4(),
            row_id,
            column_id,
            value: "Shadowed duplicate".to_string(),
        });

        let resolution = first_index().resolve(&t, "row", &[]).unwrap();
        assert_eq!(resolution.get(column_id), Some("Encounter Value 1"));
    }

    #[test]
    fn test_override_applies_in_both_modes() {
        let t = table(&["Encounter", "Environment"], 5);
        let resolver = RollResolver::seeded(99);
        let overrides = [ColumnOverride::new("encounter", "X")];
        let encounter = t.columns[0].column_id;

        for mode in ["row", "column"] {
            for _ in 0..10 {
                let resolution = resolver.resolve(&t, mode, &overrides).unwrap();
                assert_eq!(resolution.get(encounter), Some("X"));
            }
        }
    }

    #[test]
    fn test_unknown_override_is_ignored_and_last_override_wins() {
        let t = table(&["Encounter"], 1);
        let overrides = [
            ColumnOverride::new("Weather", "Rain"),
            ColumnOverride::new("Encounter", "First"),
            ColumnOverride::new("ENCOUNTER", "Second"),
        ];

        let resolution = first_index().resolve(&t, "row", &overrides).unwrap();
        assert_eq!(resolution.len(), 1);
        assert_eq!(resolution.values[0].value, "Second");
    }

    #[test]
    fn test_same_seed_same_resolution() {
        let t = table(&["Encounter", "Environment"], 6);
        let a = RollResolver::seeded(1234);
        let b = RollResolver::seeded(1234);

        for mode in ["row", "column", "row"] {
            assert_eq!(
                a.resolve(&t, mode, &[]).unwrap(),
                b.resolve(&t, mode, &[]).unwrap()
            );
        }
    }

    #[test]
    fn test_zero_columns_is_invalid_state() {
        let t = table(&[], 2);
        let err = first_index().resolve(&t, "row", &[]).unwrap_err();
        assert!(matches!(err, TableError::InvalidState(msg) if msg.contains("no columns")));
    }

    #[test]
    fn test_zero_rows_is_invalid_state() {
        let t = table(&["Encounter"], 0);
        let err = first_index().resolve(&t, "row", &[]).unwrap_err();
        assert!(matches!(err, TableError::InvalidState(msg) if msg.contains("no rows")));
    }

    #[test]
    fn test_unknown_mode_is_bad_request() {
        let t = table(&["Encounter"], 1);
        let err = first_index().resolve(&t, "diagonal", &[]).unwrap_err();
        assert!(matches!(err, TableError::BadRequest(_)));
    }
}
