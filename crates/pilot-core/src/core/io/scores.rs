use super::traits::ResultFile;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreTableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Invalid {kind} in row {row}, column '{column}': '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        kind: &'static str,
        value: String,
    },
}

/// One molecule row of a score table such as `scaffold_memory.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMolecule {
    pub id: Option<String>,
    pub step: Option<usize>,
    pub cluster: Option<usize>,
    pub scaffold: Option<String>,
    pub smiles: String,
    pub total_score: Option<f64>,
    /// Transformed component scores keyed by column name.
    pub components: BTreeMap<String, f64>,
    /// Untransformed values from `raw_`-prefixed columns, keyed without the prefix.
    pub raw_components: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Ignored,
    Id,
    Step,
    Cluster,
    Scaffold,
    Smiles,
    TotalScore,
    Component,
    Raw,
}

const RAW_PREFIX: &str = "raw_";

fn classify(header: &str) -> Column {
    let trimmed = header.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "unnamed: 0" => Column::Ignored,
        "id" => Column::Id,
        "step" => Column::Step,
        "cluster" => Column::Cluster,
        "scaffold" => Column::Scaffold,
        "smiles" => Column::Smiles,
        "total_score" | "score" => Column::TotalScore,
        lower if lower.starts_with(RAW_PREFIX) => Column::Raw,
        _ => Column::Component,
    }
}

/// A header-driven view over the tool's CSV score outputs.
///
/// Column order is free and names are matched case-insensitively. Only a `SMILES`
/// column is required, so the same reader serves `memory.csv`, `scaffold_memory.csv`
/// and the tables written by scoring runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    pub component_names: Vec<String>,
    pub molecules: Vec<ScoredMolecule>,
}

impl ScoreTable {
    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn has_scaffolds(&self) -> bool {
        self.molecules.iter().any(|m| m.scaffold.is_some())
    }

    pub fn unique_smiles(&self) -> usize {
        self.molecules
            .iter()
            .map(|m| m.smiles.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Molecules sorted by descending total score; rows without a score sort last.
    pub fn ranked(&self) -> Vec<&ScoredMolecule> {
        let mut ranked: Vec<_> = self.molecules.iter().collect();
        ranked.sort_by(|a, b| match (a.total_score, b.total_score) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        ranked
    }

    pub fn top(&self, n: usize) -> Vec<&ScoredMolecule> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

fn parse_cell<T: std::str::FromStr>(
    value: &str,
    row: usize,
    column: &str,
    kind: &'static str,
) -> Result<Option<T>, ScoreTableError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| ScoreTableError::InvalidValue {
        row,
        column: column.to_string(),
        kind,
        value: value.to_string(),
    })
}

impl ResultFile for ScoreTable {
    type Error = ScoreTableError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self, Self::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(false)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let columns: Vec<Column> = headers.iter().map(classify).collect();
        if !columns.contains(&Column::Smiles) {
            return Err(ScoreTableError::MissingColumn("SMILES"));
        }

        let component_names = headers
            .iter()
            .zip(&columns)
            .filter(|(_, column)| **column == Column::Component)
            .map(|(name, _)| name.to_string())
            .collect();

        let mut molecules = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = index + 1;
            let mut molecule = ScoredMolecule {
                id: None,
                step: None,
                cluster: None,
                scaffold: None,
                smiles: String::new(),
                total_score: None,
                components: BTreeMap::new(),
                raw_components: BTreeMap::new(),
            };

            for ((name, column), value) in headers.iter().zip(&columns).zip(record.iter()) {
                let text = value.trim();
                match column {
                    Column::Ignored => {}
                    Column::Id => molecule.id = Some(text.to_string()).filter(|s| !s.is_empty()),
                    Column::Step => molecule.step = parse_cell(text, row, name, "integer")?,
                    Column::Cluster => molecule.cluster = parse_cell(text, row, name, "integer")?,
                    Column::Scaffold => {
                        molecule.scaffold = Some(text.to_string()).filter(|s| !s.is_empty())
                    }
                    Column::Smiles => molecule.smiles = text.to_string(),
                    Column::TotalScore => {
                        molecule.total_score = parse_cell(text, row, name, "number")?
                    }
                    Column::Component => {
                        if let Some(score) = parse_cell(text, row, name, "number")? {
                            molecule.components.insert(name.to_string(), score);
                        }
                    }
                    Column::Raw => {
                        if let Some(score) = parse_cell(text, row, name, "number")? {
                            let key = name.get(RAW_PREFIX.len()..).unwrap_or(name);
                            molecule.raw_components.insert(key.to_string(), score);
                        }
                    }
                }
            }
            molecules.push(molecule);
        }

        Ok(Self {
            component_names,
            molecules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SCAFFOLD_MEMORY: &str = "\
,Step,Scaffold,SMILES,Matching substructure,QED Score,raw_QED Score,total_score,ID
0,3,c1ccccc1,Cc1ccccc1,1.0,0.45,0.45,0.45,demo_0
1,7,c1ccncc1,CCc1ccncc1,1.0,0.71,0.71,0.71,demo_1
2,7,c1ccccc1,OCc1ccccc1,0.5,,0.52,,demo_2
";

    #[test]
    fn scaffold_memory_columns_are_classified() {
        let table = ScoreTable::parse_str(SCAFFOLD_MEMORY).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.component_names,
            vec!["Matching substructure", "QED Score"]
        );
        let first = &table.molecules[0];
        assert_eq!(first.step, Some(3));
        assert_eq!(first.scaffold.as_deref(), Some("c1ccccc1"));
        assert_eq!(first.smiles, "Cc1ccccc1");
        assert_eq!(first.total_score, Some(0.45));
        assert_eq!(first.id.as_deref(), Some("demo_0"));
        assert_eq!(first.raw_components["QED Score"], 0.45);
        assert!(table.has_scaffolds());
    }

    #[test]
    fn empty_cells_are_absent_values() {
        let table = ScoreTable::parse_str(SCAFFOLD_MEMORY).unwrap();
        let third = &table.molecules[2];
        assert_eq!(third.total_score, None);
        assert!(!third.components.contains_key("QED Score"));
        assert_eq!(third.components["Matching substructure"], 0.5);
    }

    #[test]
    fn ranking_puts_unscored_rows_last() {
        let table = ScoreTable::parse_str(SCAFFOLD_MEMORY).unwrap();
        let ranked: Vec<_> = table.ranked().iter().map(|m| m.smiles.as_str()).collect();
        assert_eq!(ranked, vec!["CCc1ccncc1", "Cc1ccccc1", "OCc1ccccc1"]);
        assert_eq!(table.top(1)[0].smiles, "CCc1ccncc1");
        assert_eq!(table.unique_smiles(), 3);
    }

    #[test]
    fn column_order_and_case_are_free() {
        let csv = "score,smiles,step\n0.9,CCO,1\n";
        let table = ScoreTable::parse_str(csv).unwrap();
        assert_eq!(table.molecules[0].smiles, "CCO");
        assert_eq!(table.molecules[0].total_score, Some(0.9));
        assert_eq!(table.molecules[0].step, Some(1));
        assert!(table.component_names.is_empty());
        assert!(!table.has_scaffolds());
    }

    #[test]
    fn missing_smiles_column_is_rejected() {
        let err = ScoreTable::parse_str("Step,Score\n1,0.5\n").unwrap_err();
        assert!(matches!(err, ScoreTableError::MissingColumn("SMILES")));
    }

    #[test]
    fn non_numeric_scores_name_row_and_column() {
        let err = ScoreTable::parse_str("SMILES,total_score\nCCO,0.4\nCCN,high\n").unwrap_err();
        match err {
            ScoreTableError::InvalidValue { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "total_score");
                assert_eq!(value, "high");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.csv");
        fs::write(&path, SCAFFOLD_MEMORY).unwrap();
        let table = ScoreTable::read_from_path(&path).unwrap();
        assert_eq!(table.len(), 3);
    }
}
