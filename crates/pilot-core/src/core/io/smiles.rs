use super::traits::ResultFile;
use std::collections::HashSet;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmilesFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid likelihood on line {line}: '{value}'")]
    InvalidLikelihood { line: usize, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampledMolecule {
    pub smiles: String,
    /// Negative log-likelihood under the sampling model, when it was requested.
    pub nll: Option<f64>,
}

/// SMILES written by sampling runs, one per line with an optional likelihood column.
/// Plain SMILES input files read the same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledSmiles {
    pub molecules: Vec<SampledMolecule>,
}

impl SampledSmiles {
    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn unique(&self) -> usize {
        self.molecules
            .iter()
            .map(|m| m.smiles.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn mean_nll(&self) -> Option<f64> {
        let values: Vec<f64> = self.molecules.iter().filter_map(|m| m.nll).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

impl ResultFile for SampledSmiles {
    type Error = SmilesFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self, Self::Error> {
        let mut molecules = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(smiles) = fields.next() else {
                continue;
            };
            let nll = match fields.next() {
                Some(value) => Some(value.parse().map_err(|_| {
                    SmilesFileError::InvalidLikelihood {
                        line: index + 1,
                        value: value.to_string(),
                    }
                })?),
                None => None,
            };
            molecules.push(SampledMolecule {
                smiles: smiles.to_string(),
                nll,
            });
        }
        Ok(Self { molecules })
    }
}
