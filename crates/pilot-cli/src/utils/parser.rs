use crate::cli::EpochArgs;
use reinvent_pilot::core::io::transcript::EpochSelection;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidKeyValue(String),

    #[error("Invalid number '{value}' in list '{list}'.")]
    InvalidNumber { list: String, value: String },

    #[error("Invalid range '{range}' in list '{list}'. Expected START-END with START <= END.")]
    InvalidRange { list: String, range: String },

    #[error("--every must be greater than zero.")]
    ZeroStride,
}

/// Splits `KEY=VALUE` at the first `=`. The key must not be empty; the value may be.
pub fn parse_key_value(pair: &str) -> Result<(&str, &str), ParseError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ParseError::InvalidKeyValue(pair.to_string())),
    }
}

/// Parses a comma-separated list of numbers and inclusive ranges, e.g. `0,10,20-25`.
pub fn parse_index_list(list: &str) -> Result<Vec<usize>, ParseError> {
    let number = |value: &str| {
        value.trim().parse::<usize>().map_err(|_| ParseError::InvalidNumber {
            list: list.to_string(),
            value: value.trim().to_string(),
        })
    };

    let mut indices = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(ParseError::InvalidRange {
                        list: list.to_string(),
                        range: item.to_string(),
                    });
                }
                indices.extend(start..=end);
            }
            None => indices.push(number(item)?),
        }
    }
    Ok(indices)
}

impl EpochArgs {
    pub fn selection(&self) -> Result<EpochSelection, ParseError> {
        if let Some(list) = &self.epochs {
            return Ok(EpochSelection::Steps(parse_index_list(list)?));
        }
        if let Some(list) = &self.positions {
            return Ok(EpochSelection::Positions(parse_index_list(list)?));
        }
        if let Some(n) = self.every {
            if n == 0 {
                return Err(ParseError::ZeroStride);
            }
            return Ok(EpochSelection::Every(n));
        }
        Ok(self.last.map_or(EpochSelection::All, EpochSelection::Last))
    }
}
