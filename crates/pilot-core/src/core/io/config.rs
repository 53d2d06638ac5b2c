use crate::core::models::run::RunConfiguration;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid configuration JSON in '{path}': {source}", path = path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

const INDENT: &[u8] = b"    ";

/// Serializes the configuration as 4-space indented JSON.
pub fn write_configuration_to(
    config: &RunConfiguration,
    writer: &mut impl Write,
) -> Result<(), serde_json::Error> {
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut *writer, PrettyFormatter::with_indent(INDENT));
    config.serialize(&mut serializer)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)
}

pub fn to_json_string(config: &RunConfiguration) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    write_configuration_to(config, &mut buffer)?;
    // serde_json only emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn write_configuration(config: &RunConfiguration, path: &Path) -> Result<(), ConfigFileError> {
    let io_err = |source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    write_configuration_to(config, &mut writer).map_err(|source| ConfigFileError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}

pub fn read_configuration_from(reader: impl Read) -> Result<RunConfiguration, serde_json::Error> {
    serde_json::from_reader(reader)
}

pub fn read_configuration(path: &Path) -> Result<RunConfiguration, ConfigFileError> {
    let file = File::open(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_configuration_from(BufReader::new(file)).map_err(|source| ConfigFileError::Json {
        path: path.to_path_buf(),
        source,
    })
}
