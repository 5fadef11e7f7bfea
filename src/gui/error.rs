use std::{error::Error, fmt::Display};

#[derive(Debug)]
pub enum TactGuiError {
    IOError(std::io::Error),
}

impl Display for TactGuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#?}", self)
    }
}

impl Error for TactGuiError {}

impl From<std::io::Error> for TactGuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}
