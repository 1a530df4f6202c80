use thiserror::Error;

use crate::model::{AppSettingsError, DocumentError, RulesError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] AppSettingsError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Rules(#[from] RulesError),
}
