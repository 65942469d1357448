//! Client error type.

use crate::{
    format::{self, PrecisionLossError},
    normalize::InvalidInputError,
    subscription::registry::UnknownSubscriptionError,
    transport::TransportError,
};
use thiserror::Error;

/// An error performing a client operation.
#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    PrecisionLoss(#[from] PrecisionLossError),
    #[error(transparent)]
    UnknownSubscription(#[from] UnknownSubscriptionError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<format::Error> for Error {
    fn from(err: format::Error) -> Self {
        match err {
            format::Error::InvalidInput(err) => Self::InvalidInput(err),
            format::Error::PrecisionLoss(err) => Self::PrecisionLoss(err),
        }
    }
}
