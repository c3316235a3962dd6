//! Error types for the Sett engine
//!
//! Every variant aborts the whole operation it was raised in. The protocol
//! layer discards the staged state, so a caller never observes a partial
//! share burn, position change or asset transfer.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::access::Capability;
use crate::adapter::AdapterError;

/// Failure kinds surfaced by vault, controller and strategy entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Zero amount, or more than the relevant balance allows
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Caller is not authorized for this route
    #[error("Permission denied: {caller} cannot {action}")]
    PermissionDenied { caller: Address, action: String },

    /// Proceeds from the position fell below the tolerance floor
    #[error("Slippage exceeded: requested {requested}, received {received}, minimum {minimum}")]
    SlippageExceeded {
        requested: U256,
        received: U256,
        minimum: U256,
    },

    /// Attempt to sweep want, the LP component or the reward token
    #[error("Protected asset {asset} cannot be moved outside normal flows")]
    ProtectedAssetViolation { asset: Address },

    #[error("Position adapter failed: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl ProtocolError {
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        ProtocolError::InvalidAmount {
            reason: reason.into(),
        }
    }

    pub fn denied(caller: Address, action: impl Into<String>) -> Self {
        ProtocolError::PermissionDenied {
            caller,
            action: action.into(),
        }
    }

    pub fn missing_capability(caller: Address, capability: Capability) -> Self {
        Self::denied(caller, capability.to_string())
    }

    /// Short machine-readable kind, used by the journal
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::InvalidAmount { .. } => "INVALID_AMOUNT",
            ProtocolError::PermissionDenied { .. } => "PERMISSION_DENIED",
            ProtocolError::SlippageExceeded { .. } => "SLIPPAGE_EXCEEDED",
            ProtocolError::ProtectedAssetViolation { .. } => "PROTECTED_ASSET_VIOLATION",
            ProtocolError::Adapter(_) => "ADAPTER_FAILURE",
            ProtocolError::ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
        }
    }
}

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ProtocolError::invalid_amount("zero").kind(),
            "INVALID_AMOUNT"
        );
        assert_eq!(
            ProtocolError::denied(Address::ZERO, "withdraw").kind(),
            "PERMISSION_DENIED"
        );
        assert_eq!(
            ProtocolError::from(AdapterError::Unavailable("down".into())).kind(),
            "ADAPTER_FAILURE"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ProtocolError::SlippageExceeded {
            requested: U256::from(100u64),
            received: U256::from(90u64),
            minimum: U256::from(99u64),
        };
        assert_eq!(
            err.to_string(),
            "Slippage exceeded: requested 100, received 90, minimum 99"
        );
    }
}
