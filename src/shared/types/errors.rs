use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Event occurrence {occurrence_id} has no remaining capacity")]
    CapacityExceeded { occurrence_id: Uuid },

    #[error("{entity} {id} is already cancelled")]
    AlreadyCancelled { entity: &'static str, id: Uuid },

    #[error("Protected window: {0}")]
    ProtectedWindow(String),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            DomainError::Internal(_) => true,
            DomainError::Processor(e) => e.is_transient(),
            _ => false,
        }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        DomainError::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }
}

/// Failures reported by (or while talking to) the payment processor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("payment method required for booking")]
    PaymentMethodRequired,

    /// Card declined or otherwise rejected in a way the payer can fix.
    #[error("payment declined: {message}")]
    Declined {
        code: Option<String>,
        message: String,
    },

    #[error("payment method {0} is not attached to a customer")]
    PaymentMethodNotAttached(String),

    /// Processor refused the request (already captured, unknown intent, ...).
    #[error("processor rejected request: {0}")]
    InvalidRequest(String),

    #[error("processor call timed out after {0}s")]
    Timeout(u64),

    #[error("processor unreachable: {0}")]
    Transport(String),

    #[error("processor returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The processor answered with data that breaks a money invariant.
    #[error("inconsistent processor response: {0}")]
    Inconsistent(String),
}

impl ProcessorError {
    pub fn is_transient(&self) -> bool {
        match self {
            ProcessorError::Timeout(_) | ProcessorError::Transport(_) => true,
            ProcessorError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Errors the payer can resolve themselves (different card, add a card).
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            ProcessorError::PaymentMethodRequired | ProcessorError::Declined { .. }
        )
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Internal(format!("Database error: {}", e))
    }
}
