#![forbid(unsafe_code)]

use cafe_kernel_contracts::interaction::InteractionRecord;

use crate::interaction_log::StorageError;

/// Append-only interaction log. Implementations are shared across request
/// threads, so appends take `&self`.
pub trait InteractionLogRepo: Send + Sync {
    fn append_interaction_row(&self, record: &InteractionRecord) -> Result<(), StorageError>;

    /// Rows of one session in append order.
    fn interaction_rows_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<InteractionRecord>, StorageError>;
}
