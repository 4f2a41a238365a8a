/// What the gateway reported for a transaction. Drives the terminal transition of the
/// reconciliation state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The gateway confirmed payment. Carries the transaction reference assigned on their side.
    Success { external_ref: Option<String> },
    /// The gateway rejected the payment, or the user abandoned it.
    Failure,
}

impl Settlement {
    pub fn is_success(&self) -> bool {
        matches!(self, Settlement::Success { .. })
    }
}
