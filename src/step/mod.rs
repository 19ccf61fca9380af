//! # Step Contract
//!
//! The shape every step handler satisfies: static metadata describing how the host
//! matches and feeds the step, and one async execution method producing a
//! [`StepOutcome`].
//!
//! ## Error policy
//!
//! `execute_step` returns an outcome, not a `Result`. Vendor failures, bad input and
//! operator errors all become ERROR outcomes inside the handler; nothing escapes.

pub mod data;
pub mod definition;
pub mod outcome;

pub use data::{StepData, StepInputError, StepInvocation, STEP_ORDER_KEY};
pub use definition::{
    FieldSpec, FieldType, Optionality, RecordShape, RecordSpec, StepDescriptor, StepType,
};
pub use outcome::{Outcome, RecordPayload, ResultRecord, StepOutcome};

use async_trait::async_trait;
use serde_json::Value;

/// A single automation step the Cog can run.
#[async_trait]
pub trait CogStep: Send + Sync {
    /// Static metadata; identical for every instance.
    fn definition(&self) -> StepDescriptor;

    async fn execute_step(&self, invocation: &StepInvocation) -> StepOutcome;

    fn step_id(&self) -> String {
        self.definition().step_id
    }
}

/// ERROR outcome for input that does not match the step's declared fields.
pub fn input_error(error: &StepInputError) -> StepOutcome {
    StepOutcome::error("Invalid step input: %s", vec![Value::String(error.to_string())])
}
