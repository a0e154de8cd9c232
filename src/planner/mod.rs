//! Question → device command planning.
//!
//! The model is shown the testbed's device names and asked for a single JSON
//! object naming one device, one show command and the intent behind it. The
//! reply is recovered with [`extract_json_object`], decoded and checked
//! against the testbed before anything downstream sees it.

pub mod errors;
pub mod extract;
pub mod plan;
pub mod prompt;
pub mod testbed;

pub use errors::{ExtractError, PlannerError};
pub use extract::extract_json_object;
pub use plan::{parse_plan, validate_plan, CommandMode, ExtractedPlan, PlannedCommand};
pub use prompt::planner_system_prompt;
pub use testbed::Testbed;

use crate::inference::{ChatClient, ChatMessage};

/// Ask the model for a plan and validate it.
///
/// A reply without a usable plan ends the interaction: the error carries the
/// raw model text so the caller can show it.
pub async fn plan_question(
    chat: &ChatClient,
    testbed: &Testbed,
    question: &str,
) -> Result<PlannedCommand, PlannerError> {
    let messages = [
        ChatMessage::system(planner_system_prompt(testbed)),
        ChatMessage::user(question),
    ];

    let raw = chat.complete(&messages).await?;
    tracing::debug!(reply = %raw, "planner reply");

    let plan = parse_plan(&raw).inspect_err(|e| {
        tracing::warn!(error = %e, "planner reply had no usable plan");
    })?;
    let planned = validate_plan(plan, testbed)?;

    tracing::info!(
        device = %planned.plan.device,
        command = %planned.plan.command,
        mode = ?planned.mode,
        "planned command"
    );
    Ok(planned)
}
