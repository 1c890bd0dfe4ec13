// Exit codes for scripted pipelines
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_ORACLE_UNAVAILABLE: i32 = 3;

use codenat_common::PipelineError;

/// Exit code for a failed command, from the first pipeline error in its chain.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map_or(EXIT_GENERIC_FAIL, |e| match e {
            PipelineError::Config(_) => EXIT_CONFIG,
            PipelineError::OracleUnavailable(_) => EXIT_ORACLE_UNAVAILABLE,
            _ => EXIT_GENERIC_FAIL,
        })
}
