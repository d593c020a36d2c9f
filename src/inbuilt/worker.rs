// Isolation unit for the Mini-C++ engine
//
// The job runs on its own thread and talks to the host only through two
// channels: results come back on one, `Control::Terminate` goes out on the
// other. The host waits for the engine timeout plus a grace period. If that
// outer deadline passes, the unit is told to stop and abandoned; the engine
// polls its control channel and winds down on its own.

use super::{compiler_name, crash_result, guarded, run_inbuilt, Dialect, InbuiltJob, ENGINE_STACK_BYTES, PROFILE};
use crate::interpreter::Control;
use crate::model::CompileRunResult;
use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

/// Run `job` inside an isolation unit with an outer timeout of the job's
/// own timeout plus `grace`.
///
/// Termination is cooperative. On the outer deadline the host sends
/// `Control::Terminate` and returns without joining the thread; the engine
/// only sees the request at its next step tick. A builtin that never reaches
/// a tick keeps running on the abandoned thread until it returns by itself.
///
/// Falls back to [`run_inbuilt`] when the unit cannot be started.
pub fn run_isolated(job: InbuiltJob, grace: Duration) -> CompileRunResult {
    let dialect = job.dialect;
    let outer = job.limits.timeout() + grace;
    let (result_tx, result_rx) = mpsc::channel::<CompileRunResult>();
    let (control_tx, control_rx) = mpsc::channel::<Control>();

    let fallback = job.clone();
    let spawned = std::thread::Builder::new()
        .name(format!("{}-unit", compiler_name(dialect)))
        .stack_size(ENGINE_STACK_BYTES)
        .spawn(move || {
            let result = guarded(job, Some(control_rx));
            // The host may have given up already
            let _ = result_tx.send(result);
        });

    if let Err(err) = spawned {
        warn!("could not start isolation unit ({err}); running in-process");
        return run_inbuilt(fallback);
    }

    debug!("isolation unit started, outer timeout {} ms", outer.as_millis());
    match result_rx.recv_timeout(outer) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            let _ = control_tx.send(Control::Terminate);
            warn!("isolation unit missed its {} ms deadline; stop requested, thread abandoned", outer.as_millis());
            unresponsive_result(dialect, outer)
        }
        Err(RecvTimeoutError::Disconnected) => crash_result(dialect, "isolation unit exited without a result"),
    }
}

fn unresponsive_result(dialect: Dialect, outer: Duration) -> CompileRunResult {
    let mut result = CompileRunResult::run_phase(compiler_name(dialect), PROFILE).with_command(PROFILE);
    result.timed_out = true;
    result.error = Some(format!(
        "Inbuilt engine did not respond within {} ms and was abandoned",
        outer.as_millis()
    ));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{ExecutionLimits, Phase};

    fn job(source: &str, timeout_ms: u64) -> InbuiltJob {
        InbuiltJob::new(
            Dialect::Cpp,
            source.to_string(),
            std::env::temp_dir(),
            ExecutionLimits::new(timeout_ms, 64 * 1024),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_timely_result_passes_through() {
        let source = "#include <iostream>\nusing namespace std;\nint main() { cout << 6 * 7 << endl; return 0; }";
        let result = run_isolated(job(source, 5_000), Duration::from_millis(500));
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, "42\n");
        assert_eq!(result.compiler, "inbuilt-mini-cpp");
    }

    #[test]
    fn test_inner_timeout_reported_before_outer() {
        let source = "int main() { while (true) {} return 0; }";
        let result = run_isolated(job(source, 100), Duration::from_millis(2_000));
        assert!(result.timed_out);
        assert_eq!(result.phase, Phase::Run);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[test]
    fn test_unresponsive_result_shape() {
        let result = unresponsive_result(Dialect::Cpp, Duration::from_millis(1_600));
        assert!(result.timed_out);
        assert!(!result.success);
        assert_eq!(result.compiler_profile, "inbuilt");
        let error = result.error.unwrap();
        assert!(error.contains("1600 ms"));
        assert!(error.contains("abandoned"));
    }
}
