//! Isolated execution of candidate programs.
//!
//! A candidate is compiled once into an immutable AST and its top-level
//! statements run once at load time; faults there are load faults. Every call
//! then builds a fresh engine and an empty scope and invokes only the function,
//! so no state survives between calls. The
//! engine cannot import modules, print, or `eval`, and it is bounded by
//! [`ExecutionLimits`]; the wall-clock limit is checked on every engine
//! operation and terminates the script from inside.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, Scope, AST};
use serde_json::Value;
use tracing::debug;

use super::discovery::{discover, TargetFunction};
use super::limits::ExecutionLimits;
use crate::domain::{ExecutionFailure, FaultStage};

/// Build a sandboxed engine that terminates once `limit` has elapsed since `started`.
fn sandboxed_engine(limits: &ExecutionLimits, started: Instant, limit: Duration) -> Engine {
    let mut engine = Engine::new();
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");
    engine.on_print(|_| {});
    engine.on_debug(|_, _, _| {});
    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_depth);
    engine.set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);

    engine.on_progress(move |_ops| {
        if started.elapsed() >= limit {
            Some(Dynamic::UNIT)
        } else {
            None
        }
    });
    engine
}

/// Innermost error, past function-call and module wrappers.
fn root_cause(err: &EvalAltResult) -> &EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => root_cause(inner),
        other => other,
    }
}

fn classify(err: &EvalAltResult, stage: FaultStage, limit: Duration) -> ExecutionFailure {
    match root_cause(err) {
        EvalAltResult::ErrorTerminated(..) => ExecutionFailure::Timeout {
            limit_ms: limit.as_millis() as u64,
        },
        EvalAltResult::ErrorTooManyOperations(..)
        | EvalAltResult::ErrorStackOverflow(..)
        | EvalAltResult::ErrorDataTooLarge(..) => ExecutionFailure::ResourceExhausted {
            message: err.to_string(),
        },
        _ => ExecutionFailure::RuntimeFault {
            stage,
            message: err.to_string(),
        },
    }
}

/// Loads and runs candidates under a fixed discovery rule and limits.
#[derive(Debug, Clone, Default)]
pub struct CandidateExecutor {
    target: TargetFunction,
    limits: ExecutionLimits,
}

impl CandidateExecutor {
    pub fn new(target: TargetFunction, limits: ExecutionLimits) -> Self {
        Self { target, limits }
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Compile `code`, run its top-level statements once and locate the
    /// function under test.
    pub fn load(&self, code: &str) -> Result<LoadedCandidate, ExecutionFailure> {
        let limit = self.limits.timeout();
        let engine = sandboxed_engine(&self.limits, Instant::now(), limit);
        let ast = engine
            .compile(code)
            .map_err(|e| ExecutionFailure::RuntimeFault {
                stage: FaultStage::Load,
                message: e.to_string(),
            })?;

        engine
            .run_ast_with_scope(&mut Scope::new(), &ast)
            .map_err(|e| classify(&e, FaultStage::Load, limit))?;

        let function = discover(&ast, code, &self.target).ok_or_else(|| {
            ExecutionFailure::NoCandidateFunction {
                rule: self.target.to_string(),
            }
        })?;
        debug!(function = %function, "candidate function discovered");

        Ok(LoadedCandidate {
            ast: Arc::new(ast),
            function,
            limits: self.limits.clone(),
        })
    }

    /// Load `code` and run it once against `input`.
    ///
    /// Runs on the blocking pool; the returned future resolves only after the
    /// execution unit has finished or been terminated.
    pub async fn execute(
        &self,
        code: &str,
        input: &Value,
        time_limit: Duration,
    ) -> Result<Value, ExecutionFailure> {
        let executor = self.clone();
        let code = code.to_string();
        let input = input.clone();
        run_blocking(move || {
            let loaded = executor.load(&code)?;
            loaded.invoke_blocking(&input, time_limit)
        })
        .await
    }
}

/// A compiled candidate with its discovered function. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoadedCandidate {
    ast: Arc<AST>,
    function: String,
    limits: ExecutionLimits,
}

impl LoadedCandidate {
    /// Name of the function under test.
    pub fn function_name(&self) -> &str {
        &self.function
    }

    /// Call the function with a fresh copy of `input` on the current thread.
    pub fn invoke_blocking(
        &self,
        input: &Value,
        time_limit: Duration,
    ) -> Result<Value, ExecutionFailure> {
        let engine = sandboxed_engine(&self.limits, Instant::now(), time_limit);
        let mut scope = Scope::new();

        let arg = rhai::serde::to_dynamic(input).map_err(|e| ExecutionFailure::RuntimeFault {
            stage: FaultStage::Call,
            message: format!("input conversion failed: {}", e),
        })?;

        // Top-level statements already ran in `load`.
        let options = CallFnOptions::new().eval_ast(false);
        let returned = engine
            .call_fn_with_options::<Dynamic>(
                options,
                &mut scope,
                &self.ast,
                &self.function,
                (arg,),
            )
            .map_err(|e| classify(&e, FaultStage::Call, time_limit))?;

        rhai::serde::from_dynamic::<Value>(&returned).map_err(|e| {
            ExecutionFailure::UnsupportedOutput {
                message: e.to_string(),
            }
        })
    }

    /// Call the function on the blocking pool.
    pub async fn invoke(
        &self,
        input: &Value,
        time_limit: Duration,
    ) -> Result<Value, ExecutionFailure> {
        let loaded = self.clone();
        let input = input.clone();
        run_blocking(move || loaded.invoke_blocking(&input, time_limit)).await
    }
}

/// Run an execution unit on tokio's blocking pool, converting panics into faults.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ExecutionFailure>
where
    F: FnOnce() -> Result<T, ExecutionFailure> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(join_err) => Err(ExecutionFailure::RuntimeFault {
            stage: FaultStage::Call,
            message: format!("execution unit aborted: {}", join_err),
        }),
    }
}
