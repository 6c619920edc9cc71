//! User-code injection predicates.
//!
//! An `inject` predicate carries JavaScript source for a function of
//! `(scope, logger, imposterState)`, where `scope` is a deep copy of the
//! request. The function runs in a fresh engine context per evaluation; its
//! truthiness is the predicate result, and any mutation it makes to the
//! imposter state is written back. Execution failures are logged with the
//! full source and scope, then surfaced as injection errors.

use boa_engine::native_function::NativeFunction;
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, Source};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::PredicateError;

pub(crate) fn inject(
    operand: &Value,
    request: &Value,
    imposter_state: &mut Value,
) -> Result<bool, PredicateError> {
    let source = operand.as_str().ok_or_else(|| {
        PredicateError::validation(
            "inject predicate must be a string of source code",
            operand.clone(),
        )
    })?;

    // Dry runs exercise the match pipeline without running user code.
    if request.get("isDryRun").and_then(Value::as_bool) == Some(true) {
        return Ok(true);
    }

    let injected = format!("({source})(scope, logger, imposterState);");
    let mut context = Context::default();

    run_injected(&mut context, &injected, request, imposter_state).map_err(|failure| {
        error!("injection failed: {failure}");
        error!(
            "    source: {injected}\n    scope: {}\n    state: {}",
            serde_json::to_string_pretty(request).unwrap_or_default(),
            serde_json::to_string_pretty(imposter_state).unwrap_or_default()
        );
        PredicateError::Injection {
            script: injected.clone(),
            data: failure,
        }
    })
}

fn run_injected(
    context: &mut Context,
    injected: &str,
    request: &Value,
    imposter_state: &mut Value,
) -> Result<bool, String> {
    let scope = JsValue::from_json(request, context).map_err(|e| e.to_string())?;
    let state = JsValue::from_json(imposter_state, context).map_err(|e| e.to_string())?;
    let logger = logger_object(context);

    context
        .register_global_property(js_string!("scope"), scope, Attribute::all())
        .map_err(|e| e.to_string())?;
    context
        .register_global_property(js_string!("logger"), logger, Attribute::all())
        .map_err(|e| e.to_string())?;
    context
        .register_global_property(js_string!("imposterState"), state, Attribute::all())
        .map_err(|e| e.to_string())?;

    let result = context
        .eval(Source::from_bytes(injected.as_bytes()))
        .map_err(|e| e.to_string())?;

    // Persist whatever the function did to the shared state.
    let global = context.global_object();
    let updated = global
        .get(js_string!("imposterState"), context)
        .map_err(|e| e.to_string())?;
    if let Ok(json) = updated.to_json(context) {
        *imposter_state = json;
    }

    Ok(result.to_boolean())
}

/// A `logger` object whose methods forward to the tracing subscriber.
fn logger_object(context: &mut Context) -> JsObject {
    ObjectInitializer::new(context)
        .function(NativeFunction::from_fn_ptr(log_debug), js_string!("debug"), 1)
        .function(NativeFunction::from_fn_ptr(log_info), js_string!("info"), 1)
        .function(NativeFunction::from_fn_ptr(log_warn), js_string!("warn"), 1)
        .function(NativeFunction::from_fn_ptr(log_error), js_string!("error"), 1)
        .build()
}

fn render_args(args: &[JsValue], context: &mut Context) -> String {
    args.iter()
        .map(|arg| {
            arg.to_string(context)
                .map(|s| s.to_std_string_escaped())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn log_debug(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    debug!(target: "decoy::inject", "{}", render_args(args, context));
    Ok(JsValue::undefined())
}

fn log_info(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    info!(target: "decoy::inject", "{}", render_args(args, context));
    Ok(JsValue::undefined())
}

fn log_warn(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    warn!(target: "decoy::inject", "{}", render_args(args, context));
    Ok(JsValue::undefined())
}

fn log_error(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    error!(target: "decoy::inject", "{}", render_args(args, context));
    Ok(JsValue::undefined())
}
