//! Parameter binding.
//!
//! For each declared parameter, in declaration order:
//!
//! 1. start from the declared default
//! 2. overlay the query value, then the path capture (captures win)
//! 3. overwrite with the registry's dependency when the name is registered
//! 4. fail when still unbound: 400 if annotated, 500 otherwise
//! 5. validate against a schema annotation, or replace with a transform's output
//!
//! Only declared parameters are bound, so extra query values never reach the
//! handler.

use super::annotation::{Annotation, SchemaCheck};
use super::core::Handler;
use crate::dispatcher::DispatchError;
use crate::registry::{Arg, Args, Registry};
use crate::router::ParamVec;
use serde_json::{Map, Value};
use tracing::{debug, error};

/// Bind `handler`'s declared parameters.
///
/// # Errors
///
/// - [`DispatchError::MissingRequiredParameter`] (400) for an unbound annotated parameter
/// - [`DispatchError::SchemaValidationFailed`] (400) when a value fails its schema
/// - [`DispatchError::SchemaDefinitionInvalid`] (500) when the schema itself is broken
/// - [`DispatchError::UnresolvableParameter`] (500) for an unbound plain parameter
/// - [`DispatchError::InvalidAnnotation`] (500) for an annotated opaque dependency
/// - the classified failure of a dependency factory or transform
pub fn bind(
    handler: &Handler,
    captures: &ParamVec,
    query: &Map<String, Value>,
    registry: &mut Registry,
) -> Result<Args, DispatchError> {
    let mut args = Args::new();

    for param in handler.params() {
        let name = param.name();

        let mut bound = param.default_value().cloned().map(Arg::Value);
        if let Some(value) = query.get(name) {
            bound = Some(Arg::Value(value.clone()));
        }
        if let Some((_, value)) = captures.iter().find(|(k, _)| k.as_ref() == name) {
            bound = Some(Arg::Value(Value::String(value.clone())));
        }
        if registry.contains(name) {
            let instance = registry
                .resolve(name)
                .map_err(DispatchError::from_registry)?;
            bound = Some(Arg::from_instance(instance));
        }

        let Some(arg) = bound else {
            return Err(if param.annotation().is_some() {
                DispatchError::MissingRequiredParameter {
                    name: name.to_string(),
                }
            } else {
                DispatchError::UnresolvableParameter {
                    handler: handler.name().to_string(),
                    name: name.to_string(),
                }
            });
        };

        let arg = match (param.annotation(), arg) {
            (None, arg) => arg,
            (Some(_), Arg::Instance(_)) => {
                return Err(DispatchError::InvalidAnnotation {
                    name: name.to_string(),
                })
            }
            (Some(Annotation::Schema(schema)), Arg::Value(value)) => match schema.check(&value) {
                SchemaCheck::Valid => Arg::Value(value),
                SchemaCheck::Invalid(message) => {
                    return Err(DispatchError::SchemaValidationFailed {
                        name: name.to_string(),
                        message,
                    })
                }
                SchemaCheck::BrokenSchema(message) => {
                    error!(
                        handler_name = %handler.name(),
                        param = %name,
                        schema = %schema.definition(),
                        error = %message,
                        "Invalid parameter schema"
                    );
                    return Err(DispatchError::SchemaDefinitionInvalid {
                        name: name.to_string(),
                        message,
                    });
                }
            },
            (Some(Annotation::Transform(transform)), Arg::Value(value)) => Arg::Value(
                transform
                    .apply(value)
                    .map_err(DispatchError::from_failure)?,
            ),
        };

        args.insert(name, arg);
    }

    debug!(
        handler_name = %handler.name(),
        bound = ?args.names().collect::<Vec<_>>(),
        "Parameters bound"
    );
    Ok(args)
}
