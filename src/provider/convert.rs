//! Conversions shared by both protocol adapters.
//!
//! The tfplugin5 and tfplugin6 modules declare structurally identical
//! messages for values, diagnostics and paths, so one set of helpers is
//! expanded into each adapter against whichever module it imports as `wire`.

macro_rules! wire_conversions {
    () => {
        fn dynamic(
            field: &'static str,
            value: &crate::value::TypedValue,
        ) -> crate::error::Result<wire::DynamicValue> {
            let msgpack = value
                .to_msgpack()
                .map_err(|source| crate::error::Error::InvalidValue { field, source })?;
            Ok(wire::DynamicValue {
                msgpack,
                json: Vec::new(),
            })
        }

        fn dynamic_optional(
            field: &'static str,
            value: Option<&crate::value::TypedValue>,
        ) -> crate::error::Result<Option<wire::DynamicValue>> {
            value.map(|v| dynamic(field, v)).transpose()
        }

        fn wire_value(value: Option<wire::DynamicValue>) -> crate::value::WireValue {
            match value {
                Some(v) => crate::value::WireValue::from_wire(v.msgpack, v.json),
                None => crate::value::WireValue::from_wire(Vec::new(), Vec::new()),
            }
        }

        fn arguments(
            function: &str,
            arguments: &[crate::value::TypedValue],
        ) -> crate::error::Result<Vec<wire::DynamicValue>> {
            arguments
                .iter()
                .enumerate()
                .map(|(index, argument)| {
                    let msgpack = argument.to_msgpack().map_err(|source| {
                        crate::error::Error::InvalidFunctionArgument {
                            function: function.to_string(),
                            index,
                            source,
                        }
                    })?;
                    Ok(wire::DynamicValue {
                        msgpack,
                        json: Vec::new(),
                    })
                })
                .collect()
        }

        fn raw_state(state: &crate::value::RawState) -> wire::RawState {
            wire::RawState {
                json: state.json.clone(),
                flatmap: state.flatmap.clone(),
            }
        }

        fn attribute_path(path: wire::AttributePath) -> crate::ops::AttributePath {
            use wire::attribute_path::step::Selector;
            let steps = path
                .steps
                .into_iter()
                .filter_map(|step| step.selector)
                .map(|selector| match selector {
                    Selector::AttributeName(name) => crate::ops::PathStep::AttributeName(name),
                    Selector::ElementKeyString(key) => {
                        crate::ops::PathStep::ElementKeyString(key)
                    }
                    Selector::ElementKeyInt(idx) => crate::ops::PathStep::ElementKeyInt(idx),
                })
                .collect();
            crate::ops::AttributePath { steps }
        }

        fn diagnostics(diagnostics: Vec<wire::Diagnostic>) -> crate::ops::Diagnostics {
            crate::ops::Diagnostics(
                diagnostics
                    .into_iter()
                    .map(|d| crate::ops::Diagnostic {
                        severity: crate::ops::DiagnosticSeverity::from_wire(d.severity),
                        summary: d.summary,
                        detail: d.detail,
                        attribute: d.attribute.map(attribute_path),
                    })
                    .collect(),
            )
        }

        fn client_capabilities(
            caps: Option<&crate::ops::ClientCapabilities>,
        ) -> Option<wire::ClientCapabilities> {
            caps.map(|c| wire::ClientCapabilities {
                deferral_allowed: c.deferral_allowed,
                write_only_attributes_allowed: c.write_only_attributes_allowed,
            })
        }

        fn deferred(deferred: Option<wire::Deferred>) -> Option<crate::ops::Deferred> {
            deferred.map(|d| crate::ops::Deferred {
                reason: crate::ops::DeferredReason::from_wire(d.reason),
            })
        }

        fn function_error(error: wire::FunctionError) -> crate::ops::FunctionError {
            crate::ops::FunctionError {
                text: error.text,
                argument_index: error
                    .function_argument
                    .and_then(|i| usize::try_from(i).ok()),
            }
        }
    };
}
