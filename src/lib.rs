//! Client for OpenTofu/Terraform provider plugins.
//!
//! A [`Provider`] launches a plugin executable, negotiates plugin protocol 5
//! or 6 during the handshake, and then exposes one operation surface for
//! either version: schemas, provider configuration, managed, data and
//! ephemeral resources, and provider-defined functions.
//!
//! Values cross the boundary as [`TypedValue`]s going out and [`WireValue`]s
//! coming back. The wire format never says which type a value has, so the
//! caller supplies it, usually derived from the schema via
//! [`schema::BlockType::implied_type`].

pub mod config;
pub mod context;
pub mod cty;
pub mod error;
pub mod ops;
pub mod provider;
pub mod schema;
pub mod value;

pub use config::LaunchConfig;
pub use context::CallContext;
pub use cty::{Type, Value};
pub use error::{CodecError, Error, LaunchError, Result};
pub use provider::{LifecycleState, Provider, ProtocolVersion, RawClient};
pub use value::{RawState, TypedValue, WireEncoding, WireValue};
