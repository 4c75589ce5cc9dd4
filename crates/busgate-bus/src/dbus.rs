//! zbus implementation of the transport seam.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use busgate_core::ObjectPath;
use serde_json::Value as Json;
use zbus::zvariant::{OwnedValue, Structure};
use zbus::{Connection, Message};

use crate::codec::{encode_arguments, value_to_json, TypeSpec};
use crate::connection::{BusConnection, BusConnector, MethodCall};
use crate::error::{BusError, Result};

const INTROSPECTABLE: &str = "org.freedesktop.DBus.Introspectable";
const PROPERTIES: &str = "org.freedesktop.DBus.Properties";

/// Which bus a [`ZbusConnector`] connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusTarget {
    /// The system-wide message bus.
    System,
    /// The per-login session bus.
    Session,
    /// A bus reachable at an explicit D-Bus address.
    Address(String),
}

/// Opens real D-Bus connections through zbus.
#[derive(Debug, Clone)]
pub struct ZbusConnector {
    target: BusTarget,
}

impl ZbusConnector {
    /// Create a connector for `target`.
    #[must_use]
    pub const fn new(target: BusTarget) -> Self {
        Self { target }
    }
}

#[async_trait]
impl BusConnector for ZbusConnector {
    async fn connect(&self) -> Result<Box<dyn BusConnection>> {
        let conn = match &self.target {
            BusTarget::System => Connection::system().await,
            BusTarget::Session => Connection::session().await,
            BusTarget::Address(address) => match zbus::connection::Builder::address(address.as_str()) {
                Ok(builder) => builder.build().await,
                Err(err) => Err(err),
            },
        }
        .map_err(|e| BusError::Connection(e.to_string()))?;

        tracing::debug!(bus = %self.describe(), "Opened bus connection");
        Ok(Box::new(ZbusConnection { conn }))
    }

    fn describe(&self) -> String {
        match &self.target {
            BusTarget::System => "system bus".to_string(),
            BusTarget::Session => "session bus".to_string(),
            BusTarget::Address(address) => address.clone(),
        }
    }
}

/// A live zbus connection.
#[derive(Debug)]
pub struct ZbusConnection {
    conn: Connection,
}

#[async_trait]
impl BusConnection for ZbusConnection {
    async fn list_names(&self) -> Result<Vec<String>> {
        let proxy = zbus::fdo::DBusProxy::new(&self.conn).await?;
        let names = proxy.list_names().await?;
        Ok(names.into_iter().map(|name| name.to_string()).collect())
    }

    async fn introspect(&self, service: &str, path: &ObjectPath) -> Result<String> {
        let reply = self
            .conn
            .call_method(
                Some(service),
                path.as_str(),
                Some(INTROSPECTABLE),
                "Introspect",
                &(),
            )
            .await?;
        let xml: String = reply.body().deserialize()?;
        Ok(xml)
    }

    async fn get_property(
        &self,
        service: &str,
        path: &ObjectPath,
        interface: &str,
        property: &str,
    ) -> Result<Json> {
        let reply = self
            .conn
            .call_method(
                Some(service),
                path.as_str(),
                Some(PROPERTIES),
                "Get",
                &(interface, property),
            )
            .await?;
        let value: OwnedValue = reply.body().deserialize()?;
        Ok(value_to_json(&value))
    }

    async fn get_all_properties(
        &self,
        service: &str,
        path: &ObjectPath,
        interface: &str,
    ) -> Result<BTreeMap<String, Json>> {
        let reply = self
            .conn
            .call_method(
                Some(service),
                path.as_str(),
                Some(PROPERTIES),
                "GetAll",
                &(interface,),
            )
            .await?;
        let values: HashMap<String, OwnedValue> = reply.body().deserialize()?;
        Ok(values
            .iter()
            .map(|(name, value)| (name.clone(), value_to_json(value)))
            .collect())
    }

    async fn call_method(&self, call: &MethodCall) -> Result<Json> {
        let body = encode_arguments(&call.signature, &call.args)?;
        tracing::debug!(
            service = %call.service,
            path = %call.path,
            interface = %call.interface,
            method = %call.method,
            args = call.args.len(),
            "Calling method"
        );

        let reply = match body {
            Some(body) => {
                self.conn
                    .call_method(
                        Some(call.service.as_str()),
                        call.path.as_str(),
                        Some(call.interface.as_str()),
                        call.method.as_str(),
                        &body,
                    )
                    .await?
            }
            None => {
                self.conn
                    .call_method(
                        Some(call.service.as_str()),
                        call.path.as_str(),
                        Some(call.interface.as_str()),
                        call.method.as_str(),
                        &(),
                    )
                    .await?
            }
        };
        decode_reply(&reply)
    }
}

/// Decode a method reply: `null` for no values, the value itself for one,
/// an array for several. A lone struct decodes to the array of its fields.
fn decode_reply(reply: &Message) -> Result<Json> {
    let body = reply.body();
    let signature = body
        .signature()
        .map(|sig| sig.as_str().to_string())
        .unwrap_or_default();
    let types = TypeSpec::parse_many(&signature)?;

    if types.is_empty() {
        return Ok(Json::Null);
    }

    // A lone struct reply deserializes as the struct itself, not a wrapper.
    let value: Structure<'_> = body.deserialize()?;
    let fields = value.fields();
    match types.as_slice() {
        [single] if !matches!(single, TypeSpec::Struct(_)) => {
            Ok(fields.first().map_or(Json::Null, value_to_json))
        }
        _ => Ok(Json::Array(fields.iter().map(value_to_json).collect())),
    }
}
