//! Error types for bus operations.
//!
//! Every transport failure is classified into one of a few kinds so the
//! layers above can tell "the remote side has no such thing" apart from
//! everything else.

use thiserror::Error;

/// A result type using `BusError`.
pub type Result<T> = std::result::Result<T, BusError>;

/// D-Bus error names that mean the addressed entity does not exist.
pub const NOT_FOUND_ERROR_NAMES: &[&str] = &[
    "org.freedesktop.DBus.Error.ServiceUnknown",
    "org.freedesktop.DBus.Error.NameHasNoOwner",
    "org.freedesktop.DBus.Error.UnknownObject",
    "org.freedesktop.DBus.Error.UnknownInterface",
    "org.freedesktop.DBus.Error.UnknownMethod",
    "org.freedesktop.DBus.Error.UnknownProperty",
];

/// Errors that can occur while talking to a bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Connecting to the bus failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The remote side has no such service, object, interface or member.
    #[error("{name}: {message}")]
    NotFound {
        /// The D-Bus error name.
        name: String,
        /// The error description sent by the remote side.
        message: String,
    },

    /// The remote side replied with any other D-Bus error.
    #[error("{name}: {message}")]
    Remote {
        /// The D-Bus error name.
        name: String,
        /// The error description sent by the remote side.
        message: String,
    },

    /// A value could not be converted to or from its D-Bus representation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any other transport or protocol failure.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl BusError {
    /// Classify a D-Bus error reply by its error name.
    #[must_use]
    pub fn from_reply(name: &str, message: impl Into<String>) -> Self {
        let name = name.to_string();
        let message = message.into();
        if NOT_FOUND_ERROR_NAMES.contains(&name.as_str()) {
            Self::NotFound { name, message }
        } else {
            Self::Remote { name, message }
        }
    }

    /// Returns true if the remote side reported a missing entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the remote side replied with an error of any kind.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Remote { .. })
    }
}

impl From<zbus::Error> for BusError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, message, _) => {
                Self::from_reply(name.as_str(), message.unwrap_or_default())
            }
            zbus::Error::FDO(fdo) => Self::from(*fdo),
            zbus::Error::InterfaceNotFound => Self::from_reply(
                "org.freedesktop.DBus.Error.UnknownInterface",
                "interface not found",
            ),
            zbus::Error::Address(msg) | zbus::Error::Handshake(msg) => Self::Connection(msg),
            zbus::Error::InputOutput(io) => Self::Connection(io.to_string()),
            zbus::Error::Variant(err) => Self::InvalidArgument(err.to_string()),
            zbus::Error::Names(err) => Self::InvalidArgument(err.to_string()),
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<zbus::fdo::Error> for BusError {
    fn from(err: zbus::fdo::Error) -> Self {
        use zbus::DBusError;

        match err {
            zbus::fdo::Error::ZBus(inner) => Self::from(inner),
            other => Self::from_reply(other.name().as_str(), other.description().unwrap_or_default()),
        }
    }
}

impl From<zbus::zvariant::Error> for BusError {
    fn from(err: zbus::zvariant::Error) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_not_found_replies() {
        for name in NOT_FOUND_ERROR_NAMES {
            let err = BusError::from_reply(name, "missing");
            assert!(err.is_not_found(), "{name} should be not-found");
            assert!(err.is_remote());
        }
    }

    #[test]
    fn classify_other_replies() {
        let err = BusError::from_reply("org.freedesktop.DBus.Error.AccessDenied", "nope");
        assert!(!err.is_not_found());
        assert!(err.is_remote());
        assert_eq!(
            err.to_string(),
            "org.freedesktop.DBus.Error.AccessDenied: nope"
        );
    }

    #[test]
    fn fdo_errors_are_classified() {
        let err = BusError::from(zbus::fdo::Error::UnknownObject("no /x".to_string()));
        assert_eq!(
            err,
            BusError::NotFound {
                name: "org.freedesktop.DBus.Error.UnknownObject".to_string(),
                message: "no /x".to_string(),
            }
        );

        let err = BusError::from(zbus::fdo::Error::AccessDenied("denied".to_string()));
        assert!(matches!(err, BusError::Remote { .. }));
    }

    #[test]
    fn connection_errors_are_not_remote() {
        let err = BusError::from(zbus::Error::Address("bad address".to_string()));
        assert_eq!(err, BusError::Connection("bad address".to_string()));
        assert!(!err.is_remote());
    }
}
