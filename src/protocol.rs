//! Protocol selection for the operation factory the pool exposes to its
//! host client library. Encoding operations onto the wire is out of scope
//! for this crate (owned by the underlying memcached client); what matters
//! here is that the pool picks the right factory at construction time and
//! exposes it through a stable accessor.

use std::fmt;

/// Marker trait for the protocol-specific operation factory a consuming
/// client library would use to build get/set/delete operations against a
/// located node. Left unimplemented beyond the selection machinery, since
/// operation encoding is explicitly out of scope for this core.
pub trait OperationFactory: Send + Sync + 'static {
    fn protocol(&self) -> Protocol;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Text,
    Binary,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Text => write!(f, "text"),
            Protocol::Binary => write!(f, "binary"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Protocol::Text),
            "binary" => Ok(Protocol::Binary),
            other => Err(format!("unknown protocol: {other:?}")),
        }
    }
}

pub struct TextOperationFactory;

impl OperationFactory for TextOperationFactory {
    fn protocol(&self) -> Protocol {
        Protocol::Text
    }
}

pub struct BinaryOperationFactory;

impl OperationFactory for BinaryOperationFactory {
    fn protocol(&self) -> Protocol {
        Protocol::Binary
    }
}

pub fn build_operation_factory(protocol: Protocol) -> Box<dyn OperationFactory> {
    match protocol {
        Protocol::Text => Box::new(TextOperationFactory),
        Protocol::Binary => Box::new(BinaryOperationFactory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_protocols() {
        assert_eq!("text".parse::<Protocol>().unwrap(), Protocol::Text);
        assert_eq!("binary".parse::<Protocol>().unwrap(), Protocol::Binary);
    }

    #[test]
    fn rejects_unknown_protocol() {
        assert!("spdy".parse::<Protocol>().is_err());
    }

    #[test]
    fn factory_reports_matching_protocol() {
        assert_eq!(build_operation_factory(Protocol::Text).protocol(), Protocol::Text);
        assert_eq!(build_operation_factory(Protocol::Binary).protocol(), Protocol::Binary);
    }
}
