//! WSDL 1.1 support
//!
//! - [`events`]: the flat XML event stream the parser consumes
//! - [`model`]: the immutable [`SchemaModel`] and its entities
//! - [`parser`]: the streaming [`WsdlParser`]
//! - [`lookup`]: operation, message and type queries over a model
//! - [`writer`]: WSDL generation for rpc/encoded services

pub mod events;
pub mod lookup;
pub mod model;
pub mod parser;
pub mod writer;

mod resolve;

pub use events::{XmlEvent, XmlEventReader};
pub use lookup::{MessageData, OperationData, PartInfo, TypeShape};
pub use model::{
    Attribute, Binding, BindingKind, BindingOperation, BodyBinding, ComplexType, Derivation,
    Element, FaultBinding, HeaderBinding, Message, MessageBinding, MessageRef, Order, Part, Port,
    PortType, PortTypeOperation, SchemaModel, Service, Style, TypeKind, Use,
};
pub use parser::WsdlParser;
pub use writer::{RpcOperation, RpcServiceWriter};
