pub mod compression;
pub mod deadline;
pub mod transport;

pub use compression::{ContentEncoding, add_accept_encoding, decompress_body, detect_encodings};
pub use deadline::with_deadline;
pub use transport::{
    HyperTransport, HyperTransportOptions, Transport, TransportRequest, TransportResponse,
};
