//! An SSLv3 / TLS 1.0 handshake engine for small clients.
//!
//! `tinytls` negotiates sessions over any record transport: hello exchange,
//! certificate chain verification, key derivation and Finished checks for
//! both the client and server roles, with a four-slot session cache for
//! resumption. Record protection lives behind the `RecordLayer` trait.
//!

#[macro_use]
extern crate enum_primitive_derive;
extern crate num_traits;

pub mod alert;
pub mod cipher;
pub mod client;
mod crypto;
mod digest;
pub mod errors;
mod extensions;
pub mod fields;
pub mod handshake;
mod keyexchange;
mod pack;
pub mod record;
pub mod rsa;
pub mod server;
pub mod session;
pub mod transport {
    pub mod loopback;
    pub mod record_layer;
}
pub mod truststore;
pub mod verify;
pub mod x509;
