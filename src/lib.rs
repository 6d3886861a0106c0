
#[macro_use]
extern crate lazy_static;

// External data representation, a protocol for serializing data to be sent over the network
pub mod xdr;

// Remote procedure call, a protocol built on top of XDR to provide something like C-style function calls over the network
pub mod rpc;

// A protocol using RPC that's meant to communicate with instruments like power supplies and source meters
pub mod vxi11;

// Drivers for devices that implement the VXI11 protocol
pub mod devices;

// The I-V sweep itself: configuration, validation, the ramp loop, and the recorded curve
pub mod sweep;

// Tethered camera sync and capture through the gphoto2 command line tool
pub mod camera;

// CSV and JSON persistence for finished sweeps
pub mod export;

pub mod utils;
