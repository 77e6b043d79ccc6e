//! Remote device proxy
//!
//! When a device has been selected, status reads go to that device over HTTP
//! instead of the local simulation.

mod remote;
mod selection;
mod status;

pub use remote::RemoteProxy;
pub use selection::SelectedDevice;
pub use status::StatusAccessor;
