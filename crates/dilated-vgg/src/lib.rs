//! Command-line tooling for the dilated VGG-16 backbone.
//!
//! This crate wires the backbone to a compile-time selected Burn backend and
//! provides shape summaries and forward pass timing.

pub mod args;
pub mod backend;
pub mod bench;
pub mod summary;

#[doc(inline)]
pub use backend::{create_device, BackendInfo, SelectedBackend, SelectedDevice};
#[doc(inline)]
pub use dilated_vgg_backbone as backbone;
