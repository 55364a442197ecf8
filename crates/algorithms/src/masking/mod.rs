//! Per-pixel validity masking
//!
//! - **cloud**: threshold a cloud-probability band and apply it to a scene

mod cloud;

pub use cloud::{cloud_mask, mask_collection, mask_scene, CloudMaskParams};
