//! Pure-Rust image processing.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Thumbnail** | decode, turn upright, Lanczos3 downscale, JPEG encode |
//! | **Resize in place** | same pipeline, original format kept |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{fit_within, rotated_dimensions};
pub use operations::{ThumbnailConfig, create_thumbnail, resize_in_place};
pub use params::Quality;
pub use rust_backend::RustBackend;
