//! Error types of every component, in one place

pub use crate::batch::{BatchError, DeliveryError, ItemError};
pub use crate::config::ConfigError;
pub use crate::encoder::{EncodeError, RenderError};
pub use crate::scanner::CameraError;
pub use crate::token::TokenError;
