/// Camera frames
pub mod frame;
/// Packed bit grids
pub mod matrix;
/// Sub-pixel positions
pub mod point;
/// Ordered row fields
pub mod record;
/// QR symbol primitives
pub mod symbol;

pub use frame::{Frame, PixelFormat};
pub use matrix::BitMatrix;
pub use point::Point;
pub use record::RowRecord;
pub use symbol::{ECLevel, MaskPattern, OpticalSymbol, Version};
