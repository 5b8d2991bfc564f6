/// Mask application: XOR every data module with the mask pattern.
/// Applying the same mask twice restores the original matrix.
use crate::decoder::function_mask::FunctionMask;
use crate::models::{BitMatrix, MaskPattern};

/// XOR the data modules of `matrix` with `mask_pattern`
pub fn apply_mask(matrix: &mut BitMatrix, mask_pattern: MaskPattern, func: &FunctionMask) {
    let size = matrix.width();

    for y in 0..size {
        for x in 0..size {
            // Patterns are defined on (row, column)
            if !func.is_function(x, y) && mask_pattern.is_masked(y, x) {
                matrix.toggle(x, y);
            }
        }
    }
}
