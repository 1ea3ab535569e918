pub mod full_math;
pub mod sqrt_price;

pub use full_math::{div_rounding_up, mul_div, mul_div_rounding_up, sqrt};
pub use sqrt_price::{get_next_sqrt_price_from_input, sqrt_price_x96_from_reserves};
