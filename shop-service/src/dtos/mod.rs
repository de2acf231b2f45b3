//! Request and response bodies for the HTTP API.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod payments;

use rust_decimal::Decimal;

pub use shop_core::error::ErrorResponse;

/// Money is sent as a two-place decimal string, e.g. `"24.00"`.
pub fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_always_has_two_places() {
        assert_eq!(money(dec!(24)), "24.00");
        assert_eq!(money(dec!(9.5)), "9.50");
        assert_eq!(money(dec!(10.00)), "10.00");
    }
}
