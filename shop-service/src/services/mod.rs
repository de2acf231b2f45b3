pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod flutterwave;
pub mod jwt;
pub mod metrics;
pub mod paypal;

pub use auth::{AuthService, NewUser, UserProfile};
pub use cart::{CartService, CartStat, CartTotals, CartView};
pub use catalog::{CatalogService, NewProduct, ProductDetail};
pub use checkout::{CheckoutLedger, FlutterwaveCheckout, PayPalCheckout};
pub use error::ShopError;
pub use flutterwave::FlutterwaveClient;
pub use jwt::{JwtService, TokenClaims, TokenPair};
pub use metrics::{get_metrics, init_metrics};
pub use paypal::PayPalClient;
