//! Domain services: cart stores, external API clients, checkout guards.

pub mod auth;
pub mod carrier;
pub mod cart;
pub mod checkout;
pub mod kv;
pub mod payment;

pub use carrier::{AddressValidation, CarrierClient, CarrierError};
pub use cart::{ActiveCart, CartStore, CartStoreError, GuestCartStore, UserCartStore};
pub use checkout::{FinalizeRegistry, FinalizeRejection, FinalizeState};
pub use kv::{KvError, KvStore, MemoryKv, SessionKv};
pub use payment::{CheckoutSession, PaymentClient, PaymentError, SessionStatus};
