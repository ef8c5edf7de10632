pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod inventory;
pub mod orders;
pub mod projection;
