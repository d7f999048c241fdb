pub mod blood_type;
pub mod donation;
pub mod inventory;
pub mod request;
