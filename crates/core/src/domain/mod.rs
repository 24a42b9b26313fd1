pub mod call;
pub mod contact;
pub mod email;
pub mod invoice;
