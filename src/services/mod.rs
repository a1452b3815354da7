pub mod decisions;
pub mod errors;
pub mod policies;
pub mod requests;
