pub mod admirers;
pub mod candidates;
pub mod decisions;
pub mod health;
pub mod profile;
