pub mod r#trait {
    pub use super::trait_::*;
}
#[path = "trait.rs"]
mod trait_;
mod memory;

pub use r#trait::BookingRepository;

#[cfg(test)]
mod tests;
