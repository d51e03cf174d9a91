pub mod allergy;
pub mod drug;
pub mod enums;

pub use allergy::Allergy;
pub use drug::{Drug, PrescriptionItem, PrescriptionItemUpdate};
