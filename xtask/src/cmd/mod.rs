pub mod new_change;
pub mod validate_change;
