mod class_names;
mod object;

pub use class_names::{class_names, ClassValue};
pub use object::remove_keys;
