pub mod alert;
pub mod deploy;
pub mod incident;
pub mod organization;

pub use alert::*;
pub use deploy::*;
pub use incident::*;
pub use organization::*;
