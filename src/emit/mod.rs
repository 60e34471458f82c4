//! Transform stage: parameter schema plus the two MATLAB artifacts.

pub mod driver;
pub mod format;
pub mod model;
pub mod schema;
pub mod stack;

pub use driver::{driver_script_name, emit_driver, DriverScript};
pub use model::{emit_model, model_function_name};
pub use schema::{Bounds, ParameterSchema};
pub use stack::{evaluate_stack, hydrate_sld};
