//! Lipid properties: the property table, the constant resolver with its
//! fallback chain, and bilayer spec building.

pub mod bilayer;
pub mod resolver;
pub mod table;

pub use bilayer::build_bilayer_specs;
pub use resolver::LipidConstantResolver;
pub use table::{LipidTable, LipidTableSource};
