pub mod meta;
pub mod nodes;
pub mod relationships;
pub mod schema;
pub mod value;

pub use meta::*;
pub use nodes::*;
pub use relationships::*;
pub use schema::*;
pub use value::*;
