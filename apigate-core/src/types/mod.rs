mod contract;
mod node;
mod resource;
mod value;

pub use contract::*;
pub use node::*;
pub use resource::*;
pub use value::*;
