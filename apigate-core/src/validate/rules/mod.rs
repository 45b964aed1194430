pub(crate) mod fragments;
pub(crate) mod node;
pub(crate) mod resource;
