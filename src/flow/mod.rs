pub mod graph;
pub mod validator;
