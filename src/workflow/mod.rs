pub mod agents;
pub mod assign;
pub mod guard;
pub mod parcels;
pub mod status;
#[cfg(test)]
pub(crate) mod testing;
pub mod users;
