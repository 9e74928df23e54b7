pub mod peer_id;
pub mod startup;
