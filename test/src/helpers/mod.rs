mod test_graph;
mod test_transport;

pub use recorder::Recorder;
pub use test_graph::{list_of_ints, map_of_ints, player_record, record_with_child};
pub use test_transport::TestTransport;
