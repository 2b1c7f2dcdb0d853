// The Decoder assigns these when it materializes graph nodes; they are
// process-local and never travel over the wire.
pub type RefId = u32;
