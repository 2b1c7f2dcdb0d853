// An enum representing the different types of room-level messages that can
// be sent/received, plus the outbound envelope shapes this engine produces

use serde_json::{json, Value as Json};

/// The session identifier the server assigns on join. Stays 0 while the
/// room is detached.
pub type RoomId = u32;

#[derive(Copy, Debug, Clone, Eq, PartialEq)]
pub enum OpCode {
    // Server confirmed the join request
    JoinRoom,
    // Server reported a room-level error
    Error,
    // Leave request / leave confirmation
    LeaveRoom,
    // An application payload, either direction
    RoomData,
    // A full state snapshot
    RoomState,
    // An incremental patch against the held snapshot
    RoomStatePatch,
}

impl OpCode {
    pub fn to_u8(self) -> u8 {
        match self {
            OpCode::JoinRoom => 10,
            OpCode::Error => 11,
            OpCode::LeaveRoom => 12,
            OpCode::RoomData => 13,
            OpCode::RoomState => 14,
            OpCode::RoomStatePatch => 15,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            10 => Some(OpCode::JoinRoom),
            11 => Some(OpCode::Error),
            12 => Some(OpCode::LeaveRoom),
            13 => Some(OpCode::RoomData),
            14 => Some(OpCode::RoomState),
            15 => Some(OpCode::RoomStatePatch),
            _ => None,
        }
    }
}

/// An outbound message. Encodes as the fixed array form the server
/// expects; nothing below the array shape is this engine's business.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    RoomData { room_id: RoomId, payload: Json },
    LeaveRoom { room_id: RoomId },
}

impl Envelope {
    pub fn opcode(&self) -> OpCode {
        match self {
            Envelope::RoomData { .. } => OpCode::RoomData,
            Envelope::LeaveRoom { .. } => OpCode::LeaveRoom,
        }
    }

    pub fn encode(&self) -> Json {
        match self {
            Envelope::RoomData { room_id, payload } => {
                json!([OpCode::RoomData.to_u8(), room_id, payload])
            }
            Envelope::LeaveRoom { room_id } => {
                json!([OpCode::LeaveRoom.to_u8(), room_id])
            }
        }
    }
}
