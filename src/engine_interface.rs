//! Protobuf messages spoken with the engine bridge.
//!
//! Every frame on the wire is a varint length delimiter followed by one encoded
//! message. The client sends a [`Request`] and the engine answers with exactly
//! one [`State`].

/// Session options sent once, right after connecting.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Setup {
    #[prost(int32, tag = "1")]
    pub combine_frames: i32,
    #[prost(int32, tag = "2")]
    pub speed: i32,
    #[prost(int32, tag = "3")]
    pub gui: i32,
    #[prost(int32, tag = "4")]
    pub frame_skip: i32,
    #[prost(int32, tag = "5")]
    pub cmd_optim: i32,
    #[prost(bool, tag = "6")]
    pub micro_battles: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Command {
    #[prost(enumeration = "CommandKind", tag = "1")]
    pub kind: i32,
    #[prost(int32, tag = "2")]
    pub unit_id: i32,
    #[prost(int32, tag = "3")]
    pub target_id: i32,
    #[prost(int32, tag = "4")]
    pub x: i32,
    #[prost(int32, tag = "5")]
    pub y: i32,
    #[prost(int32, tag = "6")]
    pub player_id: i32,
    #[prost(int32, tag = "7")]
    pub unit_type: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CommandKind {
    Move = 0,
    AttackPriority = 1,
    AttackProtected = 2,
    Spawn = 3,
    Kill = 4,
}

/// One client frame. `setup` is only present on the handshake request; an
/// empty `commands` list is a pass tick.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(message, optional, tag = "1")]
    pub setup: ::core::option::Option<Setup>,
    #[prost(message, repeated, tag = "2")]
    pub commands: ::prost::alloc::vec::Vec<Command>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Unit {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(int32, tag = "2")]
    pub player_id: i32,
    #[prost(int32, tag = "3")]
    pub unit_type: i32,
    #[prost(int32, tag = "4")]
    pub x: i32,
    #[prost(int32, tag = "5")]
    pub y: i32,
    #[prost(int32, tag = "6")]
    pub health: i32,
    #[prost(int32, tag = "7")]
    pub max_health: i32,
    #[prost(int32, tag = "8")]
    pub ground_cd: i32,
    #[prost(int32, tag = "9")]
    pub max_cd: i32,
    #[prost(int32, tag = "10")]
    pub ground_range: i32,
    #[prost(bool, tag = "11")]
    pub attacking: bool,
    #[prost(bool, tag = "12")]
    pub starting_attack: bool,
    #[prost(bool, tag = "13")]
    pub under_attack: bool,
}

/// Full engine state at a frame boundary.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct State {
    #[prost(int32, tag = "1")]
    pub player_id: i32,
    #[prost(int32, tag = "2")]
    pub frame: i32,
    #[prost(int32, tag = "3")]
    pub map_width: i32,
    #[prost(int32, tag = "4")]
    pub map_height: i32,
    #[prost(message, repeated, tag = "5")]
    pub units: ::prost::alloc::vec::Vec<Unit>,
    #[prost(bool, tag = "6")]
    pub waiting_for_restart: bool,
    #[prost(bool, tag = "7")]
    pub battle_just_ended: bool,
    #[prost(bool, tag = "8")]
    pub battle_won: bool,
    #[prost(bool, tag = "9")]
    pub game_ended: bool,
}
