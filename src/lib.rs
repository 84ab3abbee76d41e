pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod link;
pub mod projection;
pub mod sync;

pub use config::Config;
pub use error::{Result, TetherError};
pub use gateway::{Record, RecordGateway, RecordStatus, SearchPage, UpdateAck, ZendeskGateway};
pub use link::{LinkSet, LinkTag, RecordId, add_member, decode, encode, remove_member};
pub use projection::LinkProjection;
pub use sync::{
    LinkKind, LinkOperation, ReadPolicy, SyncEngine, SyncPhase, SyncReport, TargetRead,
    audit_comment, check_symmetry, repair_one_way,
};
