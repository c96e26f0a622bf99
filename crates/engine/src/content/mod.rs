mod compiler;
mod database;
mod hashing;

pub use compiler::{
    compile_def_database, compile_defs_str, ContentCompileError, ContentErrorCode, SourceLocation,
};
pub use database::{
    ChaserDef, DefDatabase, DialogueLineDef, DialogueZoneDef, SequenceDef, StalkerDef,
    StepActionKind, StepDef, DEFAULT_EXTRA_READING_TIME,
};
